//! Identity document and phone number formats

use std::sync::LazyLock;

use regex::Regex;

static CNIC: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[0-9]{5}-[0-9]{7}-[0-9]$").unwrap_or_else(|e| panic!("invalid CNIC pattern: {e}"))
});

static MOBILE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^03[0-9]{2}-[0-9]{7}$").unwrap_or_else(|e| panic!("invalid mobile pattern: {e}"))
});

pub const CNIC_FORMAT_MESSAGE: &str = "CNIC must be in the format 12345-1234567-1";
pub const MOBILE_FORMAT_MESSAGE: &str = "Mobile number must be in the format 03XX-XXXXXXX";

/// `NNNNN-NNNNNNN-N`
pub fn is_valid_cnic(value: &str) -> bool {
    CNIC.is_match(value)
}

/// `03NN-NNNNNNN`
pub fn is_valid_mobile(value: &str) -> bool {
    MOBILE.is_match(value)
}

/// Checks both formats, returning the first violation as a field/message pair
pub fn check_identity(cnic: &str, mobile_no: &str) -> Result<(), (&'static str, &'static str)> {
    if !is_valid_cnic(cnic) {
        return Err(("cnic", CNIC_FORMAT_MESSAGE));
    }
    if !is_valid_mobile(mobile_no) {
        return Err(("mobileNo", MOBILE_FORMAT_MESSAGE));
    }
    Ok(())
}
