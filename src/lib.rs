//! Challan portal backend library
//!
//! Issues payment vouchers ("challans") against an administrator-maintained
//! fee catalog, lets bank tellers verify and post payments, and
//! authenticates administrators, bank tellers and public applicants with
//! rotating refresh tokens.

pub mod auth;
pub mod catalog;
pub mod challan;
pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod payment;
pub mod repository;
pub mod routes;
pub mod state;
pub mod validation;
