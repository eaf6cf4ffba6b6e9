//! # Attendance Common Library
//!
//! Shared code for the attendance services:
//! - Error type and result alias
//! - Configuration file loading and root folder resolution
//! - Calendar-day labels and the service clock
//! - SQLite database initialization and migrations

pub mod config;
pub mod db;
pub mod error;
pub mod time;

pub use error::{Error, Result};
