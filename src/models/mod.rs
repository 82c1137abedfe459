//! Configuration and Diesel models.

pub mod config;
#[cfg(feature = "sqlite")]
pub mod member;
