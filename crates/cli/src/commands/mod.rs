//! Subcommand handlers

pub mod access;
pub mod attendance;
pub mod branch;
pub mod device;
pub mod fingerprint;
pub mod journal;
pub mod member;
pub mod permission;
pub mod report;

/// `-` for absent values in listings
pub(crate) fn or_dash<T: std::fmt::Display>(value: Option<T>) -> String {
    value.map(|v| v.to_string()).unwrap_or_else(|| "-".to_string())
}
