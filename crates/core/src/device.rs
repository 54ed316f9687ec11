//! # Device Module
//!
//! Physical recognition readers gating entry and exit.

use crate::error::CoreError;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Operational status of a device.
///
/// Advisory only: a device is marked online by a successful connect and may
/// be stale afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceStatus {
    Online,
    Offline,
}

impl DeviceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeviceStatus::Online => "online",
            DeviceStatus::Offline => "offline",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "online" => Some(DeviceStatus::Online),
            "offline" => Some(DeviceStatus::Offline),
            _ => None,
        }
    }
}

impl fmt::Display for DeviceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Which way a device lets people through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccessDirection {
    Entry,
    Exit,
    Both,
}

impl AccessDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccessDirection::Entry => "entry",
            AccessDirection::Exit => "exit",
            AccessDirection::Both => "both",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "entry" => Some(AccessDirection::Entry),
            "exit" => Some(AccessDirection::Exit),
            "both" => Some(AccessDirection::Both),
            _ => None,
        }
    }

    /// Parse, failing with the field name on unknown values
    pub fn parse(s: &str) -> Result<Self, CoreError> {
        Self::from_str(s).ok_or_else(|| CoreError::invalid_enum("access_direction", s))
    }
}

impl fmt::Display for AccessDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A recognition reader attached to a branch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Device {
    pub id: i64,
    pub name: String,
    pub ip_address: String,
    /// Vendor protocol port, 4370 by default
    pub port: u16,
    /// fingerprint, face, card or mixed
    pub device_type: String,
    pub location: Option<String>,
    pub branch_id: Option<i64>,
    pub access_direction: AccessDirection,
    pub status: DeviceStatus,
    pub last_heartbeat: Option<NaiveDateTime>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl Device {
    pub const DEFAULT_PORT: u16 = 4370;

    /// New offline fingerprint reader serving both directions
    pub fn new(id: i64, name: &str, ip_address: &str, created_at: NaiveDateTime) -> Self {
        Self {
            id,
            name: name.to_string(),
            ip_address: ip_address.to_string(),
            port: Self::DEFAULT_PORT,
            device_type: "fingerprint".to_string(),
            location: None,
            branch_id: None,
            access_direction: AccessDirection::Both,
            status: DeviceStatus::Offline,
            last_heartbeat: None,
            created_at,
            updated_at: created_at,
        }
    }

    pub fn is_online(&self) -> bool {
        self.status == DeviceStatus::Online
    }

    /// `ip:port` for the vendor link
    pub fn address(&self) -> String {
        format!("{}:{}", self.ip_address, self.port)
    }
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} (#{} {} {})",
            self.name,
            self.id,
            self.address(),
            self.status
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_device_enums() {
        assert_eq!(DeviceStatus::from_str("ONLINE"), Some(DeviceStatus::Online));
        assert_eq!(DeviceStatus::from_str("sleeping"), None);
        assert_eq!(AccessDirection::Both.as_str(), "both");
        assert!(AccessDirection::parse("up").is_err());
    }

    #[test]
    fn test_device_defaults() {
        let ts = NaiveDate::from_ymd_opt(2026, 3, 2)
            .and_then(|d| d.and_hms_opt(8, 0, 0))
            .unwrap();
        let device = Device::new(3, "Front Door", "192.168.1.20", ts);

        assert_eq!(device.port, 4370);
        assert!(!device.is_online());
        assert_eq!(device.address(), "192.168.1.20:4370");
        assert_eq!(device.access_direction, AccessDirection::Both);
    }
}
