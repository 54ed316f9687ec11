//! # Fingerprint Module
//!
//! Enrolled fingerprint templates and the bookkeeping of enrollment attempts.
//! Template bytes are opaque; they come from the reader and are only stored.

use crate::error::CoreError;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Finger slot on a hand pair, 1 to 10.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct FingerIndex(u8);

impl FingerIndex {
    pub const MIN: u8 = 1;
    pub const MAX: u8 = 10;

    pub fn new(index: u8) -> Result<Self, CoreError> {
        if (Self::MIN..=Self::MAX).contains(&index) {
            Ok(Self(index))
        } else {
            Err(CoreError::InvalidFingerIndex(i64::from(index)))
        }
    }

    pub fn get(&self) -> u8 {
        self.0
    }
}

impl TryFrom<u8> for FingerIndex {
    type Error = CoreError;

    fn try_from(index: u8) -> Result<Self, Self::Error> {
        Self::new(index)
    }
}

impl TryFrom<i64> for FingerIndex {
    type Error = CoreError;

    fn try_from(index: i64) -> Result<Self, Self::Error> {
        u8::try_from(index)
            .map_err(|_| CoreError::InvalidFingerIndex(index))
            .and_then(Self::new)
    }
}

impl From<FingerIndex> for u8 {
    fn from(index: FingerIndex) -> Self {
        index.0
    }
}

impl fmt::Display for FingerIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A stored template; at most one per (member, finger).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FingerprintTemplate {
    pub id: i64,
    pub member_id: i64,
    pub finger_index: FingerIndex,
    #[serde(skip)]
    pub template_data: Vec<u8>,
    pub created_at: NaiveDateTime,
}

/// Result of one enrollment attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EnrollmentStatus {
    Success,
    Failed,
}

impl EnrollmentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            EnrollmentStatus::Success => "success",
            EnrollmentStatus::Failed => "failed",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "success" => Some(EnrollmentStatus::Success),
            "failed" => Some(EnrollmentStatus::Failed),
            _ => None,
        }
    }
}

impl fmt::Display for EnrollmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Log entry of an enrollment attempt that reached the reader.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrollmentLog {
    pub id: i64,
    pub member_id: i64,
    pub device_id: i64,
    pub finger_index: FingerIndex,
    pub status: EnrollmentStatus,
    pub enrolled_at: NaiveDateTime,
}
