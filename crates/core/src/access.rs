//! # Access Module
//!
//! Audit entries of authorization decisions and the recognition signal that
//! triggers them.

use crate::error::CoreError;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Direction of a passage attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccessType {
    Entry,
    Exit,
}

impl AccessType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccessType::Entry => "entry",
            AccessType::Exit => "exit",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "entry" => Some(AccessType::Entry),
            "exit" => Some(AccessType::Exit),
            _ => None,
        }
    }

    pub fn parse(s: &str) -> Result<Self, CoreError> {
        Self::from_str(s).ok_or_else(|| CoreError::invalid_enum("access_type", s))
    }
}

impl fmt::Display for AccessType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Outcome recorded in the audit log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccessOutcome {
    Allowed,
    Denied,
}

impl AccessOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccessOutcome::Allowed => "allowed",
            AccessOutcome::Denied => "denied",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "allowed" => Some(AccessOutcome::Allowed),
            "denied" => Some(AccessOutcome::Denied),
            _ => None,
        }
    }
}

impl fmt::Display for AccessOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Why a passage was denied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DenialReason {
    MemberNotFound,
    MembershipExpired,
    MembershipSuspended,
    MembershipAbnormal,
    NoApplicablePermission,
}

impl DenialReason {
    /// Human-readable reason stored with the audit entry
    pub fn as_str(&self) -> &'static str {
        match self {
            DenialReason::MemberNotFound => "member not found",
            DenialReason::MembershipExpired => "membership expired",
            DenialReason::MembershipSuspended => "membership suspended",
            DenialReason::MembershipAbnormal => "membership abnormal",
            DenialReason::NoApplicablePermission => "no applicable permission",
        }
    }
}

impl fmt::Display for DenialReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Result of the biometric matcher, produced outside this system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum RecognitionOutcome {
    Matched { member_id: i64, confidence: u8 },
    NoMatch,
}

impl RecognitionOutcome {
    pub fn member_id(&self) -> Option<i64> {
        match self {
            RecognitionOutcome::Matched { member_id, .. } => Some(*member_id),
            RecognitionOutcome::NoMatch => None,
        }
    }

    /// Confidence 0-100; a no-match scores 0
    pub fn confidence(&self) -> u8 {
        match self {
            RecognitionOutcome::Matched { confidence, .. } => *confidence,
            RecognitionOutcome::NoMatch => 0,
        }
    }
}

/// Immutable audit entry of one authorization evaluation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccessDecisionRecord {
    pub id: i64,
    /// `None` when recognition did not resolve a member
    pub member_id: Option<i64>,
    pub device_id: i64,
    pub access_type: AccessType,
    pub status: AccessOutcome,
    /// Present iff denied
    pub reason: Option<String>,
    /// Rule that granted access, when one was cited
    pub rule_id: Option<i64>,
    pub recognition_method: String,
    pub access_time: NaiveDateTime,
}

impl AccessDecisionRecord {
    pub fn is_allowed(&self) -> bool {
        self.status == AccessOutcome::Allowed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_access_type_parse() {
        assert_eq!(AccessType::parse("Entry").unwrap(), AccessType::Entry);
        assert_eq!(
            AccessType::parse("both").unwrap_err(),
            CoreError::invalid_enum("access_type", "both")
        );
    }

    #[test]
    fn test_denial_reason_text() {
        assert_eq!(DenialReason::MembershipExpired.as_str(), "membership expired");
        assert_eq!(DenialReason::MembershipSuspended.as_str(), "membership suspended");
        assert_eq!(
            DenialReason::NoApplicablePermission.to_string(),
            "no applicable permission"
        );
    }

    #[test]
    fn test_recognition_outcome() {
        let matched = RecognitionOutcome::Matched {
            member_id: 5,
            confidence: 85,
        };
        assert_eq!(matched.member_id(), Some(5));
        assert_eq!(matched.confidence(), 85);
        assert_eq!(RecognitionOutcome::NoMatch.member_id(), None);
        assert_eq!(RecognitionOutcome::NoMatch.confidence(), 0);

        let json = serde_json::to_string(&RecognitionOutcome::NoMatch).unwrap();
        assert_eq!(json, r#"{"result":"no_match"}"#);
    }
}
