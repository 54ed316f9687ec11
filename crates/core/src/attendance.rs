//! # Attendance Module
//!
//! One record per member per calendar day, moved through
//! absent -> checked_in -> checked_out by check events.

use crate::error::CoreError;
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Stored status of an attendance record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttendanceStatus {
    Incomplete,
    Complete,
    Abnormal,
}

impl AttendanceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AttendanceStatus::Incomplete => "incomplete",
            AttendanceStatus::Complete => "complete",
            AttendanceStatus::Abnormal => "abnormal",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "incomplete" => Some(AttendanceStatus::Incomplete),
            "complete" => Some(AttendanceStatus::Complete),
            "abnormal" => Some(AttendanceStatus::Abnormal),
            _ => None,
        }
    }
}

impl fmt::Display for AttendanceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Derived state of a member's day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttendanceState {
    NotCheckedIn,
    CheckedIn,
    CheckedOut,
}

impl AttendanceState {
    pub fn as_str(&self) -> &'static str {
        match self {
            AttendanceState::NotCheckedIn => "not_checked_in",
            AttendanceState::CheckedIn => "checked_in",
            AttendanceState::CheckedOut => "checked_out",
        }
    }
}

impl fmt::Display for AttendanceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Attendance event kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckType {
    CheckIn,
    CheckOut,
}

impl CheckType {
    pub fn as_str(&self) -> &'static str {
        match self {
            CheckType::CheckIn => "check_in",
            CheckType::CheckOut => "check_out",
        }
    }

    pub fn parse(s: &str) -> Result<Self, CoreError> {
        match s.to_lowercase().as_str() {
            "check_in" | "checkin" | "in" => Ok(CheckType::CheckIn),
            "check_out" | "checkout" | "out" => Ok(CheckType::CheckOut),
            _ => Err(CoreError::invalid_enum("check_type", s)),
        }
    }
}

impl fmt::Display for CheckType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Per-member, per-day check-in/check-out record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttendanceRecord {
    pub id: i64,
    pub member_id: i64,
    /// Device of the latest check event
    pub device_id: i64,
    pub date: NaiveDate,
    pub check_in_time: Option<NaiveDateTime>,
    pub check_out_time: Option<NaiveDateTime>,
    /// Present only when both times are set
    pub duration_minutes: Option<i64>,
    pub status: AttendanceStatus,
}

impl AttendanceRecord {
    /// Fresh record opened by a check-in; `id` is assigned by storage
    pub fn checked_in(member_id: i64, device_id: i64, at: NaiveDateTime) -> Self {
        Self {
            id: 0,
            member_id,
            device_id,
            date: at.date(),
            check_in_time: Some(at),
            check_out_time: None,
            duration_minutes: None,
            status: AttendanceStatus::Incomplete,
        }
    }

    pub fn state(&self) -> AttendanceState {
        match (self.check_in_time, self.check_out_time) {
            (Some(_), Some(_)) => AttendanceState::CheckedOut,
            (Some(_), None) => AttendanceState::CheckedIn,
            (None, _) => AttendanceState::NotCheckedIn,
        }
    }

    /// Whole minutes between check-in and `at`, truncated
    pub fn elapsed_minutes(&self, at: NaiveDateTime) -> Option<i64> {
        self.check_in_time
            .map(|check_in| (at - check_in).num_seconds().div_euclid(60))
    }
}
