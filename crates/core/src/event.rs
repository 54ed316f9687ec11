//! # Event Module
//!
//! Notifications broadcast after access decisions, attendance transitions,
//! device status changes and fingerprint enrollments. Payloads are plain JSON
//! so observers stay decoupled from domain types.

use crate::access::AccessDecisionRecord;
use crate::attendance::{AttendanceRecord, CheckType};
use crate::device::Device;
use crate::fingerprint::EnrollmentLog;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::fmt;

/// Kind of notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    AccessDecision,
    CheckIn,
    CheckOut,
    Recognition,
    DeviceStatus,
    Enrollment,
}

impl NotificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationKind::AccessDecision => "access_decision",
            NotificationKind::CheckIn => "check_in",
            NotificationKind::CheckOut => "check_out",
            NotificationKind::Recognition => "recognition",
            NotificationKind::DeviceStatus => "device_status",
            NotificationKind::Enrollment => "enrollment",
        }
    }
}

impl fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A published `{kind, payload}` pair stamped with the publish time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub kind: NotificationKind,
    pub payload: Value,
    pub timestamp: NaiveDateTime,
}

impl Notification {
    pub fn new(kind: NotificationKind, payload: Value, timestamp: NaiveDateTime) -> Self {
        Self {
            kind,
            payload,
            timestamp,
        }
    }

    // === Factory methods ===

    pub fn access_decision(record: &AccessDecisionRecord) -> Self {
        Self::new(
            NotificationKind::AccessDecision,
            json!({
                "access_log_id": record.id,
                "member_id": record.member_id,
                "device_id": record.device_id,
                "access_type": record.access_type,
                "status": record.status,
                "reason": record.reason,
                "rule_id": record.rule_id,
            }),
            record.access_time,
        )
    }

    /// Attendance transition; `at` is the check time of the event
    pub fn attendance(check: CheckType, record: &AttendanceRecord, at: NaiveDateTime) -> Self {
        let kind = match check {
            CheckType::CheckIn => NotificationKind::CheckIn,
            CheckType::CheckOut => NotificationKind::CheckOut,
        };
        Self::new(
            kind,
            json!({
                "attendance_id": record.id,
                "member_id": record.member_id,
                "device_id": record.device_id,
                "date": record.date,
                "duration_minutes": record.duration_minutes,
                "status": record.status,
            }),
            at,
        )
    }

    pub fn device_status(device: &Device, at: NaiveDateTime) -> Self {
        Self::new(
            NotificationKind::DeviceStatus,
            json!({
                "device_id": device.id,
                "name": device.name,
                "status": device.status,
            }),
            at,
        )
    }

    /// Enrollment attempt; `template_id` is set on success
    pub fn enrollment(log: &EnrollmentLog, template_id: Option<i64>) -> Self {
        Self::new(
            NotificationKind::Enrollment,
            json!({
                "enrollment_id": log.id,
                "member_id": log.member_id,
                "device_id": log.device_id,
                "finger_index": log.finger_index,
                "status": log.status,
                "template_id": template_id,
            }),
            log.enrolled_at,
        )
    }

    /// Serialize as one JSONL line
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

impl fmt::Display for Notification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {} {}",
            self.timestamp.format("%Y-%m-%d %H:%M:%S"),
            self.kind,
            self.payload
        )
    }
}
