//! Database schema definitions
//!
//! Row types for sqlx mapping from SQLite tables, and their conversion into
//! domain types. Schema is defined in migrations/20260301000000_init.sql and
//! migrations/20260401000000_fingerprints.sql

use crate::error::{PersistenceError, PersistenceResult};
use biogate_core::{
    AccessDecisionRecord, AccessDirection, AccessOutcome, AccessType, AttendanceRecord,
    AttendanceStatus, Branch, BranchStatus, DaysOfWeek, Device, DeviceStatus, EnrollmentLog,
    EnrollmentStatus, FingerIndex, FingerprintTemplate, Member, MemberStatus, PermissionRule,
    RuleStatus,
};
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

/// Row type for table `branches`
#[derive(Debug, Clone, sqlx::FromRow, Serialize, Deserialize)]
pub struct BranchRow {
    pub id: i64,
    pub name: String,
    pub code: String,
    pub address: Option<String>,
    pub manager: Option<String>,
    pub phone: Option<String>,
    pub status: String,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

/// Row type for table `members`
#[derive(Debug, Clone, sqlx::FromRow, Serialize, Deserialize)]
pub struct MemberRow {
    pub id: i64,
    pub name: String,
    pub phone: String,
    pub email: Option<String>,
    pub status: String,
    pub branch_id: Option<i64>,
    pub member_number: Option<String>,
    pub membership_type: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

/// Row type for table `devices`
#[derive(Debug, Clone, sqlx::FromRow, Serialize, Deserialize)]
pub struct DeviceRow {
    pub id: i64,
    pub name: String,
    pub ip_address: String,
    pub port: i64,
    pub device_type: String,
    pub location: Option<String>,
    pub branch_id: Option<i64>,
    pub access_direction: String,
    pub status: String,
    pub last_heartbeat: Option<NaiveDateTime>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

/// Row type for table `permissions`
#[derive(Debug, Clone, sqlx::FromRow, Serialize, Deserialize)]
pub struct PermissionRow {
    pub id: i64,
    pub member_id: i64,
    pub device_id: Option<i64>,
    pub permission_type: String,
    pub start_time: Option<NaiveTime>,
    pub end_time: Option<NaiveTime>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    /// Compact digit string, 1 = Monday
    pub days_of_week: String,
    pub status: String,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

/// Row type for table `access_logs`
#[derive(Debug, Clone, sqlx::FromRow, Serialize, Deserialize)]
pub struct AccessLogRow {
    pub id: i64,
    pub member_id: Option<i64>,
    pub device_id: i64,
    pub access_type: String,
    pub status: String,
    pub reason: Option<String>,
    pub rule_id: Option<i64>,
    pub recognition_method: String,
    pub access_time: NaiveDateTime,
}

/// Row type for table `recognition_logs`
#[derive(Debug, Clone, PartialEq, sqlx::FromRow, Serialize, Deserialize)]
pub struct RecognitionLogRow {
    pub id: i64,
    pub member_id: Option<i64>,
    pub device_id: i64,
    pub matched: bool,
    /// 0-100
    pub confidence: i64,
    pub access_log_id: Option<i64>,
    pub recognized_at: NaiveDateTime,
}

/// Row type for table `attendance_records`
#[derive(Debug, Clone, sqlx::FromRow, Serialize, Deserialize)]
pub struct AttendanceRow {
    pub id: i64,
    pub member_id: i64,
    pub device_id: i64,
    pub date: NaiveDate,
    pub check_in_time: Option<NaiveDateTime>,
    pub check_out_time: Option<NaiveDateTime>,
    pub duration_minutes: Option<i64>,
    pub status: String,
}

/// Row type for table `fingerprint_templates`
#[derive(Debug, Clone, sqlx::FromRow, Serialize, Deserialize)]
pub struct FingerprintTemplateRow {
    pub id: i64,
    pub member_id: i64,
    pub finger_index: i64,
    pub template_data: Vec<u8>,
    pub created_at: NaiveDateTime,
}

/// Row type for table `enrollment_logs`
#[derive(Debug, Clone, sqlx::FromRow, Serialize, Deserialize)]
pub struct EnrollmentLogRow {
    pub id: i64,
    pub member_id: i64,
    pub device_id: i64,
    pub finger_index: i64,
    pub status: String,
    pub enrolled_at: NaiveDateTime,
}

// === Conversion implementations ===

impl TryFrom<BranchRow> for Branch {
    type Error = PersistenceError;

    fn try_from(row: BranchRow) -> PersistenceResult<Self> {
        let status = BranchStatus::from_str(&row.status)
            .ok_or_else(|| PersistenceError::invalid_enum("branches.status", &row.status))?;
        Ok(Self {
            id: row.id,
            name: row.name,
            code: row.code,
            address: row.address,
            manager: row.manager,
            phone: row.phone,
            status,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

// Unknown member statuses are preserved, never rejected
impl From<MemberRow> for Member {
    fn from(row: MemberRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            phone: row.phone,
            email: row.email,
            status: MemberStatus::parse(&row.status),
            branch_id: row.branch_id,
            member_number: row.member_number,
            membership_type: row.membership_type,
            start_date: row.start_date,
            end_date: row.end_date,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

impl TryFrom<DeviceRow> for Device {
    type Error = PersistenceError;

    fn try_from(row: DeviceRow) -> PersistenceResult<Self> {
        let port = u16::try_from(row.port)
            .map_err(|_| PersistenceError::invalid_enum("devices.port", &row.port.to_string()))?;
        let access_direction = AccessDirection::from_str(&row.access_direction).ok_or_else(
            || PersistenceError::invalid_enum("devices.access_direction", &row.access_direction),
        )?;
        let status = DeviceStatus::from_str(&row.status)
            .ok_or_else(|| PersistenceError::invalid_enum("devices.status", &row.status))?;
        Ok(Self {
            id: row.id,
            name: row.name,
            ip_address: row.ip_address,
            port,
            device_type: row.device_type,
            location: row.location,
            branch_id: row.branch_id,
            access_direction,
            status,
            last_heartbeat: row.last_heartbeat,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

impl TryFrom<PermissionRow> for PermissionRule {
    type Error = PersistenceError;

    fn try_from(row: PermissionRow) -> PersistenceResult<Self> {
        let days_of_week: DaysOfWeek = row.days_of_week.parse()?;
        let status = RuleStatus::from_str(&row.status)
            .ok_or_else(|| PersistenceError::invalid_enum("permissions.status", &row.status))?;
        Ok(Self {
            id: row.id,
            member_id: row.member_id,
            device_id: row.device_id,
            permission_type: row.permission_type,
            start_time: row.start_time,
            end_time: row.end_time,
            start_date: row.start_date,
            end_date: row.end_date,
            days_of_week,
            status,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

impl TryFrom<AccessLogRow> for AccessDecisionRecord {
    type Error = PersistenceError;

    fn try_from(row: AccessLogRow) -> PersistenceResult<Self> {
        let access_type = AccessType::from_str(&row.access_type).ok_or_else(|| {
            PersistenceError::invalid_enum("access_logs.access_type", &row.access_type)
        })?;
        let status = AccessOutcome::from_str(&row.status)
            .ok_or_else(|| PersistenceError::invalid_enum("access_logs.status", &row.status))?;
        Ok(Self {
            id: row.id,
            member_id: row.member_id,
            device_id: row.device_id,
            access_type,
            status,
            reason: row.reason,
            rule_id: row.rule_id,
            recognition_method: row.recognition_method,
            access_time: row.access_time,
        })
    }
}

impl TryFrom<AttendanceRow> for AttendanceRecord {
    type Error = PersistenceError;

    fn try_from(row: AttendanceRow) -> PersistenceResult<Self> {
        let status = AttendanceStatus::from_str(&row.status).ok_or_else(|| {
            PersistenceError::invalid_enum("attendance_records.status", &row.status)
        })?;
        Ok(Self {
            id: row.id,
            member_id: row.member_id,
            device_id: row.device_id,
            date: row.date,
            check_in_time: row.check_in_time,
            check_out_time: row.check_out_time,
            duration_minutes: row.duration_minutes,
            status,
        })
    }
}

impl TryFrom<FingerprintTemplateRow> for FingerprintTemplate {
    type Error = PersistenceError;

    fn try_from(row: FingerprintTemplateRow) -> PersistenceResult<Self> {
        Ok(Self {
            id: row.id,
            member_id: row.member_id,
            finger_index: FingerIndex::try_from(row.finger_index)?,
            template_data: row.template_data,
            created_at: row.created_at,
        })
    }
}

impl TryFrom<EnrollmentLogRow> for EnrollmentLog {
    type Error = PersistenceError;

    fn try_from(row: EnrollmentLogRow) -> PersistenceResult<Self> {
        let status = EnrollmentStatus::from_str(&row.status)
            .ok_or_else(|| PersistenceError::invalid_enum("enrollment_logs.status", &row.status))?;
        Ok(Self {
            id: row.id,
            member_id: row.member_id,
            device_id: row.device_id,
            finger_index: FingerIndex::try_from(row.finger_index)?,
            status,
            enrolled_at: row.enrolled_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ts() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 3, 2)
            .and_then(|d| d.and_hms_opt(8, 0, 0))
            .unwrap()
    }

    #[test]
    fn test_member_row_keeps_unknown_status() {
        let row = MemberRow {
            id: 1,
            name: "Alice".to_string(),
            phone: "13800000001".to_string(),
            email: None,
            status: "frozen".to_string(),
            branch_id: None,
            member_number: None,
            membership_type: None,
            start_date: None,
            end_date: None,
            created_at: ts(),
            updated_at: ts(),
        };
        let member = Member::from(row);
        assert_eq!(member.status, MemberStatus::Other("frozen".to_string()));
        assert!(!member.is_active());
    }

    #[test]
    fn test_permission_row_rejects_bad_days() {
        let row = PermissionRow {
            id: 1,
            member_id: 1,
            device_id: None,
            permission_type: "full".to_string(),
            start_time: None,
            end_time: None,
            start_date: None,
            end_date: None,
            days_of_week: "089".to_string(),
            status: "active".to_string(),
            created_at: ts(),
            updated_at: ts(),
        };
        let err = PermissionRule::try_from(row).unwrap_err();
        assert!(matches!(err, PersistenceError::InvalidValue(_)));
    }

    #[test]
    fn test_device_row_port_out_of_range() {
        let row = DeviceRow {
            id: 1,
            name: "Gate".to_string(),
            ip_address: "10.0.0.5".to_string(),
            port: 70000,
            device_type: "fingerprint".to_string(),
            location: None,
            branch_id: None,
            access_direction: "both".to_string(),
            status: "offline".to_string(),
            last_heartbeat: None,
            created_at: ts(),
            updated_at: ts(),
        };
        assert!(Device::try_from(row).is_err());
    }
}
