//! Repository implementations for SQLite
//!
//! Every repository function issues a single statement and is generic over
//! [`sqlx::Executor`], so it runs against the pool or inside a transaction
//! (`&mut *tx`) unchanged.

use crate::error::{PersistenceError, PersistenceResult};
use crate::sqlite::schema::*;
use biogate_core::{
    AccessDecisionRecord, AccessOutcome, AccessType, AttendanceRecord, AttendanceStatus, Branch,
    Device, DeviceStatus, EnrollmentLog, FingerIndex, FingerprintTemplate, Member,
    PermissionRule, RuleStatus,
};
use chrono::{NaiveDate, NaiveDateTime};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Executor, QueryBuilder, Sqlite, SqlitePool};
use std::str::FromStr;

/// Default page size for log queries
pub const DEFAULT_PAGE_SIZE: i64 = 100;

// ============================================================================
// Branch Repository
// ============================================================================

/// Repository for table `branches`
pub struct BranchRepo;

impl BranchRepo {
    pub async fn find_by_id<'e, E>(executor: E, id: i64) -> PersistenceResult<Option<Branch>>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query_as::<_, BranchRow>("SELECT * FROM branches WHERE id = ?")
            .bind(id)
            .fetch_optional(executor)
            .await?
            .map(Branch::try_from)
            .transpose()
    }

    pub async fn find_by_code<'e, E>(executor: E, code: &str) -> PersistenceResult<Option<Branch>>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query_as::<_, BranchRow>("SELECT * FROM branches WHERE code = ?")
            .bind(code)
            .fetch_optional(executor)
            .await?
            .map(Branch::try_from)
            .transpose()
    }

    pub async fn list<'e, E>(executor: E) -> PersistenceResult<Vec<Branch>>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query_as::<_, BranchRow>("SELECT * FROM branches ORDER BY id")
            .fetch_all(executor)
            .await?
            .into_iter()
            .map(Branch::try_from)
            .collect()
    }

    /// Insert and return the new id
    pub async fn insert<'e, E>(executor: E, branch: &Branch) -> PersistenceResult<i64>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let result = sqlx::query(
            r#"
            INSERT INTO branches (name, code, address, manager, phone, status, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&branch.name)
        .bind(&branch.code)
        .bind(&branch.address)
        .bind(&branch.manager)
        .bind(&branch.phone)
        .bind(branch.status.as_str())
        .bind(branch.created_at)
        .bind(branch.updated_at)
        .execute(executor)
        .await?;
        Ok(result.last_insert_rowid())
    }

    pub async fn update<'e, E>(executor: E, branch: &Branch) -> PersistenceResult<()>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let result = sqlx::query(
            r#"
            UPDATE branches
            SET name = ?, code = ?, address = ?, manager = ?, phone = ?, status = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(&branch.name)
        .bind(&branch.code)
        .bind(&branch.address)
        .bind(&branch.manager)
        .bind(&branch.phone)
        .bind(branch.status.as_str())
        .bind(branch.updated_at)
        .bind(branch.id)
        .execute(executor)
        .await?;

        if result.rows_affected() == 0 {
            return Err(PersistenceError::not_found("Branch", branch.id));
        }
        Ok(())
    }

    pub async fn delete<'e, E>(executor: E, id: i64) -> PersistenceResult<()>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let result = sqlx::query("DELETE FROM branches WHERE id = ?")
            .bind(id)
            .execute(executor)
            .await?;

        if result.rows_affected() == 0 {
            return Err(PersistenceError::not_found("Branch", id));
        }
        Ok(())
    }

    /// Members plus devices still attached to the branch
    pub async fn count_dependents<'e, E>(executor: E, id: i64) -> PersistenceResult<i64>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let count = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT (SELECT COUNT(*) FROM members WHERE branch_id = ?)
                 + (SELECT COUNT(*) FROM devices WHERE branch_id = ?)
            "#,
        )
        .bind(id)
        .bind(id)
        .fetch_one(executor)
        .await?;
        Ok(count)
    }
}

// ============================================================================
// Member Repository
// ============================================================================

/// Filter for member listings
#[derive(Debug, Clone, Default)]
pub struct MemberFilter {
    pub status: Option<String>,
    pub branch_id: Option<i64>,
    /// Substring of name, phone or member number
    pub search: Option<String>,
}

/// Repository for table `members`
pub struct MemberRepo;

impl MemberRepo {
    pub async fn find_by_id<'e, E>(executor: E, id: i64) -> PersistenceResult<Option<Member>>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let row = sqlx::query_as::<_, MemberRow>("SELECT * FROM members WHERE id = ?")
            .bind(id)
            .fetch_optional(executor)
            .await?;
        Ok(row.map(Member::from))
    }

    pub async fn find_by_phone<'e, E>(executor: E, phone: &str) -> PersistenceResult<Option<Member>>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let row = sqlx::query_as::<_, MemberRow>("SELECT * FROM members WHERE phone = ?")
            .bind(phone)
            .fetch_optional(executor)
            .await?;
        Ok(row.map(Member::from))
    }

    pub async fn list<'e, E>(executor: E, filter: &MemberFilter) -> PersistenceResult<Vec<Member>>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let mut qb = QueryBuilder::<Sqlite>::new("SELECT * FROM members WHERE 1 = 1");
        if let Some(status) = &filter.status {
            qb.push(" AND status = ").push_bind(status.clone());
        }
        if let Some(branch_id) = filter.branch_id {
            qb.push(" AND branch_id = ").push_bind(branch_id);
        }
        if let Some(search) = &filter.search {
            let pattern = format!("%{}%", search);
            qb.push(" AND (name LIKE ")
                .push_bind(pattern.clone())
                .push(" OR phone LIKE ")
                .push_bind(pattern.clone())
                .push(" OR member_number LIKE ")
                .push_bind(pattern)
                .push(")");
        }
        qb.push(" ORDER BY id");

        let rows = qb.build_query_as::<MemberRow>().fetch_all(executor).await?;
        Ok(rows.into_iter().map(Member::from).collect())
    }

    /// Insert and return the new id
    pub async fn insert<'e, E>(executor: E, member: &Member) -> PersistenceResult<i64>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let result = sqlx::query(
            r#"
            INSERT INTO members (name, phone, email, status, branch_id, member_number,
                                 membership_type, start_date, end_date, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&member.name)
        .bind(&member.phone)
        .bind(&member.email)
        .bind(member.status.as_str())
        .bind(member.branch_id)
        .bind(&member.member_number)
        .bind(&member.membership_type)
        .bind(member.start_date)
        .bind(member.end_date)
        .bind(member.created_at)
        .bind(member.updated_at)
        .execute(executor)
        .await?;
        Ok(result.last_insert_rowid())
    }

    pub async fn update<'e, E>(executor: E, member: &Member) -> PersistenceResult<()>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let result = sqlx::query(
            r#"
            UPDATE members
            SET name = ?, phone = ?, email = ?, status = ?, branch_id = ?, member_number = ?,
                membership_type = ?, start_date = ?, end_date = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(&member.name)
        .bind(&member.phone)
        .bind(&member.email)
        .bind(member.status.as_str())
        .bind(member.branch_id)
        .bind(&member.member_number)
        .bind(&member.membership_type)
        .bind(member.start_date)
        .bind(member.end_date)
        .bind(member.updated_at)
        .bind(member.id)
        .execute(executor)
        .await?;

        if result.rows_affected() == 0 {
            return Err(PersistenceError::not_found("Member", member.id));
        }
        Ok(())
    }

    pub async fn delete<'e, E>(executor: E, id: i64) -> PersistenceResult<()>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let result = sqlx::query("DELETE FROM members WHERE id = ?")
            .bind(id)
            .execute(executor)
            .await?;

        if result.rows_affected() == 0 {
            return Err(PersistenceError::not_found("Member", id));
        }
        Ok(())
    }

    pub async fn count<'e, E>(executor: E) -> PersistenceResult<i64>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM members")
            .fetch_one(executor)
            .await?;
        Ok(count)
    }
}

// ============================================================================
// Device Repository
// ============================================================================

/// Repository for table `devices`
pub struct DeviceRepo;

impl DeviceRepo {
    pub async fn find_by_id<'e, E>(executor: E, id: i64) -> PersistenceResult<Option<Device>>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query_as::<_, DeviceRow>("SELECT * FROM devices WHERE id = ?")
            .bind(id)
            .fetch_optional(executor)
            .await?
            .map(Device::try_from)
            .transpose()
    }

    pub async fn find_by_ip<'e, E>(executor: E, ip_address: &str) -> PersistenceResult<Option<Device>>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query_as::<_, DeviceRow>("SELECT * FROM devices WHERE ip_address = ?")
            .bind(ip_address)
            .fetch_optional(executor)
            .await?
            .map(Device::try_from)
            .transpose()
    }

    pub async fn list<'e, E>(executor: E, branch_id: Option<i64>) -> PersistenceResult<Vec<Device>>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let mut qb = QueryBuilder::<Sqlite>::new("SELECT * FROM devices");
        if let Some(branch_id) = branch_id {
            qb.push(" WHERE branch_id = ").push_bind(branch_id);
        }
        qb.push(" ORDER BY id");

        qb.build_query_as::<DeviceRow>()
            .fetch_all(executor)
            .await?
            .into_iter()
            .map(Device::try_from)
            .collect()
    }

    /// Insert and return the new id
    pub async fn insert<'e, E>(executor: E, device: &Device) -> PersistenceResult<i64>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let result = sqlx::query(
            r#"
            INSERT INTO devices (name, ip_address, port, device_type, location, branch_id,
                                 access_direction, status, last_heartbeat, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&device.name)
        .bind(&device.ip_address)
        .bind(i64::from(device.port))
        .bind(&device.device_type)
        .bind(&device.location)
        .bind(device.branch_id)
        .bind(device.access_direction.as_str())
        .bind(device.status.as_str())
        .bind(device.last_heartbeat)
        .bind(device.created_at)
        .bind(device.updated_at)
        .execute(executor)
        .await?;
        Ok(result.last_insert_rowid())
    }

    pub async fn update<'e, E>(executor: E, device: &Device) -> PersistenceResult<()>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let result = sqlx::query(
            r#"
            UPDATE devices
            SET name = ?, ip_address = ?, port = ?, device_type = ?, location = ?, branch_id = ?,
                access_direction = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(&device.name)
        .bind(&device.ip_address)
        .bind(i64::from(device.port))
        .bind(&device.device_type)
        .bind(&device.location)
        .bind(device.branch_id)
        .bind(device.access_direction.as_str())
        .bind(device.updated_at)
        .bind(device.id)
        .execute(executor)
        .await?;

        if result.rows_affected() == 0 {
            return Err(PersistenceError::not_found("Device", device.id));
        }
        Ok(())
    }

    /// Set status; `heartbeat` replaces `last_heartbeat` only when given
    pub async fn update_status<'e, E>(
        executor: E,
        id: i64,
        status: DeviceStatus,
        heartbeat: Option<NaiveDateTime>,
        updated_at: NaiveDateTime,
    ) -> PersistenceResult<()>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let result = sqlx::query(
            r#"
            UPDATE devices
            SET status = ?, last_heartbeat = COALESCE(?, last_heartbeat), updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(status.as_str())
        .bind(heartbeat)
        .bind(updated_at)
        .bind(id)
        .execute(executor)
        .await?;

        if result.rows_affected() == 0 {
            return Err(PersistenceError::not_found("Device", id));
        }
        Ok(())
    }

    pub async fn delete<'e, E>(executor: E, id: i64) -> PersistenceResult<()>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let result = sqlx::query("DELETE FROM devices WHERE id = ?")
            .bind(id)
            .execute(executor)
            .await?;

        if result.rows_affected() == 0 {
            return Err(PersistenceError::not_found("Device", id));
        }
        Ok(())
    }
}

// ============================================================================
// Permission Repository
// ============================================================================

/// Repository for table `permissions`
pub struct PermissionRepo;

impl PermissionRepo {
    pub async fn find_by_id<'e, E>(executor: E, id: i64) -> PersistenceResult<Option<PermissionRule>>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query_as::<_, PermissionRow>("SELECT * FROM permissions WHERE id = ?")
            .bind(id)
            .fetch_optional(executor)
            .await?
            .map(PermissionRule::try_from)
            .transpose()
    }

    /// All rules of a member in creation order
    pub async fn list_by_member<'e, E>(
        executor: E,
        member_id: i64,
    ) -> PersistenceResult<Vec<PermissionRule>>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query_as::<_, PermissionRow>(
            "SELECT * FROM permissions WHERE member_id = ? ORDER BY id ASC",
        )
        .bind(member_id)
        .fetch_all(executor)
        .await?
        .into_iter()
        .map(PermissionRule::try_from)
        .collect()
    }

    /// Active rules of a member in creation order
    pub async fn list_active<'e, E>(
        executor: E,
        member_id: i64,
    ) -> PersistenceResult<Vec<PermissionRule>>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query_as::<_, PermissionRow>(
            "SELECT * FROM permissions WHERE member_id = ? AND status = ? ORDER BY id ASC",
        )
        .bind(member_id)
        .bind(RuleStatus::Active.as_str())
        .fetch_all(executor)
        .await?
        .into_iter()
        .map(PermissionRule::try_from)
        .collect()
    }

    /// Insert and return the new id
    pub async fn insert<'e, E>(executor: E, rule: &PermissionRule) -> PersistenceResult<i64>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let result = sqlx::query(
            r#"
            INSERT INTO permissions (member_id, device_id, permission_type, start_time, end_time,
                                     start_date, end_date, days_of_week, status, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(rule.member_id)
        .bind(rule.device_id)
        .bind(&rule.permission_type)
        .bind(rule.start_time)
        .bind(rule.end_time)
        .bind(rule.start_date)
        .bind(rule.end_date)
        .bind(rule.days_of_week.to_string())
        .bind(rule.status.as_str())
        .bind(rule.created_at)
        .bind(rule.updated_at)
        .execute(executor)
        .await?;
        Ok(result.last_insert_rowid())
    }

    /// Rewrite every mutable field; owner and creation time never change
    pub async fn update<'e, E>(executor: E, rule: &PermissionRule) -> PersistenceResult<()>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let result = sqlx::query(
            r#"
            UPDATE permissions
            SET device_id = ?, permission_type = ?, start_time = ?, end_time = ?, start_date = ?,
                end_date = ?, days_of_week = ?, status = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(rule.device_id)
        .bind(&rule.permission_type)
        .bind(rule.start_time)
        .bind(rule.end_time)
        .bind(rule.start_date)
        .bind(rule.end_date)
        .bind(rule.days_of_week.to_string())
        .bind(rule.status.as_str())
        .bind(rule.updated_at)
        .bind(rule.id)
        .execute(executor)
        .await?;

        if result.rows_affected() == 0 {
            return Err(PersistenceError::not_found("Permission", rule.id));
        }
        Ok(())
    }

    pub async fn set_status<'e, E>(
        executor: E,
        id: i64,
        status: RuleStatus,
        updated_at: NaiveDateTime,
    ) -> PersistenceResult<()>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let result = sqlx::query("UPDATE permissions SET status = ?, updated_at = ? WHERE id = ?")
            .bind(status.as_str())
            .bind(updated_at)
            .bind(id)
            .execute(executor)
            .await?;

        if result.rows_affected() == 0 {
            return Err(PersistenceError::not_found("Permission", id));
        }
        Ok(())
    }

    pub async fn delete<'e, E>(executor: E, id: i64) -> PersistenceResult<()>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let result = sqlx::query("DELETE FROM permissions WHERE id = ?")
            .bind(id)
            .execute(executor)
            .await?;

        if result.rows_affected() == 0 {
            return Err(PersistenceError::not_found("Permission", id));
        }
        Ok(())
    }
}

// ============================================================================
// Access Log Repository
// ============================================================================

/// Filter for audit log queries; results are newest first
#[derive(Debug, Clone)]
pub struct AccessLogFilter {
    pub member_id: Option<i64>,
    pub device_id: Option<i64>,
    pub access_type: Option<AccessType>,
    pub status: Option<AccessOutcome>,
    pub offset: i64,
    pub limit: i64,
}

impl Default for AccessLogFilter {
    fn default() -> Self {
        Self {
            member_id: None,
            device_id: None,
            access_type: None,
            status: None,
            offset: 0,
            limit: DEFAULT_PAGE_SIZE,
        }
    }
}

/// Repository for table `access_logs` (append-only)
pub struct AccessLogRepo;

impl AccessLogRepo {
    /// Append an audit entry and return its id; `record.id` is ignored
    pub async fn insert<'e, E>(executor: E, record: &AccessDecisionRecord) -> PersistenceResult<i64>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let result = sqlx::query(
            r#"
            INSERT INTO access_logs (member_id, device_id, access_type, status, reason, rule_id,
                                     recognition_method, access_time)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(record.member_id)
        .bind(record.device_id)
        .bind(record.access_type.as_str())
        .bind(record.status.as_str())
        .bind(&record.reason)
        .bind(record.rule_id)
        .bind(&record.recognition_method)
        .bind(record.access_time)
        .execute(executor)
        .await?;
        Ok(result.last_insert_rowid())
    }

    pub async fn find_by_id<'e, E>(
        executor: E,
        id: i64,
    ) -> PersistenceResult<Option<AccessDecisionRecord>>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query_as::<_, AccessLogRow>("SELECT * FROM access_logs WHERE id = ?")
            .bind(id)
            .fetch_optional(executor)
            .await?
            .map(AccessDecisionRecord::try_from)
            .transpose()
    }

    pub async fn query<'e, E>(
        executor: E,
        filter: &AccessLogFilter,
    ) -> PersistenceResult<Vec<AccessDecisionRecord>>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let mut qb = QueryBuilder::<Sqlite>::new("SELECT * FROM access_logs WHERE 1 = 1");
        if let Some(member_id) = filter.member_id {
            qb.push(" AND member_id = ").push_bind(member_id);
        }
        if let Some(device_id) = filter.device_id {
            qb.push(" AND device_id = ").push_bind(device_id);
        }
        if let Some(access_type) = filter.access_type {
            qb.push(" AND access_type = ").push_bind(access_type.as_str());
        }
        if let Some(status) = filter.status {
            qb.push(" AND status = ").push_bind(status.as_str());
        }
        qb.push(" ORDER BY access_time DESC, id DESC LIMIT ")
            .push_bind(filter.limit)
            .push(" OFFSET ")
            .push_bind(filter.offset);

        qb.build_query_as::<AccessLogRow>()
            .fetch_all(executor)
            .await?
            .into_iter()
            .map(AccessDecisionRecord::try_from)
            .collect()
    }

    pub async fn count<'e, E>(executor: E) -> PersistenceResult<i64>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM access_logs")
            .fetch_one(executor)
            .await?;
        Ok(count)
    }
}

// ============================================================================
// Recognition Log Repository
// ============================================================================

/// Repository for table `recognition_logs`
pub struct RecognitionLogRepo;

impl RecognitionLogRepo {
    /// Append a recognition entry; `row.id` is ignored
    pub async fn insert<'e, E>(executor: E, row: &RecognitionLogRow) -> PersistenceResult<i64>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let result = sqlx::query(
            r#"
            INSERT INTO recognition_logs (member_id, device_id, matched, confidence, access_log_id, recognized_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(row.member_id)
        .bind(row.device_id)
        .bind(row.matched)
        .bind(row.confidence)
        .bind(row.access_log_id)
        .bind(row.recognized_at)
        .execute(executor)
        .await?;
        Ok(result.last_insert_rowid())
    }

    /// Newest entries first
    pub async fn list_recent<'e, E>(
        executor: E,
        device_id: Option<i64>,
        limit: i64,
    ) -> PersistenceResult<Vec<RecognitionLogRow>>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let mut qb = QueryBuilder::<Sqlite>::new("SELECT * FROM recognition_logs");
        if let Some(device_id) = device_id {
            qb.push(" WHERE device_id = ").push_bind(device_id);
        }
        qb.push(" ORDER BY recognized_at DESC, id DESC LIMIT ")
            .push_bind(limit);

        let rows = qb
            .build_query_as::<RecognitionLogRow>()
            .fetch_all(executor)
            .await?;
        Ok(rows)
    }
}

// ============================================================================
// Fingerprint Template Repository
// ============================================================================

/// Repository for table `fingerprint_templates`
pub struct TemplateRepo;

impl TemplateRepo {
    pub async fn find_by_id<'e, E>(
        executor: E,
        id: i64,
    ) -> PersistenceResult<Option<FingerprintTemplate>>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query_as::<_, FingerprintTemplateRow>(
            "SELECT * FROM fingerprint_templates WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(executor)
        .await?
        .map(FingerprintTemplate::try_from)
        .transpose()
    }

    pub async fn find_by_finger<'e, E>(
        executor: E,
        member_id: i64,
        finger_index: FingerIndex,
    ) -> PersistenceResult<Option<FingerprintTemplate>>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query_as::<_, FingerprintTemplateRow>(
            "SELECT * FROM fingerprint_templates WHERE member_id = ? AND finger_index = ?",
        )
        .bind(member_id)
        .bind(i64::from(finger_index.get()))
        .fetch_optional(executor)
        .await?
        .map(FingerprintTemplate::try_from)
        .transpose()
    }

    /// Templates of a member by finger
    pub async fn list_by_member<'e, E>(
        executor: E,
        member_id: i64,
    ) -> PersistenceResult<Vec<FingerprintTemplate>>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query_as::<_, FingerprintTemplateRow>(
            "SELECT * FROM fingerprint_templates WHERE member_id = ? ORDER BY finger_index",
        )
        .bind(member_id)
        .fetch_all(executor)
        .await?
        .into_iter()
        .map(FingerprintTemplate::try_from)
        .collect()
    }

    /// Insert and return the new id
    pub async fn insert<'e, E>(executor: E, template: &FingerprintTemplate) -> PersistenceResult<i64>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let result = sqlx::query(
            r#"
            INSERT INTO fingerprint_templates (member_id, finger_index, template_data, created_at)
            VALUES (?, ?, ?, ?)
            "#,
        )
        .bind(template.member_id)
        .bind(i64::from(template.finger_index.get()))
        .bind(&template.template_data)
        .bind(template.created_at)
        .execute(executor)
        .await?;
        Ok(result.last_insert_rowid())
    }

    pub async fn delete<'e, E>(executor: E, id: i64) -> PersistenceResult<()>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let result = sqlx::query("DELETE FROM fingerprint_templates WHERE id = ?")
            .bind(id)
            .execute(executor)
            .await?;

        if result.rows_affected() == 0 {
            return Err(PersistenceError::not_found("FingerprintTemplate", id));
        }
        Ok(())
    }
}

// ============================================================================
// Enrollment Log Repository
// ============================================================================

/// Repository for table `enrollment_logs`
pub struct EnrollmentLogRepo;

impl EnrollmentLogRepo {
    /// Append an attempt; `log.id` is ignored
    pub async fn insert<'e, E>(executor: E, log: &EnrollmentLog) -> PersistenceResult<i64>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let result = sqlx::query(
            r#"
            INSERT INTO enrollment_logs (member_id, device_id, finger_index, status, enrolled_at)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(log.member_id)
        .bind(log.device_id)
        .bind(i64::from(log.finger_index.get()))
        .bind(log.status.as_str())
        .bind(log.enrolled_at)
        .execute(executor)
        .await?;
        Ok(result.last_insert_rowid())
    }

    /// Attempts of a member, newest first
    pub async fn list_by_member<'e, E>(
        executor: E,
        member_id: i64,
    ) -> PersistenceResult<Vec<EnrollmentLog>>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query_as::<_, EnrollmentLogRow>(
            "SELECT * FROM enrollment_logs WHERE member_id = ? ORDER BY enrolled_at DESC, id DESC",
        )
        .bind(member_id)
        .fetch_all(executor)
        .await?
        .into_iter()
        .map(EnrollmentLog::try_from)
        .collect()
    }
}

// ============================================================================
// Attendance Repository
// ============================================================================

/// Filter for attendance queries; results are newest date first
#[derive(Debug, Clone)]
pub struct AttendanceFilter {
    pub member_id: Option<i64>,
    pub device_id: Option<i64>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub status: Option<AttendanceStatus>,
    pub offset: i64,
    pub limit: i64,
}

impl Default for AttendanceFilter {
    fn default() -> Self {
        Self {
            member_id: None,
            device_id: None,
            start_date: None,
            end_date: None,
            status: None,
            offset: 0,
            limit: DEFAULT_PAGE_SIZE,
        }
    }
}

/// Repository for table `attendance_records`
pub struct AttendanceRepo;

impl AttendanceRepo {
    /// The record of `member_id` on `date`, if any
    pub async fn find<'e, E>(
        executor: E,
        member_id: i64,
        date: NaiveDate,
    ) -> PersistenceResult<Option<AttendanceRecord>>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query_as::<_, AttendanceRow>(
            "SELECT * FROM attendance_records WHERE member_id = ? AND date = ?",
        )
        .bind(member_id)
        .bind(date)
        .fetch_optional(executor)
        .await?
        .map(AttendanceRecord::try_from)
        .transpose()
    }

    /// Insert or replace the record keyed by (member_id, date); returns its id
    pub async fn upsert<'e, E>(executor: E, record: &AttendanceRecord) -> PersistenceResult<i64>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let id = sqlx::query_scalar::<_, i64>(
            r#"
            INSERT INTO attendance_records (member_id, device_id, date, check_in_time,
                                            check_out_time, duration_minutes, status)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(member_id, date) DO UPDATE SET
                device_id = excluded.device_id,
                check_in_time = excluded.check_in_time,
                check_out_time = excluded.check_out_time,
                duration_minutes = excluded.duration_minutes,
                status = excluded.status
            RETURNING id
            "#,
        )
        .bind(record.member_id)
        .bind(record.device_id)
        .bind(record.date)
        .bind(record.check_in_time)
        .bind(record.check_out_time)
        .bind(record.duration_minutes)
        .bind(record.status.as_str())
        .fetch_one(executor)
        .await?;
        Ok(id)
    }

    pub async fn query<'e, E>(
        executor: E,
        filter: &AttendanceFilter,
    ) -> PersistenceResult<Vec<AttendanceRecord>>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let mut qb = QueryBuilder::<Sqlite>::new("SELECT * FROM attendance_records WHERE 1 = 1");
        if let Some(member_id) = filter.member_id {
            qb.push(" AND member_id = ").push_bind(member_id);
        }
        if let Some(device_id) = filter.device_id {
            qb.push(" AND device_id = ").push_bind(device_id);
        }
        if let Some(start) = filter.start_date {
            qb.push(" AND date >= ").push_bind(start);
        }
        if let Some(end) = filter.end_date {
            qb.push(" AND date <= ").push_bind(end);
        }
        if let Some(status) = filter.status {
            qb.push(" AND status = ").push_bind(status.as_str());
        }
        qb.push(" ORDER BY date DESC, id DESC LIMIT ")
            .push_bind(filter.limit)
            .push(" OFFSET ")
            .push_bind(filter.offset);

        qb.build_query_as::<AttendanceRow>()
            .fetch_all(executor)
            .await?
            .into_iter()
            .map(AttendanceRecord::try_from)
            .collect()
    }

    /// Every record dated within `[start, end]`, oldest first
    pub async fn list_range<'e, E>(
        executor: E,
        member_id: Option<i64>,
        start: NaiveDate,
        end: NaiveDate,
    ) -> PersistenceResult<Vec<AttendanceRecord>>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let mut qb = QueryBuilder::<Sqlite>::new("SELECT * FROM attendance_records WHERE date >= ");
        qb.push_bind(start).push(" AND date <= ").push_bind(end);
        if let Some(member_id) = member_id {
            qb.push(" AND member_id = ").push_bind(member_id);
        }
        qb.push(" ORDER BY date ASC, member_id ASC");

        qb.build_query_as::<AttendanceRow>()
            .fetch_all(executor)
            .await?
            .into_iter()
            .map(AttendanceRecord::try_from)
            .collect()
    }
}

// ============================================================================
// Database initialization
// ============================================================================

/// Create a connection pool, creating the database file if missing
pub async fn create_pool(database_url: &str, max_connections: u32) -> PersistenceResult<SqlitePool> {
    let options = SqliteConnectOptions::from_str(database_url)?
        .create_if_missing(true)
        .foreign_keys(true);
    let pool = SqlitePoolOptions::new()
        .max_connections(max_connections)
        .connect_with(options)
        .await?;
    Ok(pool)
}

/// Run embedded migrations
pub async fn run_migrations(pool: &SqlitePool) -> PersistenceResult<()> {
    sqlx::migrate!("../../migrations").run(pool).await?;
    Ok(())
}

/// Create a pool and bring the schema up to date
pub async fn init_database(database_url: &str, max_connections: u32) -> PersistenceResult<SqlitePool> {
    let pool = create_pool(database_url, max_connections).await?;
    run_migrations(&pool).await?;
    Ok(pool)
}

/// Private in-memory database on a single pinned connection
pub async fn init_in_memory() -> PersistenceResult<SqlitePool> {
    let options = SqliteConnectOptions::from_str("sqlite::memory:")?.foreign_keys(true);
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .min_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect_with(options)
        .await?;
    run_migrations(&pool).await?;
    Ok(pool)
}

#[cfg(test)]
mod tests {
    use super::*;
    use biogate_core::{BranchStatus, DaysOfWeek, MemberStatus};
    use chrono::NaiveTime;

    fn ts(day: u32, hour: u32, min: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 3, day)
            .and_then(|d| d.and_hms_opt(hour, min, 0))
            .unwrap()
    }

    fn date(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, day).unwrap()
    }

    async fn seed_member(pool: &SqlitePool, phone: &str) -> i64 {
        let member = Member::new(0, "Alice", phone, ts(1, 8, 0));
        MemberRepo::insert(pool, &member).await.unwrap()
    }

    async fn seed_device(pool: &SqlitePool, ip: &str) -> i64 {
        let device = Device::new(0, "Front Door", ip, ts(1, 8, 0));
        DeviceRepo::insert(pool, &device).await.unwrap()
    }

    #[tokio::test]
    async fn test_member_roundtrip() {
        let pool = init_in_memory().await.unwrap();
        let id = seed_member(&pool, "13800000001").await;

        let member = MemberRepo::find_by_id(&pool, id).await.unwrap().unwrap();
        assert_eq!(member.name, "Alice");
        assert_eq!(member.status, MemberStatus::Active);
        assert_eq!(member.created_at, ts(1, 8, 0));

        let by_phone = MemberRepo::find_by_phone(&pool, "13800000001").await.unwrap();
        assert_eq!(by_phone.map(|m| m.id), Some(id));
        assert!(MemberRepo::find_by_id(&pool, 999).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_member_duplicate_phone_rejected_by_schema() {
        let pool = init_in_memory().await.unwrap();
        seed_member(&pool, "13800000001").await;

        let dup = Member::new(0, "Eve", "13800000001", ts(1, 8, 0));
        let err = MemberRepo::insert(&pool, &dup).await.unwrap_err();
        assert!(err.is_database_error());
    }

    #[tokio::test]
    async fn test_member_list_filter() {
        let pool = init_in_memory().await.unwrap();
        seed_member(&pool, "13800000001").await;
        let bob = Member::new(0, "Bob", "13800000002", ts(1, 8, 0))
            .with_status(MemberStatus::Expired);
        MemberRepo::insert(&pool, &bob).await.unwrap();

        let expired = MemberFilter {
            status: Some("expired".to_string()),
            ..Default::default()
        };
        let rows = MemberRepo::list(&pool, &expired).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].name, "Bob");

        let search = MemberFilter {
            search: Some("0001".to_string()),
            ..Default::default()
        };
        let rows = MemberRepo::list(&pool, &search).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].name, "Alice");
        assert_eq!(MemberRepo::count(&pool).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_branch_dependents() {
        let pool = init_in_memory().await.unwrap();
        let branch = Branch {
            id: 0,
            name: "Headquarters".to_string(),
            code: "HQ".to_string(),
            address: None,
            manager: None,
            phone: None,
            status: BranchStatus::Active,
            created_at: ts(1, 8, 0),
            updated_at: ts(1, 8, 0),
        };
        let branch_id = BranchRepo::insert(&pool, &branch).await.unwrap();
        assert_eq!(BranchRepo::count_dependents(&pool, branch_id).await.unwrap(), 0);

        let member = Member::new(0, "Alice", "13800000001", ts(1, 8, 0)).with_branch(branch_id);
        MemberRepo::insert(&pool, &member).await.unwrap();
        assert_eq!(BranchRepo::count_dependents(&pool, branch_id).await.unwrap(), 1);

        let found = BranchRepo::find_by_code(&pool, "HQ").await.unwrap().unwrap();
        assert_eq!(found.id, branch_id);
    }

    #[tokio::test]
    async fn test_device_status_update() {
        let pool = init_in_memory().await.unwrap();
        let id = seed_device(&pool, "192.168.1.20").await;

        DeviceRepo::update_status(&pool, id, DeviceStatus::Online, Some(ts(2, 9, 0)), ts(2, 9, 0))
            .await
            .unwrap();
        let device = DeviceRepo::find_by_id(&pool, id).await.unwrap().unwrap();
        assert!(device.is_online());
        assert_eq!(device.last_heartbeat, Some(ts(2, 9, 0)));
        assert_eq!(device.port, 4370);

        // Status change without heartbeat keeps the previous stamp
        DeviceRepo::update_status(&pool, id, DeviceStatus::Offline, None, ts(2, 10, 0))
            .await
            .unwrap();
        let device = DeviceRepo::find_by_id(&pool, id).await.unwrap().unwrap();
        assert!(!device.is_online());
        assert_eq!(device.last_heartbeat, Some(ts(2, 9, 0)));

        let err = DeviceRepo::update_status(&pool, 999, DeviceStatus::Online, None, ts(2, 9, 0))
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_permission_order_and_active_filter() {
        let pool = init_in_memory().await.unwrap();
        let member_id = seed_member(&pool, "13800000001").await;
        let device_id = seed_device(&pool, "192.168.1.20").await;

        let first = PermissionRule::new(0, member_id, ts(1, 8, 0))
            .for_device(device_id)
            .on_days(DaysOfWeek::WEEKDAYS)
            .between_times(
                NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
                NaiveTime::from_hms_opt(18, 0, 0).unwrap(),
            );
        let first_id = PermissionRepo::insert(&pool, &first).await.unwrap();
        let second_id = PermissionRepo::insert(&pool, &PermissionRule::new(0, member_id, ts(1, 9, 0)))
            .await
            .unwrap();
        let third_id = PermissionRepo::insert(&pool, &PermissionRule::new(0, member_id, ts(1, 10, 0)))
            .await
            .unwrap();

        PermissionRepo::set_status(&pool, second_id, RuleStatus::Inactive, ts(1, 11, 0))
            .await
            .unwrap();

        let active = PermissionRepo::list_active(&pool, member_id).await.unwrap();
        let ids: Vec<i64> = active.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![first_id, third_id]);

        let stored = &active[0];
        assert_eq!(stored.device_id, Some(device_id));
        assert_eq!(stored.days_of_week, DaysOfWeek::WEEKDAYS);
        assert_eq!(stored.start_time, NaiveTime::from_hms_opt(9, 0, 0));

        assert_eq!(PermissionRepo::list_by_member(&pool, member_id).await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_access_log_query_newest_first() {
        let pool = init_in_memory().await.unwrap();
        let device_id = seed_device(&pool, "192.168.1.20").await;

        let outcomes = [
            (0, AccessOutcome::Allowed),
            (5, AccessOutcome::Denied),
            (10, AccessOutcome::Allowed),
        ];
        for (minute, status) in outcomes {
            let record = AccessDecisionRecord {
                id: 0,
                member_id: Some(1),
                device_id,
                access_type: AccessType::Entry,
                status,
                reason: (status == AccessOutcome::Denied).then(|| "member not found".to_string()),
                rule_id: None,
                recognition_method: "fingerprint".to_string(),
                access_time: ts(2, 9, minute),
            };
            AccessLogRepo::insert(&pool, &record).await.unwrap();
        }

        let all = AccessLogRepo::query(&pool, &AccessLogFilter::default()).await.unwrap();
        assert_eq!(all.len(), 3);
        assert_eq!(all[0].access_time, ts(2, 9, 10));

        let denied = AccessLogFilter {
            status: Some(AccessOutcome::Denied),
            ..Default::default()
        };
        let rows = AccessLogRepo::query(&pool, &denied).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].reason.as_deref(), Some("member not found"));

        let page = AccessLogFilter {
            offset: 1,
            limit: 1,
            ..Default::default()
        };
        let rows = AccessLogRepo::query(&pool, &page).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].access_time, ts(2, 9, 5));
    }

    #[tokio::test]
    async fn test_attendance_upsert_keeps_one_row_per_day() {
        let pool = init_in_memory().await.unwrap();
        let member_id = seed_member(&pool, "13800000001").await;

        let mut record = AttendanceRecord::checked_in(member_id, 1, ts(2, 9, 0));
        let id = AttendanceRepo::upsert(&pool, &record).await.unwrap();

        record.check_out_time = Some(ts(2, 9, 45));
        record.duration_minutes = Some(45);
        record.status = AttendanceStatus::Complete;
        let same_id = AttendanceRepo::upsert(&pool, &record).await.unwrap();
        assert_eq!(id, same_id);

        let stored = AttendanceRepo::find(&pool, member_id, date(2)).await.unwrap().unwrap();
        assert_eq!(stored.duration_minutes, Some(45));
        assert_eq!(stored.status, AttendanceStatus::Complete);

        AttendanceRepo::upsert(&pool, &AttendanceRecord::checked_in(member_id, 1, ts(3, 9, 0)))
            .await
            .unwrap();
        let range = AttendanceRepo::list_range(&pool, Some(member_id), date(1), date(2))
            .await
            .unwrap();
        assert_eq!(range.len(), 1);

        let newest_first = AttendanceRepo::query(&pool, &AttendanceFilter::default())
            .await
            .unwrap();
        assert_eq!(newest_first[0].date, date(3));
    }

    #[tokio::test]
    async fn test_template_one_per_finger() {
        let pool = init_in_memory().await.unwrap();
        let member_id = seed_member(&pool, "13800000001").await;
        let thumb = FingerIndex::new(1).unwrap();

        let template = FingerprintTemplate {
            id: 0,
            member_id,
            finger_index: thumb,
            template_data: b"TEMPLATE".to_vec(),
            created_at: ts(2, 9, 0),
        };
        let id = TemplateRepo::insert(&pool, &template).await.unwrap();

        let stored = TemplateRepo::find_by_finger(&pool, member_id, thumb)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.id, id);
        assert_eq!(stored.template_data, b"TEMPLATE".to_vec());

        let err = TemplateRepo::insert(&pool, &template).await.unwrap_err();
        assert!(err.is_database_error());

        let index = FingerIndex::new(6).unwrap();
        TemplateRepo::insert(
            &pool,
            &FingerprintTemplate {
                finger_index: index,
                ..template.clone()
            },
        )
        .await
        .unwrap();
        let fingers: Vec<u8> = TemplateRepo::list_by_member(&pool, member_id)
            .await
            .unwrap()
            .iter()
            .map(|t| t.finger_index.get())
            .collect();
        assert_eq!(fingers, vec![1, 6]);

        TemplateRepo::delete(&pool, id).await.unwrap();
        assert!(TemplateRepo::find_by_id(&pool, id).await.unwrap().is_none());
        assert!(TemplateRepo::delete(&pool, id).await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_templates_follow_member_delete() {
        let pool = init_in_memory().await.unwrap();
        let member_id = seed_member(&pool, "13800000001").await;
        let device_id = seed_device(&pool, "10.0.0.2").await;
        let template = FingerprintTemplate {
            id: 0,
            member_id,
            finger_index: FingerIndex::new(2).unwrap(),
            template_data: vec![0x01],
            created_at: ts(2, 9, 0),
        };
        TemplateRepo::insert(&pool, &template).await.unwrap();
        EnrollmentLogRepo::insert(
            &pool,
            &EnrollmentLog {
                id: 0,
                member_id,
                device_id,
                finger_index: template.finger_index,
                status: biogate_core::EnrollmentStatus::Success,
                enrolled_at: ts(2, 9, 0),
            },
        )
        .await
        .unwrap();

        MemberRepo::delete(&pool, member_id).await.unwrap();
        assert!(TemplateRepo::list_by_member(&pool, member_id)
            .await
            .unwrap()
            .is_empty());
        assert_eq!(
            EnrollmentLogRepo::list_by_member(&pool, member_id)
                .await
                .unwrap()
                .len(),
            1
        );
    }
}
