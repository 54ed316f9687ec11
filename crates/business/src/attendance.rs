//! Attendance Tracker
//!
//! One record per (member, day) moving `not_checked_in -> checked_in ->
//! checked_out`. Rejected transitions are returned as values and leave the
//! record untouched. Mutations of one key are serialized through
//! [`AttendanceLocks`].

use crate::error::{BusinessError, BusinessResult};
use crate::services::ServiceContext;
use anyhow::Context;
use biogate_core::{
    AttendanceRecord, AttendanceState, AttendanceStatus, CheckType, Notification,
};
use biogate_persistence::{AttendanceFilter, AttendanceRepo, DeviceRepo, MemberRepo};
use chrono::{NaiveDate, NaiveDateTime};
use dashmap::DashMap;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{debug, info};

// ============================================================================
// Per-key lock table
// ============================================================================

type DayKey = (i64, NaiveDate);

/// Lock table keyed by (member_id, date). Entries are created on demand and
/// dropped once no task holds or waits on them.
#[derive(Clone, Default)]
pub struct AttendanceLocks {
    inner: Arc<DashMap<DayKey, Arc<Mutex<()>>>>,
}

impl AttendanceLocks {
    pub async fn lock(&self, member_id: i64, date: NaiveDate) -> DayGuard {
        let key = (member_id, date);
        let mutex = self
            .inner
            .entry(key)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        let guard = mutex.lock_owned().await;
        DayGuard {
            key,
            guard: Some(guard),
            table: self.inner.clone(),
        }
    }

    /// Keys currently held or awaited
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

/// Held lock of one (member, day); releases on drop
pub struct DayGuard {
    key: DayKey,
    guard: Option<OwnedMutexGuard<()>>,
    table: Arc<DashMap<DayKey, Arc<Mutex<()>>>>,
}

impl Drop for DayGuard {
    fn drop(&mut self) {
        // release first so the count below only sees waiters
        self.guard.take();
        self.table
            .remove_if(&self.key, |_, mutex| Arc::strong_count(mutex) == 1);
    }
}

// ============================================================================
// Transitions
// ============================================================================

/// Why a check event was refused
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AttendanceRejection {
    AlreadyCheckedIn,
    NotCheckedIn,
    AlreadyCheckedOut,
    CheckOutBeforeCheckIn,
}

impl AttendanceRejection {
    pub fn message(&self) -> &'static str {
        match self {
            AttendanceRejection::AlreadyCheckedIn => "already checked in today",
            AttendanceRejection::NotCheckedIn => "must check in first",
            AttendanceRejection::AlreadyCheckedOut => "already checked out today",
            AttendanceRejection::CheckOutBeforeCheckIn => "check-out precedes check-in",
        }
    }
}

impl fmt::Display for AttendanceRejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

/// Result of a check event
#[derive(Debug, Clone, PartialEq)]
pub enum CheckOutcome {
    Accepted {
        record: AttendanceRecord,
        check_time: NaiveDateTime,
    },
    Rejected(AttendanceRejection),
}

impl CheckOutcome {
    pub fn is_accepted(&self) -> bool {
        matches!(self, CheckOutcome::Accepted { .. })
    }

    pub fn record(&self) -> Option<&AttendanceRecord> {
        match self {
            CheckOutcome::Accepted { record, .. } => Some(record),
            CheckOutcome::Rejected(_) => None,
        }
    }

    pub fn rejection(&self) -> Option<AttendanceRejection> {
        match self {
            CheckOutcome::Accepted { .. } => None,
            CheckOutcome::Rejected(r) => Some(*r),
        }
    }
}

fn check_in(
    existing: Option<AttendanceRecord>,
    member_id: i64,
    device_id: i64,
    at: NaiveDateTime,
) -> Result<AttendanceRecord, AttendanceRejection> {
    match existing {
        None => Ok(AttendanceRecord::checked_in(member_id, device_id, at)),
        Some(record) if record.check_in_time.is_some() => {
            Err(AttendanceRejection::AlreadyCheckedIn)
        }
        Some(record) if record.check_out_time.is_some() => {
            Err(AttendanceRejection::AlreadyCheckedOut)
        }
        Some(mut record) => {
            record.check_in_time = Some(at);
            record.device_id = device_id;
            record.status = AttendanceStatus::Incomplete;
            Ok(record)
        }
    }
}

fn check_out(
    existing: Option<AttendanceRecord>,
    device_id: i64,
    at: NaiveDateTime,
) -> Result<AttendanceRecord, AttendanceRejection> {
    let Some(mut record) = existing else {
        return Err(AttendanceRejection::NotCheckedIn);
    };
    let Some(checked_in) = record.check_in_time else {
        return Err(AttendanceRejection::NotCheckedIn);
    };
    if record.check_out_time.is_some() {
        return Err(AttendanceRejection::AlreadyCheckedOut);
    }
    if at < checked_in {
        return Err(AttendanceRejection::CheckOutBeforeCheckIn);
    }

    record.duration_minutes = record.elapsed_minutes(at);
    record.check_out_time = Some(at);
    record.device_id = device_id;
    record.status = AttendanceStatus::Complete;
    Ok(record)
}

// ============================================================================
// Service
// ============================================================================

/// Today's attendance of one member
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TodayStatus {
    pub member_id: i64,
    pub date: NaiveDate,
    pub state: AttendanceState,
    pub check_in_time: Option<NaiveDateTime>,
    pub check_out_time: Option<NaiveDateTime>,
    pub duration_minutes: Option<i64>,
}

pub struct AttendanceService<'a> {
    ctx: &'a ServiceContext,
}

impl<'a> AttendanceService<'a> {
    pub fn new(ctx: &'a ServiceContext) -> Self {
        Self { ctx }
    }

    pub async fn check_in(&self, member_id: i64, device_id: i64) -> BusinessResult<CheckOutcome> {
        self.record(CheckType::CheckIn, member_id, device_id).await
    }

    pub async fn check_out(&self, member_id: i64, device_id: i64) -> BusinessResult<CheckOutcome> {
        self.record(CheckType::CheckOut, member_id, device_id).await
    }

    /// Apply one check event under the (member, day) lock
    pub async fn record(
        &self,
        check: CheckType,
        member_id: i64,
        device_id: i64,
    ) -> BusinessResult<CheckOutcome> {
        if MemberRepo::find_by_id(self.ctx.pool(), member_id)
            .await?
            .is_none()
        {
            return Err(BusinessError::MemberNotFound(member_id).into());
        }
        if DeviceRepo::find_by_id(self.ctx.pool(), device_id)
            .await?
            .is_none()
        {
            return Err(BusinessError::DeviceNotFound(device_id).into());
        }

        let at = self.ctx.now();
        let date = at.date();
        let _guard = self.ctx.locks().lock(member_id, date).await;

        let existing = AttendanceRepo::find(self.ctx.pool(), member_id, date).await?;
        let transition = match check {
            CheckType::CheckIn => check_in(existing, member_id, device_id, at),
            CheckType::CheckOut => check_out(existing, device_id, at),
        };

        let mut record = match transition {
            Ok(record) => record,
            Err(rejection) => {
                debug!(member_id, %date, %check, reason = %rejection, "Attendance rejected");
                return Ok(CheckOutcome::Rejected(rejection));
            }
        };

        record.id = AttendanceRepo::upsert(self.ctx.pool(), &record)
            .await
            .context("Failed to store attendance record")?;

        info!(
            member_id,
            device_id,
            %date,
            state = %record.state(),
            duration_minutes = ?record.duration_minutes,
            "Attendance recorded"
        );
        self.ctx.notify(Notification::attendance(check, &record, at));

        Ok(CheckOutcome::Accepted {
            record,
            check_time: at,
        })
    }

    /// State of `member_id` for the clock's current day
    pub async fn today(&self, member_id: i64) -> BusinessResult<TodayStatus> {
        if MemberRepo::find_by_id(self.ctx.pool(), member_id)
            .await?
            .is_none()
        {
            return Err(BusinessError::MemberNotFound(member_id).into());
        }

        let date = self.ctx.now().date();
        let record = AttendanceRepo::find(self.ctx.pool(), member_id, date).await?;
        Ok(match record {
            Some(r) => TodayStatus {
                member_id,
                date,
                state: r.state(),
                check_in_time: r.check_in_time,
                check_out_time: r.check_out_time,
                duration_minutes: r.duration_minutes,
            },
            None => TodayStatus {
                member_id,
                date,
                state: AttendanceState::NotCheckedIn,
                check_in_time: None,
                check_out_time: None,
                duration_minutes: None,
            },
        })
    }

    /// Records matching `filter`, newest date first
    pub async fn records(&self, filter: &AttendanceFilter) -> BusinessResult<Vec<AttendanceRecord>> {
        Ok(AttendanceRepo::query(self.ctx.pool(), filter).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::TestEnv;
    use biogate_core::NotificationKind;
    use chrono::TimeDelta;

    fn at(hour: u32, min: u32, sec: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 3, 2)
            .unwrap()
            .and_hms_opt(hour, min, sec)
            .unwrap()
    }

    #[test]
    fn test_transitions() {
        let open = check_in(None, 1, 2, at(9, 0, 0)).unwrap();
        assert_eq!(open.state(), AttendanceState::CheckedIn);
        assert_eq!(open.status, AttendanceStatus::Incomplete);

        assert_eq!(
            check_in(Some(open.clone()), 1, 2, at(9, 5, 0)),
            Err(AttendanceRejection::AlreadyCheckedIn)
        );
        assert_eq!(
            check_out(None, 2, at(9, 5, 0)),
            Err(AttendanceRejection::NotCheckedIn)
        );
        assert_eq!(
            check_out(Some(open.clone()), 2, at(8, 59, 0)),
            Err(AttendanceRejection::CheckOutBeforeCheckIn)
        );

        let closed = check_out(Some(open), 3, at(10, 30, 59)).unwrap();
        assert_eq!(closed.duration_minutes, Some(90));
        assert_eq!(closed.device_id, 3);
        assert_eq!(closed.status, AttendanceStatus::Complete);

        assert_eq!(
            check_out(Some(closed.clone()), 2, at(11, 0, 0)),
            Err(AttendanceRejection::AlreadyCheckedOut)
        );
        // a completed day is never re-opened
        assert_eq!(
            check_in(Some(closed), 1, 2, at(12, 0, 0)),
            Err(AttendanceRejection::AlreadyCheckedIn)
        );
    }

    #[test]
    fn test_record_without_check_in_is_filled() {
        let mut blank = AttendanceRecord::checked_in(1, 2, at(9, 0, 0));
        blank.check_in_time = None;
        let record = check_in(Some(blank), 1, 4, at(9, 30, 0)).unwrap();
        assert_eq!(record.check_in_time, Some(at(9, 30, 0)));
        assert_eq!(record.device_id, 4);
    }

    #[tokio::test]
    async fn test_check_in_then_out() {
        let env = TestEnv::new().await;
        let member = env.member("Alice", "138").await;
        let device = env.device("Front Door", "10.0.0.2").await;
        let service = AttendanceService::new(&env.ctx);

        let first = service.check_in(member.id, device.id).await.unwrap();
        assert!(first.is_accepted());

        env.set_time(9, 45);
        let out = service.check_out(member.id, device.id).await.unwrap();
        let record = out.record().unwrap();
        assert_eq!(record.check_in_time, Some(at(9, 0, 0)));
        assert_eq!(record.check_out_time, Some(at(9, 45, 0)));
        assert_eq!(record.duration_minutes, Some(45));
        assert_eq!(record.status, AttendanceStatus::Complete);

        env.set_time(10, 0);
        let again = service.check_in(member.id, device.id).await.unwrap();
        assert_eq!(again.rejection(), Some(AttendanceRejection::AlreadyCheckedIn));
        assert_eq!(again.rejection().unwrap().message(), "already checked in today");

        // the rejected check-in left the record alone
        let stored = AttendanceRepo::find(env.ctx.pool(), member.id, at(0, 0, 0).date())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.check_out_time, Some(at(9, 45, 0)));
        assert_eq!(stored.duration_minutes, Some(45));
    }

    #[tokio::test]
    async fn test_double_check_in_and_early_check_out() {
        let env = TestEnv::new().await;
        let member = env.member("Alice", "138").await;
        let device = env.device("Front Door", "10.0.0.2").await;
        let service = AttendanceService::new(&env.ctx);

        let out = service.check_out(member.id, device.id).await.unwrap();
        assert_eq!(out.rejection(), Some(AttendanceRejection::NotCheckedIn));

        service.check_in(member.id, device.id).await.unwrap();
        let twice = service.check_in(member.id, device.id).await.unwrap();
        assert_eq!(twice.rejection(), Some(AttendanceRejection::AlreadyCheckedIn));

        let out = service.check_out(member.id, device.id).await.unwrap();
        assert_eq!(out.record().unwrap().duration_minutes, Some(0));
        let out = service.check_out(member.id, device.id).await.unwrap();
        assert_eq!(out.rejection(), Some(AttendanceRejection::AlreadyCheckedOut));
    }

    #[tokio::test]
    async fn test_unknown_member_or_device() {
        let env = TestEnv::new().await;
        let member = env.member("Alice", "138").await;
        let device = env.device("Front Door", "10.0.0.2").await;
        let service = AttendanceService::new(&env.ctx);

        let err = service.check_in(99, device.id).await.unwrap_err();
        assert_eq!(BusinessError::code_of(&err), Some("MEMBER_NOT_FOUND"));
        let err = service.check_in(member.id, 99).await.unwrap_err();
        assert_eq!(BusinessError::code_of(&err), Some("DEVICE_NOT_FOUND"));
    }

    #[tokio::test]
    async fn test_today_status() {
        let env = TestEnv::new().await;
        let member = env.member("Alice", "138").await;
        let device = env.device("Front Door", "10.0.0.2").await;
        let service = AttendanceService::new(&env.ctx);

        let today = service.today(member.id).await.unwrap();
        assert_eq!(today.state, AttendanceState::NotCheckedIn);

        service.check_in(member.id, device.id).await.unwrap();
        let today = service.today(member.id).await.unwrap();
        assert_eq!(today.state, AttendanceState::CheckedIn);
        assert_eq!(today.check_in_time, Some(at(9, 0, 0)));

        // next day starts fresh
        env.clock.advance(TimeDelta::days(1));
        let tomorrow = service.today(member.id).await.unwrap();
        assert_eq!(tomorrow.state, AttendanceState::NotCheckedIn);
    }

    #[tokio::test]
    async fn test_records_query_and_notification() {
        let env = TestEnv::new().await;
        let mut rx = env.subscribe_channel().await;
        let alice = env.member("Alice", "138").await;
        let bob = env.member("Bob", "139").await;
        let device = env.device("Front Door", "10.0.0.2").await;
        let service = AttendanceService::new(&env.ctx);

        service.check_in(alice.id, device.id).await.unwrap();
        service.check_in(bob.id, device.id).await.unwrap();

        let notification = rx.recv().await.unwrap();
        assert_eq!(notification.kind, NotificationKind::CheckIn);

        let all = service.records(&AttendanceFilter::default()).await.unwrap();
        assert_eq!(all.len(), 2);

        let filter = AttendanceFilter {
            member_id: Some(bob.id),
            ..Default::default()
        };
        let bobs = service.records(&filter).await.unwrap();
        assert_eq!(bobs.len(), 1);
        assert_eq!(bobs[0].member_id, bob.id);
    }

    #[tokio::test]
    async fn test_concurrent_check_ins_create_one_record() {
        let env = TestEnv::new().await;
        let member = env.member("Alice", "138").await;
        let device = env.device("Front Door", "10.0.0.2").await;
        let service = AttendanceService::new(&env.ctx);

        let (a, b) = tokio::join!(
            service.check_in(member.id, device.id),
            service.check_in(member.id, device.id),
        );
        let outcomes = [a.unwrap(), b.unwrap()];
        let accepted = outcomes.iter().filter(|o| o.is_accepted()).count();
        assert_eq!(accepted, 1);

        let records = service.records(&AttendanceFilter::default()).await.unwrap();
        assert_eq!(records.len(), 1);
        assert!(env.ctx.locks().is_empty());
    }

    #[tokio::test]
    async fn test_lock_serializes_same_key() {
        let locks = AttendanceLocks::default();
        let date = at(0, 0, 0).date();

        let guard = locks.lock(1, date).await;
        assert_eq!(locks.len(), 1);

        let other_key = locks.lock(2, date).await;
        assert_eq!(locks.len(), 2);
        drop(other_key);

        let contender = locks.clone();
        let waiter = tokio::spawn(async move {
            let _g = contender.lock(1, date).await;
        });
        tokio::task::yield_now().await;
        assert!(!waiter.is_finished());

        drop(guard);
        waiter.await.unwrap();
        assert!(locks.is_empty());
    }
}
