//! Access service - runs the Authorization Engine against the Rule Store
//!
//! Every evaluation against a known device writes exactly one audit entry
//! in the same transaction that read the member and rules. The decision is
//! returned only after that transaction commits.

use crate::engine::{evaluate, Decision};
use crate::error::{BusinessError, BusinessResult};
use crate::services::ServiceContext;
use anyhow::Context;
use biogate_core::{
    AccessDecisionRecord, AccessOutcome, AccessType, EvalInstant, Notification, NotificationKind,
    RecognitionOutcome,
};
use biogate_persistence::{
    AccessLogFilter, AccessLogRepo, DeviceRepo, MemberRepo, PermissionRepo, RecognitionLogRepo,
    RecognitionLogRow,
};
use serde_json::json;
use tracing::info;

/// One passage attempt
#[derive(Debug, Clone)]
pub struct AccessRequest {
    /// `None` when no member was identified
    pub member_id: Option<i64>,
    pub device_id: i64,
    pub access_type: AccessType,
    pub recognition_method: String,
}

impl AccessRequest {
    pub fn new(member_id: Option<i64>, device_id: i64, access_type: AccessType) -> Self {
        Self {
            member_id,
            device_id,
            access_type,
            recognition_method: "fingerprint".to_string(),
        }
    }

    pub fn with_method(mut self, method: &str) -> Self {
        self.recognition_method = method.to_string();
        self
    }
}

/// Decision plus the audit entry written for it
#[derive(Debug, Clone)]
pub struct AccessResult {
    pub decision: Decision,
    pub record: AccessDecisionRecord,
}

impl AccessResult {
    pub fn is_allowed(&self) -> bool {
        self.decision.is_allowed()
    }
}

pub struct AccessService<'a> {
    ctx: &'a ServiceContext,
}

impl<'a> AccessService<'a> {
    pub fn new(ctx: &'a ServiceContext) -> Self {
        Self { ctx }
    }

    /// Evaluate a passage attempt and audit it.
    ///
    /// Denials are values. Only an unknown device or a storage failure is an
    /// error, and in both cases nothing is written.
    pub async fn authorize(&self, request: &AccessRequest) -> BusinessResult<AccessResult> {
        self.decide(request, None).await
    }

    /// Evaluate the member resolved by a biometric match, or record a
    /// no-match as a denial without member.
    pub async fn recognize(
        &self,
        device_id: i64,
        access_type: AccessType,
        outcome: RecognitionOutcome,
        method: &str,
    ) -> BusinessResult<AccessResult> {
        let request = AccessRequest::new(outcome.member_id(), device_id, access_type)
            .with_method(method);
        self.decide(&request, Some(outcome)).await
    }

    /// Audit entries, newest first
    pub async fn logs(&self, filter: &AccessLogFilter) -> BusinessResult<Vec<AccessDecisionRecord>> {
        Ok(AccessLogRepo::query(self.ctx.pool(), filter).await?)
    }

    pub async fn recognitions(
        &self,
        device_id: Option<i64>,
        limit: i64,
    ) -> BusinessResult<Vec<RecognitionLogRow>> {
        Ok(RecognitionLogRepo::list_recent(self.ctx.pool(), device_id, limit).await?)
    }

    async fn decide(
        &self,
        request: &AccessRequest,
        recognition: Option<RecognitionOutcome>,
    ) -> BusinessResult<AccessResult> {
        let at = self.ctx.now();
        let instant = EvalInstant::from_datetime(at);

        let mut tx = self
            .ctx
            .pool()
            .begin()
            .await
            .context("Failed to begin access transaction")?;

        let device = DeviceRepo::find_by_id(&mut *tx, request.device_id)
            .await?
            .ok_or(BusinessError::DeviceNotFound(request.device_id))?;

        let member = match request.member_id {
            Some(id) => MemberRepo::find_by_id(&mut *tx, id).await?,
            None => None,
        };
        let rules = match &member {
            Some(m) if m.is_active() => PermissionRepo::list_active(&mut *tx, m.id).await?,
            _ => Vec::new(),
        };

        let decision = evaluate(member.as_ref(), &rules, device.id, &instant);

        let mut record = AccessDecisionRecord {
            id: 0,
            // only a resolved member is referenced
            member_id: member.as_ref().map(|m| m.id),
            device_id: device.id,
            access_type: request.access_type,
            status: if decision.is_allowed() {
                AccessOutcome::Allowed
            } else {
                AccessOutcome::Denied
            },
            reason: decision.reason().map(|r| r.as_str().to_string()),
            rule_id: decision.rule_id(),
            recognition_method: request.recognition_method.clone(),
            access_time: at,
        };
        record.id = AccessLogRepo::insert(&mut *tx, &record)
            .await
            .context("Failed to write access log")?;

        let recognition_row = match recognition {
            Some(outcome) => {
                let row = RecognitionLogRow {
                    id: 0,
                    member_id: record.member_id,
                    device_id: device.id,
                    matched: matches!(outcome, RecognitionOutcome::Matched { .. }),
                    confidence: i64::from(outcome.confidence()),
                    access_log_id: Some(record.id),
                    recognized_at: at,
                };
                RecognitionLogRepo::insert(&mut *tx, &row)
                    .await
                    .context("Failed to write recognition log")?;
                Some(row)
            }
            None => None,
        };

        tx.commit()
            .await
            .context("Failed to commit access decision")?;

        info!(
            access_log_id = record.id,
            member_id = ?record.member_id,
            device = %device.name,
            access_type = %record.access_type,
            outcome = %record.status,
            reason = record.reason.as_deref().unwrap_or(""),
            "Access evaluated"
        );
        if let Some(row) = recognition_row {
            self.ctx.notify(Notification::new(
                NotificationKind::Recognition,
                json!({
                    "device_id": row.device_id,
                    "member_id": row.member_id,
                    "matched": row.matched,
                    "confidence": row.confidence,
                    "access_log_id": row.access_log_id,
                }),
                at,
            ));
        }
        self.ctx.notify(Notification::access_decision(&record));

        Ok(AccessResult { decision, record })
    }
}
