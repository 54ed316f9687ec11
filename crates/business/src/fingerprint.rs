//! Fingerprint enrollment and template management
//!
//! Capture happens on the reader through [`DeviceLink::enroll`]; this service
//! keeps the resulting templates and logs every capture attempt. Attempts
//! rejected before reaching the reader (unknown member or device, offline
//! device, finger already enrolled) are errors and leave no trace.
//!
//! [`DeviceLink::enroll`]: crate::device::DeviceLink::enroll

use crate::error::{BusinessError, BusinessResult};
use crate::services::ServiceContext;
use anyhow::Context;
use biogate_core::{
    EnrollmentLog, EnrollmentStatus, FingerIndex, FingerprintTemplate, Notification,
};
use biogate_persistence::{DeviceRepo, EnrollmentLogRepo, MemberRepo, TemplateRepo};
use tracing::{info, warn};

/// Stored template plus the log entry of its capture
#[derive(Debug, Clone)]
pub struct Enrollment {
    pub template: FingerprintTemplate,
    pub log: EnrollmentLog,
}

pub struct FingerprintService<'a> {
    ctx: &'a ServiceContext,
}

impl<'a> FingerprintService<'a> {
    pub fn new(ctx: &'a ServiceContext) -> Self {
        Self { ctx }
    }

    /// Capture `finger_index` (1-10) of a member on an online device.
    ///
    /// A capture failure on the reader is logged as a failed attempt and
    /// surfaces as `DEVICE_LINK_FAILED`.
    pub async fn enroll(
        &self,
        member_id: i64,
        device_id: i64,
        finger_index: u8,
    ) -> BusinessResult<Enrollment> {
        let finger = FingerIndex::new(finger_index).map_err(BusinessError::from)?;

        MemberRepo::find_by_id(self.ctx.pool(), member_id)
            .await?
            .ok_or(BusinessError::MemberNotFound(member_id))?;
        let device = DeviceRepo::find_by_id(self.ctx.pool(), device_id)
            .await?
            .ok_or(BusinessError::DeviceNotFound(device_id))?;
        if !device.is_online() {
            return Err(BusinessError::DeviceOffline(device_id).into());
        }
        self.require_free_finger(member_id, finger).await?;

        let captured = match self.ctx.link().enroll(&device, finger).await {
            Ok(data) if data.is_empty() => Err("reader returned an empty template".to_string()),
            Ok(data) => Ok(data),
            Err(e) => Err(e.to_string()),
        };

        let now = self.ctx.now();
        let mut log = EnrollmentLog {
            id: 0,
            member_id,
            device_id,
            finger_index: finger,
            status: EnrollmentStatus::Failed,
            enrolled_at: now,
        };

        let template_data = match captured {
            Ok(data) => data,
            Err(reason) => {
                log.id = EnrollmentLogRepo::insert(self.ctx.pool(), &log)
                    .await
                    .context("Failed to write enrollment log")?;
                warn!(
                    member_id,
                    device_id,
                    finger = %finger,
                    error = %reason,
                    "Enrollment failed"
                );
                self.ctx.notify(Notification::enrollment(&log, None));
                return Err(BusinessError::link_failed(device_id, reason).into());
            }
        };

        let mut template = FingerprintTemplate {
            id: 0,
            member_id,
            finger_index: finger,
            template_data,
            created_at: now,
        };
        log.status = EnrollmentStatus::Success;

        let mut tx = self
            .ctx
            .pool()
            .begin()
            .await
            .context("Failed to begin enrollment transaction")?;
        template.id = TemplateRepo::insert(&mut *tx, &template)
            .await
            .context("Failed to insert fingerprint template")?;
        log.id = EnrollmentLogRepo::insert(&mut *tx, &log)
            .await
            .context("Failed to write enrollment log")?;
        tx.commit().await.context("Failed to commit enrollment")?;

        info!(
            member_id,
            device_id,
            finger = %finger,
            template_id = template.id,
            "Fingerprint enrolled"
        );
        self.ctx.notify(Notification::enrollment(&log, Some(template.id)));

        Ok(Enrollment { template, log })
    }

    /// Templates of an existing member, by finger
    pub async fn templates(&self, member_id: i64) -> BusinessResult<Vec<FingerprintTemplate>> {
        MemberRepo::find_by_id(self.ctx.pool(), member_id)
            .await?
            .ok_or(BusinessError::MemberNotFound(member_id))?;
        Ok(TemplateRepo::list_by_member(self.ctx.pool(), member_id).await?)
    }

    pub async fn delete(&self, template_id: i64) -> BusinessResult<()> {
        let template = TemplateRepo::find_by_id(self.ctx.pool(), template_id)
            .await?
            .ok_or(BusinessError::TemplateNotFound(template_id))?;
        TemplateRepo::delete(self.ctx.pool(), template_id)
            .await
            .context("Failed to delete fingerprint template")?;
        info!(
            template_id,
            member_id = template.member_id,
            finger = %template.finger_index,
            "Fingerprint template deleted"
        );
        Ok(())
    }

    /// Enrollment attempts of a member, newest first
    pub async fn enrollments(&self, member_id: i64) -> BusinessResult<Vec<EnrollmentLog>> {
        Ok(EnrollmentLogRepo::list_by_member(self.ctx.pool(), member_id).await?)
    }

    async fn require_free_finger(&self, member_id: i64, finger: FingerIndex) -> BusinessResult<()> {
        match TemplateRepo::find_by_finger(self.ctx.pool(), member_id, finger).await? {
            Some(_) => Err(BusinessError::DuplicateFingerprint {
                member_id,
                finger_index: finger.get(),
            }
            .into()),
            None => Ok(()),
        }
    }
}
