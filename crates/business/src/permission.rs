//! Permission rule administration

use crate::error::{BusinessError, BusinessResult};
use crate::services::ServiceContext;
use anyhow::Context;
use biogate_core::{DaysOfWeek, PermissionRule, RuleStatus};
use biogate_persistence::{DeviceRepo, MemberRepo, PermissionRepo};
use chrono::{NaiveDate, NaiveTime};
use tracing::info;

/// Input for [`PermissionService::grant`]
#[derive(Debug, Clone)]
pub struct NewPermission {
    pub member_id: i64,
    /// `None` grants every device
    pub device_id: Option<i64>,
    pub permission_type: String,
    pub start_time: Option<NaiveTime>,
    pub end_time: Option<NaiveTime>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub days_of_week: DaysOfWeek,
}

impl NewPermission {
    /// Unrestricted "full" grant
    pub fn new(member_id: i64) -> Self {
        Self {
            member_id,
            device_id: None,
            permission_type: "full".to_string(),
            start_time: None,
            end_time: None,
            start_date: None,
            end_date: None,
            days_of_week: DaysOfWeek::ALL,
        }
    }
}

/// Partial update; `None` leaves a field unchanged
#[derive(Debug, Clone, Default)]
pub struct PermissionUpdate {
    pub device_id: Option<i64>,
    pub permission_type: Option<String>,
    pub start_time: Option<NaiveTime>,
    pub end_time: Option<NaiveTime>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub days_of_week: Option<DaysOfWeek>,
    pub status: Option<RuleStatus>,
}

pub struct PermissionService<'a> {
    ctx: &'a ServiceContext,
}

impl<'a> PermissionService<'a> {
    pub fn new(ctx: &'a ServiceContext) -> Self {
        Self { ctx }
    }

    /// Grant a rule to an existing member, optionally for one device
    pub async fn grant(&self, input: NewPermission) -> BusinessResult<PermissionRule> {
        if MemberRepo::find_by_id(self.ctx.pool(), input.member_id)
            .await?
            .is_none()
        {
            return Err(BusinessError::MemberNotFound(input.member_id).into());
        }
        if let Some(device_id) = input.device_id {
            self.require_device(device_id).await?;
        }

        let mut rule = PermissionRule::new(0, input.member_id, self.ctx.now());
        rule.device_id = input.device_id;
        rule.permission_type = input.permission_type;
        rule.start_time = input.start_time;
        rule.end_time = input.end_time;
        rule.start_date = input.start_date;
        rule.end_date = input.end_date;
        rule.days_of_week = input.days_of_week;
        check_rule(&rule)?;

        rule.id = PermissionRepo::insert(self.ctx.pool(), &rule)
            .await
            .context("Failed to insert permission")?;

        info!(
            permission_id = rule.id,
            member_id = rule.member_id,
            device_id = ?rule.device_id,
            days = %rule.days_of_week,
            "Permission granted"
        );
        Ok(rule)
    }

    pub async fn update(&self, id: i64, update: PermissionUpdate) -> BusinessResult<PermissionRule> {
        let mut rule = self.get(id).await?;

        if let Some(device_id) = update.device_id {
            self.require_device(device_id).await?;
            rule.device_id = Some(device_id);
        }
        if let Some(permission_type) = update.permission_type {
            rule.permission_type = permission_type;
        }
        if update.start_time.is_some() {
            rule.start_time = update.start_time;
        }
        if update.end_time.is_some() {
            rule.end_time = update.end_time;
        }
        if update.start_date.is_some() {
            rule.start_date = update.start_date;
        }
        if update.end_date.is_some() {
            rule.end_date = update.end_date;
        }
        if let Some(days) = update.days_of_week {
            rule.days_of_week = days;
        }
        if let Some(status) = update.status {
            rule.status = status;
        }
        check_rule(&rule)?;

        rule.updated_at = self.ctx.now();
        PermissionRepo::update(self.ctx.pool(), &rule)
            .await
            .context("Failed to update permission")?;
        Ok(rule)
    }

    /// Enable or disable a rule without touching its bounds
    pub async fn set_status(&self, id: i64, status: RuleStatus) -> BusinessResult<PermissionRule> {
        let mut rule = self.get(id).await?;
        rule.status = status;
        rule.updated_at = self.ctx.now();

        PermissionRepo::set_status(self.ctx.pool(), id, status, rule.updated_at).await?;
        info!(permission_id = id, status = %status, "Permission status changed");
        Ok(rule)
    }

    pub async fn revoke(&self, id: i64) -> BusinessResult<()> {
        self.get(id).await?;
        PermissionRepo::delete(self.ctx.pool(), id)
            .await
            .context("Failed to delete permission")?;
        info!(permission_id = id, "Permission revoked");
        Ok(())
    }

    pub async fn get(&self, id: i64) -> BusinessResult<PermissionRule> {
        PermissionRepo::find_by_id(self.ctx.pool(), id)
            .await?
            .ok_or_else(|| BusinessError::PermissionNotFound(id).into())
    }

    /// Every rule of a member, active or not, in creation order
    pub async fn list_for_member(&self, member_id: i64) -> BusinessResult<Vec<PermissionRule>> {
        if MemberRepo::find_by_id(self.ctx.pool(), member_id)
            .await?
            .is_none()
        {
            return Err(BusinessError::MemberNotFound(member_id).into());
        }
        Ok(PermissionRepo::list_by_member(self.ctx.pool(), member_id).await?)
    }

    async fn require_device(&self, device_id: i64) -> BusinessResult<()> {
        match DeviceRepo::find_by_id(self.ctx.pool(), device_id).await? {
            Some(_) => Ok(()),
            None => Err(BusinessError::DeviceNotFound(device_id).into()),
        }
    }
}

fn check_rule(rule: &PermissionRule) -> Result<(), BusinessError> {
    if rule.days_of_week.is_empty() {
        return Err(BusinessError::InvalidInput(
            "days_of_week names no day".to_string(),
        ));
    }
    rule.validate()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::TestEnv;

    fn time(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    #[tokio::test]
    async fn test_grant_requires_member_and_device() {
        let env = TestEnv::new().await;
        let service = PermissionService::new(&env.ctx);

        let err = service.grant(NewPermission::new(5)).await.unwrap_err();
        assert_eq!(BusinessError::code_of(&err), Some("MEMBER_NOT_FOUND"));

        let member = env.member("Alice", "138").await;
        let mut input = NewPermission::new(member.id);
        input.device_id = Some(99);
        let err = service.grant(input).await.unwrap_err();
        assert_eq!(BusinessError::code_of(&err), Some("DEVICE_NOT_FOUND"));
    }

    #[tokio::test]
    async fn test_grant_defaults() {
        let env = TestEnv::new().await;
        let member = env.member("Alice", "138").await;
        let rule = PermissionService::new(&env.ctx)
            .grant(NewPermission::new(member.id))
            .await
            .unwrap();

        assert_eq!(rule.permission_type, "full");
        assert_eq!(rule.days_of_week.to_string(), "1234567");
        assert_eq!(rule.status, RuleStatus::Active);
    }

    #[tokio::test]
    async fn test_invalid_bounds_rejected() {
        let env = TestEnv::new().await;
        let member = env.member("Alice", "138").await;
        let service = PermissionService::new(&env.ctx);

        let mut input = NewPermission::new(member.id);
        input.start_time = Some(time(18, 0));
        input.end_time = Some(time(9, 0));
        let err = service.grant(input).await.unwrap_err();
        assert_eq!(BusinessError::code_of(&err), Some("INVALID_INPUT"));

        let mut input = NewPermission::new(member.id);
        input.days_of_week = DaysOfWeek::NONE;
        let err = service.grant(input).await.unwrap_err();
        assert_eq!(BusinessError::code_of(&err), Some("INVALID_INPUT"));
    }

    #[tokio::test]
    async fn test_update_status_revoke() {
        let env = TestEnv::new().await;
        let member = env.member("Alice", "138").await;
        let device = env.device("Front Door", "10.0.0.2").await;
        let service = PermissionService::new(&env.ctx);
        let rule = service.grant(NewPermission::new(member.id)).await.unwrap();

        let updated = service
            .update(
                rule.id,
                PermissionUpdate {
                    device_id: Some(device.id),
                    days_of_week: Some(DaysOfWeek::WEEKDAYS),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.device_id, Some(device.id));

        let disabled = service.set_status(rule.id, RuleStatus::Inactive).await.unwrap();
        assert!(!disabled.is_active());
        let stored = service.get(rule.id).await.unwrap();
        assert_eq!(stored.status, RuleStatus::Inactive);
        assert_eq!(stored.days_of_week, DaysOfWeek::WEEKDAYS);

        service.revoke(rule.id).await.unwrap();
        for err in [
            service.revoke(rule.id).await.unwrap_err(),
            service
                .set_status(rule.id, RuleStatus::Active)
                .await
                .unwrap_err(),
            service
                .update(rule.id, PermissionUpdate::default())
                .await
                .unwrap_err(),
        ] {
            assert_eq!(BusinessError::code_of(&err), Some("PERMISSION_NOT_FOUND"));
        }
    }

    #[tokio::test]
    async fn test_list_in_creation_order() {
        let env = TestEnv::new().await;
        let member = env.member("Alice", "138").await;
        let service = PermissionService::new(&env.ctx);
        let first = service.grant(NewPermission::new(member.id)).await.unwrap();
        let second = service.grant(NewPermission::new(member.id)).await.unwrap();

        let rules = service.list_for_member(member.id).await.unwrap();
        let ids: Vec<i64> = rules.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![first.id, second.id]);
    }
}
