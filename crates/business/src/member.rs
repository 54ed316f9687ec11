//! Member administration

use crate::error::{BusinessError, BusinessResult};
use crate::services::ServiceContext;
use anyhow::Context;
use biogate_core::{Member, MemberStatus};
use biogate_persistence::{BranchRepo, MemberFilter, MemberRepo};
use chrono::NaiveDate;
use tracing::info;

/// Input for [`MemberService::create`]
#[derive(Debug, Clone)]
pub struct NewMember {
    pub name: String,
    pub phone: String,
    pub email: Option<String>,
    pub status: MemberStatus,
    pub branch_id: Option<i64>,
    pub member_number: Option<String>,
    pub membership_type: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

impl NewMember {
    /// Active member with only the required fields
    pub fn new(name: &str, phone: &str) -> Self {
        Self {
            name: name.to_string(),
            phone: phone.to_string(),
            email: None,
            status: MemberStatus::Active,
            branch_id: None,
            member_number: None,
            membership_type: None,
            start_date: None,
            end_date: None,
        }
    }
}

/// Partial update; `None` leaves a field unchanged
#[derive(Debug, Clone, Default)]
pub struct MemberUpdate {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub status: Option<MemberStatus>,
    pub branch_id: Option<i64>,
    pub member_number: Option<String>,
    pub membership_type: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

/// Member Service - enrolment and membership changes
pub struct MemberService<'a> {
    ctx: &'a ServiceContext,
}

impl<'a> MemberService<'a> {
    pub fn new(ctx: &'a ServiceContext) -> Self {
        Self { ctx }
    }

    pub async fn create(&self, input: NewMember) -> BusinessResult<Member> {
        validate_fields(&input.name, &input.phone, input.start_date, input.end_date)?;

        if MemberRepo::find_by_phone(self.ctx.pool(), &input.phone)
            .await?
            .is_some()
        {
            return Err(BusinessError::DuplicatePhone(input.phone).into());
        }
        if let Some(branch_id) = input.branch_id {
            self.require_branch(branch_id).await?;
        }

        let now = self.ctx.now();
        let mut member = Member::new(0, &input.name, &input.phone, now).with_status(input.status);
        member.email = input.email;
        member.branch_id = input.branch_id;
        member.member_number = input.member_number;
        member.membership_type = input.membership_type;
        member.start_date = input.start_date;
        member.end_date = input.end_date;

        member.id = MemberRepo::insert(self.ctx.pool(), &member)
            .await
            .context("Failed to insert member")?;

        info!(member_id = member.id, name = %member.name, "Member created");
        Ok(member)
    }

    pub async fn update(&self, id: i64, update: MemberUpdate) -> BusinessResult<Member> {
        let mut member = self.get(id).await?;

        if let Some(phone) = update.phone {
            if phone != member.phone {
                if let Some(other) = MemberRepo::find_by_phone(self.ctx.pool(), &phone).await? {
                    if other.id != id {
                        return Err(BusinessError::DuplicatePhone(phone).into());
                    }
                }
            }
            member.phone = phone;
        }
        if let Some(branch_id) = update.branch_id {
            self.require_branch(branch_id).await?;
            member.branch_id = Some(branch_id);
        }
        if let Some(name) = update.name {
            member.name = name;
        }
        if update.email.is_some() {
            member.email = update.email;
        }
        if let Some(status) = update.status {
            member.status = status;
        }
        if update.member_number.is_some() {
            member.member_number = update.member_number;
        }
        if update.membership_type.is_some() {
            member.membership_type = update.membership_type;
        }
        if update.start_date.is_some() {
            member.start_date = update.start_date;
        }
        if update.end_date.is_some() {
            member.end_date = update.end_date;
        }
        validate_fields(&member.name, &member.phone, member.start_date, member.end_date)?;

        member.updated_at = self.ctx.now();
        MemberRepo::update(self.ctx.pool(), &member)
            .await
            .context("Failed to update member")?;

        info!(member_id = id, status = %member.status, "Member updated");
        Ok(member)
    }

    /// Delete a member; their permission rules go with them
    pub async fn delete(&self, id: i64) -> BusinessResult<()> {
        self.get(id).await?;
        MemberRepo::delete(self.ctx.pool(), id)
            .await
            .context("Failed to delete member")?;
        info!(member_id = id, "Member deleted");
        Ok(())
    }

    pub async fn get(&self, id: i64) -> BusinessResult<Member> {
        MemberRepo::find_by_id(self.ctx.pool(), id)
            .await?
            .ok_or_else(|| BusinessError::MemberNotFound(id).into())
    }

    pub async fn list(&self, filter: &MemberFilter) -> BusinessResult<Vec<Member>> {
        Ok(MemberRepo::list(self.ctx.pool(), filter).await?)
    }

    async fn require_branch(&self, branch_id: i64) -> BusinessResult<()> {
        match BranchRepo::find_by_id(self.ctx.pool(), branch_id).await? {
            Some(_) => Ok(()),
            None => Err(BusinessError::BranchNotFound(branch_id).into()),
        }
    }
}

fn validate_fields(
    name: &str,
    phone: &str,
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
) -> Result<(), BusinessError> {
    if name.trim().is_empty() {
        return Err(BusinessError::InvalidInput("member name is empty".to_string()));
    }
    if phone.trim().is_empty() {
        return Err(BusinessError::InvalidInput("phone is empty".to_string()));
    }
    if let (Some(start), Some(end)) = (start, end) {
        if end < start {
            return Err(BusinessError::InvalidInput(format!(
                "membership ends {} before it starts {}",
                end, start
            )));
        }
    }
    Ok(())
}
