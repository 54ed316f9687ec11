//! Branch administration

use crate::error::{BusinessError, BusinessResult};
use crate::services::ServiceContext;
use anyhow::Context;
use biogate_core::{Branch, BranchStatus};
use biogate_persistence::BranchRepo;
use tracing::info;

/// Input for [`BranchService::create`]
#[derive(Debug, Clone)]
pub struct NewBranch {
    pub name: String,
    pub code: String,
    pub address: Option<String>,
    pub manager: Option<String>,
    pub phone: Option<String>,
}

impl NewBranch {
    pub fn new(name: &str, code: &str) -> Self {
        Self {
            name: name.to_string(),
            code: code.to_string(),
            address: None,
            manager: None,
            phone: None,
        }
    }
}

/// Partial update; `None` leaves a field unchanged
#[derive(Debug, Clone, Default)]
pub struct BranchUpdate {
    pub name: Option<String>,
    pub code: Option<String>,
    pub address: Option<String>,
    pub manager: Option<String>,
    pub phone: Option<String>,
    pub status: Option<BranchStatus>,
}

pub struct BranchService<'a> {
    ctx: &'a ServiceContext,
}

impl<'a> BranchService<'a> {
    pub fn new(ctx: &'a ServiceContext) -> Self {
        Self { ctx }
    }

    pub async fn create(&self, input: NewBranch) -> BusinessResult<Branch> {
        if input.name.trim().is_empty() || input.code.trim().is_empty() {
            return Err(BusinessError::InvalidInput(
                "branch name and code are required".to_string(),
            )
            .into());
        }
        self.require_unique_code(&input.code, None).await?;

        let now = self.ctx.now();
        let mut branch = Branch {
            id: 0,
            name: input.name,
            code: input.code,
            address: input.address,
            manager: input.manager,
            phone: input.phone,
            status: BranchStatus::Active,
            created_at: now,
            updated_at: now,
        };
        branch.id = BranchRepo::insert(self.ctx.pool(), &branch)
            .await
            .context("Failed to insert branch")?;

        info!(branch_id = branch.id, code = %branch.code, "Branch created");
        Ok(branch)
    }

    pub async fn update(&self, id: i64, update: BranchUpdate) -> BusinessResult<Branch> {
        let mut branch = self.get(id).await?;

        if let Some(code) = update.code {
            self.require_unique_code(&code, Some(id)).await?;
            branch.code = code;
        }
        if let Some(name) = update.name {
            branch.name = name;
        }
        if update.address.is_some() {
            branch.address = update.address;
        }
        if update.manager.is_some() {
            branch.manager = update.manager;
        }
        if update.phone.is_some() {
            branch.phone = update.phone;
        }
        if let Some(status) = update.status {
            branch.status = status;
        }

        branch.updated_at = self.ctx.now();
        BranchRepo::update(self.ctx.pool(), &branch)
            .await
            .context("Failed to update branch")?;
        Ok(branch)
    }

    /// Delete a branch that no member or device refers to
    pub async fn delete(&self, id: i64) -> BusinessResult<()> {
        self.get(id).await?;

        let dependents = BranchRepo::count_dependents(self.ctx.pool(), id).await?;
        if dependents > 0 {
            return Err(BusinessError::BranchInUse {
                branch_id: id,
                dependents,
            }
            .into());
        }

        BranchRepo::delete(self.ctx.pool(), id)
            .await
            .context("Failed to delete branch")?;
        info!(branch_id = id, "Branch deleted");
        Ok(())
    }

    pub async fn get(&self, id: i64) -> BusinessResult<Branch> {
        BranchRepo::find_by_id(self.ctx.pool(), id)
            .await?
            .ok_or_else(|| BusinessError::BranchNotFound(id).into())
    }

    pub async fn list(&self) -> BusinessResult<Vec<Branch>> {
        Ok(BranchRepo::list(self.ctx.pool()).await?)
    }

    async fn require_unique_code(&self, code: &str, except: Option<i64>) -> BusinessResult<()> {
        match BranchRepo::find_by_code(self.ctx.pool(), code).await? {
            Some(existing) if Some(existing.id) != except => {
                Err(BusinessError::DuplicateBranchCode(code.to_string()).into())
            }
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::member::{MemberService, NewMember};
    use crate::testutil::TestEnv;

    #[tokio::test]
    async fn test_create_duplicate_code() {
        let env = TestEnv::new().await;
        let service = BranchService::new(&env.ctx);
        service.create(NewBranch::new("Main", "HQ")).await.unwrap();

        let err = service.create(NewBranch::new("Other", "HQ")).await.unwrap_err();
        assert_eq!(BusinessError::code_of(&err), Some("DUPLICATE_BRANCH_CODE"));
    }

    #[tokio::test]
    async fn test_update_keeps_own_code() {
        let env = TestEnv::new().await;
        let service = BranchService::new(&env.ctx);
        let branch = service.create(NewBranch::new("Main", "HQ")).await.unwrap();

        let updated = service
            .update(
                branch.id,
                BranchUpdate {
                    code: Some("HQ".to_string()),
                    manager: Some("Lan".to_string()),
                    status: Some(BranchStatus::Inactive),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.manager.as_deref(), Some("Lan"));
        assert_eq!(service.get(branch.id).await.unwrap().status, BranchStatus::Inactive);
    }

    #[tokio::test]
    async fn test_delete_in_use() {
        let env = TestEnv::new().await;
        let service = BranchService::new(&env.ctx);
        let branch = service.create(NewBranch::new("Main", "HQ")).await.unwrap();

        let mut input = NewMember::new("Alice", "138");
        input.branch_id = Some(branch.id);
        let member = MemberService::new(&env.ctx).create(input).await.unwrap();

        let err = service.delete(branch.id).await.unwrap_err();
        assert_eq!(BusinessError::code_of(&err), Some("BRANCH_IN_USE"));

        MemberService::new(&env.ctx).delete(member.id).await.unwrap();
        service.delete(branch.id).await.unwrap();
        assert!(service.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_branch() {
        let env = TestEnv::new().await;
        let err = BranchService::new(&env.ctx).delete(9).await.unwrap_err();
        assert_eq!(BusinessError::code_of(&err), Some("BRANCH_NOT_FOUND"));
    }
}
