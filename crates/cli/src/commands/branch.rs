//! Branch management commands

use anyhow::Result;
use biogate_business::{BranchService, NewBranch};

use super::or_dash;
use crate::db::Session;
use crate::BranchAction;

/// Handle branch subcommands
pub async fn handle(session: &Session, action: BranchAction) -> Result<()> {
    let service = BranchService::new(session.ctx());

    match action {
        BranchAction::Create {
            name,
            code,
            address,
            manager,
            phone,
        } => {
            let mut input = NewBranch::new(&name, &code);
            input.address = address;
            input.manager = manager;
            input.phone = phone;

            let branch = service.create(input).await?;
            println!("✅ Created branch {} ({})", branch.name, branch.code);
            println!("   ID: {}", branch.id);
        }
        BranchAction::List => {
            let branches = service.list().await?;
            if branches.is_empty() {
                println!("No branches found.");
                return Ok(());
            }

            println!(
                "{:<6} {:<10} {:<24} {:<20} {:<10}",
                "ID", "Code", "Name", "Manager", "Status"
            );
            println!("{}", "-".repeat(72));
            for b in &branches {
                println!(
                    "{:<6} {:<10} {:<24} {:<20} {:<10}",
                    b.id,
                    b.code,
                    b.name,
                    or_dash(b.manager.as_deref()),
                    b.status.to_string()
                );
            }
        }
        BranchAction::Delete { id } => {
            service.delete(id).await?;
            println!("🗑️  Deleted branch {}", id);
        }
    }

    Ok(())
}
