//! Permission rule commands

use anyhow::Result;
use biogate_business::{NewPermission, PermissionService};
use biogate_core::{DaysOfWeek, PermissionRule, RuleStatus};

use super::or_dash;
use crate::db::Session;
use crate::PermissionAction;

/// Handle permission subcommands
pub async fn handle(session: &Session, action: PermissionAction) -> Result<()> {
    let service = PermissionService::new(session.ctx());

    match action {
        PermissionAction::Grant {
            member_id,
            device,
            r#type,
            from_time,
            to_time,
            from_date,
            to_date,
            days,
        } => {
            let mut input = NewPermission::new(member_id);
            input.device_id = device;
            input.permission_type = r#type;
            input.start_time = from_time;
            input.end_time = to_time;
            input.start_date = from_date;
            input.end_date = to_date;
            input.days_of_week = days.parse::<DaysOfWeek>()?;

            let rule = service.grant(input).await?;
            println!("✅ Granted permission {} to member {}", rule.id, rule.member_id);
            print_header();
            print_rule(&rule);
        }
        PermissionAction::List { member_id } => {
            let rules = service.list_for_member(member_id).await?;
            if rules.is_empty() {
                println!("Member {} has no rules (unrestricted).", member_id);
                return Ok(());
            }
            print_header();
            for rule in &rules {
                print_rule(rule);
            }
        }
        PermissionAction::Enable { id } => {
            let rule = service.set_status(id, RuleStatus::Active).await?;
            println!("✅ Permission {} is {}", rule.id, rule.status);
        }
        PermissionAction::Disable { id } => {
            let rule = service.set_status(id, RuleStatus::Inactive).await?;
            println!("⏸️  Permission {} is {}", rule.id, rule.status);
        }
        PermissionAction::Revoke { id } => {
            service.revoke(id).await?;
            println!("🗑️  Revoked permission {}", id);
        }
    }

    Ok(())
}

fn print_header() {
    println!(
        "{:<6} {:<8} {:<8} {:<13} {:<23} {:<8} {:<8}",
        "ID", "Device", "Type", "Hours", "Dates", "Days", "Status"
    );
    println!("{}", "-".repeat(80));
}

fn print_rule(rule: &PermissionRule) {
    let hours = format!(
        "{}-{}",
        or_dash(rule.start_time.map(|t| t.format("%H:%M"))),
        or_dash(rule.end_time.map(|t| t.format("%H:%M")))
    );
    let dates = format!("{}..{}", or_dash(rule.start_date), or_dash(rule.end_date));
    println!(
        "{:<6} {:<8} {:<8} {:<13} {:<23} {:<8} {:<8}",
        rule.id,
        rule.device_id
            .map(|d| d.to_string())
            .unwrap_or_else(|| "any".to_string()),
        rule.permission_type,
        hours,
        dates,
        rule.days_of_week.to_string(),
        rule.status.to_string()
    );
}
