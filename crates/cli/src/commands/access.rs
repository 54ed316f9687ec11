//! Access decision commands

use anyhow::Result;
use biogate_business::{AccessRequest, AccessResult, AccessService, Decision};
use biogate_core::RecognitionOutcome;
use biogate_persistence::AccessLogFilter;

use super::or_dash;
use crate::db::Session;
use crate::AccessAction;

/// Handle access subcommands
pub async fn handle(session: &Session, action: AccessAction) -> Result<()> {
    let service = AccessService::new(session.ctx());

    match action {
        AccessAction::Check {
            member,
            device,
            r#type,
            method,
        } => {
            let request =
                AccessRequest::new(member, device, r#type.to_core_type()).with_method(&method);
            let result = service.authorize(&request).await?;
            print_result(&result);
        }
        AccessAction::Recognize {
            device,
            member,
            confidence,
            r#type,
            method,
        } => {
            let outcome = match member {
                Some(member_id) => RecognitionOutcome::Matched {
                    member_id,
                    confidence,
                },
                None => RecognitionOutcome::NoMatch,
            };
            let result = service
                .recognize(device, r#type.to_core_type(), outcome, &method)
                .await?;
            print_result(&result);
        }
        AccessAction::Logs {
            member,
            device,
            r#type,
            outcome,
            offset,
            limit,
        } => {
            let filter = AccessLogFilter {
                member_id: member,
                device_id: device,
                access_type: r#type.map(|t| t.to_core_type()),
                status: outcome.map(|o| o.to_core_outcome()),
                offset,
                limit,
            };
            let records = service.logs(&filter).await?;
            if records.is_empty() {
                println!("No access records found.");
                return Ok(());
            }

            println!(
                "{:<8} {:<20} {:<8} {:<8} {:<6} {:<8} {:<28}",
                "ID", "Time", "Member", "Device", "Type", "Outcome", "Reason"
            );
            println!("{}", "-".repeat(90));
            for r in &records {
                println!(
                    "{:<8} {:<20} {:<8} {:<8} {:<6} {:<8} {:<28}",
                    r.id,
                    r.access_time.format("%Y-%m-%d %H:%M:%S").to_string(),
                    or_dash(r.member_id),
                    r.device_id,
                    r.access_type.to_string(),
                    r.status.to_string(),
                    or_dash(r.reason.as_deref())
                );
            }
        }
        AccessAction::Recognitions { device, limit } => {
            let rows = service.recognitions(device, limit).await?;
            if rows.is_empty() {
                println!("No recognition events found.");
                return Ok(());
            }
            for row in &rows {
                println!(
                    "{}  device {}  member {}  {}  confidence {}  audit {}",
                    row.recognized_at.format("%Y-%m-%d %H:%M:%S"),
                    row.device_id,
                    or_dash(row.member_id),
                    if row.matched { "match" } else { "no-match" },
                    row.confidence,
                    or_dash(row.access_log_id)
                );
            }
        }
    }

    Ok(())
}

fn print_result(result: &AccessResult) {
    let record = &result.record;
    match &result.decision {
        Decision::Allowed { rule_id, member } => {
            println!("✅ Access allowed: {} at device {}", member.name, record.device_id);
            match rule_id {
                Some(id) => println!("   Rule:   {}", id),
                None => println!("   Rule:   none (unrestricted)"),
            }
        }
        Decision::Denied { reason } => {
            println!("⛔ Access denied at device {}: {}", record.device_id, reason);
        }
    }
    println!("   Type:   {}", record.access_type);
    println!("   Time:   {}", record.access_time.format("%Y-%m-%d %H:%M:%S"));
    println!("   Audit:  #{}", record.id);
}
