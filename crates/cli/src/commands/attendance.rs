//! Check-in / check-out commands

use anyhow::Result;
use biogate_business::{AttendanceService, CheckOutcome};
use biogate_persistence::AttendanceFilter;

use super::or_dash;
use crate::db::Session;
use crate::AttendanceAction;

/// Handle attendance subcommands
pub async fn handle(session: &Session, action: AttendanceAction) -> Result<()> {
    let service = AttendanceService::new(session.ctx());

    match action {
        AttendanceAction::CheckIn { member_id, device } => {
            let outcome = service.check_in(member_id, device).await?;
            print_outcome("Checked in", &outcome);
        }
        AttendanceAction::CheckOut { member_id, device } => {
            let outcome = service.check_out(member_id, device).await?;
            print_outcome("Checked out", &outcome);
        }
        AttendanceAction::Today { member_id } => {
            let today = service.today(member_id).await?;
            println!("📅 Member {} on {}: {}", today.member_id, today.date, today.state);
            println!("   Check-in:  {}", or_dash(today.check_in_time.map(|t| t.time())));
            println!("   Check-out: {}", or_dash(today.check_out_time.map(|t| t.time())));
            println!("   Duration:  {} min", or_dash(today.duration_minutes));
        }
        AttendanceAction::List {
            member,
            device,
            from,
            to,
            offset,
            limit,
        } => {
            let filter = AttendanceFilter {
                member_id: member,
                device_id: device,
                start_date: from,
                end_date: to,
                offset,
                limit,
                ..Default::default()
            };
            let records = service.records(&filter).await?;
            if records.is_empty() {
                println!("No attendance records found.");
                return Ok(());
            }

            println!(
                "{:<8} {:<12} {:<8} {:<8} {:<10} {:<10} {:<8} {:<10}",
                "ID", "Date", "Member", "Device", "In", "Out", "Minutes", "Status"
            );
            println!("{}", "-".repeat(80));
            for r in &records {
                println!(
                    "{:<8} {:<12} {:<8} {:<8} {:<10} {:<10} {:<8} {:<10}",
                    r.id,
                    r.date.to_string(),
                    r.member_id,
                    r.device_id,
                    or_dash(r.check_in_time.map(|t| t.time())),
                    or_dash(r.check_out_time.map(|t| t.time())),
                    or_dash(r.duration_minutes),
                    r.status.to_string()
                );
            }
        }
    }

    Ok(())
}

fn print_outcome(verb: &str, outcome: &CheckOutcome) {
    match outcome {
        CheckOutcome::Accepted { record, check_time } => {
            println!(
                "✅ {} member {} at {}",
                verb,
                record.member_id,
                check_time.format("%H:%M:%S")
            );
            if let Some(minutes) = record.duration_minutes {
                println!("   Duration: {} min", minutes);
            }
        }
        CheckOutcome::Rejected(rejection) => {
            println!("⚠️  Rejected: {}", rejection);
        }
    }
}
