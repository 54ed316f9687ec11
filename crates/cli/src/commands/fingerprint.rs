//! Fingerprint commands

use anyhow::Result;
use biogate_business::FingerprintService;

use crate::db::Session;
use crate::FingerprintAction;

/// Handle fingerprint subcommands
pub async fn handle(session: &Session, action: FingerprintAction) -> Result<()> {
    let service = FingerprintService::new(session.ctx());

    match action {
        FingerprintAction::Enroll {
            member_id,
            device,
            finger,
        } => {
            let enrollment = service.enroll(member_id, device, finger).await?;
            println!("✅ Enrolled fingerprint:");
            println!("   Template:  {}", enrollment.template.id);
            println!("   Member:    {}", enrollment.template.member_id);
            println!("   Finger:    {}", enrollment.template.finger_index);
            println!("   Device:    {}", enrollment.log.device_id);
            println!("   Bytes:     {}", enrollment.template.template_data.len());
        }
        FingerprintAction::List { member_id } => {
            let templates = service.templates(member_id).await?;
            if templates.is_empty() {
                println!("No fingerprints enrolled for member {}.", member_id);
                return Ok(());
            }

            println!("{:<8} {:<8} {:<20}", "ID", "Finger", "Enrolled");
            println!("{}", "-".repeat(38));
            for t in &templates {
                println!(
                    "{:<8} {:<8} {:<20}",
                    t.id,
                    t.finger_index.to_string(),
                    t.created_at.format("%Y-%m-%d %H:%M:%S").to_string()
                );
            }
        }
        FingerprintAction::History { member_id } => {
            let logs = service.enrollments(member_id).await?;
            if logs.is_empty() {
                println!("No enrollment attempts for member {}.", member_id);
                return Ok(());
            }

            println!(
                "{:<8} {:<8} {:<8} {:<8} {:<20}",
                "ID", "Device", "Finger", "Status", "At"
            );
            println!("{}", "-".repeat(56));
            for log in &logs {
                println!(
                    "{:<8} {:<8} {:<8} {:<8} {:<20}",
                    log.id,
                    log.device_id,
                    log.finger_index.to_string(),
                    log.status.to_string(),
                    log.enrolled_at.format("%Y-%m-%d %H:%M:%S").to_string()
                );
            }
        }
        FingerprintAction::Delete { id } => {
            service.delete(id).await?;
            println!("🗑️  Deleted fingerprint template {}", id);
        }
    }

    Ok(())
}
