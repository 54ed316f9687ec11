//! Device management commands

use anyhow::Result;
use biogate_business::{DeviceService, NewDevice};
use biogate_core::Device;

use super::or_dash;
use crate::db::Session;
use crate::DeviceAction;

/// Handle device subcommands
pub async fn handle(session: &Session, action: DeviceAction) -> Result<()> {
    let service = DeviceService::new(session.ctx());

    match action {
        DeviceAction::Register {
            name,
            ip,
            port,
            r#type,
            location,
            branch,
            direction,
        } => {
            let mut input = NewDevice::new(&name, &ip);
            input.port = port;
            input.device_type = r#type;
            input.location = location;
            input.branch_id = branch;
            input.access_direction = direction.to_core_direction();

            let device = service.register(input).await?;
            println!("✅ Registered device:");
            print_device(&device);
        }
        DeviceAction::List { branch } => {
            let devices = service.list(branch).await?;
            if devices.is_empty() {
                println!("No devices found.");
                return Ok(());
            }

            println!(
                "{:<6} {:<20} {:<22} {:<12} {:<8} {:<8}",
                "ID", "Name", "Address", "Type", "Dir", "Status"
            );
            println!("{}", "-".repeat(80));
            for d in &devices {
                println!(
                    "{:<6} {:<20} {:<22} {:<12} {:<8} {:<8}",
                    d.id,
                    d.name,
                    d.address(),
                    d.device_type,
                    d.access_direction.to_string(),
                    d.status.to_string()
                );
            }
        }
        DeviceAction::Show { id } => {
            let device = service.get(id).await?;
            print_device(&device);
        }
        DeviceAction::Delete { id } => {
            service.delete(id).await?;
            println!("🗑️  Deleted device {}", id);
        }
        DeviceAction::Connect { id } => {
            let device = service.connect(id).await?;
            println!("🔌 {} is {} ({})", device.name, device.status, device.address());
        }
        DeviceAction::Disconnect { id } => {
            let device = service.disconnect(id).await?;
            println!("🔌 {} is {}", device.name, device.status);
        }
        DeviceAction::Sync { id } => {
            let summary = service.sync(id).await?;
            println!("✅ Synced device {}", id);
            println!("   Users:   {}", summary.users);
            println!("   Records: {}", summary.records);
        }
    }

    Ok(())
}

fn print_device(device: &Device) {
    println!("   ID:         {}", device.id);
    println!("   Name:       {}", device.name);
    println!("   Address:    {}", device.address());
    println!("   Type:       {}", device.device_type);
    println!("   Location:   {}", or_dash(device.location.as_deref()));
    println!("   Branch:     {}", or_dash(device.branch_id));
    println!("   Direction:  {}", device.access_direction);
    println!("   Status:     {}", device.status);
    println!("   Heartbeat:  {}", or_dash(device.last_heartbeat));
}
