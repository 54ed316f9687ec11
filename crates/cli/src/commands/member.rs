//! Member management commands

use anyhow::Result;
use biogate_business::{MemberService, MemberUpdate, NewMember};
use biogate_core::Member;
use biogate_persistence::MemberFilter;

use super::or_dash;
use crate::db::Session;
use crate::MemberAction;

/// Handle member subcommands
pub async fn handle(session: &Session, action: MemberAction) -> Result<()> {
    let service = MemberService::new(session.ctx());

    match action {
        MemberAction::Create {
            name,
            phone,
            email,
            branch,
            number,
            membership,
            start,
            end,
        } => {
            let mut input = NewMember::new(&name, &phone);
            input.email = email;
            input.branch_id = branch;
            input.member_number = number;
            input.membership_type = membership;
            input.start_date = start;
            input.end_date = end;

            let member = service.create(input).await?;
            println!("✅ Created member:");
            print_member(&member);
        }
        MemberAction::List {
            status,
            branch,
            search,
        } => {
            let filter = MemberFilter {
                status: status.map(|s| s.to_core_status().as_str().to_string()),
                branch_id: branch,
                search,
            };
            let members = service.list(&filter).await?;
            if members.is_empty() {
                println!("No members found.");
                return Ok(());
            }

            println!(
                "{:<6} {:<24} {:<16} {:<10} {:<8} {:<12}",
                "ID", "Name", "Phone", "Status", "Branch", "Valid until"
            );
            println!("{}", "-".repeat(80));
            for m in &members {
                println!(
                    "{:<6} {:<24} {:<16} {:<10} {:<8} {:<12}",
                    m.id,
                    m.name,
                    m.phone,
                    m.status.to_string(),
                    or_dash(m.branch_id),
                    or_dash(m.end_date)
                );
            }
            println!("\nTotal: {} members", members.len());
        }
        MemberAction::Show { id } => {
            let member = service.get(id).await?;
            print_member(&member);
        }
        MemberAction::Update {
            id,
            name,
            phone,
            email,
            status,
            branch,
            end,
        } => {
            let update = MemberUpdate {
                name,
                phone,
                email,
                status: status.map(|s| s.to_core_status()),
                branch_id: branch,
                end_date: end,
                ..Default::default()
            };
            let member = service.update(id, update).await?;
            println!("✅ Updated member:");
            print_member(&member);
        }
        MemberAction::Delete { id } => {
            service.delete(id).await?;
            println!("🗑️  Deleted member {}", id);
        }
    }

    Ok(())
}

fn print_member(member: &Member) {
    println!("   ID:          {}", member.id);
    println!("   Name:        {}", member.name);
    println!("   Phone:       {}", member.phone);
    println!("   Email:       {}", or_dash(member.email.as_deref()));
    println!("   Status:      {}", member.status);
    println!("   Branch:      {}", or_dash(member.branch_id));
    println!("   Number:      {}", or_dash(member.member_number.as_deref()));
    println!("   Membership:  {}", or_dash(member.membership_type.as_deref()));
    println!(
        "   Valid:       {} .. {}",
        or_dash(member.start_date),
        or_dash(member.end_date)
    );
}
