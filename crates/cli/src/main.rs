//! Biogate CLI - access control and attendance from the command line
//!
//! Usage:
//! ```bash
//! biogate init
//! biogate member create --name "Alice" --phone 13800000001
//! biogate device register --name "Front Door" --ip 192.168.1.201
//! biogate permission grant 1 --device 1 --days 12345 --from-time 08:00 --to-time 18:00
//! biogate device connect 1
//! biogate fingerprint enroll 1 --device 1 --finger 2
//! biogate access check --member 1 --device 1 --type entry
//! biogate attendance check-in 1 --device 1
//! biogate report attendance --from 2026-03-01 --to 2026-03-31 --format csv -o march.csv
//! biogate journal --from 2026-03-01 --kind check-in
//! ```

use anyhow::Result;
use biogate_business::BusinessError;
use chrono::{NaiveDate, NaiveTime};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

mod commands;
mod db;

use commands::{
    access, attendance, branch, device, fingerprint, journal, member, permission, report,
};
use db::Session;

/// Biogate - biometric access control and attendance
#[derive(Parser)]
#[command(name = "biogate")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Configuration file (defaults to ./biogate.toml when present)
    #[arg(long, short, global = true)]
    pub config: Option<PathBuf>,

    /// Database URL, overrides the configuration
    #[arg(long, global = true)]
    pub db: Option<String>,

    /// Log level, overrides the configuration (RUST_LOG wins over both)
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Print the notifications published by the command
    #[arg(long, global = true)]
    pub events: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create the database and apply migrations
    Init,

    /// Show configuration and current figures
    Status {
        /// Print the figures as JSON
        #[arg(long)]
        json: bool,
    },

    /// Member management
    Member {
        #[command(subcommand)]
        action: MemberAction,
    },

    /// Branch management
    Branch {
        #[command(subcommand)]
        action: BranchAction,
    },

    /// Device management
    Device {
        #[command(subcommand)]
        action: DeviceAction,
    },

    /// Permission rules
    Permission {
        #[command(subcommand)]
        action: PermissionAction,
    },

    /// Fingerprint enrollment and templates
    Fingerprint {
        #[command(subcommand)]
        action: FingerprintAction,
    },

    /// Access decisions and the audit log
    Access {
        #[command(subcommand)]
        action: AccessAction,
    },

    /// Check-in / check-out
    Attendance {
        #[command(subcommand)]
        action: AttendanceAction,
    },

    /// Generate reports
    Report {
        #[command(subcommand)]
        action: ReportAction,
    },

    /// Replay the notification journal
    Journal {
        /// First date (YYYY-MM-DD)
        #[arg(long)]
        from: Option<NaiveDate>,
        /// Last date (YYYY-MM-DD)
        #[arg(long)]
        to: Option<NaiveDate>,
        /// Notification kinds to keep (comma-separated)
        #[arg(long, value_delimiter = ',')]
        kind: Option<Vec<KindArg>>,
        /// Only notifications about this member
        #[arg(long)]
        member: Option<i64>,
    },
}

#[derive(Subcommand)]
pub enum MemberAction {
    /// Create a member
    Create {
        #[arg(long, short)]
        name: String,
        #[arg(long, short)]
        phone: String,
        #[arg(long, short)]
        email: Option<String>,
        #[arg(long)]
        branch: Option<i64>,
        #[arg(long)]
        number: Option<String>,
        /// Membership type label (e.g. monthly, annual)
        #[arg(long)]
        membership: Option<String>,
        /// Membership start (YYYY-MM-DD)
        #[arg(long)]
        start: Option<NaiveDate>,
        /// Membership end (YYYY-MM-DD)
        #[arg(long)]
        end: Option<NaiveDate>,
    },
    /// List members
    List {
        #[arg(long)]
        status: Option<MemberStatusArg>,
        #[arg(long)]
        branch: Option<i64>,
        /// Match name, phone or member number
        #[arg(long, short)]
        search: Option<String>,
    },
    /// Show one member
    Show { id: i64 },
    /// Update a member
    Update {
        id: i64,
        #[arg(long, short)]
        name: Option<String>,
        #[arg(long, short)]
        phone: Option<String>,
        #[arg(long, short)]
        email: Option<String>,
        #[arg(long)]
        status: Option<MemberStatusArg>,
        #[arg(long)]
        branch: Option<i64>,
        #[arg(long)]
        end: Option<NaiveDate>,
    },
    /// Delete a member
    Delete { id: i64 },
}

#[derive(Subcommand)]
pub enum BranchAction {
    /// Create a branch
    Create {
        #[arg(long, short)]
        name: String,
        /// Unique branch code
        #[arg(long)]
        code: String,
        #[arg(long)]
        address: Option<String>,
        #[arg(long)]
        manager: Option<String>,
        #[arg(long)]
        phone: Option<String>,
    },
    /// List branches
    List,
    /// Delete a branch without members or devices
    Delete { id: i64 },
}

#[derive(Subcommand)]
pub enum DeviceAction {
    /// Register a device
    Register {
        #[arg(long, short)]
        name: String,
        #[arg(long)]
        ip: String,
        #[arg(long, default_value_t = 4370)]
        port: u16,
        #[arg(long, short = 't', default_value = "fingerprint")]
        r#type: String,
        #[arg(long, short)]
        location: Option<String>,
        #[arg(long)]
        branch: Option<i64>,
        #[arg(long, default_value = "both")]
        direction: DirectionArg,
    },
    /// List devices
    List {
        #[arg(long)]
        branch: Option<i64>,
    },
    /// Show one device
    Show { id: i64 },
    /// Delete a device
    Delete { id: i64 },
    /// Probe the device and mark it online
    Connect { id: i64 },
    /// Mark the device offline
    Disconnect { id: i64 },
    /// Pull users and records from an online device
    Sync { id: i64 },
}

#[derive(Subcommand)]
pub enum PermissionAction {
    /// Grant a rule to a member
    Grant {
        member_id: i64,
        /// Restrict to one device
        #[arg(long)]
        device: Option<i64>,
        #[arg(long, short = 't', default_value = "full")]
        r#type: String,
        /// Daily window start (HH:MM)
        #[arg(long, value_parser = parse_time)]
        from_time: Option<NaiveTime>,
        /// Daily window end (HH:MM)
        #[arg(long, value_parser = parse_time)]
        to_time: Option<NaiveTime>,
        /// First valid date (YYYY-MM-DD)
        #[arg(long)]
        from_date: Option<NaiveDate>,
        /// Last valid date (YYYY-MM-DD)
        #[arg(long)]
        to_date: Option<NaiveDate>,
        /// Weekday digits, 1 = Monday .. 7 = Sunday
        #[arg(long, default_value = "1234567")]
        days: String,
    },
    /// List the rules of a member in evaluation order
    List { member_id: i64 },
    /// Re-enable a rule
    Enable { id: i64 },
    /// Disable a rule without deleting it
    Disable { id: i64 },
    /// Delete a rule
    Revoke { id: i64 },
}

#[derive(Subcommand)]
pub enum FingerprintAction {
    /// Capture a finger on an online device
    Enroll {
        member_id: i64,
        #[arg(long, short)]
        device: i64,
        /// Finger slot 1-10
        #[arg(long, short, value_parser = clap::value_parser!(u8).range(1..=10))]
        finger: u8,
    },
    /// Templates of a member
    List { member_id: i64 },
    /// Enrollment attempts of a member, newest first
    History { member_id: i64 },
    /// Delete a template
    Delete { id: i64 },
}

#[derive(Subcommand)]
pub enum AccessAction {
    /// Authorize a member at a device
    Check {
        /// Member id; omit for an unidentified person
        #[arg(long, short)]
        member: Option<i64>,
        #[arg(long, short)]
        device: i64,
        #[arg(long, short = 't', default_value = "entry")]
        r#type: AccessTypeArg,
        #[arg(long, default_value = "fingerprint")]
        method: String,
    },
    /// Record a recognition event and authorize its result
    Recognize {
        #[arg(long, short)]
        device: i64,
        /// Matched member; omit for a no-match
        #[arg(long, short)]
        member: Option<i64>,
        /// Match confidence 0-100
        #[arg(long, default_value_t = 100, value_parser = clap::value_parser!(u8).range(0..=100))]
        confidence: u8,
        #[arg(long, short = 't', default_value = "entry")]
        r#type: AccessTypeArg,
        #[arg(long, default_value = "fingerprint")]
        method: String,
    },
    /// Query the audit log, newest first
    Logs {
        #[arg(long, short)]
        member: Option<i64>,
        #[arg(long, short)]
        device: Option<i64>,
        #[arg(long, short = 't')]
        r#type: Option<AccessTypeArg>,
        #[arg(long)]
        outcome: Option<OutcomeArg>,
        #[arg(long, default_value_t = 0)]
        offset: i64,
        #[arg(long, default_value_t = 50)]
        limit: i64,
    },
    /// Recent recognition events, newest first
    Recognitions {
        #[arg(long, short)]
        device: Option<i64>,
        #[arg(long, default_value_t = 20)]
        limit: i64,
    },
}

#[derive(Subcommand)]
pub enum AttendanceAction {
    /// Check a member in
    CheckIn {
        member_id: i64,
        #[arg(long, short)]
        device: i64,
    },
    /// Check a member out
    CheckOut {
        member_id: i64,
        #[arg(long, short)]
        device: i64,
    },
    /// Today's state of a member
    Today { member_id: i64 },
    /// Query attendance records, newest date first
    List {
        #[arg(long, short)]
        member: Option<i64>,
        #[arg(long, short)]
        device: Option<i64>,
        #[arg(long)]
        from: Option<NaiveDate>,
        #[arg(long)]
        to: Option<NaiveDate>,
        #[arg(long, default_value_t = 0)]
        offset: i64,
        #[arg(long, default_value_t = 50)]
        limit: i64,
    },
}

#[derive(Subcommand)]
pub enum ReportAction {
    /// Attendance statistics over a date range
    Attendance {
        #[arg(long)]
        from: NaiveDate,
        #[arg(long)]
        to: NaiveDate,
        /// Only this member
        #[arg(long, short)]
        member: Option<i64>,
        /// csv, json, md or markdown
        #[arg(long, default_value = "markdown")]
        format: biogate_reports::ExportFormat,
        #[arg(long, short)]
        output: Option<PathBuf>,
    },
    /// Check-in / check-out summary of one day
    Daily {
        /// Defaults to today
        #[arg(long)]
        date: Option<NaiveDate>,
        #[arg(long, default_value = "markdown")]
        format: biogate_reports::ExportFormat,
        #[arg(long, short)]
        output: Option<PathBuf>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
pub enum MemberStatusArg {
    Active,
    Inactive,
    Expired,
}

impl MemberStatusArg {
    pub fn to_core_status(self) -> biogate_core::MemberStatus {
        match self {
            MemberStatusArg::Active => biogate_core::MemberStatus::Active,
            MemberStatusArg::Inactive => biogate_core::MemberStatus::Inactive,
            MemberStatusArg::Expired => biogate_core::MemberStatus::Expired,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
pub enum DirectionArg {
    Entry,
    Exit,
    Both,
}

impl DirectionArg {
    pub fn to_core_direction(self) -> biogate_core::AccessDirection {
        match self {
            DirectionArg::Entry => biogate_core::AccessDirection::Entry,
            DirectionArg::Exit => biogate_core::AccessDirection::Exit,
            DirectionArg::Both => biogate_core::AccessDirection::Both,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
pub enum AccessTypeArg {
    Entry,
    Exit,
}

impl AccessTypeArg {
    pub fn to_core_type(self) -> biogate_core::AccessType {
        match self {
            AccessTypeArg::Entry => biogate_core::AccessType::Entry,
            AccessTypeArg::Exit => biogate_core::AccessType::Exit,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
pub enum OutcomeArg {
    Allowed,
    Denied,
}

impl OutcomeArg {
    pub fn to_core_outcome(self) -> biogate_core::AccessOutcome {
        match self {
            OutcomeArg::Allowed => biogate_core::AccessOutcome::Allowed,
            OutcomeArg::Denied => biogate_core::AccessOutcome::Denied,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
pub enum KindArg {
    AccessDecision,
    CheckIn,
    CheckOut,
    Recognition,
    DeviceStatus,
    Enrollment,
}

impl KindArg {
    pub fn to_core_kind(self) -> biogate_core::NotificationKind {
        match self {
            KindArg::AccessDecision => biogate_core::NotificationKind::AccessDecision,
            KindArg::CheckIn => biogate_core::NotificationKind::CheckIn,
            KindArg::CheckOut => biogate_core::NotificationKind::CheckOut,
            KindArg::Recognition => biogate_core::NotificationKind::Recognition,
            KindArg::DeviceStatus => biogate_core::NotificationKind::DeviceStatus,
            KindArg::Enrollment => biogate_core::NotificationKind::Enrollment,
        }
    }
}

/// `HH:MM` or `HH:MM:SS`
fn parse_time(s: &str) -> Result<NaiveTime, String> {
    NaiveTime::parse_from_str(s, "%H:%M:%S")
        .or_else(|_| NaiveTime::parse_from_str(s, "%H:%M"))
        .map_err(|_| format!("invalid time '{}', expected HH:MM", s))
}

fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .init();
}

async fn run(cli: Cli) -> Result<()> {
    let config = db::load_config(cli.config.as_deref(), cli.db.as_deref())?;
    init_logging(cli.log_level.as_deref().unwrap_or(&config.logging.level));

    let session = Session::open(config).await?;
    let mut events = if cli.events {
        Some(session.watch().await)
    } else {
        None
    };

    let result = match cli.command {
        Commands::Init => {
            println!("✅ Database ready at {}", session.config().database.url);
            Ok(())
        }
        Commands::Status { json } => db::show_status(&session, json).await,
        Commands::Member { action } => member::handle(&session, action).await,
        Commands::Branch { action } => branch::handle(&session, action).await,
        Commands::Device { action } => device::handle(&session, action).await,
        Commands::Permission { action } => permission::handle(&session, action).await,
        Commands::Fingerprint { action } => fingerprint::handle(&session, action).await,
        Commands::Access { action } => access::handle(&session, action).await,
        Commands::Attendance { action } => attendance::handle(&session, action).await,
        Commands::Report { action } => report::handle(&session, action).await,
        Commands::Journal {
            from,
            to,
            kind,
            member,
        } => journal::replay(&session, from, to, kind, member),
    };

    session.flush().await;
    if let Some(receiver) = events.as_mut() {
        db::print_events(receiver);
    }
    session.close().await;
    result
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            match BusinessError::code_of(&e) {
                Some(code) => eprintln!("❌ [{}] {}", code, e),
                None => eprintln!("❌ {:#}", e),
            }
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_time() {
        assert_eq!(parse_time("08:30").unwrap(), NaiveTime::from_hms_opt(8, 30, 0).unwrap());
        assert_eq!(
            parse_time("17:45:10").unwrap(),
            NaiveTime::from_hms_opt(17, 45, 10).unwrap()
        );
        assert!(parse_time("25:00").is_err());
        assert!(parse_time("noon").is_err());
    }

    #[test]
    fn test_cli_parses_access_check() {
        let cli = Cli::try_parse_from([
            "biogate", "--db", "sqlite::memory:", "access", "check", "--member", "3", "--device",
            "1", "--type", "exit",
        ])
        .unwrap();
        assert_eq!(cli.db.as_deref(), Some("sqlite::memory:"));
        match cli.command {
            Commands::Access {
                action:
                    AccessAction::Check {
                        member,
                        device,
                        r#type,
                        method,
                    },
            } => {
                assert_eq!(member, Some(3));
                assert_eq!(device, 1);
                assert_eq!(r#type.to_core_type(), biogate_core::AccessType::Exit);
                assert_eq!(method, "fingerprint");
            }
            _ => panic!("expected access check"),
        }
    }

    #[test]
    fn test_cli_parses_fingerprint_enroll() {
        let cli = Cli::try_parse_from([
            "biogate", "fingerprint", "enroll", "4", "--device", "2", "--finger", "7",
        ])
        .unwrap();
        match cli.command {
            Commands::Fingerprint {
                action:
                    FingerprintAction::Enroll {
                        member_id,
                        device,
                        finger,
                    },
            } => {
                assert_eq!((member_id, device, finger), (4, 2, 7));
            }
            _ => panic!("expected fingerprint enroll"),
        }

        assert!(Cli::try_parse_from([
            "biogate", "fingerprint", "enroll", "4", "--device", "2", "--finger", "11",
        ])
        .is_err());
    }

    #[test]
    fn test_cli_parses_report_format() {
        let cli = Cli::try_parse_from([
            "biogate", "report", "attendance", "--from", "2026-03-01", "--to", "2026-03-31",
            "--format", "csv",
        ])
        .unwrap();
        match cli.command {
            Commands::Report {
                action: ReportAction::Attendance { from, format, .. },
            } => {
                assert_eq!(from, NaiveDate::from_ymd_opt(2026, 3, 1).unwrap());
                assert_eq!(format, biogate_reports::ExportFormat::Csv);
            }
            _ => panic!("expected attendance report"),
        }

        assert!(Cli::try_parse_from(["biogate", "report", "daily", "--format", "pdf"]).is_err());
    }

    #[test]
    fn test_cli_parses_journal_kinds() {
        let cli =
            Cli::try_parse_from(["biogate", "journal", "--kind", "check_in,device-status"]);
        // ValueEnum names are kebab-case
        assert!(cli.is_err());

        let cli = Cli::try_parse_from(["biogate", "journal", "--kind", "check-in,device-status"])
            .unwrap();
        match cli.command {
            Commands::Journal { kind: Some(kinds), .. } => {
                let kinds: Vec<_> = kinds.into_iter().map(KindArg::to_core_kind).collect();
                assert_eq!(
                    kinds,
                    vec![
                        biogate_core::NotificationKind::CheckIn,
                        biogate_core::NotificationKind::DeviceStatus
                    ]
                );
            }
            _ => panic!("expected journal"),
        }
    }
}
