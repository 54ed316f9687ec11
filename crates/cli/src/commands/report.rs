//! Report generation commands

use anyhow::{Context, Result};
use biogate_business::StatisticsService;
use biogate_reports::{ExportFormat, ReportData};
use std::fs;
use std::path::{Path, PathBuf};

use crate::db::Session;
use crate::ReportAction;

/// Handle report subcommands
pub async fn handle(session: &Session, action: ReportAction) -> Result<()> {
    let service = StatisticsService::new(session.ctx());

    match action {
        ReportAction::Attendance {
            from,
            to,
            member,
            format,
            output,
        } => {
            let report = service.report(from, to, member).await?;
            if report.members.is_empty() {
                println!("No members found. Nothing to report.");
                return Ok(());
            }
            emit(&report, format, output.as_deref())?;
        }
        ReportAction::Daily {
            date,
            format,
            output,
        } => {
            let date = date.unwrap_or_else(|| session.ctx().now().date());
            let summary = service.daily_summary(date).await?;
            emit(&summary, format, output.as_deref())?;
        }
    }

    Ok(())
}

/// Render `report` and write it to `output`, or stdout
fn emit(report: &dyn ReportData, format: ExportFormat, output: Option<&Path>) -> Result<()> {
    let exporter = format.exporter();
    let content = exporter.export(report);

    match output {
        Some(path) => {
            let path = with_extension(path, exporter.extension());
            fs::write(&path, &content)
                .with_context(|| format!("Failed to write report file {}", path.display()))?;
            println!("✅ Report generated: {}", path.display());
        }
        None => {
            println!("{}", content);
        }
    }
    Ok(())
}

/// Append the format's extension when the path has none
fn with_extension(path: &Path, extension: &str) -> PathBuf {
    if path.extension().is_some() {
        path.to_path_buf()
    } else {
        path.with_extension(extension)
    }
}
