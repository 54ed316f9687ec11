//! Report exporters - CSV, JSON, Markdown
//!
//! This module provides different export formats for reports.

use biogate_core::CoreError;
use std::str::FromStr;

/// Trait for exporting reports to different formats
pub trait ReportExporter {
    /// Export to the target format
    fn export(&self, report: &dyn ReportData) -> String;

    /// Get the file extension for this format
    fn extension(&self) -> &'static str;

    /// Get the MIME type for this format
    fn mime_type(&self) -> &'static str;
}

/// Trait for data that can be exported
pub trait ReportData {
    /// Get the report title
    fn title(&self) -> &str;

    /// Get column headers
    fn headers(&self) -> Vec<String>;

    /// Get data rows
    fn rows(&self) -> Vec<Vec<String>>;

    /// Get summary statistics as key-value pairs
    fn summary(&self) -> Vec<(String, String)>;
}

/// Output format selectable from the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExportFormat {
    Csv,
    Json,
    #[default]
    Markdown,
}

impl ExportFormat {
    pub fn exporter(&self) -> Box<dyn ReportExporter> {
        match self {
            ExportFormat::Csv => Box::new(CsvExporter::new()),
            ExportFormat::Json => Box::new(JsonExporter::new()),
            ExportFormat::Markdown => Box::new(MarkdownExporter::new()),
        }
    }
}

impl FromStr for ExportFormat {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "csv" => Ok(ExportFormat::Csv),
            "json" => Ok(ExportFormat::Json),
            "md" | "markdown" => Ok(ExportFormat::Markdown),
            _ => Err(CoreError::invalid_enum("format", s)),
        }
    }
}

// ============================================================================
// CSV Exporter
// ============================================================================

/// CSV format exporter
pub struct CsvExporter {
    delimiter: char,
    include_header: bool,
}

impl Default for CsvExporter {
    fn default() -> Self {
        Self {
            delimiter: ',',
            include_header: true,
        }
    }
}

impl CsvExporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_delimiter(mut self, delimiter: char) -> Self {
        self.delimiter = delimiter;
        self
    }

    pub fn without_header(mut self) -> Self {
        self.include_header = false;
        self
    }

    fn escape_csv_field(&self, field: &str) -> String {
        if field.contains(self.delimiter) || field.contains('"') || field.contains('\n') {
            format!("\"{}\"", field.replace('"', "\"\""))
        } else {
            field.to_string()
        }
    }

    fn write_line(&self, output: &mut String, fields: &[String]) {
        let escaped: Vec<String> = fields.iter().map(|f| self.escape_csv_field(f)).collect();
        output.push_str(&escaped.join(&self.delimiter.to_string()));
        output.push('\n');
    }
}

impl ReportExporter for CsvExporter {
    fn export(&self, report: &dyn ReportData) -> String {
        let mut output = String::new();

        if self.include_header {
            self.write_line(&mut output, &report.headers());
        }
        for row in report.rows() {
            self.write_line(&mut output, &row);
        }

        output
    }

    fn extension(&self) -> &'static str {
        "csv"
    }

    fn mime_type(&self) -> &'static str {
        "text/csv"
    }
}

// ============================================================================
// JSON Exporter
// ============================================================================

/// JSON format exporter
pub struct JsonExporter {
    pretty: bool,
}

impl Default for JsonExporter {
    fn default() -> Self {
        Self { pretty: true }
    }
}

impl JsonExporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn compact(mut self) -> Self {
        self.pretty = false;
        self
    }
}

impl ReportExporter for JsonExporter {
    fn export(&self, report: &dyn ReportData) -> String {
        let headers = report.headers();

        let json_rows: Vec<serde_json::Value> = report
            .rows()
            .iter()
            .map(|row| {
                let mut obj = serde_json::Map::new();
                for (i, header) in headers.iter().enumerate() {
                    let value = row.get(i).cloned().unwrap_or_default();
                    obj.insert(header.clone(), serde_json::Value::String(value));
                }
                serde_json::Value::Object(obj)
            })
            .collect();

        let summary_obj: serde_json::Map<String, serde_json::Value> = report
            .summary()
            .into_iter()
            .map(|(k, v)| (k, serde_json::Value::String(v)))
            .collect();

        let output = serde_json::json!({
            "title": report.title(),
            "summary": summary_obj,
            "data": json_rows,
        });

        if self.pretty {
            serde_json::to_string_pretty(&output).unwrap_or_default()
        } else {
            serde_json::to_string(&output).unwrap_or_default()
        }
    }

    fn extension(&self) -> &'static str {
        "json"
    }

    fn mime_type(&self) -> &'static str {
        "application/json"
    }
}

// ============================================================================
// Markdown Exporter
// ============================================================================

/// Markdown format exporter
pub struct MarkdownExporter {
    include_summary: bool,
}

impl Default for MarkdownExporter {
    fn default() -> Self {
        Self {
            include_summary: true,
        }
    }
}

impl MarkdownExporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn without_summary(mut self) -> Self {
        self.include_summary = false;
        self
    }

    fn escape_cell(cell: &str) -> String {
        cell.replace('|', "\\|").replace('\n', " ")
    }

    fn table_row(cells: &[String]) -> String {
        let escaped: Vec<String> = cells.iter().map(|c| Self::escape_cell(c)).collect();
        format!("| {} |\n", escaped.join(" | "))
    }
}

impl ReportExporter for MarkdownExporter {
    fn export(&self, report: &dyn ReportData) -> String {
        let mut output = String::new();

        output.push_str(&format!("# {}\n\n", report.title()));

        if self.include_summary {
            output.push_str("## Summary\n\n");
            for (key, value) in report.summary() {
                output.push_str(&format!("- **{}**: {}\n", key, value));
            }
            output.push('\n');
        }

        output.push_str("## Data\n\n");

        let headers = report.headers();
        if !headers.is_empty() {
            output.push_str(&Self::table_row(&headers));

            let separator: Vec<String> = headers.iter().map(|_| "---".to_string()).collect();
            output.push_str(&format!("| {} |\n", separator.join(" | ")));

            for row in report.rows() {
                output.push_str(&Self::table_row(&row));
            }
        }

        output
    }

    fn extension(&self) -> &'static str {
        "md"
    }

    fn mime_type(&self) -> &'static str {
        "text/markdown"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct SampleReport {
        rows: Vec<Vec<String>>,
    }

    impl ReportData for SampleReport {
        fn title(&self) -> &str {
            "Access Sample"
        }

        fn headers(&self) -> Vec<String> {
            vec!["Member".to_string(), "Device".to_string(), "Note".to_string()]
        }

        fn rows(&self) -> Vec<Vec<String>> {
            self.rows.clone()
        }

        fn summary(&self) -> Vec<(String, String)> {
            vec![("Entries".to_string(), self.rows.len().to_string())]
        }
    }

    fn sample() -> SampleReport {
        SampleReport {
            rows: vec![
                vec!["Alice".to_string(), "Front Door".to_string(), "ok".to_string()],
                vec![
                    "Bob".to_string(),
                    "Gym".to_string(),
                    "late, \"again\"".to_string(),
                ],
            ],
        }
    }

    #[test]
    fn test_csv_exporter() {
        let exporter = CsvExporter::new();
        let output = exporter.export(&sample());

        assert!(output.starts_with("Member,Device,Note\n"));
        assert!(output.contains("Alice,Front Door,ok"));
        assert!(output.contains("\"late, \"\"again\"\"\""));
        assert_eq!(exporter.extension(), "csv");
    }

    #[test]
    fn test_csv_without_header_and_delimiter() {
        let exporter = CsvExporter::new().without_header().with_delimiter(';');
        let output = exporter.export(&sample());
        assert!(output.starts_with("Alice;Front Door;ok\n"));
    }

    #[test]
    fn test_json_exporter() {
        let exporter = JsonExporter::new();
        let output = exporter.export(&sample());

        let value: serde_json::Value = serde_json::from_str(&output).unwrap();
        assert_eq!(value["title"], "Access Sample");
        assert_eq!(value["summary"]["Entries"], "2");
        assert_eq!(value["data"][0]["Member"], "Alice");
        assert_eq!(exporter.mime_type(), "application/json");
    }

    #[test]
    fn test_json_compact() {
        let output = JsonExporter::new().compact().export(&sample());
        assert!(!output.contains('\n'));
    }

    #[test]
    fn test_markdown_exporter() {
        let mut report = sample();
        report.rows.push(vec!["Eve".to_string(), "A|B".to_string(), String::new()]);
        let output = MarkdownExporter::new().export(&report);

        assert!(output.contains("# Access Sample"));
        assert!(output.contains("- **Entries**: 3"));
        assert!(output.contains("| Member | Device | Note |"));
        assert!(output.contains("| --- | --- | --- |"));
        assert!(output.contains("| Eve | A\\|B |  |"));
    }

    #[test]
    fn test_markdown_without_summary() {
        let output = MarkdownExporter::new().without_summary().export(&sample());
        assert!(!output.contains("## Summary"));
    }

    #[test]
    fn test_export_format_parse() {
        assert_eq!("CSV".parse::<ExportFormat>().unwrap(), ExportFormat::Csv);
        assert_eq!("md".parse::<ExportFormat>().unwrap(), ExportFormat::Markdown);
        assert!("xlsx".parse::<ExportFormat>().is_err());
        assert_eq!(ExportFormat::Json.exporter().extension(), "json");
    }
}
