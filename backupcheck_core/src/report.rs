use crate::folder_name::format_destination_date;
use backupcheck_common::{
    FolderComparisonResult, FolderStatus, ReportTotals, UnmatchedFolder, VerificationReport,
    VerifyError,
};
use std::fmt::Write as _;
use std::path::PathBuf;

const RULE_WIDTH: usize = 80;

/// Collects per-folder results and produces the final report and verdict
#[derive(Debug, Default)]
pub struct ReportBuilder {
    source_root: PathBuf,
    destination_root: PathBuf,
    results: Vec<FolderComparisonResult>,
    unmatched_source: Vec<UnmatchedFolder>,
    unmatched_destination: Vec<UnmatchedFolder>,
}

impl ReportBuilder {
    pub fn new(source_root: impl Into<PathBuf>, destination_root: impl Into<PathBuf>) -> Self {
        Self {
            source_root: source_root.into(),
            destination_root: destination_root.into(),
            ..Default::default()
        }
    }

    pub fn push_result(&mut self, result: FolderComparisonResult) {
        self.results.push(result);
    }

    pub fn with_unmatched(
        mut self,
        unmatched_source: Vec<UnmatchedFolder>,
        unmatched_destination: Vec<UnmatchedFolder>,
    ) -> Self {
        self.unmatched_source = unmatched_source;
        self.unmatched_destination = unmatched_destination;
        self
    }

    /// Build the report. Succeeds only when no folder is unmatched on either
    /// side and every matched pair verified completely.
    pub fn build(mut self) -> VerificationReport {
        self.results.sort_by(|a, b| {
            (a.pair.date, &a.pair.source.path).cmp(&(b.pair.date, &b.pair.source.path))
        });

        let mut totals = ReportTotals {
            folders_checked: self.results.len(),
            unmatched_source: self.unmatched_source.len(),
            unmatched_destination: self.unmatched_destination.len(),
            ..Default::default()
        };
        for result in &self.results {
            if result.is_matched() {
                totals.folders_matched += 1;
            }
            totals.total_source_files += result.source_file_count;
            totals.total_destination_files += result.destination_file_count;
            totals.missing_files += result.missing.len();
            totals.size_mismatches += result.size_mismatches.len();
            totals.scan_warnings += result.warnings.len();
        }

        let overall_success = self.unmatched_source.is_empty()
            && self.unmatched_destination.is_empty()
            && self.results.iter().all(FolderComparisonResult::is_matched);

        VerificationReport {
            source_root: self.source_root,
            destination_root: self.destination_root,
            results: self.results,
            unmatched_source: self.unmatched_source,
            unmatched_destination: self.unmatched_destination,
            totals,
            overall_success,
        }
    }
}

pub fn status_marker(status: FolderStatus) -> &'static str {
    match status {
        FolderStatus::Matched => "✓ MATCHED",
        FolderStatus::Partial => "✗ PARTIAL",
        FolderStatus::Incomplete => "⚠ INCOMPLETE",
    }
}

/// Render the fixed-layout text report.
pub fn render_text(report: &VerificationReport) -> String {
    let mut out = String::new();
    let heavy = "=".repeat(RULE_WIDTH);
    let totals = &report.totals;

    line(&mut out, &heavy);
    line(&mut out, "BACKUP VERIFICATION REPORT");
    line(&mut out, &heavy);
    line(&mut out, "");

    section(&mut out, "SUMMARY");
    line(&mut out, &format!("Folders checked: {}", totals.folders_checked));
    line(&mut out, &format!("Folders fully matched: {}", totals.folders_matched));
    line(&mut out, &format!("Total source files scanned: {}", totals.total_source_files));
    line(&mut out, &format!("Total destination files scanned: {}", totals.total_destination_files));
    line(&mut out, &format!("Missing or mismatched files: {}", totals.missing_or_mismatched()));
    line(&mut out, &format!("  Missing files: {}", totals.missing_files));
    line(&mut out, &format!("  Size mismatches: {}", totals.size_mismatches));
    line(&mut out, &format!("Unmatched source folders: {}", totals.unmatched_source));
    line(&mut out, &format!("Unmatched destination folders: {}", totals.unmatched_destination));
    line(&mut out, &format!("Scan warnings: {}", totals.scan_warnings));
    line(
        &mut out,
        &format!("Result: {}", if report.overall_success { "PASS" } else { "FAIL" }),
    );
    line(&mut out, "");

    if !report.results.is_empty() {
        section(&mut out, "FOLDER DETAILS");
        for result in &report.results {
            line(&mut out, &format!("Date: {}", format_destination_date(result.pair.date)));
            line(&mut out, &format!("  Source: {}", result.pair.source.name()));
            line(&mut out, &format!("  Destination: {}", result.pair.destination.name()));
            line(&mut out, &format!("  Source files: {}", result.source_file_count));
            line(&mut out, &format!("  Destination files: {}", result.destination_file_count));
            line(&mut out, &format!("  Missing files: {}", result.missing.len()));
            line(&mut out, &format!("  Size mismatches: {}", result.size_mismatches.len()));
            line(&mut out, &format!("  Status: {}", status_marker(result.status)));
            line(&mut out, "");
        }
    }

    if totals.missing_files > 0 {
        section(&mut out, "MISSING FILES");
        for result in &report.results {
            for missing in &result.missing {
                line(&mut out, &format!("File: {}", missing.relative_path));
                line(&mut out, &format!("  Source folder: {}", result.pair.source.name()));
                line(&mut out, &format!("  Destination folder: {}", result.pair.destination.name()));
                line(&mut out, &format!("  Source size: {} bytes", with_thousands(missing.size)));
                line(&mut out, "  Reason: File not found");
                line(&mut out, "");
            }
        }
    }

    if totals.size_mismatches > 0 {
        section(&mut out, "SIZE MISMATCHES");
        for result in &report.results {
            for mismatch in &result.size_mismatches {
                line(&mut out, &format!("File: {}", mismatch.relative_path));
                line(&mut out, &format!("  Source folder: {}", result.pair.source.name()));
                line(&mut out, &format!("  Destination folder: {}", result.pair.destination.name()));
                line(&mut out, &format!("  Source size: {} bytes", with_thousands(mismatch.source_size)));
                line(
                    &mut out,
                    &format!("  Destination size: {} bytes", with_thousands(mismatch.destination_size)),
                );
                line(&mut out, "  Reason: Size mismatch");
                line(&mut out, "");
            }
        }
    }

    unmatched_section(&mut out, "UNMATCHED SOURCE FOLDERS", &report.unmatched_source);
    unmatched_section(&mut out, "UNMATCHED DESTINATION FOLDERS", &report.unmatched_destination);

    if totals.scan_warnings > 0 {
        section(&mut out, "SCAN WARNINGS");
        for result in report.results.iter().filter(|r| !r.warnings.is_empty()) {
            line(&mut out, &format!("Date: {}", format_destination_date(result.pair.date)));
            for warning in &result.warnings {
                let path = warning
                    .path
                    .as_ref()
                    .map(|p| p.display().to_string())
                    .unwrap_or_else(|| "(unknown path)".to_string());
                line(&mut out, &format!("  {}: {}", path, warning.message));
            }
            line(&mut out, "");
        }
    }

    line(&mut out, &heavy);
    out
}

/// Render the report as pretty-printed JSON.
pub fn render_json(report: &VerificationReport) -> Result<String, VerifyError> {
    serde_json::to_string_pretty(report).map_err(|e| VerifyError::Serialization(e.to_string()))
}

fn unmatched_section(out: &mut String, title: &str, folders: &[UnmatchedFolder]) {
    if folders.is_empty() {
        return;
    }
    section(out, title);
    for folder in folders {
        let date = folder
            .date
            .map(format_destination_date)
            .unwrap_or_else(|| "unknown".to_string());
        line(out, &format!("Date: {}", date));
        line(out, &format!("  Folder: {}", folder.name()));
        line(out, &format!("  Reason: {}", folder.reason.describe()));
        line(out, "");
    }
}

fn section(out: &mut String, title: &str) {
    line(out, title);
    line(out, &"-".repeat(RULE_WIDTH));
}

fn line(out: &mut String, text: &str) {
    let _ = writeln!(out, "{}", text);
}

/// `1234567` -> `"1,234,567"`
fn with_thousands(value: u64) -> String {
    let digits = value.to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    grouped
}
