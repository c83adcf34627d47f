//! Report export formats and utilities

use crate::analytics::error::{AnalyticsError, AnalyticsResult};
use crate::analytics::reports::VelocityReport;
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use std::path::Path;
use std::str::FromStr;
use tokio::fs;

/// Export format for reports
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ExportFormat {
    Text,
    Json,
    Csv,
}

impl ExportFormat {
    /// Get file extension for this format
    pub fn extension(&self) -> &str {
        match self {
            ExportFormat::Text => "txt",
            ExportFormat::Json => "json",
            ExportFormat::Csv => "csv",
        }
    }

    /// Get MIME type for this format
    pub fn mime_type(&self) -> &str {
        match self {
            ExportFormat::Text => "text/plain",
            ExportFormat::Json => "application/json",
            ExportFormat::Csv => "text/csv",
        }
    }
}

impl FromStr for ExportFormat {
    type Err = AnalyticsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "text" | "txt" => Ok(ExportFormat::Text),
            "json" => Ok(ExportFormat::Json),
            "csv" => Ok(ExportFormat::Csv),
            other => Err(AnalyticsError::UnsupportedFormat(other.to_string())),
        }
    }
}

/// Report exporter
pub struct ReportExporter;

impl ReportExporter {
    /// Export a report to bytes in the requested format
    pub fn export_to_bytes(
        report: &VelocityReport,
        format: ExportFormat,
    ) -> AnalyticsResult<Vec<u8>> {
        match format {
            ExportFormat::Text => Ok(report.render_text().into_bytes()),
            ExportFormat::Json => {
                let json = serde_json::to_string_pretty(report).map_err(|e| {
                    AnalyticsError::ExportFailed(format!("JSON serialization failed: {}", e))
                })?;
                Ok(json.into_bytes())
            }
            ExportFormat::Csv => Ok(Self::to_csv(report).into_bytes()),
        }
    }

    /// Export a report to a file
    pub async fn export(
        report: &VelocityReport,
        format: ExportFormat,
        output_path: &Path,
    ) -> AnalyticsResult<Vec<u8>> {
        let bytes = Self::export_to_bytes(report, format)?;
        fs::write(output_path, &bytes)
            .await
            .map_err(|e| AnalyticsError::ExportFailed(format!("Failed to write file: {}", e)))?;
        Ok(bytes)
    }

    /// Two CSV tables: per-window metrics, then per-contributor metrics
    fn to_csv(report: &VelocityReport) -> String {
        let mut out = String::new();

        let _ = writeln!(
            out,
            "window,opened,merged,carry_over,comments,approvals,review_instances,\
             avg_time_to_merge_hours,avg_time_to_first_review_hours,\
             avg_time_first_review_to_merge_hours"
        );
        for window in &report.windows {
            let _ = writeln!(
                out,
                "\"{}\",{},{},{},{},{},{},{:.2},{:.2},{:.2}",
                escape_csv(&window.label),
                window.opened,
                window.merged,
                window.carry_over,
                window.comments,
                window.approvals,
                window.review_instances,
                window.timings.time_to_merge.avg_hours,
                window.timings.time_to_first_review.avg_hours,
                window.timings.time_first_review_to_merge.avg_hours,
            );
        }

        let _ = writeln!(out);
        let _ = writeln!(
            out,
            "contributor,total_records,merged_records,carry_over,avg_size,avg_comments,\
             approvals_received,reviews_given_records,reviews_given_instances,\
             avg_time_to_merge_hours"
        );
        for contributor in report.contributors.values() {
            let _ = writeln!(
                out,
                "\"{}\",{},{},{},{:.1},{:.1},{},{},{},{:.2}",
                escape_csv(&contributor.handle),
                contributor.total_records,
                contributor.merged_records,
                contributor.carry_over,
                contributor.avg_size,
                contributor.avg_comments,
                contributor.approvals_received,
                contributor.reviews_given_records,
                contributor.reviews_given_instances,
                contributor.timings.time_to_merge.avg_hours,
            );
        }

        out
    }
}

/// Escape CSV special characters
fn escape_csv(s: &str) -> String {
    s.replace('"', "\"\"")
}
