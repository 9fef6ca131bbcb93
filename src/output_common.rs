//! Shared output formatting utilities for all response types.

use crate::error::ObjgrepError;
use crate::output::{
    json_response_with_partial_and_performance, OutputFormat, PerformanceMetrics,
};
use crate::search::StopReason;
use serde::Serialize;

/// Render any serializable response as JSON with partial result wrapper
pub fn render_json_response<T: Serialize>(
    data: &T,
    partial: bool,
    performance: Option<PerformanceMetrics>,
    format: OutputFormat,
) -> Result<String, ObjgrepError> {
    let payload = json_response_with_partial_and_performance(data, partial, performance);
    let rendered = if matches!(format, OutputFormat::Pretty) {
        serde_json::to_string_pretty(&payload)
    } else {
        serde_json::to_string(&payload)
    }?;
    Ok(rendered)
}

/// Format the "Matches found: N" line for human-readable output
pub fn format_total_header(total: u64) -> String {
    format!("Matches found: {}", total)
}

/// Format the footer printed when a traversal was cut short
pub fn format_partial_footer(reason: StopReason) -> String {
    format!("partial: true ({})", reason.describe())
}

/// Check if format is JSON (either Json or Pretty)
pub fn is_json_format(format: OutputFormat) -> bool {
    matches!(format, OutputFormat::Json | OutputFormat::Pretty)
}
