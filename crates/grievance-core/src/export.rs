//! Report export
//!
//! Supports:
//! - Action plan CSV (`issue,action_plan,unit,remarks,resolution`)
//! - Provider breakdown CSV, one row per provider per issue
//! - Full report JSON

use csv::Writer;

use crate::error::{Error, Result};
use crate::plans::ActionPlan;
use crate::report::Report;

/// Export format options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Csv,
    Json,
}

impl std::str::FromStr for ExportFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "csv" => Ok(Self::Csv),
            "json" => Ok(Self::Json),
            _ => Err(format!("Unknown export format: {} (valid: csv, json)", s)),
        }
    }
}

/// Action plans as CSV text
pub fn plans_to_csv(plans: &[ActionPlan]) -> Result<String> {
    let mut writer = Writer::from_writer(Vec::new());
    if plans.is_empty() {
        writer.write_record(["issue", "action_plan", "unit", "remarks", "resolution"])?;
    }
    for plan in plans {
        writer.serialize(plan)?;
    }
    finish(writer)
}

/// Provider breakdowns of a report as CSV text
pub fn breakdowns_to_csv(report: &Report) -> Result<String> {
    let mut writer = Writer::from_writer(Vec::new());
    writer.write_record(["issue", "unit", "provider", "count", "percentage"])?;
    for (issue, breakdown) in report.breakdowns() {
        for entry in &breakdown.providers {
            writer.write_record([
                issue.issue.issue_name.as_str(),
                issue.unit.unit_code.as_str(),
                entry.provider_name.as_str(),
                entry.count.to_string().as_str(),
                format!("{:.1}", entry.percentage).as_str(),
            ])?;
        }
    }
    finish(writer)
}

/// Full report as pretty-printed JSON
pub fn report_to_json(report: &Report) -> Result<String> {
    Ok(serde_json::to_string_pretty(report)?)
}

fn finish(writer: Writer<Vec<u8>>) -> Result<String> {
    let bytes = writer.into_inner().map_err(|e| e.into_error())?;
    String::from_utf8(bytes).map_err(|e| Error::InvalidData(format!("CSV output is not UTF-8: {}", e)))
}
