//! JSON parsing helpers for generated text
//!
//! Generators often wrap JSON in markdown code fences or add prose around
//! it, so these helpers strip fences and locate the JSON payload first.

use std::sync::OnceLock;

use regex::Regex;
use serde::Deserialize;
use serde_json::Value;

use crate::error::{Error, Result};

/// One action plan as returned by a generator; any field may be missing
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct GeneratedPlan {
    #[serde(default)]
    pub issue: Option<String>,
    #[serde(default)]
    pub action_plan: Option<String>,
    #[serde(default)]
    pub unit: Option<String>,
    #[serde(default)]
    pub remarks: Option<String>,
}

/// Executive summary as returned by a generator
#[derive(Debug, Clone, Deserialize)]
pub struct GeneratedSummary {
    pub main_summary: String,
    #[serde(default)]
    pub org_summaries: std::collections::BTreeMap<String, String>,
}

fn fence_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)^```[a-zA-Z]*\s*(.*?)\s*```$").expect("valid regex"))
}

/// Remove a surrounding markdown code fence, if any
pub fn strip_code_fences(response: &str) -> &str {
    let trimmed = response.trim();
    match fence_re().captures(trimmed).and_then(|c| c.get(1)) {
        Some(inner) => inner.as_str(),
        None => trimmed,
    }
}

fn truncated(text: &str) -> String {
    if text.chars().count() > 200 {
        format!("{}...", text.chars().take(200).collect::<String>())
    } else {
        text.to_string()
    }
}

/// Slice between the first `open` and last `close` delimiter
fn json_span(text: &str, open: char, close: char) -> Option<&str> {
    let start = text.find(open)?;
    let end = text.rfind(close)?;
    (start < end).then(|| &text[start..=end])
}

/// Parse an array of action plans; non-object elements are skipped
pub fn parse_plans(response: &str) -> Result<Vec<GeneratedPlan>> {
    let text = strip_code_fences(response);
    if text.is_empty() {
        return Err(Error::InvalidData("Empty response from generator".into()));
    }

    let json = json_span(text, '[', ']').ok_or_else(|| {
        Error::InvalidData(format!(
            "No JSON array found in generated plans | Raw: {}",
            truncated(text)
        ))
    })?;
    let values: Vec<Value> = serde_json::from_str(json).map_err(|e| {
        Error::InvalidData(format!(
            "Invalid plans JSON: {} | Raw: {}",
            e,
            truncated(json)
        ))
    })?;

    Ok(values
        .into_iter()
        .filter(Value::is_object)
        .filter_map(|v| serde_json::from_value(v).ok())
        .collect())
}

/// Parse an executive summary object
pub fn parse_summary(response: &str) -> Result<GeneratedSummary> {
    let text = strip_code_fences(response);
    let json = json_span(text, '{', '}').ok_or_else(|| {
        Error::InvalidData(format!(
            "No JSON found in generated summary | Raw: {}",
            truncated(text)
        ))
    })?;
    serde_json::from_str(json)
        .map_err(|e| Error::InvalidData(format!("Invalid summary JSON: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_code_fences() {
        assert_eq!(strip_code_fences("```json\n[1]\n```"), "[1]");
        assert_eq!(strip_code_fences("```\n{}\n```"), "{}");
        assert_eq!(strip_code_fences("  [1] "), "[1]");
    }

    #[test]
    fn test_parse_plans() {
        let response = r#"```json
[
  {"issue": "Delivery Concerns (SP)", "action_plan": "Escalate to LBC", "unit": "PRD", "remarks": "Urgent"},
  "stray text",
  {"issue": "Telco Internet Issues", "unit": "NTC"}
]
```"#;
        let plans = parse_plans(response).unwrap();
        assert_eq!(plans.len(), 2);
        assert_eq!(plans[0].unit.as_deref(), Some("PRD"));
        assert_eq!(plans[1].action_plan, None);
        assert_eq!(plans[1].remarks, None);
    }

    #[test]
    fn test_parse_plans_with_surrounding_prose() {
        let response = "Here are the plans:\n[{\"issue\": \"A\"}]\nLet me know.";
        let plans = parse_plans(response).unwrap();
        assert_eq!(plans[0].issue.as_deref(), Some("A"));
    }

    #[test]
    fn test_parse_plans_errors() {
        assert!(parse_plans("").is_err());
        assert!(parse_plans("no json here").is_err());
        assert!(parse_plans("[{\"issue\": }]").is_err());
    }

    #[test]
    fn test_parse_summary() {
        let response = r#"{"main_summary": "Overall", "org_summaries": {"Attached Agency": "NTC acts"}}"#;
        let summary = parse_summary(response).unwrap();
        assert_eq!(summary.main_summary, "Overall");
        assert_eq!(summary.org_summaries["Attached Agency"], "NTC acts");

        let minimal = parse_summary("```json\n{\"main_summary\": \"Only\"}\n```").unwrap();
        assert!(minimal.org_summaries.is_empty());

        assert!(parse_summary("{\"org_summaries\": {}}").is_err());
    }
}
