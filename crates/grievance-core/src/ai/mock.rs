//! Mock backend for testing
//!
//! Produces deterministic responses from the request data, so reports can
//! be generated end to end without a text generation service.

use std::collections::{BTreeMap, HashMap};

use serde_json::{json, Value};

use crate::error::{Error, Result};
use crate::prompts::PromptId;

use super::{GenerationRequest, TextBackend};

/// Mock text backend
///
/// Returns plans and summaries derived from the request data. Specific
/// tests can replace the response for a prompt with `with_response`.
#[derive(Clone, Default)]
pub struct MockBackend {
    /// Whether generate should succeed
    pub healthy: bool,
    responses: HashMap<PromptId, String>,
}

impl MockBackend {
    /// Create a new mock backend (healthy by default)
    pub fn new() -> Self {
        Self {
            healthy: true,
            responses: HashMap::new(),
        }
    }

    /// Create a mock backend whose every call fails
    pub fn unhealthy() -> Self {
        Self {
            healthy: false,
            responses: HashMap::new(),
        }
    }

    /// Return `response` verbatim for prompts of `id`
    pub fn with_response(mut self, id: PromptId, response: &str) -> Self {
        self.responses.insert(id, response.to_string());
        self
    }

    fn plans_for(data: &Value) -> Value {
        let plans: Vec<Value> = data
            .as_array()
            .map(|issues| {
                issues
                    .iter()
                    .map(|issue| {
                        let name = issue["name"].as_str().unwrap_or_default();
                        let unit = issue["recommended_unit"].as_str().unwrap_or_default();
                        let action = match issue["top_service_provider"].as_str() {
                            Some(sp) => format!("Mock directive to {} on {}.", sp, name),
                            None => format!("Mock intervention for {}.", name),
                        };
                        json!({
                            "issue": name,
                            "action_plan": action,
                            "unit": unit,
                            "remarks": format!("Mock remarks for {} complaints.", issue["count"]),
                        })
                    })
                    .collect()
            })
            .unwrap_or_default();
        Value::Array(plans)
    }

    fn summary_for(data: &Value) -> Value {
        let plans = data.as_array().map(Vec::as_slice).unwrap_or_default();
        let mut org_summaries = BTreeMap::new();
        for plan in plans {
            if let Some(org) = plan["org_type"].as_str() {
                org_summaries
                    .entry(org.to_string())
                    .or_insert_with(|| format!("Mock summary for {}.", org));
            }
        }
        json!({
            "main_summary": format!("Mock summary of {} action plans.", plans.len()),
            "org_summaries": org_summaries,
        })
    }
}

impl TextBackend for MockBackend {
    fn name(&self) -> &str {
        "mock"
    }

    fn generate(&self, request: &GenerationRequest<'_>) -> Result<String> {
        if !self.healthy {
            return Err(Error::InvalidData("Mock backend is unhealthy".into()));
        }
        if let Some(response) = self.responses.get(&request.prompt_id) {
            return Ok(response.clone());
        }
        let body = match request.prompt_id {
            PromptId::ActionPlan => Self::plans_for(request.data),
            PromptId::ExecutiveSummary => Self::summary_for(request.data),
        };
        // Fenced like real generators tend to answer
        Ok(format!("```json\n{}\n```", serde_json::to_string_pretty(&body)?))
    }
}
