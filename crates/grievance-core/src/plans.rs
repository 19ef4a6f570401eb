//! Action plans and executive summaries
//!
//! Plans are written per top issue. With a text backend the `action_plan`
//! prompt is rendered over the enriched issues and the response validated
//! against the registry; without one (or when generation fails) every
//! issue gets a template plan for its unit.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, warn};

use crate::ai::parsing::{parse_plans, parse_summary};
use crate::ai::{GeneratedPlan, GenerationRequest, TextBackend};
use crate::error::Result;
use crate::models::{ClassificationResult, IssueKind, ProviderBreakdownEntry};
use crate::prompts::{PromptId, PromptLibrary};
use crate::registry::Registry;

/// Executive summary text when no backend is configured
pub const AI_UNAVAILABLE: &str = "AI features unavailable.";
/// Executive summary text when generation failed
pub const SUMMARY_UNAVAILABLE: &str = "Summary generation unavailable.";

const DEFAULT_ACTION: &str = "Review and address complaints";
const PENDING_REMARKS: &str = "Awaiting detailed analysis and implementation.";
const UNKNOWN_ISSUE: &str = "Unspecified Issue";

/// A top issue with its classification and provider data, as sent to a generator
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnrichedIssue {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: IssueKind,
    pub count: usize,
    pub recommended_unit: String,
    pub recommended_unit_full: String,
    pub org_type: String,
    pub top_service_provider: Option<String>,
    pub top_sp_count: Option<usize>,
    pub top_sp_percentage: Option<f64>,
}

impl EnrichedIssue {
    pub fn new(result: &ClassificationResult, breakdown: &[ProviderBreakdownEntry]) -> Self {
        let top = breakdown.first();
        Self {
            name: result.issue.issue_name.clone(),
            kind: result.issue.source_field,
            count: result.issue.count,
            recommended_unit: result.assigned_unit.unit_code.clone(),
            recommended_unit_full: result.assigned_unit.full_name.clone(),
            org_type: result.assigned_unit.category.label().to_string(),
            top_service_provider: top.map(|e| e.provider_name.clone()),
            top_sp_count: top.map(|e| e.count),
            top_sp_percentage: top.map(|e| e.percentage),
        }
    }

    /// "Affects N complaints. Top provider: X (p%)." without the closing sentence
    fn impact(&self) -> String {
        let mut text = format!("Affects {} complaints", format_count(self.count));
        if let (Some(sp), Some(pct)) = (&self.top_service_provider, self.top_sp_percentage) {
            text.push_str(&format!(". Top provider: {} ({:.1}%)", sp, pct));
        }
        text
    }
}

/// One row of the action plan table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionPlan {
    pub issue: String,
    pub action_plan: String,
    pub unit: String,
    pub remarks: String,
    /// Left blank for the responsible unit to fill in
    #[serde(default)]
    pub resolution: String,
}

/// Report-level summary, keyed by organization label
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutiveSummary {
    pub main_summary: String,
    pub org_summaries: BTreeMap<String, String>,
}

impl ExecutiveSummary {
    fn unavailable(text: &str) -> Self {
        Self {
            main_summary: text.to_string(),
            org_summaries: BTreeMap::new(),
        }
    }
}

/// Writes action plans and summaries, with or without a text backend
pub struct PlanWriter<'a> {
    registry: &'a Registry,
    prompts: &'a PromptLibrary,
    backend: Option<&'a dyn TextBackend>,
}

impl<'a> PlanWriter<'a> {
    /// Create a template-only writer
    pub fn new(registry: &'a Registry, prompts: &'a PromptLibrary) -> Self {
        Self {
            registry,
            prompts,
            backend: None,
        }
    }

    pub fn with_backend(mut self, backend: &'a dyn TextBackend) -> Self {
        self.backend = Some(backend);
        self
    }

    pub fn backend_name(&self) -> Option<&str> {
        self.backend.map(|b| b.name())
    }

    /// One action plan per issue (generated plans may differ in length)
    pub fn write_plans(&self, issues: &[EnrichedIssue], report_label: Option<&str>) -> Vec<ActionPlan> {
        let Some(backend) = self.backend else {
            return template_plans(issues);
        };

        match self.generate_plans(backend, issues, report_label) {
            Ok(plans) if !plans.is_empty() => plans,
            Ok(_) => {
                warn!(backend = backend.name(), "Generator returned no plans, using templates");
                template_plans(issues)
            }
            Err(e) => {
                warn!(backend = backend.name(), error = %e, "Plan generation failed, using templates");
                template_plans(issues)
            }
        }
    }

    /// Executive summary over finished plans
    pub fn write_summary(&self, plans: &[ActionPlan], total_complaints: Option<usize>) -> ExecutiveSummary {
        let Some(backend) = self.backend else {
            return ExecutiveSummary::unavailable(AI_UNAVAILABLE);
        };

        match self.generate_summary(backend, plans, total_complaints) {
            Ok(summary) => summary,
            Err(e) => {
                warn!(backend = backend.name(), error = %e, "Summary generation failed");
                ExecutiveSummary::unavailable(SUMMARY_UNAVAILABLE)
            }
        }
    }

    fn generate_plans(
        &self,
        backend: &dyn TextBackend,
        issues: &[EnrichedIssue],
        report_label: Option<&str>,
    ) -> Result<Vec<ActionPlan>> {
        let prompt = self.prompts.get(PromptId::ActionPlan)?;
        let data = serde_json::to_value(issues)?;

        let mut vars = HashMap::new();
        vars.insert("unit_guidelines", self.unit_guidelines());
        vars.insert("issues_json", serde_json::to_string_pretty(&data)?);
        if let Some(label) = report_label {
            vars.insert("report_type", label.to_string());
        }

        let request = GenerationRequest {
            prompt_id: PromptId::ActionPlan,
            prompt: prompt.render(&vars),
            data: &data,
        };
        let generated = parse_plans(&backend.generate(&request)?)?;
        debug!("{} returned {} plans for {} issues", backend.name(), generated.len(), issues.len());

        Ok(generated
            .into_iter()
            .enumerate()
            .map(|(i, plan)| self.validate_plan(plan, issues.get(i)))
            .collect())
    }

    fn generate_summary(
        &self,
        backend: &dyn TextBackend,
        plans: &[ActionPlan],
        total_complaints: Option<usize>,
    ) -> Result<ExecutiveSummary> {
        let prompt = self.prompts.get(PromptId::ExecutiveSummary)?;

        let mut org_types: Vec<&str> = Vec::new();
        let rows: Vec<serde_json::Value> = plans
            .iter()
            .map(|plan| {
                let org_type = self.registry.category_of(&plan.unit).label();
                if !org_types.contains(&org_type) {
                    org_types.push(org_type);
                }
                json!({
                    "issue": plan.issue,
                    "action_plan": plan.action_plan,
                    "unit": plan.unit,
                    "org_type": org_type,
                })
            })
            .collect();
        let data = serde_json::Value::Array(rows);

        let mut vars = HashMap::new();
        vars.insert("plans_json", serde_json::to_string_pretty(&data)?);
        vars.insert("org_types", org_types.join(", "));
        if let Some(total) = total_complaints {
            vars.insert("total_complaints", format_count(total));
        }

        let request = GenerationRequest {
            prompt_id: PromptId::ExecutiveSummary,
            prompt: prompt.render(&vars),
            data: &data,
        };
        let generated = parse_summary(&backend.generate(&request)?)?;
        Ok(ExecutiveSummary {
            main_summary: generated.main_summary,
            org_summaries: generated.org_summaries,
        })
    }

    /// Fill gaps in a generated plan and pin its unit to a registry unit
    fn validate_plan(&self, plan: GeneratedPlan, source: Option<&EnrichedIssue>) -> ActionPlan {
        let non_empty = |v: Option<String>| v.filter(|s| !s.trim().is_empty());

        let issue = non_empty(plan.issue)
            .or_else(|| source.map(|s| s.name.clone()))
            .unwrap_or_else(|| UNKNOWN_ISSUE.to_string());
        let action_plan = non_empty(plan.action_plan).unwrap_or_else(|| DEFAULT_ACTION.to_string());

        let unit = match non_empty(plan.unit).and_then(|u| self.registry.unit(u.trim())) {
            Some(known) => known.unit_code.clone(),
            None => match source {
                Some(s) => s.recommended_unit.clone(),
                None => self.registry.default_unit().unit_code.clone(),
            },
        };

        let remarks = non_empty(plan.remarks).unwrap_or_else(|| match source {
            Some(s) => format!("{}. Requires immediate attention.", s.impact()),
            None => PENDING_REMARKS.to_string(),
        });

        ActionPlan {
            issue,
            action_plan,
            unit,
            remarks,
            resolution: String::new(),
        }
    }

    fn unit_guidelines(&self) -> String {
        self.registry
            .units()
            .iter()
            .map(|u| {
                format!(
                    "- {} ({}) [{}]: {}",
                    u.unit_code,
                    u.full_name,
                    u.category.label(),
                    u.keywords.join(", ")
                )
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Template plans for every issue
pub fn template_plans(issues: &[EnrichedIssue]) -> Vec<ActionPlan> {
    issues
        .iter()
        .map(|issue| ActionPlan {
            issue: issue.name.clone(),
            action_plan: template_action(&issue.recommended_unit, issue.top_service_provider.as_deref()),
            unit: issue.recommended_unit.clone(),
            remarks: format!("{}. Requires prompt action.", issue.impact()),
            resolution: String::new(),
        })
        .collect()
}

fn template_action(unit_code: &str, top_provider: Option<&str>) -> String {
    match (unit_code.to_uppercase().as_str(), top_provider) {
        ("NTC", Some(sp)) => format!(
            "Issue compliance directive to {} requiring immediate service improvement, impose penalties for SLA violations, and establish monitoring mechanism for complaint resolution.",
            sp
        ),
        ("NTC", None) => "Conduct investigation of telecommunications service quality issues, issue compliance directives to non-compliant providers, and enforce regulatory penalties where applicable.".to_string(),
        ("PRD", Some(sp)) => format!(
            "Escalate to {} management demanding improved delivery performance, implement penalty clauses for delays, and evaluate alternative courier services for future contracts.",
            sp
        ),
        ("PRD", None) => "Review courier service provider contracts, enforce delivery SLA compliance, and establish performance monitoring system to prevent recurrence.".to_string(),
        ("CICC", _) => "Initiate cybercrime investigation, coordinate with law enforcement agencies, issue public advisory on prevention measures, and pursue legal action against identified perpetrators.".to_string(),
        ("DTI", _) => "Refer cases to DTI Consumer Protection Group, facilitate merchant-consumer mediation, provide complainants with documentation support, and coordinate follow-up on resolution timeline.".to_string(),
        ("SEC", _) => "Coordinate referral to SEC Enforcement Department, assist complainants in filing formal complaints, and monitor SEC's regulatory action against violators.".to_string(),
        ("FPIAP", _) => "Deploy technical team to assess connectivity issues, restore or upgrade affected infrastructure, and implement preventive monitoring system.".to_string(),
        ("GDTB", _) => "Conduct comprehensive system audit, implement technical fixes for identified issues, and enhance user interface based on feedback analysis.".to_string(),
        ("ILCDB", _) => "Review program implementation processes, address identified gaps in service delivery, streamline enrollment/certification procedures, and communicate updated timelines to participants.".to_string(),
        ("IMB", _) => "Conduct infrastructure assessment, resolve technical service disruptions, implement system redundancy, and establish improved backup protocols.".to_string(),
        ("CSB", _) => "Expedite digital certificate processing, address backlog in certificate issuance, and establish fast-track mechanism for urgent requests.".to_string(),
        _ => "Conduct thorough investigation of complaints, implement corrective measures to address root causes, and establish monitoring system to prevent recurrence.".to_string(),
    }
}

/// Integer with thousands separators (12345 -> "12,345")
pub fn format_count(n: usize) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::MockBackend;
    use crate::classifier::UnitClassifier;
    use crate::models::ComplaintIssue;

    fn enriched(registry: &Registry, name: &str, count: usize, top: Option<(&str, usize, f64)>) -> EnrichedIssue {
        let result = UnitClassifier::new(registry).classify_issue(&ComplaintIssue {
            issue_name: name.to_string(),
            source_field: IssueKind::Category,
            count,
        });
        let breakdown: Vec<ProviderBreakdownEntry> = top
            .into_iter()
            .map(|(p, c, pct)| ProviderBreakdownEntry {
                provider_name: p.to_string(),
                count: c,
                percentage: pct,
            })
            .collect();
        EnrichedIssue::new(&result, &breakdown)
    }

    #[test]
    fn test_format_count() {
        assert_eq!(format_count(0), "0");
        assert_eq!(format_count(999), "999");
        assert_eq!(format_count(1000), "1,000");
        assert_eq!(format_count(1234567), "1,234,567");
    }

    #[test]
    fn test_enriched_issue() {
        let registry = Registry::embedded().unwrap();
        let issue = enriched(&registry, "Delivery Concerns (SP)", 3, Some(("LBC", 2, 66.7)));
        assert_eq!(issue.recommended_unit, "PRD");
        assert_eq!(issue.org_type, "Delivery Unit (DICT Internal)");
        assert_eq!(issue.top_sp_count, Some(2));

        let json = serde_json::to_value(&issue).unwrap();
        assert_eq!(json["type"], "category");
        assert_eq!(json["top_service_provider"], "LBC");
    }

    #[test]
    fn test_template_plans_without_backend() {
        let registry = Registry::embedded().unwrap();
        let prompts = PromptLibrary::embedded_only();
        let writer = PlanWriter::new(&registry, &prompts);
        let issues = vec![
            enriched(&registry, "Telco Internet Issues", 1200, Some(("PLDT", 800, 66.666))),
            enriched(&registry, "Mystery", 4, None),
        ];

        let plans = writer.write_plans(&issues, None);
        assert_eq!(plans.len(), 2);
        assert_eq!(plans[0].unit, "NTC");
        assert!(plans[0].action_plan.starts_with("Issue compliance directive to PLDT"));
        assert_eq!(
            plans[0].remarks,
            "Affects 1,200 complaints. Top provider: PLDT (66.7%). Requires prompt action."
        );
        assert_eq!(plans[1].unit, "CICC");
        assert!(plans[1].action_plan.starts_with("Initiate cybercrime investigation"));
        assert_eq!(plans[1].remarks, "Affects 4 complaints. Requires prompt action.");
        assert!(plans.iter().all(|p| p.resolution.is_empty()));

        let summary = writer.write_summary(&plans, Some(1204));
        assert_eq!(summary.main_summary, AI_UNAVAILABLE);
        assert!(summary.org_summaries.is_empty());
    }

    #[test]
    fn test_template_action_variants() {
        assert!(template_action("PRD", None).starts_with("Review courier service provider contracts"));
        assert!(template_action("prd", Some("LBC")).starts_with("Escalate to LBC management"));
        assert!(template_action("NTC", None).starts_with("Conduct investigation of telecommunications"));
        assert!(template_action("XYZ", None).starts_with("Conduct thorough investigation"));
    }

    #[test]
    fn test_generated_plans_with_mock() {
        let registry = Registry::embedded().unwrap();
        let prompts = PromptLibrary::embedded_only();
        let backend = MockBackend::new();
        let writer = PlanWriter::new(&registry, &prompts).with_backend(&backend);
        let issues = vec![enriched(&registry, "Delivery Concerns (SP)", 3, Some(("LBC", 2, 66.7)))];

        let plans = writer.write_plans(&issues, Some("Delivery"));
        assert_eq!(plans.len(), 1);
        assert_eq!(plans[0].unit, "PRD");
        assert!(plans[0].action_plan.starts_with("Mock directive to LBC"));
        assert_eq!(writer.backend_name(), Some("mock"));

        let summary = writer.write_summary(&plans, Some(3));
        assert_eq!(summary.main_summary, "Mock summary of 1 action plans.");
        assert!(summary.org_summaries.contains_key("Delivery Unit (DICT Internal)"));
    }

    #[test]
    fn test_generated_plans_are_validated() {
        let registry = Registry::embedded().unwrap();
        let prompts = PromptLibrary::embedded_only();
        let backend = MockBackend::new().with_response(
            PromptId::ActionPlan,
            r#"[
                {"issue": "Telco Internet Issues", "action_plan": "Fine PLDT", "unit": "Telecom Office"},
                {"action_plan": "", "unit": "cicc", "remarks": "Watch closely"},
                {"issue": "Extra"}
            ]"#,
        );
        let writer = PlanWriter::new(&registry, &prompts).with_backend(&backend);
        let issues = vec![
            enriched(&registry, "Telco Internet Issues", 5, Some(("PLDT", 5, 100.0))),
            enriched(&registry, "Scam", 2, None),
        ];

        let plans = writer.write_plans(&issues, None);
        assert_eq!(plans.len(), 3);
        // Unknown unit corrected to the classifier's unit
        assert_eq!(plans[0].unit, "NTC");
        assert_eq!(
            plans[0].remarks,
            "Affects 5 complaints. Top provider: PLDT (100.0%). Requires immediate attention."
        );
        assert_eq!(plans[1].issue, "Scam");
        assert_eq!(plans[1].action_plan, DEFAULT_ACTION);
        assert_eq!(plans[1].unit, "CICC");
        assert_eq!(plans[1].remarks, "Watch closely");
        // Plans beyond the issue list keep placeholder values
        assert_eq!(plans[2].unit, "CICC");
        assert_eq!(plans[2].remarks, PENDING_REMARKS);
    }

    #[test]
    fn test_generation_failures_fall_back() {
        let registry = Registry::embedded().unwrap();
        let prompts = PromptLibrary::embedded_only();
        let issues = vec![enriched(&registry, "Delivery Concerns (SP)", 3, Some(("LBC", 2, 66.7)))];

        let garbage = MockBackend::new()
            .with_response(PromptId::ActionPlan, "I cannot help with that")
            .with_response(PromptId::ExecutiveSummary, "no json");
        let writer = PlanWriter::new(&registry, &prompts).with_backend(&garbage);
        let plans = writer.write_plans(&issues, None);
        assert_eq!(plans, template_plans(&issues));
        assert_eq!(writer.write_summary(&plans, None).main_summary, SUMMARY_UNAVAILABLE);

        let empty = MockBackend::new().with_response(PromptId::ActionPlan, "[]");
        let writer = PlanWriter::new(&registry, &prompts).with_backend(&empty);
        assert_eq!(writer.write_plans(&issues, None), template_plans(&issues));

        let down = MockBackend::unhealthy();
        let writer = PlanWriter::new(&registry, &prompts).with_backend(&down);
        assert_eq!(writer.write_plans(&issues, None), template_plans(&issues));
    }
}
