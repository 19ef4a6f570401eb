//! Integration tests for grievance-core
//!
//! These tests exercise the full import → classify → breakdown → report workflow.

use std::io::Write;

use grievance_core::{
    breakdown::BreakdownAggregator,
    classifier::UnitClassifier,
    export::{breakdowns_to_csv, plans_to_csv},
    import::{import_file, parse_csv},
    issues::top_issues,
    matcher::IdentityMatcher,
    models::{Domain, IssueKind, OrgCategory},
    plans::PlanWriter,
    prompts::PromptLibrary,
    registry::Registry,
    report::{Coverage, ReportBuilder, ReportOptions, ReportType},
    MockBackend,
};

/// Complaint log with a delivery-heavy month and some telecom noise
/// - 3 delivery complaints (2 LBC, 1 J&T) plus one filed against PLDT
/// - 2 telco complaints against PLDT and Globe
/// - 1 FLS-resolved row and 1 row without a date (both dropped on import)
fn complaint_log() -> &'static str {
    r#"Date of Complaint,Complaint Category,Complaint Nature,Service Providers,Agency,DICT UNIT,Resolution
2024-03-01,Delivery Concerns (SP),Delayed parcel,LBC Express Corporation,DICT,PRD,
2024-03-04,Delivery Concerns (SP),Lost parcel,J&T Express,DICT,PRD,
2024-03-09,Delivery Concerns (SP),Delayed /undelivered parcel,LBC Express Corporation,DICT,PRD,
2024-03-10,Delivery Concerns (SP),Delayed parcel,PLDT,DICT,PRD,
2024-03-12,Telco Internet Issues,Slow internet,PLDT,NTC,NTC,
2024-02-02,Telco Internet Issues,No connection,Globe Telecom,NTC,NTC,
2024-03-15,Scam,Online fraud,Facebook,DICT,CICC,FLS
,Delivery Concerns (SP),Delayed parcel,LBC Express Corporation,DICT,PRD,
"#
}

fn imported() -> grievance_core::ComplaintDataset {
    let registry = Registry::embedded().expect("embedded registry");
    parse_csv(complaint_log().as_bytes(), &registry)
        .expect("import")
        .dataset
}

// =============================================================================
// Core Pipeline Tests
// =============================================================================

#[test]
fn test_import_drops_fls_and_undated_rows() {
    let registry = Registry::embedded().unwrap();
    let result = parse_csv(complaint_log().as_bytes(), &registry).unwrap();

    assert_eq!(result.stats.rows_read, 8);
    assert_eq!(result.stats.rows_kept, 6);
    assert_eq!(result.stats.excluded_fls, 1);
    assert_eq!(result.stats.invalid_dates, 1);
    assert!(result.missing.is_empty());
}

#[test]
fn test_delivery_issue_end_to_end() {
    let registry = Registry::embedded().unwrap();
    let dataset = imported();

    let issues = top_issues(&dataset, 5);
    assert_eq!(issues[0].issue_name, "Delivery Concerns (SP)");
    assert_eq!(issues[0].count, 4);

    let assignment = UnitClassifier::new(&registry).classify(Some("Delivery Concerns (SP)"), IssueKind::Category);
    assert_eq!(assignment.unit_code, "PRD");
    assert_eq!(assignment.org_category, OrgCategory::InternalDeliveryUnit);

    let outcome = BreakdownAggregator::new(&registry).breakdown(
        &dataset,
        "Delivery Concerns (SP)",
        IssueKind::Category,
    );
    let entries: Vec<(&str, usize, f64)> = outcome
        .entries()
        .iter()
        .map(|e| (e.provider_name.as_str(), e.count, e.percentage))
        .collect();
    assert_eq!(
        entries,
        vec![("LBC Express Corporation", 2, 66.7), ("J&T Express", 1, 33.3)]
    );
}

#[test]
fn test_cross_domain_exclusion_both_ways() {
    let registry = Registry::embedded().unwrap();
    let matcher = IdentityMatcher::new(&registry);
    assert!(matcher.matches_domain(Some("PLDT"), Domain::Telecom));
    assert!(!matcher.matches_domain(Some("PLDT"), Domain::Delivery));

    let dataset = imported();
    let aggregator = BreakdownAggregator::new(&registry);
    let telecom = aggregator.breakdown(&dataset, "Telco Internet Issues", IssueKind::Category);
    let names: Vec<&str> = telecom
        .entries()
        .iter()
        .map(|e| e.provider_name.as_str())
        .collect();
    assert_eq!(names, vec!["PLDT", "Globe Telecom"]);
    assert!(telecom.entries().iter().all(|e| e.percentage == 50.0));
}

#[test]
fn test_nature_breakdown_uses_normalized_names() {
    let registry = Registry::embedded().unwrap();
    let dataset = imported();

    let outcome = BreakdownAggregator::new(&registry).breakdown(
        &dataset,
        "Delayed/Undelivered Parcel",
        IssueKind::Nature,
    );
    // "Undelivered" is not "delivery", so no domain is excluded for this name
    let entries: Vec<(&str, usize)> = outcome
        .entries()
        .iter()
        .map(|e| (e.provider_name.as_str(), e.count))
        .collect();
    assert_eq!(entries, vec![("LBC Express Corporation", 2), ("PLDT", 1)]);
}

// =============================================================================
// Report Tests
// =============================================================================

#[test]
fn test_delivery_report_with_mock_backend() {
    let registry = Registry::embedded().unwrap();
    let prompts = PromptLibrary::embedded_only();
    let backend = MockBackend::new();
    let writer = PlanWriter::new(&registry, &prompts).with_backend(&backend);
    let options = ReportOptions {
        report_type: ReportType::Delivery,
        coverage: Some(Coverage::Quarterly),
        ..Default::default()
    };

    let report = ReportBuilder::new(&registry)
        .build(&imported(), &options, &writer)
        .unwrap();

    assert_eq!(report.metrics.period_total, 3);
    // One category, then natures fill the remaining slots
    let names: Vec<&str> = report
        .issues
        .iter()
        .map(|i| i.issue.issue_name.as_str())
        .collect();
    assert_eq!(
        names,
        vec!["Delivery Concerns (SP)", "Delayed/Undelivered Parcel", "Mishandled Parcel"]
    );
    assert!(report.issues.iter().all(|i| i.unit.unit_code == "PRD"));
    assert_eq!(report.plans.len(), 3);
    assert_eq!(report.plans[0].unit, "PRD");

    let csv = breakdowns_to_csv(&report).unwrap();
    assert!(csv.contains("Delivery Concerns (SP),PRD,LBC Express Corporation,2,66.7"));
    assert!(!csv.contains("PLDT"));

    let plans = plans_to_csv(&report.plans).unwrap();
    assert!(plans.starts_with("issue,action_plan,unit,remarks,resolution"));
}

#[test]
fn test_template_report_without_backend() {
    let registry = Registry::embedded().unwrap();
    let prompts = PromptLibrary::embedded_only();
    let writer = PlanWriter::new(&registry, &prompts);

    let report = ReportBuilder::new(&registry)
        .build(&imported(), &ReportOptions::default(), &writer)
        .unwrap();

    let units: Vec<&str> = report
        .issues
        .iter()
        .map(|i| i.unit.unit_code.as_str())
        .collect();
    assert_eq!(units, vec!["PRD", "NTC", "PRD", "PRD", "NTC"]);
    assert!(report.plans[0]
        .action_plan
        .starts_with("Escalate to LBC Express Corporation management"));
    assert!(report.plans[1]
        .action_plan
        .starts_with("Issue compliance directive to PLDT"));
    assert_eq!(report.summary.main_summary, "AI features unavailable.");
}

#[test]
fn test_import_file_with_registry_override() {
    let dir = tempfile::tempdir().unwrap();
    let registry_path = dir.path().join("registry.toml");
    let custom = grievance_core::registry::DEFAULT_REGISTRY.replacen(
        "[[aliases]]",
        "[[aliases]]\nvariant = \"lbc corp\"\ncanonical = \"LBC Express Corporation\"\n\n[[aliases]]",
        1,
    );
    std::fs::write(&registry_path, custom).unwrap();
    let registry = Registry::load(Some(&registry_path)).unwrap();
    assert_eq!(registry.source(), Some(registry_path.as_path()));

    let csv_path = dir.path().join("complaints.csv");
    let mut file = std::fs::File::create(&csv_path).unwrap();
    writeln!(file, "Complaint Category,Service Providers").unwrap();
    writeln!(file, "Delivery Concerns (SP),LBC corp").unwrap();
    writeln!(file, "Delivery Concerns (SP),LBC Express Corporation").unwrap();
    drop(file);

    let result = import_file(&csv_path, &registry).unwrap();
    assert_eq!(result.stats.aliased_providers, 1);
    let outcome = BreakdownAggregator::new(&registry).breakdown(
        &result.dataset,
        "Delivery Concerns (SP)",
        IssueKind::Category,
    );
    assert_eq!(outcome.entries()[0].count, 2);
    assert_eq!(outcome.entries()[0].percentage, 100.0);
}
