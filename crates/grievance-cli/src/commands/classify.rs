//! Matching and classification command implementations

use std::path::Path;

use anyhow::Result;
use grievance_core::{
    top_issues, BreakdownAggregator, BreakdownOptions, BreakdownOutcome, Domain, IdentityMatcher,
    IssueKind, Registry, UnitClassifier,
};

use super::{load_dataset, parse_arg, truncate};

/// Check provider text against one or both domains
pub fn cmd_match(registry: &Registry, text: &str, domain: Option<&str>) -> Result<()> {
    let domains = match domain {
        Some(d) => vec![parse_arg::<Domain>(d)?],
        None => Domain::all().to_vec(),
    };
    let matcher = IdentityMatcher::new(registry);

    println!();
    println!("🔎 Provider match: {}", text);
    println!("   ─────────────────────────────────────────────");
    for domain in domains {
        let mark = if matcher.matches_domain(Some(text), domain) {
            "✓ match"
        } else {
            "✗ no match"
        };
        println!("   {:10} │ {}", domain.as_str(), mark);
    }

    if let Some(canonical) = registry.canonical_alias(text) {
        println!("   Alias of: {}", canonical);
    }
    if domain.is_none() {
        match matcher.classify_provider(Some(text)) {
            Some(d) => println!("   Classified as: {}", d),
            None => println!("   Classified as: unknown provider"),
        }
    }

    Ok(())
}

/// Classify an issue name and show how every unit scored
pub fn cmd_classify(registry: &Registry, text: &str, kind: &str) -> Result<()> {
    let kind = parse_arg::<IssueKind>(kind)?;
    let classifier = UnitClassifier::new(registry);
    let assignment = classifier.classify(Some(text), kind);

    println!();
    println!("🏷️  {} \"{}\"", kind.label(), text);
    println!("   ─────────────────────────────────────────────");
    println!("   Unit:     {}", assignment.unit_code);
    println!("   Name:     {}", assignment.unit_full_name);
    println!("   Category: {}", assignment.org_category);

    let scores = classifier.scores(text);
    if scores.is_empty() {
        println!("   No keyword or entity matched (fallback or default unit)");
    } else {
        println!();
        println!("   {:8} │ {:>5}", "Unit", "Score");
        println!("   ─────────┼───────");
        for (unit, score) in scores {
            println!("   {:8} │ {:>5}", unit.unit_code, score);
        }
    }

    Ok(())
}

/// Top issues in a complaint log with their owning units
pub fn cmd_issues(registry: &Registry, file: &Path, limit: usize) -> Result<()> {
    let dataset = load_dataset(file, registry)?;
    let issues = top_issues(&dataset, limit);
    let classifier = UnitClassifier::new(registry);

    println!();
    println!("📋 Top Issues ({} complaints)", dataset.len());
    println!("   ─────────────────────────────────────────────────────────────");

    if issues.is_empty() {
        println!("   No issues found.");
        return Ok(());
    }

    println!(
        "   {:35} │ {:8} │ {:>6} │ {:6} │ {}",
        "Issue", "Field", "Count", "Unit", "Category"
    );
    println!("   ────────────────────────────────────┼──────────┼────────┼────────┼──────────────────");
    for issue in &issues {
        let result = classifier.classify_issue(issue);
        println!(
            "   {:35} │ {:8} │ {:>6} │ {:6} │ {}",
            truncate(&issue.issue_name, 35),
            issue.source_field.as_str(),
            issue.count,
            result.assigned_unit.unit_code,
            result.assigned_unit.category
        );
    }

    Ok(())
}

/// Provider breakdown for one issue
pub fn cmd_breakdown(
    registry: &Registry,
    file: &Path,
    issue: &str,
    kind: &str,
    normalized_fallback: bool,
) -> Result<()> {
    let kind = parse_arg::<IssueKind>(kind)?;
    let dataset = load_dataset(file, registry)?;
    let aggregator = BreakdownAggregator::with_options(
        registry,
        BreakdownOptions {
            normalized_fallback,
            ..Default::default()
        },
    );

    println!();
    println!("📊 Provider Breakdown: {}", issue);
    println!("   ─────────────────────────────────────────────────────────────");

    match aggregator.breakdown(&dataset, issue, kind) {
        BreakdownOutcome::Ranked(entries) => {
            println!("   {:35} │ {:>6} │ {:>6}", "Provider", "Count", "%");
            println!("   ────────────────────────────────────┼────────┼────────");
            for entry in entries {
                println!(
                    "   {:35} │ {:>6} │ {:>5.1}%",
                    truncate(&entry.provider_name, 35),
                    entry.count,
                    entry.percentage
                );
            }
        }
        other => println!("   No breakdown: {}", other.describe()),
    }

    Ok(())
}
