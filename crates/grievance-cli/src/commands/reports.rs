//! Report command implementations

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use grievance_core::export::{breakdowns_to_csv, plans_to_csv, report_to_json};
use grievance_core::{
    dashboard_panels, dashboard_summary, Coverage, DashboardPanels, MockBackend, PlanWriter,
    PromptLibrary, Registry, Report, ReportBuilder, ReportOptions, ReportType,
};

use super::{load_dataset, parse_arg, truncate};

/// Flags of the report command
pub struct ReportArgs<'a> {
    pub report_type: &'a str,
    pub coverage: Option<&'a str>,
    pub format: &'a str,
    pub output: Option<&'a Path>,
    pub mock: bool,
}

pub fn cmd_report(registry: &Registry, file: &Path, args: &ReportArgs<'_>) -> Result<()> {
    let options = ReportOptions {
        report_type: parse_arg::<ReportType>(args.report_type)?,
        coverage: args.coverage.map(parse_arg::<Coverage>).transpose()?,
        ..Default::default()
    };
    let format = args.format.to_lowercase();
    if !matches!(format.as_str(), "table" | "json" | "csv") {
        anyhow::bail!("Unknown format: {}. Available: table, json, csv", args.format);
    }

    let dataset = load_dataset(file, registry)?;
    let prompts = PromptLibrary::new();
    let backend = MockBackend::new();
    let mut writer = PlanWriter::new(registry, &prompts);
    if args.mock {
        writer = writer.with_backend(&backend);
    }

    let report = ReportBuilder::new(registry)
        .build(&dataset, &options, &writer)
        .context("Failed to build report")?;

    match format.as_str() {
        "json" => emit(&report_to_json(&report)?, args.output),
        "csv" => {
            emit(&plans_to_csv(&report.plans)?, args.output)?;
            if let Some(path) = args.output {
                emit(&breakdowns_to_csv(&report)?, Some(breakdowns_path(path).as_path()))?;
            }
            Ok(())
        }
        _ => {
            print_report(&report);
            Ok(())
        }
    }
}

/// `plans.csv` -> `plans-breakdowns.csv`, next to the plans file
fn breakdowns_path(plans: &Path) -> PathBuf {
    let stem = plans
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "report".to_string());
    plans.with_file_name(format!("{}-breakdowns.csv", stem))
}

fn emit(content: &str, output: Option<&Path>) -> Result<()> {
    match output {
        Some(path) => {
            fs::write(path, content)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            println!("✅ Wrote {}", path.display());
        }
        None => print!("{}", content),
    }
    Ok(())
}

fn print_report(report: &Report) {
    let metrics = &report.metrics;

    println!();
    println!("📋 Complaint Report - {}", report.report_type.label());
    if let (Some(start), Some(end)) = (metrics.start_date, metrics.end_date) {
        let window = report
            .coverage
            .map(|c| c.as_str())
            .unwrap_or("all records");
        println!("   Period: {} to {} ({})", start, end, window);
    }
    println!("   ─────────────────────────────────────────────────────────────");
    println!(
        "   All-time: {}   Period: {}   Telecom: {}   Delivery: {}",
        metrics.all_time_total, metrics.period_total, metrics.telecom_count, metrics.delivery_count
    );
    println!(
        "   Top {} issues cover {:.1}% of period complaints",
        report.issues.len(),
        report.top_issue_coverage
    );

    println!();
    println!(
        "   {:3} │ {:35} │ {:>6} │ {:6} │ {}",
        "#", "Issue", "Count", "Unit", "Category"
    );
    println!("   ────┼─────────────────────────────────────┼────────┼────────┼──────────────────");
    for (i, issue) in report.issues.iter().enumerate() {
        println!(
            "   {:3} │ {:35} │ {:>6} │ {:6} │ {}",
            i + 1,
            truncate(&issue.issue.issue_name, 35),
            issue.issue.count,
            issue.unit.unit_code,
            issue.unit.org_category
        );
    }

    for (issue, breakdown) in report.breakdowns() {
        println!();
        println!("📊 {}: {}", breakdown.label, issue.issue.issue_name);
        for entry in &breakdown.providers {
            println!(
                "   {:35} │ {:>6} │ {:>5.1}%",
                truncate(&entry.provider_name, 35),
                entry.count,
                entry.percentage
            );
        }
    }

    if !report.unit_counts.is_empty() {
        println!();
        println!("🏢 Complaints by DICT Unit");
        for (unit, count) in &report.unit_counts {
            println!("   {:35} │ {:>6}", truncate(unit, 35), count);
        }
    }

    println!();
    println!("📝 Action Plans");
    for (i, plan) in report.plans.iter().enumerate() {
        println!("   {}. [{}] {}", i + 1, plan.unit, plan.issue);
        println!("      {}", plan.action_plan);
        println!("      \x1b[2m{}\x1b[0m", plan.remarks);
    }

    println!();
    println!("🧾 Executive Summary");
    println!("   {}", report.summary.main_summary);
    for (org, text) in &report.summary.org_summaries {
        println!();
        println!("   {}: {}", org, text);
    }
}

/// Dashboard KPIs for a complaint log
pub fn cmd_summary(registry: &Registry, file: &Path) -> Result<()> {
    let dataset = load_dataset(file, registry)?;
    let summary = dashboard_summary(&dataset, registry);

    println!();
    println!("📈 Complaint Summary");
    if let Some((from, to)) = summary.date_range {
        println!("   Period: {} to {}", from, to);
    }
    println!("   ─────────────────────────────────────────────────────────────");
    println!("   Total complaints:    {}", summary.total);
    println!(
        "   Telecom (NTC):       {} ({:.1}%), {} with a provider",
        summary.telecom_count, summary.telecom_percentage, summary.telecom_with_provider
    );
    println!(
        "   Delivery (couriers): {} ({:.1}%), {} unique providers",
        summary.delivery_count, summary.delivery_percentage, summary.unique_delivery_providers
    );

    for (title, providers) in [
        ("Top telecom providers", &summary.top_telecom_providers),
        ("Top delivery providers", &summary.top_delivery_providers),
    ] {
        if providers.is_empty() {
            continue;
        }
        println!();
        println!("   {}:", title);
        for (name, count) in providers {
            println!("   {:35} │ {:>6}", truncate(name, 35), count);
        }
    }

    print_panels(&dashboard_panels(&dataset, registry));
    Ok(())
}

fn print_panels(panels: &DashboardPanels) {
    println!();
    println!("🗓️  Period Comparison");
    println!(
        "   {:6} │ {:10} │ {:>7} │ {:>15} │ {:>15}",
        "Period", "From", "Total", "Telecom", "Delivery"
    );
    println!("   ───────┼────────────┼─────────┼─────────────────┼────────────────");
    for period in &panels.periods {
        let from = period
            .start
            .map(|d| d.to_string())
            .unwrap_or_else(|| "all".to_string());
        println!(
            "   {:6} │ {:10} │ {:>7} │ {:>6} ({:>5.1}%) │ {:>6} ({:>5.1}%)",
            period.period.label(),
            from,
            period.total,
            period.telecom.count,
            period.telecom.percentage,
            period.delivery.count,
            period.delivery.percentage
        );
    }

    for (title, values) in [
        ("Top categories (YTD)", &panels.top_categories),
        ("Top natures (YTD)", &panels.top_natures),
        ("Monthly trend (YTD)", &panels.monthly_trend),
    ] {
        if values.is_empty() {
            continue;
        }
        println!();
        println!("   {}:", title);
        for (name, count) in values {
            println!("   {:35} │ {:>6}", truncate(name, 35), count);
        }
    }

    for period in &panels.periods {
        for (sector, panel) in [("Telecom", &period.telecom), ("Delivery", &period.delivery)] {
            if panel.top_providers.is_empty() {
                continue;
            }
            println!();
            println!("   {} providers ({}):", sector, period.period.label());
            for (name, count) in &panel.top_providers {
                println!("   {:35} │ {:>6}", truncate(name, 35), count);
            }
        }
    }
}
