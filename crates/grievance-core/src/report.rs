//! Report assembly
//!
//! A report narrows the complaint log by report type and coverage window,
//! takes the top issues of what remains, classifies each one, attaches
//! provider breakdowns for units that need them, and writes action plans
//! plus an executive summary.

use std::collections::BTreeMap;
use std::str::FromStr;

use chrono::{Datelike, Months, NaiveDate};
use serde::Serialize;
use tracing::{debug, info};

use crate::breakdown::{BreakdownAggregator, BreakdownOptions};
use crate::classifier::UnitClassifier;
use crate::error::{Error, Result};
use crate::issues::{ranked_counts, top_issues, DEFAULT_TOP_ISSUES};
use crate::matcher::{is_telecom_agency, IdentityMatcher};
use crate::models::{
    Column, ComplaintDataset, ComplaintIssue, ComplaintRecord, Domain, ProviderBreakdownEntry,
    UnitAssignment,
};
use crate::plans::{ActionPlan, EnrichedIssue, ExecutiveSummary, PlanWriter};
use crate::registry::Registry;

const DELIVERY_CATEGORY: &str = "DELIVERY CONCERNS (SP)";
const TELECOM_CATEGORY: &str = "TELCO INTERNET ISSUES";
const UNIT_COUNT_LIMIT: usize = 10;
const DASHBOARD_TOP_PROVIDERS: usize = 5;
const DASHBOARD_TOP_VALUES: usize = 8;
const DASHBOARD_SECTOR_PROVIDERS: usize = 12;
/// DICT UNIT values left out of unit counts (the regulator has its own report)
const EXCLUDED_UNIT_VALUES: &[&str] = &["NTC", "NATIONAL TELECOMMUNICATIONS COMMISSION"];

/// Which complaints a report covers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportType {
    /// All complaints
    Total,
    /// Delivery concerns filed against couriers
    Delivery,
    /// Telco and internet issues
    Telecom,
}

impl ReportType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Total => "total",
            Self::Delivery => "delivery",
            Self::Telecom => "telecom",
        }
    }

    /// Title used in headers and prompts
    pub fn label(&self) -> &'static str {
        match self {
            Self::Total => "Total (All Complaints)",
            Self::Delivery => "Delivery Concerns (PEMEDES)",
            Self::Telecom => "Telco/Internet Issues (NTC)",
        }
    }

    /// Category value and excluded provider domain for a narrowed report
    fn scope(&self) -> Option<(&'static str, Domain)> {
        match self {
            Self::Total => None,
            Self::Delivery => Some((DELIVERY_CATEGORY, Domain::Telecom)),
            Self::Telecom => Some((TELECOM_CATEGORY, Domain::Delivery)),
        }
    }
}

impl FromStr for ReportType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "total" | "all" => Ok(Self::Total),
            "delivery" | "pemedes" => Ok(Self::Delivery),
            "telecom" | "telco" | "ntc" => Ok(Self::Telecom),
            _ => Err(format!(
                "Unknown report type: {} (valid: total, delivery, telecom)",
                s
            )),
        }
    }
}

impl std::fmt::Display for ReportType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Coverage window ending at the latest complaint date
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Coverage {
    Monthly,
    Quarterly,
    SemiAnnual,
    Annual,
}

impl Coverage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Monthly => "monthly",
            Self::Quarterly => "quarterly",
            Self::SemiAnnual => "semi-annual",
            Self::Annual => "annual",
        }
    }

    pub fn months(&self) -> u32 {
        match self {
            Self::Monthly => 1,
            Self::Quarterly => 3,
            Self::SemiAnnual => 6,
            Self::Annual => 12,
        }
    }

    /// First day of the window ending at `end` (month ends clamp)
    pub fn start_from(&self, end: NaiveDate) -> NaiveDate {
        end.checked_sub_months(Months::new(self.months()))
            .unwrap_or(NaiveDate::MIN)
    }
}

impl FromStr for Coverage {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().replace('_', "-").as_str() {
            "monthly" => Ok(Self::Monthly),
            "quarterly" => Ok(Self::Quarterly),
            "semi-annual" | "semiannual" => Ok(Self::SemiAnnual),
            "annual" | "yearly" => Ok(Self::Annual),
            _ => Err(format!(
                "Unknown coverage: {} (valid: monthly, quarterly, semi-annual, annual)",
                s
            )),
        }
    }
}

impl std::fmt::Display for Coverage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Report options
#[derive(Debug, Clone)]
pub struct ReportOptions {
    pub report_type: ReportType,
    /// `None` covers every record of the report type
    pub coverage: Option<Coverage>,
    pub top_n: usize,
    pub breakdown: BreakdownOptions,
}

impl Default for ReportOptions {
    fn default() -> Self {
        Self {
            report_type: ReportType::Total,
            coverage: None,
            top_n: DEFAULT_TOP_ISSUES,
            breakdown: BreakdownOptions::default(),
        }
    }
}

/// Headline counts
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportMetrics {
    /// Records of the report type, before the coverage window
    pub all_time_total: usize,
    /// Records inside the coverage window
    pub period_total: usize,
    pub telecom_count: usize,
    pub delivery_count: usize,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

/// Ranked providers for one issue
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProviderBreakdown {
    /// Section title, e.g. "Delivery Concerns"
    pub label: String,
    pub providers: Vec<ProviderBreakdownEntry>,
}

/// One top issue with its owning unit
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IssueReport {
    pub issue: ComplaintIssue,
    pub unit: UnitAssignment,
    pub confidence_score: u32,
    /// Only for units that carry breakdowns, and only when providers were found
    #[serde(skip_serializing_if = "Option::is_none")]
    pub breakdown: Option<ProviderBreakdown>,
}

/// A finished report
#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub report_type: ReportType,
    pub coverage: Option<Coverage>,
    pub metrics: ReportMetrics,
    pub issues: Vec<IssueReport>,
    /// Share of period records covered by the top issues, one decimal
    pub top_issue_coverage: f64,
    /// DICT UNIT values and their counts, most frequent first
    pub unit_counts: Vec<(String, usize)>,
    pub plans: Vec<ActionPlan>,
    pub summary: ExecutiveSummary,
    /// Fingerprint of the records the report was built from
    pub fingerprint: String,
}

impl Report {
    /// Issues that have a provider breakdown
    pub fn breakdowns(&self) -> impl Iterator<Item = (&IssueReport, &ProviderBreakdown)> {
        self.issues
            .iter()
            .filter_map(|i| i.breakdown.as_ref().map(|b| (i, b)))
    }
}

/// Builds reports over a registry
pub struct ReportBuilder<'a> {
    registry: &'a Registry,
}

impl<'a> ReportBuilder<'a> {
    pub fn new(registry: &'a Registry) -> Self {
        Self { registry }
    }

    /// Build a report; fails when the selected records yield no issues
    pub fn build(
        &self,
        dataset: &ComplaintDataset,
        options: &ReportOptions,
        writer: &PlanWriter<'_>,
    ) -> Result<Report> {
        let base = self.scope(dataset, options.report_type)?;
        let (period, start_date, end_date) = apply_coverage(&base, options.coverage);
        let metrics = self.metrics(&base, &period, options.report_type, start_date, end_date);
        info!(
            "Building {} report: {} records in period, {} all time",
            options.report_type, metrics.period_total, metrics.all_time_total
        );

        let top = top_issues(&period, options.top_n);
        if top.is_empty() {
            return Err(Error::Report(format!(
                "No complaint issues found for the {} report",
                options.report_type
            )));
        }

        let classifier = UnitClassifier::new(self.registry);
        let aggregator = BreakdownAggregator::with_options(self.registry, options.breakdown.clone());

        let mut issues = Vec::with_capacity(top.len());
        let mut enriched = Vec::with_capacity(top.len());
        for issue in &top {
            let result = classifier.classify_issue(issue);
            let breakdown = result.assigned_unit.breakdown_label.as_ref().and_then(|label| {
                let outcome = aggregator.breakdown(&period, &issue.issue_name, issue.source_field);
                if !outcome.is_ranked() {
                    debug!("No breakdown for {:?}: {}", issue.issue_name, outcome.describe());
                }
                outcome.is_ranked().then(|| ProviderBreakdown {
                    label: label.clone(),
                    providers: outcome.into_entries(),
                })
            });

            let providers = breakdown.as_ref().map(|b| b.providers.as_slice()).unwrap_or_default();
            enriched.push(EnrichedIssue::new(&result, providers));
            issues.push(IssueReport {
                unit: result.assignment(),
                confidence_score: result.confidence_score,
                issue: result.issue,
                breakdown,
            });
        }

        let top_total: usize = top.iter().map(|i| i.count).sum();
        let top_issue_coverage = if period.is_empty() {
            0.0
        } else {
            round1(top_total as f64 / period.len() as f64 * 100.0)
        };

        let plans = writer.write_plans(&enriched, Some(options.report_type.label()));
        let summary = writer.write_summary(&plans, Some(metrics.period_total));

        Ok(Report {
            report_type: options.report_type,
            coverage: options.coverage,
            metrics,
            issues,
            top_issue_coverage,
            unit_counts: unit_counts(&period),
            plans,
            summary,
            fingerprint: period.fingerprint(),
        })
    }

    /// Records belonging to the report type
    pub fn scope(&self, dataset: &ComplaintDataset, report_type: ReportType) -> Result<ComplaintDataset> {
        let Some((category, excluded)) = report_type.scope() else {
            return Ok(dataset.clone());
        };
        if !dataset.has_column(Column::Category) {
            return Err(Error::Report(format!(
                "Cannot build the {} report: no complaint category column",
                report_type
            )));
        }

        let matcher = IdentityMatcher::new(self.registry);
        Ok(dataset.filter(|r| {
            has_category(r.category.as_deref(), category)
                && !r
                    .provider
                    .as_deref()
                    .is_some_and(|p| matcher.matches_domain(Some(p), excluded))
        }))
    }

    fn metrics(
        &self,
        base: &ComplaintDataset,
        period: &ComplaintDataset,
        report_type: ReportType,
        start_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
    ) -> ReportMetrics {
        let period_total = period.len();
        let count = |category: &str| {
            period
                .records
                .iter()
                .filter(|r| has_category(r.category.as_deref(), category))
                .count()
        };
        let (telecom_count, delivery_count) = match report_type {
            ReportType::Total => (count(TELECOM_CATEGORY), count(DELIVERY_CATEGORY)),
            ReportType::Delivery => (0, period_total),
            ReportType::Telecom => (period_total, 0),
        };

        ReportMetrics {
            all_time_total: base.len(),
            period_total,
            telecom_count,
            delivery_count,
            start_date,
            end_date,
        }
    }
}

fn has_category(value: Option<&str>, category: &str) -> bool {
    value.is_some_and(|c| c.trim().to_uppercase() == category)
}

/// Narrow to the coverage window; undated records fall outside any window
fn apply_coverage(
    base: &ComplaintDataset,
    coverage: Option<Coverage>,
) -> (ComplaintDataset, Option<NaiveDate>, Option<NaiveDate>) {
    let Some((earliest, latest)) = base.date_range() else {
        return (base.clone(), None, None);
    };
    match coverage {
        Some(coverage) => {
            let start = coverage.start_from(latest);
            let period = base.filter(|r| r.date_received.is_some_and(|d| d >= start && d <= latest));
            (period, Some(start), Some(latest))
        }
        None => (base.clone(), Some(earliest), Some(latest)),
    }
}

fn unit_counts(dataset: &ComplaintDataset) -> Vec<(String, usize)> {
    let units = dataset
        .records
        .iter()
        .filter_map(|r| r.unit.as_deref())
        .map(str::trim)
        .filter(|u| !u.is_empty())
        .filter(|u| !EXCLUDED_UNIT_VALUES.contains(&u.to_uppercase().as_str()));
    let mut counts = ranked_counts(units);
    counts.truncate(UNIT_COUNT_LIMIT);
    counts
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Headline counts for a whole complaint log
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardSummary {
    pub total: usize,
    /// Complaints whose agency is the telecom regulator
    pub telecom_count: usize,
    pub telecom_percentage: f64,
    pub telecom_with_provider: usize,
    /// Complaints naming a known courier
    pub delivery_count: usize,
    pub delivery_percentage: f64,
    pub unique_delivery_providers: usize,
    pub top_telecom_providers: Vec<(String, usize)>,
    pub top_delivery_providers: Vec<(String, usize)>,
    pub date_range: Option<(NaiveDate, NaiveDate)>,
}

/// Dashboard KPIs: regulator complaints by agency, courier complaints by provider
pub fn dashboard_summary(dataset: &ComplaintDataset, registry: &Registry) -> DashboardSummary {
    let matcher = IdentityMatcher::new(registry);
    let total = dataset.len();

    let telecom: Vec<_> = dataset
        .records
        .iter()
        .filter(|r| is_telecom_agency(r.agency.as_deref()))
        .collect();
    let telecom_providers: Vec<String> = telecom.iter().filter_map(|r| provider_name(r)).collect();

    let delivery_providers: Vec<String> = dataset
        .records
        .iter()
        .filter(|r| matcher.matches_domain(r.provider.as_deref(), Domain::Delivery))
        .filter_map(provider_name)
        .collect();

    let mut top_telecom = ranked_counts(telecom_providers.iter().cloned());
    let mut top_delivery = ranked_counts(delivery_providers.iter().cloned());
    let unique_delivery_providers = top_delivery.len();
    top_telecom.truncate(DASHBOARD_TOP_PROVIDERS);
    top_delivery.truncate(DASHBOARD_TOP_PROVIDERS);

    DashboardSummary {
        total,
        telecom_count: telecom.len(),
        telecom_percentage: percentage(telecom.len(), total),
        telecom_with_provider: telecom_providers.len(),
        delivery_count: delivery_providers.len(),
        delivery_percentage: percentage(delivery_providers.len(), total),
        unique_delivery_providers,
        top_telecom_providers: top_telecom,
        top_delivery_providers: top_delivery,
        date_range: dataset.date_range(),
    }
}

fn provider_name(record: &ComplaintRecord) -> Option<String> {
    record
        .provider
        .as_deref()
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(str::to_string)
}

fn percentage(count: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        round1(count as f64 / total as f64 * 100.0)
    }
}

/// Dashboard comparison windows, each ending at the latest complaint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum DashboardPeriod {
    /// From January 1 of the latest complaint's year
    YearToDate,
    LastQuarter,
    LastMonth,
}

impl DashboardPeriod {
    pub fn all() -> &'static [DashboardPeriod] {
        &[Self::YearToDate, Self::LastQuarter, Self::LastMonth]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::YearToDate => "year-to-date",
            Self::LastQuarter => "last-quarter",
            Self::LastMonth => "last-month",
        }
    }

    /// Short column label
    pub fn label(&self) -> &'static str {
        match self {
            Self::YearToDate => "YTD",
            Self::LastQuarter => "3M",
            Self::LastMonth => "1M",
        }
    }

    pub fn start_from(&self, latest: NaiveDate) -> NaiveDate {
        match self {
            Self::YearToDate => NaiveDate::from_ymd_opt(latest.year(), 1, 1).unwrap_or(latest),
            Self::LastQuarter => Coverage::Quarterly.start_from(latest),
            Self::LastMonth => Coverage::Monthly.start_from(latest),
        }
    }
}

impl std::fmt::Display for DashboardPeriod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One sector's complaints inside a window
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SectorPanel {
    pub count: usize,
    /// Share of all complaints in the window, one decimal
    pub percentage: f64,
    pub top_providers: Vec<(String, usize)>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PeriodPanel {
    pub period: DashboardPeriod,
    /// `None` when nothing is dated and the window is the whole log
    pub start: Option<NaiveDate>,
    pub total: usize,
    /// Complaints routed to the telecom regulator
    pub telecom: SectorPanel,
    /// Complaints naming a known courier
    pub delivery: SectorPanel,
}

/// Chart series behind the dashboard
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardPanels {
    pub periods: Vec<PeriodPanel>,
    /// Year-to-date categories, most frequent first
    pub top_categories: Vec<(String, usize)>,
    pub top_natures: Vec<(String, usize)>,
    /// Year-to-date complaints per `YYYY-MM`, oldest first
    pub monthly_trend: Vec<(String, usize)>,
}

impl DashboardPanels {
    pub fn period(&self, period: DashboardPeriod) -> Option<&PeriodPanel> {
        self.periods.iter().find(|p| p.period == period)
    }
}

/// Period comparison, top categories and natures, monthly trend and
/// per-sector provider rankings
pub fn dashboard_panels(dataset: &ComplaintDataset, registry: &Registry) -> DashboardPanels {
    let matcher = IdentityMatcher::new(registry);
    let latest = dataset.date_range().map(|(_, latest)| latest);

    let window = |period: DashboardPeriod| -> (Option<NaiveDate>, ComplaintDataset) {
        match latest {
            Some(latest) => {
                let start = period.start_from(latest);
                let data = dataset.filter(|r| r.date_received.is_some_and(|d| d >= start));
                (Some(start), data)
            }
            None => (None, dataset.clone()),
        }
    };

    let periods: Vec<PeriodPanel> = DashboardPeriod::all()
        .iter()
        .map(|&period| {
            let (start, data) = window(period);
            PeriodPanel {
                period,
                start,
                total: data.len(),
                telecom: sector_panel(&data, |r| is_telecom_agency(r.agency.as_deref())),
                delivery: sector_panel(&data, |r| {
                    matcher.matches_domain(r.provider.as_deref(), Domain::Delivery)
                }),
            }
        })
        .collect();

    let (_, year_to_date) = window(DashboardPeriod::YearToDate);
    let top_categories = top_values(year_to_date.records.iter().map(|r| r.category.as_deref()));
    let top_natures = top_values(year_to_date.records.iter().map(|r| r.nature.as_deref()));

    let mut months: BTreeMap<String, usize> = BTreeMap::new();
    for date in year_to_date.records.iter().filter_map(|r| r.date_received) {
        *months.entry(date.format("%Y-%m").to_string()).or_default() += 1;
    }

    debug!(
        "Dashboard panels: {} periods, {} months in trend",
        periods.len(),
        months.len()
    );
    DashboardPanels {
        periods,
        top_categories,
        top_natures,
        monthly_trend: months.into_iter().collect(),
    }
}

fn top_values<'a>(values: impl Iterator<Item = Option<&'a str>>) -> Vec<(String, usize)> {
    let mut counts = ranked_counts(values.flatten().map(str::trim).filter(|v| !v.is_empty()));
    counts.truncate(DASHBOARD_TOP_VALUES);
    counts
}

fn sector_panel<F>(data: &ComplaintDataset, in_sector: F) -> SectorPanel
where
    F: Fn(&ComplaintRecord) -> bool,
{
    let sector: Vec<&ComplaintRecord> = data.records.iter().filter(|r| in_sector(r)).collect();
    let mut top_providers = ranked_counts(sector.iter().filter_map(|r| provider_name(r)));
    top_providers.truncate(DASHBOARD_SECTOR_PROVIDERS);
    SectorPanel {
        count: sector.len(),
        percentage: percentage(sector.len(), data.len()),
        top_providers,
    }
}
