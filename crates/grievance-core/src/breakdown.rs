//! Provider breakdowns per issue
//!
//! For one issue, counts complaints per service provider and ranks the
//! providers by share. Providers that belong to the other domain are
//! dropped first: a telecom name filed under a delivery issue (or the
//! reverse) is treated as a miscategorized record, not a provider.
//!
//! "No data" is never an error; it is reported as a [`BreakdownOutcome`]
//! variant and report assembly omits the section.

use tracing::debug;

use crate::issues::{normalize_complaint_text, ranked_counts};
use crate::matcher::IdentityMatcher;
use crate::models::{Column, ComplaintDataset, Domain, IssueKind, ProviderBreakdownEntry};
use crate::registry::Registry;

/// Default number of providers in a breakdown
pub const DEFAULT_BREAKDOWN_LIMIT: usize = 5;

const DELIVERY_ISSUE_LABEL: &str = "Delivery Concerns (SP)";
const TELECOM_ISSUE_LABEL: &str = "Telco Internet Issues";

/// Breakdown tuning
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BreakdownOptions {
    /// Retry nature issues against normalized nature text when nothing matches exactly
    pub normalized_fallback: bool,
    /// Maximum number of providers returned
    pub limit: usize,
}

impl Default for BreakdownOptions {
    fn default() -> Self {
        Self {
            normalized_fallback: true,
            limit: DEFAULT_BREAKDOWN_LIMIT,
        }
    }
}

/// Result of a breakdown request
#[derive(Debug, Clone, PartialEq)]
pub enum BreakdownOutcome {
    /// Providers ranked by complaint count
    Ranked(Vec<ProviderBreakdownEntry>),
    /// Dataset is empty or has no provider column
    NoProviderColumn,
    /// Dataset lacks the column the issue kind is read from
    NoIssueColumn,
    /// No record carries the issue
    NoMatchingRecords,
    /// Matching records had no usable provider after filtering
    NoProviders,
}

impl BreakdownOutcome {
    /// Ranked entries; empty for every other outcome
    pub fn entries(&self) -> &[ProviderBreakdownEntry] {
        match self {
            Self::Ranked(entries) => entries,
            _ => &[],
        }
    }

    pub fn into_entries(self) -> Vec<ProviderBreakdownEntry> {
        match self {
            Self::Ranked(entries) => entries,
            _ => Vec::new(),
        }
    }

    pub fn is_ranked(&self) -> bool {
        matches!(self, Self::Ranked(_))
    }

    /// Short reason shown when no breakdown is available
    pub fn describe(&self) -> &'static str {
        match self {
            Self::Ranked(_) => "ranked",
            Self::NoProviderColumn => "no service provider data",
            Self::NoIssueColumn => "issue column not present",
            Self::NoMatchingRecords => "no records for this issue",
            Self::NoProviders => "no providers after filtering",
        }
    }
}

/// Which providers to drop for an issue, by the issue's name
pub fn excluded_domain(issue_name: &str) -> Option<Domain> {
    let lowered = issue_name.to_lowercase();
    if issue_name == DELIVERY_ISSUE_LABEL || lowered.contains("delivery") {
        Some(Domain::Telecom)
    } else if issue_name == TELECOM_ISSUE_LABEL
        || lowered.contains("telco")
        || lowered.contains("internet")
    {
        Some(Domain::Delivery)
    } else {
        None
    }
}

/// Ranks providers for an issue
pub struct BreakdownAggregator<'a> {
    matcher: IdentityMatcher<'a>,
    options: BreakdownOptions,
}

impl<'a> BreakdownAggregator<'a> {
    /// Create a new aggregator with default options
    pub fn new(registry: &'a Registry) -> Self {
        Self::with_options(registry, BreakdownOptions::default())
    }

    pub fn with_options(registry: &'a Registry, options: BreakdownOptions) -> Self {
        Self {
            matcher: IdentityMatcher::new(registry),
            options,
        }
    }

    pub fn options(&self) -> &BreakdownOptions {
        &self.options
    }

    /// Top providers among records carrying `issue_name`
    pub fn breakdown(
        &self,
        dataset: &ComplaintDataset,
        issue_name: &str,
        issue_kind: IssueKind,
    ) -> BreakdownOutcome {
        if dataset.is_empty() || !dataset.has_column(Column::Provider) {
            return BreakdownOutcome::NoProviderColumn;
        }
        let issue_column = match issue_kind {
            IssueKind::Category => Column::Category,
            IssueKind::Nature => Column::Nature,
        };
        if !dataset.has_column(issue_column) {
            return BreakdownOutcome::NoIssueColumn;
        }

        let mut matching: Vec<_> = dataset
            .records
            .iter()
            .filter(|r| r.issue_field(issue_kind) == Some(issue_name))
            .collect();

        if matching.is_empty()
            && issue_kind == IssueKind::Nature
            && self.options.normalized_fallback
        {
            matching = dataset
                .records
                .iter()
                .filter(|r| {
                    r.issue_field(issue_kind)
                        .and_then(normalize_complaint_text)
                        .is_some_and(|n| n == issue_name)
                })
                .collect();
            debug!(
                "No exact match for nature {:?}, {} records after normalizing",
                issue_name,
                matching.len()
            );
        }

        if matching.is_empty() {
            return BreakdownOutcome::NoMatchingRecords;
        }

        let excluded = excluded_domain(issue_name);
        let providers = matching
            .iter()
            .filter_map(|r| r.provider.as_deref())
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .filter(|p| match excluded {
                Some(domain) => !self.matcher.matches_domain(Some(*p), domain),
                None => true,
            });

        let counts = ranked_counts(providers);
        let total: usize = counts.iter().map(|(_, c)| c).sum();
        if total == 0 {
            return BreakdownOutcome::NoProviders;
        }

        let entries = counts
            .into_iter()
            .take(self.options.limit)
            .map(|(provider_name, count)| ProviderBreakdownEntry {
                provider_name,
                count,
                percentage: round1(count as f64 / total as f64 * 100.0),
            })
            .collect();

        BreakdownOutcome::Ranked(entries)
    }
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ComplaintRecord;

    fn delivery(provider: &str) -> ComplaintRecord {
        ComplaintRecord::default()
            .with_category("Delivery Concerns (SP)")
            .with_provider(provider)
    }

    #[test]
    fn test_delivery_breakdown_ranks_providers() {
        let registry = Registry::embedded().unwrap();
        let dataset = ComplaintDataset::from_records(vec![
            delivery("LBC Express Corporation"),
            delivery("J&T Express"),
            delivery("LBC Express Corporation"),
        ]);

        let outcome = BreakdownAggregator::new(&registry).breakdown(
            &dataset,
            "Delivery Concerns (SP)",
            IssueKind::Category,
        );
        let entries = outcome.entries();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].provider_name, "LBC Express Corporation");
        assert_eq!(entries[0].count, 2);
        assert_eq!(entries[0].percentage, 66.7);
        assert_eq!(entries[1].provider_name, "J&T Express");
        assert_eq!(entries[1].count, 1);
        assert_eq!(entries[1].percentage, 33.3);
    }

    #[test]
    fn test_telecom_provider_excluded_from_delivery_issue() {
        let registry = Registry::embedded().unwrap();
        let dataset = ComplaintDataset::from_records(vec![
            delivery("LBC"),
            delivery("PLDT"),
            delivery("Globe Telecom"),
        ]);

        let outcome = BreakdownAggregator::new(&registry).breakdown(
            &dataset,
            "Delivery Concerns (SP)",
            IssueKind::Category,
        );
        assert_eq!(outcome.entries().len(), 1);
        assert_eq!(outcome.entries()[0].provider_name, "LBC");
        assert_eq!(outcome.entries()[0].percentage, 100.0);
    }

    #[test]
    fn test_only_telecom_providers_under_delivery_issue() {
        let registry = Registry::embedded().unwrap();
        let dataset = ComplaintDataset::from_records(vec![delivery("PLDT")]);
        let outcome = BreakdownAggregator::new(&registry).breakdown(
            &dataset,
            "Delivery Concerns (SP)",
            IssueKind::Category,
        );
        assert_eq!(outcome, BreakdownOutcome::NoProviders);
        assert!(outcome.entries().is_empty());
    }

    #[test]
    fn test_delivery_provider_excluded_from_telecom_issue() {
        let registry = Registry::embedded().unwrap();
        let telco = |p: &str| {
            ComplaintRecord::default()
                .with_category("Telco Internet Issues")
                .with_provider(p)
        };
        let dataset =
            ComplaintDataset::from_records(vec![telco("PLDT"), telco("LBC"), telco("PLDT")]);
        let outcome = BreakdownAggregator::new(&registry).breakdown(
            &dataset,
            "Telco Internet Issues",
            IssueKind::Category,
        );
        assert_eq!(outcome.entries().len(), 1);
        assert_eq!(outcome.entries()[0].provider_name, "PLDT");
        assert_eq!(outcome.entries()[0].count, 2);
    }

    #[test]
    fn test_top_five_cap_uses_full_population() {
        let registry = Registry::embedded().unwrap();
        let mut records = vec![
            ComplaintRecord::default()
                .with_category("Billing")
                .with_provider("Provider 0");
            3
        ];
        for i in 1..8 {
            records.push(
                ComplaintRecord::default()
                    .with_category("Billing")
                    .with_provider(&format!("Provider {}", i)),
            );
        }
        let dataset = ComplaintDataset::from_records(records);

        let outcome =
            BreakdownAggregator::new(&registry).breakdown(&dataset, "Billing", IssueKind::Category);
        let entries = outcome.entries();
        assert_eq!(entries.len(), 5);
        assert_eq!(entries[0].provider_name, "Provider 0");
        assert_eq!(entries[0].percentage, 30.0);
        assert!(entries[1..].iter().all(|e| e.percentage == 10.0));
        // Ties keep first-appearance order
        assert_eq!(entries[1].provider_name, "Provider 1");
        assert_eq!(entries[4].provider_name, "Provider 4");
        let sum: f64 = entries.iter().map(|e| e.percentage).sum();
        assert!(sum < 100.0);
    }

    #[test]
    fn test_missing_columns_and_empty_data() {
        let registry = Registry::embedded().unwrap();
        let aggregator = BreakdownAggregator::new(&registry);

        let empty = ComplaintDataset::default();
        assert_eq!(
            aggregator.breakdown(&empty, "Delivery Concerns (SP)", IssueKind::Category),
            BreakdownOutcome::NoProviderColumn
        );

        let no_provider = ComplaintDataset::from_records(vec![
            ComplaintRecord::default().with_category("Delivery Concerns (SP)")
        ]);
        assert_eq!(
            aggregator.breakdown(&no_provider, "Delivery Concerns (SP)", IssueKind::Category),
            BreakdownOutcome::NoProviderColumn
        );

        let no_nature = ComplaintDataset::from_records(vec![delivery("LBC")]);
        assert_eq!(
            aggregator.breakdown(&no_nature, "Delayed Parcel", IssueKind::Nature),
            BreakdownOutcome::NoIssueColumn
        );
    }

    #[test]
    fn test_no_matching_records() {
        let registry = Registry::embedded().unwrap();
        let dataset = ComplaintDataset::from_records(vec![delivery("LBC")]);
        let outcome = BreakdownAggregator::new(&registry).breakdown(
            &dataset,
            "Telco Internet Issues",
            IssueKind::Category,
        );
        assert_eq!(outcome, BreakdownOutcome::NoMatchingRecords);
        assert_eq!(outcome.describe(), "no records for this issue");
    }

    #[test]
    fn test_blank_providers_dropped() {
        let registry = Registry::embedded().unwrap();
        let dataset = ComplaintDataset::from_records(vec![
            delivery("   "),
            delivery("LBC"),
            ComplaintRecord::default().with_category("Delivery Concerns (SP)"),
        ]);
        let outcome = BreakdownAggregator::new(&registry).breakdown(
            &dataset,
            "Delivery Concerns (SP)",
            IssueKind::Category,
        );
        assert_eq!(outcome.entries().len(), 1);
        assert_eq!(outcome.entries()[0].percentage, 100.0);
    }

    #[test]
    fn test_normalized_nature_fallback() {
        let registry = Registry::embedded().unwrap();
        let nature = |n: &str, p: &str| ComplaintRecord::default().with_nature(n).with_provider(p);
        let dataset = ComplaintDataset::from_records(vec![
            nature("Delayed parcel", "LBC"),
            nature("delayed undelivered parcel", "J&T"),
            nature("Slow internet", "PLDT"),
        ]);

        let outcome = BreakdownAggregator::new(&registry).breakdown(
            &dataset,
            "Delayed/Undelivered Parcel",
            IssueKind::Nature,
        );
        let names: Vec<&str> = outcome
            .entries()
            .iter()
            .map(|e| e.provider_name.as_str())
            .collect();
        assert_eq!(names, vec!["LBC", "J&T"]);

        let strict = BreakdownAggregator::with_options(
            &registry,
            BreakdownOptions {
                normalized_fallback: false,
                ..Default::default()
            },
        );
        assert_eq!(
            strict.breakdown(&dataset, "Delayed/Undelivered Parcel", IssueKind::Nature),
            BreakdownOutcome::NoMatchingRecords
        );
    }

    #[test]
    fn test_excluded_domain() {
        assert_eq!(excluded_domain("Delivery Concerns (SP)"), Some(Domain::Telecom));
        assert_eq!(excluded_domain("Late DELIVERY"), Some(Domain::Telecom));
        assert_eq!(excluded_domain("Telco Internet Issues"), Some(Domain::Delivery));
        assert_eq!(excluded_domain("Slow Internet"), Some(Domain::Delivery));
        assert_eq!(excluded_domain("Billing"), None);
    }
}
