//! Top issue extraction
//!
//! Issues come from the complaint category column first. When fewer than
//! the requested number of categories exist, the remaining slots are
//! filled from complaint natures, grouped after normalizing near-duplicate
//! phrasings ("Delayed parcel", "delayed /undelivered parcel") into one
//! canonical issue name.

use std::collections::HashMap;

use tracing::debug;

use crate::models::{Column, ComplaintDataset, ComplaintIssue, IssueKind};

/// Default number of issues in a report
pub const DEFAULT_TOP_ISSUES: usize = 5;

/// Canonical issue names and the phrasings folded into them, checked in order
const ISSUE_PATTERNS: &[(&str, &[&str])] = &[
    (
        "delayed/undelivered parcel",
        &[
            "delayed parcel",
            "undelivered parcel",
            "delayed/ undelivered parcel",
            "delayed /undelivered parcel",
            "delayed undelivered parcel",
        ],
    ),
    (
        "mishandled parcel",
        &["mishandled parcel", "damaged parcel", "lost parcel"],
    ),
    (
        "delivery concerns",
        &["delivery concern", "delivery issue", "delivery problem"],
    ),
    (
        "billing issues",
        &["billing issue", "billing problem", "billing concern"],
    ),
    (
        "internet disconnection",
        &[
            "internet disconnection",
            "internet disconnect",
            "service disconnection",
        ],
    ),
    (
        "slow connection",
        &["slow internet", "poor connection", "slow connection"],
    ),
    (
        "technical issues",
        &["technical issue", "technical problem", "technical concern"],
    ),
];

/// Fold a complaint phrasing into its canonical, title-cased issue name
///
/// Returns `None` for blank text.
pub fn normalize_complaint_text(text: &str) -> Option<String> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }

    let lowered = trimmed.to_lowercase();
    for (canonical, variants) in ISSUE_PATTERNS {
        if variants.iter().any(|v| lowered.contains(v)) {
            return Some(title_case(canonical));
        }
    }

    Some(title_case(trimmed))
}

/// Capitalize every letter that follows a non-letter, lowercase the rest
pub fn title_case(text: &str) -> String {
    let mut result = String::with_capacity(text.len());
    let mut prev_is_letter = false;
    for c in text.chars() {
        if c.is_alphabetic() {
            if prev_is_letter {
                result.extend(c.to_lowercase());
            } else {
                result.extend(c.to_uppercase());
            }
            prev_is_letter = true;
        } else {
            result.push(c);
            prev_is_letter = false;
        }
    }
    result
}

/// Count values, most frequent first; equal counts keep first-appearance order
pub fn ranked_counts<I, S>(values: I) -> Vec<(String, usize)>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut counts: Vec<(String, usize)> = Vec::new();
    for value in values {
        let value = value.into();
        match index.get(&value) {
            Some(&i) => counts[i].1 += 1,
            None => {
                index.insert(value.clone(), counts.len());
                counts.push((value, 1));
            }
        }
    }
    // Stable sort keeps first appearance among ties
    counts.sort_by(|a, b| b.1.cmp(&a.1));
    counts
}

/// Most frequent issues: categories first, natures fill remaining slots
pub fn top_issues(dataset: &ComplaintDataset, limit: usize) -> Vec<ComplaintIssue> {
    let mut issues = Vec::with_capacity(limit);
    if dataset.is_empty() || limit == 0 {
        return issues;
    }

    if dataset.has_column(Column::Category) {
        let categories = dataset
            .records
            .iter()
            .filter_map(|r| r.category.as_deref())
            .filter(|c| !c.trim().is_empty());
        for (name, count) in ranked_counts(categories).into_iter().take(limit) {
            issues.push(ComplaintIssue {
                issue_name: name,
                source_field: IssueKind::Category,
                count,
            });
        }
    }

    if issues.len() < limit && dataset.has_column(Column::Nature) {
        let natures = dataset
            .records
            .iter()
            .filter_map(|r| r.nature.as_deref())
            .filter_map(normalize_complaint_text);
        let remaining = limit - issues.len();
        for (name, count) in ranked_counts(natures).into_iter().take(remaining) {
            issues.push(ComplaintIssue {
                issue_name: name,
                source_field: IssueKind::Nature,
                count,
            });
        }
    }

    debug!("Extracted {} top issues", issues.len());
    issues
}
