//! Unit classification
//!
//! Assigns an issue to the organizational unit that owns it. Every unit
//! signature is scored against the lowercased issue text:
//! - +2 for each keyword phrase found in the text
//! - +3 for each associated entity name found in the text
//!
//! The highest score wins and ties go to the unit declared first in the
//! registry. Text no unit scored on is checked against the registry's
//! ordered fallback rules, then assigned to the default unit.
//!
//! Matching is plain substring search, so short entity names can hit
//! inside longer words ("as" inside "harassment").

use tracing::debug;

use crate::models::{ClassificationResult, ComplaintIssue, IssueKind, UnitAssignment, UnitSignature};
use crate::registry::Registry;

const KEYWORD_WEIGHT: u32 = 2;
const ENTITY_WEIGHT: u32 = 3;

/// Scores issue text against unit signatures
pub struct UnitClassifier<'a> {
    registry: &'a Registry,
}

impl<'a> UnitClassifier<'a> {
    /// Create a new classifier over a registry
    pub fn new(registry: &'a Registry) -> Self {
        Self { registry }
    }

    /// Owning unit for an issue name
    pub fn classify(&self, issue_text: Option<&str>, issue_kind: IssueKind) -> UnitAssignment {
        let (unit, score) = self.resolve(issue_text);
        debug!(
            "Classified {} {:?} -> {} (score {})",
            issue_kind,
            issue_text.unwrap_or_default(),
            unit.unit_code,
            score
        );
        unit.assignment()
    }

    /// Classify an aggregated issue, keeping the winning score
    pub fn classify_issue(&self, issue: &ComplaintIssue) -> ClassificationResult {
        let (unit, score) = self.resolve(Some(&issue.issue_name));
        ClassificationResult {
            issue: issue.clone(),
            assigned_unit: unit.clone(),
            confidence_score: score,
        }
    }

    /// Positive scores per unit, in registry order
    pub fn scores(&self, issue_text: &str) -> Vec<(&'a UnitSignature, u32)> {
        let text = issue_text.to_lowercase();
        self.registry
            .units()
            .iter()
            .map(|unit| (unit, score_unit(unit, &text)))
            .filter(|(_, score)| *score > 0)
            .collect()
    }

    fn resolve(&self, issue_text: Option<&str>) -> (&'a UnitSignature, u32) {
        let default = self.registry.default_unit();
        let Some(text) = issue_text.filter(|t| !t.trim().is_empty()) else {
            return (default, 0);
        };

        let mut best: Option<(&'a UnitSignature, u32)> = None;
        for (unit, score) in self.scores(text) {
            // Strictly greater, so the earlier unit keeps a tie
            if best.map_or(true, |(_, top)| score > top) {
                best = Some((unit, score));
            }
        }
        if let Some(found) = best {
            return found;
        }

        let text = text.to_lowercase();
        for rule in self.registry.fallbacks() {
            if rule.words.iter().any(|w| text.contains(w.as_str())) {
                if let Some(unit) = self.registry.unit(&rule.unit_code) {
                    return (unit, 0);
                }
            }
        }

        (default, 0)
    }
}

fn score_unit(unit: &UnitSignature, text: &str) -> u32 {
    let keywords = unit
        .keywords
        .iter()
        .filter(|k| text.contains(k.as_str()))
        .count() as u32;
    let entities = unit
        .entity_names
        .iter()
        .filter(|e| text.contains(e.as_str()))
        .count() as u32;
    keywords * KEYWORD_WEIGHT + entities * ENTITY_WEIGHT
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::OrgCategory;

    fn registry() -> Registry {
        Registry::embedded().unwrap()
    }

    #[test]
    fn test_empty_text_gets_default_unit() {
        let registry = registry();
        let classifier = UnitClassifier::new(&registry);
        for text in [None, Some(""), Some("   ")] {
            let assignment = classifier.classify(text, IssueKind::Category);
            assert_eq!(assignment.unit_code, "CICC");
            assert_eq!(
                assignment.unit_full_name,
                "Cybercrime Investigation and Coordinating Center"
            );
            assert_eq!(assignment.org_category, OrgCategory::AttachedAgency);
        }
    }

    #[test]
    fn test_delivery_category_goes_to_postal_regulation() {
        let registry = registry();
        let classifier = UnitClassifier::new(&registry);
        let assignment = classifier.classify(Some("Delivery Concerns (SP)"), IssueKind::Category);
        assert_eq!(assignment.unit_code, "PRD");
        assert_eq!(assignment.org_category, OrgCategory::InternalDeliveryUnit);
    }

    #[test]
    fn test_telco_category_goes_to_ntc() {
        let registry = registry();
        let classifier = UnitClassifier::new(&registry);
        let assignment = classifier.classify(Some("Telco Internet Issues"), IssueKind::Category);
        assert_eq!(assignment.unit_code, "NTC");
        assert_eq!(assignment.unit_full_name, "National Telecommunications Commission");
    }

    #[test]
    fn test_entity_names_outweigh_keywords() {
        let registry = registry();
        let classifier = UnitClassifier::new(&registry);
        // "PLDT" (+3) in an otherwise delivery-flavoured sentence ("parcel", +2)
        let assignment = classifier.classify(Some("PLDT modem parcel"), IssueKind::Nature);
        assert_eq!(assignment.unit_code, "NTC");
    }

    #[test]
    fn test_short_entity_matches_inside_words() {
        let registry = registry();
        let classifier = UnitClassifier::new(&registry);
        // "as" (+3) inside "harassment" beats the "harassment" keyword (+2)
        let assignment = classifier.classify(Some("Harassment"), IssueKind::Nature);
        assert_eq!(assignment.unit_code, "AS");
    }

    #[test]
    fn test_tie_goes_to_first_declared_unit() {
        let registry = registry();
        let classifier = UnitClassifier::new(&registry);
        let text = Some("training on encryption");
        let first = classifier.classify(text, IssueKind::Nature);
        assert_eq!(first.unit_code, "ILCDB");
        for _ in 0..10 {
            assert_eq!(classifier.classify(text, IssueKind::Nature), first);
        }
        let scores = classifier.scores("training on encryption");
        let codes: Vec<(&str, u32)> = scores
            .iter()
            .map(|(u, s)| (u.unit_code.as_str(), *s))
            .collect();
        assert_eq!(codes, vec![("ILCDB", 2), ("CSB", 2)]);
    }

    #[test]
    fn test_fallback_rules_in_order() {
        let registry = registry();
        let classifier = UnitClassifier::new(&registry);
        assert_eq!(
            classifier.classify(Some("no connection at home"), IssueKind::Nature).unit_code,
            "NTC"
        );
        assert_eq!(
            classifier.classify(Some("late delivery"), IssueKind::Nature).unit_code,
            "PRD"
        );
        assert_eq!(
            classifier.classify(Some("ecommerce order"), IssueKind::Nature).unit_code,
            "DTI"
        );
    }

    #[test]
    fn test_unmatched_text_gets_default_unit() {
        let registry = registry();
        let classifier = UnitClassifier::new(&registry);
        let issue = ComplaintIssue {
            issue_name: "Mystery".to_string(),
            source_field: IssueKind::Category,
            count: 3,
        };
        let result = classifier.classify_issue(&issue);
        assert_eq!(result.assigned_unit.unit_code, "CICC");
        assert_eq!(result.confidence_score, 0);
        assert_eq!(result.issue, issue);
    }

    #[test]
    fn test_classify_issue_keeps_score() {
        let registry = registry();
        let classifier = UnitClassifier::new(&registry);
        let issue = ComplaintIssue {
            issue_name: "Telco Internet Issues".to_string(),
            source_field: IssueKind::Category,
            count: 10,
        };
        let result = classifier.classify_issue(&issue);
        assert_eq!(result.assignment().unit_code, "NTC");
        assert_eq!(result.confidence_score, 4);
    }
}
