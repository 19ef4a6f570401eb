//! Provider identity matching
//!
//! Decides whether free-text provider names ("LBC", "lbc express corp",
//! "Quadx GoGo Xpress") refer to a known provider of a domain. Matching
//! is layered, each layer widening the match surface:
//!
//! 1. Exact (case-insensitive) equality with a registry name
//! 2. Forward containment: a registry name appears inside the input
//! 3. Backward containment: the input appears inside a registry name
//! 4. Token overlap between multi-word names, ignoring corporate filler
//!
//! Length guards and whether layer 4 runs come from the domain's
//! [`MatchPolicy`]. Delivery and telecom intentionally use different
//! policies: telecom has no forward guard, a stricter backward guard and
//! no token overlap.
//!
//! Matching favours recall over precision; short fragments can match.

use std::collections::HashSet;
use std::fmt::Display;

use crate::models::Domain;
use crate::registry::{MatchPolicy, Registry};

/// Matches provider text against the registry
pub struct IdentityMatcher<'a> {
    registry: &'a Registry,
}

impl<'a> IdentityMatcher<'a> {
    /// Create a new matcher over a registry
    pub fn new(registry: &'a Registry) -> Self {
        Self { registry }
    }

    /// Does the text name a known provider of `domain`?
    ///
    /// Missing or blank text never matches.
    pub fn matches_domain(&self, raw_text: Option<&str>, domain: Domain) -> bool {
        let Some(input) = raw_text.map(normalize).filter(|s| !s.is_empty()) else {
            return false;
        };

        let names = self.registry.lowered_names(domain);
        let policy = self.registry.policy(domain);

        if names.iter().any(|name| *name == input) {
            return true;
        }

        let input_len = input.chars().count();
        for name in names {
            if name.contains(input.as_str()) && input_len >= policy.min_backward_len {
                return true;
            }
            if input.contains(name.as_str()) && forward_allowed(name, policy) {
                return true;
            }
        }

        if policy.token_overlap && input.contains(' ') {
            let stop_words = self.registry.stop_words();
            let input_words = meaningful_words(&input, stop_words);
            for name in names.iter().filter(|n| n.contains(' ')) {
                let name_words = meaningful_words(name, stop_words);
                if name_words.len() >= 2 && name_words.intersection(&input_words).count() >= 2 {
                    return true;
                }
            }
        }

        false
    }

    /// Match any displayable value (numbers, ids) by its string form
    pub fn matches_value<T: Display + ?Sized>(&self, value: &T, domain: Domain) -> bool {
        self.matches_domain(Some(&value.to_string()), domain)
    }

    /// The domain a provider belongs to, telecom checked first
    pub fn classify_provider(&self, raw_text: Option<&str>) -> Option<Domain> {
        [Domain::Telecom, Domain::Delivery]
            .into_iter()
            .find(|&d| self.matches_domain(raw_text, d))
    }
}

/// Is the complaint addressed to the telecom regulator?
pub fn is_telecom_agency(agency: Option<&str>) -> bool {
    agency.is_some_and(|a| a.trim().to_lowercase().contains("ntc"))
}

fn normalize(text: &str) -> String {
    text.trim().to_lowercase()
}

fn forward_allowed(name: &str, policy: &MatchPolicy) -> bool {
    name.chars().count() >= policy.min_forward_len
        || policy.short_names.iter().any(|s| s == name)
}

fn meaningful_words<'t>(text: &'t str, stop_words: &HashSet<String>) -> HashSet<&'t str> {
    text.split_whitespace()
        .filter(|w| !stop_words.contains(*w))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> Registry {
        Registry::embedded().unwrap()
    }

    #[test]
    fn test_every_registry_name_matches_itself() {
        let registry = registry();
        let matcher = IdentityMatcher::new(&registry);
        for &domain in Domain::all() {
            for provider in registry.providers(domain) {
                let name = provider.canonical_name.as_str();
                assert!(matcher.matches_domain(Some(name), domain), "{}", name);
                assert!(
                    matcher.matches_domain(Some(&name.to_uppercase()), domain),
                    "{}",
                    name
                );
            }
        }
    }

    #[test]
    fn test_blank_input_never_matches() {
        let registry = registry();
        let matcher = IdentityMatcher::new(&registry);
        for &domain in Domain::all() {
            assert!(!matcher.matches_domain(None, domain));
            assert!(!matcher.matches_domain(Some(""), domain));
            assert!(!matcher.matches_domain(Some("   "), domain));
        }
    }

    #[test]
    fn test_short_fragments() {
        let registry = registry();
        let matcher = IdentityMatcher::new(&registry);
        // "go" appears in "GO21, Inc." but is too short to match backwards
        assert!(!matcher.matches_domain(Some("go"), Domain::Delivery));
        assert!(matcher.matches_domain(Some("SPX"), Domain::Delivery));
        assert!(matcher.matches_domain(Some("  lbc "), Domain::Delivery));
    }

    #[test]
    fn test_forward_containment_with_suffixes() {
        let registry = registry();
        let matcher = IdentityMatcher::new(&registry);
        assert!(matcher.matches_domain(Some("LBC Express Corp - Makati"), Domain::Delivery));
        assert!(matcher.matches_domain(Some("J&T (cash on delivery)"), Domain::Delivery));
        assert!(matcher.matches_domain(Some("PLDT Home Fiber"), Domain::Telecom));
    }

    #[test]
    fn test_forward_guard_on_short_registry_names() {
        let registry = Registry::from_toml(
            r#"
[providers]
delivery = ["Go"]
telecom = ["Go"]

[[units]]
code = "X"
name = "X"
category = "attached_agency"
"#,
        )
        .unwrap();
        let matcher = IdentityMatcher::new(&registry);
        assert!(!matcher.matches_domain(Some("going places"), Domain::Delivery));
        // Telecom names are not length guarded
        assert!(matcher.matches_domain(Some("going places"), Domain::Telecom));
    }

    #[test]
    fn test_backward_containment_guards_differ_by_domain() {
        let registry = registry();
        let matcher = IdentityMatcher::new(&registry);
        // Three characters are enough for delivery ("Sky Express")
        assert!(matcher.matches_domain(Some("sky"), Domain::Delivery));
        // Telecom needs more than three ("Sky Cable")
        assert!(!matcher.matches_domain(Some("sky"), Domain::Telecom));
        assert!(matcher.matches_domain(Some("sky c"), Domain::Telecom));
        assert!(matcher.matches_domain(Some("Ninja"), Domain::Delivery));
    }

    #[test]
    fn test_token_overlap_is_delivery_only() {
        let registry = registry();
        let matcher = IdentityMatcher::new(&registry);
        assert!(matcher.matches_domain(Some("Van Ninja"), Domain::Delivery));
        assert!(!matcher.matches_domain(Some("Telecom Now"), Domain::Telecom));
    }

    #[test]
    fn test_token_overlap_ignores_stop_words() {
        let registry = registry();
        let matcher = IdentityMatcher::new(&registry);
        // Only filler words in common with every registry name
        assert!(!matcher.matches_domain(Some("express delivery services"), Domain::Telecom));
        assert!(!matcher.matches_domain(Some("acme express corporation"), Domain::Delivery));
    }

    #[test]
    fn test_cross_domain_names_do_not_match() {
        let registry = registry();
        let matcher = IdentityMatcher::new(&registry);
        assert!(!matcher.matches_domain(Some("PLDT"), Domain::Delivery));
        assert!(!matcher.matches_domain(Some("Converge"), Domain::Delivery));
        assert!(!matcher.matches_domain(Some("J&T Express"), Domain::Telecom));
        assert!(!matcher.matches_domain(Some("LBC Express Corporation"), Domain::Telecom));
    }

    #[test]
    fn test_matches_value_stringifies() {
        let registry = registry();
        let matcher = IdentityMatcher::new(&registry);
        assert!(matcher.matches_value(&2100, Domain::Delivery));
        assert!(!matcher.matches_value(&42, Domain::Telecom));
    }

    #[test]
    fn test_classify_provider() {
        let registry = registry();
        let matcher = IdentityMatcher::new(&registry);
        assert_eq!(matcher.classify_provider(Some("Globe")), Some(Domain::Telecom));
        assert_eq!(matcher.classify_provider(Some("Lalamove")), Some(Domain::Delivery));
        assert_eq!(matcher.classify_provider(Some("Meralco")), None);
        assert_eq!(matcher.classify_provider(None), None);
    }

    #[test]
    fn test_is_telecom_agency() {
        assert!(is_telecom_agency(Some("NTC")));
        assert!(is_telecom_agency(Some("  ntc - region 4a ")));
        assert!(!is_telecom_agency(Some("DICT")));
        assert!(!is_telecom_agency(None));
    }
}
