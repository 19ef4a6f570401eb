//! Provider and organizational unit registry
//!
//! Holds the reference data every decision in the crate is made against:
//! - Known provider names per domain (delivery, telecom)
//! - Alias table for noisy provider spellings
//! - Unit signatures (keywords and entity names) in declaration order
//! - Fallback rules and the default unit for unclassifiable issues
//! - Per-domain matching policy
//!
//! ## Configuration Resolution
//!
//! The registry is loaded with a two-layer resolution:
//! 1. Check for override in data dir (~/.local/share/grievance/config/registry.toml)
//! 2. Fall back to embedded defaults (compiled into binary)
//!
//! A loaded registry is immutable and can be shared freely across threads.

use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::debug;

use crate::error::{Error, Result};
use crate::models::{AliasEntry, Domain, OrgCategory, ProviderRecord, UnitSignature};

/// Embedded default registry (compiled into binary)
pub const DEFAULT_REGISTRY: &str = include_str!("../../../config/registry.toml");

/// How liberally provider text is matched against one domain's names
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchPolicy {
    /// Minimum length of a registry name found inside the input
    pub min_forward_len: usize,
    /// Lowercase registry names exempt from `min_forward_len`
    pub short_names: Vec<String>,
    /// Minimum length of an input found inside a registry name
    pub min_backward_len: usize,
    /// Whether multi-word token overlap is tried as a last resort
    pub token_overlap: bool,
}

impl MatchPolicy {
    /// Courier names: guarded containment plus token overlap
    pub fn delivery() -> Self {
        Self {
            min_forward_len: 5,
            short_names: ["lbc", "2go", "j&t", "spx", "air21"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            min_backward_len: 3,
            token_overlap: true,
        }
    }

    /// Telecom names: unguarded forward containment, no token overlap
    pub fn telecom() -> Self {
        Self {
            min_forward_len: 0,
            short_names: Vec::new(),
            min_backward_len: 4,
            token_overlap: false,
        }
    }

    fn for_domain(domain: Domain) -> Self {
        match domain {
            Domain::Delivery => Self::delivery(),
            Domain::Telecom => Self::telecom(),
        }
    }
}

/// Maps generic words to a unit when no signature scored
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FallbackRule {
    pub words: Vec<String>,
    pub unit_code: String,
}

/// Per-domain provider names with lowercased forms cached for matching
#[derive(Debug, Clone, Default)]
struct ProviderList {
    records: Vec<ProviderRecord>,
    lowered: Vec<String>,
}

impl ProviderList {
    fn new(domain: Domain, names: Vec<String>) -> Self {
        let mut records = Vec::with_capacity(names.len());
        let mut lowered = Vec::with_capacity(names.len());
        for name in names {
            let name = name.trim().to_string();
            if name.is_empty() {
                continue;
            }
            lowered.push(name.to_lowercase());
            records.push(ProviderRecord {
                canonical_name: name,
                domain,
            });
        }
        Self { records, lowered }
    }
}

/// Immutable reference data for matching and classification
#[derive(Debug, Clone)]
pub struct Registry {
    delivery: ProviderList,
    telecom: ProviderList,
    delivery_policy: MatchPolicy,
    telecom_policy: MatchPolicy,
    stop_words: HashSet<String>,
    aliases: Vec<AliasEntry>,
    alias_index: HashMap<String, usize>,
    units: Vec<UnitSignature>,
    fallbacks: Vec<FallbackRule>,
    default_unit: usize,
    source: Option<PathBuf>,
}

impl Registry {
    /// Load the registry (override first, then embedded default)
    pub fn new() -> Result<Self> {
        match default_registry_path() {
            Some(path) if path.exists() => Self::from_path(&path),
            _ => Self::embedded(),
        }
    }

    /// Load from an explicit path, or resolve the default locations
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::from_path(path),
            None => Self::new(),
        }
    }

    /// Parse the embedded default registry
    pub fn embedded() -> Result<Self> {
        Self::from_toml(DEFAULT_REGISTRY)
    }

    /// Read and parse a registry file
    pub fn from_path(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(Error::NotFound(format!(
                "Registry file {}",
                path.display()
            )));
        }
        let content = fs::read_to_string(path)?;
        let mut registry = Self::from_toml(&content)?;
        registry.source = Some(path.to_path_buf());
        debug!("Loaded registry override from {}", path.display());
        Ok(registry)
    }

    /// Parse registry TOML content
    pub fn from_toml(content: &str) -> Result<Self> {
        let raw: RawRegistry = toml::from_str(content)
            .map_err(|e| Error::Config(format!("Invalid registry TOML: {}", e)))?;
        build_registry(raw)
    }

    /// Provider records of a domain, in declaration order
    pub fn providers(&self, domain: Domain) -> &[ProviderRecord] {
        &self.list(domain).records
    }

    /// Lowercased provider names of a domain, parallel to `providers`
    pub fn lowered_names(&self, domain: Domain) -> &[String] {
        &self.list(domain).lowered
    }

    fn list(&self, domain: Domain) -> &ProviderList {
        match domain {
            Domain::Delivery => &self.delivery,
            Domain::Telecom => &self.telecom,
        }
    }

    pub fn policy(&self, domain: Domain) -> &MatchPolicy {
        match domain {
            Domain::Delivery => &self.delivery_policy,
            Domain::Telecom => &self.telecom_policy,
        }
    }

    /// Generic corporate words ignored by token overlap
    pub fn stop_words(&self) -> &HashSet<String> {
        &self.stop_words
    }

    pub fn aliases(&self) -> &[AliasEntry] {
        &self.aliases
    }

    /// Canonical name for a known variant spelling (case-insensitive, trimmed)
    pub fn canonical_alias(&self, text: &str) -> Option<&str> {
        let key = text.trim().to_lowercase();
        self.alias_index
            .get(&key)
            .map(|&i| self.aliases[i].canonical_name.as_str())
    }

    /// Units in declaration order
    pub fn units(&self) -> &[UnitSignature] {
        &self.units
    }

    pub fn unit(&self, code: &str) -> Option<&UnitSignature> {
        let code = code.trim();
        self.units
            .iter()
            .find(|u| u.unit_code.eq_ignore_ascii_case(code))
    }

    /// Unit assigned to empty or unclassifiable issues
    pub fn default_unit(&self) -> &UnitSignature {
        &self.units[self.default_unit]
    }

    pub fn fallbacks(&self) -> &[FallbackRule] {
        &self.fallbacks
    }

    /// Category of a unit code; unknown codes fall into the generic bucket
    pub fn category_of(&self, code: &str) -> OrgCategory {
        self.unit(code)
            .map(|u| u.category)
            .unwrap_or(OrgCategory::Dict)
    }

    pub fn requires_breakdown(&self, code: &str) -> bool {
        self.unit(code).is_some_and(|u| u.requires_breakdown())
    }

    /// Units whose reports carry provider breakdowns
    pub fn breakdown_units(&self) -> impl Iterator<Item = &UnitSignature> {
        self.units.iter().filter(|u| u.requires_breakdown())
    }

    /// Path the registry was loaded from, if not embedded
    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }
}

/// Default registry override path
pub fn default_registry_path() -> Option<PathBuf> {
    dirs::data_local_dir().map(|d| d.join("grievance").join("config").join("registry.toml"))
}

/// Raw registry structure for TOML parsing
#[derive(Debug, Deserialize)]
struct RawRegistry {
    defaults: Option<RawDefaults>,
    matching: Option<RawMatching>,
    #[serde(default)]
    providers: RawProviders,
    #[serde(default)]
    aliases: Vec<RawAlias>,
    #[serde(default)]
    units: Vec<RawUnit>,
    #[serde(default)]
    fallbacks: Vec<RawFallback>,
}

#[derive(Debug, Deserialize)]
struct RawDefaults {
    default_unit: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawMatching {
    stop_words: Option<Vec<String>>,
    delivery: Option<RawPolicy>,
    telecom: Option<RawPolicy>,
}

#[derive(Debug, Deserialize)]
struct RawPolicy {
    min_forward_len: Option<usize>,
    short_names: Option<Vec<String>>,
    min_backward_len: Option<usize>,
    token_overlap: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
struct RawProviders {
    #[serde(default)]
    delivery: Vec<String>,
    #[serde(default)]
    telecom: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct RawAlias {
    variant: String,
    canonical: String,
}

#[derive(Debug, Deserialize)]
struct RawUnit {
    code: String,
    name: String,
    category: String,
    #[serde(default)]
    keywords: Vec<String>,
    #[serde(default)]
    entities: Vec<String>,
    breakdown: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawFallback {
    words: Vec<String>,
    unit: String,
}

const DEFAULT_STOP_WORDS: &[&str] = &[
    "inc",
    "corp",
    "corporation",
    "express",
    "services",
    "service",
    "courier",
    "delivery",
    "logistics",
    "international",
    "phils",
    "philippines",
    "ltd",
    "co",
    "and",
    "the",
];

fn apply_policy(domain: Domain, raw: Option<RawPolicy>) -> MatchPolicy {
    let mut policy = MatchPolicy::for_domain(domain);
    if let Some(raw) = raw {
        if let Some(len) = raw.min_forward_len {
            policy.min_forward_len = len;
        }
        if let Some(names) = raw.short_names {
            policy.short_names = names.iter().map(|n| n.trim().to_lowercase()).collect();
        }
        if let Some(len) = raw.min_backward_len {
            policy.min_backward_len = len;
        }
        if let Some(overlap) = raw.token_overlap {
            policy.token_overlap = overlap;
        }
    }
    policy
}

/// Lowercase, trim and dedupe phrases while keeping first-seen order
fn lowered_unique(items: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    items
        .into_iter()
        .map(|s| s.trim().to_lowercase())
        .filter(|s| !s.is_empty() && seen.insert(s.clone()))
        .collect()
}

fn build_registry(raw: RawRegistry) -> Result<Registry> {
    let (delivery_policy, telecom_policy, stop_words) = match raw.matching {
        Some(m) => (
            apply_policy(Domain::Delivery, m.delivery),
            apply_policy(Domain::Telecom, m.telecom),
            m.stop_words,
        ),
        None => (MatchPolicy::delivery(), MatchPolicy::telecom(), None),
    };
    let stop_words: HashSet<String> = match stop_words {
        Some(words) => words.iter().map(|w| w.trim().to_lowercase()).collect(),
        None => DEFAULT_STOP_WORDS.iter().map(|w| w.to_string()).collect(),
    };

    let mut units: Vec<UnitSignature> = Vec::with_capacity(raw.units.len());
    for unit in raw.units {
        let code = unit.code.trim().to_string();
        if code.is_empty() {
            return Err(Error::Config("Unit with empty code".into()));
        }
        if units.iter().any(|u| u.unit_code.eq_ignore_ascii_case(&code)) {
            return Err(Error::Config(format!("Duplicate unit code: {}", code)));
        }
        let category: OrgCategory = unit
            .category
            .parse()
            .map_err(|e: String| Error::Config(format!("Unit {}: {}", code, e)))?;
        if category == OrgCategory::Dict {
            return Err(Error::Config(format!(
                "Unit {}: category must be internal_delivery_unit, attached_agency or external_agency",
                code
            )));
        }
        units.push(UnitSignature {
            unit_code: code,
            full_name: unit.name.trim().to_string(),
            keywords: lowered_unique(unit.keywords),
            entity_names: lowered_unique(unit.entities),
            category,
            breakdown_label: unit.breakdown.filter(|b| !b.trim().is_empty()),
        });
    }

    if units.is_empty() {
        return Err(Error::Config("Registry defines no units".into()));
    }

    let find_unit = |code: &str| -> Result<usize> {
        units
            .iter()
            .position(|u| u.unit_code.eq_ignore_ascii_case(code.trim()))
            .ok_or_else(|| Error::Config(format!("Unknown unit code: {}", code)))
    };

    let default_unit = match raw.defaults.and_then(|d| d.default_unit) {
        Some(code) => find_unit(&code)?,
        None => 0,
    };

    let mut fallbacks = Vec::with_capacity(raw.fallbacks.len());
    for rule in raw.fallbacks {
        let index = find_unit(&rule.unit)?;
        fallbacks.push(FallbackRule {
            words: lowered_unique(rule.words),
            unit_code: units[index].unit_code.clone(),
        });
    }

    let mut aliases = Vec::with_capacity(raw.aliases.len());
    let mut alias_index = HashMap::new();
    for alias in raw.aliases {
        let variant = alias.variant.trim().to_lowercase();
        let canonical = alias.canonical.trim().to_string();
        if variant.is_empty() || canonical.is_empty() {
            continue;
        }
        if alias_index.contains_key(&variant) {
            return Err(Error::Config(format!("Duplicate alias: {}", variant)));
        }
        alias_index.insert(variant.clone(), aliases.len());
        aliases.push(AliasEntry {
            variant_text: variant,
            canonical_name: canonical,
        });
    }

    let registry = Registry {
        delivery: ProviderList::new(Domain::Delivery, raw.providers.delivery),
        telecom: ProviderList::new(Domain::Telecom, raw.providers.telecom),
        delivery_policy,
        telecom_policy,
        stop_words,
        aliases,
        alias_index,
        units,
        fallbacks,
        default_unit,
        source: None,
    };

    debug!(
        "Registry: {} delivery, {} telecom providers, {} units, {} aliases",
        registry.delivery.records.len(),
        registry.telecom.records.len(),
        registry.units.len(),
        registry.aliases.len()
    );

    Ok(registry)
}
