//! Domain models for complaint triage

use std::collections::BTreeSet;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Provider domains known to the registry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Domain {
    /// Couriers and logistics companies
    Delivery,
    /// Telecommunications and internet providers
    Telecom,
}

impl Domain {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Delivery => "delivery",
            Self::Telecom => "telecom",
        }
    }

    /// The domain a provider of this domain must not be confused with
    pub fn other(&self) -> Domain {
        match self {
            Self::Delivery => Self::Telecom,
            Self::Telecom => Self::Delivery,
        }
    }

    pub fn all() -> &'static [Domain] {
        &[Self::Delivery, Self::Telecom]
    }
}

impl std::str::FromStr for Domain {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "delivery" | "courier" | "pemedes" => Ok(Self::Delivery),
            "telecom" | "telco" | "ntc" => Ok(Self::Telecom),
            _ => Err(format!("Unknown domain: {}", s)),
        }
    }
}

impl std::fmt::Display for Domain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Which complaint field an issue name was taken from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IssueKind {
    Category,
    Nature,
}

impl IssueKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Category => "category",
            Self::Nature => "nature",
        }
    }

    /// Human-readable label used in reports
    pub fn label(&self) -> &'static str {
        match self {
            Self::Category => "Category",
            Self::Nature => "Nature",
        }
    }
}

impl std::str::FromStr for IssueKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "category" => Ok(Self::Category),
            "nature" => Ok(Self::Nature),
            _ => Err(format!("Unknown issue kind: {}", s)),
        }
    }
}

impl std::fmt::Display for IssueKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Organizational grouping of a unit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrgCategory {
    /// Delivery units inside the department
    InternalDeliveryUnit,
    /// Agencies attached to the department
    AttachedAgency,
    /// Partner agencies outside the department
    ExternalAgency,
    /// Unit codes outside every known partition
    Dict,
}

impl OrgCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InternalDeliveryUnit => "internal_delivery_unit",
            Self::AttachedAgency => "attached_agency",
            Self::ExternalAgency => "external_agency",
            Self::Dict => "dict",
        }
    }

    /// Label shown in reports and used as executive summary keys
    pub fn label(&self) -> &'static str {
        match self {
            Self::InternalDeliveryUnit => "Delivery Unit (DICT Internal)",
            Self::AttachedAgency => "Attached Agency",
            Self::ExternalAgency => "External Agency",
            Self::Dict => "DICT",
        }
    }
}

impl std::str::FromStr for OrgCategory {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "internal_delivery_unit" | "delivery_unit" => Ok(Self::InternalDeliveryUnit),
            "attached_agency" => Ok(Self::AttachedAgency),
            "external_agency" => Ok(Self::ExternalAgency),
            "dict" => Ok(Self::Dict),
            _ => Err(format!("Unknown org category: {}", s)),
        }
    }
}

impl std::fmt::Display for OrgCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// A known provider name in one domain
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderRecord {
    pub canonical_name: String,
    pub domain: Domain,
}

/// A noisy provider spelling and the name it stands for
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AliasEntry {
    /// Lowercased variant text
    pub variant_text: String,
    pub canonical_name: String,
}

/// Keyword and entity signature of one organizational unit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitSignature {
    pub unit_code: String,
    pub full_name: String,
    /// Lowercase keyword phrases
    pub keywords: Vec<String>,
    /// Lowercase provider/system names tied to this unit
    pub entity_names: Vec<String>,
    pub category: OrgCategory,
    /// Set for units whose reports carry a provider breakdown
    pub breakdown_label: Option<String>,
}

impl UnitSignature {
    pub fn requires_breakdown(&self) -> bool {
        self.breakdown_label.is_some()
    }

    pub fn assignment(&self) -> UnitAssignment {
        UnitAssignment {
            unit_code: self.unit_code.clone(),
            unit_full_name: self.full_name.clone(),
            org_category: self.category,
        }
    }
}

/// The owning unit of an issue, as handed to report assembly
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitAssignment {
    pub unit_code: String,
    pub unit_full_name: String,
    pub org_category: OrgCategory,
}

/// An issue aggregated from complaint records
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComplaintIssue {
    pub issue_name: String,
    pub source_field: IssueKind,
    pub count: usize,
}

/// Classifier output for one issue
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassificationResult {
    pub issue: ComplaintIssue,
    pub assigned_unit: UnitSignature,
    /// Sum of matched keyword/entity weights (0 for fallbacks and defaults)
    pub confidence_score: u32,
}

impl ClassificationResult {
    pub fn assignment(&self) -> UnitAssignment {
        self.assigned_unit.assignment()
    }
}

/// One provider's share of an issue
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderBreakdownEntry {
    pub provider_name: String,
    pub count: usize,
    /// Share of all providers for the issue, rounded to one decimal
    pub percentage: f64,
}

/// Canonical complaint columns
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Column {
    DateReceived,
    Category,
    Nature,
    Provider,
    Agency,
    Unit,
    Resolution,
}

impl Column {
    /// Canonical header name
    pub fn header(&self) -> &'static str {
        match self {
            Self::DateReceived => "Date of Complaint",
            Self::Category => "Complaint Category",
            Self::Nature => "Complaint Nature",
            Self::Provider => "Service Providers",
            Self::Agency => "Agency",
            Self::Unit => "DICT UNIT",
            Self::Resolution => "Resolution",
        }
    }

    /// Header spellings accepted on import, canonical first
    pub fn alternatives(&self) -> &'static [&'static str] {
        match self {
            Self::DateReceived => &[
                "Date of Complaint",
                "Complaint Date",
                "Date Filed",
                "Filing Date",
                "Date Received",
            ],
            Self::Category => &[
                "Complaint Category",
                "Category",
                "Type",
                "Complaint Type",
            ],
            Self::Nature => &["Complaint Nature", "Nature", "Nature of Complaint"],
            Self::Provider => &[
                "Service Providers",
                "Service Provider",
                "Provider",
                "ISP",
            ],
            Self::Agency => &["Agency", "Department", "Office"],
            Self::Unit => &["DICT UNIT", "Unit"],
            Self::Resolution => &["Resolution"],
        }
    }

    /// Columns a complaint log is expected to carry
    pub fn required() -> &'static [Column] {
        &[
            Self::DateReceived,
            Self::Category,
            Self::Nature,
            Self::Provider,
            Self::Agency,
        ]
    }

    pub fn all() -> &'static [Column] {
        &[
            Self::DateReceived,
            Self::Category,
            Self::Nature,
            Self::Provider,
            Self::Agency,
            Self::Unit,
            Self::Resolution,
        ]
    }
}

/// A cleaned complaint row; every field may be absent
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComplaintRecord {
    pub date_received: Option<NaiveDate>,
    pub category: Option<String>,
    pub nature: Option<String>,
    pub provider: Option<String>,
    pub agency: Option<String>,
    pub unit: Option<String>,
    pub resolution: Option<String>,
}

impl ComplaintRecord {
    pub fn with_category(mut self, category: &str) -> Self {
        self.category = Some(category.to_string());
        self
    }

    pub fn with_nature(mut self, nature: &str) -> Self {
        self.nature = Some(nature.to_string());
        self
    }

    pub fn with_provider(mut self, provider: &str) -> Self {
        self.provider = Some(provider.to_string());
        self
    }

    pub fn with_agency(mut self, agency: &str) -> Self {
        self.agency = Some(agency.to_string());
        self
    }

    pub fn with_unit(mut self, unit: &str) -> Self {
        self.unit = Some(unit.to_string());
        self
    }

    pub fn with_date(mut self, date: NaiveDate) -> Self {
        self.date_received = Some(date);
        self
    }

    /// The text field an issue of this kind is read from
    pub fn issue_field(&self, kind: IssueKind) -> Option<&str> {
        match kind {
            IssueKind::Category => self.category.as_deref(),
            IssueKind::Nature => self.nature.as_deref(),
        }
    }

    fn text(&self, column: Column) -> Option<String> {
        match column {
            Column::DateReceived => self.date_received.map(|d| d.to_string()),
            Column::Category => self.category.clone(),
            Column::Nature => self.nature.clone(),
            Column::Provider => self.provider.clone(),
            Column::Agency => self.agency.clone(),
            Column::Unit => self.unit.clone(),
            Column::Resolution => self.resolution.clone(),
        }
    }
}

/// Complaint records plus the columns their source actually had
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ComplaintDataset {
    pub records: Vec<ComplaintRecord>,
    columns: BTreeSet<Column>,
}

impl ComplaintDataset {
    /// Create a dataset with an explicit column set
    pub fn new(records: Vec<ComplaintRecord>, columns: impl IntoIterator<Item = Column>) -> Self {
        Self {
            records,
            columns: columns.into_iter().collect(),
        }
    }

    /// Create a dataset whose columns are those populated in at least one record
    pub fn from_records(records: Vec<ComplaintRecord>) -> Self {
        let columns = Column::all()
            .iter()
            .copied()
            .filter(|&c| records.iter().any(|r| r.text(c).is_some()))
            .collect();
        Self { records, columns }
    }

    pub fn has_column(&self, column: Column) -> bool {
        self.columns.contains(&column)
    }

    pub fn columns(&self) -> impl Iterator<Item = Column> + '_ {
        self.columns.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Keep matching records; the column set is unchanged
    pub fn filter<F>(&self, mut keep: F) -> Self
    where
        F: FnMut(&ComplaintRecord) -> bool,
    {
        Self {
            records: self.records.iter().filter(|r| keep(r)).cloned().collect(),
            columns: self.columns.clone(),
        }
    }

    /// Earliest and latest complaint dates
    pub fn date_range(&self) -> Option<(NaiveDate, NaiveDate)> {
        let mut dates = self.records.iter().filter_map(|r| r.date_received);
        let first = dates.next()?;
        Some(dates.fold((first, first), |(lo, hi), d| (lo.min(d), hi.max(d))))
    }

    /// SHA-256 over columns and rows, usable as a memoization key
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        for column in &self.columns {
            hasher.update(column.header().as_bytes());
            hasher.update([0x1f]);
        }
        for record in &self.records {
            hasher.update([0x1e]);
            for &column in Column::all() {
                if let Some(value) = record.text(column) {
                    hasher.update(value.as_bytes());
                }
                hasher.update([0x1f]);
            }
        }
        hex::encode(hasher.finalize())
    }
}
