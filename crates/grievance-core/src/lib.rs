//! Grievance Core Library
//!
//! Shared functionality for the Grievance complaint triage tool:
//! - Provider registry with courier and telecom reference data
//! - Identity matching of noisy provider names against a domain
//! - Unit classification of complaint issues by keyword and entity scoring
//! - Provider breakdowns per issue with cross-domain exclusion
//! - CSV and spreadsheet import of complaint logs
//! - Report assembly with action plans and executive summaries
//! - Prompt library for customizable generation prompts

pub mod ai;
pub mod breakdown;
pub mod classifier;
pub mod error;
pub mod export;
pub mod import;
pub mod issues;
pub mod matcher;
pub mod models;
pub mod plans;
pub mod prompts;
pub mod registry;
pub mod report;

pub use ai::{GenerationRequest, MockBackend, TextBackend};
pub use breakdown::{BreakdownAggregator, BreakdownOptions, BreakdownOutcome};
pub use classifier::UnitClassifier;
pub use error::{Error, Result};
pub use export::ExportFormat;
pub use import::{import_file, import_workbook, parse_csv, ImportResult, ImportStats};
pub use issues::top_issues;
pub use matcher::{is_telecom_agency, IdentityMatcher};
pub use models::{
    ClassificationResult, Column, ComplaintDataset, ComplaintIssue, ComplaintRecord, Domain,
    IssueKind, OrgCategory, ProviderBreakdownEntry, UnitAssignment, UnitSignature,
};
pub use plans::{ActionPlan, EnrichedIssue, ExecutiveSummary, PlanWriter};
pub use prompts::{Prompt, PromptId, PromptLibrary};
pub use registry::{MatchPolicy, Registry};
pub use report::{
    dashboard_panels, dashboard_summary, Coverage, DashboardPanels, DashboardPeriod,
    DashboardSummary, Report, ReportBuilder, ReportOptions, ReportType,
};
