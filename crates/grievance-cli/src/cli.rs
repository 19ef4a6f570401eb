//! CLI argument definitions using clap
//!
//! This module contains all the clap structs and enums for parsing CLI arguments.
//! The actual command implementations are in the `commands` module.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Grievance - Triage complaint logs into owning units and provider breakdowns
#[derive(Parser)]
#[command(name = "grievance")]
#[command(about = "Complaint triage: provider matching, unit classification and reports", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Registry config override (defaults to the data dir copy, then the built-in registry)
    #[arg(long, global = true)]
    pub registry: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Check provider text against the delivery and telecom registries
    Match {
        /// Provider text as written in a complaint
        text: String,

        /// Only check this domain: delivery, telecom
        #[arg(short, long)]
        domain: Option<String>,
    },

    /// Assign an issue name to its owning unit
    Classify {
        /// Issue name (complaint category or nature)
        text: String,

        /// Field the issue came from: category, nature
        #[arg(short, long, default_value = "category")]
        kind: String,
    },

    /// List the top issues in a complaint log with their units
    Issues {
        /// Complaint log (CSV or Excel workbook)
        #[arg(short, long)]
        file: PathBuf,

        /// Number of issues to show
        #[arg(short, long, default_value = "5")]
        limit: usize,
    },

    /// Rank service providers for one issue
    Breakdown {
        /// Complaint log (CSV or Excel workbook)
        #[arg(short, long)]
        file: PathBuf,

        /// Issue name, e.g. "Delivery Concerns (SP)"
        #[arg(short, long)]
        issue: String,

        /// Field the issue came from: category, nature
        #[arg(short, long, default_value = "category")]
        kind: String,

        /// Match nature issues exactly, without normalizing phrasings
        #[arg(long)]
        no_normalized_fallback: bool,
    },

    /// Build a full report with action plans
    Report {
        /// Complaint log (CSV or Excel workbook)
        #[arg(short, long)]
        file: PathBuf,

        /// Report type: total, delivery, telecom
        #[arg(short = 't', long = "type", default_value = "total")]
        report_type: String,

        /// Coverage window: monthly, quarterly, semi-annual, annual (default: all records)
        #[arg(short, long)]
        coverage: Option<String>,

        /// Output format: table, json, csv
        #[arg(long, default_value = "table")]
        format: String,

        /// Write output to a file instead of stdout (json and csv only)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Draft plans with the built-in mock generator instead of templates
        #[arg(long)]
        mock: bool,
    },

    /// Show dashboard KPIs for a complaint log
    Summary {
        /// Complaint log (CSV or Excel workbook)
        #[arg(short, long)]
        file: PathBuf,
    },

    /// List registry reference data
    Registry {
        /// Section: units, providers, aliases (default: overview)
        section: Option<String>,
    },

    /// List generation prompts and their override status
    Prompts,
}
