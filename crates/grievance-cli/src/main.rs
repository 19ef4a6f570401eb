//! Grievance CLI - Complaint triage reports
//!
//! Usage:
//!   grievance match "LBC Express"              Check provider text against the registry
//!   grievance classify "Telco Internet Issues" Assign an issue to its unit
//!   grievance breakdown --file LOG --issue X   Rank providers for an issue
//!   grievance report --file LOG --type total   Build a report with action plans

mod cli;
mod commands;


use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use cli::*;

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging
    // Priority: RUST_LOG env var > --verbose flag > default (info)
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).compact())
        .init();

    let registry = commands::load_registry(cli.registry.as_deref())?;

    match cli.command {
        Commands::Match { text, domain } => commands::cmd_match(&registry, &text, domain.as_deref()),
        Commands::Classify { text, kind } => commands::cmd_classify(&registry, &text, &kind),
        Commands::Issues { file, limit } => commands::cmd_issues(&registry, &file, limit),
        Commands::Breakdown {
            file,
            issue,
            kind,
            no_normalized_fallback,
        } => commands::cmd_breakdown(&registry, &file, &issue, &kind, !no_normalized_fallback),
        Commands::Report {
            file,
            report_type,
            coverage,
            format,
            output,
            mock,
        } => commands::cmd_report(
            &registry,
            &file,
            &commands::ReportArgs {
                report_type: &report_type,
                coverage: coverage.as_deref(),
                format: &format,
                output: output.as_deref(),
                mock,
            },
        ),
        Commands::Summary { file } => commands::cmd_summary(&registry, &file),
        Commands::Registry { section } => commands::cmd_registry(&registry, section.as_deref()),
        Commands::Prompts => commands::cmd_prompts_list(),
    }
}
