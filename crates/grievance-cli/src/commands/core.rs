//! Shared command utilities
//!
//! This module contains:
//! - `load_registry` - Resolve and load the provider/unit registry
//! - `load_dataset` - Import a complaint log (CSV or workbook)
//! - `parse_arg` - Parse a string flag into a core enum

use std::path::Path;
use std::str::FromStr;

use anyhow::{Context, Result};
use grievance_core::import::import_file;
use grievance_core::{ComplaintDataset, Registry};
use tracing::debug;

/// Load the registry from an explicit path, the data dir override, or the built-in copy
pub fn load_registry(path: Option<&Path>) -> Result<Registry> {
    let registry = match path {
        Some(p) => Registry::load(Some(p))
            .with_context(|| format!("Failed to load registry from {}", p.display()))?,
        None => Registry::new().context("Failed to load registry")?,
    };
    match registry.source() {
        Some(source) => debug!("Using registry {}", source.display()),
        None => debug!("Using built-in registry"),
    }
    Ok(registry)
}

/// Import a complaint log, printing import warnings
pub fn load_dataset(file: &Path, registry: &Registry) -> Result<ComplaintDataset> {
    let result = import_file(file, registry)
        .with_context(|| format!("Failed to import {}", file.display()))?;
    for warning in &result.warnings {
        println!("   ⚠️  {}", warning);
    }
    Ok(result.dataset)
}

/// Parse a flag value with the type's FromStr message on failure
pub fn parse_arg<T>(value: &str) -> Result<T>
where
    T: FromStr<Err = String>,
{
    value.parse::<T>().map_err(anyhow::Error::msg)
}
