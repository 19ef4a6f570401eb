//! CLI command implementations
//!
//! Commands are organized by domain:
//! - `core` - Shared utilities (load_registry, load_dataset)
//! - `classify` - Matching, classification, issue and breakdown commands
//! - `prompts` - Prompt library listing
//! - `registry` - Registry reference data listing
//! - `reports` - Report and dashboard summary commands

pub mod classify;
pub mod core;
pub mod prompts;
pub mod registry;
pub mod reports;

// Re-export command functions for main.rs
pub use classify::*;
pub use core::*;
pub use prompts::*;
pub use registry::*;
pub use reports::*;

/// Truncate a string to a maximum length, adding "..." if truncated
pub fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}
