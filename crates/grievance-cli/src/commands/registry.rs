//! Registry listing command

use anyhow::Result;
use grievance_core::{Domain, Registry};

use super::truncate;

/// Show the loaded registry, or one section of it
pub fn cmd_registry(registry: &Registry, section: Option<&str>) -> Result<()> {
    match section.map(|s| s.to_lowercase()).as_deref() {
        None => print_overview(registry),
        Some("units") => print_units(registry),
        Some("providers") => print_providers(registry),
        Some("aliases") => print_aliases(registry),
        Some(other) => {
            anyhow::bail!(
                "Unknown registry section: {}. Available: units, providers, aliases",
                other
            )
        }
    }
    Ok(())
}

fn print_overview(registry: &Registry) {
    println!();
    println!("📚 Registry");
    println!(
        "   Source: {}",
        registry
            .source()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "built-in".to_string())
    );
    println!("   ─────────────────────────────────────────────");
    for domain in Domain::all() {
        println!(
            "   {:10} providers: {}",
            domain.as_str(),
            registry.providers(*domain).len()
        );
    }
    println!("   Aliases:             {}", registry.aliases().len());
    println!("   Units:               {}", registry.units().len());
    println!("   Fallback rules:      {}", registry.fallbacks().len());
    println!("   Default unit:        {}", registry.default_unit().unit_code);

    let breakdown: Vec<&str> = registry
        .breakdown_units()
        .map(|u| u.unit_code.as_str())
        .collect();
    println!("   Breakdown units:     {}", breakdown.join(", "));
}

fn print_units(registry: &Registry) {
    println!();
    println!(
        "   {:8} │ {:45} │ {:18} │ {}",
        "Code", "Name", "Category", "Breakdown"
    );
    println!("   ─────────┼───────────────────────────────────────────────┼────────────────────┼────────────");
    for unit in registry.units() {
        println!(
            "   {:8} │ {:45} │ {:18} │ {}",
            unit.unit_code,
            truncate(&unit.full_name, 45),
            unit.category.as_str(),
            unit.breakdown_label.as_deref().unwrap_or("-")
        );
    }
}

fn print_providers(registry: &Registry) {
    for domain in Domain::all() {
        let providers = registry.providers(*domain);
        println!();
        println!("🏢 {} providers ({})", domain.as_str(), providers.len());
        for provider in providers {
            println!("   {}", provider.canonical_name);
        }
    }
}

fn print_aliases(registry: &Registry) {
    println!();
    println!("🔁 Aliases ({})", registry.aliases().len());
    for alias in registry.aliases() {
        println!("   {:30} → {}", truncate(&alias.variant_text, 30), alias.canonical_name);
    }
}
