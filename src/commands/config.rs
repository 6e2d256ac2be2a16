use colored::*;
use eyre::Result;

use crate::cli::{ConfigAction, OutputFormat};
use crate::config::Config;
use crate::exporter;
use crate::producer::Producer;
use crate::routing::ConfigResolver;

pub fn run(action: ConfigAction, config: &Config) -> Result<()> {
    match action {
        ConfigAction::Show { format } => show(OutputFormat::resolve(format), config),
        ConfigAction::Get { key } => get(&key, config),
        ConfigAction::Validate => validate(config),
    }
}

fn show(format: OutputFormat, config: &Config) -> Result<()> {
    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(config)?);
        }
        OutputFormat::Yaml => {
            println!("{}", serde_yaml::to_string(config)?);
        }
        OutputFormat::Text => {
            println!("{}", "evroute Configuration".bold());
            println!();

            match &config.source {
                Some(path) => println!("  source: {}", path.display()),
                None => println!("  source: {}", "(defaults)".dimmed()),
            }
            println!("  telemetry: {}", config.telemetry);
            println!("  log_level: {}", config.log_level.as_filter());
            println!("  tracked_schemes: {}", config.tracked_schemes.join(", "));
            println!();

            println!("{}:", "active_events".cyan());
            for entry in &config.active_events {
                let content = if entry.log_whole_document { " (content)" } else { "" };
                println!("  {}{}", entry.name, content.yellow());
            }
            println!();

            println!("{}:", "exporters".cyan());
            for (id, exporter) in config.exporters.iter().enumerate() {
                let scope = match &exporter.active_events {
                    Some(list) => format!("own list, {} kinds", list.len()),
                    None => "global list".to_string(),
                };
                println!("  {} [{}] {}", exporter.label(id).bold(), exporter.kind.as_str(), scope.dimmed());
            }
        }
    }

    Ok(())
}

fn get(key: &str, config: &Config) -> Result<()> {
    let value = match key {
        "telemetry" => Some(config.telemetry.to_string()),
        "environment" => config.environment.clone(),
        "machine_id" | "machine-id" => config.machine_id.clone(),
        "log_level" | "log-level" => Some(config.log_level.as_filter().to_string()),
        "tracked_schemes" => Some(config.tracked_schemes.join(",")),
        "source" => config.source.as_ref().map(|p| p.display().to_string()),
        _ => eyre::bail!("Unknown config key: {}", key),
    };

    match value {
        Some(v) => println!("{}", v),
        None => println!("{}", "(unset)".dimmed()),
    }

    Ok(())
}

/// Event names in the global list or any override that no producer emits
fn unknown_event_kinds(resolver: &ConfigResolver) -> Vec<&str> {
    let mut unknown: Vec<&str> = Vec::new();
    let lists = std::iter::once(resolver.global())
        .chain((0..resolver.exporter_count()).map(|id| resolver.applicable(id)));

    for name in lists.flat_map(|list| list.names()) {
        if Producer::from_event_name(name).is_none() && !unknown.contains(&name) {
            unknown.push(name);
        }
    }
    unknown
}

/// Build every exporter without sending anything. File exporters open
/// (and so create) their output files.
fn validate(config: &Config) -> Result<()> {
    let resolver = ConfigResolver::from_config(config);
    let mut disabled = 0;

    for (id, exporter_config) in config.exporters.iter().enumerate() {
        let label = exporter_config.label(id);
        match exporter::build_exporter(exporter_config) {
            Ok(_) => println!(
                "  {} {} ({} event kinds)",
                "✓".green(),
                label,
                resolver.applicable(id).len()
            ),
            Err(e) => {
                disabled += 1;
                println!("  {} {} would be disabled: {:#}", "✗".red(), label, e);
            }
        }
    }

    for name in unknown_event_kinds(&resolver) {
        println!("  {} unknown event kind: {}", "⚠".yellow(), name);
    }

    if disabled > 0 {
        eyre::bail!("{} exporter(s) failed to construct", disabled);
    }

    println!("{} Configuration is valid", "✓".green());
    Ok(())
}
