use colored::*;
use eyre::Result;
use serde::Serialize;

use crate::cli::OutputFormat;
use crate::config::Config;
use crate::producer::PRODUCERS;
use crate::routing::ConfigResolver;

#[derive(Debug, Serialize)]
struct EventKindInfo {
    name: &'static str,
    description: &'static str,
    /// Present in the global active-events list
    active: bool,
    log_whole_document: bool,
    /// At least one exporter receives this kind
    routed: bool,
    /// Labels of exporters that would receive this kind
    exporters: Vec<String>,
}

pub fn run(format: OutputFormat, config: &Config) -> Result<()> {
    let kinds = describe(config);

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&kinds)?),
        OutputFormat::Yaml => println!("{}", serde_yaml::to_string(&kinds)?),
        OutputFormat::Text => {
            println!("{}", "Event kinds:".bold());
            println!();
            for kind in &kinds {
                let marker = if kind.routed { "●".green() } else { "○".dimmed() };
                let content = if kind.log_whole_document { " +content" } else { "" };
                println!(
                    "  {} {:<28} {}{}",
                    marker,
                    kind.name,
                    kind.description.dimmed(),
                    content.yellow()
                );
                if !kind.exporters.is_empty() {
                    println!("      → {}", kind.exporters.join(", ").cyan());
                }
            }
        }
    }

    Ok(())
}

fn describe(config: &Config) -> Vec<EventKindInfo> {
    let resolver = ConfigResolver::from_config(config);

    PRODUCERS
        .iter()
        .map(|producer| {
            let name = producer.event_name();
            let exporters = config
                .exporters
                .iter()
                .enumerate()
                .filter(|(id, _)| resolver.is_eligible(name, *id))
                .map(|(id, e)| e.label(id))
                .collect();

            EventKindInfo {
                name,
                description: producer.description(),
                active: resolver.global().contains(name),
                log_whole_document: resolver.global().include_content(name),
                routed: resolver.is_routed(name),
                exporters,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ActiveEventEntry, ExporterConfig, ExporterKind};

    #[test]
    fn test_describe_lists_every_producer() {
        let kinds = describe(&Config::default());
        assert_eq!(kinds.len(), PRODUCERS.len());
        assert!(kinds.iter().all(|k| k.active));
        assert!(kinds.iter().all(|k| k.exporters == vec!["console#0".to_string()]));
    }

    #[test]
    fn test_describe_reflects_overrides() {
        let mut audit = ExporterConfig::new(ExporterKind::Console);
        audit.name = Some("audit".to_string());
        audit.active_events = Some(vec![ActiveEventEntry::new("saveTextDocument", true)]);

        let config = Config {
            active_events: vec![ActiveEventEntry::new("openTextDocument", true)],
            exporters: vec![ExporterConfig::new(ExporterKind::Console), audit],
            ..Config::default()
        };
        let kinds = describe(&config);

        let open = kinds.iter().find(|k| k.name == "openTextDocument").unwrap();
        let save = kinds.iter().find(|k| k.name == "saveTextDocument").unwrap();
        let close = kinds.iter().find(|k| k.name == "closeTextDocument").unwrap();

        assert!(open.active && open.log_whole_document);
        assert_eq!(open.exporters, vec!["console#0".to_string()]);
        assert!(!save.active);
        assert_eq!(save.exporters, vec!["audit".to_string()]);
        assert!(close.exporters.is_empty());
        assert!(open.routed && save.routed);
        assert!(!close.routed);
    }
}
