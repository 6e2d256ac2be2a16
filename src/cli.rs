use clap::{Parser, Subcommand, ValueEnum};
use std::io::IsTerminal;
use std::path::PathBuf;

/// Output format for commands
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text
    Text,
    /// JSON format
    Json,
    /// YAML format
    Yaml,
}

impl OutputFormat {
    /// Resolve the effective output format.
    /// If user specified a format, use it.
    /// Otherwise: TTY → Text, non-TTY (pipe) → Json
    pub fn resolve(user_choice: Option<OutputFormat>) -> OutputFormat {
        match user_choice {
            Some(fmt) => fmt,
            None => {
                if std::io::stdout().is_terminal() {
                    OutputFormat::Text
                } else {
                    OutputFormat::Json
                }
            }
        }
    }
}

#[derive(Parser)]
#[command(
    name = "evroute",
    about = "Capture editor interaction events and route them to configured exporters",
    version,
    after_help = "Logs are written to: ~/.local/share/evroute/logs/evroute.log"
)]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true, help = "Path to evroute.yaml config file")]
    pub config: Option<PathBuf>,

    /// Disable capture regardless of the config file
    #[arg(long, global = true)]
    pub no_telemetry: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Route host notifications read as JSON Lines from a file or stdin
    Replay {
        /// File of notifications (defaults to stdin)
        file: Option<PathBuf>,

        /// Print per-exporter delivery counts when done
        #[arg(long)]
        summary: bool,
    },

    /// Watch directories and route file-system events until Ctrl+C
    Watch {
        /// Directories to watch recursively
        #[arg(required = true)]
        paths: Vec<PathBuf>,

        /// Do not reload routing when the config file changes
        #[arg(long)]
        no_reload: bool,
    },

    /// List the event kinds this tool can capture
    Events {
        /// Output format (default: text for TTY, json for pipes)
        #[arg(long, short = 'o', value_enum)]
        format: Option<OutputFormat>,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        shell: clap_complete::Shell,
    },
}

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Show the effective configuration
    Show {
        /// Output format (default: text for TTY, json for pipes)
        #[arg(long, short = 'o', value_enum)]
        format: Option<OutputFormat>,
    },

    /// Get a configuration value
    Get {
        /// Config key (e.g., telemetry, environment, log_level)
        key: String,
    },

    /// Build every exporter and report which ones would be disabled (creates file exporter outputs)
    Validate,
}
