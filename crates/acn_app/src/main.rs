mod platform;

use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand};

use platform::app::{self, ScanRequest, WatchRequest};
use platform::logging::{self, LogDestination};

/// Outline navigator for saved chat pages.
#[derive(Debug, Parser)]
#[command(name = "acn", version)]
struct Cli {
    /// Directory holding the settings record.
    #[arg(long, global = true, default_value = ".")]
    settings_dir: PathBuf,

    /// Log at debug level.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Print the message outline of an HTML snapshot.
    Scan {
        file: PathBuf,
        /// Page URL the snapshot was saved from; selects the site rules.
        #[arg(long)]
        url: Option<String>,
        /// Keep only messages containing this text (case-insensitive).
        #[arg(long)]
        filter: Option<String>,
        /// Also run a semantic search (needs ACN_API_KEY).
        #[arg(long)]
        semantic: Option<String>,
        #[arg(long)]
        json: bool,
    },
    /// Follow a snapshot file and drive the navigator interactively.
    Watch {
        file: PathBuf,
        #[arg(long)]
        url: Option<String>,
        /// How often the file is checked for changes.
        #[arg(long, default_value_t = 500)]
        interval_ms: u64,
        /// Start with the panel hidden.
        #[arg(long)]
        hidden: bool,
    },
    /// Inspect or change stored settings.
    Settings {
        #[command(subcommand)]
        action: SettingsAction,
    },
    /// List the built-in site rules.
    Sites,
}

#[derive(Debug, Subcommand)]
enum SettingsAction {
    Show,
    /// Keys: timestamps, width, language, position.
    Set { key: String, value: String },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let destination = match cli.command {
        Command::Watch { .. } => LogDestination::File,
        _ => LogDestination::Terminal,
    };
    logging::initialize(destination, cli.verbose);

    match cli.command {
        Command::Scan {
            file,
            url,
            filter,
            semantic,
            json,
        } => app::run_scan(
            ScanRequest {
                file,
                url,
                filter,
                semantic,
                json,
            },
            &cli.settings_dir,
        ),
        Command::Watch {
            file,
            url,
            interval_ms,
            hidden,
        } => app::run_watch(
            WatchRequest {
                file,
                url,
                interval: Duration::from_millis(interval_ms.max(10)),
                hidden,
            },
            &cli.settings_dir,
        ),
        Command::Settings { action } => match action {
            SettingsAction::Show => app::run_settings_show(&cli.settings_dir),
            SettingsAction::Set { key, value } => {
                app::run_settings_set(&cli.settings_dir, &key, &value)
            }
        },
        Command::Sites => app::run_sites(),
    }
}
