pub mod commands;

use std::path::PathBuf;
use std::process::ExitCode;

use borealis_core::config::{AppConfig, ConfigOverrides, LoadOptions, LogFormat, LoggingConfig};
use borealis_core::domain::geomag::DEFAULT_HISTORY_LIMIT;
use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(
    name = "borealis",
    about = "Borealis space-weather insurance quoting CLI",
    long_about = "Price satellite policies against live or historical geomagnetic conditions, and inspect the space-weather data behind the quote.",
    after_help = "Examples:\n  borealis quote --asset-value 250 --shielding Hardened\n  borealis quote --event \"Halloween Storm 2001\"\n  borealis history --limit 14\n  borealis doctor --json"
)]
pub struct Cli {
    #[arg(long, global = true, help = "Path to a borealis.toml config file")]
    config: Option<PathBuf>,
    #[arg(long = "base-url", global = true, help = "Backend base URL (overrides api.base_url)")]
    base_url: Option<String>,
    #[arg(
        long = "timeout-secs",
        global = true,
        help = "Request timeout in seconds (overrides api.timeout_secs)"
    )]
    timeout_secs: Option<u64>,
    #[arg(long = "log-level", global = true, help = "trace, debug, info, warn or error")]
    log_level: Option<String>,
    #[arg(long = "log-format", global = true, help = "compact, pretty or json")]
    log_format: Option<LogFormat>,
    #[command(subcommand)]
    command: Command,
}

impl Cli {
    /// Flags sit above env vars and the config file.
    pub fn load_options(&self) -> LoadOptions {
        LoadOptions {
            config_path: self.config.clone(),
            require_file: self.config.is_some(),
            overrides: ConfigOverrides {
                api_base_url: self.base_url.clone(),
                api_timeout_secs: self.timeout_secs,
                log_level: self.log_level.clone(),
                log_format: self.log_format,
            },
        }
    }
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Run one pricing submission and print the reviewed quote")]
    Quote(commands::quote::QuoteArgs),
    #[command(about = "List the built-in historical storm catalog")]
    Events {
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
    #[command(about = "Fetch the 3-day Kp forecast with recent activity")]
    Forecast,
    #[command(about = "Fetch daily geomagnetic history and derived analytics")]
    History {
        #[arg(long, default_value_t = DEFAULT_HISTORY_LIMIT, help = "Number of days to fetch")]
        limit: u32,
    },
    #[command(about = "Fetch the insured portfolio")]
    Portfolio,
    #[command(about = "Query the backend health endpoint")]
    Health,
    #[command(
        about = "Inspect effective configuration values with source attribution and redaction"
    )]
    Config,
    #[command(about = "Validate config and backend reachability")]
    Doctor {
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();
    let options = cli.load_options();

    match AppConfig::load(options.clone()) {
        Ok(config) => init_logging(&config.logging),
        // The command reports the config error itself; keep stderr logging usable meanwhile.
        Err(_) => init_logging(&AppConfig::default().logging),
    }

    let result = match cli.command {
        Command::Quote(args) => commands::quote::run(&options, args),
        Command::Events { json } => commands::events::run(json),
        Command::Forecast => commands::forecast::run(&options),
        Command::History { limit } => commands::history::run(&options, limit),
        Command::Portfolio => commands::portfolio::run(&options),
        Command::Health => commands::health::run(&options),
        Command::Config => commands::config::run(&options),
        Command::Doctor { json } => commands::doctor::run(&options, json),
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}

/// Logs go to stderr so stdout stays machine-readable.
fn init_logging(config: &LoggingConfig) {
    use tracing::Level;
    use LogFormat::*;

    let log_level = config.level.parse::<Level>().unwrap_or(Level::INFO);

    let _ = match config.format {
        Compact => tracing_subscriber::fmt()
            .with_target(false)
            .with_max_level(log_level)
            .with_writer(std::io::stderr)
            .compact()
            .try_init(),
        Pretty => tracing_subscriber::fmt()
            .with_target(false)
            .with_max_level(log_level)
            .with_writer(std::io::stderr)
            .pretty()
            .try_init(),
        Json => tracing_subscriber::fmt()
            .with_target(false)
            .with_max_level(log_level)
            .with_writer(std::io::stderr)
            .json()
            .try_init(),
    };
}
