pub mod commands;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tablechat_core::config::{AppConfig, ConfigOverrides, LoadOptions, LoggingConfig};

#[derive(Debug, Parser)]
#[command(
    name = "tablechat",
    about = "Ask questions about an employee sheet",
    long_about = "Classify natural-language questions, filter the matching sheet rows, and let a language model phrase the answer.",
    after_help = "Examples:\n  tablechat seed\n  tablechat ask \"Who are the engineers?\"\n  tablechat classify \"Which salary is less than 70000?\" --json\n  tablechat doctor --json"
)]
pub struct Cli {
    #[arg(long, global = true, help = "Path to a tablechat.toml config file")]
    config: Option<PathBuf>,
    #[arg(long, global = true, help = "Directory holding one <sheet>.csv file per sheet")]
    data_dir: Option<PathBuf>,
    #[arg(long, global = true, help = "Sheet to query or seed")]
    sheet: Option<String>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Start an interactive question loop; type `exit` to quit")]
    Chat {
        #[arg(long, help = "Reset the sheet to the sample employees before chatting")]
        seed: bool,
    },
    #[command(about = "Answer a single question")]
    Ask {
        question: String,
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
    #[command(about = "Show which rule a question hits and the rows it keeps, without a model")]
    Classify {
        question: String,
        #[arg(long, default_value = "", help = "Query description to classify alongside the question")]
        description: String,
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
    #[command(about = "Create the sheet if needed and fill it with sample employees")]
    Seed,
    #[command(
        about = "Inspect effective configuration values with source attribution and redaction"
    )]
    Config,
    #[command(about = "Validate config, sheet readability, and model reachability")]
    Doctor {
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
}

impl Cli {
    fn load_options(&self) -> LoadOptions {
        LoadOptions {
            config_path: self.config.clone(),
            require_file: self.config.is_some(),
            overrides: ConfigOverrides {
                data_dir: self.data_dir.clone(),
                sheet_name: self.sheet.clone(),
                ..ConfigOverrides::default()
            },
        }
    }
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();
    let options = cli.load_options();

    if let Ok(config) = AppConfig::load(options.clone()) {
        init_logging(&config.logging);
    }

    let result = match cli.command {
        Command::Chat { seed } => commands::chat::run(&options, seed),
        Command::Ask { question, json } => commands::ask::run(&options, &question, json),
        Command::Classify { question, description, json } => {
            commands::classify::run(&options, &question, &description, json)
        }
        Command::Seed => commands::seed::run(&options),
        Command::Config => {
            commands::CommandResult { exit_code: 0, output: commands::config::run(&options) }
        }
        Command::Doctor { json } => {
            commands::CommandResult { exit_code: 0, output: commands::doctor::run(&options, json) }
        }
    };

    if !result.output.is_empty() {
        println!("{}", result.output);
    }
    ExitCode::from(result.exit_code)
}

/// Logs go to stderr so command output on stdout stays parseable.
fn init_logging(config: &LoggingConfig) {
    use tablechat_core::config::LogFormat::*;
    use tracing::Level;

    let log_level = config.level.parse::<Level>().unwrap_or(Level::INFO);
    let builder = tracing_subscriber::fmt()
        .with_target(false)
        .with_max_level(log_level)
        .with_writer(std::io::stderr);

    let _ = match config.format {
        Compact => builder.compact().try_init(),
        Pretty => builder.pretty().try_init(),
        Json => builder.json().try_init(),
    };
}
