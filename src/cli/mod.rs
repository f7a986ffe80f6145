//! Command-line interface parsing and handling
//!
//! This module parses command-line arguments, sets up logging, and runs the
//! chat session, the log relay, or one of the configuration commands.

use std::error::Error;
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use reqwest::Client;
use tracing_subscriber::EnvFilter;

use crate::core::config::data::Config;
use crate::core::config::settings::SETTABLE_KEYS;
use crate::logs::{ingest_paths, source_files, upload_logs, LogCleaner};
use crate::relay::forward::LogForwarder;
use crate::relay::run_relay;
use crate::ui::chat_loop::{run_chat, ChatOptions};

const LONG_VERSION: &str = concat!(
    env!("CARGO_PKG_VERSION"),
    "\ncommit: ",
    env!("VERGEN_GIT_DESCRIBE"),
    " (",
    env!("VERGEN_GIT_SHA"),
    ")\nbuilt: ",
    env!("VERGEN_BUILD_DATE"),
    "\ntarget: ",
    env!("VERGEN_CARGO_TARGET_TRIPLE"),
    "\nrustc: ",
    env!("VERGEN_RUSTC_SEMVER"),
);

#[derive(Parser)]
#[command(name = "sagechat")]
#[command(version, long_version = LONG_VERSION)]
#[command(about = "Terminal chat client for the Sage log analysis service")]
#[command(
    long_about = "Sagechat talks to a Sage analysis service from the terminal. Ask questions \
about your systems, attach log files and documents, or record voice messages; every \
submission gets exactly one reply.\n\n\
Chat commands:\n\
  /file <path>      Attach a file (text, log, PDF, Word, CSV or image, 10 MB max)\n\
  /record, /stop    Record a voice message and send it\n\
  /status           Show session status\n\
  /log [file]       Toggle transcript logging or log to a new file\n\
  /help             List all commands\n\
  /quit, Ctrl+C     End the session\n\n\
Dropping a file onto the terminal pastes its path; sagechat attaches it.\n\n\
Environment:\n\
  RUST_LOG              Diagnostic log filter (written to stderr)\n\
  SAGECHAT_CONFIG_DIR   Directory holding config.toml"
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Append the chat transcript to this file
    #[arg(short = 'l', long, global = true, value_name = "FILE")]
    pub log: Option<PathBuf>,

    /// Analysis service base URL (overrides the configured backend-url)
    #[arg(short = 'b', long, global = true, value_name = "URL")]
    pub backend: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the chat interface (default)
    Chat,
    /// Run the log relay service
    Relay {
        /// Address to listen on (defaults to the configured relay-bind)
        #[arg(long, value_name = "ADDR")]
        bind: Option<String>,
        /// Analysis service URL to forward log batches to
        #[arg(long, value_name = "URL")]
        downstream: Option<String>,
    },
    /// Clean log files and send them to a relay for analysis
    UploadLogs {
        /// .log, .txt or JSON-lines files, or directories containing them
        #[arg(required = true, value_name = "FILES")]
        files: Vec<PathBuf>,
        /// Relay base URL (defaults to http://<relay-bind>)
        #[arg(long, value_name = "URL")]
        relay: Option<String>,
        /// Keep tokens, API keys and e-mail addresses in the uploaded lines
        #[arg(long)]
        no_redact: bool,
    },
    /// Set configuration values
    Set {
        /// Configuration key to set
        key: String,
        /// Value to set for the key (multiple words allowed for recorder)
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        value: Vec<String>,
    },
    /// Unset configuration values
    Unset {
        /// Configuration key to unset
        key: String,
    },
    /// Show the current configuration
    Config,
}

impl Commands {
    fn default_log_filter(&self) -> &'static str {
        match self {
            Commands::Relay { .. } => "info",
            _ => "warn",
        }
    }
}

fn init_tracing(default_filter: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

pub fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();
    let command = args.command.unwrap_or(Commands::Chat);
    init_tracing(command.default_log_filter());

    tokio::runtime::Runtime::new()?.block_on(async_main(command, args.log, args.backend))
}

async fn async_main(
    command: Commands,
    log: Option<PathBuf>,
    backend: Option<String>,
) -> Result<(), Box<dyn Error>> {
    match command {
        Commands::Chat => {
            let config = Config::load()?;
            run_chat(
                config,
                ChatOptions {
                    backend_url: backend,
                    log_file: log,
                },
            )
            .await
        }
        Commands::Relay { bind, downstream } => {
            let config = Config::load()?;
            let bind = bind.unwrap_or_else(|| config.relay.bind().to_string());
            let downstream =
                downstream.unwrap_or_else(|| config.relay.downstream_url().to_string());
            let forwarder = LogForwarder::new(downstream, config.request_timeout())?;
            run_relay(&bind, forwarder).await
        }
        Commands::UploadLogs {
            files,
            relay,
            no_redact,
        } => {
            let config = Config::load()?;
            let relay = relay.unwrap_or_else(|| format!("http://{}", config.relay.bind()));
            let entries = ingest_paths(&files).await?;
            let cleaner = LogCleaner::new(!no_redact);
            let lines = cleaner.clean_lines(entries.iter().map(|entry| entry.line.as_str()));
            if lines.is_empty() {
                eprintln!("⚠️  No log lines found in the given files");
                std::process::exit(1);
            }

            eprintln!(
                "📤 Uploading {} log lines from {} to {relay}",
                lines.len(),
                source_files(&entries).join(", ")
            );
            let reply = upload_logs(&Client::new(), &relay, lines).await?;
            println!("{}", serde_json::to_string_pretty(&reply)?);
            Ok(())
        }
        Commands::Set { key, value } => {
            let mut config = Config::load()?;
            if value.is_empty() {
                config.print_all();
                return Ok(());
            }
            let value = value.join(" ");
            if let Err(err) = config.set_value(&key, &value) {
                eprintln!("❌ {err}");
                std::process::exit(1);
            }
            config.save()?;
            println!("✅ Set {key} to: {value}");
            Ok(())
        }
        Commands::Unset { key } => {
            let mut config = Config::load()?;
            if let Err(err) = config.unset_value(&key) {
                eprintln!("❌ {err}");
                std::process::exit(1);
            }
            config.save()?;
            println!("✅ Unset {key}");
            Ok(())
        }
        Commands::Config => {
            let config = Config::load()?;
            config.print_all();
            println!("\nSettable keys: {}", SETTABLE_KEYS.join(", "));
            Ok(())
        }
    }
}
