//! RecruitGenie: sales assistant chat backend.
//!
//! Startup sequence:
//!   1. Load .env (if present)
//!   2. Load config
//!   3. Resolve effective log level (CLI `-v` flags > env > config)
//!   4. Init logger once
//!   5. Open the session store (creates schema on first run)
//!   6. Build the LLM provider and the sales agent
//!   7. Spawn Ctrl-C → shutdown signal watcher
//!   8. Serve HTTP until shutdown

use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing::level_filters::LevelFilter;

use recruitgenie::config;
use recruitgenie::error::AppError;
use recruitgenie::llm::providers;
use recruitgenie::logger;
use recruitgenie::subsystems::agents::{ExtractionClient, SalesAgent};
use recruitgenie::subsystems::comms::{self, ChannelState};
use recruitgenie::subsystems::memory::SessionStore;

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), AppError> {
    // Load .env if present: ignore errors (file is optional).
    let _ = dotenvy::dotenv();

    let args = parse_cli_args();

    let config = config::load(args.config_path.as_deref())?;

    let effective_log_level = args.log_level.unwrap_or(config.log_level);
    let force_cli_level = args.log_level.is_some();

    logger::init(effective_log_level, force_cli_level)?;

    info!(
        name = %config.name,
        db_path = %config.db_path.display(),
        configured_log_level = %config.log_level,
        effective_log_level = %effective_log_level,
        "config loaded"
    );

    let store = SessionStore::open(&config.db_path)?;

    let provider = providers::build(&config.llm, config.llm_api_key.clone())
        .map_err(|e| AppError::Llm(e.to_string()))?;

    info!(provider = provider.name(), model = provider.model(), "llm provider ready");

    let extractor = ExtractionClient::new(provider, config.assistant.fallback_reply.clone());
    let agent = SalesAgent::new(store, extractor, &config.assistant);

    // Shared shutdown token: Ctrl-C cancels it, the server watches it.
    let shutdown = CancellationToken::new();
    let ctrlc_token = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("ctrl-c received, initiating shutdown");
            ctrlc_token.cancel();
        }
    });

    comms::run(&config.http, ChannelState::new(agent), shutdown).await
}

struct CliArgs {
    log_level: Option<LevelFilter>,
    config_path: Option<String>,
}

fn parse_cli_args() -> CliArgs {
    let mut verbosity = 0u8;
    let mut config_path = None;

    let mut iter = std::env::args().skip(1);
    while let Some(arg) = iter.next() {
        if arg == "--" {
            break;
        }

        match arg.as_str() {
            "-h" | "--help" => {
                println!("Usage: recruitgenie [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -h, --help                 Print help");
                println!("  -f, --config <PATH>        Path to configuration file (default: {})", config::DEFAULT_CONFIG_PATH);
                println!("  -v, -vv, -vvv, -vvvv       Increase logging verbosity");
                println!();
                println!("Environment:");
                println!("  GEMINI_API_KEY             Model provider credential");
                println!("  RECRUITGENIE_DB_PATH       Override service.db_path");
                println!("  RECRUITGENIE_BIND          Override http.bind");
                println!("  RECRUITGENIE_LOG_LEVEL     Override service.log_level");
                std::process::exit(0);
            }
            "-f" | "--config" => {
                if let Some(path) = iter.next() {
                    config_path = Some(path);
                } else {
                    eprintln!("error: -f/--config requires a path argument");
                    std::process::exit(1);
                }
            }
            "--verbose" => verbosity = verbosity.saturating_add(1),
            a if a.starts_with('-') && a.len() > 1 && a.chars().skip(1).all(|c| c == 'v') => {
                verbosity = verbosity.saturating_add((a.len() - 1) as u8);
            }
            _ => {}
        }
    }

    // Each -v raises verbosity one tier from the config default:
    //   -v      → warn
    //   -vv     → info
    //   -vvv    → debug  (assembled turn counts, parsed lead fields)
    //   -vvvv+  → trace  (full model request payloads)
    let log_level = match verbosity {
        0 => None,
        1 => Some(LevelFilter::WARN),
        2 => Some(LevelFilter::INFO),
        3 => Some(LevelFilter::DEBUG),
        _ => Some(LevelFilter::TRACE),
    };

    CliArgs { log_level, config_path }
}
