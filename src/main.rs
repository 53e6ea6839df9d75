//! Backrooms Server - unattended AI persona conversation
//!
//! This is the main entry point for the backrooms-server binary.
//! The server rotates through a cast of personas, asks an external
//! text generation API for their lines within a daily budget, and
//! pushes every line to connected viewers over WebSocket.

mod broadcast;
mod cli;
mod config;
mod content;
mod error;
mod generator;
mod ledger;
mod logging;
mod persona;
mod scheduler;
mod server;
mod version;

use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;

use clap::Parser;
use tracing::{debug, info, warn};

use crate::broadcast::Broadcaster;
use crate::cli::{Cli, Commands};
use crate::config::ServerConfig;
use crate::content::ContentCatalog;
use crate::error::{Error, Result};
use crate::generator::{OpenAiGenerator, RateLimiter};
use crate::ledger::{BudgetStatus, LocalDate, UsageLedger, UsageReport, UsageReporter};
use crate::logging::LogGuards;
use crate::persona::PersonaRegistry;
use crate::scheduler::{runner, TurnScheduler, TurnSettings};
use crate::server::AppState;

fn main() {
    if let Err(e) = run_cli() {
        eprint!("{}", e.format_for_terminal());
        std::process::exit(e.exit_code());
    }
}

fn run_cli() -> Result<()> {
    // Parse CLI arguments first (before logging, so we know verbosity)
    let cli = Cli::parse();

    // Light commands get minimal logging and no runtime
    let (config_path, port) = match cli.command {
        Commands::Version => {
            version::print_version();
            return Ok(());
        }
        Commands::Config { subcommand } => {
            logging::init_simple(tracing::Level::WARN)?;
            return handle_config_command(subcommand);
        }
        Commands::Usage { config, json } => {
            logging::init_simple(tracing::Level::WARN)?;
            return handle_usage_command(config.as_deref(), json);
        }
        Commands::Run { config, port } => (config, port),
    };

    let mut config = ServerConfig::load(config_path.as_deref())?;
    if let Some(port) = port {
        config.server.port = port;
    }
    config.require_credentials()?;

    // Initialize logging based on config and CLI flags
    let _guards: LogGuards = logging::init_logging(&config.logging, cli.verbose, cli.quiet)?;

    let build = version::build_info();
    info!(
        version = build.version,
        git = build.git_hash,
        "Starting backrooms-server"
    );
    debug!(config = ?config.redacted(), "Loaded configuration");

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .worker_threads(num_cpus::get().clamp(2, 8))
        .thread_name("backrooms-server")
        .build()
        .map_err(|e| Error::Internal(format!("Failed to create async runtime: {}", e)))?;

    runtime.block_on(serve_main(config))
}

/// Assemble the conversation and serve viewers until Ctrl+C
async fn serve_main(config: ServerConfig) -> Result<()> {
    ensure_data_dir(&config)?;

    let ledger = UsageLedger::load(config.ledger_path(), Box::new(LocalDate)).into_shared();

    let catalog = Arc::new(ContentCatalog::load(
        config.conversation.content_file.as_deref().map(Path::new),
    )?);
    let registry = PersonaRegistry::load(config.conversation.personas_file.as_deref().map(Path::new))?;
    let rotation = registry.rotation(Some(config.conversation.rotation.as_slice()))?;
    catalog.check_rotation(&rotation)?;

    info!(
        personas = registry.personas().len(),
        rotation = ?rotation.iter().map(|p| p.name.as_str()).collect::<Vec<_>>(),
        daily_limit = config.budget.daily_limit,
        "Conversation configured"
    );

    let limiter = RateLimiter::new(config.budget.calls_per_window, config.budget.window());
    let generator = OpenAiGenerator::new(config.openai.clone(), limiter, catalog.clone())?;

    let broadcaster = Broadcaster::default();
    let scheduler = TurnScheduler::new(
        rotation,
        TurnSettings::from_config(&config),
        ledger.clone(),
        catalog,
        Arc::new(generator),
        broadcaster.clone(),
    )?;
    let (conversation, conversation_task) = runner::spawn(scheduler);

    let state = AppState {
        broadcaster,
        reporter: UsageReporter::new(ledger, config.budget.daily_limit),
        conversation,
    };
    let app = server::router(state, config.server.cors_any_origin);

    let addr = listen_addr(&config)?;
    let listener = server::bind(addr).await?;

    info!(%addr, "Server ready, conversation starts with the first viewer");
    info!("Press Ctrl+C to stop");

    server::serve(listener, app, shutdown_signal()).await?;

    conversation_task.abort();
    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Received shutdown signal"),
        Err(e) => warn!(error = %e, "Failed to listen for Ctrl+C"),
    }
}

fn listen_addr(config: &ServerConfig) -> Result<SocketAddr> {
    format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .map_err(|e| {
            Error::config_field_invalid(
                "server.host",
                format!("'{}' is not a valid listen address: {}", config.server.host, e),
            )
        })
}

/// Ensure the ledger's directory exists
fn ensure_data_dir(config: &ServerConfig) -> Result<()> {
    let dir = config.data_dir();
    if !dir.exists() {
        std::fs::create_dir_all(&dir).map_err(|e| Error::IoWrite {
            path: dir.clone(),
            source: e,
        })?;
        debug!(path = %dir.display(), "Created data directory");
    }
    Ok(())
}

fn handle_usage_command(config_path: Option<&str>, json: bool) -> Result<()> {
    let config = ServerConfig::load(config_path)?;
    let ledger = UsageLedger::load(config.ledger_path(), Box::new(LocalDate)).into_shared();
    let report = UsageReporter::new(ledger, config.budget.daily_limit).report();

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_usage(&report);
    }
    Ok(())
}

fn print_usage(report: &UsageReport) {
    let status = match report.status {
        BudgetStatus::Ok => "ok",
        BudgetStatus::Low => "low",
        BudgetStatus::Exhausted => "exhausted (canned fallback lines in use)",
    };

    println!("Date:       {}", report.date);
    println!("Calls:      {} / {}", report.count, report.limit);
    println!("Remaining:  {}", report.remaining_calls);
    println!("Status:     {}", status);
}

fn handle_config_command(subcommand: cli::ConfigSubcommand) -> Result<()> {
    use cli::ConfigSubcommand;

    match subcommand {
        ConfigSubcommand::Show { config } => {
            let cfg = ServerConfig::load(config.as_deref())?;
            println!("{}", toml::to_string_pretty(&cfg.redacted())?);
        }
        ConfigSubcommand::Init { path, force } => {
            let created = config::init_config(path.as_deref(), force)?;
            println!("Configuration file created: {}", created.display());
        }
        ConfigSubcommand::Validate { config } => {
            ServerConfig::load(config.as_deref())?;
            println!("Configuration is valid.");
        }
    }

    Ok(())
}
