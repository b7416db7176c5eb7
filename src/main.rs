//! BreakIn Direct - tracking and scoring service
//!
//! Entry point for the scoring API server and for offline tools that score a
//! file or replay a coding session against a running server.

use anyhow::Context;
use breakin_core::{
    api::{ApiServer, ApiServerConfig, EventType},
    CodeSnapshot, HttpScoringClient, Scorer, SessionIds, SessionMetrics, TrackingConfig,
    TrackingSession,
};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn, Level};
use tracing_subscriber::{self, EnvFilter};

#[derive(Parser)]
#[command(name = "breakin", version, about = "BreakIn Direct session tracking and evaluation")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Set log level
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Config file (defaults to ./breakin.toml when present)
    #[arg(long, env = "BREAKIN_CONFIG")]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP scoring and tracking server
    Serve {
        /// Server address (overrides bind_addr)
        #[arg(long)]
        addr: Option<String>,

        /// Event channel capacity (overrides event_capacity)
        #[arg(long)]
        capacity: Option<usize>,

        /// Seed the scorer for reproducible scores
        #[arg(long)]
        seed: Option<u64>,
    },

    /// Score a source file offline and print the evaluation as JSON
    Evaluate {
        /// Source file to score
        file: PathBuf,

        /// Seconds elapsed in the session
        #[arg(long, default_value = "0")]
        elapsed: u64,

        /// Seconds the editor was focused
        #[arg(long, default_value = "0")]
        focus: u64,

        /// Keystrokes so far (defaults to the file length)
        #[arg(long)]
        keystrokes: Option<u64>,

        /// Seed the scorer for reproducible scores
        #[arg(long)]
        seed: Option<u64>,
    },

    /// Replay a file as keystrokes through a tracking session
    Simulate {
        /// Source file to type out
        file: PathBuf,

        /// Scoring service URL (overrides api_base_url)
        #[arg(long)]
        api_url: Option<String>,

        /// Delay between simulated keystrokes
        #[arg(long, default_value = "20")]
        interval_ms: u64,

        #[arg(long, default_value = "cli-user")]
        user: String,

        #[arg(long, default_value = "local-sprint")]
        sprint: String,

        #[arg(long, default_value = "local-task")]
        task: String,
    },
}

fn load_config(path: Option<&Path>) -> anyhow::Result<TrackingConfig> {
    let config = match path {
        Some(path) => TrackingConfig::from_file(path)?,
        None => TrackingConfig::load()?,
    };
    Ok(config)
}

fn scorer_for(seed: Option<u64>) -> Scorer {
    match seed {
        Some(seed) => Scorer::seeded(seed),
        None => Scorer::new(),
    }
}

async fn serve(
    mut config: TrackingConfig,
    addr: Option<String>,
    capacity: Option<usize>,
    seed: Option<u64>,
) -> anyhow::Result<()> {
    if let Some(addr) = addr {
        config.bind_addr = addr;
    }
    if let Some(capacity) = capacity {
        config.event_capacity = capacity;
    }

    let server_config = ApiServerConfig::from_tracking(&config)?;
    info!(
        "Starting scoring server on {} (event capacity {})",
        server_config.addr, server_config.event_capacity
    );

    let server = ApiServer::with_scorer(server_config, Arc::new(scorer_for(seed)));
    server.serve().await
}

fn evaluate(
    file: &Path,
    elapsed: u64,
    focus: u64,
    keystrokes: Option<u64>,
    seed: Option<u64>,
) -> anyhow::Result<()> {
    let code = std::fs::read_to_string(file)
        .with_context(|| format!("Failed to read {}", file.display()))?;

    let mut metrics = SessionMetrics::new();
    metrics.elapsed_time = elapsed;
    metrics.focus_time = focus;
    metrics.keystrokes = keystrokes.unwrap_or(code.chars().count() as u64);
    metrics.code_changes = metrics.keystrokes;

    let ids = SessionIds::new("cli-user", "local-sprint", file.display().to_string());
    let snapshot = CodeSnapshot::new(1, code, metrics, &ids);

    let result = scorer_for(seed).evaluate(&snapshot)?;
    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}

async fn simulate(
    mut config: TrackingConfig,
    file: &Path,
    api_url: Option<String>,
    interval: Duration,
    ids: SessionIds,
) -> anyhow::Result<()> {
    if let Some(url) = api_url {
        config.api_base_url = url;
    }
    let source = std::fs::read_to_string(file)
        .with_context(|| format!("Failed to read {}", file.display()))?;

    let client = Arc::new(HttpScoringClient::from_config(&config)?);
    let mut session = TrackingSession::new(ids, &config, client);

    // Print live feedback as it arrives
    let mut rx = session.broadcaster().subscribe();
    let listener = tokio::spawn(async move {
        while let Ok(event) = rx.recv().await {
            match event.event_type {
                EventType::LiveFeedback { kind, message, seq, .. } => {
                    info!("[snapshot {}] {:?}: {}", seq, kind, message);
                }
                EventType::SnapshotEvaluated { seq, score, .. } => {
                    info!("[snapshot {}] score {}", seq, score);
                }
                EventType::SnapshotDropped { seq, reason, .. } => {
                    warn!("[snapshot {}] dropped: {}", seq, reason);
                }
                _ => {}
            }
        }
    });

    session.start();
    let mut code = String::with_capacity(source.len());
    let mut in_flight = Vec::new();
    for ch in source.chars() {
        code.push(ch);
        if let Some(handle) = session.on_editor_change(&code).await {
            in_flight.push(handle);
        }
        tokio::time::sleep(interval).await;
    }

    for handle in in_flight {
        if let Err(e) = handle.await {
            warn!("Dispatch task failed: {}", e);
        }
    }

    let summary = session.submit(&code).await;
    drop(session);
    listener.abort();

    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let level = match cli.log_level.as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    // Use the requested level for our crates, WARN for noisy dependencies
    let filter = EnvFilter::new(format!(
        "breakin={lvl},breakin_core={lvl},tower_http=warn,tokio::sync::broadcast=error",
        lvl = level.as_str().to_lowercase()
    ));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr) // Write logs to stderr, not stdout
        .init();

    debug!("BreakIn Direct v{} starting...", env!("CARGO_PKG_VERSION"));

    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Serve {
            addr,
            capacity,
            seed,
        } => serve(config, addr, capacity, seed).await,
        Commands::Evaluate {
            file,
            elapsed,
            focus,
            keystrokes,
            seed,
        } => evaluate(&file, elapsed, focus, keystrokes, seed),
        Commands::Simulate {
            file,
            api_url,
            interval_ms,
            user,
            sprint,
            task,
        } => {
            simulate(
                config,
                &file,
                api_url,
                Duration::from_millis(interval_ms),
                SessionIds::new(user, sprint, task),
            )
            .await
        }
    }
}
