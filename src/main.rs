//! # chatgraph CLI
//!
//! The `chatgraph` binary analyzes a messaging account's decrypted chat
//! store and serves the resulting social interaction graph.
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `chatgraph analyze` | Run the full pipeline: detect → decrypt → extract → write artifact → serve |
//! | `chatgraph serve` | Serve an existing output directory |
//!
//! ## Examples
//!
//! ```bash
//! # Analyze the past year and open the graph in a browser
//! chatgraph analyze --source /data/account
//!
//! # A specific window, data only, capped node count
//! chatgraph analyze --source /data/account \
//!     --since 2024-01-01 --until 2024-06-30 --max-nodes 300 --no-server
//!
//! # Serve a directory produced earlier
//! chatgraph serve -d ./chat_analysis_20250801_101500 -p 8080
//! ```

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use chatgraph::config::{self, Config};
use chatgraph::decrypt::{Credentials, PlainStoreDecryptor};
use chatgraph::models::TimeWindow;
use chatgraph::orchestrator::{Orchestrator, RunOptions};
use chatgraph::probe::DirectoryProbe;
use chatgraph::progress::ProgressMode;
use chatgraph::server;
use chatgraph::store::SqliteStoreFactory;

/// chatgraph, an offline chat-history analyzer that renders a social
/// interaction graph.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file; a missing file falls back to built-in defaults.
#[derive(Parser)]
#[command(
    name = "chatgraph",
    about = "Analyze a chat history and render a social interaction graph",
    version,
    long_about = "chatgraph reads a messaging account's decrypted chat store, scores every \
    contact by message volume and directional balance, and emits a force-graph JSON artifact \
    plus an embedded viewer, optionally served over HTTP."
)]
struct Cli {
    /// Path to configuration file (TOML).
    ///
    /// Defaults to `./chatgraph.toml`. Source directory, store key, and
    /// server settings are read from this file; command-line options
    /// override it.
    #[arg(long, global = true, default_value = "./chatgraph.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand)]
enum Commands {
    /// Run the full analysis pipeline.
    ///
    /// Detects the store variant, unpacks the chat store, aggregates
    /// per-contact statistics inside the time window, scores and ranks
    /// contacts, writes `chat_data.json` plus the viewer document, and
    /// serves the result until interrupted (unless `--no-server`).
    Analyze {
        /// Chat-store source directory (overrides `[source].dir`).
        #[arg(long)]
        source: Option<PathBuf>,

        /// Start of the analysis window (YYYY-MM-DD). Default: 365 days ago.
        #[arg(long)]
        since: Option<String>,

        /// End of the analysis window (YYYY-MM-DD), widened to 23:59:59.
        /// Default: now.
        #[arg(long)]
        until: Option<String>,

        /// Output directory. Default: a timestamped directory under the
        /// current one.
        #[arg(short, long)]
        output_dir: Option<PathBuf>,

        /// Server port. Auto-increments when already bound.
        #[arg(short, long)]
        port: Option<u16>,

        /// Keep only the N highest-scoring contacts.
        #[arg(long)]
        max_nodes: Option<usize>,

        /// Progress reporting on stderr: `off`, `human`, or `json`.
        /// Default: human when stderr is a terminal.
        #[arg(long)]
        progress: Option<String>,

        /// Do not open the browser automatically.
        #[arg(long)]
        no_browser: bool,

        /// Data-only mode: write the artifact and exit without serving.
        #[arg(long)]
        no_server: bool,
    },

    /// Serve an existing output directory.
    ///
    /// Verifies `chat_data.json` exists, (re)installs the viewer document,
    /// and serves the directory until interrupted.
    Serve {
        /// Data directory containing `chat_data.json`. Default: current
        /// directory.
        #[arg(short = 'd', long)]
        data_dir: Option<PathBuf>,

        /// Server port. Auto-increments when already bound.
        #[arg(short, long)]
        port: Option<u16>,

        /// Do not open the browser automatically.
        #[arg(long)]
        no_browser: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let cfg = if cli.config.exists() {
        config::load_config(&cli.config)?
    } else {
        Config::minimal()
    };

    match cli.command {
        Commands::Analyze {
            source,
            since,
            until,
            output_dir,
            port,
            max_nodes,
            progress,
            no_browser,
            no_server,
        } => {
            // Surface a malformed window before any pipeline stage runs.
            let window = TimeWindow::from_dates(since.as_deref(), until.as_deref())?;

            let source_dir = source.or_else(|| cfg.source.dir.clone()).ok_or_else(|| {
                anyhow::anyhow!("no source directory configured; pass --source or set [source].dir")
            })?;

            let output_dir = output_dir.unwrap_or_else(default_output_dir);
            println!("Output directory: {}", output_dir.display());

            let opts = RunOptions {
                source_dir: source_dir.clone(),
                output_dir: output_dir.clone(),
                window,
                max_nodes: max_nodes.unwrap_or(cfg.analysis.max_nodes),
                credentials: Credentials {
                    key: cfg.resolve_key(),
                },
                host: cfg.server.host.clone(),
                port: port.unwrap_or(cfg.server.port),
                open_browser: !no_browser,
                serve: !no_server,
            };

            let progress_mode = match progress.as_deref() {
                None => ProgressMode::default_for_tty(),
                Some("off") => ProgressMode::Off,
                Some("human") => ProgressMode::Human,
                Some("json") => ProgressMode::Json,
                Some(other) => anyhow::bail!(
                    "unknown progress mode: '{}' (expected off, human, or json)",
                    other
                ),
            };

            let probe = DirectoryProbe::new(&source_dir);
            let decryptor = PlainStoreDecryptor;
            let factory = SqliteStoreFactory;
            let progress = progress_mode.reporter();

            let mut orchestrator =
                Orchestrator::new(&probe, &decryptor, &factory, progress.as_ref());
            let summary = orchestrator.run(&opts).await?;

            if no_server {
                println!(
                    "Analysis complete: {} contact(s). Serve later with: chatgraph serve -d {}",
                    summary.contacts,
                    output_dir.display()
                );
            }
        }
        Commands::Serve {
            data_dir,
            port,
            no_browser,
        } => {
            let data_dir = match data_dir {
                Some(dir) => dir,
                None => std::env::current_dir()?,
            };
            server::serve(
                &data_dir,
                &cfg.server.host,
                port.unwrap_or(cfg.server.port),
                !no_browser,
            )
            .await?;
        }
    }

    Ok(())
}

/// Timestamped default output directory under the working directory.
fn default_output_dir() -> PathBuf {
    PathBuf::from(
        chrono::Local::now()
            .format("chat_analysis_%Y%m%d_%H%M%S")
            .to_string(),
    )
}
