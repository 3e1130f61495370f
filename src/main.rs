//! # ragdesk CLI
//!
//! The `ragdesk` binary ingests regulatory documents into a local SQLite
//! knowledge base and answers questions over them, from the command line
//! or through the HTTP API used by the dashboard.
//!
//! ## Usage
//!
//! ```bash
//! ragdesk --config ./config/ragdesk.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `ragdesk init [--seed]` | Create the SQLite database and run schema migrations |
//! | `ragdesk ingest <paths...>` | Extract, chunk, embed and store documents |
//! | `ragdesk ask "<question>"` | Answer a question with cited sources |
//! | `ragdesk documents list` | List documents, newest first |
//! | `ragdesk documents delete <id>` | Delete a document and its chunks |
//! | `ragdesk history` | Show recent questions and answers |
//! | `ragdesk stats` | Knowledge-base summary |
//! | `ragdesk serve` | Start the HTTP server |
//!
//! Logging goes to stderr and is controlled with `RUST_LOG`.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use ragdesk::{ask, config, documents, history, ingest, migrate, seed, server, stats};

/// ragdesk: question answering over your own regulatory documents.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. See `config/ragdesk.example.toml` for a full example.
#[derive(Parser)]
#[command(
    name = "ragdesk",
    about = "Retrieval-augmented question answering over uploaded documents",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/ragdesk.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the database schema.
    ///
    /// Idempotent: running it multiple times is safe.
    Init {
        /// Insert a sample document and query when the database is empty.
        #[arg(long)]
        seed: bool,
    },

    /// Ingest files or directories.
    ///
    /// Directories are walked recursively. The media type is taken from the
    /// file extension unless `--media-type` is given.
    Ingest {
        #[arg(required = true)]
        paths: Vec<PathBuf>,

        /// Category label (default "Uncategorized").
        #[arg(long)]
        category: Option<String>,

        /// Impact label (default "Low").
        #[arg(long)]
        impact: Option<String>,

        /// Media type for every file, e.g. `application/pdf`.
        #[arg(long)]
        media_type: Option<String>,
    },

    /// Ask a question.
    Ask {
        question: String,

        /// Print the full response as JSON.
        #[arg(long)]
        json: bool,
    },

    /// List or delete documents.
    Documents {
        #[command(subcommand)]
        action: DocumentsAction,
    },

    /// Show recent questions and answers, newest first.
    History {
        #[arg(long, default_value_t = history::DEFAULT_HISTORY_LIMIT)]
        limit: i64,
    },

    /// Show knowledge-base statistics.
    Stats,

    /// Start the HTTP server on `[server].bind`.
    Serve,
}

#[derive(Subcommand)]
enum DocumentsAction {
    /// List documents, newest first.
    List,
    /// Delete a document and all of its chunks.
    Delete { id: i64 },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("ragdesk=info,ragdesk_core=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Init { seed } => {
            migrate::run_migrations(&cfg).await?;
            println!("Database initialized successfully.");
            if seed {
                let app = ragdesk::app::App::open(&cfg).await?;
                let seeded = seed::seed_sample(app.store.as_ref()).await;
                app.close().await;
                if seeded? {
                    println!("Sample document added.");
                } else {
                    println!("Database already has documents; sample skipped.");
                }
            }
        }
        Commands::Ingest {
            paths,
            category,
            impact,
            media_type,
        } => {
            let options = ingest::IngestOptions {
                category,
                impact,
                media_type,
            };
            ingest::run_ingest(&cfg, &paths, &options).await?;
        }
        Commands::Ask { question, json } => {
            ask::run_ask(&cfg, &question, json).await?;
        }
        Commands::Documents { action } => match action {
            DocumentsAction::List => documents::run_list(&cfg).await?,
            DocumentsAction::Delete { id } => documents::run_delete(&cfg, id).await?,
        },
        Commands::History { limit } => {
            history::run_history(&cfg, limit).await?;
        }
        Commands::Stats => {
            stats::run_stats(&cfg).await?;
        }
        Commands::Serve => {
            server::run_server(&cfg).await?;
        }
    }

    Ok(())
}
