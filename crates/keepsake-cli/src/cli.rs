//! Clap CLI definitions for Keepsake.

use clap::{Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;

pub const AFTER_HELP: &str = "\
Examples:
  keepsake init                      Create ~/.keepsake/ and a default config
  keepsake serve                     Run the HTTP API daemon
  keepsake wake ada --limit 5        Assemble a wake for agent 'ada'
  keepsake remember ada \"note\"       Record an observation
  keepsake list ada                  List recent observations
  keepsake supersede OLD NEW         Replace one observation with another
  keepsake doc set ada identity -    Store a standing document from stdin";

/// Keepsake — persistent observation memory for conversational agents.
#[derive(Parser)]
#[command(
    name = "keepsake",
    version,
    about = "Keepsake \u{2014} persistent observation memory for conversational agents",
    after_help = AFTER_HELP,
)]
pub struct Cli {
    /// Path to config file.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize Keepsake (create ~/.keepsake/ and a default config).
    Init,
    /// Run the HTTP API daemon.
    Serve {
        /// Listen address; overrides the config file.
        #[arg(long)]
        addr: Option<String>,
    },
    /// Assemble a wake for an agent and print it.
    Wake {
        /// Agent to wake.
        agent: String,
        /// Per-tier limit (clamped to the configured maximum).
        #[arg(long)]
        limit: Option<usize>,
        /// Skip the hot tier.
        #[arg(long)]
        no_hot: bool,
        /// Attach provenance tags.
        #[arg(long)]
        explain: bool,
        /// Lens expression, e.g. 'relational:sam+-emotional'.
        #[arg(long)]
        lens: Option<String>,
        /// Response shape: full, context, or digest.
        #[arg(long, default_value = "full")]
        shape: String,
    },
    /// Record a new observation.
    Remember {
        /// Agent the observation belongs to.
        agent: String,
        /// Free-text body.
        content: String,
        /// Who is recording it.
        #[arg(long, default_value = "cli")]
        author: String,
        /// Category tag (project, relational, emotional, ...).
        #[arg(long, default_value = "system")]
        kind: String,
        /// Importance, 0-100.
        #[arg(long, default_value_t = 0)]
        salience: i64,
        /// Pin against decay.
        #[arg(long)]
        pinned: bool,
        /// Whose point of view the content is written from.
        #[arg(long, default_value = "")]
        perspective: String,
        /// Platform the observation arrived from.
        #[arg(long)]
        platform: Option<String>,
    },
    /// List recent observations for an agent.
    List {
        /// Agent to list.
        agent: String,
        /// Maximum rows.
        #[arg(long, default_value_t = 20)]
        limit: usize,
    },
    /// List superseded observations for an agent.
    Superseded {
        /// Agent to list.
        agent: String,
        /// Maximum rows.
        #[arg(long, default_value_t = 20)]
        limit: usize,
    },
    /// Show one observation by id.
    Show {
        /// Observation id.
        id: String,
    },
    /// Pin or unpin an observation.
    Pin {
        /// Observation id.
        id: String,
        /// Unpin instead of pinning.
        #[arg(long)]
        unpin: bool,
    },
    /// Delete an observation (soft by default).
    Delete {
        /// Observation id.
        id: String,
        /// Physically remove the row; irreversible.
        #[arg(long)]
        hard: bool,
    },
    /// Mark TARGET as superseded by SUPERSEDING.
    Supersede {
        /// Observation being replaced.
        target: String,
        /// Observation that replaces it.
        superseding: String,
    },
    /// Manage standing documents for an agent.
    Doc {
        #[command(subcommand)]
        command: DocCommands,
    },
    /// Generate shell completions.
    Completions {
        /// Shell to generate completions for.
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Subcommand)]
pub enum DocCommands {
    /// Print a document.
    Get { agent: String, key: String },
    /// Store a document; pass '-' to read from stdin.
    Set {
        agent: String,
        key: String,
        content: String,
    },
    /// Delete a document.
    Delete { agent: String, key: String },
    /// List documents for an agent.
    List { agent: String },
}
