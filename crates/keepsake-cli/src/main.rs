//! Keepsake CLI — command-line interface for the observation memory.
//!
//! `keepsake serve` runs the HTTP daemon; every other command opens the
//! store in-process and runs single-shot against it.

mod cli;
mod cmd;

use clap::{CommandFactory, Parser};
use cli::{Cli, Commands, DocCommands};
use keepsake_api::AppState;
use keepsake_store::{DocStore, SqliteRecordStore};
use keepsake_types::config::{load_config, KeepsakeConfig};
use std::sync::Arc;

fn init_tracing(config: &KeepsakeConfig) {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(config.log_level.clone())),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn open_store(config: &KeepsakeConfig) -> anyhow::Result<SqliteRecordStore> {
    Ok(SqliteRecordStore::open(&config.db_path())?)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref());
    init_tracing(&config);

    match cli.command {
        Commands::Init => cmd::init::run(cli.config.as_deref()),
        Commands::Serve { addr } => {
            let store = open_store(&config)?;
            let docs = DocStore::new(store.connection());
            let state = Arc::new(AppState {
                store: Arc::new(store),
                docs,
                tuning: config.wake.clone(),
            });
            let addr = addr.unwrap_or_else(|| config.listen_addr.clone());
            keepsake_api::serve(state, &addr).await?;
            Ok(())
        }
        Commands::Wake {
            agent,
            limit,
            no_hot,
            explain,
            lens,
            shape,
        } => {
            let store = open_store(&config)?;
            cmd::wake::wake(&store, &config, &agent, limit, no_hot, explain, lens, &shape)
        }
        Commands::Remember {
            agent,
            content,
            author,
            kind,
            salience,
            pinned,
            perspective,
            platform,
        } => {
            let store = open_store(&config)?;
            cmd::wake::remember(
                &store,
                &agent,
                &content,
                &author,
                &kind,
                salience,
                pinned,
                &perspective,
                platform,
            )
        }
        Commands::List { agent, limit } => {
            let store = open_store(&config)?;
            cmd::observation::list(&store, &agent, limit)
        }
        Commands::Superseded { agent, limit } => {
            let store = open_store(&config)?;
            cmd::observation::superseded(&store, &agent, limit)
        }
        Commands::Show { id } => {
            let store = open_store(&config)?;
            cmd::observation::show(&store, &id)
        }
        Commands::Pin { id, unpin } => {
            let store = open_store(&config)?;
            cmd::observation::pin(&store, &id, !unpin)
        }
        Commands::Delete { id, hard } => {
            let store = open_store(&config)?;
            cmd::observation::delete(&store, &id, hard)
        }
        Commands::Supersede {
            target,
            superseding,
        } => {
            let store = open_store(&config)?;
            cmd::observation::supersede(&store, &target, &superseding)
        }
        Commands::Doc { command } => {
            let store = open_store(&config)?;
            let docs = DocStore::new(store.connection());
            match command {
                DocCommands::Get { agent, key } => cmd::doc::get(&docs, &agent, &key),
                DocCommands::Set {
                    agent,
                    key,
                    content,
                } => cmd::doc::set(&docs, &agent, &key, &content),
                DocCommands::Delete { agent, key } => cmd::doc::delete(&docs, &agent, &key),
                DocCommands::List { agent } => cmd::doc::list(&docs, &agent),
            }
        }
        Commands::Completions { shell } => {
            let mut command = Cli::command();
            let name = command.get_name().to_string();
            clap_complete::generate(shell, &mut command, name, &mut std::io::stdout());
            Ok(())
        }
    }
}
