//! CLI entry point for cartlist.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use cartlist_app::ClientConfig;
use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::{EnvFilter, fmt::format::FmtSpan};

mod commands;
mod render;

/// Shared shopping checklist.
#[derive(Parser, Debug)]
#[command(
    name = "cartlist",
    version,
    about = "cartlist: shared shopping checklist with optimistic sync"
)]
struct Cli {
    /// Configuration file (defaults to <config_dir>/cartlist/config.toml).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Collection endpoint, overriding config and environment.
    #[arg(long, global = true)]
    endpoint: Option<String>,

    /// Bearer token, overriding config and environment.
    #[arg(long, global = true)]
    token: Option<String>,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    #[command(flatten)]
    Items(ItemCommand),

    /// Show or change view preferences.
    Prefs {
        #[command(subcommand)]
        action: PrefsCommand,
    },
}

/// Commands that need the loaded item list.
#[derive(Subcommand, Debug)]
enum ItemCommand {
    /// Show the list using the saved view preferences.
    Ls {
        /// Print the view as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Add an item.
    Add {
        name: String,
        #[arg(long)]
        store: Option<String>,
    },

    /// Check or uncheck an item.
    Toggle { id: String },

    /// Delete an item.
    Rm { id: String },

    /// Rename an item or move it to another store.
    Edit {
        id: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long, conflicts_with = "no_store")]
        store: Option<String>,
        #[arg(long)]
        no_store: bool,
    },

    /// List stores with item counts.
    Stores,
}

#[derive(Subcommand, Debug)]
enum PrefsCommand {
    /// Print the saved preferences.
    Show,

    /// Only show the given stores ("" selects items without a store).
    Filter {
        #[arg(required_unless_present = "clear", conflicts_with = "clear")]
        stores: Vec<String>,
        #[arg(long)]
        clear: bool,
    },

    /// Group the list by store.
    Group { state: Switch },

    /// Hide checked-off items.
    HideCompleted { state: Switch },

    /// Expand or collapse one store group.
    Expand { store: String },
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum Switch {
    On,
    Off,
}

impl Switch {
    const fn enabled(self) -> bool {
        matches!(self, Self::On)
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    install_tracing();
    let Cli {
        config,
        endpoint,
        token,
        cmd,
    } = Cli::parse();

    let result = match resolve_config(config, endpoint, token) {
        Ok(config) => commands::run(cmd, &config).await,
        Err(err) => Err(err),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err:#}");
            let status = commands::exit_status(&err);
            if status == commands::AUTH_EXIT {
                eprintln!("sign in again: pass a fresh token with --token or CARTLIST_TOKEN");
            }
            ExitCode::from(status)
        }
    }
}

/// Flag, then environment, then file, then defaults.
fn resolve_config(path: Option<PathBuf>, endpoint: Option<String>, token: Option<String>) -> Result<ClientConfig> {
    let mut config = ClientConfig::load(path.as_deref())?;
    config.apply_env();
    if let Some(endpoint) = endpoint {
        config.remote.endpoint = endpoint;
    }
    if let Some(token) = token {
        config.auth.token = Some(token);
    }
    config.validate()?;
    Ok(config)
}

fn install_tracing() {
    // RUST_LOG narrows or widens the filter; INFO by default.
    let filter = EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into());
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_span_events(FmtSpan::NONE)
        .with_writer(std::io::stderr)
        .compact()
        .try_init();
}
