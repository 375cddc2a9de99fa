//! Agora CLI
//!
//! Command-line front end for the Agora board.
//!
//! # Usage
//!
//! ```bash
//! # Sign in; the session is kept in the configured storage
//! agora signin me@example.com --password 'abcd123!'
//!
//! # List the second page of free-board posts
//! agora list --page 1 --category FREE
//!
//! # Create a post with an attachment
//! agora create --title Hello --content 'First post' --category FREE --file cat.png
//! ```

use std::path::PathBuf;

use agora_core::{Agora, ClientConfig, SessionEvent, StorageBackend, load_config, load_config_from};
use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use tokio::sync::broadcast;
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser)]
#[command(name = "agora")]
#[command(about = "Command-line client for the Agora board")]
#[command(version)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Configuration file (defaults to the platform config directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Override the server base URL
    #[arg(long, global = true)]
    base_url: Option<String>,

    /// Override where the session is kept
    #[arg(long, global = true, value_enum)]
    storage: Option<Storage>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum Storage {
    Memory,
    File,
    Keyring,
}

impl From<Storage> for StorageBackend {
    fn from(storage: Storage) -> Self {
        match storage {
            Storage::Memory => StorageBackend::Memory,
            Storage::File => StorageBackend::File,
            Storage::Keyring => StorageBackend::Keyring,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Create an account
    Signup {
        /// Email address used as the username
        username: String,

        /// Display name
        #[arg(short, long)]
        name: String,

        #[arg(short, long)]
        password: String,

        /// Repeat the password
        #[arg(long)]
        confirm: String,
    },

    /// Sign in and keep the session
    Signin {
        username: String,

        #[arg(short, long)]
        password: String,
    },

    /// Forget the local session
    Signout,

    /// Show the signed-in user
    Whoami,

    /// List board categories
    Categories,

    /// List posts
    List {
        /// Zero-based page index
        #[arg(long, default_value_t = 0)]
        page: u32,

        #[arg(long, default_value_t = agora_core::model::DEFAULT_PAGE_SIZE)]
        size: u32,

        /// Only posts in this category
        #[arg(short, long)]
        category: Option<String>,

        /// Print raw JSON
        #[arg(long)]
        json: bool,
    },

    /// Show one post
    Show {
        id: u64,

        /// Print raw JSON
        #[arg(long)]
        json: bool,
    },

    /// Create a post
    Create {
        #[command(flatten)]
        post: commands::PostArgs,
    },

    /// Replace a post; the attachment is kept unless --file is given
    Update {
        id: u64,

        #[command(flatten)]
        post: commands::PostArgs,
    },

    /// Delete a post
    Delete { id: u64 },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = resolve_config(&cli)?;
    let agora = Agora::connect(config)
        .await
        .context("Failed to initialize client")?;
    let events = agora.client().subscribe();

    let result = match cli.command {
        Commands::Signup {
            username,
            name,
            password,
            confirm,
        } => commands::signup(&agora, username, name, password, confirm).await,
        Commands::Signin { username, password } => {
            commands::signin(&agora, username, password).await
        }
        Commands::Signout => commands::signout(&agora).await,
        Commands::Whoami => commands::whoami(&agora),
        Commands::Categories => commands::categories(&agora).await,
        Commands::List {
            page,
            size,
            category,
            json,
        } => commands::list(&agora, page, size, category, json).await,
        Commands::Show { id, json } => commands::show(&agora, id, json).await,
        Commands::Create { post } => commands::create(&agora, post).await,
        Commands::Update { id, post } => commands::update(&agora, id, post).await,
        Commands::Delete { id } => commands::delete(&agora, id).await,
    };

    report_session_loss(events);
    result
}

fn resolve_config(cli: &Cli) -> Result<ClientConfig> {
    let mut config = match &cli.config {
        Some(path) => load_config_from(path)
            .with_context(|| format!("Failed to load config from {:?}", path))?,
        None => load_config().context("Failed to load config")?,
    };

    if let Some(base_url) = &cli.base_url {
        config.base_url = base_url
            .parse()
            .with_context(|| format!("Invalid base URL: {}", base_url))?;
    }
    if let Some(storage) = cli.storage {
        config.storage = storage.into();
    }
    Ok(config)
}

/// Tell the user when a command ended their session.
fn report_session_loss(mut events: broadcast::Receiver<SessionEvent>) {
    while let Ok(event) = events.try_recv() {
        if let SessionEvent::AuthenticationLost { reason, navigation } = event {
            eprintln!("Session expired ({}). Sign in again: agora signin <username>", reason);
            tracing::debug!("Front ends would {}", navigation);
        }
    }
}
