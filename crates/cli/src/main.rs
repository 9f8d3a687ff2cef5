//! STNS CLI - Command-line front end for the catalog admin.
//!
//! # Usage
//!
//! ```bash
//! # Log in (prompts for the password on stdin when --password is omitted)
//! stns login -u admin
//!
//! # Browse and edit the catalog
//! stns categories list --page 2
//! stns categories create "Power Tools"
//! stns products list --size 24
//! stns products create -n Hammer -p 12.50 -q 3 -c "Power Tools"
//! stns products delete 7 --yes
//!
//! # Shop
//! stns cart add 7 -q 2
//! stns cart checkout
//!
//! stns logout
//! ```
//!
//! # Environment Variables
//!
//! - `STNS_API_BASE_URL`, `STNS_DATA_DIR`, `STNS_HTTP_TIMEOUT_SECS`,
//!   `STNS_PAGE_SIZE` - see `stns_client::config`
//! - `STNS_LOG_JSON` - Emit logs as JSON
//! - `RUST_LOG` - Log filter (default: `stns_cli=info,stns_client=info`)

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::sync::Arc;

use clap::{Parser, Subcommand};
use stns_client::{ApiError, App, ClientConfig, ViewScope};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

use commands::Context;

#[derive(Parser)]
#[command(name = "stns")]
#[command(author, version, about = "STNS catalog admin")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Log in and store the session
    Login {
        #[arg(short, long)]
        username: String,

        /// Read from stdin when omitted
        #[arg(short, long)]
        password: Option<String>,
    },
    /// End the session and discard the cart
    Logout,
    /// Create an account
    Register(commands::auth::RegisterArgs),
    /// Show whether a session is active
    Status,
    /// Browse and create categories
    Categories {
        #[command(subcommand)]
        action: commands::categories::CategoryAction,
    },
    /// Browse and edit products
    Products {
        #[command(subcommand)]
        action: commands::products::ProductAction,
    },
    /// Manage the shopping cart
    Cart {
        #[command(subcommand)]
        action: commands::cart::CartAction,
    },
}

#[tokio::main]
async fn main() {
    init_tracing();

    let cli = Cli::parse();

    let result: Result<(), Box<dyn std::error::Error>> = run(cli).await;

    if let Err(e) = result {
        match e.downcast_ref::<ApiError>() {
            Some(api) => tracing::error!(kind = ?api.kind(), "{}", api.display_message()),
            None => tracing::error!("Command failed: {e}"),
        }
        std::process::exit(1);
    }
}

/// Logs go to stderr so command output on stdout stays clean.
fn init_tracing() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "stns_cli=info,stns_client=info".into());

    let json = std::env::var("STNS_LOG_JSON").is_ok_and(|v| !v.is_empty());
    let json_layer = json.then(|| {
        tracing_subscriber::fmt::layer()
            .json()
            .flatten_event(true)
            .with_writer(std::io::stderr)
    });
    let text_layer = (!json).then(|| tracing_subscriber::fmt::layer().with_writer(std::io::stderr));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(json_layer)
        .with(text_layer)
        .init();
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let config = ClientConfig::from_env()?;
    let app = App::from_config(config)?;
    let _follow = app.navigator().follow_session();

    // Ctrl-C closes the view; in-flight requests resolve to `Cancelled`.
    let scope = Arc::new(ViewScope::new());
    let interrupt = Arc::clone(&scope);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupted");
            interrupt.close();
        }
    });

    let ctx = Context::new(app, scope.handle());

    match cli.command {
        Commands::Login { username, password } => {
            commands::auth::login(&ctx, &username, password).await?;
        }
        Commands::Logout => commands::auth::logout(&ctx)?,
        Commands::Register(args) => commands::auth::register(&ctx, args).await?,
        Commands::Status => commands::auth::status(&ctx)?,
        Commands::Categories { action } => commands::categories::run(&ctx, action).await?,
        Commands::Products { action } => commands::products::run(&ctx, action).await?,
        Commands::Cart { action } => commands::cart::run(&ctx, action).await?,
    }
    Ok(())
}
