use std::sync::Arc;

use callcraft_core::store::RestStore;
use callcraft_core::webhook::WebhookMirror;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use url::Url;

mod commands;
mod util;

use commands::Context;
use commands::agent::AgentCommands;
use commands::campaign::CampaignCommands;
use commands::contact::ContactCommands;
use commands::profile::ProfileCommands;
use util::exit_error;

/// Used when `RUST_LOG` is unset.
const DEFAULT_LOG_FILTER: &str = "callcraft_cli=warn,callcraft_core=warn";

#[derive(Parser)]
#[command(name = "callcraft", version, about = "Callcraft CLI: configure AI voice agents, contacts and campaigns")]
struct Cli {
    /// Project URL of the hosted backend
    #[arg(long, env = "CALLCRAFT_URL")]
    url: Option<Url>,

    /// Public (anon) API key of the hosted backend
    #[arg(long, env = "CALLCRAFT_ANON_KEY", hide_env_values = true)]
    anon_key: Option<String>,

    /// Webhook that receives a copy of every new contact
    #[arg(long, env = "CALLCRAFT_CONTACT_WEBHOOK")]
    contact_webhook: Option<Url>,

    /// Webhook that receives a copy of every new campaign
    #[arg(long, env = "CALLCRAFT_CAMPAIGN_WEBHOOK")]
    campaign_webhook: Option<Url>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Sign in with email and password
    Login {
        #[arg(long)]
        email: String,
        #[arg(long, env = "CALLCRAFT_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Remove the stored session
    Logout,
    /// Show the signed-in user
    Whoami,
    /// Voice agent operations
    Agent {
        #[command(subcommand)]
        command: AgentCommands,
    },
    /// Contact operations
    Contact {
        #[command(subcommand)]
        command: ContactCommands,
    },
    /// Campaign operations
    Campaign {
        #[command(subcommand)]
        command: CampaignCommands,
    },
    /// Campaign counters and status table
    Results {
        /// Print a colored table instead of JSON
        #[arg(long)]
        table: bool,
    },
    /// Quick stats across agents, contacts and campaigns
    Dashboard,
    /// Profile operations
    Profile {
        #[command(subcommand)]
        command: ProfileCommands,
    },
}

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();

    // Logs go to stderr; stdout carries JSON output only
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| DEFAULT_LOG_FILTER.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    if let Commands::Logout = cli.command {
        if let Err(e) = commands::auth::logout() {
            exit_error(&e.to_string(), None);
        }
        return;
    }

    let url = cli.url.unwrap_or_else(|| {
        exit_error(
            "Backend URL is required",
            Some("Set --url or CALLCRAFT_URL"),
        )
    });
    let anon_key = cli.anon_key.unwrap_or_else(|| {
        exit_error(
            "Anon key is required",
            Some("Set --anon-key or CALLCRAFT_ANON_KEY"),
        )
    });

    if let Commands::Login { email, password } = &cli.command {
        if let Err(e) = commands::auth::login(&url, &anon_key, email, password).await {
            exit_error(&e.to_string(), Some("Check the email and password"));
        }
        return;
    }

    let session = match util::resolve_session(&url, &anon_key).await {
        Ok(session) => session,
        Err(e) => exit_error(&e.to_string(), Some("Run `callcraft login`")),
    };

    let mut store = RestStore::new(url, anon_key);
    if let Some(s) = &session {
        store = store.with_access_token(s.access_token.clone());
    }

    let ctx = Context {
        store: Arc::new(store),
        user: session.map(|s| s.user),
        mirror: WebhookMirror::http(),
        contact_webhook: cli.contact_webhook,
        campaign_webhook: cli.campaign_webhook,
    };

    let code = match cli.command {
        Commands::Whoami => commands::auth::whoami(ctx.user()),
        Commands::Agent { command } => commands::agent::run(&ctx, command).await,
        Commands::Contact { command } => commands::contact::run(&ctx, command).await,
        Commands::Campaign { command } => commands::campaign::run(&ctx, command).await,
        Commands::Results { table } => commands::results::results(&ctx, table).await,
        Commands::Dashboard => commands::results::dashboard(&ctx).await,
        Commands::Profile { command } => commands::profile::run(&ctx, command).await,
        Commands::Login { .. } | Commands::Logout => 0,
    };

    std::process::exit(code);
}
