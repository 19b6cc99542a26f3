use callcraft_core::records::{Agent, Campaign, CampaignForm};
use callcraft_core::{Outcome, RecordManager};
use clap::Subcommand;
use uuid::Uuid;

use super::Context;
use crate::util::{exit_error, print_json, report};

#[derive(Subcommand)]
pub enum CampaignCommands {
    /// Create a campaign for one of your agents (starts as "pending")
    Create {
        /// Campaign name (e.g. "Q1 Sales Outreach")
        #[arg(long)]
        name: String,
        /// Agent id or exact agent name
        #[arg(long)]
        agent: String,
    },
    /// List your campaigns, newest first
    List,
}

/// Pick the agent from the user's own list, never from free input.
fn pick_agent(agents: &[Agent], wanted: &str) -> Option<Uuid> {
    let by_id = wanted
        .parse::<Uuid>()
        .ok()
        .and_then(|id| agents.iter().find(|a| a.id == id));
    by_id
        .or_else(|| agents.iter().find(|a| a.name == wanted))
        .map(|a| a.id)
}

pub async fn run(ctx: &Context, command: CampaignCommands) -> i32 {
    match command {
        CampaignCommands::Create { name, agent } => create(ctx, name, &agent).await,
        CampaignCommands::List => list(ctx).await,
    }
}

async fn create(ctx: &Context, name: String, agent: &str) -> i32 {
    let mut agents = RecordManager::<Agent>::new(ctx.store.clone());
    let loaded = agents.list(ctx.user()).await;
    if !matches!(loaded, Outcome::Loaded { .. }) {
        return report(&loaded);
    }

    let agent_id = if agents.records().is_empty() {
        None
    } else {
        match pick_agent(agents.records(), agent) {
            Some(id) => Some(id),
            None => exit_error(
                &format!("No agent '{agent}' among your agents"),
                Some("callcraft agent list"),
            ),
        }
    };

    let mut campaigns = RecordManager::<Campaign>::new(ctx.store.clone());
    if let Some(url) = &ctx.campaign_webhook {
        campaigns = campaigns.with_mirror(ctx.mirror.clone(), url.clone());
    }

    let mut form = CampaignForm { name, agent_id };
    let outcome = campaigns
        .create_campaign(ctx.user(), agents.records(), &mut form)
        .await;
    campaigns.flush_mirrors().await;
    report(&outcome)
}

async fn list(ctx: &Context) -> i32 {
    let mut campaigns = RecordManager::<Campaign>::new(ctx.store.clone());
    match campaigns.list(ctx.user()).await {
        Outcome::Loaded { .. } => {
            print_json(&campaigns.records());
            0
        }
        other => report(&other),
    }
}
