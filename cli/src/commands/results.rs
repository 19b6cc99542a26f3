use callcraft_core::records::{Agent, Campaign, Contact};
use callcraft_core::results::{CampaignRow, CampaignSummary, QuickStats};
use callcraft_core::{Outcome, RecordManager};
use serde_json::json;

use super::Context;
use crate::util::{print_json, report};

/// Campaign counters plus the full table.
pub async fn results(ctx: &Context, table: bool) -> i32 {
    let mut campaigns = RecordManager::<Campaign>::new(ctx.store.clone());
    let outcome = campaigns.list(ctx.user()).await;
    if !matches!(outcome, Outcome::Loaded { .. }) {
        return report(&outcome);
    }

    let summary = CampaignSummary::from_campaigns(campaigns.records());
    let rows: Vec<CampaignRow> = campaigns.records().iter().map(CampaignRow::from).collect();

    if table {
        print_table(&summary, &rows);
    } else {
        print_json(&json!({
            "summary": summary,
            "campaigns": rows,
        }));
    }
    0
}

fn print_table(summary: &CampaignSummary, rows: &[CampaignRow]) {
    println!(
        "Total Campaigns: {}   Active: {}   Completed: {}",
        summary.total, summary.active, summary.completed
    );
    if rows.is_empty() {
        println!("No campaigns yet");
        return;
    }
    println!();
    println!("{:<28} {:<20} {:<12} {:<10} Results", "Campaign", "Agent", "Status", "Created");
    for row in rows {
        // pad before coloring so escape codes don't skew the columns
        let status = format!("{:<12}", row.status);
        println!(
            "{:<28} {:<20} \x1b[{}m{status}\x1b[0m {:<10} -",
            row.name,
            row.agent,
            row.tone.ansi(),
            row.created
        );
    }
}

/// Quick stats across every entity list.
pub async fn dashboard(ctx: &Context) -> i32 {
    let mut agents = RecordManager::<Agent>::new(ctx.store.clone());
    let mut contacts = RecordManager::<Contact>::new(ctx.store.clone());
    let mut campaigns = RecordManager::<Campaign>::new(ctx.store.clone());

    for outcome in [
        agents.list(ctx.user()).await,
        contacts.list(ctx.user()).await,
        campaigns.list(ctx.user()).await,
    ] {
        if !matches!(outcome, Outcome::Loaded { .. }) {
            return report(&outcome);
        }
    }

    print_json(&QuickStats::new(
        agents.records().len(),
        contacts.records().len(),
        campaigns.records().len(),
    ));
    0
}
