//! Read-only aggregates over already-loaded lists. Recomputed on every call.

use serde::Serialize;

use crate::records::{Campaign, CampaignStatus};

/// Badge color for a campaign status. Unknown statuses stay unstyled (gray).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusTone {
    Yellow,
    Green,
    Blue,
    Gray,
}

impl StatusTone {
    pub fn of(status: &CampaignStatus) -> Self {
        match status {
            CampaignStatus::Pending => StatusTone::Yellow,
            CampaignStatus::Active => StatusTone::Green,
            CampaignStatus::Completed => StatusTone::Blue,
            CampaignStatus::Other(_) => StatusTone::Gray,
        }
    }

    /// ANSI SGR color code for terminal badges.
    pub fn ansi(self) -> &'static str {
        match self {
            StatusTone::Yellow => "33",
            StatusTone::Green => "32",
            StatusTone::Blue => "34",
            StatusTone::Gray => "90",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CampaignSummary {
    pub total: usize,
    pub active: usize,
    pub completed: usize,
}

impl CampaignSummary {
    pub fn from_campaigns(campaigns: &[Campaign]) -> Self {
        Self::from_statuses(campaigns.iter().map(|c| &c.status))
    }

    pub fn from_statuses<'a>(statuses: impl IntoIterator<Item = &'a CampaignStatus>) -> Self {
        statuses
            .into_iter()
            .fold(CampaignSummary::default(), |mut acc, status| {
                acc.total += 1;
                match status {
                    CampaignStatus::Active => acc.active += 1,
                    CampaignStatus::Completed => acc.completed += 1,
                    _ => {}
                }
                acc
            })
    }
}

/// One row of the results table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CampaignRow {
    pub name: String,
    pub agent: String,
    pub status: String,
    pub tone: StatusTone,
    pub created: String,
}

impl From<&Campaign> for CampaignRow {
    fn from(campaign: &Campaign) -> Self {
        Self {
            name: campaign.name.clone(),
            agent: campaign.agent_name().unwrap_or("N/A").to_string(),
            status: campaign.status.to_string(),
            tone: StatusTone::of(&campaign.status),
            created: campaign.created_at.format("%Y-%m-%d").to_string(),
        }
    }
}

/// Dashboard counters. There is no call outcome data yet, so the success
/// rate is always unavailable.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct QuickStats {
    pub agents: usize,
    pub contacts: usize,
    pub campaigns: usize,
    pub success_rate: Option<f64>,
}

impl QuickStats {
    pub fn new(agents: usize, contacts: usize, campaigns: usize) -> Self {
        Self {
            agents,
            contacts,
            campaigns,
            success_rate: None,
        }
    }
}
