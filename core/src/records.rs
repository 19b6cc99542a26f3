use std::fmt;

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::Identity;
use crate::query::{Join, ListQuery};

/// A user-owned table the record manager can list.
pub trait Entity: DeserializeOwned + Clone + Send + Sync + 'static {
    const TABLE: &'static str;
    /// Nouns used in fallback error text ("Failed to load contacts").
    const SINGULAR: &'static str;
    const PLURAL: &'static str;

    fn list_query(user: &Identity) -> ListQuery;
}

/// An entity created from a form.
pub trait Creatable: Entity {
    const CREATED_TITLE: &'static str;
    const CREATED_DESCRIPTION: &'static str;
    /// Submit depends on choices loaded elsewhere; the generic create
    /// refuses and the entity's own gated entry point must be used.
    const GATED: bool = false;

    type Form: Form;
    type Insert: Serialize + Send + Sync;

    fn insert_payload(form: &Self::Form, user: &Identity) -> Self::Insert;
}

/// An entity whose creation is mirrored to a webhook.
pub trait Mirrored: Creatable {}

/// An entity the user can delete by primary key.
pub trait Deletable: Entity {
    const DELETED_TITLE: &'static str;
    const DELETED_DESCRIPTION: &'static str;

    fn key(&self) -> Uuid;
}

/// Form state. Required-field presence is the only validation performed
/// before a create is sent.
pub trait Form: Default + Clone + Send + Sync {
    fn missing_fields(&self) -> Vec<&'static str>;

    fn reset(&mut self) {
        *self = Self::default();
    }
}

fn blank(value: &str) -> bool {
    value.trim().is_empty()
}

// ── Agents ──────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Language {
    #[default]
    English,
    Spanish,
    French,
    German,
    Italian,
}

impl Language {
    pub const ALL: [Language; 5] = [
        Language::English,
        Language::Spanish,
        Language::French,
        Language::German,
        Language::Italian,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Language::English => "English",
            Language::Spanish => "Spanish",
            Language::French => "French",
            Language::German => "German",
            Language::Italian => "Italian",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A voice persona: greeting, behavioral prompt and language.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Agent {
    pub id: Uuid,
    #[serde(default)]
    pub user_id: Option<Uuid>,
    pub name: String,
    #[serde(default)]
    pub greeting_message: String,
    #[serde(default)]
    pub prompt: String,
    /// Stored as free text; rows written by other clients may hold any value.
    #[serde(default)]
    pub language: String,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewAgent {
    pub user_id: Uuid,
    pub name: String,
    pub greeting_message: String,
    pub prompt: String,
    pub language: Language,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AgentForm {
    pub name: String,
    pub greeting: String,
    pub prompt: String,
    pub language: Language,
}

impl Form for AgentForm {
    fn missing_fields(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if blank(&self.name) {
            missing.push("name");
        }
        if blank(&self.greeting) {
            missing.push("greeting");
        }
        if blank(&self.prompt) {
            missing.push("prompt");
        }
        missing
    }
}

impl Entity for Agent {
    const TABLE: &'static str = "agents";
    const SINGULAR: &'static str = "agent";
    const PLURAL: &'static str = "agents";

    fn list_query(user: &Identity) -> ListQuery {
        ListQuery::table(Self::TABLE).eq("user_id", user.id)
    }
}

impl Creatable for Agent {
    const CREATED_TITLE: &'static str = "Agent created!";
    const CREATED_DESCRIPTION: &'static str = "Your AI agent has been successfully created.";

    type Form = AgentForm;
    type Insert = NewAgent;

    fn insert_payload(form: &AgentForm, user: &Identity) -> NewAgent {
        NewAgent {
            user_id: user.id,
            name: form.name.clone(),
            greeting_message: form.greeting.clone(),
            prompt: form.prompt.clone(),
            language: form.language,
        }
    }
}

// ── Contacts ────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contact {
    pub id: Uuid,
    #[serde(default)]
    pub user_id: Option<Uuid>,
    pub name: String,
    pub phone: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewContact {
    pub user_id: Uuid,
    pub name: String,
    pub phone: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContactForm {
    pub name: String,
    pub phone: String,
}

impl Form for ContactForm {
    fn missing_fields(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if blank(&self.name) {
            missing.push("name");
        }
        if blank(&self.phone) {
            missing.push("phone");
        }
        missing
    }
}

impl Entity for Contact {
    const TABLE: &'static str = "contacts";
    const SINGULAR: &'static str = "contact";
    const PLURAL: &'static str = "contacts";

    fn list_query(user: &Identity) -> ListQuery {
        ListQuery::table(Self::TABLE)
            .eq("user_id", user.id)
            .order_desc("created_at")
    }
}

impl Creatable for Contact {
    const CREATED_TITLE: &'static str = "Contact added!";
    const CREATED_DESCRIPTION: &'static str = "Contact has been successfully added.";

    type Form = ContactForm;
    type Insert = NewContact;

    fn insert_payload(form: &ContactForm, user: &Identity) -> NewContact {
        NewContact {
            user_id: user.id,
            name: form.name.clone(),
            phone: form.phone.clone(),
        }
    }
}

impl Mirrored for Contact {}

impl Deletable for Contact {
    const DELETED_TITLE: &'static str = "Contact deleted";
    const DELETED_DESCRIPTION: &'static str = "Contact has been removed.";

    fn key(&self) -> Uuid {
        self.id
    }
}

// ── Campaigns ───────────────────────────────────────────

/// Campaign lifecycle status. Advanced by an external system; this crate
/// only ever writes `Pending`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum CampaignStatus {
    Pending,
    Active,
    Completed,
    Other(String),
}

impl CampaignStatus {
    pub fn as_str(&self) -> &str {
        match self {
            CampaignStatus::Pending => "pending",
            CampaignStatus::Active => "active",
            CampaignStatus::Completed => "completed",
            CampaignStatus::Other(s) => s,
        }
    }
}

impl From<String> for CampaignStatus {
    fn from(value: String) -> Self {
        match value.as_str() {
            "pending" => CampaignStatus::Pending,
            "active" => CampaignStatus::Active,
            "completed" => CampaignStatus::Completed,
            _ => CampaignStatus::Other(value),
        }
    }
}

impl From<CampaignStatus> for String {
    fn from(value: CampaignStatus) -> Self {
        match value {
            CampaignStatus::Other(s) => s,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for CampaignStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The embedded agent columns returned with a campaign row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentName {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Campaign {
    pub id: Uuid,
    pub name: String,
    pub status: CampaignStatus,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub agent_id: Option<Uuid>,
    /// `None` when the referenced agent is gone or not visible to the user.
    #[serde(default)]
    pub agents: Option<AgentName>,
}

impl Campaign {
    pub fn agent_name(&self) -> Option<&str> {
        self.agents.as_ref().map(|a| a.name.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewCampaign {
    pub user_id: Uuid,
    pub agent_id: Uuid,
    pub name: String,
    pub status: CampaignStatus,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CampaignForm {
    pub name: String,
    pub agent_id: Option<Uuid>,
}

impl CampaignForm {
    /// The create control is disabled until the user has at least one agent.
    pub fn can_submit(agents: &[Agent]) -> bool {
        !agents.is_empty()
    }
}

impl Form for CampaignForm {
    fn missing_fields(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if blank(&self.name) {
            missing.push("name");
        }
        if self.agent_id.is_none() {
            missing.push("agent_id");
        }
        missing
    }
}

impl Entity for Campaign {
    const TABLE: &'static str = "campaigns";
    const SINGULAR: &'static str = "campaign";
    const PLURAL: &'static str = "campaigns";

    fn list_query(user: &Identity) -> ListQuery {
        ListQuery::table(Self::TABLE)
            .select(["id", "name", "status", "created_at", "agent_id"])
            .join(Join::new(Agent::TABLE, "agent_id", ["name"]))
            .eq("user_id", user.id)
            .order_desc("created_at")
    }
}

impl Creatable for Campaign {
    const CREATED_TITLE: &'static str = "Campaign created!";
    const CREATED_DESCRIPTION: &'static str =
        "Your campaign has been successfully created and is ready to launch.";
    const GATED: bool = true;

    type Form = CampaignForm;
    type Insert = NewCampaign;

    fn insert_payload(form: &CampaignForm, user: &Identity) -> NewCampaign {
        NewCampaign {
            user_id: user.id,
            // missing_fields() rejects an empty agent before this is reached
            agent_id: form.agent_id.unwrap_or_default(),
            name: form.name.clone(),
            status: CampaignStatus::Pending,
        }
    }
}

impl Mirrored for Campaign {}

// ── Profiles ────────────────────────────────────────────

/// One row per authenticated user, keyed by the user id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    #[serde(default)]
    pub id: Option<Uuid>,
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

impl Entity for Profile {
    const TABLE: &'static str = "profiles";
    const SINGULAR: &'static str = "profile";
    const PLURAL: &'static str = "profile";

    fn list_query(user: &Identity) -> ListQuery {
        ListQuery::table(Self::TABLE)
            .select(["id", "full_name", "email"])
            .eq("id", user.id)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfileForm {
    pub full_name: String,
}

/// The only mutable profile column. Email is owned by the auth provider.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProfileUpdate {
    pub full_name: String,
}

/// Profile as displayed: blanks filled in from the identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProfileView {
    pub full_name: String,
    pub email: String,
    pub initial: char,
}

impl ProfileView {
    pub fn build(profile: Option<&Profile>, user: &Identity) -> Self {
        let full_name = profile
            .and_then(|p| p.full_name.clone())
            .unwrap_or_default();
        let email = profile
            .and_then(|p| p.email.clone())
            .filter(|e| !e.is_empty())
            .or_else(|| user.email.clone())
            .unwrap_or_default();
        let initial = full_name
            .chars()
            .next()
            .or_else(|| user.email.as_deref().and_then(|e| e.chars().next()))
            .map(|c| c.to_uppercase().next().unwrap_or(c))
            .unwrap_or('U');
        Self {
            full_name,
            email,
            initial,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user() -> Identity {
        Identity::new(Uuid::now_v7()).with_email("ada@example.com")
    }

    #[test]
    fn agent_form_defaults_to_english_and_requires_text_fields() {
        let form = AgentForm::default();
        assert_eq!(form.language, Language::English);
        assert_eq!(form.missing_fields(), vec!["name", "greeting", "prompt"]);
    }

    #[test]
    fn agent_insert_uses_wire_column_names() {
        let u = user();
        let form = AgentForm {
            name: "Sales Assistant".into(),
            greeting: "Hi there".into(),
            prompt: "Be concise".into(),
            language: Language::English,
        };
        let payload = serde_json::to_value(Agent::insert_payload(&form, &u)).unwrap();
        assert_eq!(payload["user_id"], serde_json::json!(u.id));
        assert_eq!(payload["greeting_message"], "Hi there");
        assert_eq!(payload["language"], "English");
    }

    #[test]
    fn campaign_status_keeps_unknown_values() {
        let status: CampaignStatus = serde_json::from_str("\"paused\"").unwrap();
        assert_eq!(status, CampaignStatus::Other("paused".into()));
        assert_eq!(serde_json::to_string(&status).unwrap(), "\"paused\"");
        assert_eq!(
            serde_json::to_string(&CampaignStatus::Pending).unwrap(),
            "\"pending\""
        );
    }

    #[test]
    fn new_campaigns_start_pending() {
        let u = user();
        let agent_id = Uuid::now_v7();
        let form = CampaignForm {
            name: "Q1 Sales Outreach".into(),
            agent_id: Some(agent_id),
        };
        let payload = Campaign::insert_payload(&form, &u);
        assert_eq!(payload.status, CampaignStatus::Pending);
        assert_eq!(payload.agent_id, agent_id);
    }

    #[test]
    fn campaign_submit_disabled_without_agents() {
        assert!(!CampaignForm::can_submit(&[]));
    }

    #[test]
    fn campaign_row_decodes_embedded_agent() {
        let row = serde_json::json!({
            "id": Uuid::now_v7(),
            "name": "Spring",
            "status": "active",
            "created_at": "2025-03-01T10:00:00Z",
            "agents": { "name": "Closer" }
        });
        let campaign: Campaign = serde_json::from_value(row).unwrap();
        assert_eq!(campaign.agent_name(), Some("Closer"));
        assert_eq!(campaign.status, CampaignStatus::Active);
    }

    #[test]
    fn profile_view_falls_back_to_identity_email() {
        let u = user();
        let profile = Profile {
            id: Some(u.id),
            full_name: None,
            email: None,
        };
        let view = ProfileView::build(Some(&profile), &u);
        assert_eq!(view.email, "ada@example.com");
        assert_eq!(view.initial, 'A');

        let anonymous = Identity::new(Uuid::now_v7());
        assert_eq!(ProfileView::build(None, &anonymous).initial, 'U');
    }
}
