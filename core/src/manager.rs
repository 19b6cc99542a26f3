use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use tokio::task::JoinHandle;
use url::Url;

use crate::auth::Identity;
use crate::error::StoreError;
use crate::records::{
    Agent, Campaign, CampaignForm, Creatable, Deletable, Entity, Form, Mirrored, Profile,
    ProfileForm, ProfileUpdate, ProfileView,
};
use crate::store::RecordStore;
use crate::webhook::{WebhookMirror, mirror_payload};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NoticeTone {
    Success,
    Error,
}

/// A non-blocking notification for the user (one per terminal outcome).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notice {
    #[serde(rename = "status")]
    pub tone: NoticeTone,
    pub title: String,
    pub description: String,
}

impl Notice {
    pub fn success(title: &str, description: &str) -> Self {
        Self {
            tone: NoticeTone::Success,
            title: title.to_string(),
            description: description.to_string(),
        }
    }

    /// Error notice carrying the failure's own message, or `fallback` when
    /// the failure had none.
    pub fn failure(err: &StoreError, fallback: &str) -> Self {
        let message = err.to_string();
        Self {
            tone: NoticeTone::Error,
            title: "Error".to_string(),
            description: if message.trim().is_empty() {
                fallback.to_string()
            } else {
                message
            },
        }
    }

    pub fn is_error(&self) -> bool {
        self.tone == NoticeTone::Error
    }
}

/// What a record manager operation did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// No authenticated user; nothing was requested.
    Skipped,
    /// The submit control is disabled; nothing was requested.
    Disabled,
    /// Required form fields are empty; nothing was requested.
    Invalid { missing: Vec<&'static str> },
    /// The list was replaced. Loads report success silently.
    Loaded { count: usize },
    Notified(Notice),
}

impl Outcome {
    pub fn notice(&self) -> Option<&Notice> {
        match self {
            Outcome::Notified(notice) => Some(notice),
            _ => None,
        }
    }

    pub fn is_error(&self) -> bool {
        self.notice().is_some_and(Notice::is_error)
    }
}

/// Mediates between a form/list and the remote store for one entity type.
pub struct RecordManager<E: Entity> {
    store: Arc<dyn RecordStore>,
    mirror: Option<(WebhookMirror, Url)>,
    records: Vec<E>,
    in_flight: Vec<JoinHandle<()>>,
}

impl<E: Entity> RecordManager<E> {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self {
            store,
            mirror: None,
            records: Vec::new(),
            in_flight: Vec::new(),
        }
    }

    pub fn records(&self) -> &[E] {
        &self.records
    }

    /// Reload the user's rows. On failure the previous list is kept.
    pub async fn list(&mut self, user: Option<&Identity>) -> Outcome {
        let Some(user) = user else {
            return Outcome::Skipped;
        };

        match self.fetch(user).await {
            Ok(rows) => {
                tracing::debug!(table = E::TABLE, count = rows.len(), "records loaded");
                self.records = rows;
                Outcome::Loaded {
                    count: self.records.len(),
                }
            }
            Err(err) => {
                tracing::error!(table = E::TABLE, error = %err, "failed to load records");
                Outcome::Notified(Notice::failure(
                    &err,
                    &format!("Failed to load {}", E::PLURAL),
                ))
            }
        }
    }

    async fn fetch(&self, user: &Identity) -> Result<Vec<E>, StoreError> {
        let rows = self.store.list(&E::list_query(user)).await?;
        rows.into_iter()
            .map(|row| serde_json::from_value(row).map_err(StoreError::from))
            .collect()
    }

    /// Wait for queued webhook deliveries. Never part of an operation's own
    /// success path; callers use it before shutting down.
    pub async fn flush_mirrors(&mut self) {
        for handle in self.in_flight.drain(..) {
            if let Err(e) = handle.await {
                tracing::warn!(error = %e, "webhook mirror task aborted");
            }
        }
    }
}

impl<E: Mirrored> RecordManager<E> {
    /// Mirror successful creates to `url`.
    pub fn with_mirror(mut self, mirror: WebhookMirror, url: Url) -> Self {
        self.mirror = Some((mirror, url));
        self
    }
}

impl<E: Creatable> RecordManager<E> {
    /// Insert a row from `form`, mirror it, notify, reset the form, and
    /// reload the list. On insert failure the form is left untouched.
    /// Gated entities report [`Outcome::Disabled`] here without a request.
    pub async fn create(&mut self, user: Option<&Identity>, form: &mut E::Form) -> Outcome {
        if E::GATED {
            return Outcome::Disabled;
        }
        self.submit(user, form).await
    }

    async fn submit(&mut self, user: Option<&Identity>, form: &mut E::Form) -> Outcome {
        let Some(user) = user else {
            return Outcome::Skipped;
        };

        let missing = form.missing_fields();
        if !missing.is_empty() {
            return Outcome::Invalid { missing };
        }

        let payload = E::insert_payload(form, user);
        let inserted = match serde_json::to_value(&payload) {
            Ok(row) => self.store.insert(E::TABLE, row).await,
            Err(e) => Err(StoreError::from(e)),
        };
        if let Err(err) = inserted {
            tracing::error!(table = E::TABLE, error = %err, "insert failed");
            return Outcome::Notified(Notice::failure(
                &err,
                &format!("Failed to create {}", E::SINGULAR),
            ));
        }
        tracing::info!(table = E::TABLE, user_id = %user.id, "record created");

        if let Some((mirror, url)) = &self.mirror {
            match mirror_payload(&payload, Utc::now()) {
                Ok(body) => {
                    self.in_flight.retain(|h| !h.is_finished());
                    self.in_flight.push(mirror.dispatch(url.clone(), body));
                }
                Err(e) => tracing::warn!(error = %e, "could not encode webhook payload"),
            }
        }

        form.reset();
        // The notice reports the insert; a failed reload is only logged.
        if let Outcome::Notified(notice) = self.list(Some(user)).await {
            tracing::warn!(table = E::TABLE, error = %notice.description, "reload after create failed");
        }
        Outcome::Notified(Notice::success(E::CREATED_TITLE, E::CREATED_DESCRIPTION))
    }
}

impl<E: Deletable> RecordManager<E> {
    /// Delete by primary key, then reload. Ownership is the backend's job.
    pub async fn delete(&mut self, user: Option<&Identity>, key: uuid::Uuid) -> Outcome {
        let Some(user) = user else {
            return Outcome::Skipped;
        };

        if let Err(err) = self.store.delete(E::TABLE, key).await {
            tracing::error!(table = E::TABLE, %key, error = %err, "delete failed");
            return Outcome::Notified(Notice::failure(
                &err,
                &format!("Failed to delete {}", E::SINGULAR),
            ));
        }
        tracing::info!(table = E::TABLE, %key, "record deleted");

        if let Outcome::Notified(notice) = self.list(Some(user)).await {
            tracing::warn!(table = E::TABLE, error = %notice.description, "reload after delete failed");
        }
        Outcome::Notified(Notice::success(E::DELETED_TITLE, E::DELETED_DESCRIPTION))
    }
}

impl RecordManager<Campaign> {
    /// Campaign submit, gated on the user having loaded agents to pick from.
    pub async fn create_campaign(
        &mut self,
        user: Option<&Identity>,
        agents: &[Agent],
        form: &mut CampaignForm,
    ) -> Outcome {
        if !CampaignForm::can_submit(agents) {
            return Outcome::Disabled;
        }
        self.submit(user, form).await
    }
}

impl RecordManager<Profile> {
    /// The loaded profile with blanks filled from the identity.
    pub fn view(&self, user: &Identity) -> ProfileView {
        ProfileView::build(self.records.first(), user)
    }

    /// Save the full name. The local copy is updated in place; no reload.
    pub async fn update(&mut self, user: Option<&Identity>, form: &ProfileForm) -> Outcome {
        let Some(user) = user else {
            return Outcome::Skipped;
        };

        let patch = ProfileUpdate {
            full_name: form.full_name.clone(),
        };
        let result = match serde_json::to_value(&patch) {
            Ok(fields) => self.store.update(Profile::TABLE, user.id, fields).await,
            Err(e) => Err(StoreError::from(e)),
        };

        match result {
            Ok(_) => {
                match self.records.first_mut() {
                    Some(profile) => profile.full_name = Some(patch.full_name),
                    None => self.records.push(Profile {
                        id: Some(user.id),
                        full_name: Some(patch.full_name),
                        email: user.email.clone(),
                    }),
                }
                Outcome::Notified(Notice::success(
                    "Profile updated!",
                    "Your profile has been successfully updated.",
                ))
            }
            Err(err) => {
                tracing::error!(error = %err, "profile update failed");
                Outcome::Notified(Notice::failure(&err, "Failed to update profile"))
            }
        }
    }
}
