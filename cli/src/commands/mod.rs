use std::sync::Arc;

use callcraft_core::Identity;
use callcraft_core::store::RecordStore;
use callcraft_core::webhook::WebhookMirror;
use url::Url;

pub mod agent;
pub mod auth;
pub mod campaign;
pub mod contact;
pub mod profile;
pub mod results;

/// Everything a record command needs, resolved once in `main`.
pub struct Context {
    pub store: Arc<dyn RecordStore>,
    pub user: Option<Identity>,
    pub mirror: WebhookMirror,
    pub contact_webhook: Option<Url>,
    pub campaign_webhook: Option<Url>,
}

impl Context {
    pub fn user(&self) -> Option<&Identity> {
        self.user.as_ref()
    }
}
