//! Record managers for Callcraft voice campaigns.
//!
//! Every entity (agents, contacts, campaigns, profiles) is handled by the same
//! [`manager::RecordManager`]: load the user's rows from a remote
//! [`store::RecordStore`], create/update/delete through a form, mirror selected
//! writes to a webhook on a best-effort basis, and refresh local state.

pub mod auth;
pub mod error;
pub mod manager;
pub mod query;
pub mod records;
pub mod results;
pub mod store;
pub mod webhook;

pub use auth::Identity;
pub use error::{StoreError, WebhookError};
pub use manager::{Notice, NoticeTone, Outcome, RecordManager};
