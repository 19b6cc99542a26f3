use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The authenticated user every record operation is scoped to.
///
/// Operations receive it explicitly as `Option<&Identity>`; `None` means
/// nobody is signed in and the operation does nothing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub id: Uuid,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

impl Identity {
    pub fn new(id: Uuid) -> Self {
        Self { id, email: None }
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }
}
