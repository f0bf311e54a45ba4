//! The resolved caller of a request.

use serde::{Deserialize, Serialize};

use reminder_core::types::UserId;

/// Who is acting. Resolved from the session token by the HTTP layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    /// The authenticated user's ID.
    pub user_id: UserId,
    /// Address reminders for this user's events are sent to.
    pub email: String,
}

impl Identity {
    /// Creates a new identity.
    pub fn new(user_id: UserId, email: impl Into<String>) -> Self {
        Self {
            user_id,
            email: email.into(),
        }
    }
}
