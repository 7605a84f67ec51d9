use std::sync::Arc;

use uuid::Uuid;

use crate::store::UserDirectory;

/// Reads a user's notification opt-in. Never cached: a user may switch
/// notifications off between two events.
#[derive(Clone)]
pub struct PreferenceGate {
    users: Arc<dyn UserDirectory>,
}

impl PreferenceGate {
    pub fn new(users: Arc<dyn UserDirectory>) -> Self {
        Self { users }
    }

    /// `true` only when the flag is stored and set. Unknown users and unset
    /// flags are opted out.
    pub async fn allows(&self, user_id: Uuid) -> anyhow::Result<bool> {
        Ok(self.users.notifications_enabled(user_id).await? == Some(true))
    }
}
