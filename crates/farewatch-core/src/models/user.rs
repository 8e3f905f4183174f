use serde::{Deserialize, Serialize};

/// The authenticated user, as persisted under the `userData` key.
///
/// Never mutated in place: a new login replaces the whole profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: i64,
    pub email: String,
}

impl UserProfile {
    pub fn new(id: i64, email: impl Into<String>) -> Self {
        Self {
            id,
            email: email.into(),
        }
    }
}
