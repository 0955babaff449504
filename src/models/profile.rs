use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The authenticated user as returned by the profile endpoint.
/// Always replaced wholesale, never patched.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Profile {
    pub id: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    /// RFC 3339 timestamp, kept as sent by the server.
    pub created_at: String,
}

impl Profile {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
            .trim()
            .to_string()
    }

    /// `created_at` as a UTC timestamp, if the server sent a valid one.
    pub fn joined_at(&self) -> Option<DateTime<Utc>> {
        DateTime::parse_from_rfc3339(&self.created_at)
            .ok()
            .map(|at| at.with_timezone(&Utc))
    }
}
