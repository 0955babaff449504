use serde::{Deserialize, Serialize};

/// Credentials handed out by the login and refresh endpoints.
///
/// Both fields are optional: cookie-based deployments return no tokens in
/// the body and rely on the HTTP client's cookie jar instead.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
#[serde(default)]
pub struct TokenSet {
    pub access: Option<String>,
    pub refresh: Option<String>,
}

impl TokenSet {
    pub fn is_empty(&self) -> bool {
        self.access.is_none() && self.refresh.is_none()
    }

    /// Fold a refresh response into the current set. A refresh usually only
    /// rotates the access token, so a missing refresh token keeps the old one.
    pub fn merge(&mut self, newer: TokenSet) {
        if newer.access.is_some() {
            self.access = newer.access;
        }
        if newer.refresh.is_some() {
            self.refresh = newer.refresh;
        }
    }
}
