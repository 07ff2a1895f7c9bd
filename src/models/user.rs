//! User-related models

use serde::{Deserialize, Serialize};

/// A person on either side of a conversation.
///
/// The operator's own identity and every roster entry share this shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(alias = "_id")]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub avatar: Option<String>,
}

impl User {
    /// Name to show in lists and headers; falls back to email, then id.
    pub fn display_name(&self) -> &str {
        if !self.name.trim().is_empty() {
            &self.name
        } else if !self.email.trim().is_empty() {
            &self.email
        } else {
            &self.id
        }
    }
}
