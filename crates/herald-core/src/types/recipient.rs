//! Recipient identity: exactly one of a user or an admin.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// Discriminant of a [`Recipient`], as persisted in `recipient_type` columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecipientType {
    /// A regular application user.
    User,
    /// An administrator.
    Admin,
}

impl RecipientType {
    /// Return the type as a lowercase string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Admin => "admin",
        }
    }
}

impl fmt::Display for RecipientType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RecipientType {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "user" => Ok(Self::User),
            "admin" => Ok(Self::Admin),
            other => Err(AppError::validation(format!(
                "Unknown recipient type: '{other}'"
            ))),
        }
    }
}

/// The owner of notifications, preferences, and live connections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "id", rename_all = "lowercase")]
pub enum Recipient {
    /// A user, by numeric id.
    User(i64),
    /// An admin, by numeric id.
    Admin(i64),
}

impl Recipient {
    /// Build a recipient from its persisted `(recipient_type, recipient_id)` pair.
    pub fn from_parts(recipient_type: &str, id: i64) -> Result<Self, AppError> {
        if id <= 0 {
            return Err(AppError::validation(format!(
                "Recipient id must be positive, got {id}"
            )));
        }
        Ok(match recipient_type.parse::<RecipientType>()? {
            RecipientType::User => Self::User(id),
            RecipientType::Admin => Self::Admin(id),
        })
    }

    /// The recipient's discriminant.
    pub fn recipient_type(&self) -> RecipientType {
        match self {
            Self::User(_) => RecipientType::User,
            Self::Admin(_) => RecipientType::Admin,
        }
    }

    /// The numeric id within the recipient's namespace.
    pub fn id(&self) -> i64 {
        match self {
            Self::User(id) | Self::Admin(id) => *id,
        }
    }

    /// Registry key of the recipient's live connection: `user-{id}` / `admin-{id}`.
    pub fn client_key(&self) -> String {
        format!("{}-{}", self.recipient_type().as_str(), self.id())
    }

    /// Whether this recipient is a user.
    pub fn is_user(&self) -> bool {
        matches!(self, Self::User(_))
    }

    /// Whether this recipient is an admin.
    pub fn is_admin(&self) -> bool {
        matches!(self, Self::Admin(_))
    }
}

impl fmt::Display for Recipient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.client_key())
    }
}
