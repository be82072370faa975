//! Notification kind, severity, and display mode enumerations.

use std::fmt;
use std::str::FromStr;

use herald_core::AppError;
use serde::{Deserialize, Serialize};

/// What a notification is about, as chosen by the producer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
    /// An operation completed.
    Success,
    /// Informational.
    Info,
    /// Something needs attention.
    Warning,
    /// An operation failed.
    Error,
    /// Security-relevant event (login, credential change, ...).
    Security,
}

impl NotificationKind {
    /// All kinds, in declaration order.
    pub const ALL: [NotificationKind; 5] = [
        Self::Success,
        Self::Info,
        Self::Warning,
        Self::Error,
        Self::Security,
    ];

    /// Severity used for routing decisions.
    pub fn severity(&self) -> Severity {
        match self {
            Self::Success => Severity::Success,
            Self::Info => Severity::Info,
            Self::Warning => Severity::Warning,
            Self::Error => Severity::Error,
            Self::Security => Severity::Critical,
        }
    }

    /// Return the kind as a lowercase string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Info => "info",
            Self::Warning => "warning",
            Self::Error => "error",
            Self::Security => "security",
        }
    }
}

impl fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NotificationKind {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| AppError::validation(format!("Unknown notification kind: '{s}'")))
    }
}

/// Routing severity, derived from [`NotificationKind`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Informational.
    Info,
    /// Positive outcome.
    Success,
    /// Needs attention.
    Warning,
    /// Failure.
    Error,
    /// Security or otherwise critical.
    Critical,
}

impl Severity {
    /// Error and critical events are always sent out of band as well.
    pub fn is_urgent(&self) -> bool {
        matches!(self, Self::Error | Self::Critical)
    }

    /// Return the severity as a lowercase string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Success => "success",
            Self::Warning => "warning",
            Self::Error => "error",
            Self::Critical => "critical",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Rendering hint for the recipient's client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DisplayMode {
    /// Transient popup.
    Toast,
    /// Persistent page banner.
    Banner,
    /// Notification center only.
    Center,
}

impl DisplayMode {
    /// All display modes, in declaration order.
    pub const ALL: [DisplayMode; 3] = [Self::Toast, Self::Banner, Self::Center];

    /// Return the mode as a lowercase string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Toast => "toast",
            Self::Banner => "banner",
            Self::Center => "center",
        }
    }
}

impl fmt::Display for DisplayMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DisplayMode {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|m| m.as_str() == s)
            .ok_or_else(|| AppError::validation(format!("Unknown display mode: '{s}'")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_security_is_critical() {
        assert_eq!(NotificationKind::Security.severity(), Severity::Critical);
        assert!(NotificationKind::Security.severity().is_urgent());
        assert!(NotificationKind::Error.severity().is_urgent());
        assert!(!NotificationKind::Warning.severity().is_urgent());
    }

    #[test]
    fn test_parse_kind_and_mode() {
        assert_eq!(
            "success".parse::<NotificationKind>().unwrap(),
            NotificationKind::Success
        );
        assert!("fatal".parse::<NotificationKind>().is_err());
        assert_eq!("banner".parse::<DisplayMode>().unwrap(), DisplayMode::Banner);
    }
}
