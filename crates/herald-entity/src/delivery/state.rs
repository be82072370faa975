//! Delivery item state machine.
//!
//! ```text
//! queued  -> sending
//! sending -> delivered | failed
//! failed  -> queued | dead_letter
//! ```
//!
//! `delivered` and `dead_letter` are terminal.

use std::fmt;
use std::str::FromStr;

use herald_core::AppError;
use serde::{Deserialize, Serialize};

/// State of a delivery item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryState {
    /// Waiting for a worker.
    Queued,
    /// Claimed by a worker; a send is in flight.
    Sending,
    /// Sent successfully.
    Delivered,
    /// The last send failed; about to be requeued or dead-lettered.
    Failed,
    /// Retries exhausted.
    DeadLetter,
}

impl DeliveryState {
    /// All states, in state machine order.
    pub const ALL: [DeliveryState; 5] = [
        Self::Queued,
        Self::Sending,
        Self::Delivered,
        Self::Failed,
        Self::DeadLetter,
    ];

    /// Check if the state is terminal.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Delivered | Self::DeadLetter)
    }

    /// Whether `self -> next` is an edge of the state machine.
    pub fn can_transition_to(&self, next: DeliveryState) -> bool {
        matches!(
            (self, next),
            (Self::Queued, Self::Sending)
                | (Self::Sending, Self::Delivered)
                | (Self::Sending, Self::Failed)
                | (Self::Failed, Self::Queued)
                | (Self::Failed, Self::DeadLetter)
        )
    }

    /// Return the state as a snake_case string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Queued => "queued",
            Self::Sending => "sending",
            Self::Delivered => "delivered",
            Self::Failed => "failed",
            Self::DeadLetter => "dead_letter",
        }
    }
}

impl fmt::Display for DeliveryState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DeliveryState {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|st| st.as_str() == s)
            .ok_or_else(|| AppError::validation(format!("Unknown delivery state: '{s}'")))
    }
}
