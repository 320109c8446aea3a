use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Soft-delete state shared by layouts, vehicles, trips and passengers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(tag = "state", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Lifecycle {
    #[default]
    Active,
    Inactive { since: DateTime<Utc> },
}

impl Lifecycle {
    pub fn is_active(&self) -> bool {
        matches!(self, Lifecycle::Active)
    }

    /// Mark as inactive. Deactivating twice keeps the first timestamp.
    pub fn deactivate(&mut self, at: DateTime<Utc>) -> bool {
        match self {
            Lifecycle::Active => {
                *self = Lifecycle::Inactive { since: at };
                true
            }
            Lifecycle::Inactive { .. } => false,
        }
    }
}
