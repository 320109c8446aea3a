use crate::models::lifecycle::Lifecycle;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The few passenger fields the booking engine reads. Passengers are owned elsewhere.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Passenger {
    pub id: Uuid,
    pub name: String,
    pub document: Option<String>,
    pub minor: bool,
    pub lifecycle: Lifecycle,
}

impl Passenger {
    pub fn new(name: String, document: Option<String>, minor: bool) -> Self {
        Self {
            id: Uuid::new_v4(),
            name,
            document,
            minor,
            lifecycle: Lifecycle::Active,
        }
    }
}
