use crate::models::lifecycle::Lifecycle;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vehicle {
    pub id: Uuid,
    pub identifier: String,
    pub plate: String,
    pub company: String,
    pub layout_id: Option<Uuid>,
    pub lifecycle: Lifecycle,
    pub version: u64,
}

impl Vehicle {
    pub fn new(identifier: String, plate: String, company: String, layout_id: Option<Uuid>) -> Self {
        Self {
            id: Uuid::new_v4(),
            identifier,
            plate,
            company,
            layout_id,
            lifecycle: Lifecycle::Active,
            version: 0,
        }
    }

    /// Plate key used for uniqueness: uppercase, without spaces or dashes
    pub fn plate_key(&self) -> String {
        normalize_plate(&self.plate)
    }
}

pub fn normalize_plate(plate: &str) -> String {
    plate
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '-')
        .flat_map(char::to_uppercase)
        .collect()
}
