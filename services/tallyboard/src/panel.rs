//! Test control writers
//!
//! Pushes hand-entered or constant values back into the database paths the
//! subscriber listens on. The display only changes via the round trip
//! through the database.

use std::sync::Arc;

use serde::Deserialize;
use serde_json::Value;

use crate::store::{server_timestamp, RealtimeStore, LAST_UPDATE_PATH, LOCATION_PATH, MATERIALS_PATH};
use crate::view::{Location, MaterialCounts};

/// Raw numeric form fields from the dashboard's test inputs
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MaterialsForm {
    pub dispatch_ready: String,
    pub damaged: String,
    pub e_waste: String,
    pub raw_materials: String,
}

impl MaterialsForm {
    /// Parse the form into counts, falling back to 0 on any parse failure
    pub fn to_counts(&self) -> MaterialCounts {
        MaterialCounts {
            dispatch_ready: parse_count(&self.dispatch_ready),
            damaged: parse_count(&self.damaged),
            e_waste: parse_count(&self.e_waste),
            raw_materials: parse_count(&self.raw_materials),
        }
    }
}

/// Parse a numeric test input, falling back to 0
pub fn parse_count(raw: &str) -> u64 {
    raw.trim().parse().unwrap_or(0)
}

/// Write a literal location string plus a fresh server timestamp
pub async fn set_location(store: &Arc<dyn RealtimeStore>, location: Location) -> crate::Result<()> {
    store
        .set(LOCATION_PATH, &Value::String(location.as_str().to_string()))
        .await?;
    store.set(LAST_UPDATE_PATH, &server_timestamp()).await
}

/// Write the whole materials record plus a fresh server timestamp
pub async fn update_materials(
    store: &Arc<dyn RealtimeStore>,
    form: &MaterialsForm,
) -> crate::Result<()> {
    let counts = form.to_counts();
    store
        .set(MATERIALS_PATH, &serde_json::to_value(counts)?)
        .await?;
    store.set(LAST_UPDATE_PATH, &server_timestamp()).await
}
