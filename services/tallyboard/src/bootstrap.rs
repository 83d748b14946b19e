//! One-time seeding of an empty data tree

use std::sync::Arc;

use crate::store::{server_timestamp, RealtimeStore, ROOT_PATH};
use crate::view::MaterialCounts;

/// The document written to an empty data tree
pub fn default_document() -> crate::Result<serde_json::Value> {
    Ok(serde_json::json!({
        "currentLocation": "Start",
        "lastUpdate": server_timestamp(),
        "detectedMaterials": serde_json::to_value(MaterialCounts::default())?,
    }))
}

/// Seed the default document if the data tree is entirely empty.
///
/// Uses the store's atomic create-if-absent, so two instances racing the
/// same empty tree write at most one document between them. Returns whether
/// this call did the seeding.
pub async fn seed_if_empty(store: &Arc<dyn RealtimeStore>) -> crate::Result<bool> {
    let document = default_document()?;
    let seeded = store.create_if_absent(ROOT_PATH, &document).await?;
    if seeded {
        tracing::info!("Seeded empty data tree with default document");
    } else {
        tracing::debug!("Data tree already populated, no seed written");
    }
    Ok(seeded)
}
