//! Live subscriber: standing change listeners on the three data paths
//!
//! Each path gets its own listener task. The three listeners fire
//! independently and in no particular order relative to each other; each one
//! touches only its own display fields.

use std::sync::Arc;

use serde_json::Value;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::store::{RealtimeStore, LAST_UPDATE_PATH, LOCATION_PATH, MATERIALS_PATH};
use crate::view::{MaterialCounts, ViewHandle};

/// Owns the three process-lifetime subscriptions
pub struct Subscriber {
    store: Arc<dyn RealtimeStore>,
    view: ViewHandle,
    cancel: CancellationToken,
}

impl Subscriber {
    pub fn new(store: Arc<dyn RealtimeStore>, view: ViewHandle, cancel: CancellationToken) -> Self {
        Self { store, view, cancel }
    }

    /// Open the three subscriptions and run one listener per path.
    /// Returns when the cancellation token is triggered.
    pub async fn run(&self) {
        let location_rx = self
            .store
            .subscribe(LOCATION_PATH, self.cancel.child_token())
            .await;
        let timestamp_rx = self
            .store
            .subscribe(LAST_UPDATE_PATH, self.cancel.child_token())
            .await;
        let materials_rx = self
            .store
            .subscribe(MATERIALS_PATH, self.cancel.child_token())
            .await;

        let handles = [
            tokio::spawn(location_listener(location_rx, Arc::clone(&self.view))),
            tokio::spawn(timestamp_listener(timestamp_rx, Arc::clone(&self.view))),
            tokio::spawn(materials_listener(materials_rx, Arc::clone(&self.view))),
        ];

        self.cancel.cancelled().await;

        // Cancelled subscriptions close their channels, draining the listeners
        for handle in handles {
            let _ = handle.await;
        }
    }
}

/// Forward location changes to the display. Null or non-string values read
/// as the starting checkpoint.
pub(crate) async fn location_listener(mut rx: mpsc::Receiver<Value>, view: ViewHandle) {
    while let Some(value) = rx.recv().await {
        let location = value.as_str().unwrap_or("Start").to_string();
        tracing::debug!("currentLocation changed to '{}'", location);
        view.write().await.show_location(&location);
    }
}

/// Forward timestamp changes to the display. Non-integer values read as
/// absent.
pub(crate) async fn timestamp_listener(mut rx: mpsc::Receiver<Value>, view: ViewHandle) {
    while let Some(value) = rx.recv().await {
        let timestamp_ms = value.as_i64();
        tracing::debug!("lastUpdate changed to {:?}", timestamp_ms);
        view.write().await.show_timestamp(timestamp_ms);
    }
}

/// Forward material-count changes to the display, defaulting each field
/// independently.
pub(crate) async fn materials_listener(mut rx: mpsc::Receiver<Value>, view: ViewHandle) {
    while let Some(value) = rx.recv().await {
        let counts = MaterialCounts::from_value(&value);
        tracing::debug!("detectedMaterials changed to {:?}", counts);
        view.write().await.show_materials(counts);
    }
}
