//! Tallyboard - live sorting and dispatch dashboard
//!
//! Subscribes to a realtime database and serves a browser dashboard showing
//! the sorting process's current location and material counts, with manual
//! test controls that write back through the same database.

pub mod bootstrap;
pub mod config;
pub mod dashboard;
pub mod error;
pub mod io;
pub mod panel;
pub mod store;
pub mod subscriber;
pub mod view;

pub use config::{load_config, Config};
pub use error::{Result, TallyboardError};

use std::net::SocketAddr;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::io::ReqwestHttpClient;
use crate::store::{RealtimeStore, RestStore};
use crate::subscriber::Subscriber;

/// Run the tallyboard service with the given configuration
pub async fn run(config: Config) -> Result<()> {
    let http: Arc<dyn io::HttpClient> = Arc::new(ReqwestHttpClient::default());
    let store: Arc<dyn RealtimeStore> = Arc::new(RestStore::new(&config.database, http));
    let cancel = CancellationToken::new();

    // Seed an empty data tree; a failure here means a stale display at
    // worst, so the service keeps starting
    if config.bootstrap.seed {
        if let Err(e) = bootstrap::seed_if_empty(&store).await {
            tracing::warn!("Bootstrap seed failed: {}. Continuing without seed.", e);
        }
    }

    // Build the display state and construct the charts before any
    // subscription can deliver a change
    let view = view::new_view_handle();
    view.write().await.init_charts();

    let subscriber = Subscriber::new(Arc::clone(&store), Arc::clone(&view), cancel.clone());

    // Setup shutdown handler
    let cancel_for_signal = cancel.clone();
    tokio::spawn(async move {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to listen for ctrl-c");
        tracing::info!("Shutdown signal received");
        cancel_for_signal.cancel();
    });

    // Start dashboard if enabled
    if config.dashboard.enabled {
        let dashboard_port = config.dashboard.port;
        let dashboard_view = Arc::clone(&view);
        let dashboard_store = Arc::clone(&store);
        let cancel_for_dashboard = cancel.clone();

        tokio::spawn(async move {
            let router = dashboard::build_router(dashboard_view, dashboard_store);
            let addr = SocketAddr::from(([0, 0, 0, 0], dashboard_port));
            tracing::info!("Dashboard listening on http://{}", addr);

            let listener = match tokio::net::TcpListener::bind(addr).await {
                Ok(l) => l,
                Err(e) => {
                    tracing::error!(
                        "Failed to bind dashboard to port {}: {}. Continuing without dashboard.",
                        dashboard_port,
                        e
                    );
                    return;
                }
            };

            axum::serve(listener, router)
                .with_graceful_shutdown(async move {
                    cancel_for_dashboard.cancelled().await;
                })
                .await
                .ok();

            tracing::debug!("Dashboard stopped");
        });
    }

    tracing::info!("Tallyboard subscriber started");

    // Run the subscriber (blocks until cancelled)
    subscriber.run().await;

    tracing::info!("Tallyboard stopped");

    Ok(())
}
