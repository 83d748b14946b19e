//! Web dashboard: server-rendered page, JSON view API, and test controls

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use tower_http::cors::CorsLayer;

use crate::panel::{self, MaterialsForm};
use crate::store::RealtimeStore;
use crate::view::{Location, ViewHandle};

/// Dashboard application state
#[derive(Clone)]
pub struct DashboardState {
    pub view: ViewHandle,
    pub store: Arc<dyn RealtimeStore>,
}

/// Build the dashboard axum router
pub fn build_router(view: ViewHandle, store: Arc<dyn RealtimeStore>) -> Router {
    let state = DashboardState { view, store };

    Router::new()
        .route("/", get(index_handler))
        .route("/api/view", get(view_handler))
        .route("/api/test/location", post(location_handler))
        .route("/api/test/materials", post(materials_handler))
        .route("/health", get(health_handler))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn view_handler(State(dashboard): State<DashboardState>) -> impl IntoResponse {
    let view = dashboard.view.read().await;

    Json(serde_json::json!({
        "location": {
            "text": view.location_text,
            "marker": view.active_marker.map(|l| l.marker_id()),
            "indicator": view.active_marker.map(|l| l.indicator_id()),
        },
        "lastUpdate": view.last_update_text,
        "counts": view.counts,
        "charts": view.charts.as_ref().map(|c| serde_json::json!({
            "materials": c.materials,
            "distribution": c.distribution,
        })),
    }))
}

#[derive(Debug, Deserialize)]
struct LocationRequest {
    location: String,
}

async fn location_handler(
    State(dashboard): State<DashboardState>,
    Json(request): Json<LocationRequest>,
) -> StatusCode {
    let Some(location) = Location::parse(&request.location) else {
        tracing::debug!("Rejected unknown test location '{}'", request.location);
        return StatusCode::BAD_REQUEST;
    };

    // Fire and forget: the display only changes via the database round trip
    if let Err(e) = panel::set_location(&dashboard.store, location).await {
        tracing::warn!("Test location write failed: {}", e);
    }
    StatusCode::ACCEPTED
}

async fn materials_handler(
    State(dashboard): State<DashboardState>,
    Json(form): Json<MaterialsForm>,
) -> StatusCode {
    if let Err(e) = panel::update_materials(&dashboard.store, &form).await {
        tracing::warn!("Test materials write failed: {}", e);
    }
    StatusCode::ACCEPTED
}

async fn health_handler() -> impl IntoResponse {
    "OK"
}

async fn index_handler(State(dashboard): State<DashboardState>) -> impl IntoResponse {
    let view = dashboard.view.read().await;

    let marker_class = |location: Location| {
        if view.marker_active(location) {
            "marker active"
        } else {
            "marker"
        }
    };
    let indicator_class = |location: Location| {
        if view.indicator_visible(location) {
            "indicator"
        } else {
            "indicator hidden"
        }
    };

    let html = format!(
        r#"<!DOCTYPE html>
<html>
<head>
    <meta charset="utf-8">
    <meta name="viewport" content="width=device-width, initial-scale=1">
    <title>Tallyboard</title>
    <style>
        body {{ font-family: system-ui, sans-serif; max-width: 960px; margin: 0 auto; padding: 1rem; }}
        .counts {{ display: flex; gap: 1rem; }}
        .counts div {{ flex: 1; padding: 0.5rem; border: 1px solid #dee2e6; border-radius: 0.25rem; text-align: center; }}
        .map {{ display: flex; gap: 2rem; margin: 1rem 0; }}
        .marker {{ width: 4rem; height: 4rem; border-radius: 50%; background: #cfe2ff; display: flex; align-items: center; justify-content: center; position: relative; }}
        .marker.active {{ background: #d1e7dd; border: 2px solid #198754; }}
        .indicator {{ display: inline-block; padding: 0.25em 0.6em; border-radius: 0.25rem; font-size: 0.85em; font-weight: 600; color: #0f5132; background-color: #d1e7dd; }}
        .hidden {{ display: none; }}
        .charts {{ display: flex; gap: 1rem; }}
        .charts div {{ flex: 1; height: 260px; }}
        input {{ width: 5rem; }}
    </style>
</head>
<body>
    <h1>Tallyboard</h1>
    <p>Current time: <span id="current-time">-</span></p>
    <section>
        <h2>Location</h2>
        <p>Current location: <strong id="current-location">{location_text}</strong></p>
        <p>Last update: <span id="last-update">{last_update}</span></p>
        <div class="map">
            <div id="start-point" class="{start_marker}">S</div>
            <div id="building-a" class="{a_marker}">A</div>
            <div id="building-b" class="{b_marker}">B</div>
            <div id="building-c" class="{c_marker}">C</div>
        </div>
        <p>
            <span id="start-indicator" class="{start_indicator}">At Start</span>
            <span id="a-indicator" class="{a_indicator}">At Building A</span>
            <span id="b-indicator" class="{b_indicator}">At Building B</span>
            <span id="c-indicator" class="{c_indicator}">At Building C</span>
        </p>
    </section>
    <section>
        <h2>Materials</h2>
        <div class="counts">
            <div>Dispatch Ready<br><strong id="dispatch-count">{dispatch}</strong></div>
            <div>Damaged Items<br><strong id="damaged-count">{damaged}</strong></div>
            <div>eWaste<br><strong id="ewaste-count">{ewaste}</strong></div>
            <div>Raw Materials<br><strong id="raw-count">{raw}</strong></div>
        </div>
        <div class="charts">
            <div><canvas id="materials-chart"></canvas></div>
            <div><canvas id="distribution-chart"></canvas></div>
        </div>
    </section>
    <section>
        <h2>Test Controls</h2>
        <p>
            <button id="loc-start" onclick="setLocation('Start')">Start</button>
            <button id="loc-a" onclick="setLocation('Building A')">Building A</button>
            <button id="loc-b" onclick="setLocation('Building B')">Building B</button>
            <button id="loc-c" onclick="setLocation('Building C')">Building C</button>
        </p>
        <p>
            <label>Dispatch <input id="test-dispatch" type="number" min="0" value="0"></label>
            <label>Damaged <input id="test-damaged" type="number" min="0" value="0"></label>
            <label>eWaste <input id="test-ewaste" type="number" min="0" value="0"></label>
            <label>Raw <input id="test-raw" type="number" min="0" value="0"></label>
            <button id="update-materials" onclick="updateMaterials()">Update Materials</button>
        </p>
    </section>
    <script src="https://cdn.jsdelivr.net/npm/chart.js"></script>
    <script>{script}</script>
</body>
</html>"#,
        location_text = view.location_text,
        last_update = view.last_update_text,
        dispatch = view.counts.dispatch_ready,
        damaged = view.counts.damaged,
        ewaste = view.counts.e_waste,
        raw = view.counts.raw_materials,
        start_marker = marker_class(Location::Start),
        a_marker = marker_class(Location::BuildingA),
        b_marker = marker_class(Location::BuildingB),
        c_marker = marker_class(Location::BuildingC),
        start_indicator = indicator_class(Location::Start),
        a_indicator = indicator_class(Location::BuildingA),
        b_indicator = indicator_class(Location::BuildingB),
        c_indicator = indicator_class(Location::BuildingC),
        script = PAGE_SCRIPT,
    );

    Html(html)
}

/// Page script: polls the view API, repaints DOM and charts, and wires the
/// test control buttons. Passed as a format argument so its braces stay
/// literal.
const PAGE_SCRIPT: &str = r#"
const MARKERS = ['start-point', 'building-a', 'building-b', 'building-c'];
const INDICATORS = ['start-indicator', 'a-indicator', 'b-indicator', 'c-indicator'];
const LABELS = ['Dispatch Ready', 'Damaged Items', 'eWaste', 'Raw Materials'];
const COLORS = [
    'rgba(72, 187, 120, 0.7)',
    'rgba(237, 100, 100, 0.7)',
    'rgba(159, 122, 234, 0.7)',
    'rgba(66, 153, 225, 0.7)'
];
let materialsChart;
let distributionChart;

function initCharts() {
    materialsChart = new Chart(document.getElementById('materials-chart'), {
        type: 'bar',
        data: { labels: LABELS, datasets: [{ label: 'Count', data: [0, 0, 0, 0], backgroundColor: COLORS }] },
        options: {
            scales: { y: { beginAtZero: true, ticks: { precision: 0 } } },
            responsive: true,
            maintainAspectRatio: false
        }
    });
    distributionChart = new Chart(document.getElementById('distribution-chart'), {
        type: 'pie',
        data: { labels: LABELS, datasets: [{ data: [0, 0, 0, 0], backgroundColor: COLORS }] },
        options: { responsive: true, maintainAspectRatio: false }
    });
}

function refreshView() {
    fetch('/api/view')
        .then(r => r.json())
        .then(data => {
            document.getElementById('current-location').textContent = data.location.text;
            document.getElementById('last-update').textContent = data.lastUpdate;

            MARKERS.forEach(id => document.getElementById(id).classList.remove('active'));
            INDICATORS.forEach(id => document.getElementById(id).classList.add('hidden'));
            if (data.location.marker) {
                document.getElementById(data.location.marker).classList.add('active');
            }
            if (data.location.indicator) {
                document.getElementById(data.location.indicator).classList.remove('hidden');
            }

            document.getElementById('dispatch-count').textContent = data.counts.dispatchReady;
            document.getElementById('damaged-count').textContent = data.counts.damaged;
            document.getElementById('ewaste-count').textContent = data.counts.eWaste;
            document.getElementById('raw-count').textContent = data.counts.rawMaterials;

            if (data.charts && materialsChart && distributionChart) {
                materialsChart.data.datasets[0].data = data.charts.materials;
                materialsChart.update();
                distributionChart.data.datasets[0].data = data.charts.distribution;
                distributionChart.update();
            }
        });
}

function updateCurrentTime() {
    document.getElementById('current-time').textContent = new Date().toLocaleTimeString();
}

function setLocation(location) {
    fetch('/api/test/location', {
        method: 'POST',
        headers: { 'Content-Type': 'application/json' },
        body: JSON.stringify({ location })
    });
}

function updateMaterials() {
    fetch('/api/test/materials', {
        method: 'POST',
        headers: { 'Content-Type': 'application/json' },
        body: JSON.stringify({
            dispatchReady: document.getElementById('test-dispatch').value,
            damaged: document.getElementById('test-damaged').value,
            eWaste: document.getElementById('test-ewaste').value,
            rawMaterials: document.getElementById('test-raw').value
        })
    });
}

initCharts();
refreshView();
updateCurrentTime();
setInterval(refreshView, 1000);
setInterval(updateCurrentTime, 1000);
"#;

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use tower::ServiceExt;

    use crate::store::{MockRealtimeStore, LAST_UPDATE_PATH, LOCATION_PATH, MATERIALS_PATH};
    use crate::view::{new_view_handle, MaterialCounts};

    fn router_with(view: ViewHandle, store: MockRealtimeStore) -> Router {
        build_router(view, Arc::new(store))
    }

    fn get_request(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    fn post_json(uri: &str, body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn health_returns_ok() {
        let app = router_with(new_view_handle(), MockRealtimeStore::new());
        let response = app.oneshot(get_request("/health")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn view_reflects_display_state() {
        let view = new_view_handle();
        {
            let mut v = view.write().await;
            v.init_charts();
            v.show_location("Building A");
            v.show_materials(MaterialCounts {
                dispatch_ready: 5,
                damaged: 2,
                e_waste: 0,
                raw_materials: 3,
            });
        }
        let app = router_with(view, MockRealtimeStore::new());
        let response = app.oneshot(get_request("/api/view")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["location"]["text"], "Building A");
        assert_eq!(json["location"]["marker"], "building-a");
        assert_eq!(json["location"]["indicator"], "a-indicator");
        assert_eq!(json["lastUpdate"], "-");
        assert_eq!(json["counts"]["dispatchReady"], 5);
        assert_eq!(json["charts"]["materials"], serde_json::json!([5, 2, 0, 3]));
        assert_eq!(
            json["charts"]["distribution"],
            serde_json::json!([5, 2, 0, 3])
        );
    }

    #[tokio::test]
    async fn view_charts_null_before_construction() {
        let app = router_with(new_view_handle(), MockRealtimeStore::new());
        let response = app.oneshot(get_request("/api/view")).await.unwrap();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert!(json["charts"].is_null());
        assert_eq!(json["location"]["marker"], serde_json::Value::Null);
    }

    #[tokio::test]
    async fn index_carries_the_element_contract() {
        let app = router_with(new_view_handle(), MockRealtimeStore::new());
        let response = app.oneshot(get_request("/")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let html = String::from_utf8(body.to_vec()).unwrap();
        for id in [
            "current-location",
            "last-update",
            "dispatch-count",
            "damaged-count",
            "ewaste-count",
            "raw-count",
            "current-time",
            "start-point",
            "building-a",
            "building-b",
            "building-c",
            "start-indicator",
            "a-indicator",
            "b-indicator",
            "c-indicator",
            "materials-chart",
            "distribution-chart",
            "test-dispatch",
            "test-damaged",
            "test-ewaste",
            "test-raw",
            "loc-start",
            "loc-a",
            "loc-b",
            "loc-c",
            "update-materials",
        ] {
            assert!(html.contains(&format!("id=\"{}\"", id)), "missing #{}", id);
        }
    }

    #[tokio::test]
    async fn index_renders_active_location() {
        let view = new_view_handle();
        view.write().await.show_location("Building B");
        let app = router_with(view, MockRealtimeStore::new());
        let response = app.oneshot(get_request("/")).await.unwrap();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let html = String::from_utf8(body.to_vec()).unwrap();

        assert!(html.contains(r#"<strong id="current-location">Building B</strong>"#));
        assert!(html.contains(r#"id="building-b" class="marker active""#));
        assert!(html.contains(r#"id="building-a" class="marker""#));
        assert!(html.contains(r#"id="b-indicator" class="indicator""#));
        assert!(html.contains(r#"id="a-indicator" class="indicator hidden""#));
    }

    #[tokio::test]
    async fn post_location_writes_through_the_store() {
        let mut store = MockRealtimeStore::new();
        store
            .expect_set()
            .withf(|path, value| path == LOCATION_PATH && *value == serde_json::json!("Building A"))
            .times(1)
            .returning(|_, _| Box::pin(async { Ok(()) }));
        store
            .expect_set()
            .withf(|path, _| path == LAST_UPDATE_PATH)
            .times(1)
            .returning(|_, _| Box::pin(async { Ok(()) }));

        let app = router_with(new_view_handle(), store);
        let response = app
            .oneshot(post_json(
                "/api/test/location",
                r#"{"location": "Building A"}"#,
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::ACCEPTED);
    }

    #[tokio::test]
    async fn post_unknown_location_is_rejected() {
        let mut store = MockRealtimeStore::new();
        store.expect_set().never();

        let app = router_with(new_view_handle(), store);
        let response = app
            .oneshot(post_json(
                "/api/test/location",
                r#"{"location": "Warehouse 9"}"#,
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn post_materials_parses_with_zero_fallback() {
        let mut store = MockRealtimeStore::new();
        store
            .expect_set()
            .withf(|path, value| {
                path == MATERIALS_PATH
                    && *value
                        == serde_json::json!({
                            "dispatchReady": 5,
                            "damaged": 0,
                            "eWaste": 2,
                            "rawMaterials": 0
                        })
            })
            .times(1)
            .returning(|_, _| Box::pin(async { Ok(()) }));
        store
            .expect_set()
            .withf(|path, _| path == LAST_UPDATE_PATH)
            .times(1)
            .returning(|_, _| Box::pin(async { Ok(()) }));

        let app = router_with(new_view_handle(), store);
        let response = app
            .oneshot(post_json(
                "/api/test/materials",
                r#"{"dispatchReady": "5", "damaged": "junk", "eWaste": "2"}"#,
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::ACCEPTED);
    }

    #[tokio::test]
    async fn post_is_fire_and_forget_on_store_failure() {
        let mut store = MockRealtimeStore::new();
        store.expect_set().returning(|_, _| {
            Box::pin(async { Err(crate::TallyboardError::Store("offline".to_string())) })
        });

        let app = router_with(new_view_handle(), store);
        let response = app
            .oneshot(post_json("/api/test/location", r#"{"location": "Start"}"#))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::ACCEPTED);
    }
}
