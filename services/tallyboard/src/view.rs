//! Display model: projects database values into the rendered dashboard state

use std::fmt;
use std::sync::Arc;

use chrono::{Local, TimeZone};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

/// A checkpoint location of the sorting process
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Location {
    Start,
    BuildingA,
    BuildingB,
    BuildingC,
}

impl Location {
    pub const ALL: [Location; 4] = [
        Location::Start,
        Location::BuildingA,
        Location::BuildingB,
        Location::BuildingC,
    ];

    /// Parse a wire-format location string
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "Start" => Some(Location::Start),
            "Building A" => Some(Location::BuildingA),
            "Building B" => Some(Location::BuildingB),
            "Building C" => Some(Location::BuildingC),
            _ => None,
        }
    }

    /// Wire-format location string
    pub fn as_str(&self) -> &'static str {
        match self {
            Location::Start => "Start",
            Location::BuildingA => "Building A",
            Location::BuildingB => "Building B",
            Location::BuildingC => "Building C",
        }
    }

    /// Element id of this location's map marker
    pub fn marker_id(&self) -> &'static str {
        match self {
            Location::Start => "start-point",
            Location::BuildingA => "building-a",
            Location::BuildingB => "building-b",
            Location::BuildingC => "building-c",
        }
    }

    /// Element id of this location's indicator badge
    pub fn indicator_id(&self) -> &'static str {
        match self {
            Location::Start => "start-indicator",
            Location::BuildingA => "a-indicator",
            Location::BuildingB => "b-indicator",
            Location::BuildingC => "c-indicator",
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The four material tallies produced by the sorting process.
///
/// Wire format is camelCase; any field absent from a network value reads
/// as zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MaterialCounts {
    pub dispatch_ready: u64,
    pub damaged: u64,
    pub e_waste: u64,
    pub raw_materials: u64,
}

impl MaterialCounts {
    /// Read counts from a raw database value, field by field. Absent or
    /// non-integer fields read as zero.
    pub fn from_value(value: &serde_json::Value) -> Self {
        fn field(value: &serde_json::Value, name: &str) -> u64 {
            value
                .get(name)
                .and_then(serde_json::Value::as_u64)
                .unwrap_or(0)
        }
        Self {
            dispatch_ready: field(value, "dispatchReady"),
            damaged: field(value, "damaged"),
            e_waste: field(value, "eWaste"),
            raw_materials: field(value, "rawMaterials"),
        }
    }

    /// Chart series order: dispatchReady, damaged, eWaste, rawMaterials
    pub fn as_series(&self) -> [u64; 4] {
        [
            self.dispatch_ready,
            self.damaged,
            self.e_waste,
            self.raw_materials,
        ]
    }
}

/// Datasets of the two charts, recomputed from the cached counts
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChartState {
    /// Bar chart series
    pub materials: [u64; 4],
    /// Pie chart series
    pub distribution: [u64; 4],
}

/// The rendered dashboard state.
///
/// Owns everything the page displays: location text plus the active marker,
/// the last-update text, the cached material counts, and the chart datasets.
#[derive(Debug)]
pub struct DisplayView {
    pub location_text: String,
    pub active_marker: Option<Location>,
    pub last_update_text: String,
    pub counts: MaterialCounts,
    pub charts: Option<ChartState>,
}

impl DisplayView {
    pub fn new() -> Self {
        Self {
            location_text: "-".to_string(),
            active_marker: None,
            last_update_text: "-".to_string(),
            counts: MaterialCounts::default(),
            charts: None,
        }
    }

    /// Construct both charts from the cached counts
    pub fn init_charts(&mut self) {
        let series = self.counts.as_series();
        self.charts = Some(ChartState {
            materials: series,
            distribution: series,
        });
    }

    /// Set the visible location text and move the single active marker and
    /// indicator badge. An unrecognized location shows its text verbatim
    /// with no marker active and no badge visible.
    pub fn show_location(&mut self, location: &str) {
        self.location_text = location.to_string();
        self.active_marker = Location::parse(location);
    }

    /// Render the last-update timestamp. Absent renders "-"; a zero
    /// timestamp also renders "-" even though 0 is a valid epoch value.
    pub fn show_timestamp(&mut self, timestamp_ms: Option<i64>) {
        self.last_update_text = match timestamp_ms {
            None | Some(0) => "-".to_string(),
            Some(ts) => format_timestamp(ts),
        };
    }

    /// Cache new material counts and repaint the charts
    pub fn show_materials(&mut self, counts: MaterialCounts) {
        self.counts = counts;
        self.repaint_charts();
    }

    /// Overwrite both chart datasets from the cached counts. Skips silently
    /// while the charts are not yet constructed.
    pub fn repaint_charts(&mut self) {
        if let Some(charts) = &mut self.charts {
            let series = self.counts.as_series();
            charts.materials = series;
            charts.distribution = series;
        }
    }

    /// Whether a location's map marker is in the active style
    pub fn marker_active(&self, location: Location) -> bool {
        self.active_marker == Some(location)
    }

    /// Whether a location's indicator badge is visible
    pub fn indicator_visible(&self, location: Location) -> bool {
        self.active_marker == Some(location)
    }
}

impl Default for DisplayView {
    fn default() -> Self {
        Self::new()
    }
}

/// Render an epoch-millisecond timestamp as local `time, date`
fn format_timestamp(timestamp_ms: i64) -> String {
    match Local.timestamp_millis_opt(timestamp_ms).single() {
        Some(dt) => format!(
            "{}, {}",
            dt.format("%-I:%M:%S %p"),
            dt.format("%-m/%-d/%Y")
        ),
        None => "-".to_string(),
    }
}

/// Thread-safe display state handle
pub type ViewHandle = Arc<RwLock<DisplayView>>;

pub fn new_view_handle() -> ViewHandle {
    Arc::new(RwLock::new(DisplayView::new()))
}
