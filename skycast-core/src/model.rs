use serde::{Deserialize, Serialize};

/// Observed conditions for a single location.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurrentConditions {
    pub temp: f64,
    pub conditions: String,
    pub humidity: f64,
    pub windspeed: f64,
    pub pressure: f64,
    pub visibility: f64,
}

/// One day of the short forecast.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DayForecast {
    /// Date string as reported upstream, e.g. "2026-08-04".
    pub datetime: String,
    pub conditions: String,
    pub tempmax: f64,
    pub tempmin: f64,
}

/// One fetched (or cached) weather payload for a single location.
///
/// Field names follow the upstream wire format, so a snapshot serializes
/// back to the same JSON shape it arrived in. Unknown upstream fields are
/// dropped on deserialization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherSnapshot {
    #[serde(rename = "currentConditions")]
    pub current_conditions: CurrentConditions,
    #[serde(default)]
    pub days: Vec<DayForecast>,
    #[serde(rename = "resolvedAddress", default, skip_serializing_if = "Option::is_none")]
    pub resolved_address: Option<String>,
}

/// A snapshot plus the time it was captured, flattened so the persisted
/// entry keeps the snapshot's own top-level keys.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    #[serde(flatten)]
    pub snapshot: WeatherSnapshot,
    /// Capture time as an ISO-8601 string.
    pub timestamp: String,
}

/// Previous successful lookups, newest first.
///
/// Bounded to [`HistoryLog::CAPACITY`] entries; older ones are dropped
/// silently on prepend.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HistoryLog(Vec<HistoryEntry>);

impl HistoryLog {
    pub const CAPACITY: usize = 10;

    pub fn prepend(&mut self, entry: HistoryEntry) {
        self.0.insert(0, entry);
        self.0.truncate(Self::CAPACITY);
    }

    pub fn entries(&self) -> &[HistoryEntry] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Outcome of one lookup as seen by the view layer.
///
/// Owned by the coordinator; each new query supersedes the previous state
/// wholesale rather than mutating it in place.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LookupState {
    pub data: Option<WeatherSnapshot>,
    pub loading: bool,
    pub error: Option<String>,
}
