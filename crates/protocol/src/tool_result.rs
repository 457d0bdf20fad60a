//! Structured extraction from a tool's generic result object.
//!
//! Tool results arrive as free-form JSON whose field names drift between
//! backend versions. Extraction is alias-tolerant: each logical field has an
//! ordered list of candidate keys consulted against the raw object, and the
//! complete original object is always retained so consumers needing fields
//! not modeled here are not blocked.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

use crate::visualization::{VisualizationPayload, normalize_visualization};

// ── Alias-fallback lookup ────────────────────────────────────────────────────

/// First candidate key holding a string, in priority order.
pub(crate) fn first_str<'a>(obj: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a str> {
    keys.iter().find_map(|key| obj.get(*key).and_then(Value::as_str))
}

/// First candidate key holding a number, in priority order.
pub(crate) fn first_f64(obj: &Map<String, Value>, keys: &[&str]) -> Option<f64> {
    keys.iter().find_map(|key| obj.get(*key).and_then(Value::as_f64))
}

// ── Types ────────────────────────────────────────────────────────────────────

/// One airport row from a tool result or marker list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AirportSummary {
    pub ident: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latitude: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub longitude: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
}

impl AirportSummary {
    /// Build from one element of an airport or marker array.
    ///
    /// Returns `None` when the element is not an object or carries neither
    /// identifier alias; callers drop such elements instead of failing.
    pub fn from_value(value: &Value) -> Option<Self> {
        let obj = value.as_object()?;
        let ident = first_str(obj, &["ident", "icao"])?.to_string();
        Some(Self {
            ident,
            name: first_str(obj, &["name"]).map(str::to_string),
            latitude: first_f64(obj, &["latitude_deg", "latitude"]),
            longitude: first_f64(obj, &["longitude_deg", "longitude"]),
            country: first_str(obj, &["iso_country", "country"]).map(str::to_string),
        })
    }
}

/// Structured view over a tool's result object.
///
/// `airports` stays `None` when the key is absent; consumers distinguish
/// "tool returned no airports key" from "tool returned an empty list".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolResult {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub airports: Option<Vec<AirportSummary>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub visualization: Option<VisualizationPayload>,
    /// The complete original result object, unmodified.
    pub raw: Map<String, Value>,
}

// ── Extraction ───────────────────────────────────────────────────────────────

/// Pull the structured fields out of a `tool_call_end` result object.
pub fn extract_tool_result(result: &Map<String, Value>) -> ToolResult {
    let airports = result
        .get("airports")
        .and_then(Value::as_array)
        .map(|items| items.iter().filter_map(AirportSummary::from_value).collect());

    let visualization = result
        .get("visualization")
        .and_then(Value::as_object)
        .and_then(|obj| match normalize_visualization(obj) {
            Ok(payload) => Some(payload),
            Err(err) => {
                // The raw object still carries it; only the typed view is lost.
                debug!(%err, "tool result visualization failed to normalize");
                None
            }
        });

    ToolResult {
        airports,
        visualization,
        raw: result.clone(),
    }
}

// ── Tests ────────────────────────────────────────────────────────────────────
