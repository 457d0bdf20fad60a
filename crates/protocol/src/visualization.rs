//! Normalization of the map-visualization payload.
//!
//! The backend emits this payload from several code paths that disagree on
//! nesting: sometimes under a `ui_payload` key, sometimes under
//! `state.ui_payload`, sometimes as the root object itself, and the
//! `suggested_queries` list can sit beside the payload rather than inside
//! it. The normalizer resolves all observed variants into one
//! [`VisualizationPayload`].
//!
//! Failure here is a typed [`VizError`]; the event classifier downgrades the
//! owning frame to `Unknown` rather than letting it escape.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::tool_result::{AirportSummary, first_f64, first_str};

// ── Errors ───────────────────────────────────────────────────────────────────

/// Why a payload failed to normalize.
#[derive(Debug, Error)]
pub enum VizError {
    #[error("missing required field `{0}`")]
    MissingField(&'static str),
    #[error("unrecognized visualization discriminant `{0}`")]
    UnknownDiscriminant(String),
    #[error("payload has no `type`/`kind` discriminant")]
    MissingDiscriminant,
}

// ── Types ────────────────────────────────────────────────────────────────────

/// Map view selected by the payload discriminant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum VizView {
    /// A plain set of markers.
    Markers { markers: Vec<AirportSummary> },
    /// A route between two endpoints plus markers along it.
    RouteWithMarkers {
        route: Route,
        markers: Vec<AirportSummary>,
    },
    /// One focused marker with detail fields.
    MarkerWithDetails { marker: MarkerDetails },
    /// A center point with surrounding markers.
    PointWithMarkers {
        point: GeoPoint,
        label: Option<String>,
        markers: Vec<AirportSummary>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Route {
    pub from: RouteEndpoint,
    pub to: RouteEndpoint,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteEndpoint {
    pub ident: String,
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarkerDetails {
    pub ident: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latitude: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub longitude: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub zoom: Option<f64>,
}

/// Normalized map-visualization payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VisualizationPayload {
    #[serde(flatten)]
    pub view: VizView,
    /// Filter state forwarded opaquely; the recognized keys are owned by the
    /// consumer, not the decoder.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filter_profile: Option<Map<String, Value>>,
    /// Follow-up queries the agent suggests showing alongside the map.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggested_queries: Option<Vec<String>>,
}

// ── Normalization ────────────────────────────────────────────────────────────

/// Resolve and decode a visualization payload from any of its observed
/// nesting variants.
pub fn normalize_visualization(root: &Map<String, Value>) -> Result<VisualizationPayload, VizError> {
    let payload = resolve_payload(root);
    let view = decode_view(payload)?;
    let filter_profile = payload.get("filter_profile").and_then(Value::as_object).cloned();

    let mut suggested_queries = payload.get("suggested_queries").and_then(decode_suggestions);
    if suggested_queries.is_none() {
        // One backend path leaves suggestions beside the payload instead of
        // inside it; the payload's own list wins when both exist.
        suggested_queries = root.get("suggested_queries").and_then(decode_suggestions);
    }

    Ok(VisualizationPayload {
        view,
        filter_profile,
        suggested_queries,
    })
}

/// Location resolution, first match wins: a `ui_payload` key at the root, a
/// `state.ui_payload` nested path, or the root object itself.
fn resolve_payload(root: &Map<String, Value>) -> &Map<String, Value> {
    if let Some(inner) = root.get("ui_payload").and_then(Value::as_object) {
        return inner;
    }
    if let Some(inner) = root
        .get("state")
        .and_then(Value::as_object)
        .and_then(|state| state.get("ui_payload"))
        .and_then(Value::as_object)
    {
        return inner;
    }
    root
}

fn decode_view(payload: &Map<String, Value>) -> Result<VizView, VizError> {
    let discriminant =
        first_str(payload, &["type", "kind"]).ok_or(VizError::MissingDiscriminant)?;
    match discriminant {
        "markers" => {
            let markers = payload
                .get("data")
                .or_else(|| payload.get("markers"))
                .and_then(Value::as_array)
                .ok_or(VizError::MissingField("markers"))?;
            Ok(VizView::Markers {
                markers: decode_markers(markers),
            })
        }
        "route_with_markers" => {
            let route = payload
                .get("route")
                .and_then(Value::as_object)
                .ok_or(VizError::MissingField("route"))?;
            let from = decode_endpoint(route.get("from"), "route.from")?;
            let to = decode_endpoint(route.get("to"), "route.to")?;
            let markers = payload
                .get("markers")
                .and_then(Value::as_array)
                .ok_or(VizError::MissingField("markers"))?;
            Ok(VizView::RouteWithMarkers {
                route: Route { from, to },
                markers: decode_markers(markers),
            })
        }
        "marker_with_details" => {
            let marker = payload
                .get("marker")
                .and_then(Value::as_object)
                .ok_or(VizError::MissingField("marker"))?;
            let ident = marker
                .get("ident")
                .and_then(Value::as_str)
                .ok_or(VizError::MissingField("marker.ident"))?
                .to_string();
            Ok(VizView::MarkerWithDetails {
                marker: MarkerDetails {
                    ident,
                    latitude: first_f64(marker, &["lat", "latitude"]),
                    longitude: first_f64(marker, &["lon", "longitude"]),
                    zoom: marker.get("zoom").and_then(Value::as_f64),
                },
            })
        }
        "point_with_markers" => {
            let point = payload
                .get("point")
                .and_then(Value::as_object)
                .ok_or(VizError::MissingField("point"))?;
            let lat = point
                .get("lat")
                .and_then(Value::as_f64)
                .ok_or(VizError::MissingField("point.lat"))?;
            let lng = point
                .get("lng")
                .and_then(Value::as_f64)
                .ok_or(VizError::MissingField("point.lng"))?;
            let markers = payload
                .get("markers")
                .and_then(Value::as_array)
                .ok_or(VizError::MissingField("markers"))?;
            let label = first_str(point, &["label"])
                .or_else(|| first_str(payload, &["label"]))
                .map(str::to_string);
            Ok(VizView::PointWithMarkers {
                point: GeoPoint { lat, lng },
                label,
                markers: decode_markers(markers),
            })
        }
        other => Err(VizError::UnknownDiscriminant(other.to_string())),
    }
}

/// Marker elements are airport-shaped; rows without an identifier are
/// dropped rather than failing the whole payload.
fn decode_markers(items: &[Value]) -> Vec<AirportSummary> {
    items.iter().filter_map(AirportSummary::from_value).collect()
}

fn decode_endpoint(value: Option<&Value>, label: &'static str) -> Result<RouteEndpoint, VizError> {
    let endpoint = value
        .and_then(Value::as_object)
        .ok_or(VizError::MissingField(label))?;
    let ident = first_str(endpoint, &["ident", "icao"]).ok_or(VizError::MissingField(label))?;
    let latitude =
        first_f64(endpoint, &["lat", "latitude"]).ok_or(VizError::MissingField(label))?;
    let longitude =
        first_f64(endpoint, &["lon", "longitude"]).ok_or(VizError::MissingField(label))?;
    Ok(RouteEndpoint {
        ident: ident.to_string(),
        latitude,
        longitude,
    })
}

/// Suggestion lists arrive as plain strings or as objects carrying a label.
fn decode_suggestions(value: &Value) -> Option<Vec<String>> {
    let items = value.as_array()?;
    let suggestions: Vec<String> = items
        .iter()
        .filter_map(|item| match item {
            Value::String(text) => Some(text.clone()),
            Value::Object(obj) => first_str(obj, &["label", "query", "text"]).map(str::to_string),
            _ => None,
        })
        .collect();
    if suggestions.is_empty() { None } else { Some(suggestions) }
}

// ── Tests ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn object(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            other => panic!("test fixture must be an object, got {other:?}"),
        }
    }

    fn normalize(value: Value) -> Result<VisualizationPayload, VizError> {
        normalize_visualization(&object(value))
    }

    // ── Discriminant dispatch ──────────────────────────────────────────────

    #[test]
    fn markers_from_data_key() {
        let payload = normalize(json!({
            "type": "markers",
            "data": [{"ident": "EGLL"}, {"icao": "EGKK"}],
        }))
        .unwrap();
        match payload.view {
            VizView::Markers { markers } => {
                assert_eq!(markers.len(), 2);
                assert_eq!(markers[1].ident, "EGKK");
            }
            other => panic!("expected markers view, got {other:?}"),
        }
    }

    #[test]
    fn markers_from_markers_key() {
        let payload = normalize(json!({
            "kind": "markers",
            "markers": [{"ident": "EGLL"}],
        }))
        .unwrap();
        assert!(matches!(payload.view, VizView::Markers { .. }));
    }

    #[test]
    fn markers_without_any_list_fails() {
        assert!(matches!(
            normalize(json!({"type": "markers"})),
            Err(VizError::MissingField("markers"))
        ));
    }

    #[test]
    fn route_with_markers_full() {
        let payload = normalize(json!({
            "type": "route_with_markers",
            "route": {
                "from": {"ident": "EGLL", "lat": 51.47, "lon": -0.45},
                "to": {"icao": "LFPG", "latitude": 49.01, "longitude": 2.55},
            },
            "markers": [{"ident": "EGLL"}, {"ident": "LFPG"}],
        }))
        .unwrap();
        match payload.view {
            VizView::RouteWithMarkers { route, markers } => {
                assert_eq!(route.from.ident, "EGLL");
                assert_eq!(route.from.latitude, 51.47);
                assert_eq!(route.to.ident, "LFPG");
                assert_eq!(route.to.longitude, 2.55);
                assert_eq!(markers.len(), 2);
            }
            other => panic!("expected route view, got {other:?}"),
        }
    }

    #[test]
    fn route_missing_route_or_markers_fails() {
        assert!(normalize(json!({
            "type": "route_with_markers",
            "markers": [],
        }))
        .is_err());
        assert!(normalize(json!({
            "type": "route_with_markers",
            "route": {
                "from": {"ident": "EGLL", "lat": 1.0, "lon": 2.0},
                "to": {"ident": "LFPG", "lat": 3.0, "lon": 4.0},
            },
        }))
        .is_err());
    }

    #[test]
    fn route_endpoint_without_coordinates_fails() {
        assert!(normalize(json!({
            "type": "route_with_markers",
            "route": {"from": {"ident": "EGLL"}, "to": {"ident": "LFPG", "lat": 1.0, "lon": 2.0}},
            "markers": [],
        }))
        .is_err());
    }

    #[test]
    fn marker_with_details() {
        let payload = normalize(json!({
            "type": "marker_with_details",
            "marker": {"ident": "EGLL", "lat": 51.47, "lon": -0.45, "zoom": 11.0},
        }))
        .unwrap();
        match payload.view {
            VizView::MarkerWithDetails { marker } => {
                assert_eq!(marker.ident, "EGLL");
                assert_eq!(marker.zoom, Some(11.0));
            }
            other => panic!("expected marker view, got {other:?}"),
        }
    }

    #[test]
    fn marker_without_ident_fails() {
        assert!(matches!(
            normalize(json!({"type": "marker_with_details", "marker": {"lat": 1.0}})),
            Err(VizError::MissingField("marker.ident"))
        ));
    }

    #[test]
    fn point_with_markers() {
        let payload = normalize(json!({
            "type": "point_with_markers",
            "point": {"lat": 51.5, "lng": -0.1, "label": "London"},
            "markers": [{"ident": "EGLL"}],
        }))
        .unwrap();
        match payload.view {
            VizView::PointWithMarkers { point, label, markers } => {
                assert_eq!(point.lat, 51.5);
                assert_eq!(point.lng, -0.1);
                assert_eq!(label, Some("London".to_string()));
                assert_eq!(markers.len(), 1);
            }
            other => panic!("expected point view, got {other:?}"),
        }
    }

    #[test]
    fn point_missing_lng_fails() {
        assert!(matches!(
            normalize(json!({
                "type": "point_with_markers",
                "point": {"lat": 51.5},
                "markers": [],
            })),
            Err(VizError::MissingField("point.lng"))
        ));
    }

    #[test]
    fn unknown_discriminant_fails() {
        assert!(matches!(
            normalize(json!({"type": "heatmap", "markers": []})),
            Err(VizError::UnknownDiscriminant(kind)) if kind == "heatmap"
        ));
    }

    #[test]
    fn missing_discriminant_fails() {
        assert!(matches!(
            normalize(json!({"markers": [{"ident": "EGLL"}]})),
            Err(VizError::MissingDiscriminant)
        ));
    }

    // ── Location resolution ────────────────────────────────────────────────

    #[test]
    fn payload_under_ui_payload_key() {
        let payload = normalize(json!({
            "ui_payload": {"type": "markers", "markers": [{"ident": "EGLL"}]},
        }))
        .unwrap();
        assert!(matches!(payload.view, VizView::Markers { .. }));
    }

    #[test]
    fn payload_under_state_ui_payload_path() {
        let payload = normalize(json!({
            "state": {"ui_payload": {"type": "markers", "markers": [{"ident": "EGLL"}]}},
        }))
        .unwrap();
        assert!(matches!(payload.view, VizView::Markers { .. }));
    }

    /// The root `ui_payload` key wins over the nested `state.ui_payload`.
    #[test]
    fn root_key_wins_over_nested_path() {
        let payload = normalize(json!({
            "ui_payload": {"type": "markers", "markers": [{"ident": "ROOT"}]},
            "state": {"ui_payload": {"type": "markers", "markers": [{"ident": "NESTED"}]}},
        }))
        .unwrap();
        match payload.view {
            VizView::Markers { markers } => assert_eq!(markers[0].ident, "ROOT"),
            other => panic!("expected markers view, got {other:?}"),
        }
    }

    // ── suggested_queries merge ────────────────────────────────────────────

    /// Payload nested at `state.ui_payload` with suggestions at the outer
    /// root merges both into one payload.
    #[test]
    fn outer_root_suggestions_merge_into_nested_payload() {
        let payload = normalize(json!({
            "state": {"ui_payload": {"type": "markers", "markers": [{"ident": "EGLL"}]}},
            "suggested_queries": ["fuel prices at EGLL", {"label": "weather at EGLL"}],
        }))
        .unwrap();
        assert_eq!(
            payload.suggested_queries,
            Some(vec![
                "fuel prices at EGLL".to_string(),
                "weather at EGLL".to_string(),
            ])
        );
    }

    #[test]
    fn payload_own_suggestions_win_over_outer_root() {
        let payload = normalize(json!({
            "ui_payload": {
                "type": "markers",
                "markers": [],
                "suggested_queries": ["inner"],
            },
            "suggested_queries": ["outer"],
        }))
        .unwrap();
        assert_eq!(payload.suggested_queries, Some(vec!["inner".to_string()]));
    }

    // ── filter profile ─────────────────────────────────────────────────────

    /// Filter keys are not validated; whatever the backend sends rides along.
    #[test]
    fn filter_profile_is_carried_opaquely() {
        let payload = normalize(json!({
            "type": "markers",
            "markers": [],
            "filter_profile": {"has_fuel": true, "min_runway_ft": 6000, "surface": "asphalt"},
        }))
        .unwrap();
        let profile = payload.filter_profile.expect("profile carried");
        assert_eq!(profile.get("has_fuel"), Some(&json!(true)));
        assert_eq!(profile.get("min_runway_ft"), Some(&json!(6000)));
        assert_eq!(profile.get("surface"), Some(&json!("asphalt")));
    }

    // ── Serialization ──────────────────────────────────────────────────────

    /// Normalized payloads re-serialize with their discriminant so consumers
    /// can log or forward them without loss.
    #[test]
    fn payload_serializes_with_discriminant() {
        let payload = normalize(json!({
            "type": "markers",
            "markers": [{"ident": "EGLL"}],
        }))
        .unwrap();
        let out = serde_json::to_value(&payload).unwrap();
        assert_eq!(out.get("type"), Some(&json!("markers")));
        let back: VisualizationPayload = serde_json::from_value(out).unwrap();
        assert_eq!(back, payload);
    }
}
