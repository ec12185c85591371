//! Coordinate extraction from raw alert records.
//!
//! Records arrive from several sources with no agreed schema: coordinates may
//! be a `"lat,lon"` string, a nested `location` object, a nested `coords`
//! object, or flat top-level fields under a handful of key aliases. The
//! extractor tries each shape in a fixed order and fails closed – a candidate
//! pair is only accepted when both components parse to finite numbers.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A validated coordinate pair. Both components are finite.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coords {
    pub lat: f64,
    pub lon: f64,
}

impl Coords {
    /// Coordinate pair formatted to 4 decimal places per axis. Used as the
    /// geocode fallback display string and for outgoing submissions.
    pub fn display(&self) -> String {
        format!("{:.4}, {:.4}", self.lat, self.lon)
    }
}

// ─────────────────────────── Key aliases ─────────────────────────────────

/// Field-name aliases in priority order. The canonical name wins over
/// provider-specific abbreviations.
const LAT_KEYS: &[&str] = &["latitude", "lat"];
const LON_KEYS: &[&str] = &["longitude", "lon", "lng"];

// ─────────────────────────── Extraction ──────────────────────────────────

/// Extract a coordinate pair from an arbitrary raw record.
///
/// Strategy order:
/// 1. `location` as a free-text `"lat,lon"` string
/// 2. `location` as a nested object
/// 3. `coords` as a nested object
/// 4. flat top-level fields
///
/// Each strategy must yield two finite numbers or the next one is tried.
/// Returns `None` when no shape produces a valid pair. Pure and synchronous;
/// never panics on malformed input.
pub fn extract_coords(record: &Value) -> Option<Coords> {
    let obj = record.as_object()?;

    if let Some(Value::String(s)) = obj.get("location") {
        if let Some(c) = parse_pair_str(s) {
            return Some(c);
        }
    }

    if let Some(loc) = obj.get("location").and_then(Value::as_object) {
        if let Some(c) = pair_from_fields(|k| loc.get(k)) {
            return Some(c);
        }
    }

    if let Some(nested) = obj.get("coords").and_then(Value::as_object) {
        if let Some(c) = pair_from_fields(|k| nested.get(k)) {
            return Some(c);
        }
    }

    pair_from_fields(|k| obj.get(k))
}

/// Parse a `"lat,lon"` string. Exactly two comma-separated parts, both
/// finite numbers.
fn parse_pair_str(s: &str) -> Option<Coords> {
    let mut parts = s.split(',');
    let lat = finite(parts.next()?.trim())?;
    let lon = finite(parts.next()?.trim())?;
    if parts.next().is_some() {
        return None;
    }
    Some(Coords { lat, lon })
}

/// Read a pair through the alias priority lists from any field lookup.
fn pair_from_fields<'a>(get: impl Fn(&str) -> Option<&'a Value>) -> Option<Coords> {
    let lat = LAT_KEYS.iter().find_map(|k| get(k).and_then(finite_value))?;
    let lon = LON_KEYS.iter().find_map(|k| get(k).and_then(finite_value))?;
    Some(Coords { lat, lon })
}

/// Accept a JSON number or a numeric string; reject NaN and infinities.
fn finite_value(v: &Value) -> Option<f64> {
    match v {
        Value::Number(n) => n.as_f64().filter(|f| f.is_finite()),
        Value::String(s) => finite(s.trim()),
        _ => None,
    }
}

fn finite(s: &str) -> Option<f64> {
    s.parse::<f64>().ok().filter(|f| f.is_finite())
}

// ─────────────────────────────── Tests ───────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn expect(record: Value, lat: f64, lon: f64) {
        let c = extract_coords(&record).expect("pair should extract");
        assert_eq!(c.lat, lat);
        assert_eq!(c.lon, lon);
    }

    #[test]
    fn comma_string() {
        expect(json!({ "location": "17.3850, 78.4867" }), 17.3850, 78.4867);
    }

    #[test]
    fn nested_location_object() {
        expect(
            json!({ "location": { "latitude": 28.6139, "longitude": 77.2090 } }),
            28.6139,
            77.2090,
        );
    }

    #[test]
    fn nested_coords_object() {
        expect(
            json!({ "coords": { "latitude": 19.0760, "longitude": 72.8777 } }),
            19.0760,
            72.8777,
        );
    }

    #[test]
    fn flat_full_names() {
        expect(json!({ "latitude": 13.0827, "longitude": 80.2707 }), 13.0827, 80.2707);
    }

    #[test]
    fn flat_abbreviated_lat_lon() {
        expect(json!({ "lat": 26.9124, "lon": 75.7873 }), 26.9124, 75.7873);
    }

    #[test]
    fn flat_abbreviated_lat_lng() {
        expect(json!({ "lat": 18.5204, "lng": 73.8567 }), 18.5204, 73.8567);
    }

    #[test]
    fn numeric_strings_accepted() {
        expect(json!({ "lat": "18.5204", "lng": "73.8567" }), 18.5204, 73.8567);
    }

    #[test]
    fn string_beats_nested_and_flat() {
        // Strategy order: the free-text string wins over other shapes.
        expect(
            json!({
                "location": "1.0, 2.0",
                "coords": { "latitude": 9.0, "longitude": 9.0 },
                "latitude": 8.0,
                "longitude": 8.0,
            }),
            1.0,
            2.0,
        );
    }

    #[test]
    fn bad_string_falls_through_to_next_shape() {
        expect(
            json!({ "location": "downtown", "coords": { "lat": 5.5, "lon": 6.5 } }),
            5.5,
            6.5,
        );
    }

    #[test]
    fn three_part_string_rejected() {
        assert!(extract_coords(&json!({ "location": "1.0, 2.0, 3.0" })).is_none());
    }

    #[test]
    fn partial_pair_rejected() {
        assert!(extract_coords(&json!({ "latitude": 13.08 })).is_none());
        assert!(extract_coords(&json!({ "location": { "longitude": 80.27 } })).is_none());
    }

    #[test]
    fn non_numeric_rejected() {
        assert!(extract_coords(&json!({ "lat": "north", "lon": "east" })).is_none());
        assert!(extract_coords(&json!({ "lat": true, "lon": null })).is_none());
    }

    #[test]
    fn no_location_at_all() {
        assert!(extract_coords(&json!({ "name": "Rajesh" })).is_none());
        assert!(extract_coords(&json!("just a string")).is_none());
    }

    #[test]
    fn display_rounds_to_four_places() {
        let c = Coords { lat: 17.384951, lon: 78.48671 };
        assert_eq!(c.display(), "17.3850, 78.4867");
    }

    #[test]
    fn display_pads_to_four_places() {
        let c = Coords { lat: 77.209, lon: 19.076 };
        assert_eq!(c.display(), "77.2090, 19.0760");
    }
}
