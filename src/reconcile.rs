//! Merging local and remote alert sets into the one collection used for
//! display.
//!
//! Raw records from the remote source (or the offline fallback) are trusted
//! nowhere else: this module normalizes each one exactly once into the
//! canonical [`Alert`] shape, then applies the provenance filter. Malformed
//! fields are defaulted or dropped silently; nothing here ever errors
//! outward. The only observable failure signal is the `offline` marker.

use std::sync::atomic::{AtomicI64, Ordering};

use chrono::{DateTime, Utc};
use serde_json::Value;
use tracing::{debug, warn};

use crate::coords::extract_coords;
use crate::history::{HistorySource, offline_history};
use crate::model::Alert;
use crate::severity::{Severity, classify};

/// The reconciled collection plus the offline-mode marker. The marker is for
/// diagnostics only; it never affects filtering.
#[derive(Debug, Clone)]
pub struct Reconciled {
    pub alerts: Vec<Alert>,
    pub offline: bool,
}

/// Produce the display collection from the session-local alerts and the
/// remote history source.
///
/// Local alerts come first (they keep display priority); remote or offline
/// records follow in source order. No de-duplication is attempted across the
/// two sources – there is no shared identity key, so a report appearing in
/// both renders twice. Records without an explicit `sender: true` provenance
/// marker are excluded before anything downstream sees the set.
pub async fn reconcile<S: HistorySource>(local: &[Alert], source: &S) -> Reconciled {
    let (raw, offline) = match source.fetch().await {
        Ok(records) => (records, false),
        Err(e) => {
            warn!("Cannot fetch history, using offline data: {e}");
            (offline_history(), true)
        }
    };

    let mut alerts: Vec<Alert> = local.to_vec();
    alerts.extend(raw.iter().map(normalize));

    let before = alerts.len();
    alerts.retain(|a| a.self_reported);
    debug!(
        "Reconciled {} alert(s) ({} dropped by provenance filter, offline={offline})",
        alerts.len(),
        before - alerts.len(),
    );

    Reconciled { alerts, offline }
}

// ─────────────────────────── Normalization ───────────────────────────────

/// Normalize one untrusted raw record into the canonical shape. Total: every
/// input produces an `Alert`, however degenerate.
pub fn normalize(raw: &Value) -> Alert {
    let get_str = |key: &str| {
        raw.get(key)
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string()
    };

    let tags: Vec<String> = raw
        .get("tags")
        .and_then(Value::as_array)
        .map(|arr| {
            arr.iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();

    let description = get_str("description");

    // Severity is taken as given when the wire has a recognizable value;
    // otherwise it is classified from tags + description so it is never
    // unset once the record enters the reconciled set.
    let severity = raw
        .get("severity")
        .and_then(Value::as_str)
        .and_then(Severity::from_wire_name)
        .unwrap_or_else(|| classify(&tags, &description));

    let opt_str = |key: &str| {
        raw.get(key)
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    };

    Alert {
        id: coerce_id(raw.get("id")),
        name: get_str("name"),
        phone: get_str("phone"),
        tags,
        severity,
        description,
        completed: raw
            .get("completed")
            .and_then(Value::as_bool)
            .unwrap_or(false),
        timestamp: coerce_timestamp(raw.get("timestamp").or_else(|| raw.get("created_at"))),
        self_reported: raw.get("sender").and_then(Value::as_bool) == Some(true),
        coords: extract_coords(raw),
        resolved_address: opt_str("locationAddress"),
        photo: opt_str("photoUri"),
        voice_note: opt_str("audioUri"),
    }
}

/// Wire ids arrive as strings or numbers; anything else gets a
/// generation-time id so the record stays addressable in the geocode cache.
fn coerce_id(v: Option<&Value>) -> String {
    match v {
        Some(Value::String(s)) if !s.is_empty() => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        _ => generated_id(),
    }
}

/// Last generation-time id handed out, so two id-less records normalized in
/// the same millisecond still get distinct ids.
static LAST_GENERATED_ID: AtomicI64 = AtomicI64::new(0);

fn generated_id() -> String {
    let now = Utc::now().timestamp_millis();
    let mut issued = now;
    let _ = LAST_GENERATED_ID.fetch_update(Ordering::SeqCst, Ordering::SeqCst, |last| {
        issued = now.max(last + 1);
        Some(issued)
    });
    issued.to_string()
}

/// Coerce a timestamp-like value to a concrete instant. RFC 3339 strings and
/// epoch numbers (milliseconds when plausibly so, seconds otherwise) are
/// accepted; everything else defaults to the normalization moment.
fn coerce_timestamp(v: Option<&Value>) -> DateTime<Utc> {
    match v {
        Some(Value::String(s)) => DateTime::parse_from_rfc3339(s)
            .map(|t| t.with_timezone(&Utc))
            .unwrap_or_else(|_| Utc::now()),
        Some(Value::Number(n)) => {
            let parsed = n.as_i64().and_then(|raw| {
                // Epoch seconds fit well under 1e12 for any plausible date.
                if raw.abs() >= 1_000_000_000_000 {
                    DateTime::from_timestamp_millis(raw)
                } else {
                    DateTime::from_timestamp(raw, 0)
                }
            });
            parsed.unwrap_or_else(Utc::now)
        }
        _ => Utc::now(),
    }
}

// ─────────────────────────────── Tests ───────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::{Result, anyhow};
    use async_trait::async_trait;
    use serde_json::json;

    struct FixedSource(Vec<Value>);

    #[async_trait]
    impl HistorySource for FixedSource {
        async fn fetch(&self) -> Result<Vec<Value>> {
            Ok(self.0.clone())
        }
    }

    struct FailingSource;

    #[async_trait]
    impl HistorySource for FailingSource {
        async fn fetch(&self) -> Result<Vec<Value>> {
            Err(anyhow!("network down"))
        }
    }

    fn local_alert(id: &str) -> Alert {
        Alert {
            id: id.into(),
            name: "Asha".into(),
            phone: "9000000001".into(),
            tags: vec!["trapped".into()],
            severity: Severity::High,
            description: "stuck".into(),
            completed: false,
            timestamp: Utc::now(),
            self_reported: true,
            coords: None,
            resolved_address: None,
            photo: None,
            voice_note: None,
        }
    }

    // ── Normalization ──

    #[test]
    fn normalize_full_record() {
        let a = normalize(&json!({
            "id": "r-1",
            "name": "Rajesh Kumar",
            "phone": "9876543210",
            "tags": ["injury"],
            "severity": "Medium",
            "description": "minor cuts",
            "completed": true,
            "timestamp": "2026-08-01T10:00:00Z",
            "sender": true,
            "location": "17.3850, 78.4867",
        }));
        assert_eq!(a.id, "r-1");
        assert_eq!(a.severity, Severity::Medium);
        assert!(a.completed);
        assert!(a.self_reported);
        assert_eq!(a.timestamp.to_rfc3339(), "2026-08-01T10:00:00+00:00");
        let c = a.coords.expect("coords");
        assert_eq!(c.lat, 17.3850);
    }

    #[test]
    fn normalize_defaults_for_empty_record() {
        let a = normalize(&json!({}));
        assert!(!a.id.is_empty());
        assert!(a.name.is_empty());
        assert!(a.tags.is_empty());
        assert_eq!(a.severity, Severity::Low);
        assert!(!a.completed);
        assert!(!a.self_reported);
        assert!(a.coords.is_none());
    }

    #[test]
    fn severity_classified_when_wire_value_missing_or_bogus() {
        let a = normalize(&json!({ "tags": ["injury"], "severity": "catastrophic" }));
        assert_eq!(a.severity, Severity::High);

        let b = normalize(&json!({ "tags": ["lost"] }));
        assert_eq!(b.severity, Severity::Medium);
    }

    #[test]
    fn numeric_id_coerced_to_string() {
        let a = normalize(&json!({ "id": 42 }));
        assert_eq!(a.id, "42");
    }

    #[test]
    fn generated_ids_distinct_within_one_millisecond() {
        // Id-less records must not share a geocode-cache slot.
        let ids: Vec<String> = (0..20).map(|_| normalize(&json!({})).id).collect();
        let mut deduped = ids.clone();
        deduped.sort();
        deduped.dedup();
        assert_eq!(deduped.len(), ids.len());
    }

    #[test]
    fn non_string_tags_dropped() {
        let a = normalize(&json!({ "tags": ["food", 7, null, "other"] }));
        assert_eq!(a.tags, vec!["food".to_string(), "other".to_string()]);
    }

    #[test]
    fn timestamp_from_epoch_numbers() {
        let secs = normalize(&json!({ "timestamp": 1_700_000_000 }));
        assert_eq!(secs.timestamp.timestamp(), 1_700_000_000);

        let millis = normalize(&json!({ "timestamp": 1_700_000_000_123_i64 }));
        assert_eq!(millis.timestamp.timestamp_millis(), 1_700_000_000_123);
    }

    #[test]
    fn unparsable_timestamp_defaults_to_now() {
        let before = Utc::now();
        let a = normalize(&json!({ "timestamp": "yesterday-ish" }));
        assert!(a.timestamp >= before && a.timestamp <= Utc::now());
    }

    #[test]
    fn created_at_used_when_timestamp_absent() {
        let a = normalize(&json!({ "created_at": "2026-08-02T08:30:00Z" }));
        assert_eq!(a.timestamp.to_rfc3339(), "2026-08-02T08:30:00+00:00");
    }

    #[test]
    fn sender_must_be_explicitly_true() {
        assert!(!normalize(&json!({ "sender": "true" })).self_reported);
        assert!(!normalize(&json!({ "sender": false })).self_reported);
        assert!(normalize(&json!({ "sender": true })).self_reported);
    }

    // ── Reconciliation ──

    #[tokio::test]
    async fn local_alerts_precede_remote_ones() {
        let source = FixedSource(vec![
            json!({ "id": "r-1", "sender": true }),
            json!({ "id": "r-2", "sender": true }),
        ]);
        let local = [local_alert("l-1")];
        let r = reconcile(&local, &source).await;
        assert!(!r.offline);
        let ids: Vec<&str> = r.alerts.iter().map(|a| a.id.as_str()).collect();
        assert_eq!(ids, vec!["l-1", "r-1", "r-2"]);
    }

    #[tokio::test]
    async fn provenance_filter_drops_unmarked_records() {
        let source = FixedSource(vec![
            json!({ "id": "r-1", "sender": true }),
            json!({ "id": "r-2" }),
            json!({ "id": "r-3", "sender": false }),
        ]);
        let r = reconcile(&[], &source).await;
        let ids: Vec<&str> = r.alerts.iter().map(|a| a.id.as_str()).collect();
        assert_eq!(ids, vec!["r-1"]);
    }

    #[tokio::test]
    async fn remote_failure_falls_back_to_offline_dataset() {
        let local = [local_alert("l-1")];
        let r = reconcile(&local, &FailingSource).await;
        assert!(r.offline);
        // Offline records carry no provenance marker, so only the local
        // alert survives the filter.
        let ids: Vec<&str> = r.alerts.iter().map(|a| a.id.as_str()).collect();
        assert_eq!(ids, vec!["l-1"]);
    }

    #[tokio::test]
    async fn no_dedup_across_sources() {
        // Same underlying incident on both sides: both copies render.
        let source = FixedSource(vec![json!({ "id": "l-1", "sender": true })]);
        let local = [local_alert("l-1")];
        let r = reconcile(&local, &source).await;
        assert_eq!(r.alerts.len(), 2);
    }
}
