//! Session-local alert store.
//!
//! The explicit home for alerts created on this device: submission assigns
//! the id, timestamp and severity exactly once, and mark-safe is the only
//! mutation after that. Presentation code holds one store per session and
//! passes its slice to the reconciler.

use chrono::Utc;
use serde_json::json;
use tracing::info;

use crate::coords::extract_coords;
use crate::model::{Alert, NewAlert};
use crate::severity::classify;

/// Local alerts in newest-first order.
#[derive(Debug, Default)]
pub struct AlertStore {
    alerts: Vec<Alert>,
}

impl AlertStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Submit a new alert. Severity is classified here, once; the record is
    /// marked self-reported and inserted at the front.
    pub fn add_alert(&mut self, draft: NewAlert) -> &Alert {
        let severity = classify(&draft.tags, &draft.description);

        // Generation-time id, bumped past any same-millisecond collision.
        let mut id = Utc::now().timestamp_millis();
        while self.alerts.iter().any(|a| a.id == id.to_string()) {
            id += 1;
        }

        let coords = draft
            .location
            .as_deref()
            .and_then(|s| extract_coords(&json!({ "location": s })));

        let alert = Alert {
            id: id.to_string(),
            name: draft.name,
            phone: draft.phone,
            tags: draft.tags,
            severity,
            description: draft.description,
            completed: false,
            timestamp: Utc::now(),
            self_reported: true,
            coords,
            resolved_address: None,
            photo: draft.photo,
            voice_note: draft.voice_note,
        };

        info!("Alert {} submitted ({:?})", alert.id, alert.severity);
        self.alerts.insert(0, alert);
        &self.alerts[0]
    }

    /// Mark an alert safe. Monotonic: never flips back. Returns `false` when
    /// the id is unknown.
    pub fn mark_safe(&mut self, id: &str) -> bool {
        match self.alerts.iter_mut().find(|a| a.id == id) {
            Some(a) => {
                a.completed = true;
                info!("Alert {id} marked safe");
                true
            }
            None => false,
        }
    }

    /// Session alerts, newest first.
    pub fn alerts(&self) -> &[Alert] {
        &self.alerts
    }
}

// ─────────────────────────────── Tests ───────────────────────────────────
