//! Canonical alert record shared by every component of the engine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::coords::Coords;
use crate::severity::Severity;

/// One distress report after normalization. Everything downstream of the
/// reconciler works exclusively on this shape; raw wire records never leak
/// past the boundary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Alert {
    /// Opaque identifier, unique within the reconciled set. Local alerts get
    /// a generation-time id; remote ids are taken as given.
    pub id: String,
    pub name: String,
    pub phone: String,
    /// Open vocabulary – unknown tags pass through untouched.
    pub tags: Vec<String>,
    /// Fixed at creation, never reclassified.
    pub severity: Severity,
    pub description: String,
    /// Monotonic: flips to `true` via mark-safe, never reverts.
    pub completed: bool,
    pub timestamp: DateTime<Utc>,
    /// Provenance marker: `true` only for alerts created in this session.
    /// The display set drops everything else.
    pub self_reported: bool,
    /// Extracted once at the normalization boundary. `None` means no shape
    /// in the raw record yielded a valid pair.
    pub coords: Option<Coords>,
    /// Upstream-supplied readable address. Takes precedence over any
    /// computed geocode result.
    pub resolved_address: Option<String>,
    /// Opaque references to locally stored media. Never inspected here.
    pub photo: Option<String>,
    pub voice_note: Option<String>,
}

/// A locally submitted alert before the store assigns id, timestamp and
/// severity.
#[derive(Debug, Clone, Default)]
pub struct NewAlert {
    pub name: String,
    pub phone: String,
    pub tags: Vec<String>,
    pub description: String,
    /// Device position as a `"lat,lon"` string, when available.
    pub location: Option<String>,
    pub photo: Option<String>,
    pub voice_note: Option<String>,
}
