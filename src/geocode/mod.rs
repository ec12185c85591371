//! Reverse geocoding with a session-scoped cache.
//!
//! Whenever the reconciled collection changes, the resolver turns each
//! alert's coordinates into a human-readable place string, one external
//! lookup per alert, fanned out through a small bounded pool keyed by alert
//! id. Results are cached for the lifetime of the resolver and never
//! recomputed; a failed or empty lookup caches the coordinate pair itself so
//! the alert is never retried.


use std::collections::HashMap;
use std::time::Duration;

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use futures_util::{StreamExt, stream};
use reqwest::Client as HttpClient;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::coords::Coords;
use crate::model::Alert;

// ─────────────────────────── Service seam ────────────────────────────────

/// Optional components of one reverse-geocode result.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlaceComponents {
    pub name: Option<String>,
    pub street: Option<String>,
    pub subregion: Option<String>,
    pub district: Option<String>,
    pub city: Option<String>,
    pub region: Option<String>,
}

impl PlaceComponents {
    fn is_empty(&self) -> bool {
        [
            &self.name,
            &self.street,
            &self.subregion,
            &self.district,
            &self.city,
            &self.region,
        ]
        .iter()
        .all(|f| f.as_deref().is_none_or(str::is_empty))
    }
}

/// External reverse-geocode service. The engine only relies on the
/// success/failure contract; provider output is taken as-is.
#[async_trait]
pub trait ReverseGeocoder {
    async fn resolve(&self, lat: f64, lon: f64) -> Result<Vec<PlaceComponents>>;
}

// ─────────────────────────── Nominatim client ────────────────────────────

/// Production geocoder backed by a Nominatim `/reverse` endpoint.
pub struct NominatimGeocoder {
    http: HttpClient,
    endpoint: String,
    timeout: Duration,
}

impl NominatimGeocoder {
    /// Build from environment variables.
    ///
    /// | Env var              | Default                                  | Purpose               |
    /// |----------------------|------------------------------------------|-----------------------|
    /// | `GEOCODE_ENDPOINT`   | `https://nominatim.openstreetmap.org`    | Nominatim base URL    |
    /// | `GEOCODE_TIMEOUT_MS` | `5000`                                   | Request timeout in ms |
    pub fn from_env() -> Self {
        let endpoint = std::env::var("GEOCODE_ENDPOINT")
            .unwrap_or_else(|_| "https://nominatim.openstreetmap.org".into());
        let timeout_ms: u64 = std::env::var("GEOCODE_TIMEOUT_MS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(5000);

        Self {
            http: HttpClient::new(),
            endpoint,
            timeout: Duration::from_millis(timeout_ms),
        }
    }
}

#[derive(Deserialize)]
struct NominatimReverse {
    name: Option<String>,
    address: Option<NominatimAddress>,
}

#[derive(Deserialize, Default)]
struct NominatimAddress {
    road: Option<String>,
    suburb: Option<String>,
    county: Option<String>,
    city_district: Option<String>,
    state_district: Option<String>,
    city: Option<String>,
    town: Option<String>,
    village: Option<String>,
    state: Option<String>,
}

#[async_trait]
impl ReverseGeocoder for NominatimGeocoder {
    async fn resolve(&self, lat: f64, lon: f64) -> Result<Vec<PlaceComponents>> {
        let url = format!("{}/reverse", self.endpoint);
        let resp = self
            .http
            .get(&url)
            .query(&[
                ("lat", lat.to_string()),
                ("lon", lon.to_string()),
                ("format", "jsonv2".into()),
            ])
            .header("User-Agent", "sos_triage/0.1")
            .timeout(self.timeout)
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status();
            return Err(anyhow!("reverse geocode failed: {status}"));
        }

        let body: NominatimReverse = resp.json().await?;
        let addr = body.address.unwrap_or_default();
        let place = PlaceComponents {
            name: body.name.filter(|s| !s.is_empty()),
            street: addr.road,
            subregion: addr.suburb.or(addr.county),
            district: addr.city_district.or(addr.state_district),
            city: addr.city.or(addr.town).or(addr.village),
            region: addr.state,
        };

        // Nominatim answers "no result" with an error body that still
        // decodes; map it to an empty result set.
        if place.is_empty() {
            return Ok(vec![]);
        }
        Ok(vec![place])
    }
}

// ─────────────────────────── Display composition ─────────────────────────

/// Compose the cached display string for one geocode result: place name (or
/// street), subregion, district, city (or region), comma-joined with empty
/// parts omitted. One authoritative write per alert. "Unknown" when the
/// provider returned an entry with no usable parts.
fn compose_display(p: &PlaceComponents) -> String {
    let nonempty =
        |o: &Option<String>| o.as_deref().filter(|s| !s.is_empty()).map(str::to_string);

    let parts: Vec<String> = [
        nonempty(&p.name).or_else(|| nonempty(&p.street)),
        nonempty(&p.subregion),
        nonempty(&p.district),
        nonempty(&p.city).or_else(|| nonempty(&p.region)),
    ]
    .into_iter()
    .flatten()
    .collect();

    if parts.is_empty() {
        "Unknown".into()
    } else {
        parts.join(", ")
    }
}

// ─────────────────────────── Resolver & cache ────────────────────────────

/// Owns the per-alert display-location cache and runs resolution passes.
///
/// The cache is append-only for the lifetime of the resolver: entries are
/// filled lazily, checked before any lookup is issued, and never evicted.
/// Lookups for alerts removed from the set mid-flight still complete and
/// write their entry; the display set has already excluded them downstream.
pub struct GeocodeResolver {
    cache: HashMap<String, String>,
    concurrency: usize,
}

impl Default for GeocodeResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl GeocodeResolver {
    pub fn new() -> Self {
        Self {
            cache: HashMap::new(),
            concurrency: 4,
        }
    }

    /// Build from environment variables.
    ///
    /// | Env var               | Default | Purpose                       |
    /// |-----------------------|---------|-------------------------------|
    /// | `GEOCODE_CONCURRENCY` | `4`     | Max lookups in flight at once |
    pub fn from_env() -> Self {
        let concurrency: usize = std::env::var("GEOCODE_CONCURRENCY")
            .ok()
            .and_then(|v| v.parse().ok())
            .filter(|&n| n > 0)
            .unwrap_or(4);
        Self {
            concurrency,
            ..Self::new()
        }
    }

    /// Cached display string for an alert id, when a lookup has completed.
    pub fn cached(&self, id: &str) -> Option<&str> {
        self.cache.get(id).map(String::as_str)
    }

    /// Run one resolution pass over the reconciled collection.
    ///
    /// Skips alerts that carry an upstream address, already have a cache
    /// entry, are already queued in this pass, or have no extractable
    /// coordinates (the last are skipped permanently – no placeholder is
    /// scheduled). Remaining alerts get one lookup each through a bounded
    /// pool; a failed or empty lookup caches the coordinate pair rounded to
    /// 4 decimal places. Per-alert errors are isolated and never retried.
    /// The exclusive borrow serializes passes, so each id gets at most one
    /// lookup in flight across the session.
    pub async fn resolve_pending<G>(&mut self, alerts: &[Alert], geocoder: &G)
    where
        G: ReverseGeocoder + Sync,
    {
        let mut pending: Vec<(String, Coords)> = Vec::new();
        for a in alerts {
            if a.resolved_address.is_some()
                || self.cache.contains_key(&a.id)
                || pending.iter().any(|(id, _)| id == &a.id)
            {
                continue;
            }
            let Some(coords) = a.coords else {
                debug!("No coordinates for alert {} – skipping geocode", a.id);
                continue;
            };
            pending.push((a.id.clone(), coords));
        }

        if pending.is_empty() {
            return;
        }
        debug!("Resolving {} alert location(s)", pending.len());

        let results: Vec<(String, String)> =
            stream::iter(pending.into_iter().map(|(id, coords)| async move {
                let display = match geocoder.resolve(coords.lat, coords.lon).await {
                    Ok(places) => match places.first() {
                        Some(place) => compose_display(place),
                        None => {
                            debug!("Empty geocode result for alert {id} – using coordinates");
                            coords.display()
                        }
                    },
                    Err(e) => {
                        warn!("Geocode failed for alert {id}: {e}");
                        coords.display()
                    }
                };
                (id, display)
            }))
            .buffer_unordered(self.concurrency)
            .collect()
            .await;

        for (id, display) in results {
            // Check-before-write keeps the fill idempotent.
            self.cache.entry(id).or_insert(display);
        }
    }

    /// The string presentation code renders for an alert's location:
    /// upstream address, else cache entry, else raw coordinates, else "N/A".
    pub fn display_location(&self, alert: &Alert) -> String {
        if let Some(addr) = &alert.resolved_address {
            return addr.clone();
        }
        if let Some(cached) = self.cache.get(&alert.id) {
            return cached.clone();
        }
        match alert.coords {
            Some(c) => c.display(),
            None => "N/A".into(),
        }
    }
}
