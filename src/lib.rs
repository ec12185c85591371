//! Alert reconciliation and triage engine for an emergency-alert capture and
//! review app.
//!
//! The presentation layer owns screens, media capture and navigation; this
//! crate owns the data-integrity core:
//!
//! - [`store`] – session-local alert submission and mark-safe
//! - [`severity`] – one-shot keyword severity classification
//! - [`reconcile`] – merging local alerts with remote (or offline-fallback)
//!   history into one normalized, provenance-filtered collection
//! - [`coords`] – coordinate extraction from schemaless raw records
//! - [`geocode`] – cached reverse geocoding with graceful degradation
//! - [`search`] – text + category filtering for display
//!
//! Nothing in this crate raises an error to its caller: remote failures fall
//! back to the offline dataset, geocode failures cache a coordinate string,
//! malformed input is defaulted or dropped. The only observable failure
//! signal is the `offline` marker on [`reconcile::Reconciled`].

pub mod coords;
pub mod geocode;
pub mod history;
pub mod model;
pub mod reconcile;
pub mod search;
pub mod severity;
pub mod store;

pub use coords::{Coords, extract_coords};
pub use geocode::{GeocodeResolver, NominatimGeocoder, PlaceComponents, ReverseGeocoder};
pub use history::{HistorySource, RemoteHistory, offline_history};
pub use model::{Alert, NewAlert};
pub use reconcile::{Reconciled, reconcile};
pub use search::{FILTER_TABS, HistoryFilter, query};
pub use severity::{PREDEFINED_TAGS, Severity, classify};
pub use store::AlertStore;
