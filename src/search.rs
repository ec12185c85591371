//! Search and category filtering over the reconciled collection.
//!
//! Pure and synchronous; presentation code recomputes the view on every
//! change to the query or the collection. Result order follows the input
//! collection – no re-sort.

use crate::model::Alert;
use crate::severity::Severity;

// ─────────────────────────── Filter tabs ─────────────────────────────────

/// Category filter tabs shown above the history list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HistoryFilter {
    #[default]
    All,
    High,
    Medium,
    Low,
    Completed,
}

/// Tab order as presented in the UI.
pub const FILTER_TABS: &[HistoryFilter] = &[
    HistoryFilter::All,
    HistoryFilter::High,
    HistoryFilter::Medium,
    HistoryFilter::Low,
    HistoryFilter::Completed,
];

impl HistoryFilter {
    pub fn label(&self) -> &'static str {
        match self {
            Self::All => "All",
            Self::High => "High",
            Self::Medium => "Medium",
            Self::Low => "Low",
            Self::Completed => "Completed",
        }
    }

    /// Parse from a tab label. Case-insensitive.
    pub fn from_label(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "all" => Some(Self::All),
            "high" => Some(Self::High),
            "medium" => Some(Self::Medium),
            "low" => Some(Self::Low),
            "completed" => Some(Self::Completed),
            _ => None,
        }
    }

    /// Category predicate. A completed alert is only reachable through the
    /// Completed tab, never through its severity tab.
    fn matches(&self, alert: &Alert) -> bool {
        match self {
            Self::All => true,
            Self::Completed => alert.completed,
            Self::High => alert.severity == Severity::High && !alert.completed,
            Self::Medium => alert.severity == Severity::Medium && !alert.completed,
            Self::Low => alert.severity == Severity::Low && !alert.completed,
        }
    }
}

// ─────────────────────────────── Query ───────────────────────────────────

/// Apply the text and category predicates, ANDed, preserving input order.
///
/// The text predicate is a case-insensitive substring match against the
/// reporter name, the reporter phone, or any tag; an empty query matches
/// everything.
pub fn query<'a>(alerts: &'a [Alert], search: &str, filter: HistoryFilter) -> Vec<&'a Alert> {
    let needle = search.to_lowercase();

    alerts
        .iter()
        .filter(|a| {
            let text_match = needle.is_empty()
                || a.name.to_lowercase().contains(&needle)
                || a.phone.to_lowercase().contains(&needle)
                || a.tags.iter().any(|t| t.to_lowercase().contains(&needle));
            text_match && filter.matches(a)
        })
        .collect()
}

// ─────────────────────────────── Tests ───────────────────────────────────
