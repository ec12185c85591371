//! Severity classification for submitted alerts.
//!
//! Deterministic keyword engine: tags carry the primary signal, the free-text
//! description can escalate to [`Severity::High`] when it mentions a
//! life-threatening condition. Classification happens once at submission time
//! and is never recomputed.

use serde::{Deserialize, Serialize};

// ───────────────────────────── Severity levels ───────────────────────────

/// Urgency level of an alert. Fixed at creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Severity {
    High,
    Medium,
    Low,
}

impl Severity {
    pub fn icon(&self) -> &'static str {
        match self {
            Self::High => "🔴",
            Self::Medium => "🟠",
            Self::Low => "🟢",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::High => "High",
            Self::Medium => "Medium",
            Self::Low => "Low",
        }
    }

    /// Parse from a wire string (remote records store severity as text).
    /// Case-insensitive.
    pub fn from_wire_name(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "high" => Some(Self::High),
            "medium" => Some(Self::Medium),
            "low" => Some(Self::Low),
            _ => None,
        }
    }
}

// ───────────────────────────── Keyword tables ────────────────────────────

/// Tag vocabulary offered on the submission form. Unknown tags still pass
/// through the engine untouched.
pub const PREDEFINED_TAGS: &[&str] = &["food", "injury", "lost", "trapped", "suspicious", "other"];

/// Tags that indicate immediate risk to life.
const HIGH_SEVERITY_TAGS: &[&str] = &["injury", "trapped"];

/// Tags that indicate urgency without immediate life risk.
const MEDIUM_SEVERITY_TAGS: &[&str] = &["lost", "suspicious"];

/// Description substrings that escalate to High regardless of tags.
const CRITICAL_KEYWORDS: &[&str] = &[
    "bleeding",
    "unconscious",
    "heart",
    "breathing",
    "chest pain",
    "stroke",
];

// ───────────────────────────── Classification ────────────────────────────

/// Classify an alert from its tags and free-text description.
///
/// High wins and short-circuits: any life-risk tag or any critical keyword in
/// the (lowercased) description. Otherwise Medium on an urgency tag,
/// otherwise Low. Tag combinations beyond category membership do not escalate
/// further.
pub fn classify(tags: &[String], description: &str) -> Severity {
    let lower = description.to_lowercase();

    if tags.iter().any(|t| HIGH_SEVERITY_TAGS.contains(&t.as_str()))
        || CRITICAL_KEYWORDS.iter().any(|kw| lower.contains(kw))
    {
        return Severity::High;
    }

    if tags.iter().any(|t| MEDIUM_SEVERITY_TAGS.contains(&t.as_str())) {
        return Severity::Medium;
    }

    Severity::Low
}

// ─────────────────────────────── Tests ───────────────────────────────────
