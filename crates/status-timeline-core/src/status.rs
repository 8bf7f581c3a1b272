//! Status vocabulary and canonicalization.
//!
//! The vocabulary is a closed set of four labels. Bracket tags are matched
//! against it verbatim (after normalization); structured-template values go
//! through the synonym table in [`canonicalize`] first.
//!
//! | Template value | Canonical label |
//! |----------------|-----------------|
//! | `found` | `found media` |
//! | `lost` | `completely lost media` |
//! | `partially lost` | `partially lost media` |
//! | `partially found` | `partially found media` |

use std::fmt;

use serde::{Serialize, Serializer};

/// One of the four whitelisted status classifications.
///
/// Variant order is the vocabulary's alphabetical order, which is also the
/// order used for display and export.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum CanonicalStatus {
    CompletelyLost,
    Found,
    PartiallyFound,
    PartiallyLost,
}

impl CanonicalStatus {
    pub const ALL: [CanonicalStatus; 4] = [
        CanonicalStatus::CompletelyLost,
        CanonicalStatus::Found,
        CanonicalStatus::PartiallyFound,
        CanonicalStatus::PartiallyLost,
    ];

    /// The stored category label.
    pub fn label(&self) -> &'static str {
        match self {
            CanonicalStatus::CompletelyLost => "completely lost media",
            CanonicalStatus::Found => "found media",
            CanonicalStatus::PartiallyFound => "partially found media",
            CanonicalStatus::PartiallyLost => "partially lost media",
        }
    }

    /// Look up an already-normalized category label in the vocabulary.
    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.label() == label)
    }

    /// All vocabulary labels, for whitelist queries.
    pub fn labels() -> [&'static str; 4] {
        Self::ALL.map(|s| s.label())
    }
}

impl fmt::Display for CanonicalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl Serialize for CanonicalStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.label())
    }
}

/// Normalize a raw category label: trim, lowercase, and turn underscores
/// and hyphens into spaces.
///
/// Garbage stays garbage; nothing is rejected here.
pub fn normalize_label(raw: &str) -> String {
    raw.trim().to_lowercase().replace(['_', '-'], " ")
}

/// Map a raw structured-template `status=` value onto the vocabulary.
///
/// Returns `None` for anything outside the synonym table, including values
/// that are themselves canonical labels (`found media` is not a template
/// value).
pub fn canonicalize(raw_status: &str) -> Option<CanonicalStatus> {
    match normalize_label(raw_status).as_str() {
        "found" => Some(CanonicalStatus::Found),
        "lost" => Some(CanonicalStatus::CompletelyLost),
        "partially lost" => Some(CanonicalStatus::PartiallyLost),
        "partially found" => Some(CanonicalStatus::PartiallyFound),
        _ => None,
    }
}
