//! Category extraction from raw revision wikitext.
//!
//! Two independent rules feed one normalized label set:
//!
//! - **Tag rule** — every `[[Category:<label>]]` marker whose label consists
//!   of word characters, spaces, and hyphens. A `|sortkey` suffix is
//!   ignored. Markers with any other character in the label are dropped.
//! - **Template rule** — the `status=` field of the first structured status
//!   template (`{{LMW|...|status=lost|...}}` by default). The value is mapped
//!   through [`canonicalize`]; values outside the synonym table are dropped.
//!
//! Every tag label is normalized with [`normalize_label`] and kept even if
//! it is not a status, so odd categories stay visible for inspection. Only
//! vocabulary labels take part in aggregation downstream.
//!
//! # Example
//!
//! ```rust
//! use status_timeline_core::extract::Extractor;
//!
//! let extractor = Extractor::new("LMW").unwrap();
//! let labels = extractor.extract(Some("{{LMW|type=film|status=lost}}\n[[Category:Lost_Films]]"));
//! let names: Vec<&str> = labels.iter().map(|l| l.label.as_str()).collect();
//! assert_eq!(names, vec!["lost films", "completely lost media"]);
//! ```

use std::collections::BTreeSet;
use std::sync::OnceLock;

use anyhow::{Context, Result};
use regex::Regex;

use crate::models::{CategoryFact, Provenance, Revision};
use crate::status::{canonicalize, normalize_label};

/// Template name used by the wiki's status infobox.
pub const DEFAULT_STATUS_TEMPLATE: &str = "LMW";

/// A normalized label together with the rule that produced it.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct ExtractedLabel {
    pub provenance: Provenance,
    pub label: String,
}

fn category_tag_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"\[\[Category:([\w -]+)(?:\|[^\]]*)?\]\]").expect("category tag regex")
    })
}

/// Rule A: all parseable `[[Category:...]]` labels, normalized, in order of
/// appearance (duplicates included).
pub fn extract_tags(text: &str) -> Vec<String> {
    category_tag_regex()
        .captures_iter(text)
        .map(|caps| normalize_label(&caps[1]))
        .collect()
}

/// Runs both extraction rules over revision text.
#[derive(Debug, Clone)]
pub struct Extractor {
    template_open: Regex,
}

impl Extractor {
    /// Build an extractor for the named status template.
    pub fn new(status_template: &str) -> Result<Self> {
        let pattern = format!(r"\{{\{{\s*{}\s*", regex::escape(status_template.trim()));
        let template_open = Regex::new(&pattern)
            .with_context(|| format!("invalid status template name: {}", status_template))?;
        Ok(Self { template_open })
    }

    /// Extract every label declared by `text`. `None` and empty text yield
    /// an empty set.
    ///
    /// The result is ordered tag labels first, then the template status.
    pub fn extract(&self, text: Option<&str>) -> BTreeSet<ExtractedLabel> {
        let mut labels = BTreeSet::new();
        let text = match text {
            Some(t) if !t.is_empty() => t,
            _ => return labels,
        };

        for label in extract_tags(text) {
            labels.insert(ExtractedLabel {
                provenance: Provenance::Tag,
                label,
            });
        }

        if let Some(status) = self.extract_raw_status(text).and_then(|raw| canonicalize(&raw)) {
            labels.insert(ExtractedLabel {
                provenance: Provenance::Template,
                label: status.label().to_string(),
            });
        }

        labels
    }

    /// Category facts for one revision, one per distinct label. When both
    /// rules produce the same label the tag rule's provenance wins.
    pub fn facts(&self, revision: &Revision) -> Vec<CategoryFact> {
        let mut seen = BTreeSet::new();
        self.extract(revision.content.as_deref())
            .into_iter()
            .filter(|l| seen.insert(l.label.clone()))
            .map(|l| CategoryFact {
                rev_id: revision.rev_id,
                category: l.label,
                provenance: l.provenance,
            })
            .collect()
    }

    /// Rule B: the raw `status=` value of the first status template that
    /// carries a well-formed one. A value is well-formed when it is made of
    /// word characters, spaces, and hyphens; malformed values are skipped.
    pub fn extract_raw_status(&self, text: &str) -> Option<String> {
        for open in self.template_open.find_iter(text) {
            let rest = &text[open.end()..];
            if !(rest.starts_with('|') || rest.starts_with("}}")) {
                // A longer template name that merely shares the prefix.
                continue;
            }
            let fields = match template_fields(rest) {
                Some(f) => f,
                None => continue,
            };
            let status = fields.iter().find_map(|field| {
                let (key, value) = field.split_once('=')?;
                (key.trim() == "status").then(|| value.trim())
            });
            if let Some(value) = status {
                let valid = !value.is_empty()
                    && value
                        .chars()
                        .all(|c| c.is_alphanumeric() || c == '_' || c == ' ' || c == '-');
                if valid {
                    return Some(value.to_string());
                }
            }
        }
        None
    }
}

/// Split a template body into its top-level `|` fields.
///
/// `body` starts right after the template name and runs to the end of the
/// text. Nested `{{...}}` and `[[...]]` are skipped over so that pipes inside
/// links or inner templates do not split fields. Returns `None` when the
/// closing `}}` is missing.
fn template_fields(body: &str) -> Option<Vec<String>> {
    let bytes = body.as_bytes();
    let mut fields = Vec::new();
    let mut current: Option<usize> = None;
    let mut braces = 0usize;
    let mut brackets = 0usize;
    let mut i = 0;

    while i < bytes.len() {
        let pair = &bytes[i..bytes.len().min(i + 2)];
        match pair {
            b"{{" => {
                braces += 1;
                i += 2;
                continue;
            }
            b"[[" => {
                brackets += 1;
                i += 2;
                continue;
            }
            b"]]" if brackets > 0 => {
                brackets -= 1;
                i += 2;
                continue;
            }
            b"}}" if braces > 0 => {
                braces -= 1;
                i += 2;
                continue;
            }
            b"}}" => {
                if let Some(start) = current {
                    fields.push(body[start..i].to_string());
                }
                return Some(fields);
            }
            _ => {}
        }
        if bytes[i] == b'|' && braces == 0 && brackets == 0 {
            if let Some(start) = current {
                fields.push(body[start..i].to_string());
            }
            current = Some(i + 1);
        }
        i += 1;
    }

    None
}
