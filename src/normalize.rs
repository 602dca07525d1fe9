//! Maps raw upstream search payloads into canonical [`MovieRecord`]s.
//!
//! Upstream providers disagree on response layout, so the mapping is keyed by a
//! closed [`ResponseShape`]. A payload whose top-level path is missing yields
//! no records rather than an error.
use crate::models::{MovieRecord, MISSING_ID, MISSING_YEAR, UNKNOWN_TITLE};
use serde_json::Value;

static NULL: Value = Value::Null;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseShape {
    /// `{data:{mainSearch:{edges:[{node:{entity:{...}}}]}}}`
    MainSearch,
    /// `{d:[{id, l, i:{imageUrl}, y}]}`
    Legacy,
    /// `{Search:[{imdbID, Title, Poster, Year}]}`
    Omdb,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NormalizeOptions {
    pub require_image: bool,
}

impl Default for NormalizeOptions {
    fn default() -> Self {
        Self {
            require_image: true,
        }
    }
}

impl ResponseShape {
    pub const ALL: [ResponseShape; 3] = [
        ResponseShape::MainSearch,
        ResponseShape::Legacy,
        ResponseShape::Omdb,
    ];

    /// First shape whose entry list is present in `raw`.
    pub fn detect(raw: &Value) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|shape| shape.entries(raw).is_some())
    }

    fn entries<'a>(&self, raw: &'a Value) -> Option<&'a Vec<Value>> {
        let list = match self {
            ResponseShape::MainSearch => raw
                .get("data")
                .and_then(|d| d.get("mainSearch"))
                .and_then(|m| m.get("edges")),
            ResponseShape::Legacy => raw.get("d"),
            ResponseShape::Omdb => raw.get("Search"),
        };
        list.and_then(|l| l.as_array())
    }

    fn map_entry(&self, entry: &Value) -> MovieRecord {
        match self {
            ResponseShape::MainSearch => {
                let entity = entry
                    .get("node")
                    .and_then(|n| n.get("entity"))
                    .unwrap_or(&NULL);
                MovieRecord {
                    id: text_at(entity, &["id"]).unwrap_or_else(|| MISSING_ID.to_string()),
                    title: text_at(entity, &["titleText", "originalTitleText", "text"])
                        .or_else(|| text_at(entity, &["titleText", "text"]))
                        .or_else(|| text_at(entity, &["originalTitleText", "text"]))
                        .unwrap_or_else(|| UNKNOWN_TITLE.to_string()),
                    image: text_at(entity, &["primaryImage", "url"]).unwrap_or_default(),
                    year: text_at(entity, &["releaseYear", "year"])
                        .unwrap_or_else(|| MISSING_YEAR.to_string()),
                    date_added: None,
                }
            }
            ResponseShape::Legacy => MovieRecord {
                id: text_at(entry, &["id"]).unwrap_or_else(|| MISSING_ID.to_string()),
                title: text_at(entry, &["l"]).unwrap_or_else(|| UNKNOWN_TITLE.to_string()),
                image: text_at(entry, &["i", "imageUrl"]).unwrap_or_default(),
                year: text_at(entry, &["y"]).unwrap_or_else(|| MISSING_YEAR.to_string()),
                date_added: None,
            },
            ResponseShape::Omdb => MovieRecord {
                id: text_at(entry, &["imdbID"]).unwrap_or_else(|| MISSING_ID.to_string()),
                title: text_at(entry, &["Title"]).unwrap_or_else(|| UNKNOWN_TITLE.to_string()),
                // OMDb reports a missing poster as the literal "N/A".
                image: text_at(entry, &["Poster"])
                    .filter(|p| p != "N/A")
                    .unwrap_or_default(),
                year: text_at(entry, &["Year"]).unwrap_or_else(|| MISSING_YEAR.to_string()),
                date_added: None,
            },
        }
    }
}

/// Normalize `raw` assuming it has the given `shape`.
pub fn normalize(shape: ResponseShape, raw: &Value, options: NormalizeOptions) -> Vec<MovieRecord> {
    let Some(entries) = shape.entries(raw) else {
        return Vec::new();
    };
    entries
        .iter()
        .map(|entry| shape.map_entry(entry))
        .filter(|record| !options.require_image || record.has_image())
        .collect()
}

/// Normalize `raw` using whichever known shape it matches.
pub fn normalize_any(raw: &Value, options: NormalizeOptions) -> Vec<MovieRecord> {
    match ResponseShape::detect(raw) {
        Some(shape) => normalize(shape, raw, options),
        None => Vec::new(),
    }
}

/// Non-empty string (or non-zero number, rendered in decimal) at `path`.
/// Whitespace-only strings count as present; `""` and `0` count as missing.
fn text_at(value: &Value, path: &[&str]) -> Option<String> {
    let mut current = value;
    for key in path {
        current = current.get(*key)?;
    }
    match current {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) if n.as_f64() != Some(0.0) => Some(n.to_string()),
        _ => None,
    }
}
