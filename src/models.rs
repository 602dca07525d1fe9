use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

pub const MISSING_ID: &str = "N/A";
pub const MISSING_YEAR: &str = "N/A";
pub const UNKNOWN_TITLE: &str = "Unknown Title";

/// Canonical movie record shared by search results and the watchlist.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct MovieRecord {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub image: String,
    #[serde(default = "missing_year")]
    pub year: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_added: Option<String>,
}

fn missing_year() -> String {
    MISSING_YEAR.to_string()
}

impl MovieRecord {
    pub fn new(
        id: impl Into<String>,
        title: impl Into<String>,
        image: impl Into<String>,
        year: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            image: image.into(),
            year: year.into(),
            date_added: None,
        }
    }

    /// Copy of this record stamped with the current UTC time.
    pub fn stamped_now(&self) -> Self {
        Self {
            date_added: Some(Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)),
            ..self.clone()
        }
    }

    pub fn has_image(&self) -> bool {
        !self.image.is_empty()
    }
}
