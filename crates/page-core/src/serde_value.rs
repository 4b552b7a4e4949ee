use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::Document;

pub const PAGE_SCHEMA: &str = "kb-page";
pub const PAGE_VERSION: u32 = 1;

#[derive(Debug, Error)]
pub enum PageValueError {
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error("unsupported page schema {0:?}")]
    UnsupportedSchema(String),
    #[error("unsupported page version {found} (newest known is {})", PAGE_VERSION)]
    UnsupportedVersion { found: u32 },
}

/// Persisted form of a page: the document tree inside a versioned envelope.
/// Missing envelope fields read as the current schema and version.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageValue {
    #[serde(default = "PageValue::current_schema")]
    pub schema: String,
    #[serde(default = "PageValue::current_version")]
    pub version: u32,
    pub document: Document,
}

impl PageValue {
    fn current_schema() -> String {
        PAGE_SCHEMA.to_string()
    }

    fn current_version() -> u32 {
        PAGE_VERSION
    }

    pub fn from_document(document: Document) -> Self {
        Self {
            schema: Self::current_schema(),
            version: PAGE_VERSION,
            document,
        }
    }

    pub fn into_document(self) -> Document {
        self.document
    }

    pub fn to_json_pretty(&self) -> Result<String, PageValueError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Rejects envelopes written for another schema or a newer version.
    pub fn from_json_str(s: &str) -> Result<Self, PageValueError> {
        let value: Self = serde_json::from_str(s)?;
        if value.schema != PAGE_SCHEMA {
            return Err(PageValueError::UnsupportedSchema(value.schema));
        }
        if value.version > PAGE_VERSION {
            return Err(PageValueError::UnsupportedVersion {
                found: value.version,
            });
        }
        Ok(value)
    }
}
