use std::future::Future;

use kb_page_core::Path;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A file picked by the user for upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadFile {
    pub name: String,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

impl UploadFile {
    pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            content_type: None,
            bytes,
        }
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    /// Files without a declared type are left for the uploader to judge.
    pub(crate) fn check(&self) -> Result<(), UploadError> {
        if self.bytes.is_empty() {
            return Err(UploadError::EmptyFile(self.name.clone()));
        }
        match self.content_type.as_deref() {
            Some(ty) if !ty.trim().to_ascii_lowercase().starts_with("image/") => {
                Err(UploadError::NotAnImage(ty.to_string()))
            }
            _ => Ok(()),
        }
    }
}

#[derive(Debug, Error)]
pub enum UploadError {
    #[error("file {0:?} is empty")]
    EmptyFile(String),
    #[error("unsupported file type {0:?}")]
    NotAnImage(String),
    #[error("upload rejected: {0}")]
    Rejected(String),
    #[error("upload transport failed: {0}")]
    Transport(String),
    #[error("uploader returned an empty url")]
    EmptyUrl,
}

/// Stores an image somewhere reachable and returns its URL.
pub trait ImageUploader {
    fn upload(&self, file: UploadFile) -> impl Future<Output = Result<String, UploadError>>;
}

/// Result of one successful upload: the stored URL and where the image
/// node was inserted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadOutcome {
    pub src: String,
    pub path: Path,
}

pub fn block_on<F: Future>(future: F) -> F::Output {
    pollster::block_on(future)
}
