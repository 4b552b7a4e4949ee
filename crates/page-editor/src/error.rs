use kb_page_core::{CommandError, Path, QueryError};
use thiserror::Error;

use crate::upload::UploadError;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Command(#[from] CommandError),
    #[error(transparent)]
    Query(#[from] QueryError),
    #[error("no image at path {0:?}")]
    ImageNotFound(Path),
    #[error("image has no usable rendered size ({width}x{height})")]
    InvalidRenderedSize { width: f64, height: f64 },
    #[error("no color popover is open")]
    NoColorPopover,
    #[error("image upload failed: {0}")]
    Upload(#[from] UploadError),
}
