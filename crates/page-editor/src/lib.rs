mod error;
mod listeners;
mod popover;
mod resize;
mod session;
mod table_picker;
mod upload;

pub use crate::error::SessionError;
pub use crate::listeners::{ListenerGuard, ListenerKind, ListenerRegistry};
pub use crate::popover::{ActivePopover, PopoverKind, PopoverOwner};
pub use crate::resize::{
    ImageResize, PointerPosition, PreviewSize, RenderedSize, ResizeCommit, ResizeCorner,
    ResizeGesture,
};
pub use crate::session::EditorSession;
pub use crate::table_picker::{GridSize, TableGridPicker};
pub use crate::upload::{ImageUploader, UploadError, UploadFile, UploadOutcome, block_on};
