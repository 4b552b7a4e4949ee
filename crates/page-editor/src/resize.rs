//! Pointer-driven image resizing.
//!
//! A gesture starts on a corner handle, follows horizontal pointer movement
//! and commits a rounded size when the pointer is released. Height is always
//! derived from the aspect ratio captured at the start of the gesture.

use kb_page_core::{DEFAULT_MIN_IMAGE_WIDTH, Path};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::SessionError;
use crate::listeners::{ListenerGuard, ListenerKind, ListenerRegistry};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResizeCorner {
    #[serde(rename = "ne")]
    NorthEast,
    #[serde(rename = "se")]
    SouthEast,
    #[serde(rename = "sw")]
    SouthWest,
    #[serde(rename = "nw")]
    NorthWest,
}

impl ResizeCorner {
    pub const ALL: [ResizeCorner; 4] = [
        ResizeCorner::NorthEast,
        ResizeCorner::SouthEast,
        ResizeCorner::SouthWest,
        ResizeCorner::NorthWest,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ResizeCorner::NorthEast => "ne",
            ResizeCorner::SouthEast => "se",
            ResizeCorner::SouthWest => "sw",
            ResizeCorner::NorthWest => "nw",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.as_str() == value.trim())
    }

    /// Eastern handles grow the image as the pointer moves right.
    fn width_delta(self, delta_x: f64) -> f64 {
        match self {
            ResizeCorner::NorthEast | ResizeCorner::SouthEast => delta_x,
            ResizeCorner::SouthWest | ResizeCorner::NorthWest => -delta_x,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PointerPosition {
    pub x: f64,
    pub y: f64,
}

impl PointerPosition {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Size the image is displayed at: its explicit size, or its natural size
/// when it has none yet.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RenderedSize {
    pub width: f64,
    pub height: f64,
}

impl RenderedSize {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    fn is_usable(&self) -> bool {
        self.width.is_finite() && self.height.is_finite() && self.width > 0.0 && self.height > 0.0
    }
}

/// Transient, uncommitted size shown while dragging.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PreviewSize {
    pub width: f64,
    pub height: f64,
}

/// Final size written to the image node when a gesture ends.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResizeCommit {
    pub path: Path,
    pub width: u32,
    pub height: u32,
}

#[derive(Debug)]
pub struct ResizeGesture {
    path: Path,
    corner: ResizeCorner,
    origin: PointerPosition,
    origin_width: f64,
    origin_height: f64,
    aspect_ratio: f64,
    min_width: f64,
    preview: PreviewSize,
    _pointer_move: ListenerGuard,
    _pointer_up: ListenerGuard,
}

impl ResizeGesture {
    pub fn path(&self) -> &[usize] {
        &self.path
    }

    pub fn corner(&self) -> ResizeCorner {
        self.corner
    }

    pub fn origin(&self) -> PointerPosition {
        self.origin
    }

    pub fn origin_size(&self) -> RenderedSize {
        RenderedSize::new(self.origin_width, self.origin_height)
    }

    /// Width over height, fixed for the whole gesture.
    pub fn aspect_ratio(&self) -> f64 {
        self.aspect_ratio
    }

    pub fn preview(&self) -> PreviewSize {
        self.preview
    }

    fn size_for(&self, pointer: PointerPosition) -> PreviewSize {
        let candidate = self.origin_width + self.corner.width_delta(pointer.x - self.origin.x);
        let width = candidate.max(self.min_width);
        PreviewSize {
            width,
            height: width / self.aspect_ratio,
        }
    }

    fn commit(&self) -> ResizeCommit {
        ResizeCommit {
            path: self.path.clone(),
            width: round_dimension(self.preview.width),
            height: round_dimension(self.preview.height),
        }
    }
}

/// Height has no floor of its own; rounding to zero is lifted to one pixel so
/// the committed size stays a valid explicit size.
fn round_dimension(value: f64) -> u32 {
    let rounded = value.round();
    if rounded < 1.0 {
        1
    } else if rounded > u32::MAX as f64 {
        u32::MAX
    } else {
        rounded as u32
    }
}

/// `Idle` or `Resizing`. The pointer listeners of a gesture live exactly as
/// long as the `Resizing` state holding them.
#[derive(Debug, Default)]
pub enum ImageResize {
    #[default]
    Idle,
    Resizing(ResizeGesture),
}

impl ImageResize {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_resizing(&self) -> bool {
        matches!(self, ImageResize::Resizing(_))
    }

    pub fn gesture(&self) -> Option<&ResizeGesture> {
        match self {
            ImageResize::Resizing(gesture) => Some(gesture),
            ImageResize::Idle => None,
        }
    }

    /// Starts a gesture on `corner`, replacing any gesture in progress.
    pub fn begin(
        &mut self,
        listeners: &ListenerRegistry,
        path: Path,
        corner: ResizeCorner,
        pointer: PointerPosition,
        rendered: RenderedSize,
        min_width: u32,
    ) -> Result<(), SessionError> {
        if !rendered.is_usable() {
            return Err(SessionError::InvalidRenderedSize {
                width: rendered.width,
                height: rendered.height,
            });
        }

        self.cancel();
        let min_width = if min_width == 0 {
            DEFAULT_MIN_IMAGE_WIDTH
        } else {
            min_width
        };
        debug!(?path, corner = corner.as_str(), "image resize started");
        *self = ImageResize::Resizing(ResizeGesture {
            path,
            corner,
            origin: pointer,
            origin_width: rendered.width,
            origin_height: rendered.height,
            aspect_ratio: rendered.width / rendered.height,
            min_width: f64::from(min_width),
            preview: PreviewSize {
                width: rendered.width,
                height: rendered.height,
            },
            _pointer_move: listeners.acquire(ListenerKind::PointerMove),
            _pointer_up: listeners.acquire(ListenerKind::PointerUp),
        });
        Ok(())
    }

    /// Follows the pointer. Vertical movement is ignored.
    pub fn update(&mut self, pointer: PointerPosition) -> Option<PreviewSize> {
        let ImageResize::Resizing(gesture) = self else {
            return None;
        };
        gesture.preview = gesture.size_for(pointer);
        Some(gesture.preview)
    }

    /// Ends the gesture and returns the size to commit.
    pub fn end(&mut self) -> Option<ResizeCommit> {
        let ImageResize::Resizing(gesture) = std::mem::take(self) else {
            return None;
        };
        Some(gesture.commit())
    }

    /// Abandons the gesture without a commit.
    pub fn cancel(&mut self) -> bool {
        let was_resizing = self.is_resizing();
        if was_resizing {
            debug!("image resize cancelled");
        }
        *self = ImageResize::Idle;
        was_resizing
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rounding_keeps_dimensions_positive() {
        assert_eq!(round_dimension(0.2), 1);
        assert_eq!(round_dimension(99.5), 100);
        assert_eq!(round_dimension(150.49), 150);
    }
}
