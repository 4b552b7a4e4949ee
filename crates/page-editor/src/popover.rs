use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::listeners::{ListenerGuard, ListenerKind, ListenerRegistry};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PopoverKind {
    TextColor,
    Highlight,
    CellColor,
    TableMenu,
    TableGrid,
    Link,
    HeadingMenu,
}

impl PopoverKind {
    pub fn is_color_picker(self) -> bool {
        matches!(
            self,
            PopoverKind::TextColor | PopoverKind::Highlight | PopoverKind::CellColor
        )
    }
}

/// The open popover together with the outside-click listener it holds.
#[derive(Debug)]
pub struct ActivePopover {
    kind: PopoverKind,
    _outside_click: ListenerGuard,
}

impl ActivePopover {
    pub fn kind(&self) -> PopoverKind {
        self.kind
    }
}

/// At most one popover is open. Opening one replaces the previous owner.
#[derive(Debug, Default)]
pub struct PopoverOwner {
    active: Option<ActivePopover>,
}

impl PopoverOwner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn active(&self) -> Option<PopoverKind> {
        self.active.as_ref().map(ActivePopover::kind)
    }

    pub fn is_open(&self, kind: PopoverKind) -> bool {
        self.active() == Some(kind)
    }

    /// Returns the popover that was closed to make room, if any.
    pub fn open(&mut self, kind: PopoverKind, listeners: &ListenerRegistry) -> Option<PopoverKind> {
        let previous = self.close();
        debug!(?kind, ?previous, "popover opened");
        self.active = Some(ActivePopover {
            kind,
            _outside_click: listeners.acquire(ListenerKind::OutsideClick),
        });
        previous
    }

    pub fn close(&mut self) -> Option<PopoverKind> {
        let closed = self.active.take().map(|active| active.kind);
        if let Some(kind) = closed {
            debug!(?kind, "popover closed");
        }
        closed
    }

    /// Returns whether `kind` is open afterwards.
    pub fn toggle(&mut self, kind: PopoverKind, listeners: &ListenerRegistry) -> bool {
        if self.is_open(kind) {
            self.close();
            false
        } else {
            self.open(kind, listeners);
            true
        }
    }

    /// A click or focus change outside the open popover closes it.
    pub fn outside_interaction(&mut self) -> Option<PopoverKind> {
        self.close()
    }
}
