use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::{Rc, Weak};

use serde::{Deserialize, Serialize};
use tracing::debug;

/// Global event hooks a gesture or popover may hold while it is active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ListenerKind {
    PointerMove,
    PointerUp,
    OutsideClick,
}

#[derive(Default)]
struct ListenerTable {
    next_id: u64,
    active: BTreeMap<u64, ListenerKind>,
}

/// Tracks which global listeners are attached. Listeners are only reachable
/// through [`ListenerGuard`]s, and dropping a guard detaches its listener.
#[derive(Clone, Default)]
pub struct ListenerRegistry {
    table: Rc<RefCell<ListenerTable>>,
}

impl ListenerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn acquire(&self, kind: ListenerKind) -> ListenerGuard {
        let id = {
            let mut table = self.table.borrow_mut();
            table.next_id += 1;
            let id = table.next_id;
            table.active.insert(id, kind);
            id
        };
        debug!(id, ?kind, "listener attached");
        ListenerGuard {
            id,
            kind,
            table: Rc::downgrade(&self.table),
        }
    }

    pub fn active_count(&self) -> usize {
        self.table.borrow().active.len()
    }

    pub fn is_attached(&self, kind: ListenerKind) -> bool {
        self.table.borrow().active.values().any(|k| *k == kind)
    }

    pub fn active_kinds(&self) -> Vec<ListenerKind> {
        self.table.borrow().active.values().copied().collect()
    }
}

impl std::fmt::Debug for ListenerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ListenerRegistry")
            .field("active", &self.active_kinds())
            .finish()
    }
}

/// Scoped ownership of one attached listener.
#[derive(Debug)]
pub struct ListenerGuard {
    id: u64,
    kind: ListenerKind,
    table: Weak<RefCell<ListenerTable>>,
}

impl ListenerGuard {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn kind(&self) -> ListenerKind {
        self.kind
    }
}

impl Drop for ListenerGuard {
    fn drop(&mut self) {
        let Some(table) = self.table.upgrade() else {
            return;
        };
        if table.borrow_mut().active.remove(&self.id).is_some() {
            debug!(id = self.id, kind = ?self.kind, "listener released");
        }
    }
}
