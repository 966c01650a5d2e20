use std::fmt;
use std::ops::ControlFlow;

use crate::{Error, Result};

/// Maximum number of live listeners per table.
pub const MAX_LISTENERS: usize = 32;

/// Handle returned by [`ListenerTable::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u32);

/// A listener callback. Returning `ControlFlow::Break(())` unsubscribes it.
pub type Listener<E> = Box<dyn FnMut(&E) -> ControlFlow<()>>;

struct Slot<E> {
    id: ListenerId,
    callback: Listener<E>,
}

/// Slot array of listeners.
///
/// Removal leaves a tombstone in place instead of compacting, so a listener
/// can unsubscribe itself while [`ListenerTable::dispatch`] is iterating.
pub struct ListenerTable<E> {
    slots: Vec<Option<Slot<E>>>,
    next_id: u32,
}

impl<E> Default for ListenerTable<E> {
    fn default() -> Self {
        Self {
            slots: Vec::new(),
            next_id: 1,
        }
    }
}

impl<E> fmt::Debug for ListenerTable<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListenerTable")
            .field("live", &self.len())
            .field("slots", &self.slots.len())
            .finish()
    }
}

impl<E> ListenerTable<E> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a callback, reusing the first tombstoned slot.
    pub fn subscribe<F>(&mut self, callback: F) -> Result<ListenerId>
    where
        F: FnMut(&E) -> ControlFlow<()> + 'static,
    {
        let id = ListenerId(self.next_id);
        let slot = Slot {
            id,
            callback: Box::new(callback),
        };
        if let Some(free) = self.slots.iter_mut().find(|s| s.is_none()) {
            *free = Some(slot);
        } else if self.slots.len() < MAX_LISTENERS {
            self.slots.push(Some(slot));
        } else {
            return Err(Error::ListenerLimit(MAX_LISTENERS));
        }
        self.next_id = self.next_id.wrapping_add(1).max(1);
        Ok(id)
    }

    /// Tombstone a listener. Returns false if it was not registered.
    pub fn unsubscribe(&mut self, id: ListenerId) -> bool {
        for slot in self.slots.iter_mut() {
            if slot.as_ref().is_some_and(|s| s.id == id) {
                *slot = None;
                return true;
            }
        }
        false
    }

    /// Deliver an event to every live listener in registration order.
    pub fn dispatch(&mut self, event: &E) {
        for slot in self.slots.iter_mut() {
            let Some(live) = slot.as_mut() else {
                continue;
            };
            if (live.callback)(event).is_break() {
                log::trace!("listener {:?} unsubscribed during dispatch", live.id);
                *slot = None;
            }
        }
    }

    /// Number of live listeners.
    pub fn len(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
