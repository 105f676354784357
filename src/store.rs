/*
 * Ordered storage of message identifiers and the closures registered for them.
 *
 * Registrations are append-only. Lookup walks the entries from the most recent
 * one backward, so a later registration for a key shadows an earlier one. A
 * closure registered under several keys is stored once; the extra keys hold a
 * forward to the index of the stored closure.
 */

use crate::error::Result as PlatformResult;
use crate::types::RawParams;

/// A user handler: receives the raw parameter pair and returns the value handed
/// back to the OS, or a fault for the fault boundary.
pub type Handler = Box<dyn Fn(RawParams) -> PlatformResult<isize>>;

enum Slot {
    Owned(Handler),
    Forward(usize),
}

pub(crate) struct HandlerStore<K> {
    entries: Vec<(K, Slot)>,
}

impl<K: Copy + PartialEq> HandlerStore<K> {
    pub(crate) fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    pub(crate) fn add(&mut self, key: K, handler: Handler) {
        self.entries.push((key, Slot::Owned(handler)));
    }

    /*
     * Stores `handler` once under the first key; every further distinct key gets
     * a forward to it. Keys repeated within the same call are skipped.
     */
    pub(crate) fn add_many(&mut self, keys: &[K], handler: Handler) {
        let Some((&first, rest)) = keys.split_first() else {
            log::warn!("HandlerStore: add_many called with no keys, handler dropped.");
            return;
        };
        self.add(first, handler);
        let owner_index = self.entries.len() - 1;

        let mut seen = vec![first];
        for &key in rest {
            if seen.contains(&key) {
                continue;
            }
            seen.push(key);
            self.entries.push((key, Slot::Forward(owner_index)));
        }
    }

    pub(crate) fn find(&self, key: K) -> Option<&Handler> {
        let (_, slot) = self.entries.iter().rev().find(|(k, _)| *k == key)?;
        match slot {
            Slot::Owned(handler) => Some(handler),
            Slot::Forward(index) => match &self.entries[*index].1 {
                Slot::Owned(handler) => Some(handler),
                // Forwards only ever point at owned slots.
                Slot::Forward(_) => None,
            },
        }
    }
}

impl<K: Copy + PartialEq> Default for HandlerStore<K> {
    fn default() -> Self {
        Self::new()
    }
}
