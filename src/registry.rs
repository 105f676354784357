/*
 * Side-table from an OS-facing key (a window handle, a subclass id) to the
 * wrapper that owns it. Entries hold `Weak` references only: the wrapper
 * object owns its state, the table merely finds it. An entry is written when
 * the OS reports creation and removed when it reports final destruction, so a
 * lookup outside that window yields "no owner".
 */

use std::collections::HashMap;
use std::hash::Hash;
use std::rc::{Rc, Weak};

#[derive(Debug)]
pub(crate) struct OwnerTable<K, T> {
    owners: HashMap<K, Weak<T>>,
}

impl<K: Eq + Hash + Copy + std::fmt::Debug, T> OwnerTable<K, T> {
    pub(crate) fn new() -> Self {
        Self {
            owners: HashMap::new(),
        }
    }

    pub(crate) fn attach(&mut self, key: K, owner: Weak<T>) {
        if self.owners.insert(key, owner).is_some() {
            log::warn!("OwnerTable: key {key:?} was already attached, previous owner replaced.");
        }
    }

    pub(crate) fn detach(&mut self, key: K) -> bool {
        self.owners.remove(&key).is_some()
    }

    // A dead weak entry counts as "no owner".
    pub(crate) fn lookup(&self, key: K) -> Option<Rc<T>> {
        self.owners.get(&key).and_then(Weak::upgrade)
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.owners.len()
    }
}
