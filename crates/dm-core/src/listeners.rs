//! Observer lists with detachable entries.

use core::fmt;

/// Handle returned when a listener is attached; pass it back to detach.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(u64);

/// Listeners in attach order. Handles are never reused within one set.
pub struct ListenerSet<L: ?Sized> {
    next: u64,
    entries: Vec<(ListenerId, Box<L>)>,
}

impl<L: ?Sized> Default for ListenerSet<L> {
    fn default() -> Self {
        Self {
            next: 0,
            entries: Vec::new(),
        }
    }
}

impl<L: ?Sized> ListenerSet<L> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, listener: Box<L>) -> ListenerId {
        let id = ListenerId(self.next);
        self.next += 1;
        self.entries.push((id, listener));
        id
    }

    /// Detach one listener; `None` if the handle is unknown or already removed.
    pub fn remove(&mut self, id: ListenerId) -> Option<Box<L>> {
        let index = self.entries.iter().position(|(e, _)| *e == id)?;
        Some(self.entries.remove(index).1)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut L> {
        self.entries.iter_mut().map(|(_, l)| l.as_mut())
    }
}

impl<L: ?Sized> fmt::Debug for ListenerSet<L> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.entries.iter().map(|(id, _)| id))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn removal_detaches_only_the_named_listener() {
        let mut set: ListenerSet<dyn FnMut() -> u8> = ListenerSet::new();
        let a = set.add(Box::new(|| 1));
        let b = set.add(Box::new(|| 2));
        let c = set.add(Box::new(|| 3));

        assert!(set.remove(b).is_some());
        assert!(set.remove(b).is_none());
        let left: Vec<u8> = set.iter_mut().map(|l| l()).collect();
        assert_eq!(left, vec![1, 3]);

        let d = set.add(Box::new(|| 4));
        assert!(d != a && d != b && d != c);
        assert_eq!(set.len(), 3);
        set.clear();
        assert!(set.is_empty());
    }
}
