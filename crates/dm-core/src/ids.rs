use core::fmt;
use core::num::NonZeroU64;

/// Identifier an engine assigns to a component when it adopts it.
///
/// - `u64` so a long-lived engine never runs out in practice
/// - `NonZero` enables `Option<ComponentId>` (the "unassigned" state) to stay 8 bytes
///
/// Ids are the sole ordering key of the engine's component registry.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ComponentId(NonZeroU64);

impl ComponentId {
    /// The first id an [`IdFactory`] issues.
    pub const MIN: Self = Self(NonZeroU64::MIN);

    /// Wrap a raw value; `None` for zero.
    pub fn new(raw: u64) -> Option<Self> {
        NonZeroU64::new(raw).map(Self)
    }

    pub fn get(self) -> u64 {
        self.0.get()
    }
}

impl fmt::Debug for ComponentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ComponentId({})", self.get())
    }
}

impl fmt::Display for ComponentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.get())
    }
}

/// Monotonic id source owned by a single engine.
///
/// Issues 1, 2, 3, ... On exhaustion the sequence restarts at 1; the engine
/// detects the resulting collisions when it inserts into its registry.
#[derive(Debug, Clone)]
pub struct IdFactory {
    next: u64,
}

impl Default for IdFactory {
    fn default() -> Self {
        Self::new()
    }
}

impl IdFactory {
    pub fn new() -> Self {
        Self { next: 1 }
    }

    /// Start issuing at `first` (zero is treated as one).
    pub fn starting_at(first: u64) -> Self {
        Self {
            next: first.max(1),
        }
    }

    /// Issue the next id.
    pub fn next_id(&mut self) -> ComponentId {
        let id = ComponentId(NonZeroU64::new(self.next).unwrap_or(NonZeroU64::MIN));
        self.next = self.next.checked_add(1).unwrap_or(1);
        id
    }

    /// The id the next call to `next_id` will return.
    pub fn peek(&self) -> ComponentId {
        ComponentId(NonZeroU64::new(self.next).unwrap_or(NonZeroU64::MIN))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_is_not_an_id() {
        assert!(ComponentId::new(0).is_none());
        assert_eq!(ComponentId::new(7).map(ComponentId::get), Some(7));
    }

    #[test]
    fn option_id_is_small() {
        assert_eq!(
            core::mem::size_of::<ComponentId>(),
            core::mem::size_of::<Option<ComponentId>>()
        );
    }

    #[test]
    fn factory_is_monotonic() {
        let mut ids = IdFactory::new();
        let a = ids.next_id();
        let b = ids.next_id();
        let c = ids.next_id();
        assert_eq!((a.get(), b.get(), c.get()), (1, 2, 3));
        assert!(a < b && b < c);
        assert_eq!(ids.peek().get(), 4);
    }

    #[test]
    fn factory_wraps_to_one() {
        let mut ids = IdFactory::starting_at(u64::MAX);
        assert_eq!(ids.next_id().get(), u64::MAX);
        assert_eq!(ids.next_id().get(), 1);
    }

    #[test]
    fn ids_order_by_value() {
        let mut ids: Vec<ComponentId> = [5_u64, 1, 3]
            .into_iter()
            .filter_map(ComponentId::new)
            .collect();
        ids.sort();
        let raw: Vec<u64> = ids.into_iter().map(ComponentId::get).collect();
        assert_eq!(raw, vec![1, 3, 5]);
    }
}
