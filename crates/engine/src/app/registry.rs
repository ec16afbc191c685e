use tracing::{debug, info};

/// Long-lived session actors that survive ordinary level loads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActorKind {
    Player,
    Camera,
    HealthTracker,
    SessionRoot,
    UiRoot,
}

const KIND_COUNT: usize = 5;

impl ActorKind {
    pub const ALL: [ActorKind; KIND_COUNT] = [
        ActorKind::Player,
        ActorKind::Camera,
        ActorKind::HealthTracker,
        ActorKind::SessionRoot,
        ActorKind::UiRoot,
    ];

    const fn index(self) -> usize {
        match self {
            ActorKind::Player => 0,
            ActorKind::Camera => 1,
            ActorKind::HealthTracker => 2,
            ActorKind::SessionRoot => 3,
            ActorKind::UiRoot => 4,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ActorKind::Player => "player",
            ActorKind::Camera => "camera",
            ActorKind::HealthTracker => "health_tracker",
            ActorKind::SessionRoot => "session_root",
            ActorKind::UiRoot => "ui_root",
        }
    }
}

/// Identifies one specific registration. A handle stops resolving once its instance is
/// torn down, even if a new instance of the same kind is registered later.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ActorHandle {
    pub kind: ActorKind,
    generation: u64,
}

#[derive(Debug)]
struct Slot<T> {
    generation: u64,
    instance: Option<T>,
}

impl<T> Default for Slot<T> {
    fn default() -> Self {
        Self {
            generation: 0,
            instance: None,
        }
    }
}

/// One slot per [`ActorKind`]; never more than one live instance per kind.
#[derive(Debug)]
pub struct SingletonRegistry<T> {
    slots: [Slot<T>; KIND_COUNT],
    next_generation: u64,
}

impl<T> Default for SingletonRegistry<T> {
    fn default() -> Self {
        Self {
            slots: Default::default(),
            next_generation: 1,
        }
    }
}

impl<T> SingletonRegistry<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `instance` unless the slot is occupied, in which case `instance` is dropped
    /// and the live one is returned unchanged.
    pub fn register(&mut self, kind: ActorKind, instance: T) -> &mut T {
        self.register_with(kind, || instance)
    }

    /// Like [`SingletonRegistry::register`] but only builds the instance when needed.
    pub fn register_with(&mut self, kind: ActorKind, create: impl FnOnce() -> T) -> &mut T {
        let generation = self.next_generation;
        let slot = &mut self.slots[kind.index()];
        if slot.instance.is_some() {
            debug!(kind = kind.as_str(), "singleton_already_live; reusing");
        } else {
            slot.generation = generation;
            self.next_generation = self.next_generation.saturating_add(1);
            debug!(kind = kind.as_str(), generation, "singleton_registered");
        }
        slot.instance.get_or_insert_with(create)
    }

    pub fn lookup(&self, kind: ActorKind) -> Option<&T> {
        self.slots[kind.index()].instance.as_ref()
    }

    pub fn lookup_mut(&mut self, kind: ActorKind) -> Option<&mut T> {
        self.slots[kind.index()].instance.as_mut()
    }

    pub fn contains(&self, kind: ActorKind) -> bool {
        self.lookup(kind).is_some()
    }

    pub fn handle(&self, kind: ActorKind) -> Option<ActorHandle> {
        let slot = &self.slots[kind.index()];
        slot.instance.as_ref().map(|_| ActorHandle {
            kind,
            generation: slot.generation,
        })
    }

    pub fn resolve(&self, handle: ActorHandle) -> Option<&T> {
        let slot = &self.slots[handle.kind.index()];
        if slot.generation != handle.generation {
            return None;
        }
        slot.instance.as_ref()
    }

    pub fn teardown(&mut self, kind: ActorKind) -> Option<T> {
        let removed = self.slots[kind.index()].instance.take();
        if removed.is_some() {
            info!(kind = kind.as_str(), "singleton_torn_down");
        }
        removed
    }

    /// Destroys every present instance among `kinds`. Absent kinds are skipped, so calling
    /// this repeatedly is harmless. Returns the kinds that were actually destroyed.
    pub fn teardown_all(&mut self, kinds: &[ActorKind]) -> Vec<ActorKind> {
        kinds
            .iter()
            .copied()
            .filter(|kind| self.teardown(*kind).is_some())
            .collect()
    }

    pub fn live_count(&self) -> usize {
        self.slots
            .iter()
            .filter(|slot| slot.instance.is_some())
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_registration_reuses_live_instance() {
        let mut registry = SingletonRegistry::new();
        registry.register(ActorKind::Player, "first");
        let live = registry.register(ActorKind::Player, "second");

        assert_eq!(*live, "first");
        assert_eq!(registry.live_count(), 1);
    }

    #[test]
    fn register_with_skips_construction_when_live() {
        let mut registry = SingletonRegistry::new();
        registry.register(ActorKind::Camera, 1u32);
        let mut built = false;
        registry.register_with(ActorKind::Camera, || {
            built = true;
            2
        });

        assert!(!built);
        assert_eq!(registry.lookup(ActorKind::Camera), Some(&1));
    }

    #[test]
    fn teardown_all_is_idempotent_and_safe_on_empty_registry() {
        let mut registry: SingletonRegistry<u8> = SingletonRegistry::new();
        assert!(registry.teardown_all(&ActorKind::ALL).is_empty());

        registry.register(ActorKind::Player, 1);
        registry.register(ActorKind::UiRoot, 2);
        let removed = registry.teardown_all(&ActorKind::ALL);
        assert_eq!(removed, vec![ActorKind::Player, ActorKind::UiRoot]);

        assert!(registry.teardown_all(&ActorKind::ALL).is_empty());
        assert_eq!(registry.live_count(), 0);
        for kind in ActorKind::ALL {
            assert!(registry.lookup(kind).is_none());
        }
    }

    #[test]
    fn stale_handle_does_not_resolve_to_replacement() {
        let mut registry = SingletonRegistry::new();
        registry.register(ActorKind::HealthTracker, "old");
        let old_handle = registry.handle(ActorKind::HealthTracker).expect("handle");

        registry.teardown(ActorKind::HealthTracker);
        assert!(registry.resolve(old_handle).is_none());

        registry.register(ActorKind::HealthTracker, "new");
        assert!(registry.resolve(old_handle).is_none());
        let new_handle = registry.handle(ActorKind::HealthTracker).expect("handle");
        assert_eq!(registry.resolve(new_handle), Some(&"new"));
    }

    #[test]
    fn partial_teardown_leaves_other_kinds_live() {
        let mut registry = SingletonRegistry::new();
        for (value, kind) in ActorKind::ALL.into_iter().enumerate() {
            registry.register(kind, value);
        }

        registry.teardown_all(&[ActorKind::SessionRoot, ActorKind::UiRoot]);

        assert!(registry.contains(ActorKind::Player));
        assert!(registry.contains(ActorKind::Camera));
        assert!(!registry.contains(ActorKind::SessionRoot));
        assert_eq!(registry.live_count(), 3);
    }
}
