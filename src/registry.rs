//! Identity registry: native pointer to managed wrapper reconciliation.
//!
//! One registry exists per handle category. It maps a native pointer to a
//! *weak* reference to the wrapper instance currently representing it, so
//! that for any native pointer there is at most one live wrapper visible to
//! callers. The registry never owns wrapper lifetime: when the last strong
//! reference to a wrapper goes away the weak entry goes dead, and the next
//! lookup of the same pointer fabricates a fresh wrapper.
//!
//! All bookkeeping for a key happens under a single map lock, so
//! supersession, retargeting and get-or-add are atomic relative to each
//! other. Wrapper instances that get upgraded while the lock is held are
//! always released after it is dropped: releasing the last strong reference
//! runs the wrapper's finalizer, which deregisters and would otherwise
//! re-enter the lock.

use crate::handle::{Driver, Kind, NativePtr};
use parking_lot::Mutex;
use serde::Serialize;
use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

/// What the registry needs to know about the instances it tracks.
pub trait Tracked: Send + Sync + 'static {
    /// Driver tag set when the instance was created.
    fn driver(&self) -> Driver;

    /// Whether the instance still holds its native pointer.
    fn is_live(&self) -> bool;

    /// Retire the managed identity without touching the native resource.
    fn forget(&self);
}

/// Point-in-time counters for one registry.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RegistryReport {
    /// Entries whose wrapper is still alive
    pub live: usize,
    /// Entries whose wrapper has been released
    pub dead: usize,
    /// Wrappers registered from a native creation call
    pub registered: u64,
    /// Wrappers fabricated on the lookup path
    pub fabricated: u64,
    /// Live wrappers retired by a later registration of the same pointer
    pub superseded: u64,
    /// Typed lookups refused because of a driver tag conflict
    pub conflicts: u64,
}

#[derive(Debug, Default)]
struct Counters {
    registered: AtomicU64,
    fabricated: AtomicU64,
    superseded: AtomicU64,
    conflicts: AtomicU64,
}

impl Counters {
    fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }
}

/// Concurrent map from native pointer to a weakly held wrapper.
#[derive(Debug)]
pub struct Registry<T: Tracked> {
    kind: Kind,
    entries: Mutex<HashMap<NativePtr, Weak<T>>>,
    counters: Counters,
}

impl<T: Tracked> Registry<T> {
    pub fn new(kind: Kind, capacity: usize) -> Self {
        Self {
            kind,
            entries: Mutex::new(HashMap::with_capacity(capacity)),
            counters: Counters::default(),
        }
    }

    pub fn kind(&self) -> Kind {
        self.kind
    }

    /// Record `value` as the wrapper for a freshly created native object.
    ///
    /// The native creation call already handed the caller its reference, so
    /// no native reference is taken here. A live wrapper previously
    /// registered under the same pointer is superseded: its managed identity
    /// is retired and the native resource is left alone.
    pub fn register(&self, ptr: NativePtr, value: &Arc<T>) {
        debug_assert!(!ptr.is_null(), "registering a null {}", self.kind);

        let superseded = {
            let mut entries = self.entries.lock();
            let previous = match entries.entry(ptr) {
                Entry::Vacant(slot) => {
                    slot.insert(Arc::downgrade(value));
                    None
                }
                Entry::Occupied(mut slot) => {
                    let previous = slot.get().upgrade();
                    slot.insert(Arc::downgrade(value));
                    previous.filter(|p| !Arc::ptr_eq(p, value) && p.is_live())
                }
            };
            if let Some(old) = &previous {
                old.forget();
            }
            previous
        };

        Counters::bump(&self.counters.registered);
        match superseded {
            Some(old) => {
                Counters::bump(&self.counters.superseded);
                log::debug!(
                    "{} {ptr}: registered, superseding live wrapper ({})",
                    self.kind,
                    old.driver()
                );
            }
            None => log::trace!("{} {ptr}: registered", self.kind),
        }
    }

    /// Remove the entry for `ptr` on behalf of the wrapper at `value`.
    ///
    /// The entry is dropped when it refers to `value` or to a wrapper that
    /// has already been released. An entry that has been retargeted to a
    /// different live wrapper is left in place. Returns whether an entry was
    /// removed.
    pub fn deregister(&self, ptr: NativePtr, value: *const T) -> bool {
        let removed = {
            let mut entries = self.entries.lock();
            match entries.get(&ptr) {
                Some(weak) if std::ptr::eq(weak.as_ptr(), value) || weak.strong_count() == 0 => {
                    entries.remove(&ptr);
                    true
                }
                _ => false,
            }
        };

        if removed {
            log::trace!("{} {ptr}: deregistered", self.kind);
        }
        removed
    }

    /// Return the live wrapper for `ptr`, fabricating one if none is alive.
    ///
    /// Returns `None` for a null pointer, when `fabricate` fails, or, when
    /// `driver` is given, when the live wrapper carries a different driver
    /// tag. A refused typed lookup leaves the registry untouched.
    ///
    /// `fabricate` runs under the registry lock and must not touch this
    /// registry. It is responsible for taking the native reference that the
    /// new wrapper represents.
    pub fn try_get_or_create<F>(
        &self,
        ptr: NativePtr,
        driver: Option<Driver>,
        fabricate: F,
    ) -> Option<Arc<T>>
    where
        F: FnOnce() -> Option<Arc<T>>,
    {
        if ptr.is_null() {
            return None;
        }

        // Declared before the guard so it is released after the lock.
        let mut _stale: Option<Arc<T>> = None;
        let mut entries = self.entries.lock();

        let inserted = !entries.contains_key(&ptr);
        let slot = entries.entry(ptr).or_default();

        if let Some(existing) = slot.upgrade() {
            if existing.is_live() {
                if let Some(expected) = driver {
                    if existing.driver() != expected {
                        Counters::bump(&self.counters.conflicts);
                        log::warn!(
                            "{} {ptr}: requested as {expected} but the live wrapper is {}",
                            self.kind,
                            existing.driver()
                        );
                        drop(entries);
                        drop(existing);
                        return None;
                    }
                }
                return Some(existing);
            }
            _stale = Some(existing);
        }

        match fabricate() {
            Some(fresh) => {
                *slot = Arc::downgrade(&fresh);
                Counters::bump(&self.counters.fabricated);
                log::debug!(
                    "{} {ptr}: fabricated {} wrapper",
                    self.kind,
                    fresh.driver()
                );
                Some(fresh)
            }
            None => {
                if inserted {
                    entries.remove(&ptr);
                }
                None
            }
        }
    }

    /// The live wrapper for `ptr`, without fabricating one.
    pub fn get(&self, ptr: NativePtr) -> Option<Arc<T>> {
        let found = self.entries.lock().get(&ptr).and_then(Weak::upgrade);
        found.filter(|existing| existing.is_live())
    }

    /// Whether an entry, live or dead, exists for `ptr`.
    pub fn contains(&self, ptr: NativePtr) -> bool {
        self.entries.lock().contains_key(&ptr)
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// Remove the entries of every live wrapper matching `predicate` and
    /// return those wrappers.
    ///
    /// The registry only forgets the entries; retiring the returned wrappers
    /// is up to the caller. `predicate` runs under the registry lock.
    pub fn drain_matching<F>(&self, mut predicate: F) -> Vec<Arc<T>>
    where
        F: FnMut(&T) -> bool,
    {
        // Upgraded wrappers that stay are released after the lock.
        let mut kept = Vec::new();
        let mut drained = Vec::new();
        self.entries.lock().retain(|_, weak| {
            let Some(instance) = weak.upgrade() else {
                return true;
            };
            let matched = instance.is_live() && predicate(&instance);
            if matched {
                drained.push(instance);
            } else {
                kept.push(instance);
            }
            !matched
        });
        drop(kept);

        if !drained.is_empty() {
            log::trace!("{}: drained {} entries", self.kind, drained.len());
        }
        drained
    }

    /// Drop entries whose wrapper has been released. Returns how many were
    /// removed.
    pub fn prune(&self) -> usize {
        let mut entries = self.entries.lock();
        let before = entries.len();
        entries.retain(|_, weak| weak.strong_count() > 0);
        before - entries.len()
    }

    pub fn report(&self) -> RegistryReport {
        let entries = self.entries.lock();
        let live = entries.values().filter(|w| w.strong_count() > 0).count();
        RegistryReport {
            live,
            dead: entries.len() - live,
            registered: self.counters.registered.load(Ordering::Relaxed),
            fabricated: self.counters.fabricated.load(Ordering::Relaxed),
            superseded: self.counters.superseded.load(Ordering::Relaxed),
            conflicts: self.counters.conflicts.load(Ordering::Relaxed),
        }
    }

    /// Point the entry for `ptr` at nothing, as if its wrapper had been
    /// collected while the native object stays alive.
    #[cfg(test)]
    pub(crate) fn clear_target(&self, ptr: NativePtr) {
        if let Some(weak) = self.entries.lock().get_mut(&ptr) {
            *weak = Weak::new();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicBool;

    #[derive(Debug)]
    struct Probe {
        driver: Driver,
        live: AtomicBool,
    }

    impl Probe {
        fn new(driver: Driver) -> Arc<Self> {
            Arc::new(Self {
                driver,
                live: AtomicBool::new(true),
            })
        }
    }

    impl Tracked for Probe {
        fn driver(&self) -> Driver {
            self.driver
        }

        fn is_live(&self) -> bool {
            self.live.load(Ordering::Acquire)
        }

        fn forget(&self) {
            self.live.store(false, Ordering::Release);
        }
    }

    fn ptr(addr: usize) -> NativePtr {
        NativePtr::from_raw(addr as *const u8)
    }

    fn registry() -> Registry<Probe> {
        Registry::new(Kind::Texture, 4)
    }

    #[test]
    fn test_null_pointer_not_found() {
        let registry = registry();
        let mut called = false;
        let found = registry.try_get_or_create(NativePtr::NULL, None, || {
            called = true;
            Some(Probe::new(Driver::Generic))
        });
        assert!(found.is_none());
        assert!(!called);
        assert!(registry.is_empty());
    }

    #[test]
    fn test_lookup_hits_registered_instance() {
        let registry = registry();
        let a = Probe::new(Driver::Vulkan);
        registry.register(ptr(0x10), &a);

        let found = registry
            .try_get_or_create(ptr(0x10), None, || panic!("must not fabricate"))
            .unwrap();
        assert!(Arc::ptr_eq(&found, &a));
        assert_eq!(registry.report().fabricated, 0);
    }

    #[test]
    fn test_register_supersedes_live_instance() {
        let registry = registry();
        let a = Probe::new(Driver::Generic);
        let b = Probe::new(Driver::Generic);
        registry.register(ptr(0x20), &a);
        registry.register(ptr(0x20), &b);

        assert!(!a.is_live());
        assert!(b.is_live());
        assert!(Arc::ptr_eq(&registry.get(ptr(0x20)).unwrap(), &b));
        assert_eq!(registry.report().superseded, 1);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_register_same_instance_twice_keeps_it_live() {
        let registry = registry();
        let a = Probe::new(Driver::Generic);
        registry.register(ptr(0x28), &a);
        registry.register(ptr(0x28), &a);
        assert!(a.is_live());
        assert_eq!(registry.report().superseded, 0);
    }

    #[test]
    fn test_register_over_disposed_instance_is_not_supersession() {
        let registry = registry();
        let a = Probe::new(Driver::Generic);
        registry.register(ptr(0x2c), &a);
        a.forget();

        let b = Probe::new(Driver::Generic);
        registry.register(ptr(0x2c), &b);
        assert_eq!(registry.report().superseded, 0);
        assert!(Arc::ptr_eq(&registry.get(ptr(0x2c)).unwrap(), &b));
    }

    #[test]
    fn test_register_retargets_dead_entry() {
        let registry = registry();
        let a = Probe::new(Driver::Generic);
        registry.register(ptr(0x30), &a);
        drop(a);
        assert_eq!(registry.report().dead, 1);

        let b = Probe::new(Driver::Generic);
        registry.register(ptr(0x30), &b);
        assert_eq!(registry.report().superseded, 0);
        assert_eq!(registry.report().live, 1);
    }

    #[test]
    fn test_dead_entry_is_refabricated_once() {
        let registry = registry();
        let a = Probe::new(Driver::Generic);
        registry.register(ptr(0x40), &a);
        drop(a);

        let mut fabrications = 0;
        let first = registry
            .try_get_or_create(ptr(0x40), None, || {
                fabrications += 1;
                Some(Probe::new(Driver::Generic))
            })
            .unwrap();
        let second = registry
            .try_get_or_create(ptr(0x40), None, || {
                fabrications += 1;
                Some(Probe::new(Driver::Generic))
            })
            .unwrap();

        assert_eq!(fabrications, 1);
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn test_forgotten_instance_is_replaced() {
        let registry = registry();
        let a = Probe::new(Driver::Generic);
        registry.register(ptr(0x48), &a);
        a.forget();

        let b = registry
            .try_get_or_create(ptr(0x48), None, || Some(Probe::new(Driver::Generic)))
            .unwrap();
        assert!(!Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn test_typed_lookup_conflict_fails_closed() {
        let registry = registry();
        let a = Probe::new(Driver::Metal);
        registry.register(ptr(0x50), &a);
        let before = registry.report();

        let found = registry.try_get_or_create(ptr(0x50), Some(Driver::Vulkan), || {
            panic!("must not fabricate")
        });
        assert!(found.is_none());

        let after = registry.report();
        assert_eq!(after.conflicts, 1);
        assert_eq!(after.live, before.live);
        assert!(Arc::ptr_eq(&registry.get(ptr(0x50)).unwrap(), &a));

        let same = registry
            .try_get_or_create(ptr(0x50), Some(Driver::Metal), || None)
            .unwrap();
        assert!(Arc::ptr_eq(&same, &a));
    }

    #[test]
    fn test_failed_fabrication_leaves_no_entry() {
        let registry = registry();
        assert!(registry.try_get_or_create(ptr(0x60), None, || None).is_none());
        assert!(!registry.contains(ptr(0x60)));
    }

    #[test]
    fn test_deregister_only_removes_own_or_dead_entry() {
        let registry = registry();
        let a = Probe::new(Driver::Generic);
        let b = Probe::new(Driver::Generic);
        registry.register(ptr(0x70), &a);
        registry.register(ptr(0x70), &b);

        assert!(!registry.deregister(ptr(0x70), Arc::as_ptr(&a)));
        assert!(registry.contains(ptr(0x70)));
        assert!(registry.deregister(ptr(0x70), Arc::as_ptr(&b)));
        assert!(!registry.contains(ptr(0x70)));

        registry.register(ptr(0x78), &a);
        registry.clear_target(ptr(0x78));
        assert!(registry.deregister(ptr(0x78), Arc::as_ptr(&b)));
    }

    #[test]
    fn test_drain_matching_removes_only_live_matches() {
        let registry = registry();
        let metal = Probe::new(Driver::Metal);
        let vulkan = Probe::new(Driver::Vulkan);
        let retired = Probe::new(Driver::Metal);
        registry.register(ptr(0xa0), &metal);
        registry.register(ptr(0xa8), &vulkan);
        registry.register(ptr(0xb0), &retired);
        retired.forget();

        let drained = registry.drain_matching(|p| p.driver == Driver::Metal);
        assert_eq!(drained.len(), 1);
        assert!(Arc::ptr_eq(&drained[0], &metal));
        assert!(!registry.contains(ptr(0xa0)));
        assert!(registry.contains(ptr(0xa8)));
        assert!(registry.contains(ptr(0xb0)));
    }

    #[test]
    fn test_prune_drops_dead_entries() {
        let registry = registry();
        let a = Probe::new(Driver::Generic);
        let b = Probe::new(Driver::Generic);
        registry.register(ptr(0x80), &a);
        registry.register(ptr(0x88), &b);
        drop(a);

        assert_eq!(registry.prune(), 1);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_concurrent_lookups_share_one_instance() {
        let registry = registry();
        let fabrications = AtomicU64::new(0);

        let found: Vec<Arc<Probe>> = std::thread::scope(|s| {
            let handles: Vec<_> = (0..8)
                .map(|_| {
                    s.spawn(|| {
                        registry
                            .try_get_or_create(ptr(0x90), None, || {
                                fabrications.fetch_add(1, Ordering::SeqCst);
                                Some(Probe::new(Driver::Generic))
                            })
                            .unwrap()
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        assert_eq!(fabrications.load(Ordering::SeqCst), 1);
        assert!(found.windows(2).all(|w| Arc::ptr_eq(&w[0], &w[1])));
    }
}
