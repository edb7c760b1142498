//! Derived values: cached, lazily recomputed observables.
//!
//! A [`Computed`] owns a producer closure and a consumer dependency set.
//! The backing subscriber around the producer is created on first read;
//! its scheduler only marks the cache dirty and notifies consumers, it
//! never recomputes eagerly. Reads recompute when dirty, otherwise they
//! return the cache.

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use super::effect::{new_dep, track_dep, trigger_dep, Dep, Effect};
use crate::value::Value;

/// A cached value derived from other observables.
///
/// Cloning shares the same cache.
#[derive(Clone)]
pub struct Computed {
    inner: Rc<ComputedInner>,
}

struct ComputedInner {
    producer: RefCell<Box<dyn FnMut() -> Value>>,
    value: RefCell<Value>,
    dirty: Cell<bool>,
    /// Created on first read; doubles as the "never computed yet" flag.
    backing: RefCell<Option<Effect>>,
    /// Consumers of the derived value itself.
    dep: Dep,
}

impl Computed {
    pub fn new(producer: impl FnMut() -> Value + 'static) -> Computed {
        Computed {
            inner: Rc::new(ComputedInner {
                producer: RefCell::new(Box::new(producer)),
                value: RefCell::new(Value::Null),
                dirty: Cell::new(false),
                backing: RefCell::new(None),
                dep: new_dep(),
            }),
        }
    }

    /// Tracked read of the derived value, recomputing only when dirty.
    pub fn get(&self) -> Value {
        track_dep(&self.inner.dep);

        let never_computed = self.inner.backing.borrow().is_none();
        if never_computed {
            let weak_run: Weak<ComputedInner> = Rc::downgrade(&self.inner);
            let weak_invalidate = weak_run.clone();
            // The backing subscriber computes into the cache; its
            // scheduler only invalidates and notifies consumers.
            let backing = Effect::with_scheduler(
                move || {
                    if let Some(inner) = weak_run.upgrade() {
                        let next = (inner.producer.borrow_mut())();
                        *inner.value.borrow_mut() = next;
                    }
                },
                move || {
                    if let Some(inner) = weak_invalidate.upgrade() {
                        inner.dirty.set(true);
                        trigger_dep(&inner.dep);
                    }
                },
            );
            *self.inner.backing.borrow_mut() = Some(backing);
        } else if self.inner.dirty.get() {
            self.inner.dirty.set(false);
            let backing = self.inner.backing.borrow().clone();
            if let Some(backing) = backing {
                backing.run();
            }
        }

        self.inner.value.borrow().clone()
    }

    /// Derived values reject writes: a diagnostic is logged and nothing
    /// changes.
    pub fn set(&self, _value: Value) {
        log::warn!("ignored write to a computed value");
    }
}

// =============================================================================
// Tests
// =============================================================================
