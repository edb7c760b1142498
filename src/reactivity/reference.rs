//! Reference cells: single-slot observable boxes.
//!
//! A [`Ref`] holds one value and its own private dependency set. Container
//! values are stored behind a mutable observable wrapper, but assignment
//! compares against the raw last-assigned value, so re-assigning the same
//! raw container does not trigger even though `reactive(x)` is not `x`.

use std::cell::RefCell;
use std::rc::Rc;

use super::effect::{new_dep, track_dep, trigger_dep, Dep};
use super::reactive::reactive;
use crate::value::{RawMap, Value};

// =============================================================================
// Ref
// =============================================================================

/// A single-slot observable box.
///
/// Cloning shares the same slot. Stored inside a [`Value::Ref`], the box
/// doubles as the marker distinguishing refs from plain values.
#[derive(Clone)]
pub struct Ref {
    inner: Rc<RefInner>,
}

struct RefInner {
    /// Current value, wrapped when it is a container.
    value: RefCell<Value>,
    /// Raw last-assigned value, the identity the setter compares against.
    raw: RefCell<Value>,
    dep: Dep,
}

impl Ref {
    pub fn new(value: Value) -> Ref {
        Ref {
            inner: Rc::new(RefInner {
                value: RefCell::new(wrap_container(value.clone())),
                raw: RefCell::new(value),
                dep: new_dep(),
            }),
        }
    }

    /// Tracked read of the slot.
    pub fn get(&self) -> Value {
        track_dep(&self.inner.dep);
        self.inner.value.borrow().clone()
    }

    /// Write the slot, triggering subscribers unless the raw value is
    /// unchanged.
    pub fn set(&self, value: Value) {
        if *self.inner.raw.borrow() == value {
            return;
        }
        *self.inner.raw.borrow_mut() = value.clone();
        *self.inner.value.borrow_mut() = wrap_container(value);
        trigger_dep(&self.inner.dep);
    }

    /// Identity check: two handles to the same slot.
    pub fn same(&self, other: &Ref) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

fn wrap_container(value: Value) -> Value {
    match value {
        Value::Map(map) => Value::Proxy(reactive(&map)),
        other => other,
    }
}

/// Whether a value is a reference cell.
pub fn is_ref(value: &Value) -> bool {
    matches!(value, Value::Ref(_))
}

/// Unwrap a reference cell; plain values pass through.
pub fn un_ref(value: &Value) -> Value {
    match value {
        Value::Ref(r) => r.get(),
        other => other.clone(),
    }
}

// =============================================================================
// Ref-transparent bindings
// =============================================================================

/// A ref-transparent view over a container.
///
/// Reads auto-unwrap reference cells (tracking through the cell's own
/// getter); writes assign through an existing cell instead of replacing
/// it. Component setup state is exposed through this view.
#[derive(Clone)]
pub struct RefBindings {
    target: RawMap,
}

impl RefBindings {
    pub fn get(&self, key: &str) -> Value {
        un_ref(&self.target.get(key).unwrap_or(Value::Null))
    }

    pub fn set(&self, key: &str, value: Value) {
        match self.target.get(key) {
            Some(Value::Ref(existing)) if !is_ref(&value) => existing.set(value),
            _ => self.target.set(key, value),
        }
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.target.contains_key(key)
    }
}

/// Wrap a container in a ref-transparent view.
pub fn proxy_refs(target: &RawMap) -> RefBindings {
    RefBindings {
        target: target.clone(),
    }
}

// =============================================================================
// Tests
// =============================================================================
