//! Core value model for spark-view.
//!
//! Observed state, props and setup bindings all flow through [`Value`], a
//! small dynamic value enum. [`RawMap`] is the plain string-keyed container
//! that the observable wrappers in [`crate::reactivity`] intercept; on its
//! own it performs ordinary, untracked reads and writes.
//!
//! Equality rules:
//! - primitives compare by value (`Num` keeps NaN != NaN),
//! - containers, lists, functions, refs and wrappers compare by identity.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use crate::reactivity::{Reactive, Ref};

/// A callable stored in a value slot, typically an event handler prop.
pub type Callback = Rc<dyn Fn(&[Value]) -> Value>;

/// A plain list container. Compared by identity, never deep-wrapped.
pub type RawList = Rc<RefCell<Vec<Value>>>;

// =============================================================================
// RawMap - the plain observable container
// =============================================================================

/// A plain string-keyed container.
///
/// This is the raw target the observable wrappers work on. Accessing it
/// directly bypasses dependency tracking entirely; wrap it with
/// [`crate::reactive`] (or its readonly variants) to get tracked access.
#[derive(Clone, Default)]
pub struct RawMap {
    entries: Rc<RefCell<HashMap<String, Value>>>,
}

impl RawMap {
    /// Create an empty container.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a container from key/value pairs.
    pub fn from_entries(entries: impl IntoIterator<Item = (String, Value)>) -> Self {
        Self {
            entries: Rc::new(RefCell::new(entries.into_iter().collect())),
        }
    }

    /// Untracked read.
    pub fn get(&self, key: &str) -> Option<Value> {
        self.entries.borrow().get(key).cloned()
    }

    /// Untracked write.
    pub fn set(&self, key: impl Into<String>, value: Value) {
        self.entries.borrow_mut().insert(key.into(), value);
    }

    /// Whether a key is present (live or not).
    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.borrow().contains_key(key)
    }

    /// Snapshot of the current keys.
    pub fn keys(&self) -> Vec<String> {
        self.entries.borrow().keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }

    /// Replace the full contents in place, keeping the container identity.
    pub fn replace_entries(&self, entries: impl IntoIterator<Item = (String, Value)>) {
        let mut map = self.entries.borrow_mut();
        map.clear();
        map.extend(entries);
    }

    /// Identity check: two handles to the same underlying container.
    pub fn same(&self, other: &RawMap) -> bool {
        Rc::ptr_eq(&self.entries, &other.entries)
    }

    /// Stable identity of the underlying container, used as the registry key.
    pub(crate) fn id(&self) -> usize {
        Rc::as_ptr(&self.entries) as *const () as usize
    }
}

impl fmt::Debug for RawMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RawMap")
            .field("len", &self.len())
            .field("id", &self.id())
            .finish()
    }
}

impl PartialEq for RawMap {
    fn eq(&self, other: &Self) -> bool {
        self.same(other)
    }
}

// =============================================================================
// Value
// =============================================================================

/// A dynamically typed value slot.
#[derive(Clone, Default)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Num(f64),
    Str(String),
    /// A plain container, wrapped lazily on tracked reads.
    Map(RawMap),
    /// A plain list, compared by identity.
    List(RawList),
    /// A callable, compared by identity.
    Func(Callback),
    /// A reference cell, the single-slot observable box.
    Ref(Ref),
    /// An observable wrapper around a container.
    Proxy(Reactive),
}

impl Value {
    /// Wrap a callable.
    pub fn func(f: impl Fn(&[Value]) -> Value + 'static) -> Value {
        Value::Func(Rc::new(f))
    }

    /// Wrap a fire-and-forget callable, such as an event handler.
    pub fn handler(f: impl Fn(&[Value]) + 'static) -> Value {
        Value::Func(Rc::new(move |args| {
            f(args);
            Value::Null
        }))
    }

    /// Wrap a fresh list.
    pub fn list(items: impl IntoIterator<Item = Value>) -> Value {
        Value::List(Rc::new(RefCell::new(items.into_iter().collect())))
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Num(a), Value::Num(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Map(a), Value::Map(b)) => a.same(b),
            (Value::List(a), Value::List(b)) => Rc::ptr_eq(a, b),
            (Value::Func(a), Value::Func(b)) => Rc::ptr_eq(a, b),
            (Value::Ref(a), Value::Ref(b)) => a.same(b),
            (Value::Proxy(a), Value::Proxy(b)) => a == b,
            _ => false,
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "Null"),
            Value::Bool(b) => write!(f, "Bool({b})"),
            Value::Int(n) => write!(f, "Int({n})"),
            Value::Num(n) => write!(f, "Num({n})"),
            Value::Str(s) => write!(f, "Str({s:?})"),
            Value::Map(m) => write!(f, "Map({:#x})", m.id()),
            Value::List(l) => write!(f, "List({:p})", Rc::as_ptr(l)),
            Value::Func(c) => write!(f, "Func({:p})", Rc::as_ptr(c)),
            Value::Ref(_) => write!(f, "Ref"),
            Value::Proxy(p) => write!(f, "Proxy({:?})", p.kind()),
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(v as i64)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Num(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Str(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Str(v)
    }
}

impl From<RawMap> for Value {
    fn from(v: RawMap) -> Self {
        Value::Map(v)
    }
}

// =============================================================================
// Tests
// =============================================================================
