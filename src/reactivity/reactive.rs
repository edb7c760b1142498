//! Observable wrappers over plain containers.
//!
//! [`Reactive`] is an explicit accessor wrapper around a [`RawMap`]: all
//! tracked access to observed state goes through [`Reactive::get`] and
//! [`Reactive::set`]. Three access modes exist:
//!
//! - [`reactive`]: read + write, reads track, nested containers wrap
//!   lazily in the same mode,
//! - [`readonly`]: reads never track (the slot can never trigger), nested
//!   containers wrap readonly, writes warn and no-op,
//! - [`shallow_readonly`]: reads neither track nor wrap, writes warn and
//!   no-op. Used for passing props into child components without
//!   re-wrapping already wrapped values.
//!
//! Wrapping is memoized per mode by raw-container identity, so wrapping
//! the same container twice yields the same wrapper. The memo tables are
//! process-lifetime with no eviction, which keeps container identities
//! stable for the dependency registry; mounted applications are long
//! lived, so growth is bounded by the state they actually observe.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;

use super::effect::{track, trigger};
use crate::value::{RawMap, Value};

// =============================================================================
// Access modes
// =============================================================================

/// The access mode of an observable wrapper.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReactiveKind {
    /// Read + write, deep wrapping, reads track.
    Reactive,
    /// Read-only, deep wrapping, reads never track.
    Readonly,
    /// Read-only, no nested wrapping, reads never track.
    ShallowReadonly,
}

impl ReactiveKind {
    fn label(self) -> &'static str {
        match self {
            ReactiveKind::Reactive => "reactive",
            ReactiveKind::Readonly => "readonly",
            ReactiveKind::ShallowReadonly => "shallow readonly",
        }
    }
}

// =============================================================================
// Wrapper
// =============================================================================

/// An observable wrapper around a [`RawMap`].
///
/// Equality is wrapper identity: same underlying container, same mode.
#[derive(Clone)]
pub struct Reactive {
    target: RawMap,
    kind: ReactiveKind,
}

impl Reactive {
    /// Tracked (mode permitting) read of one key.
    ///
    /// Nested containers come back wrapped in the same mode, lazily, on
    /// demand. Missing keys read as [`Value::Null`].
    pub fn get(&self, key: &str) -> Value {
        match self.kind {
            ReactiveKind::Reactive => {
                track(&self.target, key);
                match self.target.get(key) {
                    Some(Value::Map(nested)) => Value::Proxy(reactive(&nested)),
                    Some(value) => value,
                    None => Value::Null,
                }
            }
            ReactiveKind::Readonly => match self.target.get(key) {
                Some(Value::Map(nested)) => Value::Proxy(readonly(&nested)),
                Some(value) => value,
                None => Value::Null,
            },
            ReactiveKind::ShallowReadonly => self.target.get(key).unwrap_or(Value::Null),
        }
    }

    /// Write one key.
    ///
    /// In mutable mode the value is stored first and the slot triggered
    /// after, so subscribers fired by the trigger observe the new value.
    /// Readonly modes log a diagnostic and succeed without writing; a
    /// rejected write never raises.
    pub fn set(&self, key: &str, value: Value) {
        match self.kind {
            ReactiveKind::Reactive => {
                self.target.set(key, value);
                trigger(&self.target, key);
            }
            ReactiveKind::Readonly | ReactiveKind::ShallowReadonly => {
                log::warn!("ignored write to `{key}` through a {} wrapper", self.kind.label());
            }
        }
    }

    pub fn kind(&self) -> ReactiveKind {
        self.kind
    }

    /// Whether a key is present, without tracking.
    pub fn contains_key(&self, key: &str) -> bool {
        self.target.contains_key(key)
    }

    /// The wrapped raw container.
    pub fn target(&self) -> &RawMap {
        &self.target
    }
}

impl PartialEq for Reactive {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind && self.target.same(&other.target)
    }
}

impl fmt::Debug for Reactive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Reactive")
            .field("kind", &self.kind)
            .field("target", &self.target)
            .finish()
    }
}

// =============================================================================
// Memoized constructors
// =============================================================================

thread_local! {
    static REACTIVE_MAP: RefCell<HashMap<usize, Reactive>> = RefCell::new(HashMap::new());
    static READONLY_MAP: RefCell<HashMap<usize, Reactive>> = RefCell::new(HashMap::new());
    static SHALLOW_READONLY_MAP: RefCell<HashMap<usize, Reactive>> = RefCell::new(HashMap::new());
}

fn memoized(
    cache: &'static std::thread::LocalKey<RefCell<HashMap<usize, Reactive>>>,
    target: &RawMap,
    kind: ReactiveKind,
) -> Reactive {
    cache.with(|map| {
        map.borrow_mut()
            .entry(target.id())
            .or_insert_with(|| Reactive {
                target: target.clone(),
                kind,
            })
            .clone()
    })
}

/// Wrap a container for tracked read + write access.
pub fn reactive(target: &RawMap) -> Reactive {
    memoized(&REACTIVE_MAP, target, ReactiveKind::Reactive)
}

/// Wrap a container deep-readonly.
pub fn readonly(target: &RawMap) -> Reactive {
    memoized(&READONLY_MAP, target, ReactiveKind::Readonly)
}

/// Wrap a container shallow-readonly.
pub fn shallow_readonly(target: &RawMap) -> Reactive {
    memoized(&SHALLOW_READONLY_MAP, target, ReactiveKind::ShallowReadonly)
}

// =============================================================================
// Predicates
// =============================================================================

/// Whether a value is a mutable observable wrapper.
pub fn is_reactive(value: &Value) -> bool {
    matches!(value, Value::Proxy(p) if p.kind() == ReactiveKind::Reactive)
}

/// Whether a value is a readonly wrapper (deep or shallow).
pub fn is_readonly(value: &Value) -> bool {
    matches!(
        value,
        Value::Proxy(p) if matches!(p.kind(), ReactiveKind::Readonly | ReactiveKind::ShallowReadonly)
    )
}

/// Whether a value is any observable wrapper.
pub fn is_proxy(value: &Value) -> bool {
    matches!(value, Value::Proxy(_))
}

// =============================================================================
// Tests
// =============================================================================
