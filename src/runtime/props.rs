//! Prop diff policy.
//!
//! The patch engine hands a host both prop generations; this module is
//! the canonical lowering of that pair into concrete mutations. Handler
//! props are recognized by their `on` + uppercase naming and compare by
//! identity, so a changed handler detaches the old listener before
//! attaching the new one. Plain attributes are removed when the new slot
//! is dead (absent, null or NaN) and otherwise set unconditionally; the
//! host is expected to make redundant sets cheap.

use std::collections::BTreeSet;

use super::vnode::Props;
use crate::utils::is_live;
use crate::value::{Callback, Value};

/// One concrete prop mutation.
pub enum PropPatch {
    SetAttr { key: String, value: Value },
    RemoveAttr { key: String },
    AddHandler { event: String, handler: Callback },
    RemoveHandler { event: String },
}

impl std::fmt::Debug for PropPatch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PropPatch::SetAttr { key, value } => write!(f, "SetAttr({key}={value:?})"),
            PropPatch::RemoveAttr { key } => write!(f, "RemoveAttr({key})"),
            PropPatch::AddHandler { event, .. } => write!(f, "AddHandler({event})"),
            PropPatch::RemoveHandler { event } => write!(f, "RemoveHandler({event})"),
        }
    }
}

/// The event behind a handler-shaped prop key: `onClick` is the `click`
/// event. Returns `None` for plain attribute keys.
pub fn handler_event(key: &str) -> Option<String> {
    let rest = key.strip_prefix("on")?;
    let first = rest.chars().next()?;
    if !first.is_uppercase() {
        return None;
    }
    let mut event = String::with_capacity(rest.len());
    event.extend(first.to_lowercase());
    event.push_str(&rest[first.len_utf8()..]);
    Some(event)
}

/// Compute the mutations that reconcile `old` props into `new` props.
///
/// Keys are visited in sorted order so the output is deterministic.
pub fn diff_props(old: &Props, new: &Props) -> Vec<PropPatch> {
    let keys: BTreeSet<&String> = old.keys().chain(new.keys()).collect();
    let mut patches = Vec::new();

    for key in keys {
        if let Some(event) = handler_event(key) {
            let old_handler = as_handler(old.get(key.as_str()));
            let new_handler = as_handler(new.get(key.as_str()));
            match (old_handler, new_handler) {
                (Some(old_cb), Some(new_cb)) => {
                    if !std::rc::Rc::ptr_eq(&old_cb, &new_cb) {
                        patches.push(PropPatch::RemoveHandler {
                            event: event.clone(),
                        });
                        patches.push(PropPatch::AddHandler {
                            event,
                            handler: new_cb,
                        });
                    }
                }
                (Some(_), None) => patches.push(PropPatch::RemoveHandler { event }),
                (None, Some(new_cb)) => patches.push(PropPatch::AddHandler {
                    event,
                    handler: new_cb,
                }),
                (None, None) => {}
            }
            continue;
        }

        let old_live = is_live(old.get(key.as_str()));
        let new_live = is_live(new.get(key.as_str()));
        if new_live {
            // Unconditional set, even when the value looks unchanged.
            if let Some(value) = new.get(key.as_str()) {
                patches.push(PropPatch::SetAttr {
                    key: key.clone(),
                    value: value.clone(),
                });
            }
        } else if old_live {
            patches.push(PropPatch::RemoveAttr { key: key.clone() });
        }
    }

    patches
}

fn as_handler(value: Option<&Value>) -> Option<Callback> {
    match value {
        Some(Value::Func(cb)) => Some(cb.clone()),
        _ => None,
    }
}

// =============================================================================
// Tests
// =============================================================================
