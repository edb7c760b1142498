//! Ancestor-to-descendant value passing outside the props channel.
//!
//! Each instance owns a provide table. Lookup walks the explicit parent
//! chain, so a descendant sees the nearest ancestor's value for a shared
//! key. An instance cannot see its own provides, only its ancestors'.
//! Both calls are only meaningful during a component's setup phase, while
//! the current-instance slot is populated.

use super::component::get_current_instance;
use crate::value::Value;

/// Provide a value to descendants. Writes into the currently setting-up
/// instance's own table; outside setup this is a logged no-op.
pub fn provide(key: &str, value: Value) {
    match get_current_instance() {
        Some(instance) => instance.provide_value(key, value),
        None => log::warn!("provide(`{key}`) called outside component setup"),
    }
}

/// Look up a value provided by the nearest ancestor, falling back to
/// `default` when no ancestor provides the key or no setup is running.
pub fn inject(key: &str, default: Value) -> Value {
    let Some(instance) = get_current_instance() else {
        return default;
    };
    let mut cursor = instance.parent();
    while let Some(ancestor) = cursor {
        if let Some(value) = ancestor.provided(key) {
            return value;
        }
        cursor = ancestor.parent();
    }
    default
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inject_outside_setup_returns_default() {
        assert_eq!(inject("anything", Value::Int(7)), Value::Int(7));
    }

    #[test]
    fn test_provide_outside_setup_is_noop() {
        // Nothing observable; must not panic.
        provide("anything", Value::Int(1));
    }
}
