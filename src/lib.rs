//! # spark-view
//!
//! Reactive virtual-tree UI runtime for Rust.
//!
//! spark-view is a minimal component runtime built on fine-grained
//! reactivity: state mutations are observed by a dependency graph, the
//! graph schedules the affected component's update job, and the patch
//! engine converges the host tree onto the freshly rendered virtual tree
//! with the smallest set of host mutations (keyed children are reconciled
//! with a longest-increasing-subsequence move minimizer).
//!
//! ```text
//! mutation -> wrapper/ref -> dependency graph -> scheduler
//!          -> patch engine -> RenderHost adapter
//! ```
//!
//! The runtime is host-agnostic: the patch engine speaks the small
//! [`RenderHost`] operation set, and concrete bindings (DOM, terminal,
//! test doubles) implement it. Templates are equally external; a compiler
//! registered through [`register_runtime_compiler`] lowers template
//! strings into render functions on demand.
//!
//! ## Modules
//!
//! - [`value`] - the dynamic value model observed state flows through
//! - [`reactivity`] - dependency graph, observable wrappers, refs,
//!   derived values
//! - [`runtime`] - virtual nodes, component instances, patch engine,
//!   scheduler, host adapter boundary

pub mod reactivity;
pub mod runtime;
pub mod value;

mod utils;

// Re-export the public surface at the crate root.
pub use value::{Callback, RawList, RawMap, Value};

pub use reactivity::{
    effect, is_proxy, is_reactive, is_readonly, is_ref, proxy_refs, reactive, readonly,
    shallow_readonly, stop, un_ref, Computed, Effect, Reactive, ReactiveKind, Ref, RefBindings,
};

pub use runtime::{
    create_text_vnode, diff_props, flush_jobs, fragment, get_current_instance, h, handler_event,
    inject, next_tick, pending_jobs, provide, queue_job, register_runtime_compiler, render_slots,
    App, Children, ComponentDef, Emitter, HostNode, Instance, PropPatch, Props, RenderError,
    RenderFn, RenderHost, Renderer, Setup, SetupContext, SetupFn, ShapeFlags, SlotFn, Slots,
    VNode, VNodeType,
};
