//! Fine-grained reactivity: dependency tracking, observable wrappers,
//! reference cells and derived values.
//!
//! - [`effect`] / [`Effect`] - reactive computations and the track/trigger
//!   dependency graph
//! - [`reactive`] / [`readonly`] / [`shallow_readonly`] - observable
//!   wrappers over plain containers
//! - [`Ref`] - single-slot observable boxes, with [`proxy_refs`] for
//!   ref-transparent binding views
//! - [`Computed`] - cached, lazily recomputed derived values

pub mod computed;
pub mod effect;
pub mod reactive;
pub mod reference;

pub use computed::Computed;
pub use effect::{effect, stop, Effect};
pub use reactive::{
    is_proxy, is_reactive, is_readonly, reactive, readonly, shallow_readonly, Reactive,
    ReactiveKind,
};
pub use reference::{is_ref, proxy_refs, un_ref, Ref, RefBindings};
