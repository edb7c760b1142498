//! Component runtime: virtual nodes, component instances, the patch
//! engine, update batching and the host adapter boundary.

pub mod component;
pub mod context;
pub mod host;
pub mod props;
pub mod renderer;
pub mod scheduler;
pub mod vnode;

pub use component::{
    get_current_instance, register_runtime_compiler, ComponentDef, Emitter, Instance, RenderError,
    RenderFn, Setup, SetupContext, SetupFn,
};
pub use context::{inject, provide};
pub use host::{HostNode, RenderHost};
pub use props::{diff_props, handler_event, PropPatch};
pub use renderer::{App, Renderer};
pub use scheduler::{flush_jobs, next_tick, pending_jobs, queue_job};
pub use vnode::{
    create_text_vnode, fragment, h, render_slots, Children, Props, ShapeFlags, SlotFn, Slots,
    VNode, VNodeType,
};
