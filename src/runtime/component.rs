//! Component definitions and runtime instances.
//!
//! A [`ComponentDef`] is the static description an application supplies:
//! an optional setup function, an optional render function, an optional
//! template lowered through the registered compiler. An [`Instance`] is
//! the runtime state created once per mount point: resolved props, slots,
//! setup bindings, the provide table, the committed subtree and the
//! update subscriber driving re-renders.
//!
//! The setup phase runs with the instance installed in a scoped
//! current-instance slot so [`crate::runtime::context::provide`] and
//! friends can reach it; the slot is cleared when setup returns.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::{Rc, Weak};

use thiserror::Error;

use super::vnode::{Children, Props, ShapeFlags, Slots, VNode};
use crate::reactivity::effect::Effect;
use crate::reactivity::reactive::{shallow_readonly, Reactive};
use crate::reactivity::reference::{proxy_refs, RefBindings};
use crate::runtime::host::HostNode;
use crate::value::{RawMap, Value};

// =============================================================================
// Errors
// =============================================================================

/// Fatal configuration errors surfaced by the runtime.
#[derive(Debug, Error)]
pub enum RenderError {
    /// The component has no render function from any source: not from
    /// setup, not on the definition, and no template a registered
    /// compiler could lower.
    #[error("component `{0}` has no render function and no compilable template")]
    MissingRender(String),
}

// =============================================================================
// Definition
// =============================================================================

/// Renders one frame of a component's subtree.
pub type RenderFn = Rc<dyn Fn(&Instance) -> VNode>;

/// The setup function of a stateful component.
pub type SetupFn = Box<dyn Fn(Reactive, SetupContext) -> Setup>;

/// A registered template compiler: template source in, render function out.
pub type CompileFn = Rc<dyn Fn(&str) -> RenderFn>;

/// What setup hands back: either a render closure or a bindings container
/// exposed (ref-transparently) to the render function.
pub enum Setup {
    Render(RenderFn),
    Bindings(RawMap),
}

/// The static description of a component.
#[derive(Default)]
pub struct ComponentDef {
    pub name: String,
    pub setup: Option<SetupFn>,
    pub render: Option<RenderFn>,
    pub template: Option<String>,
}

impl ComponentDef {
    pub(crate) fn display_name(&self) -> &str {
        if self.name.is_empty() {
            "<anonymous>"
        } else {
            &self.name
        }
    }
}

// =============================================================================
// Setup context and emit
// =============================================================================

/// The context handed to setup alongside the props.
#[derive(Clone)]
pub struct SetupContext {
    emitter: Emitter,
}

impl SetupContext {
    /// Fire an event towards the owning virtual node's handler props.
    pub fn emit(&self, event: &str, args: Vec<Value>) {
        self.emitter.emit(event, args);
    }

    /// A cloneable handle for firing events after setup has returned.
    pub fn emitter(&self) -> Emitter {
        self.emitter.clone()
    }
}

/// Fires events against the instance it was created for. Holds the
/// instance weakly so handlers stored in bindings cannot keep it alive.
#[derive(Clone)]
pub struct Emitter {
    instance: Weak<InstanceInner>,
}

impl Emitter {
    pub fn emit(&self, event: &str, args: Vec<Value>) {
        if let Some(inner) = self.instance.upgrade() {
            Instance { inner }.emit(event, args);
        }
    }
}

/// `my-event` becomes `onMyEvent`: camelize across dashes, capitalize,
/// prefix with `on`.
fn handler_prop_name(event: &str) -> String {
    let mut name = String::with_capacity(event.len() + 2);
    name.push_str("on");
    let mut upper_next = true;
    for ch in event.chars() {
        if ch == '-' {
            upper_next = true;
        } else if upper_next {
            name.extend(ch.to_uppercase());
            upper_next = false;
        } else {
            name.push(ch);
        }
    }
    name
}

// =============================================================================
// Instance
// =============================================================================

/// Runtime state of one mounted component. Cloning shares the instance.
#[derive(Clone)]
pub struct Instance {
    inner: Rc<InstanceInner>,
}

pub(crate) struct InstanceInner {
    vnode: RefCell<VNode>,
    def: Rc<ComponentDef>,
    parent: Option<Instance>,
    /// Live prop table. Shared with the shallow-readonly wrapper handed
    /// to setup, so prop updates are visible through captured wrappers.
    props: RawMap,
    slots: RefCell<Slots>,
    bindings: RefCell<Option<RefBindings>>,
    render: RefCell<Option<RenderFn>>,
    provides: RefCell<HashMap<String, Value>>,
    sub_tree: RefCell<Option<VNode>>,
    /// Pending replacement vnode staged by a prop-changing update.
    next: RefCell<Option<VNode>>,
    runner: RefCell<Option<Effect>>,
}

impl Instance {
    pub(crate) fn new(def: Rc<ComponentDef>, vnode: VNode, parent: Option<Instance>) -> Instance {
        Instance {
            inner: Rc::new(InstanceInner {
                vnode: RefCell::new(vnode),
                def,
                parent,
                props: RawMap::new(),
                slots: RefCell::new(Slots::new()),
                bindings: RefCell::new(None),
                render: RefCell::new(None),
                provides: RefCell::new(HashMap::new()),
                sub_tree: RefCell::new(None),
                next: RefCell::new(None),
                runner: RefCell::new(None),
            }),
        }
    }

    /// Resolve a name the way the render function sees it: setup bindings
    /// first (ref-transparent), then props.
    pub fn get(&self, key: &str) -> Value {
        if let Some(bindings) = self.inner.bindings.borrow().as_ref() {
            if bindings.contains_key(key) {
                return bindings.get(key);
            }
        }
        self.inner.props.get(key).unwrap_or(Value::Null)
    }

    /// The resolved slots of the owning vnode.
    pub fn slots(&self) -> Slots {
        self.inner.slots.borrow().clone()
    }

    /// The host node the committed subtree mounted to.
    pub fn el(&self) -> Option<HostNode> {
        self.inner.vnode.borrow().el()
    }

    /// Fire an event: resolves `my-event` to the `onMyEvent` handler prop
    /// on the owning vnode and invokes it.
    pub fn emit(&self, event: &str, args: Vec<Value>) {
        let handler = self.inner.props.get(&handler_prop_name(event));
        if let Some(Value::Func(handler)) = handler {
            handler(&args);
        }
    }

    pub fn parent(&self) -> Option<Instance> {
        self.inner.parent.clone()
    }

    pub(crate) fn provide_value(&self, key: &str, value: Value) {
        self.inner.provides.borrow_mut().insert(key.to_string(), value);
    }

    pub(crate) fn provided(&self, key: &str) -> Option<Value> {
        self.inner.provides.borrow().get(key).cloned()
    }

    pub(crate) fn vnode(&self) -> VNode {
        self.inner.vnode.borrow().clone()
    }

    pub(crate) fn set_vnode(&self, vnode: VNode) {
        *self.inner.vnode.borrow_mut() = vnode;
    }

    pub(crate) fn props(&self) -> &RawMap {
        &self.inner.props
    }

    pub(crate) fn replace_props(&self, props: &Props) {
        self.inner
            .props
            .replace_entries(props.iter().map(|(k, v)| (k.clone(), v.clone())));
    }

    pub(crate) fn render_fn(&self) -> Option<RenderFn> {
        self.inner.render.borrow().clone()
    }

    pub(crate) fn replace_sub_tree(&self, sub_tree: VNode) -> Option<VNode> {
        self.inner.sub_tree.borrow_mut().replace(sub_tree)
    }

    pub(crate) fn set_next(&self, vnode: VNode) {
        *self.inner.next.borrow_mut() = Some(vnode);
    }

    pub(crate) fn take_next(&self) -> Option<VNode> {
        self.inner.next.borrow_mut().take()
    }

    pub(crate) fn runner(&self) -> Option<Effect> {
        self.inner.runner.borrow().clone()
    }

    pub(crate) fn set_runner(&self, runner: Effect) {
        *self.inner.runner.borrow_mut() = Some(runner);
    }

    pub(crate) fn same(&self, other: &Instance) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    pub(crate) fn def_display_name(&self) -> String {
        self.inner.def.display_name().to_string()
    }

    fn emitter(&self) -> Emitter {
        Emitter {
            instance: Rc::downgrade(&self.inner),
        }
    }
}

// =============================================================================
// Setup phase
// =============================================================================

thread_local! {
    /// Valid only while a component's setup function is running.
    static CURRENT_INSTANCE: RefCell<Option<Instance>> = const { RefCell::new(None) };

    /// The registered template compiler, consulted as the last render
    /// resolution step.
    static COMPILER: RefCell<Option<CompileFn>> = const { RefCell::new(None) };
}

/// The instance currently running its setup phase, if any.
pub fn get_current_instance() -> Option<Instance> {
    CURRENT_INSTANCE.with(|slot| slot.borrow().clone())
}

/// Register the template compiler. Must happen before the first
/// template-bearing component is set up; registering again replaces the
/// previous compiler.
pub fn register_runtime_compiler(compiler: impl Fn(&str) -> RenderFn + 'static) {
    COMPILER.with(|slot| *slot.borrow_mut() = Some(Rc::new(compiler)));
}

fn with_current_instance<R>(instance: &Instance, f: impl FnOnce() -> R) -> R {
    CURRENT_INSTANCE.with(|slot| *slot.borrow_mut() = Some(instance.clone()));
    let result = f();
    CURRENT_INSTANCE.with(|slot| *slot.borrow_mut() = None);
    result
}

/// Run the setup phase of a freshly created instance: resolve props and
/// slots from the owning vnode, invoke setup with shallow-readonly props,
/// and resolve the render function.
pub(crate) fn setup_component(instance: &Instance) -> Result<(), RenderError> {
    let vnode = instance.vnode();

    instance.replace_props(vnode.props());
    if let Children::Slots(slots) = vnode.children() {
        *instance.inner.slots.borrow_mut() = slots.clone();
    }

    if vnode.shape().contains(ShapeFlags::STATEFUL_COMPONENT) {
        if let Some(setup) = instance.inner.def.setup.as_ref() {
            let props_view = shallow_readonly(instance.props());
            let context = SetupContext {
                emitter: instance.emitter(),
            };
            let result = with_current_instance(instance, || setup(props_view, context));
            match result {
                Setup::Render(render) => *instance.inner.render.borrow_mut() = Some(render),
                Setup::Bindings(map) => {
                    *instance.inner.bindings.borrow_mut() = Some(proxy_refs(&map));
                }
            }
        }
    }

    finish_component_setup(instance)
}

fn finish_component_setup(instance: &Instance) -> Result<(), RenderError> {
    if instance.inner.render.borrow().is_some() {
        return Ok(());
    }
    if let Some(render) = instance.inner.def.render.clone() {
        *instance.inner.render.borrow_mut() = Some(render);
        return Ok(());
    }
    if let Some(template) = instance.inner.def.template.as_deref() {
        let compiled = COMPILER.with(|slot| slot.borrow().clone().map(|c| c(template)));
        if let Some(render) = compiled {
            *instance.inner.render.borrow_mut() = Some(render);
            return Ok(());
        }
    }
    Err(RenderError::MissingRender(
        instance.inner.def.display_name().to_string(),
    ))
}

// =============================================================================
// Prop comparison
// =============================================================================

/// Per-key shallow comparison of two prop generations.
///
/// Values compare by the value model's rules, so containers and handlers
/// compare by identity. A deep mutation behind an unchanged container
/// reference is invisible here; that is inherent to shallow comparison.
pub(crate) fn same_props(a: &Props, b: &Props) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().all(|(key, value)| b.get(key) == Some(value))
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::vnode::{h, VNodeType};
    use std::cell::Cell;

    fn instance_for(def: Rc<ComponentDef>, props: Props, children: Children) -> Instance {
        let vnode = h(def.clone(), props, children);
        Instance::new(def, vnode, None)
    }

    #[test]
    fn test_handler_prop_name() {
        assert_eq!(handler_prop_name("click"), "onClick");
        assert_eq!(handler_prop_name("my-event"), "onMyEvent");
        assert_eq!(handler_prop_name("my-long-event"), "onMyLongEvent");
        assert_eq!(handler_prop_name("Update"), "onUpdate");
    }

    #[test]
    fn test_setup_receives_shallow_readonly_props() {
        let observed = Rc::new(RefCell::new(Value::Null));
        let observed_clone = observed.clone();
        let def = Rc::new(ComponentDef {
            setup: Some(Box::new(move |props, _| {
                *observed_clone.borrow_mut() = props.get("title");
                // Writes through the props view are rejected silently.
                props.set("title", Value::from("clobbered"));
                Setup::Bindings(RawMap::new())
            })),
            render: Some(Rc::new(|_| h("div", Props::new(), Children::None))),
            ..Default::default()
        });

        let props = Props::from([("title".to_string(), Value::from("hello"))]);
        let instance = instance_for(def, props, Children::None);
        setup_component(&instance).unwrap();

        assert_eq!(*observed.borrow(), Value::from("hello"));
        assert_eq!(instance.get("title"), Value::from("hello"));
    }

    #[test]
    fn test_setup_render_closure_wins_over_def_render() {
        let def = Rc::new(ComponentDef {
            setup: Some(Box::new(|_, _| {
                Setup::Render(Rc::new(|_| h("span", Props::new(), "from setup")))
            })),
            render: Some(Rc::new(|_| h("div", Props::new(), "from def"))),
            ..Default::default()
        });
        let instance = instance_for(def, Props::new(), Children::None);
        setup_component(&instance).unwrap();

        let tree = instance.render_fn().unwrap()(&instance);
        assert_eq!(tree.node_type(), &VNodeType::Element("span".to_string()));
    }

    #[test]
    fn test_missing_render_is_fatal() {
        let def = Rc::new(ComponentDef {
            name: "broken".to_string(),
            ..Default::default()
        });
        let instance = instance_for(def, Props::new(), Children::None);
        let err = setup_component(&instance).unwrap_err();
        assert!(matches!(err, RenderError::MissingRender(name) if name == "broken"));
    }

    #[test]
    fn test_template_falls_back_to_registered_compiler() {
        let compiled = Rc::new(Cell::new(0));
        let compiled_clone = compiled.clone();
        register_runtime_compiler(move |template| {
            compiled_clone.set(compiled_clone.get() + 1);
            let template = template.to_string();
            Rc::new(move |_| h("p", Props::new(), template.clone()))
        });

        let def = Rc::new(ComponentDef {
            template: Some("{{ message }}".to_string()),
            ..Default::default()
        });
        let instance = instance_for(def, Props::new(), Children::None);
        setup_component(&instance).unwrap();
        assert_eq!(compiled.get(), 1);

        let tree = instance.render_fn().unwrap()(&instance);
        assert!(matches!(tree.children(), Children::Text(t) if t == "{{ message }}"));
    }

    #[test]
    fn test_emit_resolves_kebab_case_handlers() {
        let received = Rc::new(RefCell::new(Vec::new()));
        let received_clone = received.clone();
        let props = Props::from([(
            "onValueChange".to_string(),
            Value::handler(move |args| {
                received_clone.borrow_mut().extend(args.to_vec());
            }),
        )]);

        let def = Rc::new(ComponentDef {
            render: Some(Rc::new(|_| h("div", Props::new(), Children::None))),
            ..Default::default()
        });
        let instance = instance_for(def, props, Children::None);
        setup_component(&instance).unwrap();

        instance.emit("value-change", vec![Value::Int(1), Value::from("x")]);
        assert_eq!(
            *received.borrow(),
            vec![Value::Int(1), Value::from("x")]
        );

        // Unknown events are a silent no-op.
        instance.emit("nope", vec![]);
    }

    #[test]
    fn test_bindings_shadow_props_in_lookup() {
        let def = Rc::new(ComponentDef {
            setup: Some(Box::new(|_, _| {
                Setup::Bindings(RawMap::from_entries([(
                    "title".to_string(),
                    Value::from("bound"),
                )]))
            })),
            render: Some(Rc::new(|_| h("div", Props::new(), Children::None))),
            ..Default::default()
        });
        let props = Props::from([
            ("title".to_string(), Value::from("prop")),
            ("extra".to_string(), Value::Int(1)),
        ]);
        let instance = instance_for(def, props, Children::None);
        setup_component(&instance).unwrap();

        assert_eq!(instance.get("title"), Value::from("bound"));
        assert_eq!(instance.get("extra"), Value::Int(1));
        assert_eq!(instance.get("missing"), Value::Null);
    }

    #[test]
    fn test_current_instance_scope_is_setup_only() {
        assert!(get_current_instance().is_none());

        let seen_inside = Rc::new(Cell::new(false));
        let seen_clone = seen_inside.clone();
        let def = Rc::new(ComponentDef {
            setup: Some(Box::new(move |_, _| {
                seen_clone.set(get_current_instance().is_some());
                Setup::Bindings(RawMap::new())
            })),
            render: Some(Rc::new(|_| h("div", Props::new(), Children::None))),
            ..Default::default()
        });
        let instance = instance_for(def, Props::new(), Children::None);
        setup_component(&instance).unwrap();

        assert!(seen_inside.get());
        assert!(get_current_instance().is_none());
    }

    #[test]
    fn test_same_props_shallow_comparison() {
        let shared = RawMap::new();
        let a = Props::from([
            ("n".to_string(), Value::Int(1)),
            ("obj".to_string(), Value::Map(shared.clone())),
        ]);
        let same = Props::from([
            ("n".to_string(), Value::Int(1)),
            ("obj".to_string(), Value::Map(shared.clone())),
        ]);
        let different_value = Props::from([
            ("n".to_string(), Value::Int(2)),
            ("obj".to_string(), Value::Map(shared)),
        ]);
        let different_keys = Props::from([("n".to_string(), Value::Int(1))]);

        assert!(same_props(&a, &same));
        assert!(!same_props(&a, &different_value));
        assert!(!same_props(&a, &different_keys));

        // Identity comparison for containers: a fresh map with equal
        // contents still counts as changed.
        let fresh = Props::from([
            ("n".to_string(), Value::Int(1)),
            ("obj".to_string(), Value::Map(RawMap::new())),
        ]);
        assert!(!same_props(&a, &fresh));
    }
}
