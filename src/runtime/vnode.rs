//! Virtual node model.
//!
//! A [`VNode`] describes one position of the UI tree for one render pass.
//! Nodes are created fresh on every render; the previous generation is
//! kept only as the diffing baseline and then discarded. The node type is
//! a closed sum, the children a closed sum, and the classification is
//! cached as a [`ShapeFlags`] bitmask at creation time.

use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use std::cell::{Cell, RefCell};

use super::component::{ComponentDef, Instance};
use super::host::HostNode;
use crate::value::Value;

// =============================================================================
// Shape flags
// =============================================================================

bitflags::bitflags! {
    /// Cached classification of a virtual node, computed once at creation.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct ShapeFlags: u8 {
        const ELEMENT = 1 << 0;
        const STATEFUL_COMPONENT = 1 << 1;
        const TEXT_CHILDREN = 1 << 2;
        const ARRAY_CHILDREN = 1 << 3;
        const SLOT_CHILDREN = 1 << 4;
    }
}

// =============================================================================
// Node type and children
// =============================================================================

/// The type of a virtual node.
#[derive(Clone)]
pub enum VNodeType {
    /// A host element, named by its tag.
    Element(String),
    /// A component, named by its definition. Definitions compare by
    /// identity.
    Component(Rc<ComponentDef>),
    /// A transparent grouping with no host identity of its own.
    Fragment,
    /// A host text node.
    Text,
}

impl PartialEq for VNodeType {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (VNodeType::Element(a), VNodeType::Element(b)) => a == b,
            (VNodeType::Component(a), VNodeType::Component(b)) => Rc::ptr_eq(a, b),
            (VNodeType::Fragment, VNodeType::Fragment) => true,
            (VNodeType::Text, VNodeType::Text) => true,
            _ => false,
        }
    }
}

impl fmt::Debug for VNodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VNodeType::Element(tag) => write!(f, "Element({tag})"),
            VNodeType::Component(def) => write!(f, "Component({})", def.display_name()),
            VNodeType::Fragment => write!(f, "Fragment"),
            VNodeType::Text => write!(f, "Text"),
        }
    }
}

impl From<&str> for VNodeType {
    fn from(tag: &str) -> Self {
        VNodeType::Element(tag.to_string())
    }
}

impl From<String> for VNodeType {
    fn from(tag: String) -> Self {
        VNodeType::Element(tag)
    }
}

impl From<Rc<ComponentDef>> for VNodeType {
    fn from(def: Rc<ComponentDef>) -> Self {
        VNodeType::Component(def)
    }
}

/// Props mapping: attributes, `onX`-named event handlers and `key`.
pub type Props = HashMap<String, Value>;

/// A named slot renderer. Receives the caller's args (scoped slots) and
/// produces the slot content.
pub type SlotFn = Rc<dyn Fn(Vec<Value>) -> Vec<VNode>>;

/// Slot-name to renderer mapping, the children form of component nodes.
pub type Slots = HashMap<String, SlotFn>;

/// The children of a virtual node.
#[derive(Clone, Default)]
pub enum Children {
    /// Literal text content.
    Text(String),
    /// Ordered child nodes.
    Nodes(Vec<VNode>),
    /// Named slot renderers, for component nodes.
    Slots(Slots),
    #[default]
    None,
}

impl fmt::Debug for Children {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Children::Text(t) => write!(f, "Text({t:?})"),
            Children::Nodes(nodes) => write!(f, "Nodes(len={})", nodes.len()),
            Children::Slots(slots) => write!(f, "Slots(len={})", slots.len()),
            Children::None => write!(f, "None"),
        }
    }
}

impl From<&str> for Children {
    fn from(text: &str) -> Self {
        Children::Text(text.to_string())
    }
}

impl From<String> for Children {
    fn from(text: String) -> Self {
        Children::Text(text)
    }
}

impl From<Vec<VNode>> for Children {
    fn from(nodes: Vec<VNode>) -> Self {
        Children::Nodes(nodes)
    }
}

impl From<Slots> for Children {
    fn from(slots: Slots) -> Self {
        Children::Slots(slots)
    }
}

// =============================================================================
// VNode
// =============================================================================

/// One frame of the UI tree at one position.
///
/// Cloning shares the same node. The descriptor itself is immutable; the
/// mutable cells are the back-references filled in during mounting (the
/// concrete host node and, for components, the instance).
#[derive(Clone)]
pub struct VNode {
    inner: Rc<VNodeInner>,
}

struct VNodeInner {
    node_type: VNodeType,
    props: Props,
    children: Children,
    shape: ShapeFlags,
    el: Cell<Option<HostNode>>,
    component: RefCell<Option<Instance>>,
}

impl VNode {
    pub fn new(node_type: VNodeType, props: Props, children: Children) -> VNode {
        let shape = classify(&node_type, &children);
        VNode {
            inner: Rc::new(VNodeInner {
                node_type,
                props,
                children,
                shape,
                el: Cell::new(None),
                component: RefCell::new(None),
            }),
        }
    }

    pub fn node_type(&self) -> &VNodeType {
        &self.inner.node_type
    }

    pub fn props(&self) -> &Props {
        &self.inner.props
    }

    pub fn children(&self) -> &Children {
        &self.inner.children
    }

    pub fn shape(&self) -> ShapeFlags {
        self.inner.shape
    }

    /// The `key` prop, when present.
    pub fn key(&self) -> Option<&Value> {
        self.inner.props.get("key")
    }

    /// The host node this virtual node mounted to.
    pub fn el(&self) -> Option<HostNode> {
        self.inner.el.get()
    }

    pub(crate) fn set_el(&self, el: Option<HostNode>) {
        self.inner.el.set(el);
    }

    pub(crate) fn component(&self) -> Option<Instance> {
        self.inner.component.borrow().clone()
    }

    pub(crate) fn set_component(&self, instance: Instance) {
        *self.inner.component.borrow_mut() = Some(instance);
    }

    /// Whether `other` describes the same logical node: same type and
    /// same `key` prop. This is the reuse test of the keyed diff.
    pub fn same_as(&self, other: &VNode) -> bool {
        self.node_type() == other.node_type() && self.key() == other.key()
    }
}

impl fmt::Debug for VNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VNode")
            .field("type", &self.inner.node_type)
            .field("key", &self.key())
            .field("shape", &self.inner.shape)
            .finish()
    }
}

fn classify(node_type: &VNodeType, children: &Children) -> ShapeFlags {
    let mut shape = ShapeFlags::empty();
    match node_type {
        VNodeType::Element(_) => shape |= ShapeFlags::ELEMENT,
        VNodeType::Component(def) => {
            if def.setup.is_some() {
                shape |= ShapeFlags::STATEFUL_COMPONENT;
            }
        }
        VNodeType::Fragment | VNodeType::Text => {}
    }
    match children {
        Children::Text(_) => shape |= ShapeFlags::TEXT_CHILDREN,
        Children::Nodes(_) => shape |= ShapeFlags::ARRAY_CHILDREN,
        Children::Slots(_) => shape |= ShapeFlags::SLOT_CHILDREN,
        Children::None => {}
    }
    shape
}

// =============================================================================
// Constructors
// =============================================================================

/// Create a virtual node.
pub fn h(node_type: impl Into<VNodeType>, props: Props, children: impl Into<Children>) -> VNode {
    VNode::new(node_type.into(), props, children.into())
}

/// Create a text virtual node.
pub fn create_text_vnode(text: impl Into<String>) -> VNode {
    VNode::new(VNodeType::Text, Props::new(), Children::Text(text.into()))
}

/// Create a fragment around already-built children.
pub fn fragment(children: Vec<VNode>) -> VNode {
    VNode::new(VNodeType::Fragment, Props::new(), Children::Nodes(children))
}

/// Render a named slot into a fragment, passing `args` to the renderer
/// (scoped slots). A missing slot renders an empty fragment.
pub fn render_slots(slots: &Slots, name: &str, args: Vec<Value>) -> VNode {
    match slots.get(name) {
        Some(slot) => fragment(slot(args)),
        None => fragment(Vec::new()),
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::component::Setup;
    use crate::value::RawMap;

    #[test]
    fn test_element_classification() {
        let node = h("div", Props::new(), "hello");
        assert!(node.shape().contains(ShapeFlags::ELEMENT));
        assert!(node.shape().contains(ShapeFlags::TEXT_CHILDREN));
        assert!(!node.shape().contains(ShapeFlags::ARRAY_CHILDREN));
    }

    #[test]
    fn test_array_children_classification() {
        let node = h("ul", Props::new(), vec![h("li", Props::new(), "a")]);
        assert!(node.shape().contains(ShapeFlags::ARRAY_CHILDREN));
        assert!(!node.shape().contains(ShapeFlags::TEXT_CHILDREN));
    }

    #[test]
    fn test_component_classification() {
        let stateful = Rc::new(ComponentDef {
            setup: Some(Box::new(|_, _| Setup::Bindings(RawMap::new()))),
            ..Default::default()
        });
        let node = h(stateful, Props::new(), Children::None);
        assert!(node.shape().contains(ShapeFlags::STATEFUL_COMPONENT));
        assert!(!node.shape().contains(ShapeFlags::ELEMENT));

        let plain = Rc::new(ComponentDef::default());
        let node = h(plain, Props::new(), Children::None);
        assert!(!node.shape().contains(ShapeFlags::STATEFUL_COMPONENT));
    }

    #[test]
    fn test_same_as_matches_type_and_key() {
        let key = |v: i64| Props::from([("key".to_string(), Value::Int(v))]);
        let a1 = h("li", key(1), "a");
        let a2 = h("li", key(1), "changed");
        let b = h("li", key(2), "a");
        let other_tag = h("span", key(1), "a");

        assert!(a1.same_as(&a2));
        assert!(!a1.same_as(&b));
        assert!(!a1.same_as(&other_tag));
    }

    #[test]
    fn test_keyless_nodes_share_identity() {
        let a = h("li", Props::new(), "a");
        let b = h("li", Props::new(), "b");
        assert!(a.same_as(&b));
    }

    #[test]
    fn test_component_types_compare_by_definition() {
        let def_a = Rc::new(ComponentDef::default());
        let def_b = Rc::new(ComponentDef::default());
        let a1 = h(def_a.clone(), Props::new(), Children::None);
        let a2 = h(def_a, Props::new(), Children::None);
        let b = h(def_b, Props::new(), Children::None);
        assert!(a1.same_as(&a2));
        assert!(!a1.same_as(&b));
    }

    #[test]
    fn test_text_vnode() {
        let node = create_text_vnode("hi");
        assert_eq!(node.node_type(), &VNodeType::Text);
        assert!(matches!(node.children(), Children::Text(t) if t == "hi"));
    }

    #[test]
    fn test_render_slots_wraps_in_fragment() {
        let mut slots: Slots = HashMap::new();
        slots.insert(
            "default".to_string(),
            Rc::new(|args: Vec<Value>| {
                let label = args
                    .first()
                    .and_then(|v| v.as_str().map(str::to_string))
                    .unwrap_or_default();
                vec![create_text_vnode(label)]
            }),
        );

        let node = render_slots(&slots, "default", vec![Value::from("scoped")]);
        assert_eq!(node.node_type(), &VNodeType::Fragment);
        match node.children() {
            Children::Nodes(nodes) => {
                assert_eq!(nodes.len(), 1);
                assert!(matches!(nodes[0].children(), Children::Text(t) if t == "scoped"));
            }
            other => panic!("expected nodes, got {other:?}"),
        }

        let missing = render_slots(&slots, "nope", Vec::new());
        assert!(matches!(missing.children(), Children::Nodes(n) if n.is_empty()));
    }
}
