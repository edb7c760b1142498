//! Recording host adapter for integration tests.
//!
//! Keeps a real tree (parent links, ordered children, attrs, handlers)
//! and a log of every adapter call, so tests can count exactly how many
//! host mutations a patch produced and inspect the final child order.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use spark_view::{diff_props, Callback, HostNode, PropPatch, Props, RenderHost, Renderer, Value};

/// One recorded adapter call. `moved` marks an insert of a node that was
/// already attached somewhere, which is how the tests count moves.
#[derive(Debug, Clone, PartialEq)]
pub enum Op {
    CreateElement(String),
    CreateText(String),
    SetText(String),
    SetElementText(String),
    Insert {
        node: HostNode,
        container: HostNode,
        anchor: Option<HostNode>,
        moved: bool,
    },
    Remove(HostNode),
    PatchProps(HostNode),
}

pub enum NodeKind {
    Element(String),
    Text,
}

pub struct NodeData {
    pub kind: NodeKind,
    pub text: String,
    pub parent: Option<HostNode>,
    pub children: Vec<HostNode>,
    pub attrs: HashMap<String, Value>,
    pub handlers: HashMap<String, Callback>,
}

/// The recording host. Node 0 is the pre-created root container.
pub struct RecordingHost {
    nodes: Vec<NodeData>,
    pub ops: Vec<Op>,
}

pub const ROOT: HostNode = HostNode(0);

impl RecordingHost {
    pub fn new() -> Self {
        RecordingHost {
            nodes: vec![NodeData {
                kind: NodeKind::Element("root".to_string()),
                text: String::new(),
                parent: None,
                children: Vec::new(),
                attrs: HashMap::new(),
                handlers: HashMap::new(),
            }],
            ops: Vec::new(),
        }
    }

    fn alloc(&mut self, kind: NodeKind, text: String) -> HostNode {
        let id = HostNode(self.nodes.len());
        self.nodes.push(NodeData {
            kind,
            text,
            parent: None,
            children: Vec::new(),
            attrs: HashMap::new(),
            handlers: HashMap::new(),
        });
        id
    }

    fn detach(&mut self, node: HostNode) {
        if let Some(parent) = self.nodes[node.0].parent.take() {
            self.nodes[parent.0].children.retain(|&c| c != node);
        }
    }

    pub fn node(&self, node: HostNode) -> &NodeData {
        &self.nodes[node.0]
    }

    pub fn children_of(&self, container: HostNode) -> Vec<HostNode> {
        self.nodes[container.0].children.clone()
    }

    pub fn text_of(&self, node: HostNode) -> String {
        self.nodes[node.0].text.clone()
    }

    pub fn find_by_tag(&self, tag: &str) -> Vec<HostNode> {
        (0..self.nodes.len())
            .filter(|&i| matches!(&self.nodes[i].kind, NodeKind::Element(t) if t == tag))
            .map(HostNode)
            .collect()
    }

    pub fn handler_of(&self, node: HostNode, event: &str) -> Option<Callback> {
        self.nodes[node.0].handlers.get(event).cloned()
    }

    /// Serialize a subtree, child order included: `<ul><li>a</li></ul>`.
    pub fn snapshot(&self, node: HostNode) -> String {
        let data = &self.nodes[node.0];
        match &data.kind {
            NodeKind::Text => data.text.clone(),
            NodeKind::Element(tag) => {
                let inner = if data.children.is_empty() {
                    data.text.clone()
                } else {
                    data.children
                        .iter()
                        .map(|&c| self.snapshot(c))
                        .collect::<String>()
                };
                format!("<{tag}>{inner}</{tag}>")
            }
        }
    }

    pub fn clear_ops(&mut self) {
        self.ops.clear();
    }

    pub fn count_creates(&self) -> usize {
        self.ops
            .iter()
            .filter(|op| matches!(op, Op::CreateElement(_) | Op::CreateText(_)))
            .count()
    }

    pub fn count_removes(&self) -> usize {
        self.ops.iter().filter(|op| matches!(op, Op::Remove(_))).count()
    }

    /// Inserts of already-attached nodes.
    pub fn count_moves(&self) -> usize {
        self.ops
            .iter()
            .filter(|op| matches!(op, Op::Insert { moved: true, .. }))
            .count()
    }

    /// Inserts of fresh nodes.
    pub fn count_mounts(&self) -> usize {
        self.ops
            .iter()
            .filter(|op| matches!(op, Op::Insert { moved: false, .. }))
            .count()
    }

    pub fn count_text_sets(&self) -> usize {
        self.ops
            .iter()
            .filter(|op| matches!(op, Op::SetText(_) | Op::SetElementText(_)))
            .count()
    }
}

impl RenderHost for RecordingHost {
    fn create_element(&mut self, tag: &str) -> HostNode {
        self.ops.push(Op::CreateElement(tag.to_string()));
        self.alloc(NodeKind::Element(tag.to_string()), String::new())
    }

    fn create_text(&mut self, content: &str) -> HostNode {
        self.ops.push(Op::CreateText(content.to_string()));
        self.alloc(NodeKind::Text, content.to_string())
    }

    fn set_text(&mut self, node: HostNode, content: &str) {
        self.ops.push(Op::SetText(content.to_string()));
        self.nodes[node.0].text = content.to_string();
    }

    fn set_element_text(&mut self, node: HostNode, content: &str) {
        self.ops.push(Op::SetElementText(content.to_string()));
        // Literal text replaces any structured children.
        let children = std::mem::take(&mut self.nodes[node.0].children);
        for child in children {
            self.nodes[child.0].parent = None;
        }
        self.nodes[node.0].text = content.to_string();
    }

    fn insert(&mut self, node: HostNode, container: HostNode, anchor: Option<HostNode>) {
        let moved = self.nodes[node.0].parent.is_some();
        self.ops.push(Op::Insert {
            node,
            container,
            anchor,
            moved,
        });
        self.detach(node);
        self.nodes[node.0].parent = Some(container);
        let children = &mut self.nodes[container.0].children;
        let position = anchor
            .and_then(|a| children.iter().position(|&c| c == a))
            .unwrap_or(children.len());
        children.insert(position, node);
    }

    fn remove(&mut self, node: HostNode) {
        self.ops.push(Op::Remove(node));
        self.detach(node);
    }

    fn patch_props(&mut self, node: HostNode, old: &Props, new: &Props) {
        self.ops.push(Op::PatchProps(node));
        for patch in diff_props(old, new) {
            match patch {
                PropPatch::SetAttr { key, value } => {
                    self.nodes[node.0].attrs.insert(key, value);
                }
                PropPatch::RemoveAttr { key } => {
                    self.nodes[node.0].attrs.remove(&key);
                }
                PropPatch::AddHandler { event, handler } => {
                    self.nodes[node.0].handlers.insert(event, handler);
                }
                PropPatch::RemoveHandler { event } => {
                    self.nodes[node.0].handlers.remove(&event);
                }
            }
        }
    }
}

/// A renderer over a fresh recording host, plus the shared host handle.
pub fn recording_renderer() -> (Renderer, Rc<RefCell<RecordingHost>>) {
    let host = Rc::new(RefCell::new(RecordingHost::new()));
    let renderer = Renderer::with_shared_host(host.clone());
    (renderer, host)
}
