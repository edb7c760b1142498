//! Render-host adapter interface.
//!
//! The patch engine never touches a concrete host. It speaks this small
//! operation set, and a host binding (DOM, terminal, test double) supplies
//! the implementation. Host nodes are plain copyable ids minted by the
//! host itself.

use crate::runtime::vnode::Props;

/// An opaque handle to a node owned by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HostNode(pub usize);

/// The operation set a host environment implements for the patch engine.
///
/// `insert` with no anchor appends to the container. `patch_props`
/// receives both prop generations and applies the prop-diff policy; hosts
/// typically lower the pair with [`crate::runtime::props::diff_props`].
pub trait RenderHost {
    fn create_element(&mut self, tag: &str) -> HostNode;

    fn create_text(&mut self, content: &str) -> HostNode;

    fn set_text(&mut self, node: HostNode, content: &str);

    fn set_element_text(&mut self, node: HostNode, content: &str);

    fn insert(&mut self, node: HostNode, container: HostNode, anchor: Option<HostNode>);

    fn remove(&mut self, node: HostNode);

    fn patch_props(&mut self, node: HostNode, old: &Props, new: &Props);
}
