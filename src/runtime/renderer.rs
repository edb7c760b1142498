//! The patch engine.
//!
//! [`Renderer`] binds a host adapter and converges the host tree onto
//! each new virtual-tree generation with the minimal set of adapter
//! calls. Dispatch is over the next node's type; every path takes the
//! previous node (or none, meaning mount), the host container and an
//! anchor (insertion point, none meaning append).
//!
//! # Keyed children diff
//!
//! The array/array children case is reconciled in three phases:
//!
//! 1. Prefix and suffix sync: walk matching type+key pairs from both
//!    ends, patching in place.
//! 2. Degenerate middles: only new nodes left means mount them before
//!    the node after the synced suffix; only old nodes left means remove
//!    them.
//! 3. General middle: map every unsynced old node to its keyed position
//!    in the new range (unmatched old nodes are removed), compute the
//!    longest increasing subsequence of the matched positions, then walk
//!    the new range backwards. Positions on the subsequence are already
//!    in relative order and only get patched; positions off it are
//!    patched and then moved; unmatched positions mount fresh. Walking
//!    backwards lets every insertion anchor on the already-positioned
//!    next sibling.
//!
//! Key equality is exact equality of the `key` prop. Reorderable lists
//! without keys degrade to positional matching; supplying keys there is
//! a usage contract, not something the engine can recover.

use std::cell::RefCell;
use std::rc::Rc;

use super::component::{
    same_props, setup_component, ComponentDef, Instance, RenderError,
};
use super::host::{HostNode, RenderHost};
use super::scheduler::queue_job;
use super::vnode::{Children, Props, VNode, VNodeType};
use crate::reactivity::effect::Effect;
use crate::utils::longest_increasing_subsequence;

// =============================================================================
// Renderer
// =============================================================================

/// A patch engine bound to one host adapter.
///
/// Cloning shares the adapter binding; clones are what the component
/// update subscribers capture.
#[derive(Clone)]
pub struct Renderer {
    host: Rc<RefCell<dyn RenderHost>>,
}

impl Renderer {
    pub fn new(host: impl RenderHost + 'static) -> Renderer {
        Renderer::with_shared_host(Rc::new(RefCell::new(host)))
    }

    /// Bind an adapter the caller keeps a handle to.
    pub fn with_shared_host(host: Rc<RefCell<dyn RenderHost>>) -> Renderer {
        Renderer { host }
    }

    /// Mount a virtual tree into a host container.
    pub fn render(&self, vnode: &VNode, container: HostNode) -> Result<(), RenderError> {
        self.patch(None, vnode, container, None, None)
    }

    /// Produce an application entry point rooted at `root`.
    pub fn create_app(&self, root: Rc<ComponentDef>) -> App {
        App {
            renderer: self.clone(),
            root,
        }
    }

    // =========================================================================
    // Dispatch
    // =========================================================================

    fn patch(
        &self,
        n1: Option<&VNode>,
        n2: &VNode,
        container: HostNode,
        parent: Option<&Instance>,
        anchor: Option<HostNode>,
    ) -> Result<(), RenderError> {
        // A diverging type or key replaces the node wholesale.
        let mut n1 = n1;
        if let Some(prev) = n1 {
            if !prev.same_as(n2) {
                self.unmount(prev);
                n1 = None;
            }
        }

        match n2.node_type() {
            VNodeType::Fragment => self.process_fragment(n1, n2, container, parent, anchor),
            VNodeType::Text => {
                self.process_text(n1, n2, container, anchor);
                Ok(())
            }
            VNodeType::Element(_) => self.process_element(n1, n2, container, parent, anchor),
            VNodeType::Component(_) => self.process_component(n1, n2, container, parent, anchor),
        }
    }

    /// Remove a subtree's host nodes. Fragments have no host identity, so
    /// their children are removed individually.
    fn unmount(&self, vnode: &VNode) {
        match vnode.node_type() {
            VNodeType::Fragment => {
                if let Children::Nodes(children) = vnode.children() {
                    for child in children {
                        self.unmount(child);
                    }
                }
            }
            _ => {
                if let Some(el) = vnode.el() {
                    self.host.borrow_mut().remove(el);
                }
            }
        }
    }

    // =========================================================================
    // Fragment
    // =========================================================================

    fn process_fragment(
        &self,
        n1: Option<&VNode>,
        n2: &VNode,
        container: HostNode,
        parent: Option<&Instance>,
        anchor: Option<HostNode>,
    ) -> Result<(), RenderError> {
        match n1 {
            None => {
                // The anchor passes through: slot content lands at the
                // call site without a wrapper element.
                for child in child_nodes(n2) {
                    self.patch(None, child, container, parent, anchor)?;
                }
                Ok(())
            }
            Some(prev) => self.patch_keyed_children(
                child_nodes(prev),
                child_nodes(n2),
                container,
                parent,
                anchor,
            ),
        }
    }

    // =========================================================================
    // Text
    // =========================================================================

    fn process_text(
        &self,
        n1: Option<&VNode>,
        n2: &VNode,
        container: HostNode,
        anchor: Option<HostNode>,
    ) {
        let content = text_content(n2);
        match n1 {
            None => {
                let el = self.host.borrow_mut().create_text(content);
                n2.set_el(Some(el));
                self.host.borrow_mut().insert(el, container, anchor);
            }
            Some(prev) => {
                n2.set_el(prev.el());
                if text_content(prev) != content {
                    if let Some(el) = n2.el() {
                        self.host.borrow_mut().set_text(el, content);
                    }
                }
            }
        }
    }

    // =========================================================================
    // Element
    // =========================================================================

    fn process_element(
        &self,
        n1: Option<&VNode>,
        n2: &VNode,
        container: HostNode,
        parent: Option<&Instance>,
        anchor: Option<HostNode>,
    ) -> Result<(), RenderError> {
        match n1 {
            None => self.mount_element(n2, container, parent, anchor),
            Some(prev) => self.update_element(prev, n2, container, parent, anchor),
        }
    }

    fn mount_element(
        &self,
        vnode: &VNode,
        container: HostNode,
        parent: Option<&Instance>,
        anchor: Option<HostNode>,
    ) -> Result<(), RenderError> {
        let VNodeType::Element(tag) = vnode.node_type() else {
            return Ok(());
        };
        let el = self.host.borrow_mut().create_element(tag);
        vnode.set_el(Some(el));

        self.host
            .borrow_mut()
            .patch_props(el, &Props::new(), vnode.props());

        match vnode.children() {
            Children::Text(text) => self.host.borrow_mut().set_element_text(el, text),
            Children::Nodes(children) => {
                for child in children {
                    self.patch(None, child, el, parent, None)?;
                }
            }
            Children::Slots(_) | Children::None => {}
        }

        self.host.borrow_mut().insert(el, container, anchor);
        Ok(())
    }

    fn update_element(
        &self,
        n1: &VNode,
        n2: &VNode,
        container: HostNode,
        parent: Option<&Instance>,
        anchor: Option<HostNode>,
    ) -> Result<(), RenderError> {
        let Some(el) = n1.el() else {
            return self.mount_element(n2, container, parent, anchor);
        };
        n2.set_el(Some(el));
        self.host.borrow_mut().patch_props(el, n1.props(), n2.props());
        self.update_children(n1, n2, el, parent, anchor)
    }

    // =========================================================================
    // Children diff
    // =========================================================================

    fn update_children(
        &self,
        n1: &VNode,
        n2: &VNode,
        container: HostNode,
        parent: Option<&Instance>,
        anchor: Option<HostNode>,
    ) -> Result<(), RenderError> {
        match n2.children() {
            Children::Text(new_text) => {
                match n1.children() {
                    Children::Nodes(old_children) => {
                        for child in old_children {
                            self.unmount(child);
                        }
                        self.host.borrow_mut().set_element_text(container, new_text);
                    }
                    Children::Text(old_text) => {
                        if old_text != new_text {
                            self.host.borrow_mut().set_element_text(container, new_text);
                        }
                    }
                    Children::Slots(_) | Children::None => {
                        self.host.borrow_mut().set_element_text(container, new_text);
                    }
                }
                Ok(())
            }
            Children::Nodes(new_children) => match n1.children() {
                Children::Text(_) => {
                    // No reuse across the kind switch: clear, then mount
                    // every new child fresh.
                    self.host.borrow_mut().set_element_text(container, "");
                    for child in new_children {
                        self.patch(None, child, container, parent, None)?;
                    }
                    Ok(())
                }
                Children::Nodes(old_children) => self.patch_keyed_children(
                    old_children,
                    new_children,
                    container,
                    parent,
                    anchor,
                ),
                Children::Slots(_) | Children::None => {
                    for child in new_children {
                        self.patch(None, child, container, parent, None)?;
                    }
                    Ok(())
                }
            },
            Children::Slots(_) | Children::None => {
                match n1.children() {
                    Children::Text(_) => self.host.borrow_mut().set_element_text(container, ""),
                    Children::Nodes(old_children) => {
                        for child in old_children {
                            self.unmount(child);
                        }
                    }
                    Children::Slots(_) | Children::None => {}
                }
                Ok(())
            }
        }
    }

    fn patch_keyed_children(
        &self,
        c1: &[VNode],
        c2: &[VNode],
        container: HostNode,
        parent: Option<&Instance>,
        anchor: Option<HostNode>,
    ) -> Result<(), RenderError> {
        let mut i: isize = 0;
        let mut e1: isize = c1.len() as isize - 1;
        let mut e2: isize = c2.len() as isize - 1;

        // Prefix sync.
        while i <= e1 && i <= e2 && c1[i as usize].same_as(&c2[i as usize]) {
            self.patch(Some(&c1[i as usize]), &c2[i as usize], container, parent, anchor)?;
            i += 1;
        }

        // Suffix sync.
        while i <= e1 && i <= e2 && c1[e1 as usize].same_as(&c2[e2 as usize]) {
            self.patch(Some(&c1[e1 as usize]), &c2[e2 as usize], container, parent, anchor)?;
            e1 -= 1;
            e2 -= 1;
        }

        if i > e1 {
            // Pure insertion: mount the remaining new nodes before the
            // node after the synced suffix, or at the inherited anchor.
            if i <= e2 {
                let next = (e2 + 1) as usize;
                let insert_anchor = if next < c2.len() { c2[next].el() } else { anchor };
                for j in i..=e2 {
                    self.patch(None, &c2[j as usize], container, parent, insert_anchor)?;
                }
            }
            Ok(())
        } else if i > e2 {
            // Pure removal.
            for j in i..=e1 {
                self.unmount(&c1[j as usize]);
            }
            Ok(())
        } else {
            self.patch_middle(
                c1,
                c2,
                i as usize,
                e1 as usize,
                e2 as usize,
                container,
                parent,
                anchor,
            )
        }
    }

    /// The general middle case: both sides have unsynced entries.
    #[allow(clippy::too_many_arguments)]
    fn patch_middle(
        &self,
        c1: &[VNode],
        c2: &[VNode],
        start: usize,
        e1: usize,
        e2: usize,
        container: HostNode,
        parent: Option<&Instance>,
        anchor: Option<HostNode>,
    ) -> Result<(), RenderError> {
        let new_len = e2 - start + 1;
        // For each unsynced new position, the old node it reuses.
        let mut new_to_old: Vec<Option<usize>> = vec![None; new_len];
        // Matched new-relative positions in old order, the LIS input.
        let mut matched: Vec<usize> = Vec::new();

        for (oi, old_child) in c1.iter().enumerate().take(e1 + 1).skip(start) {
            let found = (start..=e2)
                .find(|&nj| new_to_old[nj - start].is_none() && old_child.same_as(&c2[nj]));
            match found {
                Some(nj) => {
                    new_to_old[nj - start] = Some(oi);
                    matched.push(nj - start);
                }
                // No counterpart in the new range.
                None => self.unmount(old_child),
            }
        }

        // Positions on the subsequence are already in relative order and
        // keep their host nodes in place.
        let stable: Vec<usize> = longest_increasing_subsequence(&matched)
            .into_iter()
            .map(|k| matched[k])
            .collect();

        for rel in (0..new_len).rev() {
            let nj = start + rel;
            let new_child = &c2[nj];
            let insert_anchor = if nj + 1 < c2.len() { c2[nj + 1].el() } else { anchor };
            match new_to_old[rel] {
                None => self.patch(None, new_child, container, parent, insert_anchor)?,
                Some(oi) => {
                    self.patch(Some(&c1[oi]), new_child, container, parent, insert_anchor)?;
                    if !stable.contains(&rel) {
                        if let Some(el) = new_child.el() {
                            self.host.borrow_mut().insert(el, container, insert_anchor);
                        }
                    }
                }
            }
        }
        Ok(())
    }

    // =========================================================================
    // Component
    // =========================================================================

    fn process_component(
        &self,
        n1: Option<&VNode>,
        n2: &VNode,
        container: HostNode,
        parent: Option<&Instance>,
        anchor: Option<HostNode>,
    ) -> Result<(), RenderError> {
        let Some(prev) = n1 else {
            return self.mount_component(n2, container, parent, anchor);
        };

        n2.set_el(prev.el());
        let Some(instance) = prev.component() else {
            return self.mount_component(n2, container, parent, anchor);
        };
        n2.set_component(instance.clone());

        if same_props(prev.props(), n2.props()) {
            // Nothing the render could observe changed: adopt the new
            // vnode without re-rendering.
            instance.set_vnode(n2.clone());
        } else {
            // The prop change must be visible before the caller's next
            // read, so the update runs now, bypassing the batch queue.
            instance.set_next(n2.clone());
            if let Some(runner) = instance.runner() {
                runner.run();
            }
        }
        Ok(())
    }

    fn mount_component(
        &self,
        vnode: &VNode,
        container: HostNode,
        parent: Option<&Instance>,
        anchor: Option<HostNode>,
    ) -> Result<(), RenderError> {
        let def = match vnode.node_type() {
            VNodeType::Component(def) => def.clone(),
            _ => return Ok(()),
        };
        let instance = Instance::new(def, vnode.clone(), parent.cloned());
        vnode.set_component(instance.clone());
        setup_component(&instance)?;
        self.setup_render_effect(instance, container, anchor);
        Ok(())
    }

    /// Establish the re-render subscriber. The first run mounts the
    /// subtree; later triggers go through the scheduler into the batch
    /// queue instead of running synchronously.
    fn setup_render_effect(&self, instance: Instance, container: HostNode, anchor: Option<HostNode>) {
        let renderer = self.clone();
        let update_instance = instance.clone();
        let scheduler_instance = instance.clone();
        let runner = Effect::with_scheduler(
            move || {
                if let Err(err) = renderer.component_update(&update_instance, container, anchor) {
                    // A scheduled re-render has no caller to hand the
                    // configuration error back to.
                    panic!("unrecoverable render failure: {err}");
                }
            },
            move || {
                if let Some(runner) = scheduler_instance.runner() {
                    queue_job(runner);
                }
            },
        );
        instance.set_runner(runner);
    }

    fn component_update(
        &self,
        instance: &Instance,
        container: HostNode,
        anchor: Option<HostNode>,
    ) -> Result<(), RenderError> {
        // Apply the staged vnode first so the render sees the new props.
        if let Some(next) = instance.take_next() {
            instance.replace_props(next.props());
            instance.set_vnode(next);
        }

        let Some(render) = instance.render_fn() else {
            return Err(RenderError::MissingRender(instance.def_display_name()));
        };

        let sub_tree = render(instance);
        let prev = instance.replace_sub_tree(sub_tree.clone());
        self.patch(prev.as_ref(), &sub_tree, container, Some(instance), anchor)?;
        instance.vnode().set_el(sub_tree.el());
        Ok(())
    }
}

// =============================================================================
// App
// =============================================================================

/// An application entry point: a renderer bound to a root component.
pub struct App {
    renderer: Renderer,
    root: Rc<ComponentDef>,
}

impl App {
    /// Build the root component vnode and mount it into `container`.
    pub fn mount(&self, container: HostNode) -> Result<(), RenderError> {
        let vnode = VNode::new(
            VNodeType::Component(self.root.clone()),
            Props::new(),
            Children::None,
        );
        self.renderer.render(&vnode, container)
    }
}

// =============================================================================
// Helpers
// =============================================================================

fn child_nodes(vnode: &VNode) -> &[VNode] {
    match vnode.children() {
        Children::Nodes(nodes) => nodes,
        _ => &[],
    }
}

fn text_content(vnode: &VNode) -> &str {
    match vnode.children() {
        Children::Text(text) => text,
        _ => "",
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::vnode::{create_text_vnode, fragment, h};

    /// A minimal host that only logs operation names.
    #[derive(Default)]
    struct LogHost {
        next_id: usize,
        ops: Vec<String>,
    }

    impl RenderHost for LogHost {
        fn create_element(&mut self, tag: &str) -> HostNode {
            self.next_id += 1;
            self.ops.push(format!("create_element({tag})"));
            HostNode(self.next_id)
        }

        fn create_text(&mut self, content: &str) -> HostNode {
            self.next_id += 1;
            self.ops.push(format!("create_text({content})"));
            HostNode(self.next_id)
        }

        fn set_text(&mut self, _node: HostNode, content: &str) {
            self.ops.push(format!("set_text({content})"));
        }

        fn set_element_text(&mut self, _node: HostNode, content: &str) {
            self.ops.push(format!("set_element_text({content})"));
        }

        fn insert(&mut self, node: HostNode, _container: HostNode, _anchor: Option<HostNode>) {
            self.ops.push(format!("insert({})", node.0));
        }

        fn remove(&mut self, node: HostNode) {
            self.ops.push(format!("remove({})", node.0));
        }

        fn patch_props(&mut self, _node: HostNode, _old: &Props, _new: &Props) {
            self.ops.push("patch_props".to_string());
        }
    }

    fn log_renderer() -> (Renderer, Rc<RefCell<LogHost>>) {
        let host = Rc::new(RefCell::new(LogHost::default()));
        (Renderer::with_shared_host(host.clone()), host)
    }

    #[test]
    fn test_mount_element_with_text() {
        let (renderer, host) = log_renderer();
        let root = HostNode(0);
        renderer.render(&h("div", Props::new(), "hi"), root).unwrap();
        assert_eq!(
            host.borrow().ops,
            vec![
                "create_element(div)",
                "patch_props",
                "set_element_text(hi)",
                "insert(1)",
            ]
        );
    }

    #[test]
    fn test_text_updates_in_place() {
        let (renderer, host) = log_renderer();
        let root = HostNode(0);

        let first = create_text_vnode("a");
        renderer.render(&first, root).unwrap();
        host.borrow_mut().ops.clear();

        let second = create_text_vnode("b");
        renderer.patch(Some(&first), &second, root, None, None).unwrap();
        assert_eq!(host.borrow().ops, vec!["set_text(b)"]);
        assert_eq!(second.el(), first.el());

        // Identical content touches nothing.
        host.borrow_mut().ops.clear();
        let third = create_text_vnode("b");
        renderer.patch(Some(&second), &third, root, None, None).unwrap();
        assert!(host.borrow().ops.is_empty());
    }

    #[test]
    fn test_fragment_passes_anchor_through() {
        let (renderer, host) = log_renderer();
        let root = HostNode(0);
        let tree = fragment(vec![create_text_vnode("a"), create_text_vnode("b")]);
        renderer.render(&tree, root).unwrap();
        // Two text nodes, no wrapper element.
        assert_eq!(
            host.borrow().ops,
            vec!["create_text(a)", "insert(1)", "create_text(b)", "insert(2)"]
        );
    }

    #[test]
    fn test_type_divergence_replaces_wholesale() {
        let (renderer, host) = log_renderer();
        let root = HostNode(0);

        let old = h("div", Props::new(), "x");
        renderer.render(&old, root).unwrap();
        host.borrow_mut().ops.clear();

        let new = h("span", Props::new(), "x");
        renderer.patch(Some(&old), &new, root, None, None).unwrap();
        let ops = host.borrow().ops.clone();
        assert_eq!(ops[0], "remove(1)");
        assert!(ops.contains(&"create_element(span)".to_string()));
    }
}
