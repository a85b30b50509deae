//! The virtual node model.
//!
//! Trees are immutable snapshots built once and shared via [`Rc`], so a patch
//! record can hold onto the exact node it refers to, the same way a DOM patch
//! holds a node reference. Structural bookkeeping that the diff relies on
//! (descendant counts, lifecycle flags, subtree hashes) is computed at
//! construction and never accepted from callers — a stale descendant count
//! would misalign every traversal index downstream of it.

use core::cell::OnceCell;
use core::fmt;
use core::hash::{Hash, Hasher};
use std::rc::Rc;

use compact_str::CompactString;
use rapidhash::RapidHasher;

use crate::props::{PropValue, Props, hash_props};

/// A caller-assigned identity attached to a child node, used to match it
/// across two sibling lists independent of position. Opaque to the diff.
pub type Key = CompactString;

/// A node in a virtual tree.
///
/// The four variants cover the capability set the diff cares about: elements
/// are the only structural nodes; text carries a value and nothing else;
/// widgets are atomic black boxes with their own lifecycle; thunks defer to a
/// concrete node resolved at diff time.
#[derive(Debug)]
pub enum VNode {
    /// An element with a tag, properties, and ordered children.
    Element(VElement),
    /// An immutable text node.
    Text(VText),
    /// An opaque widget; the diff never descends into it.
    Widget(VWidget),
    /// A deferred node producer, resolved lazily during a diff pass.
    Thunk(VThunk),
}

impl VNode {
    /// Build a text node.
    pub fn text(text: impl Into<CompactString>) -> Rc<VNode> {
        Rc::new(VNode::Text(VText { text: text.into() }))
    }

    /// Build a widget node with no teardown callback.
    pub fn widget(id: u64) -> Rc<VNode> {
        Rc::new(VNode::Widget(VWidget { id, destroy: None }))
    }

    /// Build a widget node that must be destroyed when removed.
    pub fn widget_with_destroy(id: u64, destroy: Rc<dyn Fn()>) -> Rc<VNode> {
        Rc::new(VNode::Widget(VWidget {
            id,
            destroy: Some(destroy),
        }))
    }

    /// Build a thunk node around a resolver.
    pub fn thunk(render: Rc<dyn ThunkRender>) -> Rc<VNode> {
        Rc::new(VNode::Thunk(VThunk::new(render)))
    }

    /// Is this node an element?
    pub fn is_element(&self) -> bool {
        matches!(self, VNode::Element(_))
    }

    /// Is this node a text leaf?
    pub fn is_text(&self) -> bool {
        matches!(self, VNode::Text(_))
    }

    /// Is this node an opaque widget?
    pub fn is_widget(&self) -> bool {
        matches!(self, VNode::Widget(_))
    }

    /// Is this node a lazy thunk?
    pub fn is_thunk(&self) -> bool {
        matches!(self, VNode::Thunk(_))
    }

    /// The node's reconciliation key, if it has one. Only elements carry
    /// keys; every other node is matched positionally.
    pub fn key(&self) -> Option<&Key> {
        match self {
            VNode::Element(e) => e.key.as_ref(),
            _ => None,
        }
    }

    /// Total number of nodes in this node's subtree, excluding the node
    /// itself. Zero for anything but an element.
    ///
    /// This is what lets the walker skip traversal indices past a sibling's
    /// subtree without visiting it.
    pub fn descendant_count(&self) -> usize {
        match self {
            VNode::Element(e) => e.descendant_count(),
            _ => 0,
        }
    }

    /// A Merkle-style hash of this subtree, used to short-circuit the walk
    /// when two snapshots are value-identical. Precomputed for elements,
    /// cheap to derive for leaves.
    pub fn node_hash(&self) -> u64 {
        match self {
            VNode::Element(e) => e.hash,
            VNode::Text(t) => {
                let mut h = RapidHasher::default();
                1u8.hash(&mut h);
                t.text.hash(&mut h);
                h.finish()
            }
            VNode::Widget(w) => {
                let mut h = RapidHasher::default();
                2u8.hash(&mut h);
                w.id.hash(&mut h);
                if let Some(destroy) = &w.destroy {
                    (Rc::as_ptr(destroy) as *const () as usize).hash(&mut h);
                }
                h.finish()
            }
            VNode::Thunk(t) => {
                let mut h = RapidHasher::default();
                3u8.hash(&mut h);
                (Rc::as_ptr(&t.render) as *const () as usize).hash(&mut h);
                h.finish()
            }
        }
    }
}

impl PartialEq for VNode {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (VNode::Element(a), VNode::Element(b)) => a == b,
            (VNode::Text(a), VNode::Text(b)) => a == b,
            (VNode::Widget(a), VNode::Widget(b)) => a == b,
            (VNode::Thunk(a), VNode::Thunk(b)) => a == b,
            _ => false,
        }
    }
}

impl fmt::Display for VNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VNode::Element(e) => write!(f, "<{}>", e.tag),
            VNode::Text(_) => write!(f, "#text"),
            VNode::Widget(w) => write!(f, "#widget({})", w.id),
            VNode::Thunk(_) => write!(f, "#thunk"),
        }
    }
}

/// Snapshot identity: either the same allocation, or value-identical
/// subtrees. The hash check makes the deep comparison rare on mismatches.
pub(crate) fn same_node(a: &Rc<VNode>, b: &Rc<VNode>) -> bool {
    Rc::ptr_eq(a, b) || (a.node_hash() == b.node_hash() && a == b)
}

pub(crate) fn rc_addr_eq<T: ?Sized>(a: &Rc<T>, b: &Rc<T>) -> bool {
    core::ptr::addr_eq(Rc::as_ptr(a), Rc::as_ptr(b))
}

/// Lifecycle flags for an element, derived from its props and children at
/// construction. The cleanup traversals consult these to prune recursion.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NodeFlags {
    /// A destroyable widget exists somewhere in the subtree below this node.
    pub has_widgets: bool,
    /// A thunk exists somewhere in the subtree below this node.
    pub has_thunks: bool,
    /// This element itself carries hook-valued props.
    pub has_hooks: bool,
    /// Some descendant element carries hook-valued props.
    pub has_descendant_hooks: bool,
}

/// An element node: tag, optional namespace and key, a property map, and an
/// ordered child list.
#[derive(Debug)]
pub struct VElement {
    /// Tag name.
    pub tag: CompactString,
    /// Optional namespace (e.g. an SVG namespace URI).
    pub namespace: Option<CompactString>,
    /// Optional reconciliation key. Empty keys are normalized away at
    /// construction; an empty key means "no key".
    pub key: Option<Key>,
    /// Property map, in insertion order.
    pub props: Props,
    /// Ordered children.
    pub children: Vec<Rc<VNode>>,
    count: usize,
    flags: NodeFlags,
    hash: u64,
}

impl VElement {
    /// Build an element, computing its descendant count, lifecycle flags,
    /// and subtree hash.
    pub fn new(
        tag: impl Into<CompactString>,
        namespace: Option<CompactString>,
        key: Option<Key>,
        props: Props,
        children: Vec<Rc<VNode>>,
    ) -> VElement {
        let tag = tag.into();
        let key = key.filter(|k| !k.is_empty());

        let mut count = 0;
        let mut flags = NodeFlags::default();
        for child in &children {
            count += 1 + child.descendant_count();
            match &**child {
                VNode::Element(e) => {
                    flags.has_widgets |= e.flags.has_widgets;
                    flags.has_thunks |= e.flags.has_thunks;
                    flags.has_descendant_hooks |= e.flags.has_hooks || e.flags.has_descendant_hooks;
                }
                VNode::Widget(w) => flags.has_widgets |= w.destroy.is_some(),
                VNode::Thunk(_) => flags.has_thunks = true,
                VNode::Text(_) => {}
            }
        }
        flags.has_hooks = props.values().any(|v| matches!(v, PropValue::Hook(_)));

        let mut h = RapidHasher::default();
        0u8.hash(&mut h);
        tag.hash(&mut h);
        namespace.hash(&mut h);
        key.hash(&mut h);
        hash_props(&props, &mut h);
        for child in &children {
            child.node_hash().hash(&mut h);
        }
        let hash = h.finish();

        VElement {
            tag,
            namespace,
            key,
            props,
            children,
            count,
            flags,
            hash,
        }
    }

    /// Start building an element with the given tag.
    pub fn builder(tag: impl Into<CompactString>) -> ElementBuilder {
        ElementBuilder {
            tag: tag.into(),
            namespace: None,
            key: None,
            props: Props::new(),
            children: Vec::new(),
        }
    }

    /// Total number of nodes in this element's subtree, excluding itself.
    pub fn descendant_count(&self) -> usize {
        self.count
    }

    /// The element's lifecycle flags.
    pub fn flags(&self) -> NodeFlags {
        self.flags
    }
}

impl PartialEq for VElement {
    fn eq(&self, other: &Self) -> bool {
        self.hash == other.hash
            && self.tag == other.tag
            && self.namespace == other.namespace
            && self.key == other.key
            && self.props == other.props
            && self.children == other.children
    }
}

/// An immutable text node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VText {
    /// The text value.
    pub text: CompactString,
}

/// An opaque widget node. Structurally atomic: the diff compares widgets by
/// identity and never looks inside.
pub struct VWidget {
    /// The widget's identity.
    pub id: u64,
    /// Teardown callback, fired by the patch applier when the widget leaves
    /// the tree. A widget without one needs no destruction pass.
    pub destroy: Option<Rc<dyn Fn()>>,
}

impl PartialEq for VWidget {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
            && match (&self.destroy, &other.destroy) {
                (None, None) => true,
                (Some(a), Some(b)) => rc_addr_eq(a, b),
                _ => false,
            }
    }
}

impl fmt::Debug for VWidget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VWidget")
            .field("id", &self.id)
            .field("destroy", &self.destroy.is_some())
            .finish()
    }
}

/// The injected capability that resolves a thunk to a concrete node.
///
/// Resolvers must be pure: resolving the same thunk twice must yield
/// diff-equivalent output. [`VThunk`] enforces per-node idempotence by
/// caching the first resolution.
pub trait ThunkRender {
    /// Produce the concrete node this thunk stands for. `previous` is the
    /// node this thunk replaces (the old side of the diff), when there is
    /// one; resolvers may use it to reuse prior work.
    fn render(&self, previous: Option<&Rc<VNode>>) -> Rc<VNode>;
}

/// A deferred node producer, resolved at diff time.
pub struct VThunk {
    render: Rc<dyn ThunkRender>,
    rendered: OnceCell<Rc<VNode>>,
}

impl VThunk {
    /// Wrap a resolver in a thunk node.
    pub fn new(render: Rc<dyn ThunkRender>) -> VThunk {
        VThunk {
            render,
            rendered: OnceCell::new(),
        }
    }

    /// Resolve this thunk to a concrete node, caching the result so repeated
    /// resolution within and across diff passes yields the same node.
    ///
    /// # Panics
    ///
    /// Panics if the resolver yields another thunk; resolution must produce
    /// a concrete element, text, or widget node.
    pub fn resolve(&self, previous: Option<&Rc<VNode>>) -> Rc<VNode> {
        let node = self
            .rendered
            .get_or_init(|| self.render.render(previous))
            .clone();
        assert!(!node.is_thunk(), "thunk resolved to another thunk");
        node
    }

    /// The cached resolution, if this thunk has been resolved.
    pub fn rendered(&self) -> Option<&Rc<VNode>> {
        self.rendered.get()
    }
}

impl PartialEq for VThunk {
    fn eq(&self, other: &Self) -> bool {
        rc_addr_eq(&self.render, &other.render)
    }
}

impl fmt::Debug for VThunk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VThunk")
            .field("rendered", &self.rendered.get().is_some())
            .finish()
    }
}

/// Fluent construction for [`VElement`], the public path for building trees.
pub struct ElementBuilder {
    tag: CompactString,
    namespace: Option<CompactString>,
    key: Option<Key>,
    props: Props,
    children: Vec<Rc<VNode>>,
}

impl ElementBuilder {
    /// Set the element's namespace.
    pub fn namespace(mut self, namespace: impl Into<CompactString>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    /// Set the element's reconciliation key.
    pub fn key(mut self, key: impl Into<Key>) -> Self {
        self.key = Some(key.into());
        self
    }

    /// Add a property.
    pub fn prop(mut self, name: impl Into<CompactString>, value: impl Into<PropValue>) -> Self {
        self.props.insert(name.into(), value.into());
        self
    }

    /// Add a child node.
    pub fn child(mut self, child: Rc<VNode>) -> Self {
        self.children.push(child);
        self
    }

    /// Add several child nodes.
    pub fn children(mut self, children: impl IntoIterator<Item = Rc<VNode>>) -> Self {
        self.children.extend(children);
        self
    }

    /// Finish, producing a shared element node.
    pub fn build(self) -> Rc<VNode> {
        Rc::new(VNode::Element(VElement::new(
            self.tag,
            self.namespace,
            self.key,
            self.props,
            self.children,
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_descendant_count_nested() {
        let tree = VElement::builder("div")
            .child(
                VElement::builder("ul")
                    .child(VElement::builder("li").child(VNode::text("a")).build())
                    .child(VElement::builder("li").child(VNode::text("b")).build())
                    .build(),
            )
            .child(VNode::text("tail"))
            .build();
        // ul + 2 li + 2 text + tail text = 6
        assert_eq!(tree.descendant_count(), 6);
    }

    #[test]
    fn test_empty_key_is_no_key() {
        let node = VElement::builder("li").key("").build();
        assert_eq!(node.key(), None);
    }

    #[test]
    fn test_flags_propagate_upward() {
        let destroy: Rc<dyn Fn()> = Rc::new(|| {});
        let tree = VElement::builder("div")
            .child(
                VElement::builder("span")
                    .child(VNode::widget_with_destroy(7, destroy))
                    .build(),
            )
            .build();
        let VNode::Element(e) = &*tree else {
            unreachable!()
        };
        assert!(e.flags().has_widgets);
        assert!(!e.flags().has_thunks);
    }

    #[test]
    fn test_widget_without_destroy_sets_no_flag() {
        let tree = VElement::builder("div").child(VNode::widget(1)).build();
        let VNode::Element(e) = &*tree else {
            unreachable!()
        };
        assert!(!e.flags().has_widgets);
    }

    #[test]
    fn test_value_identical_trees_hash_equal() {
        let build = || {
            VElement::builder("p")
                .prop("class", "x")
                .child(VNode::text("hi"))
                .build()
        };
        let (a, b) = (build(), build());
        assert!(!Rc::ptr_eq(&a, &b));
        assert!(same_node(&a, &b));
    }

    #[test]
    fn test_different_trees_are_not_same() {
        let a = VElement::builder("p").child(VNode::text("hi")).build();
        let b = VElement::builder("p").child(VNode::text("ho")).build();
        assert!(!same_node(&a, &b));
    }
}
