//! A reference patch applier.
//!
//! "For property testing: apply(materialize(A), diff(A, B)) == materialize(B)."
//!
//! [`RNode`] is a minimal mutable stand-in for a real render target. Nodes
//! are addressed through shared handles so that a handle captured before a
//! reorder still points at the same node afterwards, the way a real DOM
//! reference would. The index map over the old tree is built once, up
//! front; records then apply in ascending index order, and in emission
//! order within one index.

use core::cell::RefCell;
use std::rc::Rc;

use compact_str::CompactString;
use rapidhash::RapidHashMap;
use thiserror::Error;

use crate::props::{PropEdit, Props, PropsPatch, PropValue};
use crate::vnode::{Key, VNode};

use super::patch::{Moves, PatchScript, VPatch};

/// A shared, mutable handle to a materialized node.
pub type RHandle = Rc<RefCell<RNode>>;

/// A materialized node: the mutable structure patches apply to.
#[derive(Debug, Clone, PartialEq)]
pub enum RNode {
    /// A materialized element.
    Element {
        /// Tag name.
        tag: CompactString,
        /// Optional namespace.
        namespace: Option<CompactString>,
        /// Optional key, carried through for inspection in tests.
        key: Option<Key>,
        /// Property map.
        props: Props,
        /// Ordered children.
        children: Vec<RHandle>,
    },
    /// A materialized text node.
    Text(CompactString),
    /// A materialized widget, reduced to its identity.
    Widget {
        /// The widget's identity.
        id: u64,
    },
}

/// Build the materialized form of a virtual tree. Thunks materialize as
/// their resolved subtree.
pub fn materialize(node: &Rc<VNode>) -> RHandle {
    Rc::new(RefCell::new(materialize_value(node)))
}

fn materialize_value(node: &Rc<VNode>) -> RNode {
    match &**node {
        VNode::Element(e) => RNode::Element {
            tag: e.tag.clone(),
            namespace: e.namespace.clone(),
            key: e.key.clone(),
            props: e.props.clone(),
            children: e.children.iter().map(materialize).collect(),
        },
        VNode::Text(t) => RNode::Text(t.text.clone()),
        VNode::Widget(w) => RNode::Widget { id: w.id },
        VNode::Thunk(t) => materialize_value(&t.resolve(None)),
    }
}

/// Ways applying a patch script can fail against a structure that does not
/// match the script's old tree.
#[derive(Debug, Error)]
pub enum ApplyError {
    /// A patched index has no node in the materialized structure.
    #[error("no materialized node at traversal index {index}")]
    IndexNotFound {
        /// The unresolvable traversal index.
        index: usize,
    },
    /// A record requiring an element found something else.
    #[error("node at traversal index {index} is not an element")]
    NotAnElement {
        /// The offending traversal index.
        index: usize,
    },
    /// A move script insertion references a key no removal stashed.
    #[error("move script inserts key {key:?} that was never removed")]
    MissingMoveTarget {
        /// The unmatched key.
        key: Key,
    },
    /// A move script removal points past the end of the child list.
    #[error("move script removal at {from} is out of bounds")]
    MoveOutOfBounds {
        /// The out-of-range position.
        from: usize,
    },
}

/// Index map over the old tree: traversal index → materialized handle, plus
/// each indexed node's parent for detachment.
#[derive(Default)]
struct DomIndex {
    nodes: RapidHashMap<usize, RHandle>,
    parents: RapidHashMap<usize, RHandle>,
}

fn build_index(
    vnode: &Rc<VNode>,
    handle: &RHandle,
    parent: Option<&RHandle>,
    index: usize,
    map: &mut DomIndex,
) {
    map.nodes.insert(index, handle.clone());
    if let Some(parent) = parent {
        map.parents.insert(index, parent.clone());
    }
    if let VNode::Element(e) = &**vnode {
        let real_children: Vec<RHandle> = match &*handle.borrow() {
            RNode::Element { children, .. } => children.clone(),
            _ => return,
        };
        let mut child_index = index;
        for (child, real) in e.children.iter().zip(&real_children) {
            child_index += 1;
            build_index(child, real, Some(handle), child_index, map);
            child_index += child.descendant_count();
        }
    }
}

/// Apply a patch script to the materialized form of its old tree.
pub fn apply_patches(script: &PatchScript, root: &RHandle) -> Result<(), ApplyError> {
    apply_with_parent(script, root, None)
}

fn apply_with_parent(
    script: &PatchScript,
    root: &RHandle,
    root_parent: Option<&RHandle>,
) -> Result<(), ApplyError> {
    if script.is_empty() {
        return Ok(());
    }

    let mut index = DomIndex::default();
    build_index(script.root(), root, root_parent, 0, &mut index);

    for idx in script.indices() {
        let Some(records) = script.get(idx) else {
            continue;
        };
        let handle = index
            .nodes
            .get(&idx)
            .ok_or(ApplyError::IndexNotFound { index: idx })?
            .clone();

        // A structural replacement detaches the old node; cleanup records
        // that follow it in the same entry belong to the detached node and
        // must not touch the replacement.
        let mut replaced = false;
        for record in records {
            match record {
                VPatch::SetText { new, .. } | VPatch::Replace { new, .. } => {
                    *handle.borrow_mut() = materialize_value(new);
                    replaced = true;
                }
                VPatch::ReplaceWidget { old, new } => {
                    fire_destroy(old);
                    *handle.borrow_mut() = materialize_value(new);
                    replaced = true;
                }
                VPatch::UpdateProps { patch, .. } => {
                    if !replaced {
                        let RNode::Element { props, .. } = &mut *handle.borrow_mut() else {
                            return Err(ApplyError::NotAnElement { index: idx });
                        };
                        apply_props(props, patch);
                    }
                }
                VPatch::Reorder { moves, .. } => {
                    let RNode::Element { children, .. } = &mut *handle.borrow_mut() else {
                        return Err(ApplyError::NotAnElement { index: idx });
                    };
                    apply_moves(children, moves)?;
                }
                VPatch::Insert { new } => {
                    let RNode::Element { children, .. } = &mut *handle.borrow_mut() else {
                        return Err(ApplyError::NotAnElement { index: idx });
                    };
                    children.push(materialize(new));
                }
                VPatch::Remove { old } => {
                    // A removal following a replacement in the same entry is
                    // the old node's widget teardown; the slot now holds the
                    // replacement and must stay attached.
                    if !replaced {
                        if let Some(parent) = index.parents.get(&idx) {
                            if let RNode::Element { children, .. } = &mut *parent.borrow_mut() {
                                children.retain(|child| !Rc::ptr_eq(child, &handle));
                            }
                        }
                    }
                    fire_destroy(old);
                }
                VPatch::Thunk { script: sub } => {
                    apply_with_parent(sub, &handle, index.parents.get(&idx))?;
                }
            }
        }
    }

    Ok(())
}

fn fire_destroy(node: &Rc<VNode>) {
    if let VNode::Widget(w) = &**node {
        if let Some(destroy) = &w.destroy {
            destroy();
        }
    }
}

fn apply_props(props: &mut Props, patch: &PropsPatch) {
    for (key, edit) in patch {
        match edit {
            PropEdit::Remove => {
                props.shift_remove(key);
            }
            PropEdit::Set(value) => {
                props.insert(key.clone(), value.clone());
            }
            PropEdit::Update(nested) => {
                let slot = props
                    .entry(key.clone())
                    .or_insert_with(|| PropValue::Map(Props::new()));
                if !matches!(slot, PropValue::Map(_)) {
                    *slot = PropValue::Map(Props::new());
                }
                if let PropValue::Map(map) = slot {
                    apply_props(map, nested);
                }
            }
        }
    }
}

/// Replay a move script against a real child list: removals in order,
/// stashing keyed children, then insertions from the stash.
fn apply_moves(children: &mut Vec<RHandle>, moves: &Moves) -> Result<(), ApplyError> {
    let mut stash: RapidHashMap<Key, RHandle> = RapidHashMap::default();
    for removal in &moves.removes {
        if removal.from >= children.len() {
            return Err(ApplyError::MoveOutOfBounds { from: removal.from });
        }
        let node = children.remove(removal.from);
        if let Some(key) = &removal.key {
            stash.insert(key.clone(), node);
        }
    }
    for insertion in &moves.inserts {
        let node = stash
            .remove(&insertion.key)
            .ok_or_else(|| ApplyError::MissingMoveTarget {
                key: insertion.key.clone(),
            })?;
        let to = insertion.to.min(children.len());
        children.insert(to, node);
    }
    Ok(())
}
