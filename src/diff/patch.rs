//! Patch records and the patch script they accumulate into.

use core::fmt;
use std::rc::Rc;

use indexmap::IndexMap;
use smallvec::SmallVec;

use crate::props::PropsPatch;
use crate::vnode::{Key, VNode};

/// The records accumulated at one traversal index. Inlined for the common
/// single-record case.
pub type PatchList = SmallVec<[VPatch; 1]>;

/// A single edit at one traversal index.
///
/// Records carry the nodes they refer to, so an applier never has to look
/// anything up in the input trees.
#[derive(Debug, PartialEq)]
pub enum VPatch {
    /// Replace the node's content with a text node.
    SetText {
        /// The node being replaced.
        old: Rc<VNode>,
        /// The replacement text node.
        new: Rc<VNode>,
    },
    /// Replace the node with a structurally different element.
    Replace {
        /// The node being replaced.
        old: Rc<VNode>,
        /// The replacement node.
        new: Rc<VNode>,
    },
    /// Replace the node with a widget.
    ReplaceWidget {
        /// The node being replaced.
        old: Rc<VNode>,
        /// The replacement widget node.
        new: Rc<VNode>,
    },
    /// Apply a property patch to the element at this index.
    UpdateProps {
        /// The element whose props change.
        node: Rc<VNode>,
        /// The property patch, forwarded verbatim from the props differ.
        patch: PropsPatch,
    },
    /// Reorder the element's children by replaying a move script.
    Reorder {
        /// The parent element whose children move.
        node: Rc<VNode>,
        /// The residual moves positional alignment could not express.
        moves: Moves,
    },
    /// Append a new child under the element at this index.
    Insert {
        /// The node to insert.
        new: Rc<VNode>,
    },
    /// Remove the node at this index. When the node is a widget with a
    /// teardown callback, the applier must fire it.
    Remove {
        /// The node being removed.
        old: Rc<VNode>,
    },
    /// Apply a nested patch script to the thunk-resolved subtree rooted at
    /// this index. Nested indices start over at the resolved root.
    Thunk {
        /// The sub-diff of the resolved thunk pair.
        script: PatchScript,
    },
}

impl fmt::Display for VPatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VPatch::SetText { new, .. } => match &**new {
                VNode::Text(t) => write!(f, "SetText(\"{}\")", t.text),
                _ => write!(f, "SetText(?)"),
            },
            VPatch::Replace { old, new } => write!(f, "Replace({} -> {})", old, new),
            VPatch::ReplaceWidget { old, new } => write!(f, "ReplaceWidget({} -> {})", old, new),
            VPatch::UpdateProps { node, patch } => {
                write!(f, "UpdateProps({}, {} edits)", node, patch.len())
            }
            VPatch::Reorder { node, moves } => write!(f, "Reorder({}, {})", node, moves),
            VPatch::Insert { new } => write!(f, "Insert({})", new),
            VPatch::Remove { old } => write!(f, "Remove({})", old),
            VPatch::Thunk { script } => write!(f, "Thunk({} entries)", script.len()),
        }
    }
}

/// One removal step in a move script: take the child at `from` out of the
/// list, remembering it under `key` if it is keyed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MoveRemove {
    /// Position to remove, in the list as it stands at that point of the
    /// replay (earlier removals have already shifted it).
    pub from: usize,
    /// The removed child's key; `None` for discarded placeholder slots.
    pub key: Option<Key>,
}

/// One insertion step in a move script: put the stashed child carrying `key`
/// back at position `to`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MoveInsert {
    /// The key of the child to re-insert.
    pub key: Key,
    /// Target position in the list as it stands at that point of the replay.
    pub to: usize,
}

/// The residual insert/remove steps needed to reorder a keyed child list
/// beyond what positional alignment already expresses. Replay removals in
/// order, then insertions in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Moves {
    /// Removals, applied first.
    pub removes: Vec<MoveRemove>,
    /// Insertions, applied after all removals.
    pub inserts: Vec<MoveInsert>,
}

impl fmt::Display for Moves {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "removes=[")?;
        for (i, r) in self.removes.iter().enumerate() {
            if i > 0 {
                write!(f, " ")?;
            }
            match &r.key {
                Some(key) => write!(f, "{}@{}", key, r.from)?,
                None => write!(f, "_@{}", r.from)?,
            }
        }
        write!(f, "] inserts=[")?;
        for (i, ins) in self.inserts.iter().enumerate() {
            if i > 0 {
                write!(f, " ")?;
            }
            write!(f, "{}->{}", ins.key, ins.to)?;
        }
        write!(f, "]")
    }
}

/// The complete output of a diff: traversal index → patch records, plus the
/// old root the indices were assigned against.
///
/// Within one index, records execute in the order they were appended during
/// the walk; no reordering is ever applied after the fact.
#[derive(Debug, PartialEq)]
pub struct PatchScript {
    root: Rc<VNode>,
    entries: IndexMap<usize, PatchList>,
}

impl PatchScript {
    pub(crate) fn new(root: Rc<VNode>) -> PatchScript {
        PatchScript {
            root,
            entries: IndexMap::new(),
        }
    }

    /// The old tree's root, which an applier needs to locate its real
    /// target structure.
    pub fn root(&self) -> &Rc<VNode> {
        &self.root
    }

    /// True when the diff found no differences.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of traversal indices with at least one record.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// The records at a traversal index.
    pub fn get(&self, index: usize) -> Option<&[VPatch]> {
        self.entries.get(&index).map(|list| list.as_slice())
    }

    /// All patched indices, ascending — the order an applier should visit
    /// them in.
    pub fn indices(&self) -> Vec<usize> {
        let mut indices: Vec<usize> = self.entries.keys().copied().collect();
        indices.sort_unstable();
        indices
    }

    /// Iterate entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (usize, &[VPatch])> {
        self.entries
            .iter()
            .map(|(index, list)| (*index, list.as_slice()))
    }

    /// The Patch Assembler: append one record to the entry at `index`,
    /// creating the entry if this is the first record there.
    pub(crate) fn append(&mut self, index: usize, record: VPatch) {
        self.entries.entry(index).or_default().push(record);
    }
}
