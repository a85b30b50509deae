//! # Cambium
//!
//! Virtual tree diffing: compare two immutable tree snapshots in a single
//! linear traversal and produce the minimal set of patches needed to turn one
//! into the other.
//!
//! Named after the *vascular cambium*, the layer of a tree where growth
//! actually happens.
//!
//! Cambium provides:
//! - **Node model**: a closed sum type over elements, text, opaque widgets,
//!   and lazily-resolved thunks, with descendant counts and lifecycle flags
//!   computed at construction ([`vnode`])
//! - **Diffing**: a lock-step tree walk that addresses every node by its
//!   pre-order traversal index, so patches can be replayed against a parallel
//!   structure without re-walking it ([`diff`])
//! - **Keyed reconciliation**: minimal move scripts for child lists whose
//!   items were reordered, added, or removed under key identity
//!   ([`diff::reorder`])
//! - **Change reporting**: a derived insert/delete summary with reorder noise
//!   cancelled out ([`diff::ChangeReport`])
//!
//! # Example
//!
//! ```rust
//! use cambium::vnode::{VElement, VNode};
//! use cambium::diff::{diff, VPatch};
//!
//! let old = VElement::builder("ul")
//!     .child(VElement::builder("li").key("a").child(VNode::text("one")).build())
//!     .build();
//! let new = VElement::builder("ul")
//!     .child(VElement::builder("li").key("a").child(VNode::text("uno")).build())
//!     .build();
//!
//! let script = diff(&old, &new);
//! // One entry: the text node sits at traversal index 2 (ul=0, li=1).
//! assert_eq!(script.indices(), vec![2]);
//! assert!(matches!(script.get(2), Some([VPatch::SetText { .. }])));
//! ```

#![warn(missing_docs)]
#![warn(clippy::std_instead_of_core)]

mod tracing_macros;

pub(crate) use tracing_macros::debug;

pub mod diff;
pub mod props;
pub mod vnode;

pub use diff::{
    ApplyError, ChangeReport, MoveInsert, MoveRemove, Moves, PatchList, PatchScript, VPatch, diff,
    diff_with_report,
};
pub use props::{Hook, PropEdit, PropValue, Props, PropsPatch, diff_props};
pub use vnode::{ElementBuilder, Key, NodeFlags, ThunkRender, VElement, VNode, VText, VThunk, VWidget};
