//! Tree diffing with indexed patch generation.
//!
//! [`diff`] walks two immutable snapshots in lock-step and produces a
//! [`PatchScript`]: a map from pre-order traversal index (over the *old*
//! tree) to the patch records that transform that position. Child lists are
//! reconciled under key identity by [`reorder`], so a reordered list yields
//! one move script instead of a cascade of replacements.

mod patch;
mod report;
mod walker;

pub mod apply;
pub mod reorder;

pub use apply::{ApplyError, RHandle, RNode, apply_patches, materialize};
pub use patch::{MoveInsert, MoveRemove, Moves, PatchList, PatchScript, VPatch};
pub use report::ChangeReport;
pub use walker::{diff, diff_with_report};
