//! The lock-step tree walker.
//!
//! Indices are assigned by pre-order position over the *old* tree, and the
//! walker advances them without visiting skipped subtrees by adding each
//! sibling's cached descendant count. The cleanup traversals (`unhook`,
//! `destroy_widgets`) reuse the exact same indexing scheme so their records
//! land on the same indices a full walk would assign.

use std::rc::Rc;

use crate::debug;
use crate::props::{diff_props, unhook_patch};
use crate::vnode::{VElement, VNode, same_node};

use super::patch::{PatchScript, VPatch};
use super::reorder::reorder;
use super::report::{ChangeReport, fragment, summarize_props_patch};

/// Diff two tree snapshots into a patch script.
///
/// Indices in the script refer to pre-order positions in `old`; `new` is the
/// target shape. Thunks on either side are resolved (and cached) along the
/// way, and their sub-diffs nest as [`VPatch::Thunk`] records.
pub fn diff(old: &Rc<VNode>, new: &Rc<VNode>) -> PatchScript {
    Walker { trace: None }.run(old, Some(new))
}

/// Diff two tree snapshots, also producing a human-readable change report.
///
/// The report is derived from the same walk that builds the script, so the
/// two always describe the same set of edits.
pub fn diff_with_report(old: &Rc<VNode>, new: &Rc<VNode>) -> (PatchScript, ChangeReport) {
    let mut walker = Walker {
        trace: Some(Vec::new()),
    };
    let script = walker.run(old, Some(new));
    let report = ChangeReport::from_trace(walker.trace.as_deref().unwrap_or(&[]));
    (script, report)
}

struct Walker {
    trace: Option<Vec<String>>,
}

impl Walker {
    fn run(&mut self, old: &Rc<VNode>, new: Option<&Rc<VNode>>) -> PatchScript {
        let mut script = PatchScript::new(old.clone());
        self.walk(old, new, &mut script, 0);
        debug!("diff produced {} patch entries", script.len());
        script
    }

    fn walk(&mut self, a: &Rc<VNode>, b: Option<&Rc<VNode>>, script: &mut PatchScript, index: usize) {
        if let Some(b) = b {
            if same_node(a, b) {
                return;
            }
        }

        if a.is_thunk() || b.is_some_and(|b| b.is_thunk()) {
            self.diff_thunks(a, b, script, index);
            return;
        }

        let Some(b) = b else {
            // This position is vacated. Widgets tear themselves down through
            // their own removal record; everything else gets a cleanup pass
            // before the removal lands.
            if !a.is_widget() {
                self.clear_state(a, script, index);
            }
            self.log(|| format!("[REMOVE][DEL]{}[/DEL][/REMOVE]", fragment(a)));
            script.append(index, VPatch::Remove { old: a.clone() });
            return;
        };

        match &**b {
            VNode::Element(be) => match &**a {
                VNode::Element(ae)
                    if ae.tag == be.tag && ae.namespace == be.namespace && ae.key == be.key =>
                {
                    if let Some(patch) = diff_props(&ae.props, &be.props) {
                        self.log(|| format!("[PROPS]{}[/PROPS]", summarize_props_patch(&patch)));
                        script.append(
                            index,
                            VPatch::UpdateProps {
                                node: a.clone(),
                                patch,
                            },
                        );
                    }
                    self.diff_children(a, ae, be, script, index);
                }
                _ => {
                    self.log(|| {
                        format!(
                            "[NODE][DEL]{}[/DEL][/NODE] [NODE][INS]{}[/INS][/NODE]",
                            fragment(a),
                            fragment(b)
                        )
                    });
                    script.append(
                        index,
                        VPatch::Replace {
                            old: a.clone(),
                            new: b.clone(),
                        },
                    );
                    self.clear_state(a, script, index);
                }
            },
            VNode::Text(bt) => match &**a {
                VNode::Text(at) => {
                    if at.text != bt.text {
                        self.log(|| {
                            format!(
                                "[TEXT][DEL]{}[/DEL][INS]{}[/INS][/TEXT]",
                                at.text, bt.text
                            )
                        });
                        script.append(
                            index,
                            VPatch::SetText {
                                old: a.clone(),
                                new: b.clone(),
                            },
                        );
                    }
                }
                _ => {
                    self.log(|| {
                        format!(
                            "[TEXT][DEL]{}[/DEL][INS]{}[/INS][/TEXT]",
                            fragment(a),
                            bt.text
                        )
                    });
                    script.append(
                        index,
                        VPatch::SetText {
                            old: a.clone(),
                            new: b.clone(),
                        },
                    );
                    self.clear_state(a, script, index);
                }
            },
            VNode::Widget(_) => {
                self.log(|| format!("[WIDGET]{} -> {}[/WIDGET]", a, b));
                script.append(
                    index,
                    VPatch::ReplaceWidget {
                        old: a.clone(),
                        new: b.clone(),
                    },
                );
                if !a.is_widget() {
                    self.clear_state(a, script, index);
                }
            }
            VNode::Thunk(_) => unreachable!("thunks are resolved before dispatch"),
        }
    }

    fn diff_children(
        &mut self,
        a: &Rc<VNode>,
        ae: &VElement,
        be: &VElement,
        script: &mut PatchScript,
        index: usize,
    ) {
        let reordered = reorder(&ae.children, &be.children);
        let a_children = &ae.children;
        let b_children = &reordered.children;

        let len = a_children.len().max(b_children.len());
        let mut child_index = index;
        for i in 0..len {
            let left = a_children.get(i);
            let right = b_children.get(i).and_then(|slot| slot.as_ref());
            child_index += 1;
            match left {
                None => {
                    if let Some(right) = right {
                        // A child past the old list's end; it attaches at the
                        // parent since it has no index of its own.
                        self.log(|| format!("[INSERT][INS]{}[/INS][/INSERT]", fragment(right)));
                        script.append(index, VPatch::Insert { new: right.clone() });
                    }
                }
                Some(left) => {
                    self.walk(left, right, script, child_index);
                    child_index += left.descendant_count();
                }
            }
        }

        if let Some(moves) = reordered.moves {
            self.log(|| format!("[ORDER]{}[/ORDER]", moves));
            script.append(
                index,
                VPatch::Reorder {
                    node: a.clone(),
                    moves,
                },
            );
        }
    }

    fn diff_thunks(
        &mut self,
        a: &Rc<VNode>,
        b: Option<&Rc<VNode>>,
        script: &mut PatchScript,
        index: usize,
    ) {
        let (resolved_a, resolved_b) = resolve_thunks(a, b);
        let sub = Walker { trace: None }.run(&resolved_a, resolved_b.as_ref());
        if !sub.is_empty() {
            self.log(|| format!("[THUNK]{} nested entries[/THUNK]", sub.len()));
            script.append(index, VPatch::Thunk { script: sub });
        }
    }

    /// Unbind hooks and destroy widgets throughout a subtree that is leaving
    /// the tree, addressing each record at the index the node holds in the
    /// old tree.
    fn clear_state(&mut self, a: &Rc<VNode>, script: &mut PatchScript, index: usize) {
        self.unhook(a, script, index);
        self.destroy_widgets(a, script, index);
    }

    fn unhook(&mut self, node: &Rc<VNode>, script: &mut PatchScript, index: usize) {
        if let VNode::Element(e) = &**node {
            let flags = e.flags();
            if flags.has_hooks {
                self.log(|| format!("[UNHOOK]{}", node));
                script.append(
                    index,
                    VPatch::UpdateProps {
                        node: node.clone(),
                        patch: unhook_patch(&e.props),
                    },
                );
            }
            if flags.has_descendant_hooks || flags.has_thunks {
                let mut child_index = index;
                for child in &e.children {
                    child_index += 1;
                    self.unhook(child, script, child_index);
                    child_index += child.descendant_count();
                }
            }
        }
    }

    fn destroy_widgets(&mut self, node: &Rc<VNode>, script: &mut PatchScript, index: usize) {
        match &**node {
            VNode::Widget(w) => {
                if w.destroy.is_some() {
                    self.log(|| format!("[DESTROY]{}", node));
                    script.append(index, VPatch::Remove { old: node.clone() });
                }
            }
            VNode::Element(e) if e.flags().has_widgets || e.flags().has_thunks => {
                let mut child_index = index;
                for child in &e.children {
                    child_index += 1;
                    self.destroy_widgets(child, script, child_index);
                    child_index += child.descendant_count();
                }
            }
            VNode::Thunk(_) => {
                // A thunk leaving the tree still needs its resolved subtree
                // torn down; the removal sub-diff carries those records.
                self.diff_thunks(node, None, script, index);
            }
            _ => {}
        }
    }

    fn log<F: FnOnce() -> String>(&mut self, line: F) {
        if let Some(trace) = &mut self.trace {
            trace.push(line());
        }
    }
}

/// Resolve whichever sides of a node pair are thunks. The new side resolves
/// against the node it replaces; the old side resolves fresh (and in practice
/// hits its cache from the pass that introduced it).
fn resolve_thunks(a: &Rc<VNode>, b: Option<&Rc<VNode>>) -> (Rc<VNode>, Option<Rc<VNode>>) {
    let resolved_b = match b {
        Some(b) => match &**b {
            VNode::Thunk(t) => Some(t.resolve(Some(a))),
            _ => Some(b.clone()),
        },
        None => None,
    };
    let resolved_a = match &**a {
        VNode::Thunk(t) => t.resolve(None),
        _ => a.clone(),
    };
    (resolved_a, resolved_b)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vnode::VElement;

    fn list(items: &[&str]) -> Rc<VNode> {
        VElement::builder("ul")
            .children(
                items
                    .iter()
                    .map(|t| VElement::builder("li").child(VNode::text(*t)).build()),
            )
            .build()
    }

    #[test]
    fn test_identical_trees_diff_empty() {
        let a = list(&["one", "two"]);
        let b = list(&["one", "two"]);
        let script = diff(&a, &b);
        assert!(script.is_empty(), "no-op diff must be empty: {:?}", script);
    }

    #[test]
    fn test_text_change_lands_on_text_index() {
        // ul=0, li=1, text=2, li=3, text=4
        let a = list(&["one", "two"]);
        let b = list(&["one", "2"]);
        let script = diff(&a, &b);
        assert_eq!(script.indices(), vec![4]);
        let records = script.get(4).unwrap();
        assert!(matches!(records, [VPatch::SetText { .. }]));
    }

    #[test]
    fn test_sibling_subtrees_are_skipped_not_visited() {
        // Changing the second subtree must not disturb indices assigned
        // under the first, however deep the first one is.
        let deep = VElement::builder("div")
            .child(
                VElement::builder("p")
                    .child(VNode::text("x"))
                    .child(VNode::text("y"))
                    .build(),
            )
            .build();
        let a = VElement::builder("main")
            .child(deep.clone())
            .child(VNode::text("old"))
            .build();
        let b = VElement::builder("main")
            .child(deep)
            .child(VNode::text("new"))
            .build();
        // main=0, div=1, p=2, x=3, y=4, tail text=5
        let script = diff(&a, &b);
        assert_eq!(script.indices(), vec![5]);
    }

    #[test]
    fn test_tag_change_replaces_and_keeps_subtree_indices() {
        let a = VElement::builder("span").child(VNode::text("hi")).build();
        let b = VElement::builder("div").child(VNode::text("hi")).build();
        let script = diff(&a, &b);
        assert_eq!(script.indices(), vec![0]);
        assert!(matches!(script.get(0).unwrap(), [VPatch::Replace { .. }]));
    }
}
