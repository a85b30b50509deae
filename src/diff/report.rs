//! Change-log reporting.
//!
//! The walker, when asked, emits one bracket-marked trace line per record.
//! [`ChangeReport::from_trace`] distills that trace into net content change:
//! a fragment inserted on one line and deleted on an adjacent one is a pure
//! reorder, not content change, and cancels out. Diagnostic only; nothing
//! here feeds back into patch generation.

use core::fmt::Write;
use std::rc::Rc;

use crate::props::{PropEdit, PropValue, PropsPatch};
use crate::vnode::VNode;

/// Net content change distilled from a diff's trace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeReport {
    /// Net inserted fragments followed by net deleted fragments, one
    /// bracket-marked line each.
    pub diff_text: String,
    /// Number of net inserted fragments.
    pub insertions: usize,
    /// Number of net deleted fragments.
    pub deletions: usize,
}

impl ChangeReport {
    pub(crate) fn from_trace(lines: &[String]) -> ChangeReport {
        let mut inserted: Vec<(usize, String)> = Vec::new();
        let mut deleted: Vec<(usize, String)> = Vec::new();
        for (line_no, line) in lines.iter().enumerate() {
            for frag in marked(line, "[INS]", "[/INS]") {
                if !frag.is_empty() {
                    inserted.push((line_no, frag));
                }
            }
            for frag in marked(line, "[DEL]", "[/DEL]") {
                if !frag.is_empty() {
                    deleted.push((line_no, frag));
                }
            }
        }

        // Pair each insertion with at most one matching deletion on the same
        // or an adjacent trace line; paired fragments are reorder noise.
        let mut ins_kept = vec![true; inserted.len()];
        let mut del_kept = vec![true; deleted.len()];
        for (i, (ins_line, ins_frag)) in inserted.iter().enumerate() {
            let matched = deleted.iter().enumerate().position(|(j, (del_line, del_frag))| {
                del_kept[j] && del_frag == ins_frag && ins_line.abs_diff(*del_line) <= 1
            });
            if let Some(j) = matched {
                ins_kept[i] = false;
                del_kept[j] = false;
            }
        }

        let mut diff_text = String::new();
        let mut insertions = 0;
        let mut deletions = 0;
        for (i, (_, frag)) in inserted.iter().enumerate() {
            if ins_kept[i] {
                if !diff_text.is_empty() {
                    diff_text.push('\n');
                }
                write!(diff_text, "[INS]{}[/INS]", frag).unwrap();
                insertions += 1;
            }
        }
        for (j, (_, frag)) in deleted.iter().enumerate() {
            if del_kept[j] {
                if !diff_text.is_empty() {
                    diff_text.push('\n');
                }
                write!(diff_text, "[DEL]{}[/DEL]", frag).unwrap();
                deletions += 1;
            }
        }

        ChangeReport {
            diff_text,
            insertions,
            deletions,
        }
    }

    /// True when the trace contained no net content change.
    pub fn is_clean(&self) -> bool {
        self.insertions == 0 && self.deletions == 0
    }
}

/// Every fragment between `open` and `close` markers on one line.
fn marked(line: &str, open: &str, close: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut rest = line;
    while let Some(start) = rest.find(open) {
        let after = &rest[start + open.len()..];
        let Some(end) = after.find(close) else {
            break;
        };
        out.push(after[..end].to_string());
        rest = &after[end + close.len()..];
    }
    out
}

/// A compact markup rendition of a subtree for trace lines. Scalar props
/// render inline; nested maps, hooks, widgets, and thunks have no sensible
/// textual form and are left out.
pub(crate) fn fragment(node: &Rc<VNode>) -> String {
    let mut out = String::new();
    write_fragment(&mut out, node);
    out
}

fn write_fragment(out: &mut String, node: &Rc<VNode>) {
    match &**node {
        VNode::Text(t) => out.push_str(&t.text),
        VNode::Element(e) => {
            write!(out, "<{}", e.tag).unwrap();
            for (key, value) in &e.props {
                match value {
                    PropValue::Str(s) => write!(out, " {}=\"{}\"", key, s).unwrap(),
                    PropValue::Bool(b) => write!(out, " {}={}", key, b).unwrap(),
                    PropValue::Num(n) => write!(out, " {}={}", key, n).unwrap(),
                    PropValue::Map(_) | PropValue::Hook(_) => {}
                }
            }
            out.push('>');
            for child in &e.children {
                write_fragment(out, child);
            }
            write!(out, "</{}>", e.tag).unwrap();
        }
        VNode::Widget(_) | VNode::Thunk(_) => {}
    }
}

/// One-line summary of a props patch for trace output.
pub(crate) fn summarize_props_patch(patch: &PropsPatch) -> String {
    let mut parts = Vec::with_capacity(patch.len());
    for (key, edit) in patch {
        match edit {
            PropEdit::Remove => parts.push(format!("-{}", key)),
            PropEdit::Set(value) => parts.push(format!("{}={}", key, value)),
            PropEdit::Update(_) => parts.push(format!("{}={{..}}", key)),
        }
    }
    parts.join(" ")
}
