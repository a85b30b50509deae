use std::cell::Cell;
use std::rc::Rc;

use cambium::diff::{MoveInsert, MoveRemove, VPatch, diff, diff_with_report};
use cambium::props::{Hook, PropEdit, PropValue};
use cambium::vnode::{ThunkRender, VElement, VNode};

#[derive(Debug)]
struct NoopHook;
impl Hook for NoopHook {}

fn hook() -> PropValue {
    let hook: Rc<dyn Hook> = Rc::new(NoopHook);
    PropValue::Hook(hook)
}

fn li(key: &str, text: &str) -> Rc<VNode> {
    VElement::builder("li").key(key).child(VNode::text(text)).build()
}

fn ul(items: Vec<Rc<VNode>>) -> Rc<VNode> {
    VElement::builder("ul").children(items).build()
}

#[test]
fn test_diff_against_self_is_empty() {
    let tree = ul(vec![li("a", "one"), li("b", "two")]);
    let script = diff(&tree, &tree);
    assert!(script.is_empty());
    assert_eq!(script.len(), 0);
}

#[test]
fn test_single_text_change() {
    // div=0, "a"=1, "b"=2
    let a = VElement::builder("div")
        .child(VNode::text("a"))
        .child(VNode::text("b"))
        .build();
    let b = VElement::builder("div")
        .child(VNode::text("a"))
        .child(VNode::text("c"))
        .build();

    let script = diff(&a, &b);
    assert_eq!(script.indices(), vec![2]);
    let records = script.get(2).unwrap();
    assert_eq!(records.len(), 1);
    let VPatch::SetText { old, new } = &records[0] else {
        panic!("expected SetText, got {:?}", records[0]);
    };
    assert!(matches!(&**old, VNode::Text(t) if t.text == "b"));
    assert!(matches!(&**new, VNode::Text(t) if t.text == "c"));
}

#[test]
fn test_tag_mismatch_overrides_key_match() {
    let a = VElement::builder("span").key("x").prop("onload", hook()).build();
    let b = VElement::builder("div").key("x").build();

    let script = diff(&a, &b);
    assert_eq!(script.indices(), vec![0]);
    let records = script.get(0).unwrap();
    // The replacement lands first, then the unbind of the replaced side's
    // hooks.
    assert_eq!(records.len(), 2);
    assert!(matches!(&records[0], VPatch::Replace { .. }));
    let VPatch::UpdateProps { patch, .. } = &records[1] else {
        panic!("expected hook unbind, got {:?}", records[1]);
    };
    assert_eq!(patch.get("onload"), Some(&PropEdit::Remove));
}

#[test]
fn test_widget_to_widget_is_a_bare_replacement() {
    let a = VNode::widget(1);
    let b = VNode::widget(2);
    let script = diff(&a, &b);
    assert_eq!(script.indices(), vec![0]);
    let records = script.get(0).unwrap();
    assert_eq!(records.len(), 1, "widgets own their teardown, no cleanup pass");
    assert!(matches!(&records[0], VPatch::ReplaceWidget { .. }));
}

#[test]
fn test_removed_keyed_child_unbinds_hooks_before_removal() {
    let hooked = VElement::builder("li")
        .key("a")
        .prop("onload", hook())
        .child(VNode::text("one"))
        .build();
    let a = ul(vec![hooked, li("b", "two")]);
    let b = ul(vec![li("b", "two")]);

    // ul=0, li(a)=1, "one"=2, li(b)=3
    let script = diff(&a, &b);
    assert_eq!(script.indices(), vec![1]);
    let records = script.get(1).unwrap();
    assert_eq!(records.len(), 2);
    let VPatch::UpdateProps { patch, .. } = &records[0] else {
        panic!("expected hook unbind first, got {:?}", records[0]);
    };
    assert_eq!(patch.get("onload"), Some(&PropEdit::Remove));
    assert!(matches!(&records[1], VPatch::Remove { .. }));
}

#[test]
fn test_rotation_yields_one_reorder_record() {
    let a = ul(vec![li("a", "one"), li("b", "two"), li("c", "three")]);
    let b = ul(vec![li("c", "three"), li("a", "one"), li("b", "two")]);

    let script = diff(&a, &b);
    assert_eq!(script.indices(), vec![0], "content is unchanged, only order moves");
    let records = script.get(0).unwrap();
    assert_eq!(records.len(), 1);
    let VPatch::Reorder { moves, .. } = &records[0] else {
        panic!("expected Reorder, got {:?}", records[0]);
    };
    assert_eq!(
        moves.removes,
        vec![MoveRemove {
            from: 2,
            key: Some("c".into())
        }]
    );
    assert_eq!(moves.inserts, vec![MoveInsert { key: "c".into(), to: 0 }]);
}

#[test]
fn test_insertion_in_the_middle_of_a_keyed_list() {
    let a = ul(vec![li("a", "one"), li("c", "three")]);
    let b = ul(vec![li("a", "one"), li("b", "two"), li("c", "three")]);

    let script = diff(&a, &b);
    assert_eq!(script.indices(), vec![0]);
    let records = script.get(0).unwrap();
    assert_eq!(records.len(), 2);
    let VPatch::Insert { new } = &records[0] else {
        panic!("expected Insert first, got {:?}", records[0]);
    };
    assert_eq!(new.key().map(|k| k.as_str()), Some("b"));
    let VPatch::Reorder { moves, .. } = &records[1] else {
        panic!("expected Reorder second, got {:?}", records[1]);
    };
    // The appended child gets pulled from the end into place.
    assert_eq!(
        moves.removes,
        vec![MoveRemove {
            from: 2,
            key: Some("b".into())
        }]
    );
    assert_eq!(moves.inserts, vec![MoveInsert { key: "b".into(), to: 1 }]);
}

#[test]
fn test_unkeyed_append_attaches_at_the_parent() {
    let a = VElement::builder("div").child(VNode::text("a")).build();
    let b = VElement::builder("div")
        .child(VNode::text("a"))
        .child(VNode::text("b"))
        .build();

    let script = diff(&a, &b);
    assert_eq!(script.indices(), vec![0]);
    assert!(matches!(script.get(0).unwrap(), [VPatch::Insert { .. }]));
}

#[test]
fn test_widget_removal_emits_no_cleanup_records() {
    let destroy: Rc<dyn Fn()> = Rc::new(|| {});
    let a = VElement::builder("div")
        .child(VNode::widget_with_destroy(7, destroy))
        .build();
    let b = VElement::builder("div").build();

    let script = diff(&a, &b);
    assert_eq!(script.indices(), vec![1]);
    let records = script.get(1).unwrap();
    assert_eq!(records.len(), 1);
    assert!(matches!(&records[0], VPatch::Remove { .. }));
}

#[test]
fn test_replacing_a_subtree_destroys_its_widgets() {
    let destroy: Rc<dyn Fn()> = Rc::new(|| {});
    let a = VElement::builder("div")
        .child(
            VElement::builder("span")
                .child(VNode::widget_with_destroy(3, destroy))
                .build(),
        )
        .build();
    let b = VElement::builder("div").child(VNode::text("x")).build();

    // div=0, span=1, widget=2
    let script = diff(&a, &b);
    assert_eq!(script.indices(), vec![1, 2]);
    assert!(matches!(script.get(1).unwrap(), [VPatch::SetText { .. }]));
    assert!(
        matches!(script.get(2).unwrap(), [VPatch::Remove { old }] if old.is_widget()),
        "the nested widget needs its own removal record so the applier can destroy it"
    );
}

struct FixedRender {
    node: Rc<VNode>,
    calls: Rc<Cell<usize>>,
}

impl ThunkRender for FixedRender {
    fn render(&self, _previous: Option<&Rc<VNode>>) -> Rc<VNode> {
        self.calls.set(self.calls.get() + 1);
        self.node.clone()
    }
}

fn thunk_of(node: Rc<VNode>, calls: &Rc<Cell<usize>>) -> Rc<VNode> {
    VNode::thunk(Rc::new(FixedRender {
        node,
        calls: calls.clone(),
    }))
}

#[test]
fn test_thunk_pair_diffs_as_nested_script() {
    let calls = Rc::new(Cell::new(0));
    let a = thunk_of(VNode::text("one"), &calls);
    let b = thunk_of(VNode::text("two"), &calls);

    let script = diff(&a, &b);
    assert_eq!(script.indices(), vec![0]);
    let VPatch::Thunk { script: sub } = &script.get(0).unwrap()[0] else {
        panic!("expected a nested thunk script");
    };
    assert_eq!(sub.indices(), vec![0]);
    assert!(matches!(sub.get(0).unwrap(), [VPatch::SetText { .. }]));
}

#[test]
fn test_equal_thunk_resolutions_produce_no_patch() {
    let calls = Rc::new(Cell::new(0));
    let a = thunk_of(VNode::text("same"), &calls);
    let b = thunk_of(VNode::text("same"), &calls);
    let script = diff(&a, &b);
    assert!(script.is_empty());
}

#[test]
fn test_thunk_resolution_is_cached_across_diffs() {
    let calls = Rc::new(Cell::new(0));
    let a = thunk_of(VNode::text("one"), &calls);
    let b = VNode::text("two");

    let first = diff(&a, &b);
    assert!(!first.is_empty());
    assert_eq!(calls.get(), 1);

    let second = diff(&a, &b);
    assert_eq!(second.len(), first.len());
    assert_eq!(calls.get(), 1, "the resolver must run at most once per node");
}

#[test]
fn test_report_counts_a_text_edit() {
    let a = VElement::builder("div").child(VNode::text("old")).build();
    let b = VElement::builder("div").child(VNode::text("new")).build();
    let (script, report) = diff_with_report(&a, &b);
    assert!(!script.is_empty());
    assert_eq!(report.insertions, 1);
    assert_eq!(report.deletions, 1);
    assert_eq!(report.diff_text, "[INS]new[/INS]\n[DEL]old[/DEL]");
}

#[test]
fn test_report_is_clean_for_a_pure_keyed_permutation() {
    let a = ul(vec![li("a", "one"), li("b", "two"), li("c", "three")]);
    let b = ul(vec![li("c", "three"), li("a", "one"), li("b", "two")]);
    let (script, report) = diff_with_report(&a, &b);
    assert!(!script.is_empty(), "the reorder itself still patches");
    assert!(report.is_clean(), "a permutation is not content change: {:?}", report);
}

#[test]
fn test_report_cancels_unkeyed_swap_noise() {
    // Positionally diffed, the swap shows up as two text edits on adjacent
    // trace lines; the report recognizes the fragments as moved, not changed.
    let a = VElement::builder("div")
        .child(VNode::text("x"))
        .child(VNode::text("y"))
        .build();
    let b = VElement::builder("div")
        .child(VNode::text("y"))
        .child(VNode::text("x"))
        .build();
    let (_, report) = diff_with_report(&a, &b);
    assert!(report.is_clean(), "{:?}", report);
}
