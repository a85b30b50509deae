//! Keyed child-list reconciliation.
//!
//! [`reorder`] aligns a new child list into the old list's positional slots
//! wherever a key or free-slot correspondence exists, so the walker can diff
//! index-aligned pairs, and computes the residual move script only when
//! alignment alone cannot explain the transformation.
//!
//! The simulation pass replays the aligned list against the target order
//! with explicit remove-at/insert-at steps on a private working copy. Its
//! tie-break rule — remove an out-of-place keyed item unless the removal
//! would not advance alignment, in which case skip ahead — depends on the
//! exact mutation order below; the move scripts it emits are small in
//! practice but carry no formal minimality guarantee.

use std::rc::Rc;

use rapidhash::RapidHashMap;

use super::patch::{MoveInsert, MoveRemove, Moves};
use crate::vnode::{Key, VNode};

/// Keyed/unkeyed partition of one child list.
pub struct KeyIndex {
    /// Key → position among the siblings. Duplicate keys resolve to the
    /// last occurrence; earlier ones are shadowed.
    pub keys: RapidHashMap<Key, usize>,
    /// Positions of unkeyed siblings, in order — the "free slots" eligible
    /// for positional matching.
    pub free: Vec<usize>,
}

/// Partition a child list into keyed and free positions.
pub fn key_index(children: &[Rc<VNode>]) -> KeyIndex {
    let mut keys = RapidHashMap::default();
    let mut free = Vec::new();
    for (i, child) in children.iter().enumerate() {
        match child.key() {
            Some(key) => {
                keys.insert(key.clone(), i);
            }
            None => free.push(i),
        }
    }
    KeyIndex { keys, free }
}

/// The reconciler's output.
pub struct Reordered {
    /// The new children aligned into the old list's slots: `None` marks a
    /// slot whose old occupant has no counterpart; entries past the old
    /// list's length are insertion candidates.
    pub children: Vec<Option<Rc<VNode>>>,
    /// The residual move script, or `None` when positional diffing plus
    /// plain remove records already reach the target order.
    pub moves: Option<Moves>,
}

/// Reconcile two child lists under key identity.
///
/// When either list is entirely unkeyed there is nothing key identity can
/// add, and the new list is returned as-is for pure positional diffing.
pub fn reorder(a_children: &[Rc<VNode>], b_children: &[Rc<VNode>]) -> Reordered {
    let b_index = key_index(b_children);
    if b_index.free.len() == b_children.len() {
        return Reordered {
            children: b_children.iter().cloned().map(Some).collect(),
            moves: None,
        };
    }

    let a_index = key_index(a_children);
    if a_index.free.len() == a_children.len() {
        return Reordered {
            children: b_children.iter().cloned().map(Some).collect(),
            moves: None,
        };
    }

    // First pass: walk the old list and fill each slot with its keyed match
    // or the next unconsumed free slot from the new list.
    let mut children: Vec<Option<Rc<VNode>>> =
        Vec::with_capacity(a_children.len().max(b_children.len()));
    let mut free_index = 0;
    let mut deleted_items = 0;

    for a_item in a_children {
        match a_item.key() {
            Some(key) => match b_index.keys.get(key) {
                Some(&pos) => children.push(Some(b_children[pos].clone())),
                None => {
                    deleted_items += 1;
                    children.push(None);
                }
            },
            None => {
                if free_index < b_index.free.len() {
                    let pos = b_index.free[free_index];
                    free_index += 1;
                    children.push(Some(b_children[pos].clone()));
                } else {
                    deleted_items += 1;
                    children.push(None);
                }
            }
        }
    }

    let last_free_index = if free_index >= b_index.free.len() {
        b_children.len()
    } else {
        b_index.free[free_index]
    };

    // Append pass: new keyed children the old list never had, and unkeyed
    // children past the last consumed free slot.
    for (j, b_item) in b_children.iter().enumerate() {
        match b_item.key() {
            Some(key) => {
                if !a_index.keys.contains_key(key) {
                    children.push(Some(b_item.clone()));
                }
            }
            None => {
                if j >= last_free_index {
                    children.push(Some(b_item.clone()));
                }
            }
        }
    }

    // Simulation pass: replay the aligned list towards the target order on a
    // scratch copy, recording every remove/insert it takes to get there.
    let mut simulate = children.clone();
    let mut simulate_index = 0usize;
    let mut removes: Vec<MoveRemove> = Vec::new();
    let mut inserts: Vec<MoveInsert> = Vec::new();

    let mut k = 0usize;
    while k < b_children.len() {
        let wanted_key = b_children[k].key().cloned();

        // Placeholder slots never reach the target order; drop them here.
        while simulate
            .get(simulate_index)
            .is_some_and(|slot| slot.is_none())
        {
            removes.push(remove_from(&mut simulate, simulate_index, None));
        }

        let sim_item = simulate.get(simulate_index).and_then(|slot| slot.as_ref());
        let sim_present = sim_item.is_some();
        let sim_key = sim_item.and_then(|n| n.key().cloned());

        if !sim_present || sim_key != wanted_key {
            if let Some(wanted_key) = wanted_key {
                match sim_key {
                    Some(sim_key) => {
                        if b_index.keys.get(&sim_key).copied() != Some(k + 1) {
                            // An insert alone would not put this key in
                            // place; pull it out and re-insert later.
                            removes.push(remove_from(
                                &mut simulate,
                                simulate_index,
                                Some(sim_key),
                            ));
                            let next = simulate.get(simulate_index).and_then(|slot| slot.as_ref());
                            if next.is_none() || next.and_then(|n| n.key()) != Some(&wanted_key) {
                                inserts.push(MoveInsert {
                                    key: wanted_key,
                                    to: k,
                                });
                            } else {
                                // The removal exposed the wanted item; skip
                                // ahead instead of churning.
                                simulate_index += 1;
                            }
                        } else {
                            inserts.push(MoveInsert {
                                key: wanted_key,
                                to: k,
                            });
                        }
                    }
                    None => {
                        inserts.push(MoveInsert {
                            key: wanted_key,
                            to: k,
                        });
                    }
                }
                k += 1;
            } else if sim_key.is_some() {
                // A keyed item the target order has no use for here.
                removes.push(remove_from(&mut simulate, simulate_index, sim_key));
            }
        } else {
            simulate_index += 1;
            k += 1;
        }
    }

    // Whatever trails past the target order gets removed outright.
    while simulate_index < simulate.len() {
        let key = simulate[simulate_index]
            .as_ref()
            .and_then(|n| n.key().cloned());
        removes.push(remove_from(&mut simulate, simulate_index, key));
    }

    // If the only moves are the deletions the aligned slots already imply,
    // plain remove records cover it and the move script is redundant.
    if removes.len() == deleted_items && inserts.is_empty() {
        return Reordered {
            children,
            moves: None,
        };
    }

    Reordered {
        children,
        moves: Some(Moves { removes, inserts }),
    }
}

fn remove_from(
    simulate: &mut Vec<Option<Rc<VNode>>>,
    index: usize,
    key: Option<Key>,
) -> MoveRemove {
    simulate.remove(index);
    MoveRemove { from: index, key }
}
