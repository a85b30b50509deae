//! Property maps and property-level diffing.
//!
//! The tree walker treats the props differ as a collaborator: it hands over
//! two maps and gets back either "no change" or an opaque patch that is
//! forwarded verbatim into an `UpdateProps` record. Values may nest (think
//! `attributes` or `style` sub-maps), and hook values are compared by
//! identity and replaced wholesale, never merged.

use core::fmt;
use core::hash::{Hash, Hasher};
use std::rc::Rc;

use compact_str::CompactString;
use indexmap::IndexMap;

use crate::vnode::rc_addr_eq;

/// A property map in insertion order.
pub type Props = IndexMap<CompactString, PropValue>;

/// A patch over a property map: key → edit, in emission order.
pub type PropsPatch = IndexMap<CompactString, PropEdit>;

/// Marker for lifecycle hook values.
///
/// The diff core only needs to know *that* a prop is a hook: hooks make their
/// element eligible for the unbind pass when its subtree is removed or
/// replaced. Binding and unbinding are the applier's business.
pub trait Hook: fmt::Debug {}

/// A property value.
#[derive(Debug, Clone)]
pub enum PropValue {
    /// A string value.
    Str(CompactString),
    /// A boolean value.
    Bool(bool),
    /// A numeric value.
    Num(f64),
    /// A nested map (e.g. `attributes`, `style`).
    Map(Props),
    /// A lifecycle hook, compared by identity.
    Hook(Rc<dyn Hook>),
}

impl PartialEq for PropValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (PropValue::Str(a), PropValue::Str(b)) => a == b,
            (PropValue::Bool(a), PropValue::Bool(b)) => a == b,
            (PropValue::Num(a), PropValue::Num(b)) => a == b,
            (PropValue::Map(a), PropValue::Map(b)) => a == b,
            (PropValue::Hook(a), PropValue::Hook(b)) => rc_addr_eq(a, b),
            _ => false,
        }
    }
}

impl fmt::Display for PropValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropValue::Str(s) => write!(f, "\"{}\"", s),
            PropValue::Bool(b) => write!(f, "{}", b),
            PropValue::Num(n) => write!(f, "{}", n),
            PropValue::Map(_) => write!(f, "{{..}}"),
            PropValue::Hook(_) => write!(f, "#hook"),
        }
    }
}

impl From<&str> for PropValue {
    fn from(value: &str) -> Self {
        PropValue::Str(CompactString::from(value))
    }
}

impl From<String> for PropValue {
    fn from(value: String) -> Self {
        PropValue::Str(CompactString::from(value))
    }
}

impl From<CompactString> for PropValue {
    fn from(value: CompactString) -> Self {
        PropValue::Str(value)
    }
}

impl From<bool> for PropValue {
    fn from(value: bool) -> Self {
        PropValue::Bool(value)
    }
}

impl From<f64> for PropValue {
    fn from(value: f64) -> Self {
        PropValue::Num(value)
    }
}

impl From<Props> for PropValue {
    fn from(value: Props) -> Self {
        PropValue::Map(value)
    }
}

impl From<Rc<dyn Hook>> for PropValue {
    fn from(value: Rc<dyn Hook>) -> Self {
        PropValue::Hook(value)
    }
}

/// A single edit within a [`PropsPatch`].
#[derive(Debug, Clone, PartialEq)]
pub enum PropEdit {
    /// Remove the key.
    Remove,
    /// Set the key to a new value.
    Set(PropValue),
    /// Patch a nested map in place.
    Update(PropsPatch),
}

/// Diff two property maps. Returns `None` when nothing changed.
///
/// Removed keys become [`PropEdit::Remove`]; changed scalars and hooks become
/// [`PropEdit::Set`] (an unequal hook always replaces, never merges); nested
/// maps diff recursively, and an empty nested diff is omitted entirely.
pub fn diff_props(a: &Props, b: &Props) -> Option<PropsPatch> {
    let mut patch = PropsPatch::new();

    for (key, a_val) in a {
        match b.get(key) {
            None => {
                patch.insert(key.clone(), PropEdit::Remove);
            }
            Some(b_val) if a_val == b_val => {}
            Some(b_val) => match (a_val, b_val) {
                (PropValue::Map(a_map), PropValue::Map(b_map)) => {
                    if let Some(nested) = diff_props(a_map, b_map) {
                        patch.insert(key.clone(), PropEdit::Update(nested));
                    }
                }
                _ => {
                    patch.insert(key.clone(), PropEdit::Set(b_val.clone()));
                }
            },
        }
    }

    for (key, b_val) in b {
        if !a.contains_key(key) {
            patch.insert(key.clone(), PropEdit::Set(b_val.clone()));
        }
    }

    if patch.is_empty() { None } else { Some(patch) }
}

/// The hook-unbind patch for an element's props: every hook-valued key maps
/// to a removal. Emitted when the element's subtree leaves the tree.
pub(crate) fn unhook_patch(props: &Props) -> PropsPatch {
    props
        .iter()
        .filter(|(_, value)| matches!(value, PropValue::Hook(_)))
        .map(|(key, _)| (key.clone(), PropEdit::Remove))
        .collect()
}

/// Feed a property map into a hasher, in iteration order.
pub(crate) fn hash_props<H: Hasher>(props: &Props, state: &mut H) {
    props.len().hash(state);
    for (key, value) in props {
        key.hash(state);
        hash_prop_value(value, state);
    }
}

fn hash_prop_value<H: Hasher>(value: &PropValue, state: &mut H) {
    match value {
        PropValue::Str(s) => {
            0u8.hash(state);
            s.hash(state);
        }
        PropValue::Bool(b) => {
            1u8.hash(state);
            b.hash(state);
        }
        PropValue::Num(n) => {
            2u8.hash(state);
            n.to_bits().hash(state);
        }
        PropValue::Map(m) => {
            3u8.hash(state);
            hash_props(m, state);
        }
        PropValue::Hook(h) => {
            4u8.hash(state);
            (Rc::as_ptr(h) as *const () as usize).hash(state);
        }
    }
}
