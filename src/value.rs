//! The abstract value protocol.
//!
//! A [`Value`] is a datum flowing through a filter. Its representation is
//! abstract: this module describes values through a small capability trait
//! and provides basic in-memory implementations, but encoding modules may
//! supply their own backing (see [`crate::json`]). Every value belongs to
//! exactly one [`Kind`]; the projection methods are meaningful only for the
//! kinds noted on each.

use core::fmt;
use std::collections::BTreeMap;
use std::rc::Rc;

/// A shared, immutable value. Cloning is O(1).
pub type ValueRef = Rc<dyn Value>;

/// The six value categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    Null,
    Bool,
    Number,
    Text,
    Array,
    Object,
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Kind::Null => f.write_str("null"),
            Kind::Bool => f.write_str("boolean"),
            Kind::Number => f.write_str("number"),
            Kind::Text => f.write_str("string"),
            Kind::Array => f.write_str("array"),
            Kind::Object => f.write_str("object"),
        }
    }
}

pub trait Value: fmt::Debug {
    /// The category this value belongs to.
    fn kind(&self) -> Kind;

    fn as_bool(&self) -> Option<bool> {
        None
    }

    fn as_number(&self) -> Option<f64> {
        None
    }

    fn as_text(&self) -> Option<&str> {
        None
    }

    /// Keys of an Object, in a stable order. Implementations must return a
    /// value from [`Value::attr`] for each of these.
    fn keys(&self) -> Vec<ValueRef> {
        Vec::new()
    }

    /// Looks up an Object attribute by key. `None` when the key is absent
    /// or the value has no attributes.
    fn attr(&self, _key: &dyn Value) -> Option<ValueRef> {
        None
    }

    /// One plus the greatest index for which [`Value::index`] returns a
    /// value; 0 when empty. Usually the number of elements of an Array,
    /// but may be greater if there are holes.
    fn length(&self) -> usize {
        0
    }

    /// The Array element at index `i`, or `None` for an out-of-range index
    /// or a hole.
    fn index(&self, _i: usize) -> Option<ValueRef> {
        None
    }
}

/// Whether a value counts as true in a conditional position.
pub fn truth(v: &dyn Value) -> bool {
    match v.kind() {
        Kind::Null => false,
        Kind::Bool => v.as_bool().unwrap_or(false),
        Kind::Number => v.as_number().is_some_and(|n| n != 0.0),
        Kind::Text => v.as_text().is_some_and(|s| !s.is_empty()),
        Kind::Array | Kind::Object => true,
    }
}

/// Structural equivalence. Two values are equal only when they share a
/// kind and their contents match; Array holes match holes, not Null, and
/// Object comparison walks keys in their canonical order.
pub fn equal(l: &dyn Value, r: &dyn Value) -> bool {
    if l.kind() != r.kind() {
        return false;
    }
    match l.kind() {
        Kind::Null => true,
        Kind::Bool => l.as_bool() == r.as_bool(),
        Kind::Number => l.as_number() == r.as_number(),
        Kind::Text => l.as_text() == r.as_text(),
        Kind::Object => {
            let lkeys = l.keys();
            let rkeys = r.keys();
            lkeys.len() == rkeys.len()
                && lkeys.iter().zip(rkeys.iter()).all(|(lk, rk)| {
                    equal(&**lk, &**rk)
                        && match (l.attr(&**lk), r.attr(&**rk)) {
                            (Some(lv), Some(rv)) => equal(&*lv, &*rv),
                            _ => false,
                        }
                })
        }
        Kind::Array => {
            let n = l.length();
            n == r.length()
                && (0..n).all(|i| match (l.index(i), r.index(i)) {
                    (Some(le), Some(re)) => equal(&*le, &*re),
                    (None, None) => true,
                    _ => false,
                })
        }
    }
}

#[derive(Debug)]
struct NullValue;

impl Value for NullValue {
    fn kind(&self) -> Kind {
        Kind::Null
    }
}

impl Value for bool {
    fn kind(&self) -> Kind {
        Kind::Bool
    }

    fn as_bool(&self) -> Option<bool> {
        Some(*self)
    }
}

impl Value for f64 {
    fn kind(&self) -> Kind {
        Kind::Number
    }

    fn as_number(&self) -> Option<f64> {
        Some(*self)
    }
}

impl Value for String {
    fn kind(&self) -> Kind {
        Kind::Text
    }

    fn as_text(&self) -> Option<&str> {
        Some(self)
    }
}

/// The basic Array representation. Slots hold `None` for holes.
#[derive(Debug)]
pub struct ArrayValue {
    slots: Vec<Option<ValueRef>>,
}

impl ArrayValue {
    pub fn new(elements: Vec<ValueRef>) -> Self {
        Self {
            slots: elements.into_iter().map(Some).collect(),
        }
    }

    pub fn with_holes(slots: Vec<Option<ValueRef>>) -> Self {
        Self { slots }
    }
}

impl Value for ArrayValue {
    fn kind(&self) -> Kind {
        Kind::Array
    }

    fn length(&self) -> usize {
        self.slots.len()
    }

    fn index(&self, i: usize) -> Option<ValueRef> {
        self.slots.get(i).cloned().flatten()
    }
}

/// The basic Object representation; keys enumerate in lexicographic order.
#[derive(Debug)]
pub struct ObjectValue {
    attrs: BTreeMap<String, ValueRef>,
}

impl ObjectValue {
    pub fn new(attrs: BTreeMap<String, ValueRef>) -> Self {
        Self { attrs }
    }
}

impl Value for ObjectValue {
    fn kind(&self) -> Kind {
        Kind::Object
    }

    fn keys(&self) -> Vec<ValueRef> {
        self.attrs.keys().map(|k| text(k.clone())).collect()
    }

    fn attr(&self, key: &dyn Value) -> Option<ValueRef> {
        self.attrs.get(key.as_text()?).cloned()
    }
}

pub fn null() -> ValueRef {
    Rc::new(NullValue)
}

pub fn boolean(b: bool) -> ValueRef {
    Rc::new(b)
}

pub fn number(n: f64) -> ValueRef {
    Rc::new(n)
}

pub fn text(s: impl Into<String>) -> ValueRef {
    Rc::new(s.into())
}

pub fn array(elements: Vec<ValueRef>) -> ValueRef {
    Rc::new(ArrayValue::new(elements))
}

pub fn object(attrs: BTreeMap<String, ValueRef>) -> ValueRef {
    Rc::new(ObjectValue::new(attrs))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn obj(pairs: &[(&str, ValueRef)]) -> ValueRef {
        object(
            pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.clone()))
                .collect(),
        )
    }

    #[test]
    fn truth_table() {
        assert!(!truth(&*null()));
        assert!(!truth(&*boolean(false)));
        assert!(truth(&*boolean(true)));
        assert!(!truth(&*number(0.0)));
        assert!(truth(&*number(0.5)));
        assert!(!truth(&*text("")));
        assert!(truth(&*text("x")));
        assert!(truth(&*array(Vec::new())));
        assert!(truth(&*object(BTreeMap::new())));
    }

    #[test]
    fn equal_scalars() {
        assert!(equal(&*null(), &*null()));
        assert!(equal(&*boolean(true), &*boolean(true)));
        assert!(!equal(&*boolean(true), &*boolean(false)));
        assert!(equal(&*number(1.5), &*number(1.5)));
        assert!(!equal(&*number(1.5), &*number(2.5)));
        assert!(equal(&*text("abc"), &*text("abc")));
        assert!(!equal(&*text("abc"), &*text("abd")));
        assert!(!equal(&*null(), &*boolean(false)));
        assert!(!equal(&*number(0.0), &*boolean(false)));
        assert!(!equal(&*text(""), &*null()));
    }

    #[test]
    fn equal_arrays() {
        let a = array(vec![number(1.0), number(2.0)]);
        let b = array(vec![number(1.0), number(2.0)]);
        let c = array(vec![number(2.0), number(1.0)]);
        assert!(equal(&*a, &*b));
        assert!(!equal(&*a, &*c));
        assert!(!equal(&*a, &*array(vec![number(1.0)])));
    }

    #[test]
    fn holes_are_not_null() {
        let holed: ValueRef = Rc::new(ArrayValue::with_holes(vec![
            Some(number(1.0)),
            None,
            Some(number(3.0)),
        ]));
        let nulled = array(vec![number(1.0), null(), number(3.0)]);
        assert_eq!(holed.length(), 3);
        assert!(holed.index(1).is_none());
        assert!(!equal(&*holed, &*nulled));
        let holed2: ValueRef = Rc::new(ArrayValue::with_holes(vec![
            Some(number(1.0)),
            None,
            Some(number(3.0)),
        ]));
        assert!(equal(&*holed, &*holed2));
    }

    #[test]
    fn equal_objects_ignores_construction_order() {
        let a = obj(&[("x", number(1.0)), ("y", number(2.0))]);
        let b = obj(&[("y", number(2.0)), ("x", number(1.0))]);
        assert!(equal(&*a, &*b));
        assert!(!equal(&*a, &*obj(&[("x", number(1.0))])));
        assert!(!equal(&*a, &*obj(&[("x", number(1.0)), ("y", number(3.0))])));
    }

    #[test]
    fn object_keys_are_sorted() {
        let v = obj(&[("b", number(1.0)), ("a", number(2.0)), ("c", number(3.0))]);
        let keys: Vec<String> = v
            .keys()
            .iter()
            .map(|k| k.as_text().unwrap().to_string())
            .collect();
        assert_eq!(keys, vec!["a", "b", "c"]);
    }

    #[test]
    fn attr_misses() {
        let v = obj(&[("a", number(1.0))]);
        assert!(v.attr(&String::from("b")).is_none());
        assert!(v.attr(&*number(1.0)).is_none());
        assert!(null().attr(&String::from("a")).is_none());
    }
}
