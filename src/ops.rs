//! The built-in operations filters are made of: field access, indexing,
//! slicing, iteration, recursive descent, and the numeric and structural
//! operators.
//!
//! Structural failures raise type errors; the optional forms convert
//! those into "no values emitted" instead.

use std::collections::BTreeMap;
use std::rc::Rc;

use crate::errors::SiftError;
use crate::filter::{Filter, FilterResult};
use crate::value::{self, equal, ArrayValue, Kind, ValueRef};

/// Field access `.name`. When the attribute is present it is emitted.
/// Otherwise, a required access emits Null for Object and Null inputs and
/// raises a type error for anything else; an optional access emits
/// nothing at all.
pub fn attr(name: String, required: bool) -> Filter {
    Filter::new(move |v| {
        if let Some(found) = v.attr(&name) {
            return Ok(vec![found]);
        }
        if !required {
            return Ok(Vec::new());
        }
        match v.kind() {
            Kind::Object | Kind::Null => Ok(vec![value::null()]),
            kind => Err(SiftError::typ(format!(
                "cannot index {kind} with '{name}'"
            ))),
        }
    })
}

/// Bracket indexing `.[key]`. Arrays take integer numbers (negative
/// counts from the end, out of bounds and holes give Null, a fractional
/// index gives nothing); Objects behave like field access with the key
/// coerced to Text, so a non-Text key reads as an absent attribute and
/// gives Null; Null gives Null.
pub fn index(v: &ValueRef, key: &ValueRef) -> FilterResult {
    match v.kind() {
        Kind::Null => Ok(vec![value::null()]),
        Kind::Object => match v.attr(&**key) {
            Some(found) => Ok(vec![found]),
            None => Ok(vec![value::null()]),
        },
        Kind::Array => {
            let n = key.as_number().ok_or_else(|| {
                SiftError::typ(format!("cannot index array with {}", key.kind()))
            })?;
            if n.trunc() != n {
                return Ok(Vec::new());
            }
            let length = v.length() as i64;
            let mut i = n as i64;
            if i < 0 {
                i += length;
            }
            if i < 0 || i >= length {
                return Ok(vec![value::null()]);
            }
            Ok(vec![v.index(i as usize).unwrap_or_else(value::null)])
        }
        kind => Err(SiftError::typ(format!("cannot index {kind}"))),
    }
}

/// Slicing `.[begin:end]`. Bounds must be numbers; a negative bound
/// counts from the end, and both are clamped into `[0, length]` and
/// truncated. Array slices drop holes; Text slices take a range of UTF-8
/// bytes (a boundary inside a multi-byte character is repaired with
/// U+FFFD); Null gives Null.
pub fn slice(v: &ValueRef, begin: Option<&ValueRef>, end: Option<&ValueRef>) -> FilterResult {
    if v.kind() == Kind::Null {
        return Ok(vec![value::null()]);
    }
    let length = match v.kind() {
        Kind::Array => v.length(),
        Kind::Text => v.as_text().map_or(0, str::len),
        kind => return Err(SiftError::typ(format!("cannot slice {kind}"))),
    };
    let begin = bound(begin, 0.0, length)?;
    let end = bound(end, length as f64, length)?.max(begin);
    match v.kind() {
        Kind::Array => Ok(vec![value::array(
            (begin..end).filter_map(|i| v.index(i)).collect(),
        )]),
        _ => {
            let text = v.as_text().unwrap_or_default();
            let sliced = String::from_utf8_lossy(&text.as_bytes()[begin..end]).into_owned();
            Ok(vec![value::text(sliced)])
        }
    }
}

fn bound(b: Option<&ValueRef>, default: f64, length: usize) -> Result<usize, SiftError> {
    let mut n = match b {
        None => default,
        Some(v) => v.as_number().ok_or_else(|| {
            SiftError::typ(format!("slice index must be a number, not {}", v.kind()))
        })?,
    };
    if n < 0.0 {
        n += length as f64;
    }
    Ok(n.clamp(0.0, length as f64) as usize)
}

/// Iteration `.[]`: emits an Array's elements in order, skipping holes.
/// The optional form emits nothing for non-Arrays instead of raising.
pub fn iterate(required: bool) -> Filter {
    Filter::new(move |v| match v.kind() {
        Kind::Array => Ok((0..v.length()).filter_map(|i| v.index(i)).collect()),
        kind => {
            if required {
                Err(SiftError::typ(format!("cannot iterate over {kind}")))
            } else {
                Ok(Vec::new())
            }
        }
    })
}

/// Recursive descent `..`: a depth-first pre-order traversal emitting the
/// input and every value reachable through Object attributes (in key
/// order) and Array elements (in index order, skipping holes).
pub fn walk() -> Filter {
    Filter::new(|v| {
        let mut outs = Vec::new();
        descend(v, &mut outs);
        Ok(outs)
    })
}

fn descend(v: &ValueRef, outs: &mut Vec<ValueRef>) {
    outs.push(Rc::clone(v));
    match v.kind() {
        Kind::Object => {
            for key in v.keys() {
                if let Some(child) = v.attr(&*key) {
                    descend(&child, outs);
                }
            }
        }
        Kind::Array => {
            for i in 0..v.length() {
                if let Some(child) = v.index(i) {
                    descend(&child, outs);
                }
            }
        }
        _ => {}
    }
}

/// Unary minus.
pub fn negate() -> Filter {
    Filter::new(|v| match v.as_number() {
        Some(n) => Ok(vec![value::number(-n)]),
        None => Err(SiftError::typ(format!("cannot negate {}", v.kind()))),
    })
}

/// Overloaded `+`: numeric sum, Text concatenation, Array concatenation
/// (holes preserved), or Object union where the left operand wins on
/// conflicting keys.
pub fn add(x: &ValueRef, y: &ValueRef) -> FilterResult {
    match (x.kind(), y.kind()) {
        (Kind::Number, Kind::Number) => {
            let sum = number_of(x) + number_of(y);
            Ok(vec![value::number(sum)])
        }
        (Kind::Text, Kind::Text) => {
            let mut joined = x.as_text().unwrap_or_default().to_string();
            joined.push_str(y.as_text().unwrap_or_default());
            Ok(vec![value::text(joined)])
        }
        (Kind::Array, Kind::Array) => {
            let slots = slots_of(x).chain(slots_of(y)).collect();
            Ok(vec![Rc::new(ArrayValue::with_holes(slots)) as ValueRef])
        }
        (Kind::Object, Kind::Object) => {
            let mut attrs = BTreeMap::new();
            for side in [y, x] {
                for key in side.keys() {
                    if let (Some(name), Some(found)) = (key.as_text(), side.attr(&*key)) {
                        attrs.insert(name.to_string(), found);
                    }
                }
            }
            Ok(vec![value::object(attrs)])
        }
        (xk, yk) => Err(SiftError::typ(format!("cannot add {xk} and {yk}"))),
    }
}

/// Overloaded `-`: numeric difference, or Array difference removing every
/// left element equal to some right element.
pub fn subtract(x: &ValueRef, y: &ValueRef) -> FilterResult {
    match (x.kind(), y.kind()) {
        (Kind::Number, Kind::Number) => {
            let diff = number_of(x) - number_of(y);
            Ok(vec![value::number(diff)])
        }
        (Kind::Array, Kind::Array) => {
            let removed: Vec<ValueRef> = (0..y.length()).filter_map(|i| y.index(i)).collect();
            let kept = (0..x.length())
                .filter_map(|i| x.index(i))
                .filter(|e| !removed.iter().any(|r| equal(&**e, &**r)))
                .collect();
            Ok(vec![value::array(kept)])
        }
        (xk, yk) => Err(SiftError::typ(format!("cannot subtract {yk} from {xk}"))),
    }
}

pub fn multiply(x: &ValueRef, y: &ValueRef) -> FilterResult {
    let (x, y) = numeric_operands(x, y)?;
    Ok(vec![value::number(x * y)])
}

/// Division follows IEEE-754: dividing by zero yields an infinity or NaN
/// rather than an error.
pub fn divide(x: &ValueRef, y: &ValueRef) -> FilterResult {
    let (x, y) = numeric_operands(x, y)?;
    Ok(vec![value::number(x / y)])
}

/// Floating-point remainder, keeping the sign of the dividend.
pub fn modulo(x: &ValueRef, y: &ValueRef) -> FilterResult {
    let (x, y) = numeric_operands(x, y)?;
    Ok(vec![value::number(x % y)])
}

fn numeric_operands(x: &ValueRef, y: &ValueRef) -> Result<(f64, f64), SiftError> {
    match (x.as_number(), y.as_number()) {
        (Some(x), Some(y)) => Ok((x, y)),
        (None, _) => Err(SiftError::typ(format!(
            "cannot use numeric operator with {}",
            x.kind()
        ))),
        _ => Err(SiftError::typ(format!(
            "cannot use numeric operator with {}",
            y.kind()
        ))),
    }
}

fn number_of(v: &ValueRef) -> f64 {
    v.as_number().unwrap_or_default()
}

fn slots_of(v: &ValueRef) -> impl Iterator<Item = Option<ValueRef>> + '_ {
    (0..v.length()).map(|i| v.index(i))
}
