//! The filter algebra and the streaming driver.
//!
//! A [`Filter`] reads one value and emits an ordered, finite list of
//! values. Filters are built by the parser out of the combinators in this
//! module; the multi-input combinators apply their operator over the
//! Cartesian product of the sub-filter outputs, outermost input first,
//! last input varying fastest.

use std::fmt;
use std::rc::Rc;

use itertools::Itertools;

use crate::errors::SiftError;
use crate::value::ValueRef;

/// The outputs of one filter application, or the error that aborted it.
pub type FilterResult = Result<Vec<ValueRef>, SiftError>;

/// A compiled filter: a pure function from one input value to zero or
/// more output values.
pub struct Filter(Box<dyn Fn(&ValueRef) -> FilterResult>);

impl Filter {
    pub(crate) fn new(f: impl Fn(&ValueRef) -> FilterResult + 'static) -> Self {
        Filter(Box::new(f))
    }
}

impl std::ops::Deref for Filter {
    type Target = dyn Fn(&ValueRef) -> FilterResult;

    fn deref(&self) -> &Self::Target {
        &*self.0
    }
}

impl fmt::Debug for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Filter(..)")
    }
}

/// Errors surfaced by decoders and encoders. The driver passes these
/// through verbatim.
pub type StreamError = Box<dyn std::error::Error + Send + Sync>;

/// Reads values from a stream of data in an unspecified format. A JSON
/// decoder, for example, reads text and returns the values it describes.
pub trait Decoder {
    /// Returns the next value, or `None` at end of stream.
    fn decode(&mut self) -> Result<Option<ValueRef>, StreamError>;
}

/// Writes values to a stream of data in an unspecified format.
pub trait Encoder {
    fn encode(&mut self, v: &ValueRef) -> Result<(), StreamError>;
}

/// The identity filter: every input is emitted unchanged.
pub fn identity() -> Filter {
    Filter::new(|v| Ok(vec![Rc::clone(v)]))
}

/// A filter that ignores its input and always emits `value`.
pub fn literal(value: ValueRef) -> Filter {
    Filter::new(move |_| Ok(vec![Rc::clone(&value)]))
}

/// Applies `f`, then applies `g` to each of its outputs, concatenating
/// the results in order.
pub fn compose(f: Filter, g: Filter) -> Filter {
    Filter::new(move |v| {
        let mut outs = Vec::new();
        for fv in f(v)? {
            outs.extend(g(&fv)?);
        }
        Ok(outs)
    })
}

/// Applies `f` and `g` to the same input and emits the outputs of `f`
/// followed by the outputs of `g`.
pub fn concat(f: Filter, g: Filter) -> Filter {
    Filter::new(move |v| {
        let mut outs = f(v)?;
        outs.extend(g(v)?);
        Ok(outs)
    })
}

/// Applies `x` and `y` to the input, then applies `op` to the Cartesian
/// product of their outputs.
pub fn binary<F>(x: Filter, y: Filter, op: F) -> Filter
where
    F: Fn(&ValueRef, &ValueRef) -> FilterResult + 'static,
{
    Filter::new(move |v| {
        let xvs = x(v)?;
        let yvs = y(v)?;
        let mut outs = Vec::new();
        for xv in &xvs {
            for yv in &yvs {
                outs.extend(op(xv, yv)?);
            }
        }
        Ok(outs)
    })
}

/// Applies `x`, `y` and `z` to the input, then applies `op` to the
/// Cartesian product of their outputs.
pub fn ternary<F>(x: Filter, y: Filter, z: Filter, op: F) -> Filter
where
    F: Fn(&ValueRef, &ValueRef, &ValueRef) -> FilterResult + 'static,
{
    Filter::new(move |v| {
        let xvs = x(v)?;
        let yvs = y(v)?;
        let zvs = z(v)?;
        let mut outs = Vec::new();
        for xv in &xvs {
            for yv in &yvs {
                for zv in &zvs {
                    outs.extend(op(xv, yv, zv)?);
                }
            }
        }
        Ok(outs)
    })
}

/// The n-ary generalization of [`binary`]: gathers each sub-filter's
/// outputs and applies `op` once per element of their Cartesian product,
/// in lexicographic order with the last position varying fastest.
/// `filters` must not be empty.
pub fn nary<F>(filters: Vec<Filter>, op: F) -> Filter
where
    F: Fn(&[ValueRef]) -> FilterResult + 'static,
{
    Filter::new(move |v| {
        let gathered: Vec<Vec<ValueRef>> =
            filters.iter().map(|f| f(v)).collect::<Result<_, _>>()?;
        let mut outs = Vec::new();
        for combo in gathered
            .iter()
            .map(|vs| vs.iter().cloned())
            .multi_cartesian_product()
        {
            outs.extend(op(&combo)?);
        }
        Ok(outs)
    })
}

/// Reads values from `decoder`, transforms them with `filter`, and writes
/// the results to `encoder` until the input is exhausted or an error
/// occurs. The outputs for each input are fully written before the next
/// input is read; the first error of any kind aborts the stream.
pub fn run(
    decoder: &mut dyn Decoder,
    filter: &Filter,
    encoder: &mut dyn Encoder,
) -> Result<(), StreamError> {
    loop {
        let vin = match decoder.decode()? {
            Some(vin) => vin,
            None => return Ok(()),
        };
        for vout in filter(&vin)? {
            encoder.encode(&vout)?;
        }
    }
}
