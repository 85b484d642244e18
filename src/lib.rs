//! Compile filter programs written in a small jq-style expression
//! language and stream self-describing values through them.
//!
//! A program is compiled once into a [`Filter`]: a pure function from one
//! input value to an ordered list of output values. The [`run`] driver
//! pulls values from a [`Decoder`], applies the filter, and pushes every
//! result to an [`Encoder`]. Values are abstract (see [`value::Value`]);
//! the [`json`] module binds both ends of the pipeline to JSON.
//!
//! ```
//! use sift::json::{JsonDecoder, JsonEncoder};
//! use sift::{compile, run};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let filter = compile("example", ".items[] | .name")?;
//!
//!     let input = r#"{"items": [{"name": "a"}, {"name": "b"}]}"#;
//!     let mut decoder = JsonDecoder::new(input.as_bytes());
//!     let mut output = Vec::new();
//!     let mut encoder = JsonEncoder::new(&mut output);
//!     run(&mut decoder, &filter, &mut encoder)?;
//!
//!     assert_eq!(output, b"\"a\"\n\"b\"\n");
//!     Ok(())
//! }
//! ```
//!
//! The language is a strict subset of jq: identity, field access and
//! optional selectors, indexing, slicing, iteration, recursive descent,
//! array and object construction, pipes, commas, and arithmetic with the
//! overloaded `+`/`-` forms. Compile errors carry a
//! `name:line:column: message` position.

pub mod errors;
pub mod filter;
pub mod json;
pub mod lexer;
pub mod ops;
pub mod parser;
pub mod token;
pub mod value;

pub use errors::SiftError;
pub use errors::SiftErrorType;
pub use filter::run;
pub use filter::Decoder;
pub use filter::Encoder;
pub use filter::Filter;
pub use filter::FilterResult;
pub use filter::StreamError;
pub use parser::compile;
pub use value::Value;
pub use value::ValueRef;
