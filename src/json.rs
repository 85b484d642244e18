//! The default codec: JSON via serde_json.
//!
//! The decoder accepts a stream of concatenated or whitespace-separated
//! JSON values, keeping each behind the value protocol without converting
//! it up front. The encoder walks the protocol, so it accepts any value
//! backing; holes encode as `null`.

use std::io;
use std::rc::Rc;

use crate::filter::{Decoder, Encoder, StreamError};
use crate::value::{self, Kind, Value, ValueRef};

#[derive(Debug)]
struct JsonValue(serde_json::Value);

impl Value for JsonValue {
    fn kind(&self) -> Kind {
        match self.0 {
            serde_json::Value::Null => Kind::Null,
            serde_json::Value::Bool(_) => Kind::Bool,
            serde_json::Value::Number(_) => Kind::Number,
            serde_json::Value::String(_) => Kind::Text,
            serde_json::Value::Array(_) => Kind::Array,
            serde_json::Value::Object(_) => Kind::Object,
        }
    }

    fn as_bool(&self) -> Option<bool> {
        self.0.as_bool()
    }

    fn as_number(&self) -> Option<f64> {
        self.0.as_f64()
    }

    fn as_text(&self) -> Option<&str> {
        self.0.as_str()
    }

    fn keys(&self) -> Vec<ValueRef> {
        match self.0.as_object() {
            // serde_json's map iterates keys in sorted order
            Some(map) => map.keys().map(|k| value::text(k.clone())).collect(),
            None => Vec::new(),
        }
    }

    fn attr(&self, key: &dyn Value) -> Option<ValueRef> {
        let member = self.0.as_object()?.get(key.as_text()?)?;
        Some(Rc::new(JsonValue(member.clone())) as ValueRef)
    }

    fn length(&self) -> usize {
        self.0.as_array().map_or(0, Vec::len)
    }

    fn index(&self, i: usize) -> Option<ValueRef> {
        let element = self.0.as_array()?.get(i)?;
        Some(Rc::new(JsonValue(element.clone())) as ValueRef)
    }
}

/// A JSON [`Decoder`] reading a stream of values from `reader`.
pub struct JsonDecoder<R: io::Read> {
    stream: serde_json::StreamDeserializer<'static, serde_json::de::IoRead<R>, serde_json::Value>,
}

impl<R: io::Read> JsonDecoder<R> {
    pub fn new(reader: R) -> Self {
        Self {
            stream: serde_json::Deserializer::from_reader(reader).into_iter(),
        }
    }
}

impl<R: io::Read> Decoder for JsonDecoder<R> {
    fn decode(&mut self) -> Result<Option<ValueRef>, StreamError> {
        match self.stream.next() {
            None => Ok(None),
            Some(Ok(raw)) => Ok(Some(Rc::new(JsonValue(raw)) as ValueRef)),
            Some(Err(err)) => Err(Box::new(err)),
        }
    }
}

/// A JSON [`Encoder`] writing one compact, newline-terminated document
/// per value to `writer`.
pub struct JsonEncoder<W: io::Write> {
    writer: W,
}

impl<W: io::Write> JsonEncoder<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }
}

impl<W: io::Write> Encoder for JsonEncoder<W> {
    fn encode(&mut self, v: &ValueRef) -> Result<(), StreamError> {
        let raw = to_json(&**v)?;
        serde_json::to_writer(&mut self.writer, &raw)?;
        self.writer.write_all(b"\n")?;
        Ok(())
    }
}

fn to_json(v: &dyn Value) -> Result<serde_json::Value, StreamError> {
    match v.kind() {
        Kind::Null => Ok(serde_json::Value::Null),
        Kind::Bool => Ok(v.as_bool().unwrap_or_default().into()),
        Kind::Number => number_to_json(v.as_number().unwrap_or_default()),
        Kind::Text => Ok(v.as_text().unwrap_or_default().into()),
        Kind::Array => {
            let mut elements = Vec::with_capacity(v.length());
            for i in 0..v.length() {
                elements.push(match v.index(i) {
                    Some(element) => to_json(&*element)?,
                    None => serde_json::Value::Null, // holes collapse to null
                });
            }
            Ok(elements.into())
        }
        Kind::Object => {
            let mut map = serde_json::Map::new();
            for key in v.keys() {
                let name = key
                    .as_text()
                    .ok_or_else(|| format!("object key is {}, not a string", key.kind()))?;
                let member = v
                    .attr(&*key)
                    .ok_or_else(|| format!("no value for key '{name}'"))?;
                map.insert(name.to_string(), to_json(&*member)?);
            }
            Ok(serde_json::Value::Object(map))
        }
    }
}

// Doubles with no fractional part print as integers, matching the usual
// jq rendering; 2^53 bounds the range where that conversion is exact.
const MAX_EXACT_INT: f64 = 9_007_199_254_740_992.0;

fn number_to_json(n: f64) -> Result<serde_json::Value, StreamError> {
    if n.fract() == 0.0 && n.abs() <= MAX_EXACT_INT {
        return Ok((n as i64).into());
    }
    match serde_json::Number::from_f64(n) {
        Some(number) => Ok(serde_json::Value::Number(number)),
        None => Err(format!("cannot represent {n} in JSON").into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::equal;
    use std::collections::BTreeMap;

    fn decode_all(input: &str) -> Vec<ValueRef> {
        let mut decoder = JsonDecoder::new(input.as_bytes());
        let mut values = Vec::new();
        while let Some(v) = decoder.decode().unwrap() {
            values.push(v);
        }
        values
    }

    fn encode(v: &ValueRef) -> String {
        let mut out = Vec::new();
        JsonEncoder::new(&mut out).encode(v).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn decodes_concatenated_values() {
        let values = decode_all("{\"x\":1} 2 \"three\"\nnull");
        assert_eq!(values.len(), 4);
        assert_eq!(values[0].kind(), Kind::Object);
        assert!(equal(&*values[1], &*value::number(2.0)));
        assert!(equal(&*values[2], &*value::text("three")));
        assert!(values[3].kind() == Kind::Null);
    }

    #[test]
    fn decode_error_on_malformed_input() {
        let mut decoder = JsonDecoder::new("{\"x\":".as_bytes());
        assert!(decoder.decode().is_err());
    }

    #[test]
    fn round_trip_equivalence() {
        for text in [
            "null",
            "true",
            "12",
            "12.5",
            "\"abc\"",
            "[1,[2,\"x\"],{}]",
            "{\"a\":1,\"b\":[null,false]}",
        ] {
            let values = decode_all(text);
            assert_eq!(values.len(), 1, "{text}");
            assert_eq!(encode(&values[0]).trim_end(), text, "{text}");
        }
    }

    #[test]
    fn object_keys_encode_sorted() {
        let values = decode_all("{\"b\":1,\"a\":2}");
        assert_eq!(encode(&values[0]), "{\"a\":2,\"b\":1}\n");
    }

    #[test]
    fn integral_doubles_encode_as_integers() {
        assert_eq!(encode(&value::number(12.0)).trim_end(), "12");
        assert_eq!(encode(&value::number(-3.0)).trim_end(), "-3");
        assert_eq!(encode(&value::number(12.5)).trim_end(), "12.5");
        assert_eq!(
            encode(&value::number(-f64::MAX)).trim_end(),
            "-1.7976931348623157e308"
        );
    }

    #[test]
    fn non_finite_numbers_fail_to_encode() {
        let mut out = Vec::new();
        let result = JsonEncoder::new(&mut out).encode(&value::number(f64::INFINITY));
        assert!(result.is_err());
    }

    #[test]
    fn holes_encode_as_null() {
        let holed: ValueRef = Rc::new(value::ArrayValue::with_holes(vec![
            Some(value::number(1.0)),
            None,
            Some(value::number(3.0)),
        ]));
        assert_eq!(encode(&holed), "[1,null,3]\n");
    }

    #[test]
    fn basic_values_encode() {
        let obj = value::object(BTreeMap::from([
            (String::from("x"), value::boolean(true)),
            (String::from("y"), value::text("z")),
        ]));
        assert_eq!(encode(&obj), "{\"x\":true,\"y\":\"z\"}\n");
    }
}
