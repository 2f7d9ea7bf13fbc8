use std::collections::BTreeMap;
use chrono::{DateTime, Utc};
use crate::compression::vbyte::VByteEncoder;
use crate::core::error::{Error, Result};
use crate::core::types::Document;
use crate::core::value::Value;

pub const DOCUMENT_FORMAT_VERSION: u8 = 1;
pub const MAX_NESTING_DEPTH: usize = 128;

const TAG_NULL: u8 = 0x00;
const TAG_FALSE: u8 = 0x01;
const TAG_TRUE: u8 = 0x02;
const TAG_INT: u8 = 0x03;
const TAG_FLOAT: u8 = 0x04;
const TAG_STRING: u8 = 0x05;
const TAG_TIMESTAMP: u8 = 0x06;
const TAG_ARRAY: u8 = 0x07;
const TAG_OBJECT: u8 = 0x08;

pub fn encode_document(doc: &Document) -> Vec<u8> {
    let mut out = Vec::with_capacity(64);
    out.push(DOCUMENT_FORMAT_VERSION);
    encode_object(&doc.fields, &mut out);
    out
}

pub fn decode_document(bytes: &[u8]) -> Result<Document> {
    let (&version, rest) = bytes
        .split_first()
        .ok_or_else(|| Error::corrupt("empty document record"))?;
    if version != DOCUMENT_FORMAT_VERSION {
        return Err(Error::corrupt(format!("unknown document format version {}", version)));
    }
    let mut reader = Reader { data: rest, pos: 0 };
    let value = reader.value(0)?;
    if reader.pos != rest.len() {
        return Err(Error::corrupt(format!(
            "{} trailing bytes after document",
            rest.len() - reader.pos
        )));
    }
    match value {
        Value::Object(fields) => Ok(Document { fields }),
        _ => Err(Error::corrupt("document record does not hold an object")),
    }
}

pub fn encode_value(value: &Value, out: &mut Vec<u8>) {
    match value {
        Value::Null => out.push(TAG_NULL),
        Value::Bool(false) => out.push(TAG_FALSE),
        Value::Bool(true) => out.push(TAG_TRUE),
        Value::Int(i) => {
            out.push(TAG_INT);
            out.extend_from_slice(&i.to_le_bytes());
        }
        Value::Float(f) => {
            out.push(TAG_FLOAT);
            out.extend_from_slice(&f.to_bits().to_le_bytes());
        }
        Value::String(s) => {
            out.push(TAG_STRING);
            encode_str(s, out);
        }
        Value::Timestamp(ts) => {
            out.push(TAG_TIMESTAMP);
            out.extend_from_slice(&ts.timestamp().to_le_bytes());
            out.extend_from_slice(&ts.timestamp_subsec_nanos().to_le_bytes());
        }
        Value::Array(items) => {
            out.push(TAG_ARRAY);
            VByteEncoder::encode_u64(out, items.len() as u64);
            for item in items {
                encode_value(item, out);
            }
        }
        Value::Object(map) => encode_object(map, out),
    }
}

fn encode_object(map: &BTreeMap<String, Value>, out: &mut Vec<u8>) {
    out.push(TAG_OBJECT);
    VByteEncoder::encode_u64(out, map.len() as u64);
    for (key, value) in map {
        encode_str(key, out);
        encode_value(value, out);
    }
}

fn encode_str(s: &str, out: &mut Vec<u8>) {
    VByteEncoder::encode_u64(out, s.len() as u64);
    out.extend_from_slice(s.as_bytes());
}

struct Reader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn take(&mut self, n: usize) -> Result<&'a [u8]> {
        let end = self.pos.checked_add(n).filter(|end| *end <= self.data.len());
        match end {
            Some(end) => {
                let slice = &self.data[self.pos..end];
                self.pos = end;
                Ok(slice)
            }
            None => Err(Error::corrupt(format!("truncated value at byte {}", self.pos))),
        }
    }

    fn byte(&mut self) -> Result<u8> {
        Ok(self.take(1)?[0])
    }

    fn fixed<const N: usize>(&mut self) -> Result<[u8; N]> {
        let mut buf = [0u8; N];
        buf.copy_from_slice(self.take(N)?);
        Ok(buf)
    }

    fn length(&mut self) -> Result<usize> {
        let (len, consumed) = VByteEncoder::decode_u64(&self.data[self.pos..])?;
        self.pos += consumed;
        // every element takes at least one byte
        if len > (self.data.len() - self.pos) as u64 {
            return Err(Error::corrupt(format!("length {} exceeds remaining input", len)));
        }
        Ok(len as usize)
    }

    fn string(&mut self) -> Result<String> {
        let len = self.length()?;
        let bytes = self.take(len)?;
        String::from_utf8(bytes.to_vec()).map_err(|_| Error::corrupt("string is not valid UTF-8"))
    }

    fn value(&mut self, depth: usize) -> Result<Value> {
        let tag = self.byte()?;
        match tag {
            TAG_NULL => Ok(Value::Null),
            TAG_FALSE => Ok(Value::Bool(false)),
            TAG_TRUE => Ok(Value::Bool(true)),
            TAG_INT => Ok(Value::Int(i64::from_le_bytes(self.fixed()?))),
            TAG_FLOAT => Ok(Value::Float(f64::from_bits(u64::from_le_bytes(self.fixed()?)))),
            TAG_STRING => Ok(Value::String(self.string()?)),
            TAG_TIMESTAMP => {
                let secs = i64::from_le_bytes(self.fixed()?);
                let nanos = u32::from_le_bytes(self.fixed()?);
                DateTime::<Utc>::from_timestamp(secs, nanos)
                    .map(Value::Timestamp)
                    .ok_or_else(|| Error::corrupt(format!("timestamp {}.{} out of range", secs, nanos)))
            }
            TAG_ARRAY | TAG_OBJECT => {
                if depth >= MAX_NESTING_DEPTH {
                    return Err(Error::corrupt("document nesting too deep"));
                }
                let count = self.length()?;
                if tag == TAG_ARRAY {
                    let mut items = Vec::with_capacity(count);
                    for _ in 0..count {
                        items.push(self.value(depth + 1)?);
                    }
                    Ok(Value::Array(items))
                } else {
                    let mut map = BTreeMap::new();
                    for _ in 0..count {
                        let key = self.string()?;
                        let value = self.value(depth + 1)?;
                        map.insert(key, value);
                    }
                    Ok(Value::Object(map))
                }
            }
            other => Err(Error::corrupt(format!("unknown value tag {:#04x} at byte {}", other, self.pos - 1))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::ErrorKind;
    use serde_json::json;

    #[test]
    fn keeps_int_float_distinction() {
        let doc = Document::try_from(json!({"_id": 1, "a": 3, "b": 3.0, "c": i64::MIN})).unwrap();
        let decoded = decode_document(&encode_document(&doc)).unwrap();
        assert_eq!(decoded.get_field("a"), Some(&Value::Int(3)));
        assert_eq!(decoded.get_field("b"), Some(&Value::Float(3.0)));
        assert_eq!(decoded, doc);
    }

    #[test]
    fn timestamps_keep_nanoseconds() {
        let ts = DateTime::<Utc>::from_timestamp(1_700_000_000, 123_456_789).unwrap();
        let mut doc = Document::new();
        doc.add_field("at", ts);
        let decoded = decode_document(&encode_document(&doc)).unwrap();
        assert_eq!(decoded.get_field("at"), Some(&Value::Timestamp(ts)));
    }

    #[test]
    fn rejects_malformed_input() {
        let doc = Document::try_from(json!({"name": "ada", "tags": ["x"]})).unwrap();
        let bytes = encode_document(&doc);

        let truncated = &bytes[..bytes.len() - 1];
        assert_eq!(decode_document(truncated).unwrap_err().kind, ErrorKind::CorruptData);

        let mut trailing = bytes.clone();
        trailing.push(0);
        assert_eq!(decode_document(&trailing).unwrap_err().kind, ErrorKind::CorruptData);

        let mut bad_tag = bytes.clone();
        let last_value_tag = bytes.len() - 3;
        bad_tag[last_value_tag] = 0x7f;
        assert!(decode_document(&bad_tag).is_err());
    }

    #[test]
    fn rejects_invalid_utf8() {
        let bytes = vec![DOCUMENT_FORMAT_VERSION, TAG_OBJECT, 1, 1, b'k', TAG_STRING, 2, 0xc3, 0x28];
        assert_eq!(decode_document(&bytes).unwrap_err().kind, ErrorKind::CorruptData);
    }

    #[test]
    fn rejects_excessive_nesting() {
        let mut bytes = vec![DOCUMENT_FORMAT_VERSION, TAG_OBJECT, 1, 1, b'k'];
        for _ in 0..200 {
            bytes.extend_from_slice(&[TAG_ARRAY, 1]);
        }
        bytes.push(TAG_NULL);
        assert!(decode_document(&bytes).is_err());
    }
}
