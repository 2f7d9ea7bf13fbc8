use crate::compression::delta::DeltaVector;
use crate::compression::quantize::QuantizedVector;
use crate::compression::vbyte::VByteEncoder;
use crate::core::error::{Error, Result};

const MODE_RAW: u8 = 0;
const MODE_DELTA: u8 = 1;
const MODE_QUANTIZED: u8 = 2;
const MODE_TEXT: u8 = 3;

/// Stored form of one vector: `mode u8 | dims u32 | body`
#[derive(Debug, Clone, PartialEq)]
pub enum VectorPayload {
    Raw(Vec<f32>),
    Delta(DeltaVector),
    Quantized(QuantizedVector),
    /// Source text of a lazily embedded vector
    Text(String),
}

impl VectorPayload {
    pub fn encode(&self, dims: usize) -> Vec<u8> {
        let mut out = Vec::with_capacity(5 + dims * 4);
        let mode = match self {
            VectorPayload::Raw(_) => MODE_RAW,
            VectorPayload::Delta(_) => MODE_DELTA,
            VectorPayload::Quantized(_) => MODE_QUANTIZED,
            VectorPayload::Text(_) => MODE_TEXT,
        };
        out.push(mode);
        out.extend_from_slice(&(dims as u32).to_le_bytes());

        match self {
            VectorPayload::Raw(values) => {
                for v in values {
                    out.extend_from_slice(&v.to_le_bytes());
                }
            }
            VectorPayload::Delta(delta) => {
                VByteEncoder::encode_u32(&mut out, delta.reference);
                out.extend_from_slice(&delta.step.to_le_bytes());
                out.extend_from_slice(&VByteEncoder::encode_i32_list(&delta.codes));
            }
            VectorPayload::Quantized(q) => q.write_to(&mut out),
            VectorPayload::Text(text) => {
                VByteEncoder::encode_u64(&mut out, text.len() as u64);
                out.extend_from_slice(text.as_bytes());
            }
        }
        out
    }

    pub fn decode(bytes: &[u8], expected_dims: usize) -> Result<Self> {
        if bytes.len() < 5 {
            return Err(Error::corrupt("vector payload too short"));
        }
        let mode = bytes[0];
        let dims = u32::from_le_bytes([bytes[1], bytes[2], bytes[3], bytes[4]]) as usize;
        if dims != expected_dims {
            return Err(Error::corrupt(format!(
                "vector payload has {} dimensions, collection has {}",
                dims, expected_dims
            )));
        }
        let body = &bytes[5..];

        let (payload, used) = match mode {
            MODE_RAW => {
                let need = dims * 4;
                if body.len() < need {
                    return Err(Error::corrupt("truncated raw vector"));
                }
                let values = body[..need]
                    .chunks_exact(4)
                    .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
                    .collect();
                (VectorPayload::Raw(values), need)
            }
            MODE_DELTA => {
                let (reference, mut pos) = VByteEncoder::decode_u32(body)?;
                let step_bytes = body
                    .get(pos..pos + 4)
                    .ok_or_else(|| Error::corrupt("truncated delta step"))?;
                let step = f32::from_le_bytes([step_bytes[0], step_bytes[1], step_bytes[2], step_bytes[3]]);
                pos += 4;
                let (codes, consumed) = VByteEncoder::decode_i32_list(&body[pos..], dims)?;
                (VectorPayload::Delta(DeltaVector { reference, step, codes }), pos + consumed)
            }
            MODE_QUANTIZED => {
                let need = 8 + dims;
                if body.len() < need {
                    return Err(Error::corrupt("truncated quantized vector"));
                }
                let min = f32::from_le_bytes([body[0], body[1], body[2], body[3]]);
                let scale = f32::from_le_bytes([body[4], body[5], body[6], body[7]]);
                let codes = body[8..need].to_vec();
                (VectorPayload::Quantized(QuantizedVector { min, scale, codes }), need)
            }
            MODE_TEXT => {
                let (len, pos) = VByteEncoder::decode_u64(body)?;
                let end = pos
                    .checked_add(len as usize)
                    .filter(|end| *end <= body.len())
                    .ok_or_else(|| Error::corrupt("truncated embedding text"))?;
                let text = String::from_utf8(body[pos..end].to_vec())
                    .map_err(|_| Error::corrupt("embedding text is not valid UTF-8"))?;
                (VectorPayload::Text(text), end)
            }
            other => return Err(Error::corrupt(format!("unknown vector payload mode {}", other))),
        };

        if used != body.len() {
            return Err(Error::corrupt("trailing bytes after vector payload"));
        }
        Ok(payload)
    }
}
