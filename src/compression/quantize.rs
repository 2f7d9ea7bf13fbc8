use serde::{Deserialize, Serialize};

/// Scalar-quantized vector: each component mapped linearly onto 0..=255.
/// Reconstruction error per component is at most `scale / 2`, i.e.
/// `(max - min) / 510`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuantizedVector {
    pub min: f32,
    pub scale: f32,
    pub codes: Vec<u8>,
}

impl QuantizedVector {
    pub fn quantize(vector: &[f32]) -> Self {
        let min = vector.iter().copied().fold(f32::INFINITY, f32::min);
        let max = vector.iter().copied().fold(f32::NEG_INFINITY, f32::max);
        if vector.is_empty() || !(max > min) {
            return QuantizedVector {
                min: if vector.is_empty() { 0.0 } else { min },
                scale: 0.0,
                codes: vec![0u8; vector.len()],
            };
        }

        let scale = (max - min) / 255.0;
        let codes = vector
            .iter()
            .map(|v| ((v - min) / scale).round().clamp(0.0, 255.0) as u8)
            .collect();
        QuantizedVector { min, scale, codes }
    }

    pub fn dequantize(&self) -> Vec<f32> {
        self.codes.iter().map(|c| self.min + *c as f32 * self.scale).collect()
    }

    pub fn encoded_len(&self) -> usize {
        8 + self.codes.len()
    }

    /// `min f32 | scale f32 | u8 * dims`
    pub fn write_to(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.min.to_le_bytes());
        out.extend_from_slice(&self.scale.to_le_bytes());
        out.extend_from_slice(&self.codes);
    }
}
