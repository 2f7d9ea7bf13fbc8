use serde::{Deserialize, Serialize};
use crate::vector::distance::euclidean_sq;

/// Number of vectors promoted to references before residual coding starts
pub const REFERENCE_COUNT: usize = 16;

/// Largest residual code magnitude
pub const RESIDUAL_LEVELS: i32 = 2047;

/// Vector stored as a residual against a reference vector. Each component
/// is `reference[i] + codes[i] * step`, with error at most `step / 2`,
/// i.e. `max|residual| / 4094`.
#[derive(Debug, Clone, PartialEq)]
pub struct DeltaVector {
    pub reference: u32,
    pub step: f32,
    pub codes: Vec<i32>,
}

/// Reference vectors of one delta-compressed collection
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeltaCodebook {
    pub references: Vec<Vec<f32>>,
}

impl DeltaCodebook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_full(&self) -> bool {
        self.references.len() >= REFERENCE_COUNT
    }

    /// Encodes `vector`, promoting it to a reference while the codebook is
    /// still filling up. References encode with a zero residual.
    pub fn encode(&mut self, vector: &[f32]) -> DeltaVector {
        if !self.is_full() {
            self.references.push(vector.to_vec());
            return DeltaVector {
                reference: (self.references.len() - 1) as u32,
                step: 0.0,
                codes: vec![0; vector.len()],
            };
        }

        let (reference, base) = self
            .references
            .iter()
            .enumerate()
            .map(|(i, r)| (i, euclidean_sq(r, vector)))
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(i, _)| (i, &self.references[i]))
            .unwrap_or((0, &self.references[0]));

        let max_residual = vector
            .iter()
            .zip(base)
            .map(|(v, r)| (v - r).abs())
            .fold(0.0f32, f32::max);
        let step = if max_residual > 0.0 { max_residual / RESIDUAL_LEVELS as f32 } else { 0.0 };
        let codes = vector
            .iter()
            .zip(base)
            .map(|(v, r)| {
                if step == 0.0 {
                    0
                } else {
                    (((v - r) / step).round() as i32).clamp(-RESIDUAL_LEVELS, RESIDUAL_LEVELS)
                }
            })
            .collect();

        DeltaVector { reference: reference as u32, step, codes }
    }

    pub fn decode(&self, delta: &DeltaVector) -> Option<Vec<f32>> {
        let base = self.references.get(delta.reference as usize)?;
        if base.len() != delta.codes.len() {
            return None;
        }
        Some(
            base.iter()
                .zip(&delta.codes)
                .map(|(r, c)| r + *c as f32 * delta.step)
                .collect(),
        )
    }
}
