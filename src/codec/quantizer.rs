use crate::error::{CodecError, Result};
use crate::models::{TemperatureBounds, TemperatureWidth};

/// Linear min-max quantizer mapping temperatures in `[min, max]` onto
/// fixed-width unsigned codes.
///
/// Arithmetic runs in f64 so that the 4-byte code range stays exact.
#[derive(Debug, Clone, Copy)]
pub struct Quantizer {
    min: f64,
    span: f64,
    max_code: u32,
}

impl Quantizer {
    /// Fails when the domain is degenerate (`max <= min`): a single-valued
    /// dataset cannot be scaled and must be handled by the caller.
    pub fn new(bounds: TemperatureBounds, width: TemperatureWidth) -> Result<Self> {
        if !(bounds.max > bounds.min) {
            return Err(CodecError::InvalidBounds {
                min: bounds.min,
                max: bounds.max,
            });
        }
        Ok(Self {
            min: bounds.min as f64,
            span: bounds.max as f64 - bounds.min as f64,
            max_code: width.max_code(),
        })
    }

    pub fn max_code(&self) -> u32 {
        self.max_code
    }

    /// Code for a temperature. In-bounds values land in the code range by
    /// construction; the clamp only saturates out-of-domain input.
    pub fn encode(&self, value: f32) -> u32 {
        let scaled = (value as f64 - self.min) / self.span * self.max_code as f64;
        scaled.round().clamp(0.0, self.max_code as f64) as u32
    }

    /// Temperature represented by a code.
    pub fn decode(&self, code: u32) -> f32 {
        (code as f64 / self.max_code as f64 * self.span + self.min) as f32
    }

    /// Half of one quantization step: the worst-case absolute round-trip
    /// error for an in-bounds value.
    pub fn half_step(&self) -> f32 {
        (self.span / (2.0 * self.max_code as f64)) as f32
    }
}
