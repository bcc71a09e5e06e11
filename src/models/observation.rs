use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::error::{CodecError, Result};

/// One cleaned input row, as delivered by the external ingestion pipeline.
///
/// Parsing, column cleaning and interpolation happen upstream; this type only
/// enforces the contract the codec relies on (finite values, valid ranges).
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct RawObservation {
    #[validate(range(min = -90.0, max = 90.0))]
    pub latitude: f32,

    #[validate(range(min = -180.0, max = 180.0))]
    pub longitude: f32,

    pub year: u16,

    #[validate(range(min = 1, max = 12))]
    pub month: u8,

    pub temperature: f32,

    pub uncertainty: Option<f32>,

    pub interpolated: bool,
}

impl RawObservation {
    pub fn new(latitude: f32, longitude: f32, year: u16, month: u8, temperature: f32) -> Self {
        Self {
            latitude,
            longitude,
            year,
            month,
            temperature,
            uncertainty: None,
            interpolated: false,
        }
    }

    pub fn with_uncertainty(mut self, uncertainty: f32) -> Self {
        self.uncertainty = Some(uncertainty);
        self
    }

    pub fn with_interpolated(mut self, interpolated: bool) -> Self {
        self.interpolated = interpolated;
        self
    }

    /// Check the cleaned-table contract beyond what the range validators
    /// cover: every numeric field must be finite.
    pub fn check_schema(&self) -> Result<()> {
        if !self.temperature.is_finite() {
            return Err(CodecError::Schema(format!(
                "non-finite temperature {} at ({}, {})",
                self.temperature, self.latitude, self.longitude
            )));
        }

        if !self.latitude.is_finite() || !self.longitude.is_finite() {
            return Err(CodecError::Schema(format!(
                "non-finite coordinates ({}, {})",
                self.latitude, self.longitude
            )));
        }

        if let Some(uncertainty) = self.uncertainty {
            if !uncertainty.is_finite() {
                return Err(CodecError::Schema(format!(
                    "non-finite uncertainty {} at ({}, {})",
                    uncertainty, self.latitude, self.longitude
                )));
            }
        }

        Ok(())
    }
}
