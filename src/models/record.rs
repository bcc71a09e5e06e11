use serde::{Deserialize, Serialize};

/// A fully normalized record: dense location id and month offset from the
/// dataset start. Immutable once the encode pass has produced it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TemperatureRecord {
    pub location_id: u32,
    pub month_index: u32,
    pub temperature: f32,
    pub uncertainty: f32,
    pub interpolated: bool,
}

impl TemperatureRecord {
    pub fn new(location_id: u32, month_index: u32, temperature: f32) -> Self {
        Self {
            location_id,
            month_index,
            temperature,
            uncertainty: 0.0,
            interpolated: false,
        }
    }

    /// The ordering every downstream pass relies on.
    pub fn sort_key(&self) -> (u32, u32) {
        (self.location_id, self.month_index)
    }
}
