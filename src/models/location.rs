use serde::{Deserialize, Serialize};

/// A unique geographic coordinate pair identifying one temperature series.
///
/// Ids are dense and 0-based. Identity is the exact coordinate bit pattern;
/// two rows coalesce only if their floats compare bit-identical after the
/// external pipeline's type normalization.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub id: u32,
    pub latitude: f32,
    pub longitude: f32,
}

impl Location {
    pub fn new(id: u32, latitude: f32, longitude: f32) -> Self {
        Self {
            id,
            latitude,
            longitude,
        }
    }

    /// Grouping key for deduplication.
    pub fn coordinate_key(latitude: f32, longitude: f32) -> (u32, u32) {
        (latitude.to_bits(), longitude.to_bits())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_coordinate_key_is_bit_exact() {
        assert_eq!(
            Location::coordinate_key(1.0, 2.0),
            Location::coordinate_key(1.0, 2.0)
        );
        // -0.0 and 0.0 are distinct keys on purpose
        assert_ne!(
            Location::coordinate_key(0.0, 1.0),
            Location::coordinate_key(-0.0, 1.0)
        );
    }
}
