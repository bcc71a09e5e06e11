use serde::{Deserialize, Serialize};

/// A maximal run of records for one location with strictly consecutive month
/// indices (a continuous-temperature-index-lookup-block).
///
/// The exclusive end of the run is not stored anywhere: it is the next
/// block's `temp_start_index`, or `count_temperatures` for the last block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunBlock {
    pub id: u32,
    pub location_id: u32,
    pub first_month_index: u32,
    pub temp_start_index: u32,
}

impl RunBlock {
    pub fn new(id: u32, location_id: u32, first_month_index: u32, temp_start_index: u32) -> Self {
        Self {
            id,
            location_id,
            first_month_index,
            temp_start_index,
        }
    }

    /// Month index covered by temperature index `i`, which must lie inside
    /// this block's range.
    pub fn month_index_at(&self, i: u32) -> u32 {
        self.first_month_index + (i - self.temp_start_index)
    }
}
