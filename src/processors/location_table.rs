use std::collections::HashMap;

use tracing::debug;

use crate::error::{CodecError, Result};
use crate::models::{Location, RawObservation, RunBlock};

/// Deduplicated coordinate table with dense, 0-based location ids.
#[derive(Debug, Clone, Default)]
pub struct LocationTable {
    locations: Vec<Location>,
}

impl LocationTable {
    /// Group observations by their exact coordinate bit pattern and assign
    /// dense ids in first-appearance order. Returns the table and one
    /// location id per input row.
    ///
    /// First-appearance order keeps re-encoding a decoded dataset stable:
    /// decoded rows arrive in id order, so they are assigned the same ids
    /// again.
    pub fn dedupe(observations: &[RawObservation]) -> (Self, Vec<u32>) {
        let mut index: HashMap<(u32, u32), u32> = HashMap::new();
        let mut locations: Vec<Location> = Vec::new();
        let mut row_ids = Vec::with_capacity(observations.len());

        for obs in observations {
            let key = Location::coordinate_key(obs.latitude, obs.longitude);
            let next_id = locations.len() as u32;
            let id = *index.entry(key).or_insert(next_id);
            if id == next_id {
                locations.push(Location::new(id, obs.latitude, obs.longitude));
            }
            row_ids.push(id);
        }

        debug!(
            rows = observations.len(),
            locations = locations.len(),
            "deduplicated coordinates"
        );
        (Self { locations }, row_ids)
    }

    pub fn len(&self) -> usize {
        self.locations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locations.is_empty()
    }

    pub fn get(&self, id: u32) -> Option<&Location> {
        self.locations.get(id as usize)
    }

    pub fn locations(&self) -> &[Location] {
        &self.locations
    }

    pub fn into_locations(self) -> Vec<Location> {
        self.locations
    }

    /// Per-location `id_ctilb_min`: the id of each location's first block in
    /// the ordered block array. The exclusive end of a location's range is
    /// the next location's entry, or the block count for the last location.
    ///
    /// Fails if any location owns no blocks, since empty ranges would break
    /// the partition of `[0, count_ctilb)`.
    pub fn first_block_ids(location_count: usize, blocks: &[RunBlock]) -> Result<Vec<u32>> {
        let mut firsts = Vec::with_capacity(location_count);
        let mut expected: u32 = 0;

        for block in blocks {
            if block.location_id == expected {
                firsts.push(block.id);
                expected += 1;
            } else if block.location_id > expected {
                return Err(CodecError::InvalidFormat(format!(
                    "location {expected} owns no run blocks"
                )));
            }
        }

        if firsts.len() != location_count {
            return Err(CodecError::InvalidFormat(format!(
                "{} of {} locations own run blocks",
                firsts.len(),
                location_count
            )));
        }
        Ok(firsts)
    }

    /// Decode-side inverse of [`first_block_ids`](Self::first_block_ids):
    /// stamp every block with its owning location, given each location's
    /// first block id. Verifies that the ranges are non-empty, in order and
    /// cover the whole block array.
    pub fn assign_block_locations(firsts: &[u32], blocks: &mut [RunBlock]) -> Result<()> {
        if firsts.is_empty() {
            return if blocks.is_empty() {
                Ok(())
            } else {
                Err(CodecError::InvalidFormat(
                    "blocks present but no locations to own them".into(),
                ))
            };
        }

        if firsts[0] != 0 {
            return Err(CodecError::InvalidFormat(format!(
                "first location range starts at block {}, not 0",
                firsts[0]
            )));
        }

        for (id, &first) in firsts.iter().enumerate() {
            let end = firsts
                .get(id + 1)
                .copied()
                .unwrap_or(blocks.len() as u32);
            if first >= end || end as usize > blocks.len() {
                return Err(CodecError::InvalidFormat(format!(
                    "location {id} owns invalid block range [{first}, {end})"
                )));
            }
            for block in &mut blocks[first as usize..end as usize] {
                block.location_id = id as u32;
            }
        }
        Ok(())
    }
}
