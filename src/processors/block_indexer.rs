use tracing::debug;

use crate::error::{CodecError, Result};
use crate::models::{RunBlock, TemperatureRecord};

/// Builds and expands the run-block index over a sorted record array.
pub struct BlockIndexer;

impl BlockIndexer {
    /// Partition records into maximal contiguous runs with a single linear
    /// scan. The input must already be sorted by `(location_id, month_index)`.
    ///
    /// A new block starts when the location changes or the months stop being
    /// consecutive; the two conditions are checked separately, so location
    /// count never bleeds into the month arithmetic.
    pub fn build(records: &[TemperatureRecord]) -> Vec<RunBlock> {
        let mut blocks: Vec<RunBlock> = Vec::new();

        let mut prev: Option<&TemperatureRecord> = None;
        for (i, record) in records.iter().enumerate() {
            let boundary = match prev {
                None => true,
                Some(p) => {
                    p.location_id != record.location_id
                        || record.month_index != p.month_index + 1
                }
            };
            if boundary {
                blocks.push(RunBlock::new(
                    blocks.len() as u32,
                    record.location_id,
                    record.month_index,
                    i as u32,
                ));
            }
            prev = Some(record);
        }

        debug!(
            records = records.len(),
            blocks = blocks.len(),
            "built run-block index"
        );
        blocks
    }

    /// Exclusive end of a block's temperature range: the next block's start,
    /// or the table size for the last block.
    pub fn temp_end_index(blocks: &[RunBlock], block_pos: usize, count_temperatures: u32) -> u32 {
        blocks
            .get(block_pos + 1)
            .map(|b| b.temp_start_index)
            .unwrap_or(count_temperatures)
    }

    /// Reverse mapping: `(location_id, month_index)` for every temperature
    /// index, in storage order. Verifies that the block ranges partition
    /// `[0, count_temperatures)` with no gaps or overlaps.
    pub fn expand(blocks: &[RunBlock], count_temperatures: u32) -> Result<Vec<(u32, u32)>> {
        let mut expanded = Vec::with_capacity(count_temperatures as usize);

        for (pos, block) in blocks.iter().enumerate() {
            let end = Self::temp_end_index(blocks, pos, count_temperatures);
            if block.temp_start_index as usize != expanded.len() || block.temp_start_index >= end {
                return Err(CodecError::InvalidFormat(format!(
                    "run block {} does not continue the partition at index {}",
                    block.id,
                    expanded.len()
                )));
            }
            for offset in 0..end - block.temp_start_index {
                expanded.push((block.location_id, block.first_month_index + offset));
            }
        }

        if expanded.len() != count_temperatures as usize {
            return Err(CodecError::InvalidFormat(format!(
                "run blocks cover {} of {} temperatures",
                expanded.len(),
                count_temperatures
            )));
        }
        Ok(expanded)
    }

    /// Binary-search the block covering temperature index `i`.
    pub fn block_for_index(blocks: &[RunBlock], i: u32) -> Option<&RunBlock> {
        let pos = blocks.partition_point(|b| b.temp_start_index <= i);
        if pos == 0 {
            None
        } else {
            Some(&blocks[pos - 1])
        }
    }

    /// Random-access variant of [`expand`](Self::expand) for one index.
    pub fn lookup(blocks: &[RunBlock], count_temperatures: u32, i: u32) -> Option<(u32, u32)> {
        if i >= count_temperatures {
            return None;
        }
        Self::block_for_index(blocks, i).map(|b| (b.location_id, b.month_index_at(i)))
    }
}
