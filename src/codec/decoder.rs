use tracing::{debug, info};

use crate::codec::quantizer::Quantizer;
use crate::codec::stream::ByteReader;
use crate::compression;
use crate::error::{CodecError, Result};
use crate::models::{
    FormatVersion, Header, Location, RawObservation, RunBlock, TemperatureRecord,
};
use crate::processors::block_indexer::BlockIndexer;
use crate::processors::location_table::LocationTable;

/// Parses encoded streams back into queryable datasets.
pub struct Decoder;

/// In-memory form of a decoded stream. Temperatures are dequantized up
/// front; full records are reconstructed on demand from the block index and
/// the location ranges.
#[derive(Debug, Clone)]
pub struct DecodedDataset {
    pub header: Header,
    pub temperatures: Vec<f32>,
    pub blocks: Vec<RunBlock>,
    pub locations: Vec<Location>,
    first_block_ids: Vec<u32>,
}

impl Decoder {
    /// Verify the framing, decompress the body and split it into the three
    /// arrays. Fails without returning a partial parse.
    pub fn decode(data: &[u8]) -> Result<DecodedDataset> {
        let mut reader = ByteReader::new(data);
        let header = Header::read_from(&mut reader)?;

        let body = compression::adapter_for(header.compression).decompress(reader.rest())?;
        if body.len() != header.expected_body_len() {
            return Err(CodecError::SizeMismatch {
                expected: header.expected_body_len(),
                actual: body.len(),
            });
        }

        let dataset = match header.version {
            FormatVersion::V4 => Self::read_body_v4(header, &body)?,
            FormatVersion::V3 => Self::read_body_v3(header, &body)?,
        };
        Self::verify_blocks(&dataset.header, &dataset.blocks)?;

        info!(
            version = header.version.as_u8(),
            temperatures = header.count_temperatures,
            locations = header.count_locations,
            blocks = header.count_ctilb,
            "decoded dataset"
        );
        Ok(dataset)
    }

    fn read_temperatures(header: &Header, reader: &mut ByteReader<'_>) -> Result<Vec<f32>> {
        let quantizer = Quantizer::new(header.temperatures, header.temperature_width)?;
        let width = header.temperature_width.as_u8();
        let mut temperatures = Vec::with_capacity(header.count_temperatures as usize);
        for _ in 0..header.count_temperatures {
            temperatures.push(quantizer.decode(reader.read_uint(width)?));
        }
        Ok(temperatures)
    }

    fn read_body_v4(header: Header, body: &[u8]) -> Result<DecodedDataset> {
        let mut reader = ByteReader::new(body);
        let temperatures = Self::read_temperatures(&header, &mut reader)?;

        let mut blocks = Vec::with_capacity(header.count_ctilb as usize);
        for id in 0..header.count_ctilb {
            let first_month_index = reader.read_u32()?;
            let temp_start_index = reader.read_u32()?;
            blocks.push(RunBlock::new(id, 0, first_month_index, temp_start_index));
        }

        let mut locations = Vec::with_capacity(header.count_locations as usize);
        let mut first_block_ids = Vec::with_capacity(header.count_locations as usize);
        for id in 0..header.count_locations {
            let latitude = reader.read_f32()?;
            let longitude = reader.read_f32()?;
            first_block_ids.push(reader.read_u32()?);
            locations.push(Location::new(id, latitude, longitude));
        }

        LocationTable::assign_block_locations(&first_block_ids, &mut blocks)?;
        Ok(DecodedDataset {
            header,
            temperatures,
            blocks,
            locations,
            first_block_ids,
        })
    }

    /// Legacy layout: variable index widths and explicit inclusive ends per
    /// block and per location. The ends are redundant with the following
    /// entry's start, so they are read and cross-checked, not stored.
    fn read_body_v3(header: Header, body: &[u8]) -> Result<DecodedDataset> {
        let widths = header.legacy_widths();
        let mut reader = ByteReader::new(body);
        let temperatures = Self::read_temperatures(&header, &mut reader)?;

        let mut blocks = Vec::with_capacity(header.count_ctilb as usize);
        let mut block_ends = Vec::with_capacity(header.count_ctilb as usize);
        for id in 0..header.count_ctilb {
            let first_month_index = reader.read_uint(widths.month_difference)?;
            let temp_start_index = reader.read_uint(widths.temperature_index)?;
            block_ends.push(reader.read_uint(widths.temperature_index)?);
            blocks.push(RunBlock::new(id, 0, first_month_index, temp_start_index));
        }
        for (pos, &end_inclusive) in block_ends.iter().enumerate() {
            let derived = BlockIndexer::temp_end_index(&blocks, pos, header.count_temperatures);
            if end_inclusive as u64 + 1 != derived as u64 {
                return Err(CodecError::InvalidFormat(format!(
                    "legacy block {pos} has inclusive end {end_inclusive}, \
                     but the partition expects exclusive end {derived}"
                )));
            }
        }

        let mut locations = Vec::with_capacity(header.count_locations as usize);
        let mut first_block_ids = Vec::with_capacity(header.count_locations as usize);
        let mut location_ends = Vec::with_capacity(header.count_locations as usize);
        for id in 0..header.count_locations {
            let latitude = reader.read_f32()?;
            let longitude = reader.read_f32()?;
            first_block_ids.push(reader.read_uint(widths.ctilb_index)?);
            location_ends.push(reader.read_uint(widths.ctilb_index)?);
            locations.push(Location::new(id, latitude, longitude));
        }
        for (id, &end_inclusive) in location_ends.iter().enumerate() {
            let derived = first_block_ids
                .get(id + 1)
                .copied()
                .unwrap_or(header.count_ctilb);
            if end_inclusive as u64 + 1 != derived as u64 {
                return Err(CodecError::InvalidFormat(format!(
                    "legacy location {id} has inclusive end {end_inclusive}, \
                     but the partition expects exclusive end {derived}"
                )));
            }
        }

        LocationTable::assign_block_locations(&first_block_ids, &mut blocks)?;
        Ok(DecodedDataset {
            header,
            temperatures,
            blocks,
            locations,
            first_block_ids,
        })
    }

    /// Structural invariants of the block array: start indices strictly
    /// increasing from 0, every block non-empty, and a month gap of at least
    /// two between consecutive blocks of one location (anything closer would
    /// have merged into a single run).
    fn verify_blocks(header: &Header, blocks: &[RunBlock]) -> Result<()> {
        if blocks.is_empty() {
            return if header.count_temperatures == 0 {
                Ok(())
            } else {
                Err(CodecError::InvalidFormat(
                    "temperatures present but no run blocks".into(),
                ))
            };
        }

        if blocks[0].temp_start_index != 0 {
            return Err(CodecError::InvalidFormat(format!(
                "first run block starts at {}, not 0",
                blocks[0].temp_start_index
            )));
        }
        if blocks[blocks.len() - 1].temp_start_index >= header.count_temperatures {
            return Err(CodecError::InvalidFormat(
                "last run block starts past the temperature array".into(),
            ));
        }

        for pair in blocks.windows(2) {
            let (a, b) = (&pair[0], &pair[1]);
            if b.temp_start_index <= a.temp_start_index {
                return Err(CodecError::InvalidFormat(format!(
                    "run block {} does not advance the partition",
                    b.id
                )));
            }
            if a.location_id == b.location_id {
                let run_len = (b.temp_start_index - a.temp_start_index) as u64;
                if (b.first_month_index as u64) < a.first_month_index as u64 + run_len + 1 {
                    return Err(CodecError::InvalidFormat(format!(
                        "run blocks {} and {} are not separated by a month gap",
                        a.id, b.id
                    )));
                }
            }
        }

        debug!(blocks = blocks.len(), "verified block partition");
        Ok(())
    }
}

impl DecodedDataset {
    pub fn len(&self) -> usize {
        self.temperatures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.temperatures.is_empty()
    }

    /// Random access: reconstruct the record at temperature index `i`.
    pub fn record(&self, i: u32) -> Option<TemperatureRecord> {
        let (location_id, month_index) =
            BlockIndexer::lookup(&self.blocks, self.header.count_temperatures, i)?;
        Some(TemperatureRecord::new(
            location_id,
            month_index,
            self.temperatures[i as usize],
        ))
    }

    /// All records in storage order.
    pub fn records(&self) -> Result<Vec<TemperatureRecord>> {
        let expanded = BlockIndexer::expand(&self.blocks, self.header.count_temperatures)?;
        Ok(expanded
            .into_iter()
            .zip(&self.temperatures)
            .map(|((location_id, month_index), &temperature)| {
                TemperatureRecord::new(location_id, month_index, temperature)
            })
            .collect())
    }

    /// The contiguous slice of blocks owned by one location.
    pub fn location_blocks(&self, location_id: u32) -> Option<&[RunBlock]> {
        let start = *self.first_block_ids.get(location_id as usize)? as usize;
        let end = self
            .first_block_ids
            .get(location_id as usize + 1)
            .map(|&id| id as usize)
            .unwrap_or(self.blocks.len());
        Some(&self.blocks[start..end])
    }

    /// The (year, month, temperature) series of one location, in time order.
    pub fn location_series(&self, location_id: u32) -> Option<Vec<(u16, u8, f32)>> {
        let blocks = self.location_blocks(location_id)?;
        let mut series = Vec::new();
        for block in blocks {
            let end = BlockIndexer::temp_end_index(
                &self.blocks,
                block.id as usize,
                self.header.count_temperatures,
            );
            for i in block.temp_start_index..end {
                let (year, month) = self.header.dates.year_month(block.month_index_at(i));
                series.push((year, month, self.temperatures[i as usize]));
            }
        }
        Some(series)
    }

    /// Reconstruct observation rows, e.g. to re-encode at another width.
    /// Uncertainty and the interpolation flag are not stored in the binary
    /// layout, so they come back as absent.
    pub fn to_observations(&self) -> Result<Vec<RawObservation>> {
        let records = self.records()?;
        records
            .into_iter()
            .map(|record| {
                let location = self
                    .locations
                    .get(record.location_id as usize)
                    .ok_or_else(|| {
                        CodecError::InvalidFormat(format!(
                            "record references unknown location {}",
                            record.location_id
                        ))
                    })?;
                let (year, month) = self.header.dates.year_month(record.month_index);
                Ok(RawObservation::new(
                    location.latitude,
                    location.longitude,
                    year,
                    month,
                    record.temperature,
                ))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::codec::encoder::Encoder;
    use crate::models::CompressionMethod;

    fn sample_observations() -> Vec<RawObservation> {
        vec![
            RawObservation::new(1.0, 2.0, 1990, 1, 10.0),
            RawObservation::new(1.0, 2.0, 1990, 2, 12.0),
            RawObservation::new(1.0, 2.0, 1990, 6, 9.0),
            RawObservation::new(-33.9, 18.4, 1990, 1, 22.0),
        ]
    }

    #[test]
    fn test_bad_magic_on_foreign_buffer() {
        let result = Decoder::decode(b"PNG\x04");
        assert!(matches!(result, Err(CodecError::BadMagic(_))));
    }

    #[test]
    fn test_truncated_body_is_a_size_mismatch() {
        let encoded = Encoder::new()
            .with_compression(CompressionMethod::None)
            .encode(&sample_observations())
            .unwrap();
        let truncated = &encoded.bytes[..encoded.bytes.len() - 3];
        let result = Decoder::decode(truncated);
        assert!(matches!(result, Err(CodecError::SizeMismatch { .. })));
    }

    #[test]
    fn test_round_trip_reconstructs_structure() {
        let encoded = Encoder::new()
            .with_compression(CompressionMethod::None)
            .encode(&sample_observations())
            .unwrap();
        let decoded = Decoder::decode(&encoded.bytes).unwrap();

        assert_eq!(decoded.len(), 4);
        assert_eq!(decoded.locations.len(), 2);
        // Dedup order is first appearance: (1.0, 2.0) then (-33.9, 18.4)
        assert_eq!(decoded.locations[0].latitude, 1.0);
        assert_eq!(decoded.locations[1].longitude, 18.4);

        let records = decoded.records().unwrap();
        let structure: Vec<(u32, u32)> = records
            .iter()
            .map(|r| (r.location_id, r.month_index))
            .collect();
        assert_eq!(structure, vec![(0, 0), (0, 1), (0, 5), (1, 0)]);
    }

    #[test]
    fn test_random_access_matches_records() {
        let encoded = Encoder::new().encode(&sample_observations()).unwrap();
        let decoded = Decoder::decode(&encoded.bytes).unwrap();
        let records = decoded.records().unwrap();
        for (i, expected) in records.iter().enumerate() {
            assert_eq!(decoded.record(i as u32).unwrap(), *expected);
        }
        assert_eq!(decoded.record(records.len() as u32), None);
    }

    #[test]
    fn test_location_series_uses_calendar_dates() {
        let encoded = Encoder::new().encode(&sample_observations()).unwrap();
        let decoded = Decoder::decode(&encoded.bytes).unwrap();
        let series = decoded.location_series(0).unwrap();
        let dates: Vec<(u16, u8)> = series.iter().map(|&(y, m, _)| (y, m)).collect();
        assert_eq!(dates, vec![(1990, 1), (1990, 2), (1990, 6)]);
    }
}
