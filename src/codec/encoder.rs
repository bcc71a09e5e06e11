use serde::Serialize;
use tracing::{debug, info};
use validator::Validate;

use crate::codec::quantizer::Quantizer;
use crate::codec::stream::ByteWriter;
use crate::compression;
use crate::error::{CodecError, Result};
use crate::models::{
    CompressionMethod, DatasetBounds, DatasetManifest, FormatVersion, Header, Location,
    RawObservation, TemperatureRecord, TemperatureWidth,
};
use crate::processors::aggregator::Aggregator;
use crate::processors::block_indexer::BlockIndexer;
use crate::processors::location_table::LocationTable;

/// Encode-time parameters. Width and compression are caller decisions;
/// everything else in the header is derived from the data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EncoderConfig {
    pub version: FormatVersion,
    pub temperature_width: TemperatureWidth,
    pub compression: CompressionMethod,
}

impl Default for EncoderConfig {
    fn default() -> Self {
        Self {
            version: FormatVersion::V4,
            temperature_width: TemperatureWidth::Two,
            compression: CompressionMethod::Deflate,
        }
    }
}

/// Fully normalized, sorted dataset ready for serialization: deduplicated
/// locations, one record per (location, month), ordered by the codec's sort
/// key.
#[derive(Debug, Clone)]
pub struct PreparedDataset {
    pub locations: Vec<Location>,
    pub records: Vec<TemperatureRecord>,
    pub bounds: DatasetBounds,
}

impl PreparedDataset {
    /// Run the normalization pipeline: schema checks, coordinate dedup,
    /// per-month aggregation, bounds scan, month-index assignment.
    pub fn from_observations(observations: &[RawObservation]) -> Result<Self> {
        if observations.is_empty() {
            return Err(CodecError::Schema("input table is empty".into()));
        }
        for obs in observations {
            obs.validate()?;
            obs.check_schema()?;
        }

        let (table, row_ids) = LocationTable::dedupe(observations);
        let monthly = Aggregator::merge(observations, &row_ids);
        let bounds =
            DatasetBounds::from_series(monthly.iter().map(|v| (v.year, v.month, v.temperature)))?;

        // The aggregator emits (location, year, month) order, which is
        // exactly (location, month_index) order
        let records = monthly
            .iter()
            .map(|v| TemperatureRecord {
                location_id: v.location_id,
                month_index: bounds.dates.month_index(v.year, v.month),
                temperature: v.temperature,
                uncertainty: v.uncertainty,
                interpolated: v.interpolated,
            })
            .collect();

        Ok(Self {
            locations: table.into_locations(),
            records,
            bounds,
        })
    }
}

/// Discretization diagnostics gathered during the encode pass. These mirror
/// the statistics the upstream pipeline prints when deciding whether a given
/// width is acceptable; they are not part of the byte contract.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct EncodeReport {
    pub count_temperatures: u32,
    pub count_locations: u32,
    pub count_ctilb: u32,
    /// Header plus uncompressed body.
    pub size_bytes: u64,
    /// Header plus body as written.
    pub compressed_size_bytes: u64,
    pub max_abs_error: f32,
    pub mean_abs_error: f32,
    /// Largest discretization error in excess of the per-record measurement
    /// uncertainty, floored at zero.
    pub max_error_beyond_uncertainty: f32,
}

/// An encoded stream together with its header and report.
#[derive(Debug, Clone)]
pub struct EncodedDataset {
    pub header: Header,
    pub bytes: Vec<u8>,
    pub report: EncodeReport,
}

impl EncodedDataset {
    /// Catalog entry for this file, viewer-side metadata.
    pub fn manifest(&self, name: &str, filename: &str) -> DatasetManifest {
        DatasetManifest {
            name: name.to_string(),
            filename: filename.to_string(),
            discretization: self.header.temperature_width.label(),
            size_bytes: self.report.size_bytes,
            compressed_size_bytes: self.report.compressed_size_bytes,
            count_temperatures: self.header.count_temperatures,
            count_locations: self.header.count_locations,
            count_ctilb: self.header.count_ctilb,
        }
    }
}

#[derive(Debug, Default)]
struct ErrorStats {
    max_abs: f64,
    sum_abs: f64,
    max_beyond_uncertainty: f64,
    count: u64,
}

impl ErrorStats {
    fn observe(&mut self, record: &TemperatureRecord, decoded: f32) {
        let error = (decoded as f64 - record.temperature as f64).abs();
        self.max_abs = self.max_abs.max(error);
        self.sum_abs += error;
        self.max_beyond_uncertainty = self
            .max_beyond_uncertainty
            .max((error - record.uncertainty as f64).max(0.0));
        self.count += 1;
    }

    fn mean_abs(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.sum_abs / self.count as f64
        }
    }
}

/// Serializes a prepared dataset into the on-disk layout.
#[derive(Debug, Clone, Copy, Default)]
pub struct Encoder {
    config: EncoderConfig,
}

impl Encoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: EncoderConfig) -> Self {
        Self { config }
    }

    pub fn with_version(mut self, version: FormatVersion) -> Self {
        self.config.version = version;
        self
    }

    pub fn with_temperature_width(mut self, width: TemperatureWidth) -> Self {
        self.config.temperature_width = width;
        self
    }

    pub fn with_compression(mut self, compression: CompressionMethod) -> Self {
        self.config.compression = compression;
        self
    }

    /// Run the full encode pipeline over cleaned observations.
    pub fn encode(&self, observations: &[RawObservation]) -> Result<EncodedDataset> {
        let prepared = PreparedDataset::from_observations(observations)?;
        self.encode_prepared(&prepared)
    }

    /// Encode an already-normalized dataset.
    pub fn encode_prepared(&self, prepared: &PreparedDataset) -> Result<EncodedDataset> {
        let (header, body, stats) = self.assemble(prepared)?;
        let raw_body_len = body.len();
        let compressed = compression::adapter_for(header.compression).compress(&body)?;
        Ok(Self::finish(header, raw_body_len, compressed, stats))
    }

    /// Like [`encode`](Self::encode), but with the compression pass handed
    /// off to a blocking worker. The body buffer is moved into the task and
    /// the final stream is only assembled once the pass succeeds.
    pub async fn encode_async(&self, observations: &[RawObservation]) -> Result<EncodedDataset> {
        let prepared = PreparedDataset::from_observations(observations)?;
        let (header, body, stats) = self.assemble(&prepared)?;
        let raw_body_len = body.len();
        let compressed = compression::compress_detached(header.compression, body).await?;
        Ok(Self::finish(header, raw_body_len, compressed, stats))
    }

    /// Quantize, index and serialize into the uncompressed body, then check
    /// the assembled length against the header-derived expectation.
    fn assemble(&self, prepared: &PreparedDataset) -> Result<(Header, Vec<u8>, ErrorStats)> {
        if self.config.version == FormatVersion::V3
            && self.config.compression != CompressionMethod::None
        {
            return Err(CodecError::Config(
                "the version-3 layout has no compression method field; \
                 legacy files are compressed as a whole by an external pass"
                    .into(),
            ));
        }

        let quantizer = Quantizer::new(prepared.bounds.temperatures, self.config.temperature_width)?;
        let blocks = BlockIndexer::build(&prepared.records);
        let first_block_ids = LocationTable::first_block_ids(prepared.locations.len(), &blocks)?;

        let header = Header {
            version: self.config.version,
            count_temperatures: prepared.records.len() as u32,
            count_locations: prepared.locations.len() as u32,
            count_ctilb: blocks.len() as u32,
            dates: prepared.bounds.dates,
            temperatures: prepared.bounds.temperatures,
            temperature_width: self.config.temperature_width,
            compression: self.config.compression,
        };

        let mut stats = ErrorStats::default();
        let mut body = ByteWriter::with_capacity(header.expected_body_len());

        let width = header.temperature_width.as_u8();
        for record in &prepared.records {
            let code = quantizer.encode(record.temperature);
            stats.observe(record, quantizer.decode(code));
            body.put_uint(code, width);
        }

        match header.version {
            FormatVersion::V4 => {
                for block in &blocks {
                    body.put_u32(block.first_month_index);
                    body.put_u32(block.temp_start_index);
                }
                for (location, &first) in prepared.locations.iter().zip(&first_block_ids) {
                    body.put_f32(location.latitude);
                    body.put_f32(location.longitude);
                    body.put_u32(first);
                }
            }
            FormatVersion::V3 => {
                let widths = header.legacy_widths();
                for (pos, block) in blocks.iter().enumerate() {
                    let end =
                        BlockIndexer::temp_end_index(&blocks, pos, header.count_temperatures);
                    body.put_uint(block.first_month_index, widths.month_difference);
                    body.put_uint(block.temp_start_index, widths.temperature_index);
                    body.put_uint(end - 1, widths.temperature_index);
                }
                for (location, &first) in prepared.locations.iter().zip(&first_block_ids) {
                    let end = first_block_ids
                        .get(location.id as usize + 1)
                        .copied()
                        .unwrap_or(header.count_ctilb);
                    body.put_f32(location.latitude);
                    body.put_f32(location.longitude);
                    body.put_uint(first, widths.ctilb_index);
                    body.put_uint(end - 1, widths.ctilb_index);
                }
            }
        }

        let body = body.into_bytes();
        if body.len() != header.expected_body_len() {
            return Err(CodecError::SizeMismatch {
                expected: header.expected_body_len(),
                actual: body.len(),
            });
        }

        debug!(
            version = header.version.as_u8(),
            temperatures = header.count_temperatures,
            locations = header.count_locations,
            blocks = header.count_ctilb,
            body = body.len(),
            "assembled body"
        );
        Ok((header, body, stats))
    }

    fn finish(
        header: Header,
        raw_body_len: usize,
        compressed: Vec<u8>,
        stats: ErrorStats,
    ) -> EncodedDataset {
        let mut out = ByteWriter::with_capacity(header.header_len() + compressed.len());
        header.write_to(&mut out);
        out.put_bytes(&compressed);
        let bytes = out.into_bytes();

        let report = EncodeReport {
            count_temperatures: header.count_temperatures,
            count_locations: header.count_locations,
            count_ctilb: header.count_ctilb,
            size_bytes: (header.header_len() + raw_body_len) as u64,
            compressed_size_bytes: bytes.len() as u64,
            max_abs_error: stats.max_abs as f32,
            mean_abs_error: stats.mean_abs() as f32,
            max_error_beyond_uncertainty: stats.max_beyond_uncertainty as f32,
        };

        info!(
            temperatures = report.count_temperatures,
            locations = report.count_locations,
            blocks = report.count_ctilb,
            raw = report.size_bytes,
            written = report.compressed_size_bytes,
            max_error = report.max_abs_error,
            "encoded dataset"
        );
        EncodedDataset {
            header,
            bytes,
            report,
        }
    }
}
