use tempfile::TempDir;

use cce_codec::models::{CompressionMethod, FormatVersion, RawObservation, TemperatureWidth};
use cce_codec::processors::BlockIndexer;
use cce_codec::readers::DatasetReader;
use cce_codec::utils::dataset_filename;
use cce_codec::writers::DatasetWriter;
use cce_codec::{CodecError, Decoder, Encoder};

fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

/// Three locations with different time shapes: a long contiguous run plus a
/// short one, a single isolated month, and a series of isolated months.
/// One month appears twice to exercise aggregation.
fn synthetic_observations() -> Vec<RawObservation> {
    let mut observations = Vec::new();

    // Location A: 1950-01 .. 1950-12 contiguous, then 1951-03 .. 1951-05
    for month in 1..=12u8 {
        observations.push(RawObservation::new(
            51.5,
            -0.13,
            1950,
            month,
            5.0 + month as f32,
        ));
    }
    for month in 3..=5u8 {
        observations.push(RawObservation::new(
            51.5,
            -0.13,
            1951,
            month,
            6.5 + month as f32,
        ));
    }

    // Location B: a single record
    observations.push(RawObservation::new(48.1, 11.6, 1950, 6, 21.0).with_uncertainty(0.4));

    // Location C: isolated months, every other one
    for (i, month) in [1u8, 3, 5].iter().enumerate() {
        observations.push(RawObservation::new(
            -33.9,
            18.4,
            1950,
            *month,
            -8.0 + i as f32,
        ));
    }

    // Duplicate row for location A, 1950-04: averages with the original
    observations.push(RawObservation::new(51.5, -0.13, 1950, 4, 11.0));

    observations
}

fn half_step(min: f32, max: f32, width: TemperatureWidth) -> f32 {
    let max_code = match width {
        TemperatureWidth::One => 255.0,
        TemperatureWidth::Two => 65_535.0,
        TemperatureWidth::Four => u32::MAX as f64,
    };
    ((max as f64 - min as f64) / (2.0 * max_code)) as f32
}

#[test]
fn test_round_trip_uncompressed() {
    init_tracing();
    let observations = synthetic_observations();
    let encoded = Encoder::new()
        .with_compression(CompressionMethod::None)
        .encode(&observations)
        .unwrap();
    let decoded = Decoder::decode(&encoded.bytes).unwrap();

    // 15 + 1 + 3 distinct months; the duplicate row merges away
    assert_eq!(decoded.len(), 19);
    assert_eq!(decoded.locations.len(), 3);
    // A: 2 runs, B: 1, C: 3 isolated months
    assert_eq!(decoded.blocks.len(), 6);

    // Coordinates and month structure reproduce exactly
    assert_eq!(decoded.locations[0].latitude, 51.5);
    assert_eq!(decoded.locations[0].longitude, -0.13);
    assert_eq!(decoded.locations[2].latitude, -33.9);

    let series = decoded.location_series(0).unwrap();
    assert_eq!(series.len(), 15);
    assert_eq!(series[0].0, 1950);
    assert_eq!(series[0].1, 1);
    assert_eq!(series[12].0, 1951);
    assert_eq!(series[12].1, 3);

    // Temperatures reproduce within half a quantization step
    let bounds = encoded.header.temperatures;
    let tolerance = half_step(bounds.min, bounds.max, TemperatureWidth::Two) * 1.01;
    assert!((series[0].2 - 6.0).abs() <= tolerance);
    let b_series = decoded.location_series(1).unwrap();
    assert_eq!(b_series, vec![(1950, 6, b_series[0].2)]);
    assert!((b_series[0].2 - 21.0).abs() <= tolerance);
}

#[test]
fn test_round_trip_deflate() {
    let observations = synthetic_observations();
    let plain = Encoder::new()
        .with_compression(CompressionMethod::None)
        .encode(&observations)
        .unwrap();
    let deflated = Encoder::new()
        .with_compression(CompressionMethod::Deflate)
        .encode(&observations)
        .unwrap();

    let from_plain = Decoder::decode(&plain.bytes).unwrap();
    let from_deflated = Decoder::decode(&deflated.bytes).unwrap();

    assert_eq!(from_plain.temperatures, from_deflated.temperatures);
    assert_eq!(from_plain.blocks, from_deflated.blocks);
    assert_eq!(from_plain.locations, from_deflated.locations);
}

#[test]
fn test_legacy_layout_round_trip() {
    let observations = synthetic_observations();
    let current = Encoder::new()
        .with_compression(CompressionMethod::None)
        .encode(&observations)
        .unwrap();
    let legacy = Encoder::new()
        .with_version(FormatVersion::V3)
        .with_compression(CompressionMethod::None)
        .encode(&observations)
        .unwrap();

    assert_ne!(current.bytes, legacy.bytes);

    let decoded = Decoder::decode(&legacy.bytes).unwrap();
    assert_eq!(decoded.header.version, FormatVersion::V3);
    assert_eq!(
        decoded.records().unwrap(),
        Decoder::decode(&current.bytes).unwrap().records().unwrap()
    );
}

#[test]
fn test_re_encoding_decoded_data_is_byte_identical() {
    for method in [CompressionMethod::None, CompressionMethod::Deflate] {
        let encoder = Encoder::new()
            .with_temperature_width(TemperatureWidth::Two)
            .with_compression(method);
        let first = encoder.encode(&synthetic_observations()).unwrap();

        let decoded = Decoder::decode(&first.bytes).unwrap();
        let reconstructed = decoded.to_observations().unwrap();
        let second = encoder.encode(&reconstructed).unwrap();

        assert_eq!(first.bytes, second.bytes, "method {method:?}");
    }
}

#[test]
fn test_block_partition_properties() {
    let encoded = Encoder::new().encode(&synthetic_observations()).unwrap();
    let decoded = Decoder::decode(&encoded.bytes).unwrap();

    // Block ranges partition [0, count_temperatures): expand succeeds and
    // yields exactly one entry per temperature
    let expanded =
        BlockIndexer::expand(&decoded.blocks, decoded.header.count_temperatures).unwrap();
    assert_eq!(expanded.len(), decoded.len());

    // Location ranges partition [0, count_ctilb) in id order
    let mut covered = 0usize;
    let mut next_block_id = 0u32;
    for location in &decoded.locations {
        let blocks = decoded.location_blocks(location.id).unwrap();
        assert!(!blocks.is_empty());
        assert_eq!(blocks[0].id, next_block_id);
        next_block_id = blocks[blocks.len() - 1].id + 1;
        covered += blocks.len();
        for block in blocks {
            assert_eq!(block.location_id, location.id);
        }
    }
    assert_eq!(covered, decoded.blocks.len());
}

#[test]
fn test_gap_produces_exactly_one_boundary() {
    // Months 1-4 contiguous, then a 7-month gap: two blocks, not more
    let mut observations = Vec::new();
    for month in 1..=4u8 {
        observations.push(RawObservation::new(0.5, 0.5, 2000, month, month as f32));
    }
    observations.push(RawObservation::new(0.5, 0.5, 2000, 12, 9.0));

    let encoded = Encoder::new().encode(&observations).unwrap();
    assert_eq!(encoded.header.count_ctilb, 2);
}

#[test]
fn test_one_location_with_gap_counts() {
    // Three records, months at indices 0, 1 and 5 of the dataset span
    let observations = vec![
        RawObservation::new(1.0, 2.0, 2000, 1, 10.0),
        RawObservation::new(1.0, 2.0, 2000, 2, 12.0),
        RawObservation::new(1.0, 2.0, 2000, 6, 9.0),
    ];
    let encoded = Encoder::new()
        .with_temperature_width(TemperatureWidth::Two)
        .encode(&observations)
        .unwrap();
    assert_eq!(encoded.header.count_locations, 1);
    assert_eq!(encoded.header.count_ctilb, 2);
    assert_eq!(encoded.header.count_temperatures, 3);
}

#[test]
fn test_duplicate_rows_average() {
    let observations = vec![
        RawObservation::new(1.0, 2.0, 2000, 1, 10.0),
        RawObservation::new(1.0, 2.0, 2000, 1, 14.0),
        RawObservation::new(1.0, 2.0, 2000, 2, 5.0),
    ];
    let encoded = Encoder::new()
        .with_compression(CompressionMethod::None)
        .encode(&observations)
        .unwrap();
    assert_eq!(encoded.header.count_temperatures, 2);

    let decoded = Decoder::decode(&encoded.bytes).unwrap();
    let series = decoded.location_series(0).unwrap();
    let tolerance = half_step(5.0, 12.0, TemperatureWidth::Two) * 1.01;
    assert!((series[0].2 - 12.0).abs() <= tolerance);
}

#[test]
fn test_degenerate_bounds_produce_no_file() {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let path = temp_dir.path().join("flat.cce");

    let observations = vec![
        RawObservation::new(1.0, 2.0, 2000, 1, 7.0),
        RawObservation::new(1.0, 2.0, 2000, 3, 7.0),
    ];
    let result = Encoder::new().encode(&observations);
    assert!(matches!(result, Err(CodecError::InvalidBounds { .. })));
    assert!(!path.exists());
}

#[test]
fn test_decode_rejects_foreign_buffer() {
    let result = Decoder::decode(b"RIFF");
    assert!(matches!(result, Err(CodecError::BadMagic(_))));
}

#[test]
fn test_write_read_file_with_manifest() {
    init_tracing();
    let temp_dir = TempDir::new().expect("Failed to create temp directory");

    let encoded = Encoder::new().encode(&synthetic_observations()).unwrap();
    let filename = dataset_filename("clean", TemperatureWidth::Two, FormatVersion::V4);
    assert_eq!(filename, "cdata_clean_2bit_4.cce");

    let data_path = temp_dir.path().join(&filename);
    DatasetWriter::write(&encoded, &data_path).unwrap();

    let manifest = encoded.manifest("Synthetic", &filename);
    let manifest_path = temp_dir.path().join("manifest.json");
    DatasetWriter::write_manifest(&manifest, &manifest_path).unwrap();

    let reader = DatasetReader::new();
    let decoded = reader.read(&data_path).unwrap();
    assert_eq!(decoded.len() as u32, encoded.header.count_temperatures);

    let loaded_manifest = reader.read_manifest(&manifest_path).unwrap();
    assert_eq!(loaded_manifest, manifest);
    assert_eq!(
        loaded_manifest.compressed_size_bytes,
        std::fs::metadata(&data_path).unwrap().len()
    );
}

#[test]
fn test_mmap_read_matches_buffered() {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let path = temp_dir.path().join("dataset.cce");

    let encoded = Encoder::new().encode(&synthetic_observations()).unwrap();
    DatasetWriter::write(&encoded, &path).unwrap();

    let buffered = DatasetReader::new().read(&path).unwrap();
    let mapped = DatasetReader::with_mmap(true).read(&path).unwrap();
    assert_eq!(buffered.temperatures, mapped.temperatures);
    assert_eq!(buffered.blocks, mapped.blocks);
}

#[tokio::test]
async fn test_async_encode_matches_sync() {
    let observations = synthetic_observations();
    let encoder = Encoder::new().with_compression(CompressionMethod::Deflate);
    let sync = encoder.encode(&observations).unwrap();
    let detached = encoder.encode_async(&observations).await.unwrap();
    assert_eq!(sync.bytes, detached.bytes);
}
