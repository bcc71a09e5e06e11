use std::io::{Read, Write};

use flate2::read::DeflateDecoder;
use flate2::write::DeflateEncoder;
use flate2::Compression;
use tracing::debug;

use crate::error::{CodecError, Result};
use crate::models::CompressionMethod;
use crate::utils::constants::DEFAULT_DEFLATE_LEVEL;

/// Pluggable byte-stream transform applied to the serialized body. The codec
/// treats the pass as opaque; choice and tuning of the compressor live here
/// and nowhere else.
pub trait CompressionAdapter: Send + Sync {
    fn compress(&self, data: &[u8]) -> Result<Vec<u8>>;
    fn decompress(&self, data: &[u8]) -> Result<Vec<u8>>;
}

/// Identity pass-through, method code 0.
pub struct NoCompression;

impl CompressionAdapter for NoCompression {
    fn compress(&self, data: &[u8]) -> Result<Vec<u8>> {
        Ok(data.to_vec())
    }

    fn decompress(&self, data: &[u8]) -> Result<Vec<u8>> {
        Ok(data.to_vec())
    }
}

/// DEFLATE body compression, method code 1.
pub struct DeflateAdapter {
    level: Compression,
}

impl DeflateAdapter {
    pub fn new() -> Self {
        Self {
            level: Compression::new(DEFAULT_DEFLATE_LEVEL),
        }
    }
}

impl Default for DeflateAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl CompressionAdapter for DeflateAdapter {
    fn compress(&self, data: &[u8]) -> Result<Vec<u8>> {
        let mut encoder = DeflateEncoder::new(Vec::with_capacity(data.len() / 2), self.level);
        encoder
            .write_all(data)
            .map_err(|e| CodecError::Compression(e.to_string()))?;
        let compressed = encoder
            .finish()
            .map_err(|e| CodecError::Compression(e.to_string()))?;
        debug!(
            raw = data.len(),
            compressed = compressed.len(),
            "deflated body"
        );
        Ok(compressed)
    }

    fn decompress(&self, data: &[u8]) -> Result<Vec<u8>> {
        let mut decoder = DeflateDecoder::new(data);
        let mut out = Vec::new();
        decoder
            .read_to_end(&mut out)
            .map_err(|e| CodecError::Compression(e.to_string()))?;
        Ok(out)
    }
}

/// Adapter selected by a header method code.
pub fn adapter_for(method: CompressionMethod) -> Box<dyn CompressionAdapter> {
    match method {
        CompressionMethod::None => Box::new(NoCompression),
        CompressionMethod::Deflate => Box::new(DeflateAdapter::new()),
    }
}

/// Compress a body buffer on a blocking worker. The buffer moves into the
/// task, so nothing else can touch it while the pass runs; the result comes
/// back through the join handle.
pub async fn compress_detached(method: CompressionMethod, body: Vec<u8>) -> Result<Vec<u8>> {
    tokio::task::spawn_blocking(move || adapter_for(method).compress(&body)).await?
}
