use std::io::Write;
use std::path::Path;

use tempfile::NamedTempFile;
use tracing::info;

use crate::codec::encoder::EncodedDataset;
use crate::error::{CodecError, Result};
use crate::models::DatasetManifest;

/// Writes encoded datasets to disk in a single atomic step.
///
/// The stream is already fully buffered in memory by the time it reaches
/// this type, so a failed encode or compression pass never leaves a partial
/// file at the destination.
pub struct DatasetWriter;

impl DatasetWriter {
    /// Write to a temporary file in the destination directory and persist it
    /// only once every byte is flushed.
    pub fn write(dataset: &EncodedDataset, path: &Path) -> Result<()> {
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let mut tmp = NamedTempFile::new_in(dir)?;
        tmp.write_all(&dataset.bytes)?;
        tmp.flush()?;
        tmp.persist(path).map_err(|e| CodecError::Io(e.error))?;

        info!(
            path = %path.display(),
            bytes = dataset.bytes.len(),
            "wrote dataset file"
        );
        Ok(())
    }

    /// Write the catalog entry next to the binary, same atomic scheme.
    pub fn write_manifest(manifest: &DatasetManifest, path: &Path) -> Result<()> {
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let mut tmp = NamedTempFile::new_in(dir)?;
        serde_json::to_writer_pretty(&mut tmp, manifest)?;
        tmp.flush()?;
        tmp.persist(path).map_err(|e| CodecError::Io(e.error))?;
        Ok(())
    }
}
