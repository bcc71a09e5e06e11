use std::fs::File;
use std::io::Read;
use std::path::Path;

use memmap2::Mmap;
use tracing::debug;

use crate::codec::decoder::{DecodedDataset, Decoder};
use crate::error::Result;
use crate::models::DatasetManifest;

/// Reads encoded dataset files from disk.
pub struct DatasetReader {
    use_mmap: bool,
}

impl DatasetReader {
    pub fn new() -> Self {
        Self { use_mmap: false }
    }

    /// Memory-map the file instead of buffering it; pays off for large
    /// archives read once.
    pub fn with_mmap(use_mmap: bool) -> Self {
        Self { use_mmap }
    }

    pub fn read(&self, path: &Path) -> Result<DecodedDataset> {
        if self.use_mmap {
            self.read_mmap(path)
        } else {
            self.read_buffered(path)
        }
    }

    fn read_buffered(&self, path: &Path) -> Result<DecodedDataset> {
        let mut file = File::open(path)?;
        let mut data = Vec::new();
        file.read_to_end(&mut data)?;
        debug!(path = %path.display(), bytes = data.len(), "read dataset file");
        Decoder::decode(&data)
    }

    fn read_mmap(&self, path: &Path) -> Result<DecodedDataset> {
        let file = File::open(path)?;
        let mmap = unsafe { Mmap::map(&file)? };
        debug!(path = %path.display(), bytes = mmap.len(), "mapped dataset file");
        Decoder::decode(&mmap)
    }

    /// Load a catalog entry written next to the binary.
    pub fn read_manifest(&self, path: &Path) -> Result<DatasetManifest> {
        let file = File::open(path)?;
        Ok(serde_json::from_reader(file)?)
    }
}

impl Default for DatasetReader {
    fn default() -> Self {
        Self::new()
    }
}
