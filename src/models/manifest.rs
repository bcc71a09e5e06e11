use serde::{Deserialize, Serialize};

/// Catalog entry describing one encoded dataset file. The viewer reads a
/// list of these to populate its database picker without downloading the
/// binaries themselves.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatasetManifest {
    pub name: String,
    pub filename: String,
    pub discretization: String,
    pub size_bytes: u64,
    pub compressed_size_bytes: u64,
    pub count_temperatures: u32,
    pub count_locations: u32,
    pub count_ctilb: u32,
}
