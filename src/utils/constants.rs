/// Magic tag at the start of every encoded stream
pub const MAGIC: [u8; 3] = *b"CCE";

/// Header lengths, magic and version byte included
pub const V3_HEADER_LEN: usize = 34;
pub const V4_HEADER_LEN: usize = 32;

/// Fixed entry sizes in the version-4 body
pub const V4_BLOCK_ENTRY_LEN: usize = 8;
pub const V4_LOCATION_ENTRY_LEN: usize = 12;

/// Deflate level for the body pass; compressor tuning is out of scope
pub const DEFAULT_DEFLATE_LEVEL: u32 = 6;
