pub mod codec;
pub mod compression;
pub mod error;
pub mod models;
pub mod processors;
pub mod readers;
pub mod utils;
pub mod writers;

pub use codec::decoder::{DecodedDataset, Decoder};
pub use codec::encoder::{EncodeReport, EncodedDataset, Encoder, EncoderConfig};
pub use error::{CodecError, Result};
