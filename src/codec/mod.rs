pub mod decoder;
pub mod encoder;
pub mod quantizer;
pub mod stream;

pub use decoder::{DecodedDataset, Decoder};
pub use encoder::{EncodeReport, EncodedDataset, Encoder, EncoderConfig, PreparedDataset};
pub use quantizer::Quantizer;
pub use stream::{ByteReader, ByteWriter};
