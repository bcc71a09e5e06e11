use serde::{Deserialize, Serialize};

use crate::codec::stream::{ByteReader, ByteWriter};
use crate::error::{CodecError, Result};
use crate::models::bounds::{DateBounds, TemperatureBounds};
use crate::utils::constants::{
    MAGIC, V3_HEADER_LEN, V4_BLOCK_ENTRY_LEN, V4_HEADER_LEN, V4_LOCATION_ENTRY_LEN,
};
use crate::utils::widths::bytes_for_index;

/// On-disk layout revision, selected by the version byte after the magic tag.
///
/// Version 3 is the legacy shape: variable per-field index widths and
/// explicit inclusive end-indices per block and per location. Version 4 fixes
/// every index at 4 bytes and stores start indices only; new files are
/// always written as version 4.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FormatVersion {
    V3,
    V4,
}

impl FormatVersion {
    pub fn from_u8(value: u8) -> Result<Self> {
        match value {
            3 => Ok(FormatVersion::V3),
            4 => Ok(FormatVersion::V4),
            other => Err(CodecError::UnsupportedVersion(other)),
        }
    }

    pub fn as_u8(&self) -> u8 {
        match self {
            FormatVersion::V3 => 3,
            FormatVersion::V4 => 4,
        }
    }
}

/// Storage width of one quantized temperature code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TemperatureWidth {
    One,
    Two,
    Four,
}

impl TemperatureWidth {
    pub fn from_u8(value: u8) -> Result<Self> {
        match value {
            1 => Ok(TemperatureWidth::One),
            2 => Ok(TemperatureWidth::Two),
            4 => Ok(TemperatureWidth::Four),
            other => Err(CodecError::InvalidFormat(format!(
                "temperature width must be 1, 2 or 4 bytes, got {other}"
            ))),
        }
    }

    pub fn as_u8(&self) -> u8 {
        match self {
            TemperatureWidth::One => 1,
            TemperatureWidth::Two => 2,
            TemperatureWidth::Four => 4,
        }
    }

    pub fn bytes(&self) -> usize {
        self.as_u8() as usize
    }

    /// Largest code representable at this width.
    pub fn max_code(&self) -> u32 {
        ((1u64 << (8 * self.bytes())) - 1) as u32
    }

    /// Human-readable discretization label for catalog metadata.
    pub fn label(&self) -> String {
        format!("{}-byte", self.bytes())
    }
}

/// Byte-stream transform applied to the serialized body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CompressionMethod {
    None,
    Deflate,
}

impl CompressionMethod {
    pub fn from_u8(value: u8) -> Result<Self> {
        match value {
            0 => Ok(CompressionMethod::None),
            1 => Ok(CompressionMethod::Deflate),
            other => Err(CodecError::InvalidFormat(format!(
                "unknown compression method code {other}"
            ))),
        }
    }

    pub fn as_u8(&self) -> u8 {
        match self {
            CompressionMethod::None => 0,
            CompressionMethod::Deflate => 1,
        }
    }
}

/// Variable per-field byte widths of the legacy version-3 layout, derived
/// from the table counts rather than stored state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LegacyWidths {
    pub temperature_index: u8,
    pub month_difference: u8,
    pub ctilb_index: u8,
}

/// Everything the decoder needs before touching the body: counts, bounds and
/// the two caller-chosen encode parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Header {
    pub version: FormatVersion,
    pub count_temperatures: u32,
    pub count_locations: u32,
    pub count_ctilb: u32,
    pub dates: DateBounds,
    pub temperatures: TemperatureBounds,
    pub temperature_width: TemperatureWidth,
    pub compression: CompressionMethod,
}

impl Header {
    pub fn header_len(&self) -> usize {
        match self.version {
            FormatVersion::V3 => V3_HEADER_LEN,
            FormatVersion::V4 => V4_HEADER_LEN,
        }
    }

    /// Index widths of the legacy layout, recomputed from the counts.
    pub fn legacy_widths(&self) -> LegacyWidths {
        LegacyWidths {
            temperature_index: bytes_for_index(self.count_temperatures),
            month_difference: bytes_for_index(self.dates.month_span()),
            ctilb_index: bytes_for_index(self.count_ctilb),
        }
    }

    /// Uncompressed body length implied by the counts and widths. The
    /// assembled body must match this exactly.
    pub fn expected_body_len(&self) -> usize {
        let temperatures = self.count_temperatures as usize * self.temperature_width.bytes();
        match self.version {
            FormatVersion::V4 => {
                temperatures
                    + self.count_ctilb as usize * V4_BLOCK_ENTRY_LEN
                    + self.count_locations as usize * V4_LOCATION_ENTRY_LEN
            }
            FormatVersion::V3 => {
                let widths = self.legacy_widths();
                let block_entry =
                    widths.month_difference as usize + 2 * widths.temperature_index as usize;
                let location_entry = 8 + 2 * widths.ctilb_index as usize;
                temperatures
                    + self.count_ctilb as usize * block_entry
                    + self.count_locations as usize * location_entry
            }
        }
    }

    pub fn write_to(&self, writer: &mut ByteWriter) {
        writer.put_bytes(&MAGIC);
        writer.put_u8(self.version.as_u8());
        writer.put_u32(self.count_temperatures);
        writer.put_u32(self.count_locations);
        writer.put_u32(self.count_ctilb);
        writer.put_u16(self.dates.first_year);
        writer.put_u8(self.dates.first_month);
        writer.put_u16(self.dates.last_year);
        writer.put_u8(self.dates.last_month);
        writer.put_f32(self.temperatures.min);
        writer.put_f32(self.temperatures.max);
        writer.put_u8(self.temperature_width.as_u8());
        match self.version {
            FormatVersion::V4 => writer.put_u8(self.compression.as_u8()),
            FormatVersion::V3 => {
                let widths = self.legacy_widths();
                writer.put_u8(widths.temperature_index);
                writer.put_u8(widths.month_difference);
                writer.put_u8(widths.ctilb_index);
            }
        }
    }

    pub fn read_from(reader: &mut ByteReader<'_>) -> Result<Self> {
        let magic = reader.read_bytes(3)?;
        if magic != MAGIC {
            let mut tag = [0u8; 3];
            tag.copy_from_slice(magic);
            return Err(CodecError::BadMagic(tag));
        }

        let version = FormatVersion::from_u8(reader.read_u8()?)?;
        let count_temperatures = reader.read_u32()?;
        let count_locations = reader.read_u32()?;
        let count_ctilb = reader.read_u32()?;
        let dates = DateBounds {
            first_year: reader.read_u16()?,
            first_month: reader.read_u8()?,
            last_year: reader.read_u16()?,
            last_month: reader.read_u8()?,
        };
        let temperatures = TemperatureBounds {
            min: reader.read_f32()?,
            max: reader.read_f32()?,
        };
        let temperature_width = TemperatureWidth::from_u8(reader.read_u8()?)?;

        Self::check_dates(&dates)?;

        let compression = match version {
            FormatVersion::V4 => CompressionMethod::from_u8(reader.read_u8()?)?,
            FormatVersion::V3 => {
                // Legacy widths are fully determined by the counts; a header
                // that disagrees was not produced by this codec.
                let declared = LegacyWidths {
                    temperature_index: reader.read_u8()?,
                    month_difference: reader.read_u8()?,
                    ctilb_index: reader.read_u8()?,
                };
                let derived = LegacyWidths {
                    temperature_index: bytes_for_index(count_temperatures),
                    month_difference: bytes_for_index(dates.month_span()),
                    ctilb_index: bytes_for_index(count_ctilb),
                };
                if declared != derived {
                    return Err(CodecError::InvalidFormat(format!(
                        "legacy index widths {declared:?} disagree with derived {derived:?}"
                    )));
                }
                CompressionMethod::None
            }
        };

        Ok(Self {
            version,
            count_temperatures,
            count_locations,
            count_ctilb,
            dates,
            temperatures,
            temperature_width,
            compression,
        })
    }

    fn check_dates(dates: &DateBounds) -> Result<()> {
        for month in [dates.first_month, dates.last_month] {
            if !(1..=12).contains(&month) {
                return Err(CodecError::InvalidFormat(format!(
                    "month byte {month} outside 1-12"
                )));
            }
        }
        if (dates.first_year, dates.first_month) > (dates.last_year, dates.last_month) {
            return Err(CodecError::InvalidFormat(format!(
                "date bounds out of order: {}-{} after {}-{}",
                dates.first_year, dates.first_month, dates.last_year, dates.last_month
            )));
        }
        Ok(())
    }
}
