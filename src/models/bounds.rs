use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::{CodecError, Result};

/// First and last (year, month) present in a dataset, both inclusive.
/// Months are 1-12 throughout the crate and the on-disk header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateBounds {
    pub first_year: u16,
    pub first_month: u8,
    pub last_year: u16,
    pub last_month: u8,
}

impl DateBounds {
    pub fn first_date(&self) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(self.first_year as i32, self.first_month as u32, 1)
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(self.last_year as i32, self.last_month as u32, 1)
    }

    /// Total number of months spanned, endpoints included.
    pub fn month_span(&self) -> u32 {
        (self.last_year as u32 - self.first_year as u32) * 12 + self.last_month as u32
            - self.first_month as u32
            + 1
    }

    /// Offset of (year, month) from the first month of the dataset.
    /// The caller guarantees the date lies inside the bounds.
    pub fn month_index(&self, year: u16, month: u8) -> u32 {
        let offset = (year as i64 - self.first_year as i64) * 12 + month as i64
            - self.first_month as i64;
        debug_assert!(offset >= 0, "date ({year}, {month}) precedes dataset start");
        offset as u32
    }

    /// Inverse of [`month_index`](Self::month_index).
    pub fn year_month(&self, month_index: u32) -> (u16, u8) {
        let total = self.first_month as u32 - 1 + month_index;
        (
            (self.first_year as u32 + total / 12) as u16,
            (total % 12 + 1) as u8,
        )
    }
}

/// Global temperature extrema, the domain of the quantizer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TemperatureBounds {
    pub min: f32,
    pub max: f32,
}

/// Header metadata computed once over the full cleaned table.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DatasetBounds {
    pub dates: DateBounds,
    pub temperatures: TemperatureBounds,
}

impl DatasetBounds {
    /// Scan a (year, month, temperature) series for its date and temperature
    /// extrema. Fails on an empty series; bounds of nothing are undefined.
    pub fn from_series<I>(series: I) -> Result<Self>
    where
        I: IntoIterator<Item = (u16, u8, f32)>,
    {
        let mut iter = series.into_iter();
        let (year, month, temperature) = iter
            .next()
            .ok_or_else(|| CodecError::Schema("cannot compute bounds of an empty dataset".into()))?;

        let mut first = (year, month);
        let mut last = (year, month);
        let mut min = temperature;
        let mut max = temperature;

        for (year, month, temperature) in iter {
            let date = (year, month);
            if date < first {
                first = date;
            }
            if date > last {
                last = date;
            }
            min = min.min(temperature);
            max = max.max(temperature);
        }

        Ok(Self {
            dates: DateBounds {
                first_year: first.0,
                first_month: first.1,
                last_year: last.0,
                last_month: last.1,
            },
            temperatures: TemperatureBounds { min, max },
        })
    }
}
