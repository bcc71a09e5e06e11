use std::collections::HashMap;

use tracing::debug;

use crate::models::RawObservation;

/// One aggregated month of data for a single location.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MonthlyValue {
    pub location_id: u32,
    pub year: u16,
    pub month: u8,
    pub temperature: f32,
    pub uncertainty: f32,
    pub interpolated: bool,
}

#[derive(Default)]
struct MonthAccumulator {
    temperature_sum: f64,
    count: u32,
    uncertainty_sum: f64,
    uncertainty_count: u32,
    interpolated: bool,
}

/// Merges raw rows that share (location, year, month) into one value per
/// month, then establishes the `(location_id, time)` order every downstream
/// pass relies on.
pub struct Aggregator;

impl Aggregator {
    /// Temperature is the arithmetic mean of the inputs, uncertainty the
    /// mean of the uncertainties actually present (0 when none are), and the
    /// interpolated flag the logical OR across inputs.
    pub fn merge(observations: &[RawObservation], location_ids: &[u32]) -> Vec<MonthlyValue> {
        let mut groups: HashMap<(u32, u16, u8), MonthAccumulator> = HashMap::new();

        for (obs, &location_id) in observations.iter().zip(location_ids) {
            let acc = groups
                .entry((location_id, obs.year, obs.month))
                .or_default();
            acc.temperature_sum += obs.temperature as f64;
            acc.count += 1;
            if let Some(uncertainty) = obs.uncertainty {
                acc.uncertainty_sum += uncertainty as f64;
                acc.uncertainty_count += 1;
            }
            acc.interpolated |= obs.interpolated;
        }

        let mut merged: Vec<MonthlyValue> = groups
            .into_iter()
            .map(|((location_id, year, month), acc)| MonthlyValue {
                location_id,
                year,
                month,
                temperature: (acc.temperature_sum / acc.count as f64) as f32,
                uncertainty: if acc.uncertainty_count > 0 {
                    (acc.uncertainty_sum / acc.uncertainty_count as f64) as f32
                } else {
                    0.0
                },
                interpolated: acc.interpolated,
            })
            .collect();

        merged.sort_by_key(|v| (v.location_id, v.year, v.month));

        debug!(
            rows = observations.len(),
            merged = observations.len() - merged.len(),
            "aggregated duplicate months"
        );
        merged
    }
}
