//! Small numeric helpers

/// Lowest decibel value the engine produces; the level of digital silence.
pub const DB_FLOOR: f64 = -240.0;

const MIN_MAGNITUDE: f64 = 1e-12;

pub fn is_power_of_two(n: usize) -> bool {
    n != 0 && (n & (n - 1)) == 0
}

/// `20 * log10(magnitude)`, floored at [`DB_FLOOR`].
pub fn magnitude_to_db(magnitude: f64) -> f64 {
    if magnitude > MIN_MAGNITUDE {
        20.0 * magnitude.log10()
    } else {
        DB_FLOOR
    }
}

/// Median of an unordered population; the mean of the two middle values when
/// the population size is even. `None` for an empty population.
pub fn median(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_unstable_by(f64::total_cmp);

    let mid = sorted.len() / 2;
    Some(if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    })
}

/// Minimum and maximum of a population.
pub fn min_max(values: &[f64]) -> Option<(f64, f64)> {
    values.iter().fold(None, |acc, &v| match acc {
        None => Some((v, v)),
        Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
    })
}
