//! Spread statistics for the confidence-distribution view.

use serde::Serialize;

/// Box-plot summary of one group of values.
///
/// Percentiles use nearest-rank on the sorted values
/// (`idx = round(p / 100 * (n - 1))`), so every quartile is an observed value.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BoxStats {
    pub count: usize,
    pub min: f64,
    pub q1: f64,
    pub median: f64,
    pub q3: f64,
    pub max: f64,
    pub mean: f64,
    pub iqr: f64,
    pub lower_fence: f64,
    pub upper_fence: f64,
    /// Smallest value inside the lower fence.
    pub lower_whisker: f64,
    /// Largest value inside the upper fence.
    pub upper_whisker: f64,
    /// Values outside the fences, ascending.
    pub outliers: Vec<f64>,
}

impl BoxStats {
    /// Returns `None` when there are no finite values.
    pub fn from_values(values: &[f64]) -> Option<Self> {
        let mut sorted: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
        if sorted.is_empty() {
            return None;
        }
        sorted.sort_by(f64::total_cmp);
        let n = sorted.len();

        let q1 = percentile(&sorted, 25.0);
        let median = percentile(&sorted, 50.0);
        let q3 = percentile(&sorted, 75.0);
        let iqr = q3 - q1;
        let lower_fence = q1 - 1.5 * iqr;
        let upper_fence = q3 + 1.5 * iqr;

        let inside = || {
            sorted
                .iter()
                .copied()
                .filter(|v| *v >= lower_fence && *v <= upper_fence)
        };
        // q1 and q3 are observed values inside the fences, so both whiskers exist.
        let lower_whisker = inside().next().unwrap_or(q1);
        let upper_whisker = inside().last().unwrap_or(q3);
        let outliers = sorted
            .iter()
            .copied()
            .filter(|v| *v < lower_fence || *v > upper_fence)
            .collect();

        Some(Self {
            count: n,
            min: sorted[0],
            q1,
            median,
            q3,
            max: sorted[n - 1],
            mean: sorted.iter().sum::<f64>() / n as f64,
            iqr,
            lower_fence,
            upper_fence,
            lower_whisker,
            upper_whisker,
            outliers,
        })
    }
}

/// Nearest-rank percentile of already sorted, non-empty values.
fn percentile(sorted: &[f64], p: f64) -> f64 {
    let n = sorted.len();
    let idx = ((p / 100.0) * (n - 1) as f64).round() as usize;
    sorted[idx.min(n - 1)]
}
