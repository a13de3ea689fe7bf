//! Order statistics with linear interpolation.
//!
//! For `n` sorted values the `q`-quantile sits at rank `q * (n - 1)`; a
//! fractional rank blends the two neighbouring values. NumPy's default
//! `percentile` uses the same rule.

use phylopotts_core::{PottsError, Result};

/// A sorted copy of a non-empty sample, queried repeatedly.
#[derive(Debug, Clone, PartialEq)]
pub struct SortedSample(Vec<f64>);

impl SortedSample {
    pub fn new(values: &[f64]) -> Result<Self> {
        if values.is_empty() {
            return Err(PottsError::InvalidInput(
                "no values to take quantiles of".into(),
            ));
        }
        let mut v = values.to_vec();
        v.sort_unstable_by(f64::total_cmp);
        Ok(SortedSample(v))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Interpolated quantile for `q` in `[0, 1]`.
    pub fn quantile(&self, q: f64) -> Result<f64> {
        if !(0.0..=1.0).contains(&q) {
            return Err(PottsError::InvalidInput(format!(
                "quantile level {q} is outside [0, 1]"
            )));
        }
        let last = self.0.len() - 1;
        let rank = q * last as f64;
        let below = (rank as usize).min(last);
        let above = (below + 1).min(last);
        let weight = rank - below as f64;
        Ok(self.0[below] + (self.0[above] - self.0[below]) * weight)
    }
}

/// One interpolated quantile of `data`.
pub fn quantile(data: &[f64], q: f64) -> Result<f64> {
    SortedSample::new(data)?.quantile(q)
}

/// Percentiles (0 to 100) of `data`, sorting it only once.
pub fn percentiles(data: &[f64], pcts: &[f64]) -> Result<Vec<f64>> {
    let sample = SortedSample::new(data)?;
    pcts.iter().map(|p| sample.quantile(p / 100.0)).collect()
}
