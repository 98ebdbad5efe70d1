//! Student t-test of correlation strength against serial dependence.
//!
//! Lag-1 autocorrelation `r0` shrinks the usable sample size of a series of
//! `n_time` steps:
//!   n_eff = n_time · (1 − r0) / (1 + r0)
//!   df    = n_eff − 2
//!   t     = r · √(df / (1 − r²))
//! The upper-tail probability of |t| under Student's t with `df` degrees of
//! freedom (doubled for a two-tailed test) is compared against `1 − level`.
use serde::{Deserialize, Serialize};
use statrs::distribution::{ContinuousCDF, StudentsT};

use crate::error::{TeleError, TeleResult};
use crate::teleconnectivity::TeleconnectivityField;

/// Tail convention of the hypothesis test.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Tail {
    /// Directional test: only the upper tail counts.
    OneTailed,
    /// Both tails count; the tail probability is doubled.
    TwoTailed,
}

/// A configured significance test for series of a fixed length.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SignificanceTest {
    level: f64,
    tail: Tail,
    n_time: usize,
}

impl SignificanceTest {
    /// `level` is the confidence level, e.g. 0.9, 0.95 or 0.99.
    pub fn new(level: f64, tail: Tail, n_time: usize) -> TeleResult<Self> {
        if !(level > 0.0 && level < 1.0) {
            return Err(TeleError::InvalidSignificanceLevel(level));
        }
        Ok(Self { level, tail, n_time })
    }

    pub fn level(&self) -> f64 {
        self.level
    }

    pub fn tail(&self) -> Tail {
        self.tail
    }

    pub fn n_time(&self) -> usize {
        self.n_time
    }

    /// Effective number of independent samples given lag-1 autocorrelation `r0`.
    pub fn effective_sample_size(&self, r0: f32) -> f64 {
        let r0 = r0 as f64;
        self.n_time as f64 * (1.0 - r0) / (1.0 + r0)
    }

    pub fn degrees_of_freedom(&self, r0: f32) -> f64 {
        self.effective_sample_size(r0) - 2.0
    }

    /// Tail probability of correlation `r`, or `None` when the statistic is
    /// undefined (`r² ≥ 1`, `df ≤ 0`, or non-finite inputs).
    pub fn p_value(&self, r: f32, r0: f32) -> Option<f64> {
        let df = self.degrees_of_freedom(r0);
        let t = t_statistic(r as f64, df)?;
        let dist = StudentsT::new(0.0, 1.0, df).ok()?;
        let p = dist.sf(t.abs());
        let p = match self.tail {
            Tail::OneTailed => p,
            Tail::TwoTailed => 2.0 * p,
        };
        p.is_finite().then_some(p)
    }

    /// Whether correlation `r` is significant at the configured level.
    ///
    /// Degenerate inputs are reported as not significant.
    pub fn is_significant(&self, r: f32, r0: f32) -> bool {
        self.p_value(r, r0)
            .is_some_and(|p| p <= 1.0 - self.level)
    }
}

/// t statistic of correlation `r` with `df` degrees of freedom.
pub fn t_statistic(r: f64, df: f64) -> Option<f64> {
    let one_minus_r2 = 1.0 - r * r;
    if !(df > 0.0) || !(one_minus_r2 > 0.0) {
        return None;
    }
    let t = r * (df / one_minus_r2).sqrt();
    t.is_finite().then_some(t)
}

/// Per-point significance of each point's teleconnectivity.
///
/// Point `i` is tested with its own teleconnectivity value and its own
/// lag-1 autocorrelation. `autocorrelations` must have one value per point.
pub fn significance_mask(
    test: &SignificanceTest,
    field: &TeleconnectivityField,
    autocorrelations: &[f32],
) -> TeleResult<Vec<bool>> {
    if autocorrelations.len() != field.len() {
        return Err(TeleError::DimensionMismatch {
            what: "autocorrelation vector",
            expected: field.len(),
            actual: autocorrelations.len(),
        });
    }
    let mask: Vec<bool> = field
        .values
        .iter()
        .zip(autocorrelations)
        .map(|(&tc, &r0)| test.is_significant(tc, r0))
        .collect();
    log::debug!(
        "significance mask at level {}: {}/{} points significant",
        test.level,
        mask.iter().filter(|&&s| s).count(),
        mask.len()
    );
    Ok(mask)
}
