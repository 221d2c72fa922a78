//! Categorical forecast-skill scores from overlap areas
//!
//! With A = hit area (intersection), B = false-alarm area (predicted only) and
//! C = miss area (observed only):
//!
//! | Score | Formula | Undefined when |
//! |---|---|---|
//! | bias | (A+B)/(A+C) | nothing observed |
//! | hit rate | A/(A+C) | nothing observed |
//! | false alarm ratio | 1 − A/(A+B) | nothing predicted |
//! | critical success index | A/(A+B+C) | nothing observed or predicted |
//!
//! An undefined score is an error naming the score rather than a NaN.

use serde::{Deserialize, Serialize};

use crate::error::{Result, VerifyError};
use crate::overlap::OverlapResult;

/// The four verification statistics for one model
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SkillScores {
    /// Predicted/observed area ratio (1 = unbiased, >1 over-prediction)
    pub bias: f64,
    /// Fraction of observed area that was predicted
    pub hit_rate: f64,
    /// Fraction of predicted area that was not observed
    pub false_alarm_ratio: f64,
    /// Hits over the union of observed and predicted
    pub critical_success_index: f64,
}

fn ratio(
    numerator: f64,
    denominator: f64,
    metric: &'static str,
    denominator_name: &'static str,
) -> Result<f64> {
    if denominator > 0.0 {
        Ok(numerator / denominator)
    } else {
        Err(VerifyError::DegenerateInput {
            metric,
            denominator: denominator_name,
        })
    }
}

/// # Errors
/// `DegenerateInput` when A+C is zero.
pub fn bias(overlap: &OverlapResult) -> Result<f64> {
    let (a, b, c) = abc(overlap);
    ratio(a + b, a + c, "bias", "A+C")
}

/// # Errors
/// `DegenerateInput` when A+C is zero.
pub fn hit_rate(overlap: &OverlapResult) -> Result<f64> {
    let (a, _, c) = abc(overlap);
    ratio(a, a + c, "hit_rate", "A+C")
}

/// # Errors
/// `DegenerateInput` when A+B is zero.
pub fn false_alarm_ratio(overlap: &OverlapResult) -> Result<f64> {
    let (a, b, _) = abc(overlap);
    ratio(a, a + b, "false_alarm_ratio", "A+B").map(|hit_fraction| 1.0 - hit_fraction)
}

/// # Errors
/// `DegenerateInput` when A+B+C is zero.
pub fn critical_success_index(overlap: &OverlapResult) -> Result<f64> {
    let (a, b, c) = abc(overlap);
    ratio(a, a + b + c, "critical_success_index", "A+B+C")
}

fn abc(overlap: &OverlapResult) -> (f64, f64, f64) {
    (
        overlap.intersection,
        overlap.predicted_only,
        overlap.observed_only,
    )
}

/// All four scores, failing on the first undefined one
///
/// # Errors
/// Returns `VerifyError::DegenerateInput` naming the first score whose denominator is zero.
pub fn compute_skill(overlap: &OverlapResult) -> Result<SkillScores> {
    Ok(SkillScores {
        bias: bias(overlap)?,
        hit_rate: hit_rate(overlap)?,
        false_alarm_ratio: false_alarm_ratio(overlap)?,
        critical_success_index: critical_success_index(overlap)?,
    })
}
