//! Attribute combination.
//!
//! Pure arithmetic: given a base value, the attribute's metadata and the
//! contributions reaching it, produce the final value. Contributions are
//! applied stage by stage in a fixed order:
//!
//! ```text
//! pre-assign → pre-mul/pre-div → add/sub → post-mul/post-div → post-percent
//! ```
//!
//! Inside the multiplicative stages of a non-stackable attribute,
//! contributions from non-exempt sources are stacking-penalized. Each
//! operator forms its own penalty chain.

use crate::error::Anomaly;
use crate::ids::{EffectId, HolderId};
use crate::item::AttributeDef;
use crate::modifier::{Operator, Stage};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Denominator of the stacking penalty exponent.
pub const PENALTY_SPREAD: f64 = 2.67;

/// Operators that can be penalized, in application order.
const PENALIZABLE: [Operator; 5] = [
    Operator::PreMul,
    Operator::PreDiv,
    Operator::PostMul,
    Operator::PostDiv,
    Operator::PostPercent,
];

/// One modification reaching an attribute.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Contribution {
    /// Holder carrying the modifier.
    pub source: HolderId,
    pub effect: EffectId,
    pub operator: Operator,
    /// Current value of the modifier's source attribute.
    pub value: f64,
    /// Never stacking-penalized, whatever the target attribute.
    pub penalty_exempt: bool,
}

/// Result of [`combine`].
#[derive(Debug, Clone, PartialEq)]
pub struct Combination {
    pub value: f64,
    /// `(stage_description, value_after_stage)` for every stage that ran.
    pub steps: Vec<(String, f64)>,
    pub anomalies: Vec<Anomaly>,
}

/// Penalty multiplier of the bonus at `rank` (0 = strongest).
///
/// # Examples
///
/// ```rust
/// use fitcalc::calculator::penalty_multiplier;
///
/// assert_eq!(penalty_multiplier(0), 1.0);
/// assert!((penalty_multiplier(1) - 0.869_119_980_8).abs() < 1e-9);
/// assert!(penalty_multiplier(2) < penalty_multiplier(1));
/// ```
pub fn penalty_multiplier(rank: usize) -> f64 {
    (-(rank as f64 / PENALTY_SPREAD).powi(2)).exp()
}

/// Apply the stacking penalty to bonus fractions.
///
/// Positive and negative bonuses form separate chains, each ranked by
/// magnitude, strongest first. Returns the penalized bonuses: positives
/// in rank order, then negatives in rank order.
///
/// # Examples
///
/// ```rust
/// use fitcalc::calculator::{penalized_bonuses, penalty_multiplier};
///
/// let penalized = penalized_bonuses(&[0.1, 0.3, -0.2]);
/// assert_eq!(penalized[0], 0.3);
/// assert_eq!(penalized[1], 0.1 * penalty_multiplier(1));
/// assert_eq!(penalized[2], -0.2);
/// ```
pub fn penalized_bonuses(bonuses: &[f64]) -> Vec<f64> {
    let by_magnitude = |a: &f64, b: &f64| b.abs().partial_cmp(&a.abs()).unwrap_or(Ordering::Equal);

    let mut positive: Vec<f64> = bonuses.iter().copied().filter(|b| *b >= 0.0).collect();
    let mut negative: Vec<f64> = bonuses.iter().copied().filter(|b| *b < 0.0).collect();
    positive.sort_by(by_magnitude);
    negative.sort_by(by_magnitude);

    positive
        .iter()
        .enumerate()
        .chain(negative.iter().enumerate())
        .map(|(rank, bonus)| bonus * penalty_multiplier(rank))
        .collect()
}

/// Combine contributions into a final value.
///
/// `contributions` must already be in deterministic affector order.
/// Returns `None` when there is neither a base value nor a pre-assignment.
///
/// # Examples
///
/// ```rust
/// use fitcalc::calculator::{combine, Contribution};
/// use fitcalc::modifier::Operator;
/// use fitcalc::{AttrId, AttributeDef, EffectId, HolderId};
///
/// let add = Contribution {
///     source: HolderId(2),
///     effect: EffectId(1),
///     operator: Operator::ModAdd,
///     value: 10.0,
///     penalty_exempt: false,
/// };
/// let double = Contribution { operator: Operator::PostMul, value: 2.0, ..add };
///
/// let result = combine(Some(5.0), &AttributeDef::new(AttrId(1)), &[double, add]).unwrap();
/// assert_eq!(result.value, 30.0);
/// ```
pub fn combine(
    base: Option<f64>,
    def: &AttributeDef,
    contributions: &[Contribution],
) -> Option<Combination> {
    let mut steps = Vec::new();
    let mut anomalies = Vec::new();

    if let Some(base) = base {
        steps.push(("base".to_string(), base));
    }

    let assigns: Vec<&Contribution> = contributions
        .iter()
        .filter(|c| c.operator.stage() == Stage::PreAssign)
        .collect();
    let mut value = match assigns.last() {
        Some(winner) => {
            if assigns.len() > 1 {
                let anomaly = Anomaly::CompetingPreAssignments {
                    count: assigns.len(),
                    winner: winner.source,
                };
                tracing::warn!(%anomaly, "competing pre-assignments");
                anomalies.push(anomaly);
            }
            steps.push(("pre-assign".to_string(), winner.value));
            winner.value
        }
        None => base?,
    };

    for stage in &Stage::ORDER[1..] {
        let in_stage: Vec<&Contribution> = contributions
            .iter()
            .filter(|c| c.operator.stage() == *stage)
            .collect();
        if in_stage.is_empty() {
            continue;
        }
        let (penalized, direct): (Vec<&Contribution>, Vec<&Contribution>) = in_stage
            .into_iter()
            .partition(|c| !def.stackable && !c.penalty_exempt && c.operator.is_penalizable());

        value = apply_direct(*stage, value, &direct, &mut anomalies);
        for operator in PENALIZABLE.iter().filter(|op| op.stage() == *stage) {
            let bonuses: Vec<f64> = penalized
                .iter()
                .filter(|c| c.operator == *operator)
                .filter_map(|c| bonus_fraction(c, &mut anomalies))
                .collect();
            for bonus in penalized_bonuses(&bonuses) {
                value *= 1.0 + bonus;
            }
        }
        steps.push((stage_label(*stage).to_string(), value));
    }

    Some(Combination {
        value,
        steps,
        anomalies,
    })
}

fn apply_direct(
    stage: Stage,
    mut value: f64,
    contributions: &[&Contribution],
    anomalies: &mut Vec<Anomaly>,
) -> f64 {
    if stage == Stage::PostPercent {
        if contributions.is_empty() {
            return value;
        }
        let percent: f64 = contributions.iter().map(|c| c.value).sum();
        return value * (1.0 + percent / 100.0);
    }
    for contribution in contributions {
        match contribution.operator {
            Operator::PreMul | Operator::PostMul => value *= contribution.value,
            Operator::PreDiv | Operator::PostDiv => {
                if contribution.value == 0.0 {
                    anomalies.push(zero_divisor(contribution.source));
                } else {
                    value /= contribution.value;
                }
            }
            Operator::ModAdd => value += contribution.value,
            Operator::ModSub => value -= contribution.value,
            Operator::PreAssign | Operator::PostPercent => {}
        }
    }
    value
}

/// Bonus fraction of a multiplicative contribution; `None` for a zero divisor.
fn bonus_fraction(contribution: &Contribution, anomalies: &mut Vec<Anomaly>) -> Option<f64> {
    match contribution.operator {
        Operator::PreDiv | Operator::PostDiv => {
            if contribution.value == 0.0 {
                anomalies.push(zero_divisor(contribution.source));
                None
            } else {
                Some(1.0 / contribution.value - 1.0)
            }
        }
        Operator::PostPercent => Some(contribution.value / 100.0),
        _ => Some(contribution.value - 1.0),
    }
}

fn zero_divisor(source: HolderId) -> Anomaly {
    let anomaly = Anomaly::ZeroDivisor {
        source_holder: source,
    };
    tracing::warn!(%anomaly, "division by zero skipped");
    anomaly
}

fn stage_label(stage: Stage) -> &'static str {
    match stage {
        Stage::PreAssign => "pre-assign",
        Stage::PreMul => "pre-mul",
        Stage::Additive => "additive",
        Stage::PostMul => "post-mul",
        Stage::PostPercent => "post-percent",
    }
}
