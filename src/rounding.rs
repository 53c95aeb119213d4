//! Quarter-unit rounding primitives.
//!
//! Duty capacity is accounted in quarter-day units, and bed quotas must
//! round to whole beds without losing the department-wide total. Two
//! primitives cover both needs:
//!
//! - [`round_to_quarter`]: nearest 0.25, exact midpoints round DOWN.
//! - [`round_preserving_sum`]: per-team integer rounding that preserves
//!   the exact input total, which independent per-team rounding does not.

use std::collections::BTreeMap;

use crate::models::Team;

/// Rounds a fractional duty value to the nearest 0.25.
///
/// Finds the 0.25-wide interval `[lo, lo + 0.25)` containing `x` and
/// returns `lo + 0.25` only when `x` is strictly past the interval's
/// midpoint. This is not round-half-up: the midpoint itself rounds down,
/// so `round_to_quarter(0.625) == 0.5`.
///
/// Negative inputs round by sign-flipping. Non-finite inputs round to 0.
pub fn round_to_quarter(x: f64) -> f64 {
    if !x.is_finite() {
        return 0.0;
    }
    if x < 0.0 {
        return -round_to_quarter(-x);
    }
    let lo = (x * 4.0).floor() / 4.0;
    let mid = lo + 0.125;
    if x > mid {
        lo + 0.25
    } else {
        lo
    }
}

/// Rounds per-team fractional bed quotas to integers preserving the total.
///
/// Each value is truncated toward zero, leaving a signed residual. While
/// the running integer total differs from the (integer) input total, the
/// team with the currently-largest residual gains +1 (when the total is
/// short) or the team with the currently most-negative residual loses 1
/// (when the total is over). Each adjustment consumes one unit of that
/// team's residual, so the loop is bounded by the team count. Residual
/// ties go to the earlier team in canonical order.
///
/// Non-finite inputs are treated as zero before rounding.
pub fn round_preserving_sum(values: &BTreeMap<Team, f64>) -> BTreeMap<Team, i64> {
    let mut bases: BTreeMap<Team, i64> = BTreeMap::new();
    let mut residuals: BTreeMap<Team, f64> = BTreeMap::new();
    let mut sum = 0.0;

    for (&team, &raw) in values {
        let v = if raw.is_finite() { raw } else { 0.0 };
        bases.insert(team, v.trunc() as i64);
        residuals.insert(team, v.fract());
        sum += v;
    }

    let target = sum.round() as i64;
    let mut total: i64 = bases.values().sum();

    while total != target {
        let team = if total < target {
            largest_residual(&residuals)
        } else {
            smallest_residual(&residuals)
        };
        let Some(team) = team else { break };

        if total < target {
            *bases.get_mut(&team).expect("base exists for residual team") += 1;
            *residuals.get_mut(&team).expect("residual exists") -= 1.0;
            total += 1;
        } else {
            *bases.get_mut(&team).expect("base exists for residual team") -= 1;
            *residuals.get_mut(&team).expect("residual exists") += 1.0;
            total -= 1;
        }
    }

    bases
}

/// Team with the largest residual; earlier team wins ties.
fn largest_residual(residuals: &BTreeMap<Team, f64>) -> Option<Team> {
    let mut best: Option<(Team, f64)> = None;
    for (&team, &r) in residuals {
        match best {
            Some((_, br)) if r <= br => {}
            _ => best = Some((team, r)),
        }
    }
    best.map(|(t, _)| t)
}

/// Team with the most-negative residual; earlier team wins ties.
fn smallest_residual(residuals: &BTreeMap<Team, f64>) -> Option<Team> {
    let mut best: Option<(Team, f64)> = None;
    for (&team, &r) in residuals {
        match best {
            Some((_, br)) if r >= br => {}
            _ => best = Some((team, r)),
        }
    }
    best.map(|(t, _)| t)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn relief(pairs: &[(Team, f64)]) -> BTreeMap<Team, f64> {
        pairs.iter().copied().collect()
    }

    #[test]
    fn test_round_to_quarter_basics() {
        assert_eq!(round_to_quarter(0.0), 0.0);
        assert_eq!(round_to_quarter(0.1), 0.0);
        assert_eq!(round_to_quarter(0.2), 0.25);
        assert_eq!(round_to_quarter(0.25), 0.25);
        assert_eq!(round_to_quarter(0.3), 0.25);
        assert_eq!(round_to_quarter(1.0), 1.0);
        assert_eq!(round_to_quarter(0.74), 0.75);
    }

    #[test]
    fn test_midpoint_rounds_down() {
        assert_eq!(round_to_quarter(0.625), 0.5);
        assert_eq!(round_to_quarter(0.125), 0.0);
        assert_eq!(round_to_quarter(0.375), 0.25);
        // Just past the midpoint rounds up.
        assert_eq!(round_to_quarter(0.6251), 0.75);
    }

    #[test]
    fn test_negative_rounds_by_sign_flip() {
        assert_eq!(round_to_quarter(-0.625), -0.5);
        assert_eq!(round_to_quarter(-0.3), -0.25);
        assert_eq!(round_to_quarter(-0.1), 0.0);
    }

    #[test]
    fn test_non_finite_rounds_to_zero() {
        assert_eq!(round_to_quarter(f64::NAN), 0.0);
        assert_eq!(round_to_quarter(f64::INFINITY), 0.0);
        assert_eq!(round_to_quarter(f64::NEG_INFINITY), 0.0);
    }

    #[test]
    fn test_preserving_sum_truncates_when_total_matches() {
        let input = relief(&[
            (Team::A, 1.6),
            (Team::B, -1.6),
            (Team::C, 0.4),
            (Team::D, -0.4),
        ]);
        let rounded = round_preserving_sum(&input);
        assert_eq!(rounded.values().sum::<i64>(), 0);
        // Truncated bases already hit the target; no adjustments applied.
        assert_eq!(rounded[&Team::A], 1);
        assert_eq!(rounded[&Team::B], -1);
        assert_eq!(rounded[&Team::C], 0);
        assert_eq!(rounded[&Team::D], 0);
    }

    #[test]
    fn test_preserving_sum_credits_largest_residuals() {
        // Bases truncate to -2 while the exact total is 0; the two
        // largest residuals (B, C at 0.75) each gain a bed.
        let input = relief(&[
            (Team::A, 0.5),
            (Team::B, 0.75),
            (Team::C, 0.75),
            (Team::D, -2.0),
        ]);
        let rounded = round_preserving_sum(&input);
        assert_eq!(rounded.values().sum::<i64>(), 0);
        assert_eq!(rounded[&Team::A], 0);
        assert_eq!(rounded[&Team::B], 1);
        assert_eq!(rounded[&Team::C], 1);
        assert_eq!(rounded[&Team::D], -2);
    }

    #[test]
    fn test_preserving_sum_debits_most_negative_residuals() {
        // Bases truncate to 2 while the exact total is 0.
        let input = relief(&[
            (Team::A, 2.0),
            (Team::B, -0.5),
            (Team::C, -0.75),
            (Team::D, -0.75),
        ]);
        let rounded = round_preserving_sum(&input);
        assert_eq!(rounded.values().sum::<i64>(), 0);
        assert_eq!(rounded[&Team::A], 2);
        assert_eq!(rounded[&Team::B], 0);
        assert_eq!(rounded[&Team::C], -1);
        assert_eq!(rounded[&Team::D], -1);
    }

    #[test]
    fn test_preserving_sum_nonzero_total() {
        // Inputs sum to 5; independent truncation would give 3.
        let input = relief(&[(Team::A, 1.7), (Team::B, 1.7), (Team::C, 1.6)]);
        let rounded = round_preserving_sum(&input);
        assert_eq!(rounded.values().sum::<i64>(), 5);
        for (&team, &v) in &input {
            assert!((rounded[&team] as f64 - v).abs() < 1.0);
        }
    }

    #[test]
    fn test_preserving_sum_non_finite_treated_as_zero() {
        let input = relief(&[(Team::A, f64::NAN), (Team::B, 2.0), (Team::C, -2.0)]);
        let rounded = round_preserving_sum(&input);
        assert_eq!(rounded[&Team::A], 0);
        assert_eq!(rounded.values().sum::<i64>(), 0);
    }

    #[test]
    fn test_preserving_sum_empty() {
        let rounded = round_preserving_sum(&BTreeMap::new());
        assert!(rounded.is_empty());
    }

    proptest! {
        #[test]
        fn prop_quarter_multiple_and_idempotent(x in -100.0f64..100.0) {
            let r = round_to_quarter(x);
            let quarters = r * 4.0;
            prop_assert!((quarters - quarters.round()).abs() < 1e-9);
            prop_assert_eq!(round_to_quarter(r), r);
        }

        #[test]
        fn prop_quarter_within_half_unit(x in -100.0f64..100.0) {
            let r = round_to_quarter(x);
            prop_assert!((r - x).abs() <= 0.125 + 1e-9);
        }

        #[test]
        fn prop_preserving_sum_integer_totals(
            quarters in proptest::collection::vec(-40i64..40, 8)
        ) {
            // Quarter-unit inputs: the exact sum is always a multiple of
            // 0.25, so force it integral by padding the last team.
            let mut input = BTreeMap::new();
            for (i, &q) in quarters.iter().enumerate() {
                input.insert(Team::ALL[i], q as f64 * 0.25);
            }
            let frac_sum: f64 = input.values().sum();
            let fix = frac_sum - frac_sum.round();
            *input.get_mut(&Team::H).unwrap() -= fix;
            let exact_sum = frac_sum.round() as i64;

            let rounded = round_preserving_sum(&input);
            prop_assert_eq!(rounded.values().sum::<i64>(), exact_sum);
            for (&team, &v) in &input {
                prop_assert!((rounded[&team] as f64 - v).abs() < 1.0);
            }
        }
    }
}
