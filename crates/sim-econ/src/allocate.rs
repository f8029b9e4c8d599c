//! Softmax market-share allocation with catch-up correction.

use rust_decimal::Decimal;
use tracing::debug;

use crate::score::SegmentScore;
use sim_core::{Segment, TeamId, RUBBER_BAND_START_ROUND};

/// Softmax temperature. Load-bearing for game balance: lower values make a
/// segment winner-take-all, higher values flatten it. Do not retune without
/// re-running the balance harness.
pub const SOFTMAX_TEMPERATURE: f64 = 12.0;

/// Share boost for a team whose rolling average share is below half the
/// per-team average.
pub const RUBBER_BAND_BOOST: f64 = 1.15;

/// Share drag for a team above double the per-team average. Deliberately
/// smaller than the boost.
pub const RUBBER_BAND_DRAG: f64 = 0.92;

/// One team competing in a segment this round.
#[derive(Clone, Debug)]
pub struct SegmentEntrant {
    pub team: TeamId,
    pub score: SegmentScore,
    /// Rolling average of the team's overall share over recent rounds.
    pub rolling_share: f64,
    /// Price of the product serving this segment.
    pub price: Decimal,
}

/// Allocation result for one team in one segment.
#[derive(Clone, Debug)]
pub struct SegmentAllocation {
    pub team: TeamId,
    pub share: f64,
    pub units: u64,
    pub revenue: Decimal,
}

/// Exponentially weighted share split over raw scores. Max-subtracted for
/// numerical stability; empty input yields an empty split.
pub fn softmax_shares(scores: &[f64]) -> Vec<f64> {
    if scores.is_empty() {
        return Vec::new();
    }
    let max = scores.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    let exps: Vec<f64> = scores
        .iter()
        .map(|s| ((s - max) / SOFTMAX_TEMPERATURE).exp())
        .collect();
    let sum: f64 = exps.iter().sum();
    if sum <= 0.0 || !sum.is_finite() {
        // Degenerate scores: fall back to an even split.
        return vec![1.0 / scores.len() as f64; scores.len()];
    }
    exps.iter().map(|e| e / sum).collect()
}

/// Allocate one segment's demand across its eligible entrants.
///
/// Softmax over total scores, then (when enabled and from
/// [`RUBBER_BAND_START_ROUND`] onward) the post-hoc multiplicative catch-up
/// correction. If corrections push the share sum above 1 it is rescaled to
/// exactly 1, so per-segment shares always sum to ≤ 1 and stay ≥ 0.
///
/// A segment with no entrants yields an empty allocation; that is not an
/// error condition.
pub fn allocate_segment(
    segment: Segment,
    demand: f64,
    entrants: &[SegmentEntrant],
    round: u32,
    rubber_banding: bool,
) -> Vec<SegmentAllocation> {
    if entrants.is_empty() {
        return Vec::new();
    }
    let scores: Vec<f64> = entrants.iter().map(|e| e.score.total).collect();
    let mut shares = softmax_shares(&scores);

    if rubber_banding && round >= RUBBER_BAND_START_ROUND {
        let fair = 1.0 / entrants.len() as f64;
        for (share, entrant) in shares.iter_mut().zip(entrants) {
            if entrant.rolling_share < 0.5 * fair {
                *share *= RUBBER_BAND_BOOST;
            } else if entrant.rolling_share > 2.0 * fair {
                *share *= RUBBER_BAND_DRAG;
            }
        }
        let sum: f64 = shares.iter().sum();
        if sum > 1.0 {
            for share in &mut shares {
                *share /= sum;
            }
        }
    }

    let demand = demand.max(0.0);
    let allocations: Vec<SegmentAllocation> = entrants
        .iter()
        .zip(&shares)
        .map(|(entrant, &share)| {
            let units = (demand * share).floor() as u64;
            SegmentAllocation {
                team: entrant.team,
                share,
                units,
                revenue: Decimal::from(units) * entrant.price,
            }
        })
        .collect();
    debug!(%segment, demand, entrants = entrants.len(), "segment allocated");
    allocations
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn entrant(team: u32, total: f64, rolling: f64) -> SegmentEntrant {
        SegmentEntrant {
            team: TeamId(team),
            score: SegmentScore {
                price: 0.0,
                quality: 0.0,
                brand: 0.0,
                esg: 0.0,
                features: 0.0,
                total,
            },
            rolling_share: rolling,
            price: Decimal::new(400, 0),
        }
    }

    #[test]
    fn empty_segment_is_not_an_error() {
        let out = allocate_segment(Segment::Premium, 50_000.0, &[], 1, true);
        assert!(out.is_empty());
    }

    #[test]
    fn equal_scores_split_evenly() {
        let entrants = vec![entrant(0, 70.0, 0.25), entrant(1, 70.0, 0.25)];
        let out = allocate_segment(Segment::Standard, 90_000.0, &entrants, 1, false);
        assert!((out[0].share - 0.5).abs() < 1e-12);
        assert!((out[1].share - 0.5).abs() < 1e-12);
        assert_eq!(out[0].units, 45_000);
    }

    #[test]
    fn higher_score_takes_larger_share() {
        let entrants = vec![entrant(0, 90.0, 0.5), entrant(1, 60.0, 0.5)];
        let out = allocate_segment(Segment::Standard, 90_000.0, &entrants, 1, false);
        assert!(out[0].share > out[1].share);
        // 30-point gap at T=12 is decisive but not total capture.
        assert!(out[0].share < 1.0);
        assert!(out[1].share > 0.0);
    }

    #[test]
    fn rubber_band_boosts_trailing_team_after_start_round() {
        let entrants = vec![entrant(0, 80.0, 0.02), entrant(1, 80.0, 0.5)];
        let fair = allocate_segment(Segment::Standard, 90_000.0, &entrants, 3, true);
        let banded = allocate_segment(Segment::Standard, 90_000.0, &entrants, 4, true);
        assert!((fair[0].share - fair[1].share).abs() < 1e-12);
        assert!(banded[0].share > banded[1].share);
    }

    #[test]
    fn rubber_band_drags_runaway_leader() {
        // Two entrants: fair share 0.5, leader rolling above double (>1.0)
        // cannot happen with two teams, so use four entrants.
        let entrants = vec![
            entrant(0, 80.0, 0.9),
            entrant(1, 80.0, 0.1),
            entrant(2, 80.0, 0.1),
            entrant(3, 80.0, 0.1),
        ];
        let out = allocate_segment(Segment::Standard, 100_000.0, &entrants, 5, true);
        assert!(out[0].share < out[1].share);
    }

    #[test]
    fn disabled_rubber_banding_leaves_softmax_untouched() {
        let entrants = vec![entrant(0, 80.0, 0.0), entrant(1, 80.0, 0.9)];
        let out = allocate_segment(Segment::Standard, 90_000.0, &entrants, 10, false);
        assert!((out[0].share - out[1].share).abs() < 1e-12);
    }

    #[test]
    fn revenue_is_units_times_price() {
        let mut e = entrant(0, 75.0, 0.5);
        e.price = Decimal::new(250, 0);
        let out = allocate_segment(Segment::Budget, 10_000.0, &[e], 1, false);
        assert_eq!(out[0].units, 10_000);
        assert_eq!(out[0].revenue, Decimal::new(2_500_000, 0));
    }

    proptest! {
        #[test]
        fn shares_conserve_and_stay_nonnegative(
            scores in proptest::collection::vec(0.0f64..130.0, 1..8),
            rolling in proptest::collection::vec(0.0f64..1.0, 8),
            round in 0u32..12,
            demand in 0.0f64..500_000.0,
        ) {
            let entrants: Vec<SegmentEntrant> = scores
                .iter()
                .enumerate()
                .map(|(i, &s)| entrant(i as u32, s, rolling[i]))
                .collect();
            let out = allocate_segment(Segment::Standard, demand, &entrants, round, true);
            let sum: f64 = out.iter().map(|a| a.share).sum();
            prop_assert!(sum <= 1.0 + 1e-9, "shares sum to {sum}");
            for a in &out {
                prop_assert!(a.share >= 0.0);
            }
            let units: u64 = out.iter().map(|a| a.units).sum();
            prop_assert!((units as f64) <= demand + 1.0);
        }

        #[test]
        fn softmax_is_monotone_in_own_score(
            base in proptest::collection::vec(1.0f64..120.0, 2..6),
            bump in 0.1f64..30.0,
            idx in 0usize..6,
        ) {
            let idx = idx % base.len();
            let before = softmax_shares(&base);
            let mut raised = base.clone();
            raised[idx] += bump;
            let after = softmax_shares(&raised);
            prop_assert!(after[idx] >= before[idx] - 1e-12);
        }

        #[test]
        fn softmax_normalizes(scores in proptest::collection::vec(0.0f64..130.0, 1..10)) {
            let shares = softmax_shares(&scores);
            let sum: f64 = shares.iter().sum();
            prop_assert!((sum - 1.0).abs() < 1e-9);
        }
    }
}
