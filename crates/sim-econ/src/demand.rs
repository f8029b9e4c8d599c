//! Per-segment demand derivation.

use rand::Rng;
use rand_chacha::ChaCha8Rng;

use sim_core::{MarketState, Segment};

/// Units demanded in `segment` this round.
///
/// Demand scales the segment's current baseline by the macro picture and a
/// bounded noise factor drawn from the round's market stream:
/// GDP growth lifts it, inflation damps it at half weight, consumer
/// confidence multiplies against its baseline of 100, and the segment's
/// organic growth adds its per-round increment. Never negative.
pub fn segment_demand(segment: Segment, market: &MarketState, rng: &mut ChaCha8Rng) -> f64 {
    let base = market
        .segments
        .get(&segment)
        .map(|d| d.base_demand)
        .unwrap_or(0.0);
    let noise: f64 = rng.gen_range(0.9..=1.1);
    let demand = base
        * (1.0 + market.gdp_growth / 100.0)
        * (market.confidence / 100.0)
        * (1.0 - market.inflation / 100.0 * 0.5)
        * (1.0 + segment.profile().growth)
        * noise;
    demand.max(0.0)
}
