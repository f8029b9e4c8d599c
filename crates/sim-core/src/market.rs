//! Shared market state and segment definitions.
//!
//! Segments carry sharply different scoring-weight profiles on purpose:
//! they are what give each segment a distinct strategic identity, and the
//! weight tables below must not be tuned casually.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// A market sub-category with its own demand curve and scoring weights.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum Segment {
    /// Price-driven entry-level phones.
    Budget,
    /// The mainstream volume segment.
    Standard,
    /// High-end consumer devices; brand matters most here.
    Premium,
    /// Business and pro users; quality dominates.
    Professional,
}

impl Segment {
    /// All segments in scoring order.
    pub const ALL: [Segment; 4] = [
        Segment::Budget,
        Segment::Standard,
        Segment::Premium,
        Segment::Professional,
    ];

    /// Static demand/scoring profile for this segment.
    pub fn profile(self) -> SegmentProfile {
        match self {
            Segment::Budget => SegmentProfile {
                base_demand: 120_000.0,
                growth: 0.02,
                expected_quality: 40.0,
                expected_features: 30.0,
                price_floor: 80.0,
                price_ceiling: 250.0,
                weights: FactorWeights {
                    price: 45.0,
                    quality: 15.0,
                    brand: 15.0,
                    esg: 5.0,
                    features: 20.0,
                },
            },
            Segment::Standard => SegmentProfile {
                base_demand: 90_000.0,
                growth: 0.03,
                expected_quality: 60.0,
                expected_features: 50.0,
                price_floor: 250.0,
                price_ceiling: 600.0,
                weights: FactorWeights {
                    price: 30.0,
                    quality: 25.0,
                    brand: 20.0,
                    esg: 10.0,
                    features: 15.0,
                },
            },
            Segment::Premium => SegmentProfile {
                base_demand: 50_000.0,
                growth: 0.04,
                expected_quality: 75.0,
                expected_features: 70.0,
                price_floor: 600.0,
                price_ceiling: 1_100.0,
                weights: FactorWeights {
                    price: 15.0,
                    quality: 30.0,
                    brand: 30.0,
                    esg: 10.0,
                    features: 15.0,
                },
            },
            Segment::Professional => SegmentProfile {
                base_demand: 25_000.0,
                growth: 0.05,
                expected_quality: 85.0,
                expected_features: 80.0,
                price_floor: 900.0,
                price_ceiling: 1_600.0,
                weights: FactorWeights {
                    price: 10.0,
                    quality: 40.0,
                    brand: 20.0,
                    esg: 10.0,
                    features: 20.0,
                },
            },
        }
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Segment::Budget => "Budget",
            Segment::Standard => "Standard",
            Segment::Premium => "Premium",
            Segment::Professional => "Professional",
        };
        f.write_str(s)
    }
}

/// Scoring weights per factor. Sums to exactly 100 for every segment.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct FactorWeights {
    pub price: f64,
    pub quality: f64,
    pub brand: f64,
    pub esg: f64,
    pub features: f64,
}

impl FactorWeights {
    /// Weight total; 100 by construction.
    pub fn total(&self) -> f64 {
        self.price + self.quality + self.brand + self.esg + self.features
    }
}

/// Static per-segment parameters.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct SegmentProfile {
    /// Baseline demand in units per round at game start.
    pub base_demand: f64,
    /// Organic demand growth per round (e.g. 0.03 = 3%).
    pub growth: f64,
    /// Quality level the segment expects; scoring is linear up to it.
    pub expected_quality: f64,
    /// Feature level the segment expects.
    pub expected_features: f64,
    /// Lowest credible price; below 85% of it a penalty applies.
    pub price_floor: f64,
    /// Reference ceiling price before quality adjustment.
    pub price_ceiling: f64,
    /// Factor weights for competitive scoring.
    pub weights: FactorWeights,
}

/// Per-segment demand state that drifts round over round.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct SegmentDemand {
    /// Current baseline demand in units per round.
    pub base_demand: f64,
}

/// Shared, round-indexed market state. One value exists per round; all
/// teams' scoring reads it, nothing writes it mid-round.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MarketState {
    /// Round this state belongs to (0 = opening state).
    pub round: u32,
    /// Annualized GDP growth in percent (e.g. 2.5).
    pub gdp_growth: f64,
    /// Inflation in percent.
    pub inflation: f64,
    /// Consumer confidence index, baseline 100.
    pub confidence: f64,
    /// FX index for imported components, baseline 100.
    pub fx_index: f64,
    /// Current demand baseline per segment.
    pub segments: BTreeMap<Segment, SegmentDemand>,
    /// Price-competition pressure; rises 0.02 per round.
    pub price_competition: f64,
    /// Quality-expectation bar; rises 0.01 per round.
    pub quality_bar: f64,
    /// Sustainability premium scaling ESG scores; rises 0.015 per round.
    pub sustainability_premium: f64,
}

impl MarketState {
    /// Opening market state for round 0.
    pub fn initial() -> Self {
        let segments = Segment::ALL
            .iter()
            .map(|&s| {
                (
                    s,
                    SegmentDemand {
                        base_demand: s.profile().base_demand,
                    },
                )
            })
            .collect();
        Self {
            round: 0,
            gdp_growth: 2.5,
            inflation: 3.0,
            confidence: 100.0,
            fx_index: 100.0,
            segments,
            price_competition: 1.0,
            quality_bar: 1.0,
            sustainability_premium: 1.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn weights_sum_to_100_for_every_segment() {
        for seg in Segment::ALL {
            let total = seg.profile().weights.total();
            assert!(
                (total - 100.0).abs() < 1e-9,
                "{seg} weights sum to {total}"
            );
        }
    }

    #[test]
    fn budget_weights_price_professional_weights_quality() {
        let budget = Segment::Budget.profile().weights;
        let pro = Segment::Professional.profile().weights;
        assert!(budget.price > budget.quality);
        assert!(pro.quality > pro.price);
    }

    #[test]
    fn initial_state_covers_all_segments() {
        let m = MarketState::initial();
        assert_eq!(m.segments.len(), Segment::ALL.len());
        assert_eq!(m.round, 0);
    }

    #[test]
    fn market_state_serde_roundtrip() {
        let m = MarketState::initial();
        let s = serde_json::to_string(&m).unwrap();
        let back: MarketState = serde_json::from_str(&s).unwrap();
        assert_eq!(back.segments.len(), m.segments.len());
        assert_eq!(back.confidence, m.confidence);
    }
}
