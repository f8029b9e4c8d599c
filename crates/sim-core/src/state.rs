//! Team economic state.
//!
//! `TeamState` is a value type: each round produces a new state, so stale
//! references from earlier rounds stay valid for auditing and history.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::market::Segment;

/// Unique identifier for a team within one game.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct TeamId(pub u32);

impl fmt::Display for TeamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A production site.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Factory {
    /// Nominal output in units per round at full staffing.
    pub capacity: u64,
    /// Automation level in [0, 1]; raises effective capacity.
    pub automation: f64,
}

/// A phone model offered to one segment.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Product {
    /// Segment this product competes in.
    pub segment: Segment,
    /// Retail price.
    pub price: Decimal,
    /// Build quality in [0, 100].
    pub quality: f64,
    /// Feature level in [0, 100].
    pub features: f64,
    /// Share of total production assigned to this product.
    pub allocation: f64,
    /// Per-unit component cost, set by the materials processor each round.
    pub unit_cost: Decimal,
}

/// Workforce summary.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Workforce {
    pub workers: u32,
    pub engineers: u32,
    /// Morale in [0, 1]; drives R&D output and attrition.
    pub morale: f64,
}

/// A team's complete economic snapshot.
///
/// Cash may go negative; that flags bankruptcy, it is not an error, and a
/// bankrupt team keeps playing.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TeamState {
    pub id: TeamId,
    pub name: String,
    pub cash: Decimal,
    pub debt: Decimal,
    /// Revenue recognized in the most recent processed round.
    pub revenue: Decimal,
    /// Net income of the most recent processed round.
    pub net_income: Decimal,
    /// Cumulative revenue across all rounds.
    pub total_revenue: Decimal,
    /// Brand value in [0, 1].
    pub brand: f64,
    /// ESG score in [0, 100].
    pub esg: f64,
    /// Share held per segment after the latest allocation.
    pub market_share: BTreeMap<Segment, f64>,
    /// Overall average share per past round; feeds rubber-banding.
    pub share_history: Vec<f64>,
    pub factories: Vec<Factory>,
    pub products: Vec<Product>,
    pub workforce: Workforce,
    pub bankrupt: bool,
    /// Round in which cash first dropped below zero.
    pub bankrupt_round: Option<u32>,
    pub units_sold_total: u64,
}

impl TeamState {
    /// Default opening book: every team starts identical.
    pub fn starting(id: TeamId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            cash: Decimal::new(20_000_000, 0),
            debt: Decimal::ZERO,
            revenue: Decimal::ZERO,
            net_income: Decimal::ZERO,
            total_revenue: Decimal::ZERO,
            brand: 0.3,
            esg: 30.0,
            market_share: BTreeMap::new(),
            share_history: Vec::new(),
            factories: vec![Factory {
                capacity: 40_000,
                automation: 0.2,
            }],
            products: vec![Product {
                segment: Segment::Standard,
                price: Decimal::new(400, 0),
                quality: 55.0,
                features: 45.0,
                allocation: 1.0,
                unit_cost: Decimal::ZERO,
            }],
            workforce: Workforce {
                workers: 250,
                engineers: 20,
                morale: 0.7,
            },
            bankrupt: false,
            bankrupt_round: None,
            units_sold_total: 0,
        }
    }

    /// Effective output capacity in units per round: nominal capacity scaled
    /// by staffing coverage (200 workers per factory for full output) and
    /// automation.
    pub fn effective_capacity(&self) -> f64 {
        let nominal: u64 = self.factories.iter().map(|f| f.capacity).sum();
        if nominal == 0 {
            return 0.0;
        }
        let required = 200.0 * self.factories.len() as f64;
        let staffing = (self.workforce.workers as f64 / required).min(1.0);
        let automation = self
            .factories
            .iter()
            .map(|f| f.automation)
            .sum::<f64>()
            / self.factories.len() as f64;
        nominal as f64 * staffing * (1.0 + 0.3 * automation)
    }

    /// Mean share across the segments this team competed in; 0 if none.
    pub fn overall_share(&self) -> f64 {
        if self.market_share.is_empty() {
            return 0.0;
        }
        self.market_share.values().sum::<f64>() / self.market_share.len() as f64
    }

    /// First product serving `segment`, if any. A team with no product in a
    /// segment is simply ineligible there.
    pub fn product_for(&self, segment: Segment) -> Option<&Product> {
        self.products.iter().find(|p| p.segment == segment)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn starting_state_is_solvent_and_staffed() {
        let t = TeamState::starting(TeamId(0), "Alpha");
        assert!(t.cash > Decimal::ZERO);
        assert!(!t.bankrupt);
        assert!(t.effective_capacity() > 0.0);
        assert_eq!(t.overall_share(), 0.0);
    }

    #[test]
    fn team_state_serde_roundtrip() {
        let mut t = TeamState::starting(TeamId(3), "Gamma");
        t.market_share.insert(Segment::Standard, 0.25);
        let s = serde_json::to_string(&t).unwrap();
        let back: TeamState = serde_json::from_str(&s).unwrap();
        assert_eq!(back.id, TeamId(3));
        assert_eq!(back.market_share.get(&Segment::Standard), Some(&0.25));
    }

    #[test]
    fn capacity_scales_with_staffing() {
        let mut t = TeamState::starting(TeamId(0), "A");
        let full = t.effective_capacity();
        t.workforce.workers = 100; // half of the 200 required
        assert!(t.effective_capacity() < full);
        t.factories.clear();
        assert_eq!(t.effective_capacity(), 0.0);
    }

    proptest! {
        #[test]
        fn overall_share_bounded(shares in proptest::collection::vec(0.0f64..=1.0, 1..4)) {
            let mut t = TeamState::starting(TeamId(1), "B");
            for (i, s) in shares.iter().enumerate() {
                t.market_share.insert(Segment::ALL[i], *s);
            }
            let avg = t.overall_share();
            prop_assert!((0.0..=1.0).contains(&avg));
        }
    }
}
