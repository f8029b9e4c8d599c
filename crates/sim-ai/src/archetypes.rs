//! The built-in strategy archetypes.
//!
//! All five read the same inputs and produce a full decision bundle; they
//! differ in where the cash goes. Budgets are fractions of current cash so
//! a struggling team automatically retrenches, and every bundle passes
//! `validate_bundle` for the team it was computed from.

use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use std::collections::BTreeMap;

use sim_core::{
    DecisionBundle, FactoryDecision, FinanceDecision, MarketState, MarketingDecision,
    ProductLaunch, RdDecision, Segment, TeamState, WorkforceDecision,
};

/// A percentage of cash, zero when the till is empty or negative.
fn portion(cash: Decimal, percent: u32) -> Decimal {
    if cash <= Decimal::ZERO {
        return Decimal::ZERO;
    }
    (cash * Decimal::from(percent) / Decimal::from(100u32)).round_dp(2)
}

/// Price at `position` within the segment's floor..ceiling window.
fn price_at(segment: Segment, position: f64) -> Decimal {
    let profile = segment.profile();
    let price = profile.price_floor + position * (profile.price_ceiling - profile.price_floor);
    Decimal::from_f64(price).unwrap_or(Decimal::ONE).round_dp(2)
}

/// Reposition every product within its segment's price window.
fn reprice_all(team: &TeamState, position: f64) -> Vec<(usize, Decimal)> {
    team.products
        .iter()
        .enumerate()
        .map(|(i, p)| (i, price_at(p.segment, position)))
        .collect()
}

/// Even production split across all products.
fn equal_allocations(team: &TeamState) -> Option<Vec<f64>> {
    let n = team.products.len();
    if n == 0 {
        return None;
    }
    Some(vec![1.0 / n as f64; n])
}

/// Production split favoring `favored` with the given weight, remainder
/// spread evenly. Falls back to an even split if the segment is absent.
fn favored_allocations(team: &TeamState, favored: Segment, weight: f64) -> Option<Vec<f64>> {
    let n = team.products.len();
    if n == 0 {
        return None;
    }
    if n == 1 || !team.products.iter().any(|p| p.segment == favored) {
        return equal_allocations(team);
    }
    let rest = (1.0 - weight) / (n - 1) as f64;
    Some(
        team.products
            .iter()
            .map(|p| if p.segment == favored { weight } else { rest })
            .collect(),
    )
}

/// Workers needed to fully staff the factory floor.
fn staffing_gap(team: &TeamState, cap: i32) -> i32 {
    let target = 200 * team.factories.len() as i32;
    (target - team.workforce.workers as i32).clamp(0, cap)
}

fn ads(pairs: &[(Segment, Decimal)]) -> BTreeMap<Segment, Decimal> {
    pairs
        .iter()
        .filter(|(_, b)| *b > Decimal::ZERO)
        .cloned()
        .collect()
}

/// Spreads spending evenly across every department.
pub fn balanced(team: &TeamState, _market: &MarketState, _round: u32) -> DecisionBundle {
    let cash = team.cash;
    let served: Vec<Segment> = team.products.iter().map(|p| p.segment).collect();
    let per_segment = portion(cash, 10) / Decimal::from(served.len().max(1) as u64);
    DecisionBundle {
        materials: None,
        factory: Some(FactoryDecision {
            build: 0,
            automation_budget: portion(cash, 8),
        }),
        workforce: Some(WorkforceDecision {
            hire_workers: staffing_gap(team, 50),
            hire_engineers: 0,
            training_budget: portion(cash, 3),
        }),
        rd: Some(RdDecision {
            budget: portion(cash, 12),
            product: 0,
            quality_split: 0.5,
            launch: None,
        }),
        marketing: Some(MarketingDecision {
            ad_budget: served.iter().map(|&s| (s, per_segment)).collect(),
            esg_budget: portion(cash, 3),
            price_overrides: reprice_all(team, 0.5),
        }),
        finance: Some(FinanceDecision {
            loan_draw: Decimal::ZERO,
            loan_repay: if team.debt > Decimal::ZERO {
                portion(cash, 5)
            } else {
                Decimal::ZERO
            },
        }),
        allocations: equal_allocations(team),
    }
}

/// Chases unit volume: cheap prices, automation, a staffed floor, and
/// low-end advertising.
pub fn volume(team: &TeamState, _market: &MarketState, round: u32) -> DecisionBundle {
    let cash = team.cash;
    let build = u32::from(round >= 2 && team.factories.len() < 4 && cash > Decimal::new(15_000_000, 0));
    let launch = (round >= 1 && team.product_for(Segment::Budget).is_none()).then(|| ProductLaunch {
        segment: Segment::Budget,
        price: price_at(Segment::Budget, 0.15),
    });
    DecisionBundle {
        materials: Some(sim_core::MaterialsDecision {
            bulk_order_budget: portion(cash, 2),
        }),
        factory: Some(FactoryDecision {
            build,
            automation_budget: portion(cash, 15),
        }),
        workforce: Some(WorkforceDecision {
            hire_workers: staffing_gap(team, 150),
            hire_engineers: 0,
            training_budget: portion(cash, 2),
        }),
        rd: Some(RdDecision {
            budget: portion(cash, 5),
            product: 0,
            quality_split: 0.3,
            launch,
        }),
        marketing: Some(MarketingDecision {
            ad_budget: ads(&[
                (Segment::Budget, portion(cash, 7)),
                (Segment::Standard, portion(cash, 5)),
            ]),
            esg_budget: portion(cash, 1),
            price_overrides: reprice_all(team, 0.08),
        }),
        finance: Some(FinanceDecision {
            loan_draw: Decimal::ZERO,
            loan_repay: Decimal::ZERO,
        }),
        allocations: favored_allocations(team, Segment::Budget, 0.6),
    }
}

/// Premium positioning: engineers, R&D and top-segment advertising behind
/// near-ceiling prices.
pub fn premium(team: &TeamState, _market: &MarketState, round: u32) -> DecisionBundle {
    let cash = team.cash;
    let best_quality = team
        .products
        .iter()
        .map(|p| p.quality)
        .fold(0.0f64, f64::max);
    let launch = if round >= 2 && team.product_for(Segment::Premium).is_none() {
        Some(ProductLaunch {
            segment: Segment::Premium,
            price: price_at(Segment::Premium, 0.9),
        })
    } else if best_quality >= 80.0 && team.product_for(Segment::Professional).is_none() {
        Some(ProductLaunch {
            segment: Segment::Professional,
            price: price_at(Segment::Professional, 0.9),
        })
    } else {
        None
    };
    let hire_engineers = if team.workforce.engineers < 60 { 10 } else { 0 };
    DecisionBundle {
        materials: None,
        factory: Some(FactoryDecision {
            build: 0,
            automation_budget: portion(cash, 4),
        }),
        workforce: Some(WorkforceDecision {
            hire_workers: staffing_gap(team, 30),
            hire_engineers,
            training_budget: portion(cash, 5),
        }),
        rd: Some(RdDecision {
            budget: portion(cash, 20),
            product: 0,
            quality_split: 0.7,
            launch,
        }),
        marketing: Some(MarketingDecision {
            ad_budget: ads(&[
                (Segment::Premium, portion(cash, 9)),
                (Segment::Professional, portion(cash, 6)),
            ]),
            esg_budget: portion(cash, 5),
            price_overrides: reprice_all(team, 0.9),
        }),
        finance: Some(FinanceDecision {
            loan_draw: Decimal::ZERO,
            loan_repay: if team.debt > Decimal::ZERO {
                portion(cash, 4)
            } else {
                Decimal::ZERO
            },
        }),
        allocations: favored_allocations(team, Segment::Premium, 0.5),
    }
}

/// R&D-first: climbs the segment ladder as soon as quality clears the bar.
pub fn innovator(team: &TeamState, _market: &MarketState, _round: u32) -> DecisionBundle {
    let cash = team.cash;
    let best_quality = team
        .products
        .iter()
        .map(|p| p.quality)
        .fold(0.0f64, f64::max);
    // Launch into the lowest unserved segment whose expectations are within
    // reach of current quality.
    let launch = Segment::ALL
        .iter()
        .find(|&&segment| {
            team.product_for(segment).is_none()
                && best_quality >= segment.profile().expected_quality * 0.85
        })
        .map(|&segment| ProductLaunch {
            segment,
            price: price_at(segment, 0.7),
        });
    let hire_engineers = if team.workforce.engineers < 80 { 12 } else { 0 };
    let served: Vec<Segment> = team.products.iter().map(|p| p.segment).collect();
    let per_segment = portion(cash, 6) / Decimal::from(served.len().max(1) as u64);
    DecisionBundle {
        materials: None,
        factory: Some(FactoryDecision {
            build: 0,
            automation_budget: portion(cash, 5),
        }),
        workforce: Some(WorkforceDecision {
            hire_workers: staffing_gap(team, 40),
            hire_engineers,
            training_budget: portion(cash, 4),
        }),
        rd: Some(RdDecision {
            budget: portion(cash, 28),
            product: 0,
            quality_split: 0.6,
            launch,
        }),
        marketing: Some(MarketingDecision {
            ad_budget: served.iter().map(|&s| (s, per_segment)).collect(),
            esg_budget: portion(cash, 2),
            price_overrides: reprice_all(team, 0.6),
        }),
        finance: Some(FinanceDecision {
            loan_draw: Decimal::ZERO,
            loan_repay: Decimal::ZERO,
        }),
        allocations: equal_allocations(team),
    }
}

/// Spends almost nothing, clears debt first, prices mid-window.
pub fn frugal(team: &TeamState, _market: &MarketState, _round: u32) -> DecisionBundle {
    let cash = team.cash;
    DecisionBundle {
        materials: None,
        factory: Some(FactoryDecision {
            build: 0,
            automation_budget: Decimal::ZERO,
        }),
        workforce: Some(WorkforceDecision {
            hire_workers: 0,
            hire_engineers: 0,
            training_budget: portion(cash, 1),
        }),
        rd: Some(RdDecision {
            budget: portion(cash, 4),
            product: 0,
            quality_split: 0.5,
            launch: None,
        }),
        marketing: Some(MarketingDecision {
            ad_budget: ads(&[(Segment::Standard, portion(cash, 4))]),
            esg_budget: Decimal::ZERO,
            price_overrides: reprice_all(team, 0.45),
        }),
        finance: Some(FinanceDecision {
            loan_draw: Decimal::ZERO,
            loan_repay: team.debt.min(portion(cash, 10)),
        }),
        allocations: equal_allocations(team),
    }
}
