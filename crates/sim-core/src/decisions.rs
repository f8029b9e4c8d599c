//! Per-round decision bundles and caller-side validation.
//!
//! Validation happens before a bundle reaches the orchestrator; the
//! orchestrator assumes valid input and does not re-validate.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

use crate::market::Segment;

/// Materials / procurement instructions.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct MaterialsDecision {
    /// Budget for bulk component orders; buys a unit-cost discount this round.
    pub bulk_order_budget: Decimal,
}

/// Factory construction and upgrades.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct FactoryDecision {
    /// Number of new factories to build this round.
    pub build: u32,
    /// Budget for automation upgrades across existing factories.
    pub automation_budget: Decimal,
}

/// Hiring, firing and training.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct WorkforceDecision {
    /// Positive hires, negative lays off.
    pub hire_workers: i32,
    /// Positive hires, negative lays off.
    pub hire_engineers: i32,
    pub training_budget: Decimal,
}

/// A new product to launch, created by the R&D department.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ProductLaunch {
    pub segment: Segment,
    pub price: Decimal,
}

/// R&D budget and focus.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct RdDecision {
    pub budget: Decimal,
    /// Index into the team's product list receiving the improvements.
    pub product: usize,
    /// Fraction of progress applied to quality; the rest goes to features.
    pub quality_split: f64,
    /// Optional product launch into a new segment.
    pub launch: Option<ProductLaunch>,
}

/// Advertising, ESG campaigns and pricing.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct MarketingDecision {
    /// Advertising budget per segment.
    pub ad_budget: BTreeMap<Segment, Decimal>,
    pub esg_budget: Decimal,
    /// (product index, new price) pairs applied this round.
    pub price_overrides: Vec<(usize, Decimal)>,
}

/// Debt management.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct FinanceDecision {
    pub loan_draw: Decimal,
    pub loan_repay: Decimal,
}

/// A team's complete instructions for one round. Every department is
/// optional; an absent sub-bundle means "no action".
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct DecisionBundle {
    pub materials: Option<MaterialsDecision>,
    pub factory: Option<FactoryDecision>,
    pub workforce: Option<WorkforceDecision>,
    pub rd: Option<RdDecision>,
    pub marketing: Option<MarketingDecision>,
    pub finance: Option<FinanceDecision>,
    /// Production allocation fractions, one per product, summing to 1.
    pub allocations: Option<Vec<f64>>,
}

impl DecisionBundle {
    /// The zero-effect bundle applied in a degraded round.
    pub fn passive() -> Self {
        Self::default()
    }
}

/// Validation failures for decision bundles. These are caller errors and
/// fail fast; they never occur inside a running simulation.
#[derive(Debug, Error, PartialEq)]
pub enum DecisionError {
    #[error("allocation count {got} does not match product count {expected}")]
    AllocationCount { got: usize, expected: usize },
    #[error("allocations sum to {0}, expected 1.0")]
    AllocationSum(f64),
    #[error("allocation fraction {0} is out of [0, 1]")]
    AllocationRange(f64),
    #[error("negative or non-finite budget in {0}")]
    InvalidBudget(&'static str),
    #[error("quality split {0} is out of [0, 1]")]
    QualitySplit(f64),
    #[error("product index {index} out of range (team has {count} products)")]
    ProductIndex { index: usize, count: usize },
    #[error("price override must be positive, got {0}")]
    NonPositivePrice(Decimal),
}

fn check_budget(amount: Decimal, department: &'static str) -> Result<(), DecisionError> {
    if amount < Decimal::ZERO {
        return Err(DecisionError::InvalidBudget(department));
    }
    Ok(())
}

/// Validate business-rule invariants on a bundle against the team's current
/// product count. The UI/API layer (or the harness) calls this before
/// handing decisions to the orchestrator.
pub fn validate_bundle(bundle: &DecisionBundle, product_count: usize) -> Result<(), DecisionError> {
    if let Some(allocations) = &bundle.allocations {
        if allocations.len() != product_count {
            return Err(DecisionError::AllocationCount {
                got: allocations.len(),
                expected: product_count,
            });
        }
        for &a in allocations {
            if !a.is_finite() || !(0.0..=1.0).contains(&a) {
                return Err(DecisionError::AllocationRange(a));
            }
        }
        let sum: f64 = allocations.iter().sum();
        if (sum - 1.0).abs() > 1e-6 {
            return Err(DecisionError::AllocationSum(sum));
        }
    }
    if let Some(m) = &bundle.materials {
        check_budget(m.bulk_order_budget, "materials")?;
    }
    if let Some(f) = &bundle.factory {
        check_budget(f.automation_budget, "factory")?;
    }
    if let Some(w) = &bundle.workforce {
        check_budget(w.training_budget, "workforce")?;
    }
    if let Some(rd) = &bundle.rd {
        check_budget(rd.budget, "rd")?;
        if !rd.quality_split.is_finite() || !(0.0..=1.0).contains(&rd.quality_split) {
            return Err(DecisionError::QualitySplit(rd.quality_split));
        }
        if rd.product >= product_count && product_count > 0 {
            return Err(DecisionError::ProductIndex {
                index: rd.product,
                count: product_count,
            });
        }
        if let Some(launch) = &rd.launch {
            if launch.price <= Decimal::ZERO {
                return Err(DecisionError::NonPositivePrice(launch.price));
            }
        }
    }
    if let Some(mkt) = &bundle.marketing {
        for budget in mkt.ad_budget.values() {
            check_budget(*budget, "marketing")?;
        }
        check_budget(mkt.esg_budget, "marketing")?;
        for (index, price) in &mkt.price_overrides {
            if *index >= product_count {
                return Err(DecisionError::ProductIndex {
                    index: *index,
                    count: product_count,
                });
            }
            if *price <= Decimal::ZERO {
                return Err(DecisionError::NonPositivePrice(*price));
            }
        }
    }
    if let Some(fin) = &bundle.finance {
        check_budget(fin.loan_draw, "finance")?;
        check_budget(fin.loan_repay, "finance")?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn passive_bundle_is_valid_for_any_product_count() {
        assert!(validate_bundle(&DecisionBundle::passive(), 0).is_ok());
        assert!(validate_bundle(&DecisionBundle::passive(), 3).is_ok());
    }

    #[test]
    fn allocations_must_sum_to_one() {
        let bundle = DecisionBundle {
            allocations: Some(vec![0.5, 0.3]),
            ..Default::default()
        };
        assert_eq!(
            validate_bundle(&bundle, 2),
            Err(DecisionError::AllocationSum(0.8))
        );
        let ok = DecisionBundle {
            allocations: Some(vec![0.5, 0.5]),
            ..Default::default()
        };
        assert!(validate_bundle(&ok, 2).is_ok());
    }

    #[test]
    fn allocation_count_must_match_products() {
        let bundle = DecisionBundle {
            allocations: Some(vec![1.0]),
            ..Default::default()
        };
        assert_eq!(
            validate_bundle(&bundle, 2),
            Err(DecisionError::AllocationCount { got: 1, expected: 2 })
        );
    }

    #[test]
    fn negative_budget_rejected() {
        let bundle = DecisionBundle {
            rd: Some(RdDecision {
                budget: Decimal::new(-1, 0),
                ..Default::default()
            }),
            ..Default::default()
        };
        assert_eq!(
            validate_bundle(&bundle, 1),
            Err(DecisionError::InvalidBudget("rd"))
        );
    }

    #[test]
    fn price_override_bounds_checked() {
        let bundle = DecisionBundle {
            marketing: Some(MarketingDecision {
                price_overrides: vec![(2, Decimal::new(100, 0))],
                ..Default::default()
            }),
            ..Default::default()
        };
        assert_eq!(
            validate_bundle(&bundle, 1),
            Err(DecisionError::ProductIndex { index: 2, count: 1 })
        );
    }
}
