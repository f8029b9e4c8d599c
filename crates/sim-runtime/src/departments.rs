//! Default department processors.
//!
//! The orchestrator treats processors as opaque; these six are the stock
//! implementations the balance harness runs against. Each is a stateless
//! unit struct, pure given its inputs and RNG stream, and each must be
//! infallible when handed the passive decision bundle.

use rand::Rng;
use rand_chacha::ChaCha8Rng;
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;

use sim_core::{
    DecisionBundle, Department, MarketState, ModuleError, ModuleOutcome, ModuleProcessor, Product,
    TeamState,
};

const FACTORY_BUILD_COST: Decimal = Decimal::from_parts(2_000_000, 0, 0, false, 0);
const FACTORY_CAPACITY: u64 = 20_000;
const FACTORY_START_AUTOMATION: f64 = 0.1;
const FACTORY_MAINTENANCE: Decimal = Decimal::from_parts(50_000, 0, 0, false, 0);
const MAX_FACTORIES: usize = 8;
const AUTOMATION_STEP_COST: Decimal = Decimal::from_parts(500_000, 0, 0, false, 0);
const AUTOMATION_STEP: f64 = 0.05;

const WORKER_SALARY: Decimal = Decimal::from_parts(5_000, 0, 0, false, 0);
const ENGINEER_SALARY: Decimal = Decimal::from_parts(12_000, 0, 0, false, 0);
const WORKER_HIRE_COST: Decimal = Decimal::from_parts(2_000, 0, 0, false, 0);
const ENGINEER_HIRE_COST: Decimal = Decimal::from_parts(5_000, 0, 0, false, 0);
const WORKER_SEVERANCE: Decimal = Decimal::from_parts(1_000, 0, 0, false, 0);
const ENGINEER_SEVERANCE: Decimal = Decimal::from_parts(3_000, 0, 0, false, 0);

const PRODUCT_LAUNCH_COST: Decimal = Decimal::from_parts(1_000_000, 0, 0, false, 0);
const LOAN_DRAW_LIMIT: Decimal = Decimal::from_parts(10_000_000, 0, 0, false, 0);
const LOAN_INTEREST_RATE: f64 = 0.02;

fn money(amount: f64, department: Department) -> Result<Decimal, ModuleError> {
    Decimal::from_f64(amount)
        .ok_or(ModuleError::NonFinite(department))
        .map(|d| d.round_dp(2))
}

fn as_f64(amount: Decimal) -> f64 {
    amount.to_f64().unwrap_or(0.0)
}

/// Component sourcing: sets each product's per-unit cost for the round.
pub struct MaterialsProcessor;

impl ModuleProcessor for MaterialsProcessor {
    fn department(&self) -> Department {
        Department::Materials
    }

    fn process(
        &self,
        team: &TeamState,
        decisions: &DecisionBundle,
        market: &MarketState,
        _round: u32,
        rng: &mut ChaCha8Rng,
    ) -> Result<ModuleOutcome, ModuleError> {
        let mut state = team.clone();
        let mut costs = Decimal::ZERO;
        let mut messages = Vec::new();

        let mut discount = 1.0;
        if let Some(m) = &decisions.materials {
            if m.bulk_order_budget > Decimal::ZERO {
                state.cash -= m.bulk_order_budget;
                costs += m.bulk_order_budget;
                discount = 0.95;
                messages.push(format!(
                    "bulk component order placed ({}), unit costs -5%",
                    m.bulk_order_budget
                ));
            }
        }

        // Supply-chain jitter is shared across the team's products this round.
        let jitter: f64 = rng.gen_range(0.97..=1.03);
        for product in &mut state.products {
            let unit = (20.0 + 2.5 * product.quality)
                * (1.0 + market.inflation / 100.0)
                * (market.fx_index / 100.0)
                * discount
                * jitter;
            product.unit_cost = money(unit, Department::Materials)?;
        }

        Ok(ModuleOutcome {
            state,
            costs,
            revenue: Decimal::ZERO,
            messages,
        })
    }
}

/// Production planning, construction and automation upgrades.
pub struct FactoryProcessor;

impl ModuleProcessor for FactoryProcessor {
    fn department(&self) -> Department {
        Department::Factory
    }

    fn process(
        &self,
        team: &TeamState,
        decisions: &DecisionBundle,
        _market: &MarketState,
        _round: u32,
        rng: &mut ChaCha8Rng,
    ) -> Result<ModuleOutcome, ModuleError> {
        let mut state = team.clone();
        let mut costs = Decimal::ZERO;
        let mut messages = Vec::new();

        if let Some(allocations) = &decisions.allocations {
            for (product, &allocation) in state.products.iter_mut().zip(allocations) {
                product.allocation = allocation;
            }
        }

        if let Some(f) = &decisions.factory {
            if f.build > 0 {
                if state.factories.len() + f.build as usize > MAX_FACTORIES {
                    return Err(ModuleError::InvalidDecision {
                        department: Department::Factory,
                        reason: format!(
                            "building {} factories would exceed the {MAX_FACTORIES}-site limit",
                            f.build
                        ),
                    });
                }
                let overrun: f64 = rng.gen_range(0.95..=1.10);
                let build_cost = (FACTORY_BUILD_COST * Decimal::from(f.build)
                    * money(overrun, Department::Factory)?)
                .round_dp(2);
                state.cash -= build_cost;
                costs += build_cost;
                for _ in 0..f.build {
                    state.factories.push(sim_core::Factory {
                        capacity: FACTORY_CAPACITY,
                        automation: FACTORY_START_AUTOMATION,
                    });
                }
                messages.push(format!("built {} factory(ies) for {}", f.build, build_cost));
            }
            if f.automation_budget >= AUTOMATION_STEP_COST {
                let steps = (f.automation_budget / AUTOMATION_STEP_COST)
                    .floor()
                    .to_u32()
                    .unwrap_or(0);
                let spent = AUTOMATION_STEP_COST * Decimal::from(steps);
                state.cash -= spent;
                costs += spent;
                for _ in 0..steps {
                    if let Some(factory) = state
                        .factories
                        .iter_mut()
                        .min_by(|a, b| a.automation.total_cmp(&b.automation))
                    {
                        factory.automation = (factory.automation + AUTOMATION_STEP).min(1.0);
                    }
                }
                messages.push(format!("{steps} automation upgrade(s) installed"));
            }
        }

        let maintenance = FACTORY_MAINTENANCE * Decimal::from(state.factories.len() as u64);
        state.cash -= maintenance;
        costs += maintenance;

        Ok(ModuleOutcome {
            state,
            costs,
            revenue: Decimal::ZERO,
            messages,
        })
    }
}

/// Hiring, salaries, training and morale-driven attrition.
pub struct WorkforceProcessor;

impl ModuleProcessor for WorkforceProcessor {
    fn department(&self) -> Department {
        Department::Workforce
    }

    fn process(
        &self,
        team: &TeamState,
        decisions: &DecisionBundle,
        _market: &MarketState,
        _round: u32,
        rng: &mut ChaCha8Rng,
    ) -> Result<ModuleOutcome, ModuleError> {
        let mut state = team.clone();
        let mut costs = Decimal::ZERO;
        let mut messages = Vec::new();

        if let Some(w) = &decisions.workforce {
            if w.hire_workers != 0 {
                let count = w.hire_workers.unsigned_abs();
                let unit = if w.hire_workers > 0 {
                    WORKER_HIRE_COST
                } else {
                    WORKER_SEVERANCE
                };
                let amount = unit * Decimal::from(count);
                state.cash -= amount;
                costs += amount;
                state.workforce.workers =
                    (state.workforce.workers as i64 + w.hire_workers as i64).max(0) as u32;
            }
            if w.hire_engineers != 0 {
                let count = w.hire_engineers.unsigned_abs();
                let unit = if w.hire_engineers > 0 {
                    ENGINEER_HIRE_COST
                } else {
                    ENGINEER_SEVERANCE
                };
                let amount = unit * Decimal::from(count);
                state.cash -= amount;
                costs += amount;
                state.workforce.engineers =
                    (state.workforce.engineers as i64 + w.hire_engineers as i64).max(0) as u32;
            }
            if w.training_budget > Decimal::ZERO {
                state.cash -= w.training_budget;
                costs += w.training_budget;
                let lift = as_f64(w.training_budget) / 1_000_000.0 * 0.1;
                state.workforce.morale = (state.workforce.morale + lift).min(1.0);
            } else {
                state.workforce.morale = (state.workforce.morale - 0.02).max(0.0);
            }
        } else {
            state.workforce.morale = (state.workforce.morale - 0.02).max(0.0);
        }

        let salaries = WORKER_SALARY * Decimal::from(state.workforce.workers)
            + ENGINEER_SALARY * Decimal::from(state.workforce.engineers);
        state.cash -= salaries;
        costs += salaries;

        if state.workforce.morale < 0.5 && state.workforce.workers > 0 {
            let severity: f64 = rng.gen_range(0.5..=1.5);
            let rate = (0.5 - state.workforce.morale) * 0.2 * severity;
            let lost = (state.workforce.workers as f64 * rate).floor() as u32;
            if lost > 0 {
                state.workforce.workers -= lost;
                messages.push(format!("{lost} workers quit over low morale"));
            }
        }

        Ok(ModuleOutcome {
            state,
            costs,
            revenue: Decimal::ZERO,
            messages,
        })
    }
}

/// Product development: quality/feature progress and new-product launches.
pub struct ResearchProcessor;

impl ModuleProcessor for ResearchProcessor {
    fn department(&self) -> Department {
        Department::Research
    }

    fn process(
        &self,
        team: &TeamState,
        decisions: &DecisionBundle,
        _market: &MarketState,
        _round: u32,
        rng: &mut ChaCha8Rng,
    ) -> Result<ModuleOutcome, ModuleError> {
        let mut state = team.clone();
        let mut costs = Decimal::ZERO;
        let mut messages = Vec::new();

        let Some(rd) = &decisions.rd else {
            return Ok(ModuleOutcome::unchanged(state));
        };

        if rd.budget > Decimal::ZERO {
            if rd.product >= state.products.len() {
                return Err(ModuleError::InvalidDecision {
                    department: Department::Research,
                    reason: format!(
                        "product index {} out of range ({} products)",
                        rd.product,
                        state.products.len()
                    ),
                });
            }
            state.cash -= rd.budget;
            costs += rd.budget;
            let yield_jitter: f64 = rng.gen_range(0.9..=1.1);
            let progress = (as_f64(rd.budget) / 250_000.0).sqrt()
                * (1.0 + state.workforce.engineers as f64 / 50.0)
                * state.workforce.morale
                * yield_jitter
                * 3.0;
            let product = &mut state.products[rd.product];
            product.quality = (product.quality + progress * rd.quality_split).min(100.0);
            product.features = (product.features + progress * (1.0 - rd.quality_split)).min(100.0);
        }

        if let Some(launch) = &rd.launch {
            if state.product_for(launch.segment).is_some() {
                messages.push(format!(
                    "launch skipped: already offering a {} product",
                    launch.segment
                ));
            } else {
                let best_quality = state
                    .products
                    .iter()
                    .map(|p| p.quality)
                    .fold(0.0f64, f64::max);
                let best_features = state
                    .products
                    .iter()
                    .map(|p| p.features)
                    .fold(0.0f64, f64::max);
                state.cash -= PRODUCT_LAUNCH_COST;
                costs += PRODUCT_LAUNCH_COST;
                state.products.push(Product {
                    segment: launch.segment,
                    price: launch.price,
                    quality: best_quality * 0.9,
                    features: best_features * 0.9,
                    allocation: 0.0,
                    unit_cost: Decimal::ZERO,
                });
                messages.push(format!("launched a {} product", launch.segment));
            }
        }

        Ok(ModuleOutcome {
            state,
            costs,
            revenue: Decimal::ZERO,
            messages,
        })
    }
}

/// Advertising, ESG campaigns and price changes.
pub struct MarketingProcessor;

impl ModuleProcessor for MarketingProcessor {
    fn department(&self) -> Department {
        Department::Marketing
    }

    fn process(
        &self,
        team: &TeamState,
        decisions: &DecisionBundle,
        _market: &MarketState,
        _round: u32,
        rng: &mut ChaCha8Rng,
    ) -> Result<ModuleOutcome, ModuleError> {
        let mut state = team.clone();
        let mut costs = Decimal::ZERO;

        let Some(mkt) = &decisions.marketing else {
            // Brand fades without a campaign.
            state.brand *= 0.98;
            return Ok(ModuleOutcome::unchanged(state));
        };

        let ad_total: Decimal = mkt.ad_budget.values().copied().sum();
        if ad_total > Decimal::ZERO {
            state.cash -= ad_total;
            costs += ad_total;
            let effectiveness: f64 = rng.gen_range(0.85..=1.15);
            let lift =
                0.06 * (as_f64(ad_total) / 1_000_000.0).sqrt() * (1.0 - state.brand) * effectiveness;
            state.brand = (state.brand + lift).min(1.0);
        } else {
            state.brand *= 0.98;
        }

        if mkt.esg_budget > Decimal::ZERO {
            state.cash -= mkt.esg_budget;
            costs += mkt.esg_budget;
            let gain = (as_f64(mkt.esg_budget) / 500_000.0).sqrt() * 2.0;
            state.esg = (state.esg + gain).min(100.0);
        }

        for (index, price) in &mkt.price_overrides {
            match state.products.get_mut(*index) {
                Some(product) => product.price = *price,
                None => {
                    return Err(ModuleError::InvalidDecision {
                        department: Department::Marketing,
                        reason: format!("price override for missing product {index}"),
                    })
                }
            }
        }

        Ok(ModuleOutcome {
            state,
            costs,
            revenue: Decimal::ZERO,
            messages: Vec::new(),
        })
    }
}

/// Debt draws, repayment and interest.
pub struct FinanceProcessor;

impl ModuleProcessor for FinanceProcessor {
    fn department(&self) -> Department {
        Department::Finance
    }

    fn process(
        &self,
        team: &TeamState,
        decisions: &DecisionBundle,
        _market: &MarketState,
        _round: u32,
        _rng: &mut ChaCha8Rng,
    ) -> Result<ModuleOutcome, ModuleError> {
        let mut state = team.clone();
        let mut costs = Decimal::ZERO;
        let mut messages = Vec::new();

        if let Some(fin) = &decisions.finance {
            if fin.loan_draw > Decimal::ZERO {
                let draw = fin.loan_draw.min(LOAN_DRAW_LIMIT);
                if draw < fin.loan_draw {
                    messages.push(format!("loan draw capped at {LOAN_DRAW_LIMIT}"));
                }
                state.cash += draw;
                state.debt += draw;
            }
            if fin.loan_repay > Decimal::ZERO {
                let repay = fin.loan_repay.min(state.debt);
                state.cash -= repay;
                state.debt -= repay;
            }
        }

        if state.debt > Decimal::ZERO {
            let interest =
                (state.debt * money(LOAN_INTEREST_RATE, Department::Finance)?).round_dp(2);
            state.cash -= interest;
            costs += interest;
        }

        Ok(ModuleOutcome {
            state,
            costs,
            revenue: Decimal::ZERO,
            messages,
        })
    }
}

/// The stock processor set in its fixed processing order.
pub fn default_processors() -> Vec<Box<dyn ModuleProcessor>> {
    vec![
        Box::new(MaterialsProcessor),
        Box::new(FactoryProcessor),
        Box::new(WorkforceProcessor),
        Box::new(ResearchProcessor),
        Box::new(MarketingProcessor),
        Box::new(FinanceProcessor),
    ]
}
