#![deny(warnings)]

//! Core domain models and invariants for the phone-manufacturing simulation.
//!
//! This crate defines the value types shared by every other crate: team and
//! market state, per-round decision bundles, the module-processor interface
//! the orchestrator drives, and the seeded RNG context that makes every run
//! bit-reproducible. State types are mutated only by producing new values;
//! a round never edits a state in place.

mod decisions;
mod market;
mod processor;
mod rng;
mod state;

pub use decisions::{
    validate_bundle, DecisionBundle, DecisionError, FactoryDecision, FinanceDecision,
    MarketingDecision, MaterialsDecision, ProductLaunch, RdDecision, WorkforceDecision,
};
pub use market::{FactorWeights, MarketState, Segment, SegmentDemand, SegmentProfile};
pub use processor::{Department, ModuleError, ModuleOutcome, ModuleProcessor};
pub use rng::RngContext;
pub use state::{Factory, Product, TeamId, TeamState, Workforce};

use serde::{Deserialize, Serialize};

/// Knobs the orchestrator needs beyond the round inputs themselves.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Apply the post-softmax catch-up correction from [`RUBBER_BAND_START_ROUND`] onward.
    pub rubber_banding: bool,
    /// Scales the bounded random walk on macro indicators. 1.0 = nominal.
    pub market_volatility: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            rubber_banding: true,
            market_volatility: 1.0,
        }
    }
}

/// First round in which rubber-banding corrections apply.
pub const RUBBER_BAND_START_ROUND: u32 = 4;
