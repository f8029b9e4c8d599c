//! Module-processor interface.
//!
//! One processor per department. The orchestrator holds them in the fixed
//! order [`Department::ORDER`] and threads a team's partial state through
//! each. A processor failure degrades only that team's round; the
//! simulation continues.

use rand_chacha::ChaCha8Rng;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::decisions::DecisionBundle;
use crate::market::MarketState;
use crate::state::TeamState;

/// The six departments, processed in a fixed documented sequence.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Department {
    Materials,
    Factory,
    Workforce,
    Research,
    Marketing,
    Finance,
}

impl Department {
    /// Processing order: materials/costs → factory → workforce → R&D →
    /// marketing → finance.
    pub const ORDER: [Department; 6] = [
        Department::Materials,
        Department::Factory,
        Department::Workforce,
        Department::Research,
        Department::Marketing,
        Department::Finance,
    ];

    /// Name of the RNG stream this department draws from.
    pub fn stream_name(self) -> &'static str {
        match self {
            Department::Materials => "materials",
            Department::Factory => "factory",
            Department::Workforce => "hr",
            Department::Research => "rd",
            Department::Marketing => "marketing",
            Department::Finance => "finance",
        }
    }
}

impl fmt::Display for Department {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Department::Materials => "materials",
            Department::Factory => "factory",
            Department::Workforce => "workforce",
            Department::Research => "research",
            Department::Marketing => "marketing",
            Department::Finance => "finance",
        };
        f.write_str(s)
    }
}

/// What a processor hands back: the team's updated state plus cost/revenue
/// deltas and any recoverable warnings as messages.
#[derive(Clone, Debug)]
pub struct ModuleOutcome {
    pub state: TeamState,
    /// Costs incurred this step; folded into net income at round end.
    pub costs: Decimal,
    /// Revenue recognized by this step (rare; sales come from allocation).
    pub revenue: Decimal,
    pub messages: Vec<String>,
}

impl ModuleOutcome {
    /// Outcome with no financial effect.
    pub fn unchanged(state: TeamState) -> Self {
        Self {
            state,
            costs: Decimal::ZERO,
            revenue: Decimal::ZERO,
            messages: Vec::new(),
        }
    }
}

/// Hard failure inside a processor. Aborts only the offending team's round;
/// the orchestrator records it and replays the round with passive decisions.
#[derive(Debug, Error)]
pub enum ModuleError {
    #[error("{department}: decision cannot be applied: {reason}")]
    InvalidDecision {
        department: Department,
        reason: String,
    },
    #[error("{0}: non-finite value in computation")]
    NonFinite(Department),
}

/// One department's round logic.
///
/// Implementations must be stateless and pure given their inputs and RNG
/// stream: the harness calls them across thousands of concurrent runs.
pub trait ModuleProcessor: Send + Sync {
    /// Which department this processor implements.
    fn department(&self) -> Department;

    /// Apply one round of this department's decisions.
    fn process(
        &self,
        team: &TeamState,
        decisions: &DecisionBundle,
        market: &MarketState,
        round: u32,
        rng: &mut ChaCha8Rng,
    ) -> Result<ModuleOutcome, ModuleError>;
}
