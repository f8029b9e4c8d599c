#![deny(warnings)]

//! Round orchestrator and the default department processors.
//!
//! `process_round` is the simulation engine's single entry point: given
//! every team's decisions and the shared market state it produces the next
//! team states, the next market state and a per-team message log. It is
//! pure given its inputs; all randomness comes from streams derived from
//! the run seed, never from iteration order or ambient state.

mod departments;
mod orchestrator;

pub use departments::{
    default_processors, FactoryProcessor, FinanceProcessor, MarketingProcessor,
    MaterialsProcessor, ResearchProcessor, WorkforceProcessor,
};
pub use orchestrator::{process_round, process_round_with, RoundInput, RoundOutput};
