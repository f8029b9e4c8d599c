#![deny(warnings)]

//! Scripted strategy archetypes for balance testing.
//!
//! An archetype is a pure `fn(&TeamState, &MarketState, round) ->
//! DecisionBundle` with no hidden state: the harness calls these across
//! thousands of parallel runs, and any shared mutable state would break
//! both determinism and thread-safety. Archetypes differ only in how they
//! allocate a team's cash across departments.

mod archetypes;

pub use archetypes::{balanced, frugal, innovator, premium, volume};

use std::collections::BTreeMap;

use sim_core::{DecisionBundle, MarketState, TeamState};

/// Signature every archetype conforms to.
pub type StrategyFn = fn(&TeamState, &MarketState, u32) -> DecisionBundle;

/// A named, pure decision-making strategy.
#[derive(Clone, Copy)]
pub struct Archetype {
    pub name: &'static str,
    pub decide: StrategyFn,
}

impl std::fmt::Debug for Archetype {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Archetype").field("name", &self.name).finish()
    }
}

/// Read-mostly name → archetype mapping, populated once at startup. The
/// harness is archetype-agnostic; new strategies only need to conform to
/// [`StrategyFn`] and register here.
#[derive(Clone, Debug, Default)]
pub struct ArchetypeRegistry {
    entries: BTreeMap<&'static str, Archetype>,
}

impl ArchetypeRegistry {
    /// Registry with the five built-in archetypes.
    pub fn builtin() -> Self {
        let mut registry = Self::default();
        for archetype in [
            Archetype { name: "balanced", decide: balanced },
            Archetype { name: "volume", decide: volume },
            Archetype { name: "premium", decide: premium },
            Archetype { name: "innovator", decide: innovator },
            Archetype { name: "frugal", decide: frugal },
        ] {
            registry.register(archetype);
        }
        registry
    }

    /// Add or replace an archetype.
    pub fn register(&mut self, archetype: Archetype) {
        self.entries.insert(archetype.name, archetype);
    }

    /// Look up an archetype by name.
    pub fn get(&self, name: &str) -> Option<Archetype> {
        self.entries.get(name).copied()
    }

    /// Registered names in deterministic order.
    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.entries.keys().copied()
    }
}
