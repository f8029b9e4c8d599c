//! The simulation batch runner.

use rayon::prelude::*;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;
use tracing::info;

use sim_ai::{Archetype, ArchetypeRegistry};
use sim_core::{
    validate_bundle, DecisionError, EngineConfig, MarketState, TeamId, TeamState,
};
use sim_runtime::{process_round, RoundInput};

use crate::metrics::{compute_diversity, compute_metrics, BalanceMetrics, DiversityIndex};
use crate::report::{evaluate, BalanceReport};

/// Harness configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BalanceConfig {
    pub simulations: usize,
    pub rounds: u32,
    pub teams: usize,
    /// Base seed; each simulation runs with `"{base}-sim-{i}"`. When absent
    /// a UTC-epoch-millis seed is used and the batch is not reproducible.
    pub base_seed: Option<String>,
    pub rubber_banding: bool,
    pub market_volatility: f64,
    pub verbose: bool,
}

impl Default for BalanceConfig {
    fn default() -> Self {
        Self {
            simulations: 100,
            rounds: 12,
            teams: 4,
            base_seed: None,
            rubber_banding: true,
            market_volatility: 1.0,
            verbose: false,
        }
    }
}

/// Setup-time failures. The harness never aborts on a single simulation's
/// internal degradation; these are the only hard stops.
#[derive(Debug, Error)]
pub enum HarnessError {
    #[error("unknown strategy archetype: {0:?}")]
    UnknownArchetype(String),
    #[error("{got} strategy assignments for {expected} teams")]
    AssignmentCount { got: usize, expected: usize },
    #[error("simulation count and round count must both be nonzero")]
    EmptyConfig,
    #[error("team {team} produced an invalid bundle in round {round}: {source}")]
    InvalidDecision {
        team: TeamId,
        round: u32,
        source: DecisionError,
    },
}

/// One team's numbers for one round.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TeamRoundSnapshot {
    pub revenue: Decimal,
    pub net_income: Decimal,
    pub cash: Decimal,
    pub overall_share: f64,
}

/// Round-by-round history entry.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RoundRecord {
    pub round: u32,
    pub teams: BTreeMap<TeamId, TeamRoundSnapshot>,
    pub messages: BTreeMap<TeamId, Vec<String>>,
}

/// Final per-team metrics for one simulation. Bankruptcy is an orthogonal
/// flag; it never disqualifies a team from the revenue ranking.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TeamResult {
    pub team: TeamId,
    pub archetype: String,
    pub total_revenue: Decimal,
    pub total_net_income: Decimal,
    pub average_share: f64,
    pub peak_cash: Decimal,
    pub min_cash: Decimal,
    pub bankrupt: bool,
    pub bankrupt_round: Option<u32>,
}

/// One complete seeded playthrough. Write-once.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SimulationRun {
    pub seed: String,
    pub rounds: Vec<RoundRecord>,
    pub finals: Vec<TeamResult>,
    pub winner: TeamId,
}

/// Aggregated output of one harness invocation. Write-once.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct HarnessOutput {
    pub runs: Vec<SimulationRun>,
    pub metrics: BalanceMetrics,
    pub diversity: DiversityIndex,
    pub report: BalanceReport,
}

/// Run the full batch.
///
/// Fails fast on configuration problems (unknown archetype names, count
/// mismatches) before any simulation work begins. Simulations execute in
/// parallel; each derives everything from its own seed.
pub fn run(
    config: &BalanceConfig,
    assignments: &[(TeamId, String)],
) -> Result<HarnessOutput, HarnessError> {
    if config.simulations == 0 || config.rounds == 0 {
        return Err(HarnessError::EmptyConfig);
    }
    if assignments.len() != config.teams || config.teams == 0 {
        return Err(HarnessError::AssignmentCount {
            got: assignments.len(),
            expected: config.teams,
        });
    }
    let registry = ArchetypeRegistry::builtin();
    let roster: Vec<(TeamId, Archetype)> = assignments
        .iter()
        .map(|(team, name)| {
            registry
                .get(name)
                .map(|archetype| (*team, archetype))
                .ok_or_else(|| HarnessError::UnknownArchetype(name.clone()))
        })
        .collect::<Result<_, _>>()?;

    let base_seed = config
        .base_seed
        .clone()
        .unwrap_or_else(|| chrono::Utc::now().timestamp_millis().to_string());
    info!(
        simulations = config.simulations,
        rounds = config.rounds,
        teams = config.teams,
        base_seed = %base_seed,
        "starting balance batch"
    );

    let runs: Vec<SimulationRun> = (0..config.simulations)
        .into_par_iter()
        .map(|i| run_one(config, format!("{base_seed}-sim-{i}"), &roster))
        .collect::<Result<_, _>>()?;

    let metrics = compute_metrics(&runs);
    let diversity = compute_diversity(&runs);
    let distinct = {
        let names: std::collections::BTreeSet<&str> =
            roster.iter().map(|(_, a)| a.name).collect();
        names.len()
    };
    let report = evaluate(&metrics, &diversity, distinct);
    Ok(HarnessOutput {
        runs,
        metrics,
        diversity,
        report,
    })
}

fn run_one(
    config: &BalanceConfig,
    seed: String,
    roster: &[(TeamId, Archetype)],
) -> Result<SimulationRun, HarnessError> {
    let engine_config = EngineConfig {
        rubber_banding: config.rubber_banding,
        market_volatility: config.market_volatility,
    };
    let mut teams: Vec<(TeamId, TeamState)> = roster
        .iter()
        .map(|(id, archetype)| {
            (
                *id,
                TeamState::starting(*id, format!("team-{id}-{}", archetype.name)),
            )
        })
        .collect();
    let mut market = MarketState::initial();
    let mut rounds = Vec::with_capacity(config.rounds as usize);

    for round in 0..config.rounds {
        let mut entries = Vec::with_capacity(teams.len());
        for ((id, state), (_, archetype)) in teams.iter().zip(roster) {
            let bundle = (archetype.decide)(state, &market, round);
            validate_bundle(&bundle, state.products.len()).map_err(|source| {
                HarnessError::InvalidDecision {
                    team: *id,
                    round,
                    source,
                }
            })?;
            entries.push((*id, state.clone(), bundle));
        }
        let output = process_round(&RoundInput {
            round,
            teams: entries,
            market,
            seed: seed.clone(),
            config: engine_config,
        });
        rounds.push(RoundRecord {
            round,
            teams: output
                .teams
                .iter()
                .map(|(id, state)| {
                    (
                        *id,
                        TeamRoundSnapshot {
                            revenue: state.revenue,
                            net_income: state.net_income,
                            cash: state.cash,
                            overall_share: state.overall_share(),
                        },
                    )
                })
                .collect(),
            messages: output.messages,
        });
        teams = output.teams;
        market = output.market;
    }

    let finals: Vec<TeamResult> = teams
        .iter()
        .zip(roster)
        .map(|((id, state), (_, archetype))| finalize(*id, state, archetype.name, &rounds))
        .collect();
    let winner = decide_winner(&finals);
    if config.verbose {
        info!(seed = %seed, winner = %winner, "simulation finished");
    }
    Ok(SimulationRun {
        seed,
        rounds,
        finals,
        winner,
    })
}

fn finalize(id: TeamId, state: &TeamState, archetype: &str, rounds: &[RoundRecord]) -> TeamResult {
    let mut total_net_income = Decimal::ZERO;
    let mut peak_cash = state.cash;
    let mut min_cash = state.cash;
    let mut share_sum = 0.0;
    for record in rounds {
        if let Some(snapshot) = record.teams.get(&id) {
            total_net_income += snapshot.net_income;
            peak_cash = peak_cash.max(snapshot.cash);
            min_cash = min_cash.min(snapshot.cash);
            share_sum += snapshot.overall_share;
        }
    }
    TeamResult {
        team: id,
        archetype: archetype.to_string(),
        total_revenue: state.total_revenue,
        total_net_income,
        average_share: if rounds.is_empty() {
            0.0
        } else {
            share_sum / rounds.len() as f64
        },
        peak_cash,
        min_cash,
        bankrupt: state.bankrupt,
        bankrupt_round: state.bankrupt_round,
    }
}

/// Highest total revenue wins; an exact tie goes to the first team in input
/// order. The tie-break is load-bearing for reproducibility; do not change
/// it to anything order-sensitive.
fn decide_winner(finals: &[TeamResult]) -> TeamId {
    let mut winner = &finals[0];
    for candidate in &finals[1..] {
        if candidate.total_revenue > winner.total_revenue {
            winner = candidate;
        }
    }
    winner.team
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assignments(names: &[&str]) -> Vec<(TeamId, String)> {
        names
            .iter()
            .enumerate()
            .map(|(i, n)| (TeamId(i as u32), n.to_string()))
            .collect()
    }

    fn small_config(sims: usize, rounds: u32, teams: usize) -> BalanceConfig {
        BalanceConfig {
            simulations: sims,
            rounds,
            teams,
            base_seed: Some("balance-test".to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn unknown_archetype_fails_fast() {
        let config = small_config(2, 2, 2);
        let err = run(&config, &assignments(&["balanced", "does-not-exist"])).unwrap_err();
        assert!(matches!(err, HarnessError::UnknownArchetype(_)));
    }

    #[test]
    fn assignment_count_must_match_teams() {
        let config = small_config(2, 2, 3);
        let err = run(&config, &assignments(&["balanced", "volume"])).unwrap_err();
        assert!(matches!(err, HarnessError::AssignmentCount { .. }));
    }

    #[test]
    fn batch_is_bit_identical_for_a_fixed_base_seed() {
        let config = small_config(4, 4, 3);
        let names = assignments(&["balanced", "volume", "premium"]);
        let a = run(&config, &names).unwrap();
        let b = run(&config, &names).unwrap();
        assert_eq!(
            serde_json::to_string(&a).unwrap(),
            serde_json::to_string(&b).unwrap()
        );
    }

    #[test]
    fn identical_strategies_yield_similar_but_not_identical_outcomes() {
        // Scenario A: same archetype everywhere, independent RNG streams.
        let config = BalanceConfig {
            simulations: 1,
            rounds: 8,
            teams: 4,
            base_seed: Some("balance-test".to_string()),
            ..Default::default()
        };
        let out = run(&config, &assignments(&["balanced"; 4])).unwrap();
        let run0 = &out.runs[0];
        assert_eq!(run0.seed, "balance-test-sim-0");
        let revenues: Vec<Decimal> = run0.finals.iter().map(|f| f.total_revenue).collect();
        assert!(
            revenues.windows(2).any(|w| w[0] != w[1]),
            "independent streams should differentiate identical teams"
        );
        // Symmetry keeps them in the same ballpark.
        let max = revenues.iter().max().unwrap();
        let min = revenues.iter().min().unwrap();
        assert!(*min > Decimal::ZERO);
        assert!(*max < *min * Decimal::new(3, 0), "max {max} vs min {min}");
    }

    #[test]
    fn single_archetype_batch_has_zero_diversity_and_flags_dominance() {
        // Scenario B: only one archetype can ever win, by definition.
        let config = small_config(100, 6, 4);
        let out = run(&config, &assignments(&["volume"; 4])).unwrap();
        assert_eq!(out.diversity.diversity_score, 0.0);
        assert_eq!(out.diversity.dominant.as_deref(), Some("volume"));
        assert!(!out.report.passed);
        assert!(out
            .report
            .warnings
            .iter()
            .any(|w| w.contains("dominant")));
    }

    #[test]
    fn winner_tie_break_prefers_first_in_input_order() {
        let result = |team: u32, revenue: i64| TeamResult {
            team: TeamId(team),
            archetype: "balanced".to_string(),
            total_revenue: Decimal::new(revenue, 0),
            total_net_income: Decimal::ZERO,
            average_share: 0.0,
            peak_cash: Decimal::ZERO,
            min_cash: Decimal::ZERO,
            bankrupt: false,
            bankrupt_round: None,
        };
        let finals = vec![result(7, 100), result(3, 100), result(9, 50)];
        assert_eq!(decide_winner(&finals), TeamId(7));
    }

    #[test]
    fn history_covers_every_round_and_team() {
        let config = small_config(1, 5, 2);
        let out = run(&config, &assignments(&["frugal", "innovator"])).unwrap();
        let sim = &out.runs[0];
        assert_eq!(sim.rounds.len(), 5);
        for record in &sim.rounds {
            assert_eq!(record.teams.len(), 2);
        }
        assert_eq!(sim.finals.len(), 2);
    }
}
