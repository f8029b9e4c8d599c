//! Aggregate metrics over a batch of simulation runs.

use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::harness::SimulationRun;

/// Batch-level outcome statistics.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BalanceMetrics {
    /// Mean total revenue across all teams of all runs.
    pub average_revenue: f64,
    /// Ratio of the highest to the lowest total revenue observed across
    /// all teams of all runs. The denominator is floored at 1.0 so a
    /// zero-revenue team cannot blow the ratio up to infinity.
    pub revenue_spread: f64,
    /// Fraction of runs in which at least one team went bankrupt.
    pub bankruptcy_rate: f64,
    /// Fraction of runs where the runner-up finished with at least 80% of
    /// the winner's total revenue.
    pub competitiveness: f64,
}

/// Win distribution over strategy archetypes.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DiversityIndex {
    pub wins: BTreeMap<String, u64>,
    pub win_rates: BTreeMap<String, f64>,
    pub bankruptcies: BTreeMap<String, u64>,
    /// Archetype holding more than 60% of wins, if any.
    pub dominant: Option<String>,
    /// Normalized Shannon entropy of the win distribution, in [0, 1].
    /// 1.0 means wins are spread evenly over the fielded archetypes,
    /// 0.0 means one archetype takes everything. With fewer than two
    /// distinct archetypes the score is 0 by convention.
    pub diversity_score: f64,
}

const DOMINANCE_WIN_SHARE: f64 = 0.6;

pub fn compute_metrics(runs: &[SimulationRun]) -> BalanceMetrics {
    let mut revenue_sum = 0.0;
    let mut team_runs = 0u64;
    let mut bankrupt_runs = 0u64;
    let mut competitive_runs = 0u64;
    let mut max_revenue = f64::MIN;
    let mut min_revenue = f64::MAX;

    for run in runs {
        let revenues: Vec<f64> = run
            .finals
            .iter()
            .map(|f| f.total_revenue.to_f64().unwrap_or(0.0))
            .collect();
        for &revenue in &revenues {
            revenue_sum += revenue;
            team_runs += 1;
            max_revenue = max_revenue.max(revenue);
            min_revenue = min_revenue.min(revenue);
        }
        if run.finals.iter().any(|f| f.bankrupt) {
            bankrupt_runs += 1;
        }

        let mut sorted = revenues;
        sorted.sort_by(|a, b| b.total_cmp(a));
        if sorted.len() >= 2 && sorted[1] >= 0.8 * sorted[0] {
            competitive_runs += 1;
        }
    }

    let run_count = runs.len().max(1) as f64;
    BalanceMetrics {
        average_revenue: revenue_sum / team_runs.max(1) as f64,
        // Single global ratio over every team-run's observed revenue.
        revenue_spread: if team_runs == 0 {
            1.0
        } else {
            max_revenue / min_revenue.max(1.0)
        },
        bankruptcy_rate: bankrupt_runs as f64 / run_count,
        competitiveness: competitive_runs as f64 / run_count,
    }
}

pub fn compute_diversity(runs: &[SimulationRun]) -> DiversityIndex {
    let mut wins: BTreeMap<String, u64> = BTreeMap::new();
    let mut bankruptcies: BTreeMap<String, u64> = BTreeMap::new();

    for run in runs {
        for result in &run.finals {
            wins.entry(result.archetype.clone()).or_insert(0);
            let slot = bankruptcies.entry(result.archetype.clone()).or_insert(0);
            if result.bankrupt {
                *slot += 1;
            }
            if result.team == run.winner {
                *wins.get_mut(&result.archetype).unwrap() += 1;
            }
        }
    }

    let total_wins: u64 = wins.values().sum();
    let win_rates: BTreeMap<String, f64> = wins
        .iter()
        .map(|(name, count)| {
            (
                name.clone(),
                *count as f64 / total_wins.max(1) as f64,
            )
        })
        .collect();
    let dominant = win_rates
        .iter()
        .find(|(_, rate)| **rate > DOMINANCE_WIN_SHARE)
        .map(|(name, _)| name.clone());

    DiversityIndex {
        diversity_score: entropy_score(&wins, total_wins),
        wins,
        win_rates,
        bankruptcies,
        dominant,
    }
}

/// Shannon entropy of the win counts, normalized by ln(k) for k distinct
/// archetypes fielded. Zero-win archetypes contribute nothing to the sum
/// but do count toward k, so a strategy that never wins drags the score
/// down instead of silently vanishing from it.
fn entropy_score(wins: &BTreeMap<String, u64>, total: u64) -> f64 {
    let k = wins.len();
    if k < 2 || total == 0 {
        return 0.0;
    }
    let entropy: f64 = wins
        .values()
        .filter(|count| **count > 0)
        .map(|count| {
            let p = *count as f64 / total as f64;
            -p * p.ln()
        })
        .sum();
    entropy / (k as f64).ln()
}
