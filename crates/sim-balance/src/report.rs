//! Pass/fail gating and human-readable rendering.

use serde::{Deserialize, Serialize};
use std::fmt::Write;

use crate::metrics::{BalanceMetrics, DiversityIndex};

const MIN_WINNING_ARCHETYPES: usize = 2;
const MAX_BANKRUPTCY_RATE: f64 = 0.30;
const MIN_REVENUE_SPREAD: f64 = 1.0;
const MAX_REVENUE_SPREAD: f64 = 25.0;
const MIN_DIVERSITY_SCORE: f64 = 0.5;
const MIN_COMPETITIVENESS: f64 = 0.3;

/// Verdict for one harness batch. `passed` is false iff `warnings` is
/// non-empty.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BalanceReport {
    pub passed: bool,
    pub warnings: Vec<String>,
}

/// Gate a batch on the balance thresholds.
///
/// `fielded_archetypes` is the number of distinct archetypes assigned to
/// teams. The diversity and minimum-winner checks only apply when at least
/// two were fielded; the dominance check always applies, so an all-same
/// roster still gets flagged.
pub fn evaluate(
    metrics: &BalanceMetrics,
    diversity: &DiversityIndex,
    fielded_archetypes: usize,
) -> BalanceReport {
    let mut warnings = Vec::new();

    if let Some(name) = &diversity.dominant {
        let rate = diversity.win_rates.get(name).copied().unwrap_or(0.0);
        warnings.push(format!(
            "dominant strategy: {name:?} wins {:.1}% of runs (ceiling 60%)",
            rate * 100.0
        ));
    }

    if fielded_archetypes >= 2 {
        let winning = diversity.wins.values().filter(|w| **w > 0).count();
        if winning < MIN_WINNING_ARCHETYPES {
            warnings.push(format!(
                "only {winning} archetype(s) ever win; at least {MIN_WINNING_ARCHETYPES} \
                 must be viable"
            ));
        }
        if diversity.diversity_score < MIN_DIVERSITY_SCORE {
            warnings.push(format!(
                "win diversity {:.3} below floor {MIN_DIVERSITY_SCORE}",
                diversity.diversity_score
            ));
        }
    }

    if metrics.bankruptcy_rate > MAX_BANKRUPTCY_RATE {
        warnings.push(format!(
            "bankruptcy rate {:.1}% above ceiling {:.0}%",
            metrics.bankruptcy_rate * 100.0,
            MAX_BANKRUPTCY_RATE * 100.0
        ));
    }

    if metrics.revenue_spread < MIN_REVENUE_SPREAD
        || metrics.revenue_spread > MAX_REVENUE_SPREAD
        || !metrics.revenue_spread.is_finite()
    {
        warnings.push(format!(
            "revenue spread {:.2} outside band [{MIN_REVENUE_SPREAD}, {MAX_REVENUE_SPREAD}]",
            metrics.revenue_spread
        ));
    }

    if metrics.competitiveness < MIN_COMPETITIVENESS {
        warnings.push(format!(
            "runner-up within 80% of the winner in only {:.1}% of runs (floor {:.0}%)",
            metrics.competitiveness * 100.0,
            MIN_COMPETITIVENESS * 100.0
        ));
    }

    BalanceReport {
        passed: warnings.is_empty(),
        warnings,
    }
}

/// Plain-text rendering for terminal output.
pub fn render_text(
    metrics: &BalanceMetrics,
    diversity: &DiversityIndex,
    report: &BalanceReport,
) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "strategy            wins   win rate   bankruptcies");
    for (name, count) in &diversity.wins {
        let rate = diversity.win_rates.get(name).copied().unwrap_or(0.0);
        let broke = diversity.bankruptcies.get(name).copied().unwrap_or(0);
        let _ = writeln!(
            out,
            "{name:<18} {count:>5}   {:>7.1}%   {broke:>12}",
            rate * 100.0
        );
    }
    let _ = writeln!(out);
    let _ = writeln!(out, "average revenue:  {:.0}", metrics.average_revenue);
    let _ = writeln!(out, "revenue spread:   {:.2}", metrics.revenue_spread);
    let _ = writeln!(
        out,
        "bankruptcy rate:  {:.1}%",
        metrics.bankruptcy_rate * 100.0
    );
    let _ = writeln!(
        out,
        "competitiveness:  {:.1}%",
        metrics.competitiveness * 100.0
    );
    let _ = writeln!(out, "diversity score:  {:.3}", diversity.diversity_score);
    let _ = writeln!(out);
    if report.passed {
        let _ = writeln!(out, "balance check: PASS");
    } else {
        let _ = writeln!(out, "balance check: FAIL");
        for warning in &report.warnings {
            let _ = writeln!(out, "  warning: {warning}");
        }
    }
    out
}
