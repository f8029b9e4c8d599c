//! The round orchestrator.
//!
//! Sequencing per round: every team's department pipeline runs first (teams
//! are independent here), then the market allocation runs once with the
//! joint view of all teams (the synchronization barrier), and finally
//! results fold back into team states and the next market state is derived.
//! Pure given its inputs and the run seed.

use rand::Rng;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, warn};

use sim_core::{
    DecisionBundle, EngineConfig, MarketState, ModuleError, ModuleProcessor, RngContext, Segment,
    TeamId, TeamState,
};
use sim_econ::{allocate_segment, score_team, segment_demand, SegmentEntrant};

use crate::departments::default_processors;

/// Cost multiplier surcharge on units sold beyond a product's planned
/// capacity (rush outsourcing).
const OVER_CAPACITY_SURCHARGE: Decimal = Decimal::from_parts(3, 0, 0, false, 1); // 0.3

/// Rounds of share history averaged for the rubber-banding signal.
const ROLLING_SHARE_WINDOW: usize = 3;

/// Everything one round needs. Decision bundles are assumed valid; callers
/// run `validate_bundle` first (the orchestrator does not re-validate).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RoundInput {
    pub round: u32,
    /// Teams in input order. Order never affects any team's outcome: RNG
    /// streams seed from (seed, team id, round), not from position.
    pub teams: Vec<(TeamId, TeamState, DecisionBundle)>,
    pub market: MarketState,
    pub seed: String,
    pub config: EngineConfig,
}

/// Finalized round results.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RoundOutput {
    pub teams: Vec<(TeamId, TeamState)>,
    pub market: MarketState,
    pub messages: BTreeMap<TeamId, Vec<String>>,
}

struct Partial {
    state: TeamState,
    costs: Decimal,
    revenue: Decimal,
    messages: Vec<String>,
}

/// Process one round with the stock department processors.
pub fn process_round(input: &RoundInput) -> RoundOutput {
    process_round_with(input, &default_processors())
}

/// Process one round with a caller-supplied processor chain.
pub fn process_round_with(
    input: &RoundInput,
    processors: &[Box<dyn ModuleProcessor>],
) -> RoundOutput {
    let ctx = RngContext::new(&input.seed);

    // Stage 1: department pipelines, one team at a time.
    let partials: Vec<(TeamId, Partial)> = input
        .teams
        .iter()
        .map(|(id, state, bundle)| {
            (
                *id,
                run_team(&ctx, processors, *id, state, bundle, &input.market, input.round),
            )
        })
        .collect();

    // Stage 2: joint market allocation. Requires every team's partial state.
    let mut market_rng = ctx.round_stream("market", input.round);
    let mut sales: BTreeMap<TeamId, Vec<(Segment, u64, Decimal)>> = BTreeMap::new();
    let mut shares: BTreeMap<TeamId, BTreeMap<Segment, f64>> = BTreeMap::new();
    for segment in Segment::ALL {
        let demand = segment_demand(segment, &input.market, &mut market_rng);
        let entrants: Vec<SegmentEntrant> = partials
            .iter()
            .filter_map(|(id, partial)| {
                let score = score_team(&partial.state, segment, &input.market)?;
                let price = partial.state.product_for(segment)?.price;
                Some(SegmentEntrant {
                    team: *id,
                    score,
                    rolling_share: rolling_share(&partial.state),
                    price,
                })
            })
            .collect();
        for alloc in allocate_segment(
            segment,
            demand,
            &entrants,
            input.round,
            input.config.rubber_banding,
        ) {
            sales
                .entry(alloc.team)
                .or_default()
                .push((segment, alloc.units, alloc.revenue));
            shares
                .entry(alloc.team)
                .or_default()
                .insert(segment, alloc.share);
        }
    }

    // Stage 3: fold allocation results back into team states.
    let mut teams = Vec::with_capacity(partials.len());
    let mut messages = BTreeMap::new();
    for (id, partial) in partials {
        let sold = sales.remove(&id).unwrap_or_default();
        let segment_shares = shares.remove(&id).unwrap_or_default();
        let (state, team_messages) = finalize_team(partial, sold, segment_shares, input.round);
        debug!(team = %id, round = input.round, revenue = %state.revenue, "team finalized");
        teams.push((id, state));
        messages.insert(id, team_messages);
    }

    // Stage 4: drift the market.
    let market = next_market(&ctx, &input.market, input.round, input.config.market_volatility);

    RoundOutput {
        teams,
        market,
        messages,
    }
}

/// Mean of the team's most recent share-history entries; 0 before any round
/// has completed.
fn rolling_share(state: &TeamState) -> f64 {
    let history = &state.share_history;
    if history.is_empty() {
        return 0.0;
    }
    let window = history.len().min(ROLLING_SHARE_WINDOW);
    history[history.len() - window..].iter().sum::<f64>() / window as f64
}

fn run_team(
    ctx: &RngContext,
    processors: &[Box<dyn ModuleProcessor>],
    id: TeamId,
    state: &TeamState,
    bundle: &DecisionBundle,
    market: &MarketState,
    round: u32,
) -> Partial {
    match apply_departments(ctx, processors, id, state, bundle, market, round) {
        Ok(partial) => partial,
        Err(err) => {
            warn!(team = %id, round, error = %err, "module processor failed, degrading round");
            let passive = DecisionBundle::passive();
            match apply_departments(ctx, processors, id, state, &passive, market, round) {
                Ok(mut partial) => {
                    partial
                        .messages
                        .insert(0, format!("round degraded: {err}"));
                    partial
                }
                // Passive processing is infallible for the stock processors;
                // a custom chain that fails here carries the entry state.
                Err(second) => Partial {
                    state: state.clone(),
                    costs: Decimal::ZERO,
                    revenue: Decimal::ZERO,
                    messages: vec![format!(
                        "round degraded: {err}; passive replay also failed: {second}"
                    )],
                },
            }
        }
    }
}

fn apply_departments(
    ctx: &RngContext,
    processors: &[Box<dyn ModuleProcessor>],
    id: TeamId,
    state: &TeamState,
    bundle: &DecisionBundle,
    market: &MarketState,
    round: u32,
) -> Result<Partial, ModuleError> {
    let mut current = state.clone();
    let mut costs = Decimal::ZERO;
    let mut revenue = Decimal::ZERO;
    let mut messages = Vec::new();
    for processor in processors {
        let department = processor.department();
        let mut rng = ctx.team_stream(department.stream_name(), id, round);
        let outcome = processor.process(&current, bundle, market, round, &mut rng)?;
        current = outcome.state;
        costs += outcome.costs;
        revenue += outcome.revenue;
        messages.extend(outcome.messages);
    }
    Ok(Partial {
        state: current,
        costs,
        revenue,
        messages,
    })
}

fn finalize_team(
    partial: Partial,
    sold: Vec<(Segment, u64, Decimal)>,
    segment_shares: BTreeMap<Segment, f64>,
    round: u32,
) -> (TeamState, Vec<String>) {
    let mut state = partial.state;
    let mut messages = partial.messages;

    let capacity = state.effective_capacity();
    let mut sales_revenue = Decimal::ZERO;
    let mut cogs = Decimal::ZERO;
    let mut units_total: u64 = 0;
    for (segment, units, revenue) in sold {
        sales_revenue += revenue;
        units_total += units;
        if let Some(product) = state.product_for(segment) {
            let planned = (capacity * product.allocation).floor() as u64;
            let over = units.saturating_sub(planned);
            cogs += product.unit_cost * Decimal::from(units)
                + product.unit_cost * Decimal::from(over) * OVER_CAPACITY_SURCHARGE;
            if over > 0 {
                messages.push(format!(
                    "{segment}: {over} units beyond planned capacity outsourced at a premium"
                ));
            }
        }
    }

    state.cash += sales_revenue - cogs;
    let round_revenue = sales_revenue + partial.revenue;
    state.revenue = round_revenue;
    state.net_income = round_revenue - cogs - partial.costs;
    state.total_revenue += round_revenue;
    state.units_sold_total += units_total;
    state.market_share = segment_shares;
    let overall = state.overall_share();
    state.share_history.push(overall);

    if state.cash < Decimal::ZERO && !state.bankrupt {
        state.bankrupt = true;
        state.bankrupt_round = Some(round);
        messages.push(format!("cash went negative in round {round}: bankrupt"));
    }

    (state, messages)
}

fn next_market(ctx: &RngContext, market: &MarketState, round: u32, volatility: f64) -> MarketState {
    let mut rng = ctx.round_stream("macro", round);
    let mut next = market.clone();
    next.round = market.round + 1;
    next.gdp_growth =
        (next.gdp_growth + rng.gen_range(-0.4..=0.4) * volatility).clamp(-2.0, 6.0);
    next.inflation = (next.inflation + rng.gen_range(-0.3..=0.3) * volatility).clamp(0.0, 10.0);
    next.confidence =
        (next.confidence + rng.gen_range(-3.0..=3.0) * volatility).clamp(60.0, 140.0);
    next.fx_index = (next.fx_index + rng.gen_range(-2.0..=2.0) * volatility).clamp(80.0, 125.0);
    next.price_competition += 0.02;
    next.quality_bar += 0.01;
    next.sustainability_premium += 0.015;
    for (segment, demand) in &mut next.segments {
        demand.base_demand *= 1.0 + segment.profile().growth;
    }
    next
}

#[cfg(test)]
mod tests {
    use super::*;
    use sim_core::RdDecision;

    fn input_for(n_teams: u32, round: u32, seed: &str) -> RoundInput {
        let teams = (0..n_teams)
            .map(|i| {
                (
                    TeamId(i),
                    TeamState::starting(TeamId(i), format!("Team {i}")),
                    DecisionBundle::passive(),
                )
            })
            .collect();
        RoundInput {
            round,
            teams,
            market: MarketState::initial(),
            seed: seed.to_string(),
            config: EngineConfig::default(),
        }
    }

    #[test]
    fn round_is_deterministic() {
        let input = input_for(4, 0, "orchestrator-test");
        let a = process_round(&input);
        let b = process_round(&input);
        assert_eq!(
            serde_json::to_string(&a).unwrap(),
            serde_json::to_string(&b).unwrap()
        );
    }

    #[test]
    fn team_order_does_not_change_outcomes() {
        let input = input_for(4, 0, "order-test");
        let mut reversed = input.clone();
        reversed.teams.reverse();
        let a = process_round(&input);
        let b = process_round(&reversed);
        for (id, state) in &a.teams {
            let (_, other) = b.teams.iter().find(|(bid, _)| bid == id).unwrap();
            assert_eq!(
                serde_json::to_string(state).unwrap(),
                serde_json::to_string(other).unwrap(),
                "team {id} diverged under reordering"
            );
        }
    }

    #[test]
    fn shares_within_a_segment_conserve() {
        let input = input_for(6, 2, "share-test");
        let out = process_round(&input);
        for segment in Segment::ALL {
            let sum: f64 = out
                .teams
                .iter()
                .filter_map(|(_, s)| s.market_share.get(&segment))
                .sum();
            assert!(sum <= 1.0 + 1e-9, "{segment} shares sum to {sum}");
        }
    }

    #[test]
    fn zero_cash_all_zero_decisions_never_crashes() {
        let mut input = input_for(1, 0, "broke-test");
        input.teams[0].1.cash = Decimal::ZERO;
        let out = process_round(&input);
        let (_, state) = &out.teams[0];
        // Standing costs push an empty till negative; that flags bankruptcy,
        // it does not abort the round.
        assert!(state.bankrupt || state.cash >= Decimal::ZERO);
        assert_eq!(out.market.round, 1);
    }

    #[test]
    fn processor_failure_degrades_only_that_team() {
        let mut input = input_for(2, 1, "degrade-test");
        // Out-of-range product index makes the research processor fail hard.
        input.teams[0].2.rd = Some(RdDecision {
            budget: Decimal::new(100_000, 0),
            product: 9,
            quality_split: 0.5,
            launch: None,
        });
        let out = process_round(&input);
        let degraded = &out.messages[&TeamId(0)];
        assert!(degraded.iter().any(|m| m.contains("round degraded")));
        assert!(out.messages[&TeamId(1)]
            .iter()
            .all(|m| !m.contains("degraded")));

        // The degraded team's round matches a passive replay.
        let mut passive = input.clone();
        passive.teams[0].2 = DecisionBundle::passive();
        let replay = process_round(&passive);
        assert_eq!(
            serde_json::to_string(&out.teams[0].1).unwrap(),
            serde_json::to_string(&replay.teams[0].1).unwrap()
        );
    }

    #[test]
    fn market_drift_moves_pressures_and_demand() {
        let input = input_for(2, 0, "drift-test");
        let out = process_round(&input);
        let m0 = &input.market;
        let m1 = &out.market;
        assert!((m1.price_competition - m0.price_competition - 0.02).abs() < 1e-12);
        assert!((m1.quality_bar - m0.quality_bar - 0.01).abs() < 1e-12);
        assert!((m1.sustainability_premium - m0.sustainability_premium - 0.015).abs() < 1e-12);
        for segment in Segment::ALL {
            assert!(
                m1.segments[&segment].base_demand > m0.segments[&segment].base_demand,
                "{segment} demand should grow"
            );
        }
        assert!((-2.0..=6.0).contains(&m1.gdp_growth));
        assert!((0.0..=10.0).contains(&m1.inflation));
    }

    #[test]
    fn new_state_values_leave_input_untouched() {
        let input = input_for(2, 0, "immutability-test");
        let before = serde_json::to_string(&input.teams).unwrap();
        let _ = process_round(&input);
        assert_eq!(before, serde_json::to_string(&input.teams).unwrap());
    }
}
