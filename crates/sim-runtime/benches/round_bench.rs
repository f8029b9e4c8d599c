use criterion::{black_box, criterion_group, criterion_main, Criterion};
use sim_core::{DecisionBundle, EngineConfig, MarketState, TeamId, TeamState};
use sim_runtime::{process_round, RoundInput};

fn bench_round(c: &mut Criterion) {
    let teams = (0..8)
        .map(|i| {
            (
                TeamId(i),
                TeamState::starting(TeamId(i), format!("T{i}")),
                DecisionBundle::passive(),
            )
        })
        .collect();
    let input = RoundInput {
        round: 3,
        teams,
        market: MarketState::initial(),
        seed: "bench".to_string(),
        config: EngineConfig::default(),
    };
    c.bench_function("process_round 8 teams", |b| {
        b.iter(|| black_box(process_round(&input)))
    });
}

criterion_group!(benches, bench_round);
criterion_main!(benches);
