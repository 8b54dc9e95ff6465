//! Tick throughput benchmarks.
//!
//! A server hosts many matches; per-match tick cost decides how many.
//! Measures the simulation alone, no runtime or IO.

use std::collections::BTreeMap;

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use spellgrid::game::catalog::AttackCatalog;
use spellgrid::game::combatant::PlayerId;
use spellgrid::game::grid::TileGrid;
use spellgrid::game::state::MatchState;
use spellgrid::game::tick::{tick, CastIntent, IntentFrame, MoveDir, TickConfig};
use spellgrid::{AttackId, Vec2};

fn setup_match(players: usize) -> (MatchState, Vec<PlayerId>) {
    let mut state = MatchState::new([7; 16], 0xBEEF, TileGrid::open(32, 32));
    let ids: Vec<PlayerId> = (0..players as u8)
        .map(|i| PlayerId::new([i + 1; 16]))
        .collect();
    for id in &ids {
        state.add_combatant(*id).unwrap();
    }
    (state, ids)
}

fn busy_intents(ids: &[PlayerId], t: u64) -> BTreeMap<PlayerId, IntentFrame> {
    let dirs = [MoveDir::Right, MoveDir::Down, MoveDir::Left, MoveDir::Up];
    ids.iter()
        .enumerate()
        .map(|(i, id)| {
            let cast = (t % 10 == i as u64 % 10).then_some(CastIntent {
                attack: AttackId(1 + (i as u16 % 5)),
                aim: Vec2::new(((i % 3) as f32) - 1.0, 1.0),
                charge: 50,
            });
            (
                *id,
                IntentFrame {
                    movement: Some(dirs[(i + t as usize) % 4]),
                    cast,
                },
            )
        })
        .collect()
}

fn bench_idle_tick(c: &mut Criterion) {
    let catalog = AttackCatalog::builtin();
    let config = TickConfig::default();
    let empty = BTreeMap::new();

    c.bench_function("tick_idle_4p", |b| {
        let (mut state, _) = setup_match(4);
        b.iter(|| black_box(tick(&mut state, &empty, &catalog, &config)));
    });
}

fn bench_busy_tick(c: &mut Criterion) {
    let catalog = AttackCatalog::builtin();
    let config = TickConfig::default();

    c.bench_function("tick_busy_8p", |b| {
        let (mut state, ids) = setup_match(8);
        let mut t = 0u64;
        b.iter(|| {
            t += 1;
            let intents = busy_intents(&ids, t);
            black_box(tick(&mut state, &intents, &catalog, &config))
        });
    });
}

fn bench_projectile_heavy(c: &mut Criterion) {
    let catalog = AttackCatalog::builtin();
    let config = TickConfig {
        end_when_last_standing: false,
        ..TickConfig::default()
    };

    c.bench_function("tick_fan_spam_8p", |b| {
        let (mut state, ids) = setup_match(8);
        let intents: BTreeMap<PlayerId, IntentFrame> = ids
            .iter()
            .map(|id| {
                (
                    *id,
                    IntentFrame {
                        movement: None,
                        cast: Some(CastIntent {
                            attack: AttackId(18), // fan of knives
                            aim: Vec2::RIGHT,
                            charge: 0,
                        }),
                    },
                )
            })
            .collect();
        b.iter(|| black_box(tick(&mut state, &intents, &catalog, &config)));
    });
}

criterion_group!(
    benches,
    bench_idle_tick,
    bench_busy_tick,
    bench_projectile_heavy
);
criterion_main!(benches);
