use bevy::math::Vec2;
use criterion::{criterion_group, criterion_main, BatchSize, BenchmarkId, Criterion};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

use tactics_core::arena::{ArenaConfig, ArenaHost};
use tactics_core::{
    apply_threats, build_episode_app, run_tick, select_target, BoolGrid, Cell, GridDims,
    PayoffMatrix, SafetyGrid, TacticalHost, TacticsConfig, TerrainModel, ThreatDescriptor,
    ThreatId,
};

fn scattered_terrain(dims: GridDims, rng: &mut SmallRng) -> TerrainModel {
    let blocked: Vec<Cell> = (0..dims.len() / 20)
        .map(|_| Cell::new(rng.gen_range(0..dims.rows), rng.gen_range(0..dims.cols)))
        .collect();
    TerrainModel::open(dims).with_blocked(blocked)
}

fn bench_safety_field(c: &mut Criterion) {
    let config = TacticsConfig::default();
    let mut group = c.benchmark_group("safety_field");

    for size in [16u32, 32, 64, 128] {
        let dims = GridDims::new(size, size);
        let mut rng = SmallRng::seed_from_u64(size as u64);
        let terrain = scattered_terrain(dims, &mut rng);
        let centre = Vec2::splat(size as f32 / 2.0);
        let mask = BoolGrid::disc(dims, centre, size as f32 / 3.0);
        let threats = vec![ThreatDescriptor::new(
            ThreatId(1),
            Vec2::new(centre.x + 3.0, centre.y),
            8.0,
        )];

        group.bench_with_input(BenchmarkId::new("percept_threats_navigate", size), &size, |b, _| {
            b.iter_batched(
                || {
                    let mut grid = SafetyGrid::new(dims);
                    // First call only bootstraps.
                    let _ = grid.percept(&mask, &terrain, &config.vision);
                    grid
                },
                |mut grid| {
                    let _ = grid.percept(&mask, &terrain, &config.vision);
                    apply_threats(&mut grid, &threats, &config.threat);
                    select_target(&grid, &mask, &threats)
                },
                BatchSize::SmallInput,
            )
        });
    }

    group.finish();
}

fn bench_episode_tick(c: &mut Criterion) {
    let mut group = c.benchmark_group("episode_tick");

    for units in [2usize, 6, 12] {
        group.bench_with_input(BenchmarkId::new("arena_units", units), &units, |b, &units| {
            b.iter_batched(
                || {
                    let mut arena = ArenaConfig::default();
                    arena.roster = arena.roster.iter().copied().cycle().take(units).collect();
                    let mut host = ArenaHost::new(arena).expect("valid arena config");
                    let frame = host.observe(0).expect("arena observe");
                    let app = build_episode_app(
                        TacticsConfig::builtin(),
                        host.terrain(),
                        PayoffMatrix::template(),
                    );
                    (app, frame)
                },
                |(mut app, frame)| run_tick(&mut app, frame),
                BatchSize::SmallInput,
            )
        });
    }

    group.finish();
}

criterion_group!(tick_benches, bench_safety_field, bench_episode_tick);
criterion_main!(tick_benches);
