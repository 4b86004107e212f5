mod common;

use tactics_core::{
    build_episode_app, load_tactics_config_from_env, run_tick, GridDims, HostFrame,
    PayoffMatrix, TerrainModel,
};

#[test]
fn fixture_config_is_picked_up() {
    common::ensure_test_config();
    let (config, path) = load_tactics_config_from_env();
    assert!(path.is_some(), "fixture config should be read from disk");
    assert_eq!(config.episode.max_ticks(), 20);
    // Sections missing from the fixture keep their defaults.
    assert_eq!(config.threat.middle.multiplier, 0.5);
}

#[test]
fn app_initializes() {
    common::ensure_test_config();
    let (config, _) = load_tactics_config_from_env();
    let mut app = build_episode_app(
        config,
        TerrainModel::open(GridDims::new(16, 16)),
        PayoffMatrix::template(),
    );
    // An empty frame runs the whole schedule and issues nothing.
    let commands = run_tick(&mut app, HostFrame::default());
    assert!(commands.is_empty());
}
