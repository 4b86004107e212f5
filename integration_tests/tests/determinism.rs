mod common;

use tactics_core::arena::{ArenaConfig, ArenaHost};
use tactics_core::{load_tactics_config_from_env, EpochReport, EpochRunner, MemoryStore};

fn run_epochs(seed: u64, epochs: u64) -> (Vec<EpochReport>, MemoryStore) {
    common::ensure_test_config();
    let (config, _) = load_tactics_config_from_env();
    let runner = EpochRunner::new(config);
    let mut store = MemoryStore::default();
    let reports = (0..epochs)
        .map(|epoch| {
            let mut host = ArenaHost::new(ArenaConfig {
                seed: seed + epoch,
                ..ArenaConfig::default()
            })
            .expect("valid arena");
            runner
                .run_epoch(epoch, &mut host, &mut store)
                .expect("epoch completes")
        })
        .collect();
    (reports, store)
}

#[test]
fn identical_seeds_give_identical_results() {
    let (reports_a, store_a) = run_epochs(11, 3);
    let (reports_b, store_b) = run_epochs(11, 3);

    for (a, b) in reports_a.iter().zip(&reports_b) {
        assert_eq!(a.results, b.results);
        assert_eq!(a.settlements, b.settlements);
        assert_eq!(
            serde_json::to_string(&a.results).unwrap(),
            serde_json::to_string(&b.results).unwrap()
        );
    }
    assert_eq!(store_a.matrix(), store_b.matrix());
    assert_eq!(store_a.saves(), 3);
}
