use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tempfile::tempdir;

use super::*;
use crate::logic::error::DetectorError;

/// `n` points scattered within ±spread of `center` in every dimension
fn cluster(rng: &mut StdRng, n: usize, center: &[f64], spread: f64) -> Vec<Embedding> {
    (0..n)
        .map(|_| center.iter().map(|c| c + rng.gen_range(-spread..spread)).collect())
        .collect()
}

fn opts(map_size: usize, iterations: usize) -> TrainOptions {
    TrainOptions {
        map_size,
        iterations,
        parallelism: 1,
        recreate: false,
    }
}

// ============================================================================
// SOM ENGINE
// ============================================================================

#[test]
fn test_training_is_deterministic_under_seed() {
    let mut rng = StdRng::seed_from_u64(11);
    let data = cluster(&mut rng, 300, &[0.2, 0.7, 0.5, 0.1], 0.1);

    let mut a = SomEngine::seeded(42);
    let mut b = SomEngine::seeded(42);
    a.train(&data, opts(5, 500)).unwrap();
    b.train(&data, opts(5, 500)).unwrap();

    assert_eq!(a.grid(), b.grid());
    let sa = a.score(&data, 1).unwrap();
    let sb = b.score(&data, 4).unwrap();
    assert_eq!(sa, sb);
}

#[test]
fn test_scores_are_non_negative_and_zero_on_prototypes() {
    let mut rng = StdRng::seed_from_u64(3);
    let data = cluster(&mut rng, 100, &[0.5, 0.5, 0.5], 0.3);

    let mut engine = SomEngine::seeded(1);
    engine.train(&data, opts(3, 200)).unwrap();

    let scores = engine.score(&data, 2).unwrap();
    assert!(scores.iter().all(|s| *s >= 0.0));

    let grid = engine.grid().unwrap();
    let proto: Embedding = grid.prototype((2, 1)).to_vec();
    let on_proto = engine.score(&[proto.clone()], 1).unwrap();
    assert_eq!(on_proto, vec![0.0]);

    let mut off = proto;
    off[0] += 10.0;
    assert!(engine.score(&[off], 1).unwrap()[0] > 0.0);
}

#[test]
fn test_neighborhood_is_monotonic() {
    let bmu = (5, 5);
    let at_bmu = neighborhood(bmu, bmu);
    assert_eq!(at_bmu, 1.0);

    let mut last = at_bmu;
    for step in 1..8 {
        let h = neighborhood(bmu, (5 + step, 5));
        assert!(h <= last);
        assert!(h <= at_bmu);
        last = h;
    }
    assert!(neighborhood(bmu, (6, 6)) < neighborhood(bmu, (6, 5)));
}

#[test]
fn test_learning_rate() {
    for t in 0..5 {
        assert_eq!(learning_rate(0, t), 0.0);
    }
    assert_eq!(learning_rate(10, 0), 1.0);
    assert!((learning_rate(10, 5) - 0.5).abs() < 1e-12);
    assert!((learning_rate(10, 9) - 0.1).abs() < 1e-12);
}

#[test]
fn test_two_by_two_grid_on_2000_embeddings() {
    let mut rng = StdRng::seed_from_u64(2000);
    let data = cluster(&mut rng, 2000, &[0.3; 8], 0.05);

    let mut engine = SomEngine::seeded(55);
    engine.train(&data, opts(2, 4500)).unwrap();
    let scores = engine.score(&data, 4).unwrap();

    assert_eq!(scores.len(), 2000);
    assert!(scores.iter().sum::<f64>() <= 2000.0);
    assert_eq!(engine.grid().unwrap().map_size(), 2);
}

#[test]
fn test_cold_then_warm_start() {
    let mut rng = StdRng::seed_from_u64(9);
    let data = cluster(&mut rng, 50, &[0.5, 0.5], 0.2);

    let mut engine = SomEngine::seeded(9);
    assert!(engine.grid().is_none());

    engine.train(&data, opts(3, 100)).unwrap();
    let trained = engine.grid().cloned().unwrap();
    assert_eq!(trained.map_size(), 3);
    assert_eq!(trained.dim(), 2);

    // Warm start with zero iterations keeps the same prototypes
    engine.train(&data, opts(3, 0)).unwrap();
    assert_eq!(engine.grid(), Some(&trained));

    // Further refinement moves the existing prototypes, same shape
    engine.train(&data, opts(3, 50)).unwrap();
    let refined = engine.grid().unwrap();
    assert_eq!(refined.map_size(), 3);
    assert_ne!(refined, &trained);

    // Recreate discards the grid even without iterations
    engine.train(&data, TrainOptions { recreate: true, ..opts(4, 0) }).unwrap();
    assert_eq!(engine.grid().unwrap().map_size(), 4);
}

#[test]
fn test_single_cell_grid() {
    let data = vec![vec![1.0, 1.0], vec![3.0, 3.0]];
    let mut engine = SomEngine::seeded(5);
    engine.train(&data, opts(1, 200)).unwrap();

    let grid = engine.grid().unwrap();
    assert_eq!(grid.cells(), 1);
    let scores = engine.score(&data, 1).unwrap();
    assert_eq!(scores.len(), 2);
}

#[test]
fn test_train_on_empty_fails() {
    let mut engine = SomEngine::seeded(1);
    let err = engine.train(&[], opts(2, 10)).unwrap_err();
    assert!(matches!(err, DetectorError::EmptyDataSet(_)));
    assert!(engine.grid().is_none());
}

#[test]
fn test_parallel_scoring_preserves_order() {
    let mut rng = StdRng::seed_from_u64(21);
    let data = cluster(&mut rng, 400, &[0.1, 0.9, 0.4], 0.3);

    let mut engine = SomEngine::seeded(21);
    engine.train(&data, opts(4, 300)).unwrap();

    let sequential = engine.score(&data, 1).unwrap();
    assert_eq!(engine.score(&data, 8).unwrap(), sequential);
    // Below one worker behaves as one worker
    assert_eq!(engine.score(&data, 0).unwrap(), sequential);
}

#[test]
fn test_dimension_mismatch_on_warm_start() {
    let mut engine = SomEngine::seeded(2);
    engine.train(&[vec![0.1, 0.2]], opts(2, 5)).unwrap();

    let err = engine.train(&[vec![0.1, 0.2, 0.3]], opts(2, 5)).unwrap_err();
    assert!(matches!(err, DetectorError::IncompatibleEmbeddingShape { expected: 2, actual: 3 }));

    let err = engine.score(&[vec![0.1]], 1).unwrap_err();
    assert!(matches!(err, DetectorError::IncompatibleEmbeddingShape { expected: 2, actual: 1 }));
}

#[test]
fn test_map_size_change_reallocates_on_warm_start() {
    let mut rng = StdRng::seed_from_u64(8);
    let data = cluster(&mut rng, 30, &[0.3, 0.6], 0.1);

    let mut engine = SomEngine::seeded(8);
    engine.train(&data, opts(3, 50)).unwrap();
    assert_eq!(engine.grid().unwrap().map_size(), 3);

    engine.train(&data, opts(4, 50)).unwrap();
    assert_eq!(engine.grid().unwrap().map_size(), 4);
    assert_eq!(engine.score(&data, 1).unwrap().len(), data.len());

    // Dimensionality is still checked when the size matches
    let err = engine.train(&[vec![0.1, 0.2, 0.3]], opts(4, 5)).unwrap_err();
    assert!(matches!(err, DetectorError::IncompatibleEmbeddingShape { expected: 2, actual: 3 }));
}

#[test]
fn test_scoring_pool_is_reusable() {
    let mut rng = StdRng::seed_from_u64(23);
    let data = cluster(&mut rng, 200, &[0.2, 0.5, 0.8], 0.2);
    let mut engine = SomEngine::seeded(23);
    engine.train(&data, opts(4, 200)).unwrap();
    let sequential = engine.score(&data, 1).unwrap();

    let pool = ScoringPool::new(4);
    assert_eq!(pool.workers(), 4);
    assert!(pool.is_parallel());
    for _ in 0..3 {
        assert_eq!(engine.score_with(&pool, &data).unwrap(), sequential);
    }

    let single = ScoringPool::new(0);
    assert_eq!(single.workers(), 1);
    assert!(!single.is_parallel());
    assert_eq!(single.score(engine.grid().unwrap(), &data).unwrap(), sequential);
}

#[test]
fn test_ragged_and_non_finite_input_rejected() {
    let mut engine = SomEngine::seeded(2);
    let ragged = vec![vec![0.1, 0.2], vec![0.3]];
    assert!(matches!(
        engine.train(&ragged, opts(2, 5)),
        Err(DetectorError::IncompatibleEmbeddingShape { .. })
    ));

    let nan = vec![vec![0.1, f64::NAN]];
    assert!(matches!(engine.train(&nan, opts(2, 5)), Err(DetectorError::InvalidInput(_))));
}

#[test]
fn test_score_without_grid() {
    let engine = SomEngine::seeded(2);
    assert!(matches!(engine.score(&[vec![0.0]], 1), Err(DetectorError::ModelLoad(_))));
}

// ============================================================================
// PERSISTENCE
// ============================================================================

fn trained_state() -> ModelState {
    let mut rng = StdRng::seed_from_u64(4);
    let data = cluster(&mut rng, 60, &[0.4, 0.6, 0.2], 0.1);
    let mut engine = SomEngine::seeded(4);
    engine.train(&data, opts(3, 120)).unwrap();
    let scores = engine.score(&data, 1).unwrap();
    let metadata = ScoreMetadata::from_scores(&scores).unwrap();
    ModelState::new(engine.take_grid().unwrap(), metadata)
}

#[test]
fn test_save_load_cycle() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("models").join("SOM.model");

    let original = trained_state();
    save_model(&original, &path).unwrap();

    let loaded = load_model(&path).unwrap();
    assert_eq!(loaded, original);

    // Only the final file remains
    let entries: Vec<_> = std::fs::read_dir(path.parent().unwrap()).unwrap().collect();
    assert_eq!(entries.len(), 1);
}

#[test]
fn test_load_missing_model() {
    let dir = tempdir().unwrap();
    let err = load_model(&dir.path().join("absent.model")).unwrap_err();
    assert!(matches!(err, DetectorError::ModelLoad(_)));
    assert!(err.is_recoverable());
}

#[test]
fn test_load_garbage_model() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("SOM.model");
    std::fs::write(&path, b"not a model").unwrap();

    assert!(matches!(load_model(&path), Err(DetectorError::ModelLoad(_))));
}

#[test]
fn test_reject_checksum_mismatch() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("SOM.model");

    let mut state = trained_state();
    state.checksum = !state.checksum;
    save_model(&state, &path).unwrap();

    match load_model(&path) {
        Err(DetectorError::ModelLoad(msg)) => assert!(msg.contains("checksum")),
        other => panic!("Expected ModelLoad error, got {:?}", other),
    }
}

#[test]
fn test_reject_format_version_mismatch() {
    let mut state = trained_state();
    state.format_version = storage::MODEL_FORMAT_VERSION + 1;
    assert!(matches!(state.validate(), Err(DetectorError::ModelLoad(_))));
}
