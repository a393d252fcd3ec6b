//! End-to-end learner scenarios over synthetic populations.

use lva_common::{ClusterId, Outcome, TrainingExample, UserHistory};
use lva_config::{ClusteringConfig, LearnerKind, LvaConfig, SamplingConfig, SelectionConfig};
use lva_core::interval::intervals;
use lva_core::learner::{PartitionHmmLearner, Predictor};
use lva_core::{build_predictor, LearnerSpec};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

const DAY: f64 = 86_400.0;

/// `n` timestamps with gaps drawn from N(1/rate, (0.2/rate)^2), floored at
/// a tenth of the mean gap so time always moves forward.
fn history(rate: f64, n: usize, rng: &mut StdRng) -> Vec<f64> {
    let mean_gap = 1.0 / rate;
    let mut t = 0.0;
    (0..n)
        .map(|_| {
            let z = lva_math::standard_normal_from_uniforms(1.0 - rng.random::<f64>(), rng.random());
            t += (mean_gap * (1.0 + 0.2 * z)).max(0.1 * mean_gap);
            t
        })
        .collect()
}

/// A user outside the training set.
fn held_out(user: u64, rate: f64, rng: &mut StdRng) -> UserHistory {
    UserHistory::new(user, history(rate, 30, rng))
}

/// 10 users at 0.0001 actions/s and 10 at 0.01 actions/s.
fn population(seed: u64) -> Vec<TrainingExample> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut out = Vec::new();
    for u in 0..10u64 {
        let ts = history(0.0001, 30, &mut rng);
        out.push(TrainingExample::new(u, ts, Outcome::new(9, DAY)));
    }
    for u in 10..20u64 {
        let ts = history(0.01, 30, &mut rng);
        out.push(TrainingExample::new(u, ts, Outcome::new(864, DAY)));
    }
    out
}

fn partition_learner(seed: u64) -> PartitionHmmLearner {
    PartitionHmmLearner::new(
        SelectionConfig {
            max_states: 3,
            ..Default::default()
        },
        ClusteringConfig::default(),
        &SamplingConfig::default(),
        Some(seed),
    )
}

fn start_probs(learner: &PartitionHmmLearner) -> Vec<Vec<f64>> {
    learner
        .bank()
        .clusters()
        .iter()
        .filter_map(|c| c.model.as_ref())
        .map(|m| m.lock().unwrap().start_prob().to_vec())
        .collect()
}

#[test]
fn two_populations_get_two_clusters_and_distinct_predictions() {
    let data = population(1);
    let mut learner = partition_learner(42);
    learner.learn(&data).unwrap();

    let summaries = learner.cluster_summaries();
    assert_eq!(summaries.len(), 2);
    assert_eq!(summaries[0].members, 10);
    assert_eq!(summaries[1].members, 10);
    assert!(summaries.iter().all(|s| s.states.is_some()));

    let mut rng = StdRng::seed_from_u64(100);
    let slow = learner.predict(&held_out(100, 0.0001, &mut rng), DAY).unwrap();
    let fast = learner.predict(&held_out(101, 0.01, &mut rng), DAY).unwrap();
    // Expected counts over a day: 8.64 and 864.
    assert!((3.0..=15.0).contains(&slow), "slow {}", slow);
    assert!((600.0..=1100.0).contains(&fast), "fast {}", fast);
    assert!(fast > 10.0 * slow, "fast {} slow {}", fast, slow);
}

#[test]
fn best_fit_is_deterministic() {
    let data = population(2);
    let mut learner = partition_learner(3);
    learner.learn(&data).unwrap();

    let query = held_out(200, 0.01, &mut StdRng::seed_from_u64(200));
    let seq = intervals(&query.history).unwrap();
    let first = learner.bank().best_fit(seq.as_slice()).unwrap().0;
    assert_eq!(first, ClusterId(1));
    for _ in 0..20 {
        assert_eq!(learner.bank().best_fit(seq.as_slice()).unwrap().0, first);
    }
}

#[test]
fn prediction_leaves_start_distribution_untouched() {
    let data = population(3);
    let mut learner = partition_learner(5);
    learner.learn(&data).unwrap();

    let before = start_probs(&learner);

    learner.predict(&data[4].query(), DAY).unwrap();
    learner.predict(&data[17].query(), DAY).unwrap();
    // A rejected prediction must not leave anything behind either
    assert!(learner.predict(&data[17].query(), -1.0).is_err());

    assert_eq!(start_probs(&learner), before);
}

#[test]
fn concurrent_predictions_restore_start_distribution() {
    let data = population(7);
    let mut learner = partition_learner(11);
    learner.learn(&data).unwrap();

    let before = start_probs(&learner);

    let learner = &learner;
    std::thread::scope(|scope| {
        for t in 0..8u64 {
            scope.spawn(move || {
                let mut rng = StdRng::seed_from_u64(300 + t);
                let rate = if t % 2 == 0 { 0.0001 } else { 0.01 };
                for i in 0..25 {
                    let query = held_out(1000 + t * 100 + i, rate, &mut rng);
                    let p = learner.predict(&query, DAY).unwrap();
                    assert!(p.is_finite() && p >= 0.0);
                }
            });
        }
    });

    assert_eq!(start_probs(learner), before);
}

#[test]
fn same_seed_same_predictions() {
    let data = population(4);
    let query = data[11].query();

    let run = || {
        let mut l = partition_learner(99);
        l.learn(&data).unwrap();
        (0..3).map(|_| l.predict(&query, DAY).unwrap()).collect::<Vec<_>>()
    };
    assert_eq!(run(), run());
}

#[test]
fn every_configured_learner_trains_and_predicts() {
    let data = population(5);
    let mut config = LvaConfig {
        seed: Some(8),
        ..Default::default()
    };
    config.selection.max_states = 2;

    for kind in LearnerKind::ALL {
        let spec = LearnerSpec::from_config(kind, &config);
        let mut predictor = build_predictor(&spec).unwrap();
        predictor.learn(&data).unwrap();
        let p = predictor.predict(&data[15].query(), DAY).unwrap();
        assert!(p.is_finite() && p >= 0.0, "{} predicted {}", predictor.name(), p);
    }
}

#[test]
fn ensemble_of_learners_averages_members() {
    let data = population(6);
    let mut config = LvaConfig::default();
    config.ensemble.members = vec![
        lva_config::EnsembleMember {
            learner: LearnerKind::Simple,
            weight: 0.5,
        },
        lva_config::EnsembleMember {
            learner: LearnerKind::Simple,
            weight: 0.5,
        },
    ];
    let mut ensemble = build_predictor(&LearnerSpec::from_config(LearnerKind::Ensemble, &config)).unwrap();
    let mut simple = build_predictor(&LearnerSpec::from_config(LearnerKind::Simple, &config)).unwrap();
    ensemble.learn(&data).unwrap();
    simple.learn(&data).unwrap();

    let q = UserHistory::new(77u64, vec![0.0, 100.0, 200.0]);
    let a = ensemble.predict(&q, DAY).unwrap();
    let b = simple.predict(&q, DAY).unwrap();
    assert!((a - b).abs() < 1e-9);
    assert_eq!(ensemble.name(), "Combination: SimpleLearner,SimpleLearner");
}
