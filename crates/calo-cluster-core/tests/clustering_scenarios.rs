//! End-to-end clustering scenarios through the public API.

use std::collections::{BTreeMap, BTreeSet};

use calo_cluster_core::{
    disambiguate_partition_labels, CaloClusterConfig, Clusterer, ClusteringStrategy, Embeddings,
    HitBatch, UNASSIGNED_LABEL,
};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Event with `instances` particles per semantic class, each a tight blob
/// around its own axis. Returns embeddings, semantic labels and the
/// ground-truth (class, instance) pair of every hit.
fn synthetic_event(
    classes: &[i64],
    instances: usize,
    hits_per_instance: usize,
    seed: u64,
) -> (Embeddings, Vec<i64>, Vec<(i64, usize)>) {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let dim = classes.len() * instances;
    let mut rows = Vec::new();
    let mut semantic = Vec::new();
    let mut truth = Vec::new();
    for _ in 0..hits_per_instance {
        for (c, &class) in classes.iter().enumerate() {
            for k in 0..instances {
                let mut row: Vec<f32> = (0..dim).map(|_| rng.gen_range(-0.03f32..0.03)).collect();
                row[c * instances + k] += rng.gen_range(0.5f32..5.0);
                rows.push(row);
                semantic.push(class);
                truth.push((class, k));
            }
        }
    }
    (Embeddings::from_rows(&rows).unwrap(), semantic, truth)
}

fn assert_partition_matches<T: Ord + Copy>(labels: &[i64], truth: &[T]) {
    let mut seen: BTreeMap<T, i64> = BTreeMap::new();
    let mut used: BTreeMap<i64, T> = BTreeMap::new();
    for (&label, &t) in labels.iter().zip(truth) {
        assert_eq!(*seen.entry(t).or_insert(label), label, "one instance split");
        assert!(*used.entry(label).or_insert(t) == t, "two instances merged");
    }
}

#[test]
fn test_semantic_mean_shift_from_toml() {
    init_tracing();
    let config = CaloClusterConfig::from_toml_str(
        r#"
        [clustering]
        use_semantic = true
        ignore_semantic_labels = [0]
        "#,
    )
    .unwrap();
    config.validate().unwrap();
    let strategy = ClusteringStrategy::from_config(&config.clustering).unwrap();

    let (hits, semantic, truth) = synthetic_event(&[0, 1, 2], 2, 6, 17);
    let labels = strategy.cluster(&hits, Some(&semantic)).unwrap();

    for (i, &class) in semantic.iter().enumerate() {
        if class == 0 {
            assert_eq!(labels[i], UNASSIGNED_LABEL);
        } else {
            assert!(labels[i] >= 0);
        }
    }

    // Per class, clusters match the particles.
    for class in [1, 2] {
        let idx: Vec<usize> = (0..semantic.len()).filter(|&i| semantic[i] == class).collect();
        let class_labels: Vec<i64> = idx.iter().map(|&i| labels[i]).collect();
        let class_truth: Vec<usize> = idx.iter().map(|&i| truth[i].1).collect();
        assert_partition_matches(&class_labels, &class_truth);
        // Both classes number from zero.
        assert_eq!(class_labels.iter().copied().collect::<BTreeSet<_>>(), BTreeSet::from([0, 1]));
    }

    // The relabel pass makes them event-unique.
    let unique = disambiguate_partition_labels(&labels, &semantic).unwrap();
    let kept: Vec<usize> = (0..semantic.len()).filter(|&i| semantic[i] != 0).collect();
    let unique_kept: Vec<i64> = kept.iter().map(|&i| unique[i]).collect();
    let truth_kept: Vec<(i64, usize)> = kept.iter().map(|&i| truth[i]).collect();
    assert_partition_matches(&unique_kept, &truth_kept);
    assert!(kept.len() < semantic.len());
    assert!((0..semantic.len())
        .filter(|&i| semantic[i] == 0)
        .all(|i| unique[i] == UNASSIGNED_LABEL));
}

#[test]
fn test_repeated_calls_are_stable() {
    init_tracing();
    let strategy = ClusteringStrategy::from_config(&CaloClusterConfig::default().clustering).unwrap();
    let (hits, _, _) = synthetic_event(&[0], 4, 10, 3);
    let first = strategy.cluster(&hits, None).unwrap();
    for _ in 0..3 {
        assert_eq!(strategy.cluster(&hits, None).unwrap(), first);
    }
}

#[test]
fn test_batch_of_events() {
    init_tracing();
    let strategy = ClusteringStrategy::from_config(&CaloClusterConfig::default().clustering).unwrap();

    let (a, _, truth_a) = synthetic_event(&[0], 3, 5, 1);
    let (b, _, truth_b) = synthetic_event(&[0], 3, 5, 2);

    // Interleave the two events hit by hit.
    let mut rows = Vec::new();
    let mut subbatch = Vec::new();
    let mut truth = Vec::new();
    for i in 0..a.len() {
        rows.push(a.row(i).to_vec());
        subbatch.push(0);
        truth.push((0, truth_a[i].1));
        rows.push(b.row(i).to_vec());
        subbatch.push(1);
        truth.push((1, truth_b[i].1));
    }
    let hits = Embeddings::from_rows(&rows).unwrap();

    let batch = HitBatch::new(&hits).with_subbatch_indices(&subbatch);
    let labels = strategy.cluster_batch(&batch).unwrap();

    for event in [0i64, 1] {
        let idx: Vec<usize> = (0..labels.len()).filter(|&i| subbatch[i] == event).collect();
        let event_labels: Vec<i64> = idx.iter().map(|&i| labels[i]).collect();
        let event_truth: Vec<(i64, usize)> = idx.iter().map(|&i| truth[i]).collect();
        assert_partition_matches(&event_labels, &event_truth);
    }
}

#[test]
fn test_identity_from_config() {
    let config = CaloClusterConfig::from_toml_str("[clustering]\nstrategy = \"identity\"").unwrap();
    let strategy = ClusteringStrategy::from_config(&config.clustering).unwrap();
    let hits = Embeddings::new(vec![2.0, 2.0, 0.0, 5.0], 1).unwrap();
    assert_eq!(strategy.cluster(&hits, Some(&[1, 1, 1, 1])).unwrap(), vec![2, 2, 0, 5]);
}
