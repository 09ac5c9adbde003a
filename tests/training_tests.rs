//! Training loop integration tests.

use burn::backend::{Autodiff, NdArray};
use burn::module::AutodiffModule;
use burn::optim::AdamConfig;
use rand::rngs::StdRng;
use rand::SeedableRng;

use dimorph::config::ConditionalVaeConfig;
use dimorph::data::pose::RigidAlignment;
use dimorph::data::stats::NormStats;
use dimorph::data::MeshSample;
use dimorph::graph::{DenseMatrix, MeshTopology};
use dimorph::nn::ConditionalVae;
use dimorph::training::{evaluate_epoch, train_epoch};

type TestBackend = Autodiff<NdArray>;

fn ring_topology(n: usize) -> MeshTopology {
    let mut values = vec![0.0f32; n * n];
    for i in 0..n {
        values[i * n + (i + 1) % n] = 1.0;
        values[((i + 1) % n) * n + i] = 1.0;
    }
    MeshTopology::single_level(
        DenseMatrix::new(n, n, values).unwrap(),
        vec![[0, 1, 2], [0, 2, 3]],
    )
}

/// Two well-separated clusters, one per attribute class.
fn synthetic_samples(count: usize, vertices: usize) -> Vec<MeshSample> {
    (0..count)
        .map(|i| {
            let label = (i % 2) as u8;
            let offset = if label == 0 { -2.0 } else { 2.0 };
            let jitter = (i as f32 * 0.37).sin() * 0.1;
            let verts: Vec<[f32; 3]> = (0..vertices)
                .map(|v| {
                    let t = v as f32 * 0.2;
                    [offset + t + jitter, t * 0.5, jitter]
                })
                .collect();
            MeshSample::new(
                format!("subject_{i}"),
                verts.clone(),
                verts,
                label,
                RigidAlignment::identity(),
            )
            .unwrap()
        })
        .collect()
}

fn tiny_config() -> ConditionalVaeConfig {
    ConditionalVaeConfig::new(vec![8])
        .with_latent_dim(4)
        .with_feature_dim(8)
        .with_classifier_hidden(vec![8])
}

#[test]
fn test_training_reduces_loss() {
    let device = Default::default();
    let topology = ring_topology(4);
    let samples = synthetic_samples(8, 4);
    let refs: Vec<&MeshSample> = samples.iter().collect();
    let stats = NormStats::from_samples(&refs).unwrap();

    let mut model = tiny_config()
        .init::<TestBackend>(&topology, &device)
        .unwrap();
    let mut optimizer = AdamConfig::new().init::<TestBackend, ConditionalVae<TestBackend>>();
    let mut rng = StdRng::seed_from_u64(11);

    let mut first_loss = None;
    let mut last_loss = 0.0;
    for _ in 0..30 {
        let (stepped, metrics) = train_epoch(
            model,
            &mut optimizer,
            1e-2,
            &refs,
            &stats,
            4,
            &mut rng,
            &device,
        )
        .unwrap();
        model = stepped;
        first_loss.get_or_insert(metrics.loss);
        last_loss = metrics.loss;
    }

    assert!(last_loss.is_finite());
    assert!(
        last_loss < first_loss.unwrap(),
        "loss did not decrease: {first_loss:?} -> {last_loss}"
    );
}

#[test]
fn test_evaluation_reports_all_metrics() {
    let device = Default::default();
    let topology = ring_topology(4);
    let samples = synthetic_samples(6, 4);
    let refs: Vec<&MeshSample> = samples.iter().collect();
    let stats = NormStats::from_samples(&refs).unwrap();

    let model = tiny_config()
        .init::<TestBackend>(&topology, &device)
        .unwrap();

    let metrics = evaluate_epoch(&model.valid(), &refs, &stats, 4, &device, None).unwrap();
    assert_eq!(metrics.samples, 6);
    assert!(metrics.loss.is_finite());
    assert!(metrics.kld.is_finite());
    assert!(metrics.reconstruction_loss.is_finite());
    assert!((0.0..=1.0).contains(&metrics.accuracy));
    assert!(metrics.error >= 0.0);
    let swap = metrics.swap_success_rate.expect("swap rate must be measured");
    assert!((0.0..=1.0).contains(&swap));
}

#[test]
fn test_oversized_batch_is_one_batch() {
    let device = Default::default();
    let topology = ring_topology(4);
    let samples = synthetic_samples(5, 4);
    let refs: Vec<&MeshSample> = samples.iter().collect();
    let stats = NormStats::from_samples(&refs).unwrap();

    let model = tiny_config()
        .init::<TestBackend>(&topology, &device)
        .unwrap();
    let mut optimizer = AdamConfig::new().init::<TestBackend, ConditionalVae<TestBackend>>();
    let mut rng = StdRng::seed_from_u64(0);

    // Batch size exceeds the dataset; the whole epoch is one short batch.
    let (_, metrics) = train_epoch(
        model,
        &mut optimizer,
        1e-3,
        &refs,
        &stats,
        64,
        &mut rng,
        &device,
    )
    .unwrap();
    assert_eq!(metrics.samples, 5);
}
