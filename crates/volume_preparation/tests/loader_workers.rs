//! Worker lifecycle and determinism tests for DataLoader.
//!
//! Tests cover:
//! - Identical batches for 0 and K workers
//! - Worker failures (panics, timeouts) and fusing
//! - Early drop of an iterator with work in flight
//! - Thread naming and worker IDs

mod common;
use common::{identity_pipelines, in_memory_dataset, PanicAt, SlowAt};
use volume_preparation::{
    dataloader::{current_worker_id, DataLoader, DataLoaderConfig},
    dataset::Dataset,
    transforms::{Compose, Identity, Interpolation, RandRotate, RandomPatch, ScaleIntensity},
    PairedPipelines, Sample, VolumeError,
};

use anyhow::Result;
use std::collections::HashSet;
use std::sync::Mutex;
use std::time::{Duration, Instant};

fn random_pipelines() -> Result<PairedPipelines> {
    PairedPipelines::new(
        Compose::new()
            .push(ScaleIntensity::default())
            .push(RandRotate::new((-20.0, 20.0), (0, 1), 0.5, Interpolation::Trilinear)?)
            .push(RandomPatch::new([4, 4, 3])?),
        Compose::new()
            .push(Identity)
            .push(RandRotate::new((-20.0, 20.0), (0, 1), 0.5, Interpolation::Nearest)?)
            .push(RandomPatch::new([4, 4, 3])?),
    )
}

fn run_epochs(num_workers: usize, epochs: usize) -> Result<Vec<volume_preparation::MiniBatch>> {
    let dataset = in_memory_dataset(11, [6, 6, 4], random_pipelines()?);
    let config = DataLoaderConfig::builder()
        .batch_size(3)
        .num_workers(num_workers)
        .shuffle(true)
        .seed(2024)
        .build();
    let loader = DataLoader::new(dataset, config)?;
    let mut out = Vec::new();
    for _ in 0..epochs {
        for batch in loader.iter()? {
            out.push(batch?);
        }
    }
    Ok(out)
}

// ============================================================================
// 1. Determinism
// ============================================================================

#[test]
fn test_worker_count_does_not_change_batches() -> Result<()> {
    let reference = run_epochs(0, 2)?;
    assert_eq!(reference.len(), 8);
    for workers in [1, 2, 3, 5] {
        let parallel = run_epochs(workers, 2)?;
        assert_eq!(parallel, reference, "num_workers={} diverged", workers);
    }
    Ok(())
}

#[test]
fn test_out_of_order_completion_is_reordered() -> Result<()> {
    // Index 0 is slow, so later batches finish first.
    let dataset = SlowAt {
        inner: in_memory_dataset(8, [2, 2, 2], identity_pipelines()),
        indices: vec![0],
        delay: Duration::from_millis(200),
    };
    let config = DataLoaderConfig::builder()
        .batch_size(2)
        .num_workers(4)
        .build();
    let loader = DataLoader::new(dataset, config)?;

    let firsts = loader
        .iter()?
        .map(|b| b.and_then(|b| Ok(b.image()?[[0, 0, 0, 0]])))
        .collect::<Result<Vec<_>>>()?;
    // Sample i carries an offset of 1000 * i at voxel (0, 0, 0).
    assert_eq!(firsts, vec![0.0, 2000.0, 4000.0, 6000.0]);
    Ok(())
}

// ============================================================================
// 2. Failures
// ============================================================================

#[test]
fn test_worker_panic_is_reported_and_iteration_continues() -> Result<()> {
    let dataset = PanicAt {
        inner: in_memory_dataset(6, [2, 2, 2], identity_pipelines()),
        index: 3,
    };
    let config = DataLoaderConfig::builder()
        .batch_size(2)
        .num_workers(2)
        .build();
    let loader = DataLoader::new(dataset, config)?;

    let results: Vec<_> = loader.iter()?.collect();
    assert_eq!(results.len(), 3);
    assert!(results[0].is_ok());
    assert!(results[2].is_ok());
    let err = results[1].as_ref().unwrap_err();
    match VolumeError::kind_of(err) {
        Some(VolumeError::Worker(msg)) => assert!(msg.contains("injected failure at index 3")),
        other => panic!("expected a worker error, got {:?}", other),
    }
    Ok(())
}

#[test]
fn test_timeout_is_worker_error_and_fuses() -> Result<()> {
    let dataset = SlowAt {
        inner: in_memory_dataset(4, [2, 2, 2], identity_pipelines()),
        indices: vec![0],
        delay: Duration::from_millis(500),
    };
    let config = DataLoaderConfig::builder()
        .batch_size(1)
        .num_workers(2)
        .timeout(Duration::from_millis(50))
        .build();
    let loader = DataLoader::new(dataset, config)?;

    let mut iter = loader.iter()?;
    let err = iter.next().unwrap().unwrap_err();
    assert!(matches!(
        VolumeError::kind_of(&err),
        Some(VolumeError::Worker(_))
    ));
    assert!(iter.next().is_none());
    assert!(iter.next().is_none());
    Ok(())
}

#[test]
fn test_sample_errors_from_workers_keep_their_kind() -> Result<()> {
    struct Failing;
    impl Dataset for Failing {
        fn len(&self) -> usize {
            4
        }
        fn get_sample(&self, index: usize, _seed: u64) -> Result<Sample> {
            Err(VolumeError::Index { index, len: 0 }.into())
        }
    }

    let config = DataLoaderConfig::builder().num_workers(2).build();
    let loader = DataLoader::new(Failing, config)?;
    let results: Vec<_> = loader.iter()?.collect();
    assert_eq!(results.len(), 4);
    for (i, result) in results.iter().enumerate() {
        let err = result.as_ref().unwrap_err();
        assert_eq!(
            VolumeError::kind_of(err),
            Some(&VolumeError::Index { index: i, len: 0 })
        );
    }
    Ok(())
}

// ============================================================================
// 3. Lifecycle
// ============================================================================

#[test]
fn test_early_drop_does_not_hang() -> Result<()> {
    let dataset = SlowAt {
        inner: in_memory_dataset(40, [2, 2, 2], identity_pipelines()),
        indices: (0..40).collect(),
        delay: Duration::from_millis(20),
    };
    let config = DataLoaderConfig::builder()
        .batch_size(2)
        .num_workers(3)
        .prefetch_factor(2)
        .build();
    let loader = DataLoader::new(dataset, config)?;

    let start = Instant::now();
    {
        let mut iter = loader.iter()?;
        iter.next().unwrap()?;
        // Workers still hold queued batches here.
    }
    assert!(start.elapsed() < Duration::from_secs(5));

    // The loader is usable again after the early drop.
    assert_eq!(loader.iter()?.count(), 20);
    Ok(())
}

#[test]
fn test_workers_are_named_and_numbered() -> Result<()> {
    struct Recording {
        seen: Mutex<HashSet<(String, Option<usize>)>>,
    }
    impl Dataset for Recording {
        fn len(&self) -> usize {
            12
        }
        fn get_sample(&self, index: usize, _seed: u64) -> Result<Sample> {
            let name = std::thread::current().name().unwrap_or("").to_string();
            self.seen.lock().unwrap().insert((name, current_worker_id()));
            let volume =
                volume_preparation::Volume::from_shape_vec(&[1, 1, 1], vec![index as f32])?;
            Ok(Sample::from_single("image", volume))
        }
    }

    let config = DataLoaderConfig::builder().num_workers(3).build();
    let loader = DataLoader::new(
        Recording {
            seen: Mutex::new(HashSet::new()),
        },
        config,
    )?;
    assert_eq!(loader.iter()?.count(), 12);

    let seen = loader.dataset().seen.lock().unwrap().clone();
    assert_eq!(seen.len(), 3);
    for (name, id) in seen {
        let id = id.expect("worker id set on loader threads");
        assert_eq!(name, format!("volume-loader-worker-{}", id));
        assert!(id < 3);
    }
    assert_eq!(current_worker_id(), None);
    Ok(())
}
