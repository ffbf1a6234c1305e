//! Single-threaded DataLoader behaviour over paired in-memory volumes.

mod common;
use common::{identity_pipelines, in_memory_dataset, synthetic_pairs};
use volume_preparation::{
    dataloader::{DataLoader, DataLoaderConfig},
    transforms::{Compose, Identity, RandFlip, RandomPatch, ScaleIntensity},
    InMemoryPairSource, PairedDataset, PairedPipelines, VolumeError,
};

use anyhow::Result;

fn patch_pipelines(size: [usize; 3]) -> Result<PairedPipelines> {
    PairedPipelines::new(
        Compose::new()
            .push(ScaleIntensity::default())
            .push(RandFlip::new(1, 0.5)?)
            .push(RandomPatch::new(size)?),
        Compose::new()
            .push(Identity)
            .push(RandFlip::new(1, 0.5)?)
            .push(RandomPatch::new(size)?),
    )
}

#[test]
fn test_loader_batches_in_order() -> Result<()> {
    let dataset = in_memory_dataset(5, [3, 4, 5], identity_pipelines());
    let config = DataLoaderConfig::builder().batch_size(2).seed(0).build();
    let loader = DataLoader::new(dataset, config)?;
    assert_eq!(loader.len(), 3);

    let batches = loader.iter()?.collect::<Result<Vec<_>>>()?;
    assert_eq!(batches.len(), 3);
    assert_eq!(batches[0].image()?.shape(), &[2, 3, 4, 5]);
    assert_eq!(batches[1].label()?.shape(), &[2, 3, 4, 5]);
    assert_eq!(batches[2].batch_size()?, 1);

    // Identity pipelines return the source volumes untouched, in order.
    let pairs = synthetic_pairs(5, [3, 4, 5]);
    let (image, label) = batches[1].clone().into_pair()?;
    assert_eq!(image.index_axis(ndarray::Axis(0), 1), pairs[3].0.data().view());
    assert_eq!(label.index_axis(ndarray::Axis(0), 0), pairs[2].1.data().view());
    Ok(())
}

#[test]
fn test_loader_drop_last() -> Result<()> {
    let dataset = in_memory_dataset(5, [2, 2, 2], identity_pipelines());
    let config = DataLoaderConfig::builder()
        .batch_size(2)
        .drop_last(true)
        .build();
    let loader = DataLoader::new(dataset, config)?;
    assert_eq!(loader.len(), 2);
    let sizes = loader
        .iter()?
        .map(|b| b.and_then(|b| b.batch_size()))
        .collect::<Result<Vec<_>>>()?;
    assert_eq!(sizes, vec![2, 2]);
    Ok(())
}

#[test]
fn test_rescaled_images_stay_in_unit_range() -> Result<()> {
    let dataset = in_memory_dataset(4, [6, 6, 6], patch_pipelines([4, 4, 4])?);
    let config = DataLoaderConfig::builder().batch_size(2).seed(3).build();
    let loader = DataLoader::new(dataset, config)?;
    for batch in loader.iter()? {
        let batch = batch?;
        assert_eq!(batch.image()?.shape(), &[2, 4, 4, 4]);
        assert!(batch.image()?.iter().all(|&v| (0.0..=1.0).contains(&v)));
        assert!(batch.label()?.iter().all(|&v| v == 0.0 || v == 1.0));
    }
    Ok(())
}

#[test]
fn test_same_seed_reproduces_epochs() -> Result<()> {
    let make = || -> Result<DataLoader<_>> {
        let dataset = in_memory_dataset(6, [5, 5, 5], patch_pipelines([3, 3, 3])?);
        let config = DataLoaderConfig::builder()
            .batch_size(3)
            .shuffle(true)
            .seed(11)
            .build();
        DataLoader::new(dataset, config)
    };
    let a = make()?;
    let b = make()?;

    let a0 = a.iter()?.collect::<Result<Vec<_>>>()?;
    let b0 = b.iter()?.collect::<Result<Vec<_>>>()?;
    assert_eq!(a0, b0);

    // The next epoch draws new augmentations.
    let a1 = a.iter()?.collect::<Result<Vec<_>>>()?;
    assert_ne!(a0, a1);
    Ok(())
}

#[test]
fn test_failed_sample_fails_only_its_batch() -> Result<()> {
    // Pair 2 is too small for the patch.
    let mut pairs = synthetic_pairs(4, [4, 4, 4]);
    pairs[2] = synthetic_pairs(1, [2, 4, 4]).remove(0);
    let dataset = PairedDataset::new(InMemoryPairSource::new(pairs), patch_pipelines([3, 3, 3])?);
    let config = DataLoaderConfig::builder().batch_size(1).build();
    let loader = DataLoader::new(dataset, config)?;

    let results: Vec<_> = loader.iter()?.collect();
    assert_eq!(results.len(), 4);
    assert!(results[0].is_ok() && results[1].is_ok() && results[3].is_ok());

    let err = results[2].as_ref().unwrap_err();
    assert!(format!("{:#}", err).contains("index 2"));
    assert!(matches!(
        VolumeError::kind_of(err),
        Some(VolumeError::Shape(_))
    ));
    Ok(())
}

#[test]
fn test_empty_dataset_yields_nothing() -> Result<()> {
    let dataset = in_memory_dataset(0, [2, 2, 2], identity_pipelines());
    let config = DataLoaderConfig::builder().shuffle(true).num_workers(2).build();
    let loader = DataLoader::new(dataset, config)?;
    assert!(loader.is_empty());
    assert_eq!(loader.iter()?.count(), 0);
    Ok(())
}

#[test]
fn test_invalid_config_is_rejected() {
    let dataset = in_memory_dataset(2, [2, 2, 2], identity_pipelines());
    let config = DataLoaderConfig::builder().batch_size(0).build();
    let err = DataLoader::new(dataset, config).err().unwrap();
    assert!(matches!(
        VolumeError::kind_of(&err),
        Some(VolumeError::InvalidConfig(_))
    ));
}
