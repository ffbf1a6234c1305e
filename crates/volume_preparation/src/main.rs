use anyhow::{bail, Context, Result};
use clap::Parser;
use log::{error, info};
use ndarray::ArrayD;
use std::path::PathBuf;
use volume_preparation::{
    DataLoader, DataLoaderConfig, FileListing, FilePairSource, PairedDataset, PipelineConfig,
    VolumeError,
};

#[derive(Parser)]
#[command(name = "volprep")]
#[command(about = "Load paired NIfTI volumes through augmentation pipelines")]
struct Args {
    /// Directory holding the image and label files
    #[arg(long)]
    dir: PathBuf,

    /// File-name pattern of the images (e.g. "im*.nii.gz")
    #[arg(long)]
    image_glob: String,

    /// File-name pattern of the labels (e.g. "seg*.nii.gz")
    #[arg(long)]
    label_glob: String,

    /// JSON pipeline description; defaults to a random-patch recipe
    #[arg(long)]
    pipeline: Option<PathBuf>,

    /// Edge length of the default random patch
    #[arg(long, default_value_t = 64)]
    patch: usize,

    #[arg(long, default_value_t = 2)]
    batch_size: usize,

    /// Number of loader worker threads (0 = load on the main thread)
    #[arg(long, default_value_t = 0)]
    workers: usize,

    #[arg(long, default_value_t = 1)]
    epochs: usize,

    #[arg(long)]
    seed: Option<u64>,

    #[arg(long)]
    shuffle: bool,

    #[arg(long)]
    drop_last: bool,

    /// Also scan subdirectories of --dir
    #[arg(long)]
    recurse: bool,

    /// Log level, overridden by RUST_LOG
    #[arg(long, default_value = "info")]
    log_level: String,
}

fn value_range(array: &ArrayD<f32>) -> (f32, f32) {
    array
        .iter()
        .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), &v| {
            (lo.min(v), hi.max(v))
        })
}

fn main() -> Result<()> {
    let args = Args::parse();

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(&args.log_level))
        .init();

    let pipeline = match &args.pipeline {
        Some(path) => PipelineConfig::from_file(path)?,
        None => PipelineConfig::random_patch([args.patch; 3]),
    };
    let pipelines = pipeline.build().context("Failed to build pipelines")?;

    let listing =
        FileListing::from_patterns(&args.dir, &args.image_glob, &args.label_glob, args.recurse)?;
    let dataset = PairedDataset::new(FilePairSource::nifti(listing), pipelines);

    let mut builder = DataLoaderConfig::builder()
        .batch_size(args.batch_size)
        .num_workers(args.workers)
        .shuffle(args.shuffle)
        .drop_last(args.drop_last);
    if let Some(seed) = args.seed {
        builder = builder.seed(seed);
    }
    let loader = DataLoader::new(dataset, builder.build())?;
    info!(
        "{} batches per epoch, seed {}",
        loader.len(),
        loader.seed()
    );

    let mut failed = 0usize;
    for _ in 0..args.epochs {
        let iter = loader.iter()?;
        let epoch = iter.epoch();
        for (i, batch) in iter.enumerate() {
            match batch {
                Ok(batch) => {
                    let image = batch.image()?;
                    let label = batch.label()?;
                    let (image_lo, image_hi) = value_range(image);
                    let (label_lo, label_hi) = value_range(label);
                    info!(
                        "epoch {} batch {}: image {:?} [{:.3}, {:.3}], label {:?} [{:.3}, {:.3}]",
                        epoch,
                        i,
                        image.shape(),
                        image_lo,
                        image_hi,
                        label.shape(),
                        label_lo,
                        label_hi
                    );
                }
                Err(err) => {
                    if matches!(VolumeError::kind_of(&err), Some(VolumeError::Worker(_))) {
                        return Err(err.context(format!("Epoch {} aborted", epoch)));
                    }
                    failed += 1;
                    error!("epoch {} batch {} failed: {:#}", epoch, i, err);
                }
            }
        }
    }

    if failed > 0 {
        bail!("{} batches failed to load", failed);
    }
    Ok(())
}
