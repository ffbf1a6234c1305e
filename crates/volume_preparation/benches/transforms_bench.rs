use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use volume_preparation::dataloader::{DataLoader, DataLoaderConfig};
use volume_preparation::transforms::{
    Compose, Identity, Interpolation, RandomPatch, Rotate, SampleRng, ScaleIntensity, Transform,
};
use volume_preparation::{InMemoryPairSource, PairedDataset, PairedPipelines, Volume};

/// Benchmarks for the volume transforms and the batch loader.
///
/// This measures:
/// 1. Resampling: rotation cost per voxel for both interpolation modes
/// 2. Loading: one epoch of paired patches for 0..=4 workers
///
/// To run these, use:
/// ```bash
/// cargo bench --bench transforms_bench
/// ```

/// Cube edge lengths swept by the resampling benchmark.
const EDGES: [usize; 3] = [32, 64, 96];

fn ramp(edge: usize) -> Volume {
    let n = edge * edge * edge;
    Volume::from_shape_vec(&[edge, edge, edge], (0..n).map(|v| (v % 251) as f32).collect())
        .unwrap()
}

fn bench_rotation(c: &mut Criterion) {
    let mut group = c.benchmark_group("Rotate 17 degrees");

    for &edge in &EDGES {
        let volume = ramp(edge);
        group.throughput(Throughput::Elements((edge * edge * edge) as u64));

        for interpolation in [Interpolation::Nearest, Interpolation::Trilinear] {
            let rotate = Rotate::new(17.0, (0, 1), interpolation).unwrap();
            let id = BenchmarkId::new(format!("{:?}", interpolation), edge);
            group.bench_with_input(id, &volume, |b, volume| {
                b.iter(|| {
                    let out = rotate
                        .apply(volume.clone(), &mut SampleRng::new(0))
                        .unwrap();
                    black_box(out);
                })
            });
        }
    }
    group.finish();
}

fn bench_loader_epoch(c: &mut Criterion) {
    let mut group = c.benchmark_group("Loader epoch (32 pairs, 48^3)");
    group.sample_size(10);

    for workers in [0usize, 1, 2, 4] {
        let pairs = (0..32).map(|_| (ramp(48), ramp(48))).collect();
        let pipelines = PairedPipelines::new(
            Compose::new()
                .push(ScaleIntensity::default())
                .push(Rotate::new(10.0, (0, 1), Interpolation::Trilinear).unwrap())
                .push(RandomPatch::new([32, 32, 32]).unwrap()),
            Compose::new()
                .push(Identity)
                .push(Rotate::new(10.0, (0, 1), Interpolation::Nearest).unwrap())
                .push(RandomPatch::new([32, 32, 32]).unwrap()),
        )
        .unwrap();
        let dataset = PairedDataset::new(InMemoryPairSource::new(pairs), pipelines);
        let config = DataLoaderConfig::builder()
            .batch_size(4)
            .num_workers(workers)
            .seed(0)
            .build();
        let loader = DataLoader::new(dataset, config).unwrap();

        group.bench_with_input(BenchmarkId::new("workers", workers), &loader, |b, loader| {
            b.iter(|| {
                let mut voxels = 0usize;
                for batch in loader.iter().unwrap() {
                    voxels += batch.unwrap().image().unwrap().len();
                }
                black_box(voxels);
            })
        });
    }
    group.finish();
}

criterion_group!(benches, bench_rotation, bench_loader_epoch);
criterion_main!(benches);
