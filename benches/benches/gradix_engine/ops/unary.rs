use criterion::{black_box, Criterion};
use gradix_core::{device::Device, error::Result};
use gradix_engine::{Engine, Tensor};

// Constants for benchmark data sizes
const SIZES: [(usize, &str); 2] = [(1000, "small"), (10000, "medium")];

// Helper function for tensor creation and benchmarking
fn bench_op<F>(
    b: &mut criterion::Bencher,
    device: Device,
    size: usize,
    data_transform: impl Fn(Vec<f32>) -> Vec<f32>,
    op_fn: F,
) where
    F: Fn(&mut Engine, &Tensor) -> Result<Tensor>,
{
    // Generate initial data
    let raw_data: Vec<f32> = (0..size).map(|i| (i % 10) as f32 / 10.0).collect();
    let data = data_transform(raw_data);

    let mut engine = Engine::new(device);
    b.iter(|| {
        engine
            .scope(|eng| {
                let x = eng.tensor(data.clone(), &[size])?;
                let out = op_fn(eng, &x)?;
                black_box(eng.read_f32(&out)?);
                Ok(())
            })
            .unwrap()
    })
}

pub fn basic(criterion: &mut Criterion) {
    let mut group = criterion.benchmark_group("unary/basic");
    group.warm_up_time(core::time::Duration::from_millis(500));
    group.measurement_time(core::time::Duration::from_secs(3));
    group.sample_size(50);

    // Define operations with their data transformations and implementations
    let operations: Vec<(
        &str,
        Box<dyn Fn(Vec<f32>) -> Vec<f32>>,
        Box<dyn Fn(&mut Engine, &Tensor) -> Result<Tensor>>,
    )> = vec![
        // Math operations
        (
            "abs",
            Box::new(|v| v.iter().map(|x| x - 0.5).collect()),
            Box::new(|eng, x| eng.abs(x)),
        ),
        ("neg", Box::new(|v| v), Box::new(|eng, x| eng.neg(x))),
        ("sqrt", Box::new(|v| v), Box::new(|eng, x| eng.sqrt(x))),
        ("square", Box::new(|v| v), Box::new(|eng, x| eng.square(x))),
        ("exp", Box::new(|v| v), Box::new(|eng, x| eng.exp(x))),
        (
            "log",
            Box::new(|v| v.iter().map(|x| x + 0.01).collect()),
            Box::new(|eng, x| eng.log(x)),
        ),
        // Activations
        ("relu", Box::new(|v| v.iter().map(|x| x - 0.5).collect()), Box::new(|eng, x| eng.relu(x))),
        ("sigmoid", Box::new(|v| v), Box::new(|eng, x| eng.sigmoid(x))),
        ("tanh", Box::new(|v| v), Box::new(|eng, x| eng.tanh(x))),
        ("step", Box::new(|v| v.iter().map(|x| x - 0.5).collect()), Box::new(|eng, x| eng.step(x))),
    ];

    // Run benchmarks for CPU
    {
        let device = Device::CPU;

        for (op_name, data_transform, op_fn) in &operations {
            for &(size, size_name) in &SIZES {
                let bench_name = format!("{}/cpu/{}", op_name, size_name);

                group.bench_function(&bench_name, |b| {
                    bench_op(b, device, size, data_transform, op_fn)
                });
            }
        }
    }

    // Run benchmarks for the accelerated backend if enabled
    #[cfg(feature = "accel")]
    {
        let device = Device::Accel;

        for (op_name, data_transform, op_fn) in &operations {
            for &(size, size_name) in &SIZES {
                let bench_name = format!("{}/accel/{}", op_name, size_name);

                group.bench_function(&bench_name, |b| {
                    bench_op(b, device, size, data_transform, op_fn)
                });
            }
        }
    }

    group.finish();
}
