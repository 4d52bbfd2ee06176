use criterion::{black_box, Criterion};
use gradix_core::{device::Device, error::Result};
use gradix_engine::{Engine, Tensor};

// Constants for benchmark data sizes
const SIZES: [(usize, &str); 3] = [(100, "small"), (5000, "medium"), (10000, "large")];

// Helper function for tensor creation and benchmarking
fn bench_binary_op<F>(
    b: &mut criterion::Bencher,
    device: Device,
    size: usize,
    // Functions to transform data for x and y tensors
    x_transform: impl Fn(Vec<f32>) -> Vec<f32>,
    y_transform: impl Fn(Vec<f32>) -> Vec<f32>,
    // The operation to benchmark
    op_fn: F,
) where
    F: Fn(&mut Engine, &Tensor, &Tensor) -> Result<Tensor>,
{
    // Generate base data
    let base_data: Vec<f32> = (0..size).map(|i| i as f32).collect();
    let x_data = x_transform(base_data.clone());
    let y_data = y_transform(base_data);

    let mut engine = Engine::new(device);
    b.iter(|| {
        engine
            .scope(|eng| {
                let x = eng.tensor(x_data.clone(), &[size])?;
                let y = eng.tensor(y_data.clone(), &[size])?;
                let out = op_fn(eng, &x, &y)?;
                black_box(eng.read_f32(&out)?);
                Ok(())
            })
            .unwrap()
    })
}

pub fn basic(criterion: &mut Criterion) {
    let mut group = criterion.benchmark_group("binary/basic");
    group.warm_up_time(core::time::Duration::from_millis(500));
    group.measurement_time(core::time::Duration::from_secs(3));
    group.sample_size(50);

    // Define operations with their data transformations
    let operations: Vec<(
        &str,
        Box<dyn Fn(Vec<f32>) -> Vec<f32>>,
        Box<dyn Fn(Vec<f32>) -> Vec<f32>>,
        Box<dyn Fn(&mut Engine, &Tensor, &Tensor) -> Result<Tensor>>,
    )> = vec![
        // Basic arithmetic operations
        (
            "add",
            Box::new(|v| v),
            Box::new(|v| v.iter().map(|x| x + 1.0).collect()),
            Box::new(|eng, x, y| eng.add(x, y)),
        ),
        (
            "sub",
            Box::new(|v| v),
            Box::new(|v| v.iter().map(|x| x + 1.0).collect()),
            Box::new(|eng, x, y| eng.sub(x, y)),
        ),
        (
            "mul",
            Box::new(|v| v),
            Box::new(|v| v.iter().map(|x| x + 1.0).collect()),
            Box::new(|eng, x, y| eng.mul(x, y)),
        ),
        (
            "div",
            Box::new(|v| v.iter().map(|x| x + 2.0).collect()),
            Box::new(|v| v.iter().map(|x| x + 1.0).collect()),
            Box::new(|eng, x, y| eng.div(x, y)),
        ),
        (
            "maximum",
            Box::new(|v| v),
            Box::new(|v| v.iter().rev().cloned().collect()),
            Box::new(|eng, x, y| eng.maximum(x, y)),
        ),
        // Comparison operations
        (
            "equal",
            Box::new(|v| v),
            Box::new(|v| v.iter().map(|x| x + 1.0).collect()),
            Box::new(|eng, x, y| eng.equal(x, y)),
        ),
        (
            "less",
            Box::new(|v| v),
            Box::new(|v| v.iter().map(|x| x + 1.0).collect()),
            Box::new(|eng, x, y| eng.less(x, y)),
        ),
        (
            "greater",
            Box::new(|v| v),
            Box::new(|v| v.iter().map(|x| x + 1.0).collect()),
            Box::new(|eng, x, y| eng.greater(x, y)),
        ),
    ];

    // Run benchmarks for CPU
    {
        let device = Device::CPU;

        for (op_name, x_transform, y_transform, op_fn) in &operations {
            for &(size, size_name) in &SIZES {
                let bench_name = format!("{}/cpu/{}", op_name, size_name);

                group.bench_function(&bench_name, |b| {
                    bench_binary_op(b, device, size, x_transform, y_transform, op_fn)
                });
            }
        }
    }

    // Run benchmarks for the accelerated backend if enabled
    #[cfg(feature = "accel")]
    {
        let device = Device::Accel;

        for (op_name, x_transform, y_transform, op_fn) in &operations {
            for &(size, size_name) in &SIZES {
                let bench_name = format!("{}/accel/{}", op_name, size_name);

                group.bench_function(&bench_name, |b| {
                    bench_binary_op(b, device, size, x_transform, y_transform, op_fn)
                });
            }
        }
    }

    group.finish();
}
