use criterion::{black_box, Criterion};
use gradix_core::{device::Device, error::Result};
use gradix_engine::{Engine, Tensor};

// Matrix shapes exercised by the reduction and matmul benchmarks
const SHAPES: [(usize, usize, &str); 2] = [(32, 32, "small"), (128, 128, "medium")];

fn bench_op<F>(b: &mut criterion::Bencher, device: Device, rows: usize, cols: usize, op_fn: F)
where
    F: Fn(&mut Engine, &Tensor) -> Result<Tensor>,
{
    let data: Vec<f32> = (0..rows * cols).map(|i| (i % 17) as f32 * 0.1).collect();

    let mut engine = Engine::new(device);
    b.iter(|| {
        engine
            .scope(|eng| {
                let x = eng.tensor(data.clone(), &[rows, cols])?;
                let out = op_fn(eng, &x)?;
                black_box(eng.read_f32(&out)?);
                Ok(())
            })
            .unwrap()
    })
}

pub fn basic(criterion: &mut Criterion) {
    let mut group = criterion.benchmark_group("reduction/basic");
    group.warm_up_time(core::time::Duration::from_millis(500));
    group.measurement_time(core::time::Duration::from_secs(3));
    group.sample_size(50);

    let operations: Vec<(&str, Box<dyn Fn(&mut Engine, &Tensor) -> Result<Tensor>>)> = vec![
        ("sum", Box::new(|eng, x| eng.sum(x))),
        ("sum_rows", Box::new(|eng, x| eng.sum_axes(x, &[1], false))),
        ("max", Box::new(|eng, x| eng.max(x))),
        ("mean", Box::new(|eng, x| eng.mean(x))),
        ("arg_max", Box::new(|eng, x| eng.arg_max(x, 1))),
        ("matmul", Box::new(|eng, x| eng.matmul(x, x))),
        ("softmax", Box::new(|eng, x| eng.softmax(x))),
    ];

    {
        let device = Device::CPU;

        for (op_name, op_fn) in &operations {
            for &(rows, cols, size_name) in &SHAPES {
                let bench_name = format!("{}/cpu/{}", op_name, size_name);

                group.bench_function(&bench_name, |b| bench_op(b, device, rows, cols, op_fn));
            }
        }
    }

    #[cfg(feature = "accel")]
    {
        let device = Device::Accel;

        for (op_name, op_fn) in &operations {
            for &(rows, cols, size_name) in &SHAPES {
                let bench_name = format!("{}/accel/{}", op_name, size_name);

                group.bench_function(&bench_name, |b| bench_op(b, device, rows, cols, op_fn));
            }
        }
    }

    group.finish();
}
