use criterion::{black_box, criterion_group, Criterion};
use gradix_core::{device::Device, error::Result};
use gradix_engine::Engine;

const SIZES: [(usize, &str); 2] = [(1000, "small"), (10000, "medium")];

// One forward-and-backward pass through a small elementwise chain.
fn bench_chain(b: &mut criterion::Bencher, device: Device, size: usize) {
    let data: Vec<f32> = (0..size).map(|i| (i % 10) as f32 / 10.0).collect();

    let mut engine = Engine::new(device);
    b.iter(|| {
        engine
            .scope(|eng| {
                let x = eng.tensor(data.clone(), &[size])?;
                let grads = eng.gradients(
                    |eng| {
                        let squared = eng.square(&x)?;
                        let activated = eng.tanh(&squared)?;
                        eng.sum(&activated)
                    },
                    &[&x],
                )?;
                black_box(eng.read_f32(&grads[0])?);
                Ok(())
            })
            .unwrap()
    })
}

// Forward-and-backward through a matmul, gradients for both operands.
fn bench_matmul(b: &mut criterion::Bencher, device: Device, dim: usize) {
    let a_data: Vec<f32> = (0..dim * dim).map(|i| (i % 13) as f32 * 0.1).collect();
    let b_data: Vec<f32> = (0..dim * dim).map(|i| (i % 7) as f32 * 0.1).collect();

    let mut engine = Engine::new(device);
    b.iter(|| {
        engine
            .scope(|eng| {
                let a = eng.tensor(a_data.clone(), &[dim, dim])?;
                let bm = eng.tensor(b_data.clone(), &[dim, dim])?;
                let grads = eng.gradients(
                    |eng| {
                        let y = eng.matmul(&a, &bm)?;
                        eng.sum(&y)
                    },
                    &[&a, &bm],
                )?;
                black_box(eng.read_f32(&grads[0])?);
                black_box(eng.read_f32(&grads[1])?);
                Ok(())
            })
            .unwrap()
    })
}

pub fn backward(criterion: &mut Criterion) {
    let mut group = criterion.benchmark_group("grads/backward");
    group.warm_up_time(core::time::Duration::from_millis(500));
    group.measurement_time(core::time::Duration::from_secs(3));
    group.sample_size(50);

    {
        let device = Device::CPU;

        for &(size, size_name) in &SIZES {
            group.bench_function(format!("chain/cpu/{}", size_name), |b| {
                bench_chain(b, device, size)
            });
        }
        for &(dim, size_name) in &[(32usize, "small"), (64usize, "medium")] {
            group.bench_function(format!("matmul/cpu/{}", size_name), |b| {
                bench_matmul(b, device, dim)
            });
        }
    }

    #[cfg(feature = "accel")]
    {
        let device = Device::Accel;

        for &(size, size_name) in &SIZES {
            group.bench_function(format!("chain/accel/{}", size_name), |b| {
                bench_chain(b, device, size)
            });
        }
        for &(dim, size_name) in &[(32usize, "small"), (64usize, "medium")] {
            group.bench_function(format!("matmul/accel/{}", size_name), |b| {
                bench_matmul(b, device, dim)
            });
        }
    }

    group.finish();
}

criterion_group!(benches, backward);
