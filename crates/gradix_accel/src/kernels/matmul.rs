use crate::kernels::Arg;
use gradix_core::{buffer::HostBuffer, error::Result};
use rayon::prelude::*;

pub(crate) fn mat_mul(a: Arg<'_>, b: Arg<'_>) -> Result<HostBuffer> {
    let (m, k) = (a.1.shape()[0], a.1.shape()[1]);
    let n = b.1.shape()[1];

    let a = a.0.to_f32_vec();
    let b = b.0.to_f32_vec();

    let out: Vec<f32> = (0..m * n)
        .into_par_iter()
        .map(|idx| {
            let (i, j) = (idx / n, idx % n);
            let mut acc = 0.0f32;
            for l in 0..k {
                acc += a[i * k + l] * b[l * n + j];
            }
            acc
        })
        .collect();

    Ok(HostBuffer::F32(out))
}
