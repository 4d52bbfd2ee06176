use gradix_core::{
    buffer::HostBuffer,
    error::Result,
    layout::Layout,
};

pub(crate) fn mat_mul(
    a: &HostBuffer,
    a_layout: &Layout,
    b: &HostBuffer,
    b_layout: &Layout,
) -> Result<HostBuffer> {
    let (m, k) = (a_layout.shape()[0], a_layout.shape()[1]);
    let n = b_layout.shape()[1];

    let a = a.to_f32_vec();
    let b = b.to_f32_vec();

    let mut out = vec![0.0f32; m * n];
    for i in 0..m {
        for j in 0..n {
            let mut acc = 0.0f32;
            for l in 0..k {
                acc += a[i * k + l] * b[l * n + j];
            }
            out[i * n + j] = acc;
        }
    }

    Ok(HostBuffer::F32(out))
}
