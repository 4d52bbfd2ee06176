use crate::kernels::Arg;
use gradix_core::{
    buffer::HostBuffer,
    dtype::DType,
    error::Result,
    layout::Layout,
};
use rayon::prelude::*;

pub(crate) fn copy(x: Arg<'_>, out_dtype: DType) -> Result<HostBuffer> {
    let data = x.0.to_f32_vec();
    let layout = x.1;
    let values: Vec<f32> = (0..layout.size())
        .into_par_iter()
        .map(|i| data[layout.position(i)])
        .collect();
    Ok(HostBuffer::from_f32_vec(values, out_dtype))
}

pub(crate) fn transpose(
    x: Arg<'_>,
    perm: &[usize],
    out_layout: &Layout,
    out_dtype: DType,
) -> Result<HostBuffer> {
    let data = x.0.to_f32_vec();
    let strides = x.1.strides().to_vec();
    let out_shape = out_layout.shape().to_vec();
    let perm = perm.to_vec();

    let values: Vec<f32> = (0..out_layout.size())
        .into_par_iter()
        .map(|i| {
            let mut rem = i;
            let mut offset = 0;
            for d in (0..out_shape.len()).rev() {
                offset += (rem % out_shape[d]) * strides[perm[d]];
                rem /= out_shape[d];
            }
            data[offset]
        })
        .collect();
    Ok(HostBuffer::from_f32_vec(values, out_dtype))
}

pub(crate) fn slice(
    x: Arg<'_>,
    begin: &[usize],
    out_layout: &Layout,
    out_dtype: DType,
) -> Result<HostBuffer> {
    let data = x.0.to_f32_vec();
    let strides = x.1.strides().to_vec();
    let out_shape = out_layout.shape().to_vec();
    let begin = begin.to_vec();

    let values: Vec<f32> = (0..out_layout.size())
        .into_par_iter()
        .map(|i| {
            let mut rem = i;
            let mut offset = 0;
            for d in (0..out_shape.len()).rev() {
                offset += ((rem % out_shape[d]) + begin[d]) * strides[d];
                rem /= out_shape[d];
            }
            data[offset]
        })
        .collect();
    Ok(HostBuffer::from_f32_vec(values, out_dtype))
}

/// Gather form of padding: an output cell inside the copied region reads
/// its source element, every other cell is zero.
pub(crate) fn pad(
    x: Arg<'_>,
    paddings: &[(usize, usize)],
    out_layout: &Layout,
    out_dtype: DType,
) -> Result<HostBuffer> {
    let data = x.0.to_f32_vec();
    let x_shape = x.1.shape().to_vec();
    let x_strides = x.1.strides().to_vec();
    let out_shape = out_layout.shape().to_vec();
    let paddings = paddings.to_vec();

    let values: Vec<f32> = (0..out_layout.size())
        .into_par_iter()
        .map(|i| {
            let mut rem = i;
            let mut offset = 0;
            for d in (0..out_shape.len()).rev() {
                let coord = rem % out_shape[d];
                rem /= out_shape[d];
                if coord < paddings[d].0 || coord - paddings[d].0 >= x_shape[d] {
                    return 0.0;
                }
                offset += (coord - paddings[d].0) * x_strides[d];
            }
            data[offset]
        })
        .collect();
    Ok(HostBuffer::from_f32_vec(values, out_dtype))
}

pub(crate) fn concat(
    a: Arg<'_>,
    b: Arg<'_>,
    axis: usize,
    out_layout: &Layout,
    out_dtype: DType,
) -> Result<HostBuffer> {
    let a_data = a.0.to_f32_vec();
    let b_data = b.0.to_f32_vec();
    let a_strides = a.1.strides().to_vec();
    let b_strides = b.1.strides().to_vec();
    let split = a.1.shape()[axis];
    let out_shape = out_layout.shape().to_vec();

    let values: Vec<f32> = (0..out_layout.size())
        .into_par_iter()
        .map(|i| {
            let mut rem = i;
            let mut coords = vec![0usize; out_shape.len()];
            for d in (0..out_shape.len()).rev() {
                coords[d] = rem % out_shape[d];
                rem /= out_shape[d];
            }

            if coords[axis] < split {
                let offset: usize = coords
                    .iter()
                    .zip(&a_strides)
                    .map(|(&c, &s)| c * s)
                    .sum();
                a_data[offset]
            } else {
                coords[axis] -= split;
                let offset: usize = coords
                    .iter()
                    .zip(&b_strides)
                    .map(|(&c, &s)| c * s)
                    .sum();
                b_data[offset]
            }
        })
        .collect();
    Ok(HostBuffer::from_f32_vec(values, out_dtype))
}
