use crate::kernels::Arg;
use gradix_core::{
    buffer::HostBuffer,
    dtype::DType,
    error::{Error, Result},
    layout::Layout,
};
use rayon::prelude::*;

#[derive(Clone, Copy)]
pub(crate) enum Fold {
    Sum,
    Max,
    Min,
}

/// One task per output lane: each lane folds its own reduced subspace,
/// so lanes never contend.
pub(crate) fn reduce(
    fold: Fold,
    x: Arg<'_>,
    axes: &[usize],
    out_layout: &Layout,
    out_dtype: DType,
) -> Result<HostBuffer> {
    let (buffer, x_layout) = x;
    if !x_layout.is_contiguous() {
        return Err(Error::Internal {
            message: "reduction over a non-contiguous input".into(),
        });
    }

    let data = buffer.to_f32_vec();
    let shape = x_layout.shape().to_vec();
    let strides = x_layout.strides().to_vec();

    let mut reduced = vec![false; shape.len()];
    for &axis in axes {
        reduced[axis] = true;
    }
    let kept_dims: Vec<usize> = (0..shape.len()).filter(|&d| !reduced[d]).collect();
    let red_dims: Vec<usize> = (0..shape.len()).filter(|&d| reduced[d]).collect();
    let red_size: usize = red_dims.iter().map(|&d| shape[d]).product();

    let init = match fold {
        Fold::Sum => 0.0,
        Fold::Max => f32::NEG_INFINITY,
        Fold::Min => f32::INFINITY,
    };

    let out: Vec<f32> = (0..out_layout.size())
        .into_par_iter()
        .map(|o| {
            let mut rem = o;
            let mut base = 0;
            for &d in kept_dims.iter().rev() {
                base += (rem % shape[d]) * strides[d];
                rem /= shape[d];
            }

            let mut acc = init;
            for r in 0..red_size {
                let mut rem = r;
                let mut offset = base;
                for &d in red_dims.iter().rev() {
                    offset += (rem % shape[d]) * strides[d];
                    rem /= shape[d];
                }
                let value = data[offset];
                acc = match fold {
                    Fold::Sum => acc + value,
                    Fold::Max => acc.max(value),
                    Fold::Min => acc.min(value),
                };
            }
            acc
        })
        .collect();

    Ok(HostBuffer::from_f32_vec(out, out_dtype))
}

pub(crate) fn arg_max(x: Arg<'_>, axis: usize) -> Result<HostBuffer> {
    let (buffer, x_layout) = x;
    if !x_layout.is_contiguous() {
        return Err(Error::Internal {
            message: "arg_max over a non-contiguous input".into(),
        });
    }

    let data = buffer.to_f32_vec();
    let shape = x_layout.shape().to_vec();
    let strides = x_layout.strides().to_vec();
    let axis_size = shape[axis];
    let axis_stride = strides[axis];
    let out_size: usize = shape
        .iter()
        .enumerate()
        .filter(|(d, _)| *d != axis)
        .map(|(_, &s)| s)
        .product();

    let out: Vec<i32> = (0..out_size)
        .into_par_iter()
        .map(|o| {
            let mut rem = o;
            let mut base = 0;
            for d in (0..shape.len()).rev() {
                if d == axis {
                    continue;
                }
                base += (rem % shape[d]) * strides[d];
                rem /= shape[d];
            }

            let mut best = f32::NEG_INFINITY;
            let mut best_index = 0i32;
            for j in 0..axis_size {
                let value = data[base + j * axis_stride];
                if value > best {
                    best = value;
                    best_index = j as i32;
                }
            }
            best_index
        })
        .collect();

    Ok(HostBuffer::I32(out))
}
