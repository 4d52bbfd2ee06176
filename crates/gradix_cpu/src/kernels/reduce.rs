use gradix_core::{
    buffer::HostBuffer,
    dtype::DType,
    error::{Error, Result},
    layout::Layout,
};

#[derive(Clone, Copy)]
pub(crate) enum Fold {
    Sum,
    Max,
    Min,
}

/// For each input dimension, the stride its coordinate contributes to the
/// output offset; reduced dimensions contribute nothing.
fn out_stride_map(shape: &[usize], axes: &[usize], keep_dims: bool, out_layout: &Layout) -> Vec<usize> {
    let mut reduce = vec![false; shape.len()];
    for &axis in axes {
        reduce[axis] = true;
    }

    let mut map = vec![0; shape.len()];
    let mut out_dim = 0;
    for d in 0..shape.len() {
        if reduce[d] {
            if keep_dims {
                out_dim += 1;
            }
        } else {
            map[d] = out_layout.strides()[out_dim];
            out_dim += 1;
        }
    }
    map
}

pub(crate) fn reduce(
    fold: Fold,
    x: &HostBuffer,
    x_layout: &Layout,
    axes: &[usize],
    keep_dims: bool,
    out_layout: &Layout,
    out_dtype: DType,
) -> Result<HostBuffer> {
    if !x_layout.is_contiguous() {
        return Err(Error::Internal {
            message: "reduction over a non-contiguous input".into(),
        });
    }

    let init = match fold {
        Fold::Sum => 0.0,
        Fold::Max => f32::NEG_INFINITY,
        Fold::Min => f32::INFINITY,
    };
    let mut out = vec![init; out_layout.size()];

    let shape = x_layout.shape();
    let map = out_stride_map(shape, axes, keep_dims, out_layout);

    for i in 0..x_layout.size() {
        let mut rem = i;
        let mut out_offset = 0;
        for d in (0..shape.len()).rev() {
            let digit = rem % shape[d];
            out_offset += digit * map[d];
            rem /= shape[d];
        }

        let value = x.get(i)?.to_f32();
        let cell = &mut out[out_offset];
        *cell = match fold {
            Fold::Sum => *cell + value,
            Fold::Max => cell.max(value),
            Fold::Min => cell.min(value),
        };
    }

    Ok(HostBuffer::from_f32_vec(out, out_dtype))
}

pub(crate) fn arg_max(x: &HostBuffer, x_layout: &Layout, axis: usize) -> Result<HostBuffer> {
    if !x_layout.is_contiguous() {
        return Err(Error::Internal {
            message: "arg_max over a non-contiguous input".into(),
        });
    }

    let shape = x_layout.shape();
    let axis_size = shape[axis];
    let axis_stride = x_layout.strides()[axis];

    // Iterate the output space: the input space with `axis` removed.
    let out_shape: Vec<usize> = shape
        .iter()
        .enumerate()
        .filter(|(d, _)| *d != axis)
        .map(|(_, &s)| s)
        .collect();
    let out_size: usize = out_shape.iter().product();

    let mut out = Vec::with_capacity(out_size);
    for o in 0..out_size {
        // Base offset of this lane: distribute o's digits over the
        // non-reduced dims.
        let mut rem = o;
        let mut base = 0;
        for d in (0..shape.len()).rev() {
            if d == axis {
                continue;
            }
            let digit = rem % shape[d];
            base += digit * x_layout.strides()[d];
            rem /= shape[d];
        }

        let mut best = f32::NEG_INFINITY;
        let mut best_index = 0i32;
        for j in 0..axis_size {
            let value = x.get(base + j * axis_stride)?.to_f32();
            if value > best {
                best = value;
                best_index = j as i32;
            }
        }
        out.push(best_index);
    }

    Ok(HostBuffer::I32(out))
}
