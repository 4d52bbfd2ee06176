use gradix_core::{
    buffer::HostBuffer,
    dtype::DType,
    error::Result,
    layout::Layout,
    scalar::Scalar,
};

/// Materializes a (possibly strided) view into fresh contiguous storage.
/// Also serves reshape, which only changes the logical shape.
pub(crate) fn copy(x: &HostBuffer, x_layout: &Layout, out_dtype: DType) -> Result<HostBuffer> {
    let n = x_layout.size();
    let mut out = HostBuffer::zeros(n, out_dtype);
    for i in 0..n {
        out.set(i, x.get(x_layout.position(i))?)?;
    }
    Ok(out)
}

pub(crate) fn transpose(
    x: &HostBuffer,
    x_layout: &Layout,
    perm: &[usize],
    out_layout: &Layout,
    out_dtype: DType,
) -> Result<HostBuffer> {
    let n = out_layout.size();
    let out_shape = out_layout.shape();
    let mut out = HostBuffer::zeros(n, out_dtype);

    for i in 0..n {
        // Output coordinate d maps to input dimension perm[d].
        let mut rem = i;
        let mut x_offset = 0;
        for d in (0..out_shape.len()).rev() {
            let digit = rem % out_shape[d];
            x_offset += digit * x_layout.strides()[perm[d]];
            rem /= out_shape[d];
        }
        out.set(i, x.get(x_offset)?)?;
    }
    Ok(out)
}

pub(crate) fn slice(
    x: &HostBuffer,
    x_layout: &Layout,
    begin: &[usize],
    out_layout: &Layout,
    out_dtype: DType,
) -> Result<HostBuffer> {
    let n = out_layout.size();
    let out_shape = out_layout.shape();
    let mut out = HostBuffer::zeros(n, out_dtype);

    for i in 0..n {
        let mut rem = i;
        let mut x_offset = 0;
        for d in (0..out_shape.len()).rev() {
            let digit = rem % out_shape[d];
            x_offset += (digit + begin[d]) * x_layout.strides()[d];
            rem /= out_shape[d];
        }
        out.set(i, x.get(x_offset)?)?;
    }
    Ok(out)
}

pub(crate) fn pad(
    x: &HostBuffer,
    x_layout: &Layout,
    paddings: &[(usize, usize)],
    out_layout: &Layout,
    out_dtype: DType,
) -> Result<HostBuffer> {
    let mut out = HostBuffer::zeros(out_layout.size(), out_dtype);
    let x_shape = x_layout.shape();

    for i in 0..x_layout.size() {
        let mut rem = i;
        let mut out_offset = 0;
        for d in (0..x_shape.len()).rev() {
            let digit = rem % x_shape[d];
            out_offset += (digit + paddings[d].0) * out_layout.strides()[d];
            rem /= x_shape[d];
        }
        out.set(out_offset, x.get(x_layout.position(i))?)?;
    }
    Ok(out)
}

#[allow(clippy::too_many_arguments)]
pub(crate) fn concat(
    a: &HostBuffer,
    a_layout: &Layout,
    b: &HostBuffer,
    b_layout: &Layout,
    axis: usize,
    out_layout: &Layout,
    out_dtype: DType,
) -> Result<HostBuffer> {
    let n = out_layout.size();
    let out_shape = out_layout.shape();
    let split = a_layout.shape()[axis];
    let mut out = HostBuffer::zeros(n, out_dtype);

    for i in 0..n {
        let mut rem = i;
        let mut coords = vec![0usize; out_shape.len()];
        for d in (0..out_shape.len()).rev() {
            coords[d] = rem % out_shape[d];
            rem /= out_shape[d];
        }

        let value: Scalar = if coords[axis] < split {
            let offset: usize = coords
                .iter()
                .zip(a_layout.strides())
                .map(|(&c, &s)| c * s)
                .sum();
            a.get(offset)?
        } else {
            let mut b_coords = coords.clone();
            b_coords[axis] -= split;
            let offset: usize = b_coords
                .iter()
                .zip(b_layout.strides())
                .map(|(&c, &s)| c * s)
                .sum();
            b.get(offset)?
        };
        out.set(i, value)?;
    }
    Ok(out)
}
