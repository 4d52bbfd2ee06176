mod binary;
mod conv;
mod matmul;
mod pool;
mod reduce;
mod shape;
mod unary;

use gradix_core::{
    backend::KernelInput,
    buffer::HostBuffer,
    dtype::DType,
    error::Result,
    kernel::Kernel,
    layout::Layout,
};

/// Routes a validated kernel to its implementation. Exhaustive over the
/// kernel enum, so a new kernel fails compilation here until implemented.
pub(crate) fn run(
    kernel: &Kernel,
    inputs: &[KernelInput<'_>],
    buffers: &[HostBuffer],
    out_layout: &Layout,
    out_dtype: DType,
) -> Result<HostBuffer> {
    use Kernel::*;

    match kernel {
        Add | Sub | Mul | Div | Maximum | Minimum | Pow | Equal | NotEqual | Greater
        | GreaterEqual | Less | LessEqual | LogicalAnd | LogicalOr => binary::binary(
            kernel,
            &buffers[0],
            inputs[0].layout,
            &buffers[1],
            inputs[1].layout,
            out_layout,
            out_dtype,
        ),
        Select => binary::select(
            &buffers[0],
            inputs[0].layout,
            &buffers[1],
            inputs[1].layout,
            &buffers[2],
            inputs[2].layout,
            out_layout,
            out_dtype,
        ),
        Neg | Abs | Exp | Log | Sqrt | Square | Relu | Sigmoid | Tanh | Step => {
            unary::unary(kernel, &buffers[0], inputs[0].layout, out_layout, out_dtype)
        }
        Sum { axes, keep_dims } => {
            reduce::reduce(reduce::Fold::Sum, &buffers[0], inputs[0].layout, axes, *keep_dims, out_layout, out_dtype)
        }
        Max { axes, keep_dims } => {
            reduce::reduce(reduce::Fold::Max, &buffers[0], inputs[0].layout, axes, *keep_dims, out_layout, out_dtype)
        }
        Min { axes, keep_dims } => {
            reduce::reduce(reduce::Fold::Min, &buffers[0], inputs[0].layout, axes, *keep_dims, out_layout, out_dtype)
        }
        ArgMax { axis } => reduce::arg_max(&buffers[0], inputs[0].layout, *axis),
        MatMul => matmul::mat_mul(&buffers[0], inputs[0].layout, &buffers[1], inputs[1].layout),
        Reshape { .. } => shape::copy(&buffers[0], inputs[0].layout, out_dtype),
        Transpose { perm } => shape::transpose(&buffers[0], inputs[0].layout, perm, out_layout, out_dtype),
        Slice { begin, .. } => shape::slice(&buffers[0], inputs[0].layout, begin, out_layout, out_dtype),
        Pad { paddings } => shape::pad(&buffers[0], inputs[0].layout, paddings, out_layout, out_dtype),
        Concat { axis } => shape::concat(
            &buffers[0],
            inputs[0].layout,
            &buffers[1],
            inputs[1].layout,
            *axis,
            out_layout,
            out_dtype,
        ),
        Cast { dtype } => Ok(buffers[0].cast(*dtype)),
        Conv2d(params) => conv::conv2d(&buffers[0], inputs[0].layout, &buffers[1], inputs[1].layout, params, out_layout),
        Conv2dBackpropInput { params, .. } => conv::backprop_input(
            &buffers[0],
            inputs[0].layout,
            &buffers[1],
            inputs[1].layout,
            params,
            out_layout,
        ),
        Conv2dBackpropFilter { params, .. } => conv::backprop_filter(
            &buffers[0],
            inputs[0].layout,
            &buffers[1],
            inputs[1].layout,
            params,
            out_layout,
        ),
        MaxPool(params) => pool::max_pool(&buffers[0], inputs[0].layout, params, out_layout),
        MaxPoolBackprop(params) => pool::max_pool_backprop(
            &buffers[0],
            inputs[0].layout,
            &buffers[1],
            inputs[1].layout,
            params,
            out_layout,
        ),
        AvgPool(params) => pool::avg_pool(&buffers[0], inputs[0].layout, params, out_layout),
        AvgPoolBackprop { params, .. } => {
            pool::avg_pool_backprop(&buffers[0], inputs[0].layout, params, out_layout)
        }
    }
}
