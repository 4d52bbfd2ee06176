mod conv;
mod elementwise;
mod matmul;
mod pool;
mod reduce;
mod shape;

use gradix_core::{
    buffer::HostBuffer,
    dtype::DType,
    error::Result,
    kernel::Kernel,
    layout::Layout,
};

/// Input pair: resolved host data plus the view it is read through.
pub(crate) type Arg<'a> = (&'a HostBuffer, &'a Layout);

/// Routes a validated kernel to its parallel implementation. Gather
/// formulations throughout: each output element is produced by exactly
/// one task, so no kernel needs synchronized writes.
pub(crate) fn run(
    kernel: &Kernel,
    inputs: &[Arg<'_>],
    out_layout: &Layout,
    out_dtype: DType,
) -> Result<HostBuffer> {
    use Kernel::*;

    match kernel {
        Add | Sub | Mul | Div | Maximum | Minimum | Pow | Equal | NotEqual | Greater
        | GreaterEqual | Less | LessEqual | LogicalAnd | LogicalOr => {
            elementwise::binary(kernel, inputs[0], inputs[1], out_layout, out_dtype)
        }
        Select => elementwise::select(inputs[0], inputs[1], inputs[2], out_layout, out_dtype),
        Neg | Abs | Exp | Log | Sqrt | Square | Relu | Sigmoid | Tanh | Step => {
            elementwise::unary(kernel, inputs[0], out_layout, out_dtype)
        }
        Sum { axes, keep_dims: _ } => {
            reduce::reduce(reduce::Fold::Sum, inputs[0], axes, out_layout, out_dtype)
        }
        Max { axes, keep_dims: _ } => {
            reduce::reduce(reduce::Fold::Max, inputs[0], axes, out_layout, out_dtype)
        }
        Min { axes, keep_dims: _ } => {
            reduce::reduce(reduce::Fold::Min, inputs[0], axes, out_layout, out_dtype)
        }
        ArgMax { axis } => reduce::arg_max(inputs[0], *axis),
        MatMul => matmul::mat_mul(inputs[0], inputs[1]),
        Reshape { .. } => shape::copy(inputs[0], out_dtype),
        Transpose { perm } => shape::transpose(inputs[0], perm, out_layout, out_dtype),
        Slice { begin, .. } => shape::slice(inputs[0], begin, out_layout, out_dtype),
        Pad { paddings } => shape::pad(inputs[0], paddings, out_layout, out_dtype),
        Concat { axis } => shape::concat(inputs[0], inputs[1], *axis, out_layout, out_dtype),
        Cast { dtype } => Ok(inputs[0].0.cast(*dtype)),
        Conv2d(params) => conv::conv2d(inputs[0], inputs[1], params, out_layout),
        Conv2dBackpropInput { params, .. } => {
            conv::backprop_input(inputs[0], inputs[1], params, out_layout)
        }
        Conv2dBackpropFilter { params, .. } => {
            conv::backprop_filter(inputs[0], inputs[1], params, out_layout)
        }
        MaxPool(params) => pool::max_pool(inputs[0], params, out_layout),
        MaxPoolBackprop(params) => pool::max_pool_backprop(inputs[0], inputs[1], params, out_layout),
        AvgPool(params) => pool::avg_pool(inputs[0], params, out_layout),
        AvgPoolBackprop { params, .. } => pool::avg_pool_backprop(inputs[0], params, out_layout),
    }
}
