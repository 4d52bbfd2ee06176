use gradix_core::{
    buffer::HostBuffer,
    dtype::DType,
    error::{Error, Result},
    kernel::Kernel,
    layout::Layout,
};

fn unary_fn(kernel: &Kernel) -> Result<fn(f32) -> f32> {
    Ok(match kernel {
        Kernel::Neg => |x| -x,
        Kernel::Abs => f32::abs,
        Kernel::Exp => f32::exp,
        Kernel::Log => f32::ln,
        Kernel::Sqrt => f32::sqrt,
        Kernel::Square => |x| x * x,
        Kernel::Relu => |x| x.max(0.0),
        Kernel::Sigmoid => |x| 1.0 / (1.0 + (-x).exp()),
        Kernel::Tanh => f32::tanh,
        Kernel::Step => |x| if x > 0.0 { 1.0 } else { 0.0 },
        other => {
            return Err(Error::Internal {
                message: format!("{} is not an elementwise unary kernel", other.name()),
            })
        }
    })
}

pub(crate) fn unary(
    kernel: &Kernel,
    x: &HostBuffer,
    x_layout: &Layout,
    out_layout: &Layout,
    out_dtype: DType,
) -> Result<HostBuffer> {
    let f = unary_fn(kernel)?;
    let n = out_layout.size();
    let mut values = Vec::with_capacity(n);
    for i in 0..n {
        values.push(f(x.get(x_layout.position(i))?.to_f32()));
    }
    Ok(HostBuffer::from_f32_vec(values, out_dtype))
}
