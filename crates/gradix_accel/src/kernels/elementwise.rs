use crate::kernels::Arg;
use gradix_core::{
    buffer::HostBuffer,
    dtype::DType,
    error::{Error, Result},
    kernel::Kernel,
    layout::Layout,
};
use rayon::prelude::*;

enum BinFn {
    Arith(fn(f32, f32) -> f32),
    Compare(fn(f32, f32) -> bool),
    Logic(fn(bool, bool) -> bool),
}

fn bin_fn(kernel: &Kernel) -> Result<BinFn> {
    Ok(match kernel {
        Kernel::Add => BinFn::Arith(|a, b| a + b),
        Kernel::Sub => BinFn::Arith(|a, b| a - b),
        Kernel::Mul => BinFn::Arith(|a, b| a * b),
        Kernel::Div => BinFn::Arith(|a, b| a / b),
        Kernel::Maximum => BinFn::Arith(f32::max),
        Kernel::Minimum => BinFn::Arith(f32::min),
        Kernel::Pow => BinFn::Arith(f32::powf),
        Kernel::Equal => BinFn::Compare(|a, b| a == b),
        Kernel::NotEqual => BinFn::Compare(|a, b| a != b),
        Kernel::Greater => BinFn::Compare(|a, b| a > b),
        Kernel::GreaterEqual => BinFn::Compare(|a, b| a >= b),
        Kernel::Less => BinFn::Compare(|a, b| a < b),
        Kernel::LessEqual => BinFn::Compare(|a, b| a <= b),
        Kernel::LogicalAnd => BinFn::Logic(|a, b| a && b),
        Kernel::LogicalOr => BinFn::Logic(|a, b| a || b),
        other => {
            return Err(Error::Internal {
                message: format!("{} is not an elementwise binary kernel", other.name()),
            })
        }
    })
}

pub(crate) fn binary(
    kernel: &Kernel,
    lhs: Arg<'_>,
    rhs: Arg<'_>,
    out_layout: &Layout,
    out_dtype: DType,
) -> Result<HostBuffer> {
    let a = lhs.0.to_f32_vec();
    let b = rhs.0.to_f32_vec();
    let (a_layout, b_layout) = (lhs.1, rhs.1);
    let n = out_layout.size();

    Ok(match bin_fn(kernel)? {
        BinFn::Arith(f) => {
            let values: Vec<f32> = (0..n)
                .into_par_iter()
                .map(|i| f(a[a_layout.position(i)], b[b_layout.position(i)]))
                .collect();
            HostBuffer::from_f32_vec(values, out_dtype)
        }
        BinFn::Compare(f) => {
            let values: Vec<bool> = (0..n)
                .into_par_iter()
                .map(|i| f(a[a_layout.position(i)], b[b_layout.position(i)]))
                .collect();
            HostBuffer::BOOL(values)
        }
        BinFn::Logic(f) => {
            let values: Vec<bool> = (0..n)
                .into_par_iter()
                .map(|i| f(a[a_layout.position(i)] != 0.0, b[b_layout.position(i)] != 0.0))
                .collect();
            HostBuffer::BOOL(values)
        }
    })
}

pub(crate) fn select(
    cond: Arg<'_>,
    on_true: Arg<'_>,
    on_false: Arg<'_>,
    out_layout: &Layout,
    out_dtype: DType,
) -> Result<HostBuffer> {
    let c = cond.0.to_f32_vec();
    let t = on_true.0.to_f32_vec();
    let f = on_false.0.to_f32_vec();
    let n = out_layout.size();

    let values: Vec<f32> = (0..n)
        .into_par_iter()
        .map(|i| {
            if c[cond.1.position(i)] != 0.0 {
                t[on_true.1.position(i)]
            } else {
                f[on_false.1.position(i)]
            }
        })
        .collect();
    Ok(HostBuffer::from_f32_vec(values, out_dtype))
}

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
    x: Arg<'_>,
    out_layout: &Layout,
    out_dtype: DType,
) -> Result<HostBuffer> {
    let f = unary_fn(kernel)?;
    let data = x.0.to_f32_vec();
    let n = out_layout.size();

    let values: Vec<f32> = (0..n)
        .into_par_iter()
        .map(|i| f(data[x.1.position(i)]))
        .collect();
    Ok(HostBuffer::from_f32_vec(values, out_dtype))
}
