use gradix_core::{
    buffer::HostBuffer,
    dtype::DType,
    error::{Error, Result},
    kernel::Kernel,
    layout::Layout,
};

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

#[allow(clippy::too_many_arguments)]
pub(crate) fn binary(
    kernel: &Kernel,
    lhs: &HostBuffer,
    lhs_layout: &Layout,
    rhs: &HostBuffer,
    rhs_layout: &Layout,
    out_layout: &Layout,
    out_dtype: DType,
) -> Result<HostBuffer> {
    let n = out_layout.size();

    match bin_fn(kernel)? {
        BinFn::Arith(f) => {
            let mut values = Vec::with_capacity(n);
            for i in 0..n {
                let a = lhs.get(lhs_layout.position(i))?.to_f32();
                let b = rhs.get(rhs_layout.position(i))?.to_f32();
                values.push(f(a, b));
            }
            Ok(HostBuffer::from_f32_vec(values, out_dtype))
        }
        BinFn::Compare(f) => {
            let mut values = Vec::with_capacity(n);
            for i in 0..n {
                let a = lhs.get(lhs_layout.position(i))?.to_f32();
                let b = rhs.get(rhs_layout.position(i))?.to_f32();
                values.push(f(a, b));
            }
            Ok(HostBuffer::BOOL(values))
        }
        BinFn::Logic(f) => {
            let mut values = Vec::with_capacity(n);
            for i in 0..n {
                let a = lhs.get(lhs_layout.position(i))?.to_bool();
                let b = rhs.get(rhs_layout.position(i))?.to_bool();
                values.push(f(a, b));
            }
            Ok(HostBuffer::BOOL(values))
        }
    }
}

#[allow(clippy::too_many_arguments)]
pub(crate) fn select(
    cond: &HostBuffer,
    cond_layout: &Layout,
    on_true: &HostBuffer,
    true_layout: &Layout,
    on_false: &HostBuffer,
    false_layout: &Layout,
    out_layout: &Layout,
    out_dtype: DType,
) -> Result<HostBuffer> {
    let n = out_layout.size();
    let mut values = Vec::with_capacity(n);
    for i in 0..n {
        let pick = cond.get(cond_layout.position(i))?.to_bool();
        let value = if pick {
            on_true.get(true_layout.position(i))?
        } else {
            on_false.get(false_layout.position(i))?
        };
        values.push(value.to_f32());
    }
    Ok(HostBuffer::from_f32_vec(values, out_dtype))
}
