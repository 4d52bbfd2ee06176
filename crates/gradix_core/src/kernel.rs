use crate::{
    dtype::DType,
    error::{Error, Result},
    layout::Layout,
};

/// Convolution hyperparameters. Data layout is NHWC, filters are
/// `[fh, fw, in_channels, out_channels]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Conv2dParams {
    pub stride: (usize, usize),
    pub padding: (usize, usize),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolParams {
    pub window: (usize, usize),
    pub stride: (usize, usize),
    pub padding: (usize, usize),
}

/// The closed set of numeric kernels a backend must implement. Every math
/// operation routes through exactly one of these variants, so adding a
/// kernel is a compile-time-checked change across all backends.
///
/// Non-tensor parameters (axes, strides, target shapes) live on the variant
/// itself; a recorded tape entry clones the whole value.
#[derive(Debug, Clone, PartialEq)]
pub enum Kernel {
    // elementwise binary; inputs arrive pre-broadcast as equal-shape views
    Add,
    Sub,
    Mul,
    Div,
    Maximum,
    Minimum,
    Pow,
    // comparison and logical; output dtype BOOL
    Equal,
    NotEqual,
    Greater,
    GreaterEqual,
    Less,
    LessEqual,
    LogicalAnd,
    LogicalOr,
    // cond/on_true/on_false
    Select,
    // elementwise unary
    Neg,
    Abs,
    Exp,
    Log,
    Sqrt,
    Square,
    Relu,
    Sigmoid,
    Tanh,
    Step,
    // reductions
    Sum { axes: Vec<usize>, keep_dims: bool },
    Max { axes: Vec<usize>, keep_dims: bool },
    Min { axes: Vec<usize>, keep_dims: bool },
    ArgMax { axis: usize },
    // linear algebra, 2-D only
    MatMul,
    // shape
    Reshape { shape: Vec<usize> },
    Transpose { perm: Vec<usize> },
    Slice { begin: Vec<usize>, size: Vec<usize> },
    Pad { paddings: Vec<(usize, usize)> },
    Concat { axis: usize },
    Cast { dtype: DType },
    // nn
    Conv2d(Conv2dParams),
    Conv2dBackpropInput { input_shape: Vec<usize>, params: Conv2dParams },
    Conv2dBackpropFilter { filter_shape: Vec<usize>, params: Conv2dParams },
    MaxPool(PoolParams),
    MaxPoolBackprop(PoolParams),
    AvgPool(PoolParams),
    AvgPoolBackprop { input_shape: Vec<usize>, params: PoolParams },
}

impl Kernel {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Add => "add",
            Self::Sub => "sub",
            Self::Mul => "mul",
            Self::Div => "div",
            Self::Maximum => "maximum",
            Self::Minimum => "minimum",
            Self::Pow => "pow",
            Self::Equal => "equal",
            Self::NotEqual => "not_equal",
            Self::Greater => "greater",
            Self::GreaterEqual => "greater_equal",
            Self::Less => "less",
            Self::LessEqual => "less_equal",
            Self::LogicalAnd => "logical_and",
            Self::LogicalOr => "logical_or",
            Self::Select => "select",
            Self::Neg => "neg",
            Self::Abs => "abs",
            Self::Exp => "exp",
            Self::Log => "log",
            Self::Sqrt => "sqrt",
            Self::Square => "square",
            Self::Relu => "relu",
            Self::Sigmoid => "sigmoid",
            Self::Tanh => "tanh",
            Self::Step => "step",
            Self::Sum { .. } => "sum",
            Self::Max { .. } => "max",
            Self::Min { .. } => "min",
            Self::ArgMax { .. } => "arg_max",
            Self::MatMul => "mat_mul",
            Self::Reshape { .. } => "reshape",
            Self::Transpose { .. } => "transpose",
            Self::Slice { .. } => "slice",
            Self::Pad { .. } => "pad",
            Self::Concat { .. } => "concat",
            Self::Cast { .. } => "cast",
            Self::Conv2d(_) => "conv2d",
            Self::Conv2dBackpropInput { .. } => "conv2d_backprop_input",
            Self::Conv2dBackpropFilter { .. } => "conv2d_backprop_filter",
            Self::MaxPool(_) => "max_pool",
            Self::MaxPoolBackprop(_) => "max_pool_backprop",
            Self::AvgPool(_) => "avg_pool",
            Self::AvgPoolBackprop { .. } => "avg_pool_backprop",
        }
    }

    /// Shape and dtype inference with fast-fail validation. Runs before any
    /// device work is issued; a kernel that passes this check is guaranteed
    /// a well-formed output allocation.
    pub fn output_spec(&self, inputs: &[(&Layout, DType)]) -> Result<(Layout, DType)> {
        match self {
            Self::Add
            | Self::Sub
            | Self::Mul
            | Self::Div
            | Self::Maximum
            | Self::Minimum
            | Self::Pow => {
                let (l, r) = self.binary_inputs(inputs)?;
                if !l.1.is_float() && !l.1.is_int() {
                    return Err(Error::UnsupportedDType {
                        kernel: self.name(),
                        dtype: l.1,
                    });
                }
                Ok((Layout::from_shape(l.0.shape()), l.1))
            }
            Self::Equal
            | Self::NotEqual
            | Self::Greater
            | Self::GreaterEqual
            | Self::Less
            | Self::LessEqual => {
                let (l, _) = self.binary_inputs(inputs)?;
                Ok((Layout::from_shape(l.0.shape()), DType::BOOL))
            }
            Self::LogicalAnd | Self::LogicalOr => {
                let (l, _) = self.binary_inputs(inputs)?;
                if l.1 != DType::BOOL {
                    return Err(Error::UnsupportedDType {
                        kernel: self.name(),
                        dtype: l.1,
                    });
                }
                Ok((Layout::from_shape(l.0.shape()), DType::BOOL))
            }
            Self::Select => {
                let [cond, t, f] = self.n_inputs::<3>(inputs)?;
                if cond.1 != DType::BOOL {
                    return Err(Error::DTypeMismatch {
                        expected: DType::BOOL,
                        got: cond.1,
                    });
                }
                if t.0.shape() != f.0.shape() || cond.0.shape() != t.0.shape() {
                    return Err(Error::ShapeMismatch {
                        op: self.name(),
                        lhs: t.0.shape().to_vec(),
                        rhs: f.0.shape().to_vec(),
                    });
                }
                if t.1 != f.1 {
                    return Err(Error::DTypeMismatch {
                        expected: t.1,
                        got: f.1,
                    });
                }
                Ok((Layout::from_shape(t.0.shape()), t.1))
            }
            Self::Neg | Self::Abs | Self::Square => {
                let [x] = self.n_inputs::<1>(inputs)?;
                if x.1 == DType::BOOL {
                    return Err(Error::UnsupportedDType {
                        kernel: self.name(),
                        dtype: x.1,
                    });
                }
                Ok((Layout::from_shape(x.0.shape()), x.1))
            }
            Self::Exp
            | Self::Log
            | Self::Sqrt
            | Self::Relu
            | Self::Sigmoid
            | Self::Tanh
            | Self::Step => {
                let [x] = self.n_inputs::<1>(inputs)?;
                if !x.1.is_float() {
                    return Err(Error::UnsupportedDType {
                        kernel: self.name(),
                        dtype: x.1,
                    });
                }
                Ok((Layout::from_shape(x.0.shape()), x.1))
            }
            Self::Sum { axes, keep_dims }
            | Self::Max { axes, keep_dims }
            | Self::Min { axes, keep_dims } => {
                let [x] = self.n_inputs::<1>(inputs)?;
                if x.1 == DType::BOOL {
                    return Err(Error::UnsupportedDType {
                        kernel: self.name(),
                        dtype: x.1,
                    });
                }
                let shape = reduced_shape(x.0.shape(), axes, *keep_dims)?;
                Ok((Layout::from_shape(&shape), x.1))
            }
            Self::ArgMax { axis } => {
                let [x] = self.n_inputs::<1>(inputs)?;
                if *axis >= x.0.ndim() {
                    return Err(Error::DimensionOutOfBounds {
                        dim: *axis,
                        ndim: x.0.ndim(),
                    });
                }
                let shape = reduced_shape(x.0.shape(), &[*axis], false)?;
                Ok((Layout::from_shape(&shape), DType::I32))
            }
            Self::MatMul => {
                let [a, b] = self.n_inputs::<2>(inputs)?;
                if a.1 != DType::F32 || b.1 != DType::F32 {
                    return Err(Error::UnsupportedDType {
                        kernel: self.name(),
                        dtype: if a.1 != DType::F32 { a.1 } else { b.1 },
                    });
                }
                let (asym, bsym) = (a.0.shape(), b.0.shape());
                if asym.len() != 2 || bsym.len() != 2 || asym[1] != bsym[0] {
                    return Err(Error::ShapeMismatch {
                        op: self.name(),
                        lhs: asym.to_vec(),
                        rhs: bsym.to_vec(),
                    });
                }
                Ok((Layout::from_shape(&[asym[0], bsym[1]]), DType::F32))
            }
            Self::Reshape { shape } => {
                let [x] = self.n_inputs::<1>(inputs)?;
                let new_size: usize = shape.iter().product();
                if new_size != x.0.size() {
                    return Err(Error::ShapeMismatch {
                        op: self.name(),
                        lhs: x.0.shape().to_vec(),
                        rhs: shape.clone(),
                    });
                }
                Ok((Layout::from_shape(shape), x.1))
            }
            Self::Transpose { perm } => {
                let [x] = self.n_inputs::<1>(inputs)?;
                if !is_permutation(perm, x.0.ndim()) {
                    return Err(Error::InvalidArgument(format!(
                        "{:?} is not a permutation of a rank-{} tensor",
                        perm,
                        x.0.ndim()
                    )));
                }
                let shape: Vec<usize> = perm.iter().map(|&p| x.0.shape()[p]).collect();
                Ok((Layout::from_shape(&shape), x.1))
            }
            Self::Slice { begin, size } => {
                let [x] = self.n_inputs::<1>(inputs)?;
                if begin.len() != x.0.ndim() || size.len() != x.0.ndim() {
                    return Err(Error::ShapeMismatch {
                        op: self.name(),
                        lhs: x.0.shape().to_vec(),
                        rhs: size.clone(),
                    });
                }
                for d in 0..x.0.ndim() {
                    if begin[d] + size[d] > x.0.shape()[d] {
                        return Err(Error::IndexOutOfBounds {
                            index: begin[d] + size[d],
                            size: x.0.shape()[d],
                        });
                    }
                }
                Ok((Layout::from_shape(size), x.1))
            }
            Self::Pad { paddings } => {
                let [x] = self.n_inputs::<1>(inputs)?;
                if paddings.len() != x.0.ndim() {
                    return Err(Error::ShapeMismatch {
                        op: self.name(),
                        lhs: x.0.shape().to_vec(),
                        rhs: paddings.iter().map(|p| p.0 + p.1).collect(),
                    });
                }
                let shape: Vec<usize> = x
                    .0
                    .shape()
                    .iter()
                    .zip(paddings)
                    .map(|(&d, &(lo, hi))| lo + d + hi)
                    .collect();
                Ok((Layout::from_shape(&shape), x.1))
            }
            Self::Concat { axis } => {
                let [a, b] = self.n_inputs::<2>(inputs)?;
                if a.1 != b.1 {
                    return Err(Error::DTypeMismatch {
                        expected: a.1,
                        got: b.1,
                    });
                }
                if *axis >= a.0.ndim() || a.0.ndim() != b.0.ndim() {
                    return Err(Error::DimensionOutOfBounds {
                        dim: *axis,
                        ndim: a.0.ndim(),
                    });
                }
                for d in 0..a.0.ndim() {
                    if d != *axis && a.0.shape()[d] != b.0.shape()[d] {
                        return Err(Error::ShapeMismatch {
                            op: self.name(),
                            lhs: a.0.shape().to_vec(),
                            rhs: b.0.shape().to_vec(),
                        });
                    }
                }
                let mut shape = a.0.shape().to_vec();
                shape[*axis] += b.0.shape()[*axis];
                Ok((Layout::from_shape(&shape), a.1))
            }
            Self::Cast { dtype } => {
                let [x] = self.n_inputs::<1>(inputs)?;
                Ok((Layout::from_shape(x.0.shape()), *dtype))
            }
            Self::Conv2d(params) => {
                let [x, filter] = self.n_inputs::<2>(inputs)?;
                require_f32(self.name(), x.1)?;
                let (xs, fs) = (x.0.shape(), filter.0.shape());
                if xs.len() != 4 || fs.len() != 4 || xs[3] != fs[2] {
                    return Err(Error::ShapeMismatch {
                        op: self.name(),
                        lhs: xs.to_vec(),
                        rhs: fs.to_vec(),
                    });
                }
                let oh = conv_out_dim(self.name(), xs[1], fs[0], params.stride.0, params.padding.0)?;
                let ow = conv_out_dim(self.name(), xs[2], fs[1], params.stride.1, params.padding.1)?;
                Ok((Layout::from_shape(&[xs[0], oh, ow, fs[3]]), DType::F32))
            }
            Self::Conv2dBackpropInput { input_shape, .. } => {
                let [_dy, _filter] = self.n_inputs::<2>(inputs)?;
                require_f32(self.name(), inputs[0].1)?;
                Ok((Layout::from_shape(input_shape), DType::F32))
            }
            Self::Conv2dBackpropFilter { filter_shape, .. } => {
                let [_x, _dy] = self.n_inputs::<2>(inputs)?;
                require_f32(self.name(), inputs[0].1)?;
                Ok((Layout::from_shape(filter_shape), DType::F32))
            }
            Self::MaxPool(params) | Self::AvgPool(params) => {
                let [x] = self.n_inputs::<1>(inputs)?;
                require_f32(self.name(), x.1)?;
                let xs = x.0.shape();
                if xs.len() != 4 {
                    return Err(Error::InvalidShape {
                        message: format!("pooling expects an NHWC tensor, got {:?}", xs),
                    });
                }
                let oh = conv_out_dim(self.name(), xs[1], params.window.0, params.stride.0, params.padding.0)?;
                let ow = conv_out_dim(self.name(), xs[2], params.window.1, params.stride.1, params.padding.1)?;
                Ok((Layout::from_shape(&[xs[0], oh, ow, xs[3]]), DType::F32))
            }
            Self::MaxPoolBackprop(_) => {
                let [_dy, x] = self.n_inputs::<2>(inputs)?;
                require_f32(self.name(), x.1)?;
                Ok((Layout::from_shape(x.0.shape()), DType::F32))
            }
            Self::AvgPoolBackprop { input_shape, .. } => {
                let [_dy] = self.n_inputs::<1>(inputs)?;
                require_f32(self.name(), inputs[0].1)?;
                Ok((Layout::from_shape(input_shape), DType::F32))
            }
        }
    }

    fn binary_inputs<'a>(
        &self,
        inputs: &[(&'a Layout, DType)],
    ) -> Result<((&'a Layout, DType), (&'a Layout, DType))> {
        let [l, r] = self.n_inputs::<2>(inputs)?;
        if l.0.shape() != r.0.shape() {
            return Err(Error::ShapeMismatch {
                op: self.name(),
                lhs: l.0.shape().to_vec(),
                rhs: r.0.shape().to_vec(),
            });
        }
        if l.1 != r.1 {
            return Err(Error::DTypeMismatch {
                expected: l.1,
                got: r.1,
            });
        }
        Ok((l, r))
    }

    fn n_inputs<'a, const N: usize>(
        &self,
        inputs: &[(&'a Layout, DType)],
    ) -> Result<[(&'a Layout, DType); N]> {
        <[(&Layout, DType); N]>::try_from(inputs).map_err(|_| Error::Internal {
            message: format!("kernel {} expects {} inputs, got {}", self.name(), N, inputs.len()),
        })
    }
}

fn require_f32(kernel: &'static str, dtype: DType) -> Result<()> {
    if dtype != DType::F32 {
        return Err(Error::UnsupportedDType { kernel, dtype });
    }
    Ok(())
}

fn is_permutation(perm: &[usize], ndim: usize) -> bool {
    if perm.len() != ndim {
        return false;
    }
    let mut seen = vec![false; ndim];
    for &p in perm {
        if p >= ndim || seen[p] {
            return false;
        }
        seen[p] = true;
    }
    true
}

fn conv_out_dim(kernel: &'static str, input: usize, window: usize, stride: usize, padding: usize) -> Result<usize> {
    let padded = input + 2 * padding;
    if stride == 0 || window == 0 || window > padded {
        return Err(Error::InvalidArgument(format!(
            "{}: window {} with stride {} does not fit input {} (padding {})",
            kernel, window, stride, input, padding
        )));
    }
    Ok((padded - window) / stride + 1)
}

/// Shape after reducing `axes` out of `shape`; reduced dims become 1 when
/// `keep_dims` is set and disappear otherwise.
pub fn reduced_shape(shape: &[usize], axes: &[usize], keep_dims: bool) -> Result<Vec<usize>> {
    let mut reduce = vec![false; shape.len()];
    for &axis in axes {
        if axis >= shape.len() {
            return Err(Error::DimensionOutOfBounds {
                dim: axis,
                ndim: shape.len(),
            });
        }
        reduce[axis] = true;
    }

    let mut out = Vec::with_capacity(shape.len());
    for (d, &size) in shape.iter().enumerate() {
        if reduce[d] {
            if keep_dims {
                out.push(1);
            }
        } else {
            out.push(size);
        }
    }
    Ok(out)
}
