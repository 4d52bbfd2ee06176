use crate::{dispatch::Arg, tape::GradFn, tensor::Tensor, Engine};
use gradix_core::{
    dtype::{promoted_dtype, DType},
    error::Result,
    kernel::Kernel,
    layout::broadcast_shapes,
};
use std::sync::Arc;

impl Engine {
    pub fn add(&mut self, a: &Tensor, b: &Tensor) -> Result<Tensor> {
        let (a_shape, b_shape) = (a.shape().to_vec(), b.shape().to_vec());
        self.binary_op(
            Kernel::Add,
            a,
            b,
            Some(Arc::new(move |eng: &mut Engine, dy: &Tensor, _y: &Tensor| {
                let da = eng.sum_to_shape(dy, &a_shape)?;
                let db = eng.sum_to_shape(dy, &b_shape)?;
                Ok(vec![Some(da), Some(db)])
            })),
        )
    }

    pub fn sub(&mut self, a: &Tensor, b: &Tensor) -> Result<Tensor> {
        let (a_shape, b_shape) = (a.shape().to_vec(), b.shape().to_vec());
        self.binary_op(
            Kernel::Sub,
            a,
            b,
            Some(Arc::new(move |eng: &mut Engine, dy: &Tensor, _y: &Tensor| {
                let da = eng.sum_to_shape(dy, &a_shape)?;
                let neg = eng.neg(dy)?;
                let db = eng.sum_to_shape(&neg, &b_shape)?;
                Ok(vec![Some(da), Some(db)])
            })),
        )
    }

    pub fn mul(&mut self, a: &Tensor, b: &Tensor) -> Result<Tensor> {
        let (ac, bc) = (a.clone(), b.clone());
        let (a_shape, b_shape) = (a.shape().to_vec(), b.shape().to_vec());
        self.binary_op(
            Kernel::Mul,
            a,
            b,
            Some(Arc::new(move |eng: &mut Engine, dy: &Tensor, _y: &Tensor| {
                let da_full = eng.mul(dy, &bc)?;
                let da = eng.sum_to_shape(&da_full, &a_shape)?;
                let db_full = eng.mul(dy, &ac)?;
                let db = eng.sum_to_shape(&db_full, &b_shape)?;
                Ok(vec![Some(da), Some(db)])
            })),
        )
    }

    pub fn div(&mut self, a: &Tensor, b: &Tensor) -> Result<Tensor> {
        let (ac, bc) = (a.clone(), b.clone());
        let (a_shape, b_shape) = (a.shape().to_vec(), b.shape().to_vec());
        self.binary_op(
            Kernel::Div,
            a,
            b,
            Some(Arc::new(move |eng: &mut Engine, dy: &Tensor, _y: &Tensor| {
                let da_full = eng.div(dy, &bc)?;
                let da = eng.sum_to_shape(&da_full, &a_shape)?;
                // db = -dy * a / b^2
                let num = eng.mul(dy, &ac)?;
                let denom = eng.mul(&bc, &bc)?;
                let quot = eng.div(&num, &denom)?;
                let db_full = eng.neg(&quot)?;
                let db = eng.sum_to_shape(&db_full, &b_shape)?;
                Ok(vec![Some(da), Some(db)])
            })),
        )
    }

    pub fn pow(&mut self, a: &Tensor, b: &Tensor) -> Result<Tensor> {
        let (ac, bc) = (a.clone(), b.clone());
        let (a_shape, b_shape) = (a.shape().to_vec(), b.shape().to_vec());
        self.binary_op(
            Kernel::Pow,
            a,
            b,
            Some(Arc::new(move |eng: &mut Engine, dy: &Tensor, y: &Tensor| {
                // da = dy * b * a^(b - 1)
                let one = eng.scalar(1.0)?;
                let b_minus_1 = eng.sub(&bc, &one)?;
                let a_pow = eng.pow(&ac, &b_minus_1)?;
                let scaled = eng.mul(&bc, &a_pow)?;
                let da_full = eng.mul(dy, &scaled)?;
                let da = eng.sum_to_shape(&da_full, &a_shape)?;
                // db = dy * y * ln(a)
                let ln_a = eng.log(&ac)?;
                let y_ln = eng.mul(y, &ln_a)?;
                let db_full = eng.mul(dy, &y_ln)?;
                let db = eng.sum_to_shape(&db_full, &b_shape)?;
                Ok(vec![Some(da), Some(db)])
            })),
        )
    }

    pub fn maximum(&mut self, a: &Tensor, b: &Tensor) -> Result<Tensor> {
        self.extremum(Kernel::Maximum, a, b)
    }

    pub fn minimum(&mut self, a: &Tensor, b: &Tensor) -> Result<Tensor> {
        self.extremum(Kernel::Minimum, a, b)
    }

    /// Shared gradient for maximum/minimum: the winning side receives the
    /// whole gradient, ties go to the left operand.
    fn extremum(&mut self, kernel: Kernel, a: &Tensor, b: &Tensor) -> Result<Tensor> {
        let take_max = kernel == Kernel::Maximum;
        let (ac, bc) = (a.clone(), b.clone());
        let (a_shape, b_shape) = (a.shape().to_vec(), b.shape().to_vec());
        self.binary_op(
            kernel,
            a,
            b,
            Some(Arc::new(move |eng: &mut Engine, dy: &Tensor, _y: &Tensor| {
                let (a_wins, b_wins) = if take_max {
                    (eng.greater_equal(&ac, &bc)?, eng.less(&ac, &bc)?)
                } else {
                    (eng.less_equal(&ac, &bc)?, eng.greater(&ac, &bc)?)
                };
                let a_mask = eng.cast(&a_wins, DType::F32)?;
                let b_mask = eng.cast(&b_wins, DType::F32)?;
                let da_full = eng.mul(dy, &a_mask)?;
                let da = eng.sum_to_shape(&da_full, &a_shape)?;
                let db_full = eng.mul(dy, &b_mask)?;
                let db = eng.sum_to_shape(&db_full, &b_shape)?;
                Ok(vec![Some(da), Some(db)])
            })),
        )
    }

    pub fn equal(&mut self, a: &Tensor, b: &Tensor) -> Result<Tensor> {
        self.binary_op(Kernel::Equal, a, b, None)
    }

    pub fn not_equal(&mut self, a: &Tensor, b: &Tensor) -> Result<Tensor> {
        self.binary_op(Kernel::NotEqual, a, b, None)
    }

    pub fn greater(&mut self, a: &Tensor, b: &Tensor) -> Result<Tensor> {
        self.binary_op(Kernel::Greater, a, b, None)
    }

    pub fn greater_equal(&mut self, a: &Tensor, b: &Tensor) -> Result<Tensor> {
        self.binary_op(Kernel::GreaterEqual, a, b, None)
    }

    pub fn less(&mut self, a: &Tensor, b: &Tensor) -> Result<Tensor> {
        self.binary_op(Kernel::Less, a, b, None)
    }

    pub fn less_equal(&mut self, a: &Tensor, b: &Tensor) -> Result<Tensor> {
        self.binary_op(Kernel::LessEqual, a, b, None)
    }

    pub fn logical_and(&mut self, a: &Tensor, b: &Tensor) -> Result<Tensor> {
        self.binary_op(Kernel::LogicalAnd, a, b, None)
    }

    pub fn logical_or(&mut self, a: &Tensor, b: &Tensor) -> Result<Tensor> {
        self.binary_op(Kernel::LogicalOr, a, b, None)
    }

    /// Elementwise choice between two equal-shaped tensors. Gradients pass
    /// through whichever branch was selected; none flow into the mask.
    pub fn select(&mut self, cond: &Tensor, on_true: &Tensor, on_false: &Tensor) -> Result<Tensor> {
        let mask = cond.clone();
        let grad_fn: GradFn = Arc::new(move |eng: &mut Engine, dy: &Tensor, _y: &Tensor| {
            let zeros = eng.zeros_like(dy)?;
            let dt = eng.select_raw(&mask, dy, &zeros)?;
            let df = eng.select_raw(&mask, &zeros, dy)?;
            Ok(vec![None, Some(dt), Some(df)])
        });
        self.dispatch(
            Kernel::Select,
            &[
                Arg::new("cond", cond),
                Arg::new("on_true", on_true),
                Arg::new("on_false", on_false),
            ],
            Some(grad_fn),
        )
    }

    /// Select without tape recording, used inside gradient closures.
    fn select_raw(&mut self, cond: &Tensor, on_true: &Tensor, on_false: &Tensor) -> Result<Tensor> {
        self.dispatch(
            Kernel::Select,
            &[
                Arg::new("cond", cond),
                Arg::new("on_true", on_true),
                Arg::new("on_false", on_false),
            ],
            None,
        )
    }

    /// Broadcasts both operands to their common shape, promotes mixed
    /// dtypes, and dispatches through zero-stride views.
    fn binary_op(
        &mut self,
        kernel: Kernel,
        a: &Tensor,
        b: &Tensor,
        grad_fn: Option<GradFn>,
    ) -> Result<Tensor> {
        let (a, b) = self.promote_pair(a, b)?;
        let shape = broadcast_shapes(a.shape(), b.shape())?;
        let lhs_view = a.layout.broadcast_to(&shape)?;
        let rhs_view = b.layout.broadcast_to(&shape)?;
        self.dispatch(
            kernel,
            &[
                Arg::viewed("lhs", &a, lhs_view),
                Arg::viewed("rhs", &b, rhs_view),
            ],
            grad_fn,
        )
    }

    fn promote_pair(&mut self, a: &Tensor, b: &Tensor) -> Result<(Tensor, Tensor)> {
        if a.dtype == b.dtype {
            return Ok((a.clone(), b.clone()));
        }
        let target = promoted_dtype(a.dtype, b.dtype);
        let a = if a.dtype == target {
            a.clone()
        } else {
            self.cast(a, target)?
        };
        let b = if b.dtype == target {
            b.clone()
        } else {
            self.cast(b, target)?
        };
        Ok((a, b))
    }
}
