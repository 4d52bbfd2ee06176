use crate::{dispatch::Arg, tape::GradFn, tensor::Tensor, Engine};
use gradix_core::{error::Result, kernel::Kernel};
use std::sync::Arc;

impl Engine {
    pub fn neg(&mut self, x: &Tensor) -> Result<Tensor> {
        self.unary_op(
            Kernel::Neg,
            x,
            Some(Arc::new(|eng: &mut Engine, dy: &Tensor, _y: &Tensor| {
                Ok(vec![Some(eng.neg(dy)?)])
            })),
        )
    }

    /// Gradient is the sign of the input; exactly zero at zero.
    pub fn abs(&mut self, x: &Tensor) -> Result<Tensor> {
        let xc = x.clone();
        self.unary_op(
            Kernel::Abs,
            x,
            Some(Arc::new(move |eng: &mut Engine, dy: &Tensor, _y: &Tensor| {
                let pos = eng.step(&xc)?;
                let neg_x = eng.neg(&xc)?;
                let neg = eng.step(&neg_x)?;
                let sign = eng.sub(&pos, &neg)?;
                Ok(vec![Some(eng.mul(dy, &sign)?)])
            })),
        )
    }

    pub fn exp(&mut self, x: &Tensor) -> Result<Tensor> {
        self.unary_op(
            Kernel::Exp,
            x,
            Some(Arc::new(|eng: &mut Engine, dy: &Tensor, y: &Tensor| {
                Ok(vec![Some(eng.mul(dy, y)?)])
            })),
        )
    }

    pub fn log(&mut self, x: &Tensor) -> Result<Tensor> {
        let xc = x.clone();
        self.unary_op(
            Kernel::Log,
            x,
            Some(Arc::new(move |eng: &mut Engine, dy: &Tensor, _y: &Tensor| {
                Ok(vec![Some(eng.div(dy, &xc)?)])
            })),
        )
    }

    pub fn sqrt(&mut self, x: &Tensor) -> Result<Tensor> {
        self.unary_op(
            Kernel::Sqrt,
            x,
            Some(Arc::new(|eng: &mut Engine, dy: &Tensor, y: &Tensor| {
                // d/dx sqrt(x) = 1 / (2 sqrt(x)) = 0.5 / y
                let half = eng.scalar(0.5)?;
                let factor = eng.div(&half, y)?;
                Ok(vec![Some(eng.mul(dy, &factor)?)])
            })),
        )
    }

    pub fn square(&mut self, x: &Tensor) -> Result<Tensor> {
        let xc = x.clone();
        self.unary_op(
            Kernel::Square,
            x,
            Some(Arc::new(move |eng: &mut Engine, dy: &Tensor, _y: &Tensor| {
                let two = eng.scalar(2.0)?;
                let twice = eng.mul(&two, &xc)?;
                Ok(vec![Some(eng.mul(dy, &twice)?)])
            })),
        )
    }

    pub fn relu(&mut self, x: &Tensor) -> Result<Tensor> {
        let xc = x.clone();
        self.unary_op(
            Kernel::Relu,
            x,
            Some(Arc::new(move |eng: &mut Engine, dy: &Tensor, _y: &Tensor| {
                let mask = eng.step(&xc)?;
                Ok(vec![Some(eng.mul(dy, &mask)?)])
            })),
        )
    }

    pub fn sigmoid(&mut self, x: &Tensor) -> Result<Tensor> {
        self.unary_op(
            Kernel::Sigmoid,
            x,
            Some(Arc::new(|eng: &mut Engine, dy: &Tensor, y: &Tensor| {
                let one = eng.scalar(1.0)?;
                let complement = eng.sub(&one, y)?;
                let slope = eng.mul(y, &complement)?;
                Ok(vec![Some(eng.mul(dy, &slope)?)])
            })),
        )
    }

    pub fn tanh(&mut self, x: &Tensor) -> Result<Tensor> {
        self.unary_op(
            Kernel::Tanh,
            x,
            Some(Arc::new(|eng: &mut Engine, dy: &Tensor, y: &Tensor| {
                let one = eng.scalar(1.0)?;
                let y2 = eng.square(y)?;
                let slope = eng.sub(&one, &y2)?;
                Ok(vec![Some(eng.mul(dy, &slope)?)])
            })),
        )
    }

    /// Heaviside step; its gradient is zero almost everywhere, and zero is
    /// what flows back.
    pub fn step(&mut self, x: &Tensor) -> Result<Tensor> {
        self.unary_op(
            Kernel::Step,
            x,
            Some(Arc::new(|eng: &mut Engine, dy: &Tensor, _y: &Tensor| {
                Ok(vec![Some(eng.zeros_like(dy)?)])
            })),
        )
    }

    fn unary_op(&mut self, kernel: Kernel, x: &Tensor, grad_fn: Option<GradFn>) -> Result<Tensor> {
        self.dispatch(kernel, &[Arg::new("x", x)], grad_fn)
    }
}
