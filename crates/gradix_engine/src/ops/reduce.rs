use crate::{dispatch::Arg, tensor::Tensor, Engine};
use gradix_core::{
    dtype::DType,
    error::Result,
    kernel::{reduced_shape, Kernel},
};
use std::sync::Arc;

impl Engine {
    /// Sum of every element, as a rank-0 tensor.
    pub fn sum(&mut self, x: &Tensor) -> Result<Tensor> {
        let axes: Vec<usize> = (0..x.ndim()).collect();
        self.sum_axes(x, &axes, false)
    }

    /// Sum over the given axes. The gradient broadcasts `dy` back over
    /// the reduced dimensions.
    pub fn sum_axes(&mut self, x: &Tensor, axes: &[usize], keep_dims: bool) -> Result<Tensor> {
        let x_shape = x.shape().to_vec();
        let keep_shape = reduced_shape(&x_shape, axes, true)?;
        let tmpl = x.clone();
        self.dispatch(
            Kernel::Sum {
                axes: axes.to_vec(),
                keep_dims,
            },
            &[Arg::new("x", x)],
            Some(Arc::new(move |eng: &mut Engine, dy: &Tensor, _y: &Tensor| {
                let dyk = eng.reshape(dy, &keep_shape)?;
                let ones = eng.ones_like(&tmpl)?;
                Ok(vec![Some(eng.mul(&dyk, &ones)?)])
            })),
        )
    }

    /// Arithmetic mean of every element, as a rank-0 tensor. Composed
    /// from sum and a scalar multiply, so its gradient falls out of the
    /// tape for free.
    pub fn mean(&mut self, x: &Tensor) -> Result<Tensor> {
        let axes: Vec<usize> = (0..x.ndim()).collect();
        self.mean_axes(x, &axes, false)
    }

    pub fn mean_axes(&mut self, x: &Tensor, axes: &[usize], keep_dims: bool) -> Result<Tensor> {
        let count: usize = axes
            .iter()
            .map(|&axis| x.shape().get(axis).copied().unwrap_or(1))
            .product();
        let total = self.sum_axes(x, axes, keep_dims)?;
        let inv = self.scalar(1.0 / count.max(1) as f32)?;
        self.mul(&total, &inv)
    }

    pub fn max(&mut self, x: &Tensor) -> Result<Tensor> {
        let axes: Vec<usize> = (0..x.ndim()).collect();
        self.max_axes(x, &axes, false)
    }

    pub fn max_axes(&mut self, x: &Tensor, axes: &[usize], keep_dims: bool) -> Result<Tensor> {
        self.extremum_axes(Kernel::Max {
            axes: axes.to_vec(),
            keep_dims,
        }, x, axes)
    }

    pub fn min(&mut self, x: &Tensor) -> Result<Tensor> {
        let axes: Vec<usize> = (0..x.ndim()).collect();
        self.min_axes(x, &axes, false)
    }

    pub fn min_axes(&mut self, x: &Tensor, axes: &[usize], keep_dims: bool) -> Result<Tensor> {
        self.extremum_axes(Kernel::Min {
            axes: axes.to_vec(),
            keep_dims,
        }, x, axes)
    }

    /// Max/min share their gradient: `dy` flows to every element equal to
    /// the extremum of its lane.
    fn extremum_axes(&mut self, kernel: Kernel, x: &Tensor, axes: &[usize]) -> Result<Tensor> {
        let x_shape = x.shape().to_vec();
        let keep_shape = reduced_shape(&x_shape, axes, true)?;
        let xc = x.clone();
        self.dispatch(
            kernel,
            &[Arg::new("x", x)],
            Some(Arc::new(move |eng: &mut Engine, dy: &Tensor, y: &Tensor| {
                let yk = eng.reshape(y, &keep_shape)?;
                let hit = eng.equal(&xc, &yk)?;
                let mask = eng.cast(&hit, DType::F32)?;
                let dyk = eng.reshape(dy, &keep_shape)?;
                Ok(vec![Some(eng.mul(&dyk, &mask)?)])
            })),
        )
    }

    /// Index of the lane maximum along `axis`; not differentiable.
    pub fn arg_max(&mut self, x: &Tensor, axis: usize) -> Result<Tensor> {
        self.dispatch(Kernel::ArgMax { axis }, &[Arg::new("x", x)], None)
    }

    /// Reduces a broadcast gradient back down to the pre-broadcast shape:
    /// sums out the leading dimensions broadcasting introduced and the
    /// dimensions that were stretched from 1.
    pub(crate) fn sum_to_shape(&mut self, t: &Tensor, shape: &[usize]) -> Result<Tensor> {
        if t.shape() == shape {
            return Ok(t.clone());
        }
        let lead = t.ndim() - shape.len();
        let mut axes: Vec<usize> = (0..lead).collect();
        for (d, &target) in shape.iter().enumerate() {
            if target == 1 && t.shape()[lead + d] != 1 {
                axes.push(lead + d);
            }
        }
        let summed = if axes.is_empty() {
            t.clone()
        } else {
            self.sum_axes(t, &axes, false)?
        };
        if summed.shape() == shape {
            Ok(summed)
        } else {
            self.reshape(&summed, shape)
        }
    }
}
