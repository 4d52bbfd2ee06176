use crate::{dispatch::Arg, tensor::Tensor, Engine};
use gradix_core::{dtype::DType, error::Result, kernel::Kernel};
use std::sync::Arc;

impl Engine {
    pub fn reshape(&mut self, x: &Tensor, shape: &[usize]) -> Result<Tensor> {
        let x_shape = x.shape().to_vec();
        self.dispatch(
            Kernel::Reshape {
                shape: shape.to_vec(),
            },
            &[Arg::new("x", x)],
            Some(Arc::new(move |eng: &mut Engine, dy: &Tensor, _y: &Tensor| {
                Ok(vec![Some(eng.reshape(dy, &x_shape)?)])
            })),
        )
    }

    pub fn transpose(&mut self, x: &Tensor, perm: &[usize]) -> Result<Tensor> {
        // Inverting the permutation routes each gradient element back to
        // the dimension it came from.
        let mut inverse = vec![0usize; perm.len()];
        for (d, &p) in perm.iter().enumerate() {
            if p < inverse.len() {
                inverse[p] = d;
            }
        }
        self.dispatch(
            Kernel::Transpose {
                perm: perm.to_vec(),
            },
            &[Arg::new("x", x)],
            Some(Arc::new(move |eng: &mut Engine, dy: &Tensor, _y: &Tensor| {
                Ok(vec![Some(eng.transpose(dy, &inverse)?)])
            })),
        )
    }

    pub fn slice(&mut self, x: &Tensor, begin: &[usize], size: &[usize]) -> Result<Tensor> {
        let x_shape = x.shape().to_vec();
        let begin_owned = begin.to_vec();
        let size_owned = size.to_vec();
        self.dispatch(
            Kernel::Slice {
                begin: begin.to_vec(),
                size: size.to_vec(),
            },
            &[Arg::new("x", x)],
            Some(Arc::new(move |eng: &mut Engine, dy: &Tensor, _y: &Tensor| {
                let paddings: Vec<(usize, usize)> = x_shape
                    .iter()
                    .zip(begin_owned.iter().zip(&size_owned))
                    .map(|(&dim, (&lo, &len))| (lo, dim - lo - len))
                    .collect();
                Ok(vec![Some(eng.pad(dy, &paddings)?)])
            })),
        )
    }

    pub fn pad(&mut self, x: &Tensor, paddings: &[(usize, usize)]) -> Result<Tensor> {
        let x_shape = x.shape().to_vec();
        let pads = paddings.to_vec();
        self.dispatch(
            Kernel::Pad {
                paddings: paddings.to_vec(),
            },
            &[Arg::new("x", x)],
            Some(Arc::new(move |eng: &mut Engine, dy: &Tensor, _y: &Tensor| {
                let begin: Vec<usize> = pads.iter().map(|&(lo, _)| lo).collect();
                Ok(vec![Some(eng.slice(dy, &begin, &x_shape)?)])
            })),
        )
    }

    /// Joins two tensors along `axis`; the gradient splits `dy` back into
    /// the two pieces.
    pub fn concat(&mut self, a: &Tensor, b: &Tensor, axis: usize) -> Result<Tensor> {
        let a_shape = a.shape().to_vec();
        let b_shape = b.shape().to_vec();
        self.dispatch(
            Kernel::Concat { axis },
            &[Arg::new("lhs", a), Arg::new("rhs", b)],
            Some(Arc::new(move |eng: &mut Engine, dy: &Tensor, _y: &Tensor| {
                let zero_begin = vec![0usize; a_shape.len()];
                let da = eng.slice(dy, &zero_begin, &a_shape)?;
                let mut b_begin = zero_begin;
                b_begin[axis] = a_shape[axis];
                let db = eng.slice(dy, &b_begin, &b_shape)?;
                Ok(vec![Some(da), Some(db)])
            })),
        )
    }

    /// Value conversion between dtypes; gradients do not flow through a
    /// cast.
    pub fn cast(&mut self, x: &Tensor, dtype: DType) -> Result<Tensor> {
        if x.dtype == dtype {
            return Ok(x.clone());
        }
        self.dispatch(Kernel::Cast { dtype }, &[Arg::new("x", x)], None)
    }
}
