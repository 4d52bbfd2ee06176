use crate::error::{Error, Result};

/// Shape and strides of a tensor. Broadcast views carry zero strides along
/// expanded dimensions and share the underlying storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layout {
    shape: Vec<usize>,
    strides: Vec<usize>,
}

impl Layout {
    pub fn new(shape: &[usize], strides: &[usize]) -> Self {
        Self {
            shape: shape.to_vec(),
            strides: strides.to_vec(),
        }
    }

    pub fn from_shape(shape: &[usize]) -> Self {
        Self {
            shape: shape.to_vec(),
            strides: Self::compute_strides(shape),
        }
    }

    pub fn scalar() -> Self {
        Self::from_shape(&[])
    }

    pub fn ndim(&self) -> usize {
        self.shape.len()
    }

    pub fn size(&self) -> usize {
        self.shape.iter().product()
    }

    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    pub fn strides(&self) -> &[usize] {
        &self.strides
    }

    pub fn dim_size(&self, dim: usize) -> Option<usize> {
        self.shape.get(dim).copied()
    }

    pub fn compute_strides(shape: &[usize]) -> Vec<usize> {
        if shape.is_empty() {
            return vec![];
        }

        let mut strides = vec![1; shape.len()];
        for i in (0..shape.len() - 1).rev() {
            strides[i] = strides[i + 1] * shape[i + 1];
        }
        strides
    }

    pub fn is_contiguous(&self) -> bool {
        self.strides == Self::compute_strides(&self.shape)
    }

    /// Maps a linear index over the logical shape onto a storage offset via
    /// the strides. The identity for contiguous layouts.
    pub fn position(&self, linear: usize) -> usize {
        let mut offset = 0;
        let mut rem = linear;
        for d in (0..self.shape.len()).rev() {
            let digit = rem % self.shape[d];
            offset += digit * self.strides[d];
            rem /= self.shape[d];
        }
        offset
    }

    /// Returns a zero-stride view of this layout broadcast up to `target`.
    /// Missing leading dimensions are treated as 1.
    pub fn broadcast_to(&self, target: &[usize]) -> Result<Layout> {
        if target.len() < self.shape.len() {
            return Err(Error::ShapeMismatch {
                op: "broadcast",
                lhs: self.shape.clone(),
                rhs: target.to_vec(),
            });
        }

        let lead = target.len() - self.shape.len();
        let mut strides = vec![0; target.len()];
        for (i, &t) in target.iter().enumerate().skip(lead) {
            let s = self.shape[i - lead];
            if s == t {
                strides[i] = self.strides[i - lead];
            } else if s == 1 {
                strides[i] = 0;
            } else {
                return Err(Error::ShapeMismatch {
                    op: "broadcast",
                    lhs: self.shape.clone(),
                    rhs: target.to_vec(),
                });
            }
        }

        Ok(Layout::new(target, &strides))
    }
}

/// Computes the broadcast of two shapes, aligning from the trailing
/// dimension: each pair must be equal, or one of them 1 or absent.
pub fn broadcast_shapes(a: &[usize], b: &[usize]) -> Result<Vec<usize>> {
    let ndim = a.len().max(b.len());
    let mut out = vec![0; ndim];

    for i in 0..ndim {
        let da = if i < a.len() { a[a.len() - 1 - i] } else { 1 };
        let db = if i < b.len() { b[b.len() - 1 - i] } else { 1 };

        if da == db || da == 1 || db == 1 {
            out[ndim - 1 - i] = da.max(db);
        } else {
            return Err(Error::ShapeMismatch {
                op: "broadcast",
                lhs: a.to_vec(),
                rhs: b.to_vec(),
            });
        }
    }

    Ok(out)
}
