use crate::{dispatch::Arg, tensor::Tensor, Engine};
use gradix_core::{error::Result, kernel::Kernel};
use std::sync::Arc;

impl Engine {
    /// 2-D matrix product. `da = dy @ b^T`, `db = a^T @ dy`.
    pub fn matmul(&mut self, a: &Tensor, b: &Tensor) -> Result<Tensor> {
        let (ac, bc) = (a.clone(), b.clone());
        self.dispatch(
            Kernel::MatMul,
            &[Arg::new("lhs", a), Arg::new("rhs", b)],
            Some(Arc::new(move |eng: &mut Engine, dy: &Tensor, _y: &Tensor| {
                let bt = eng.transpose(&bc, &[1, 0])?;
                let da = eng.matmul(dy, &bt)?;
                let at = eng.transpose(&ac, &[1, 0])?;
                let db = eng.matmul(&at, dy)?;
                Ok(vec![Some(da), Some(db)])
            })),
        )
    }
}
