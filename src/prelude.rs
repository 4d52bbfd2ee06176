pub use crate::core::{
    buffer::HostBuffer,
    device::Device,
    dtype::DType,
    error::{Error, Result},
    scalar::Scalar,
};
pub use crate::engine::{Engine, LstmCellFn, ScopeResult, Tensor, TensorId, Variable};
