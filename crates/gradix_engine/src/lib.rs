//! The execution engine: eager dispatch of validated kernels onto a
//! backend, an append-only tape of differentiable dispatches, explicit
//! tensor lifetime via nested scopes, and reverse-mode gradients by
//! replaying the tape backwards.

mod creation;
mod dispatch;
mod grads;
mod ops;
mod scope;
mod tape;
mod tensor;
mod variable;

pub use ops::LstmCellFn;
pub use scope::ScopeResult;
pub use tensor::{Tensor, TensorId};
pub use variable::Variable;

use gradix_accel::AccelBackend;
use gradix_core::{
    backend::Backend,
    buffer::HostBuffer,
    device::Device,
    error::{Error, Result},
    readback::Readback,
};
use gradix_cpu::CpuBackend;
use gradix_core::backend::StorageId;
use scope::Frame;
use std::collections::HashSet;
use std::sync::Arc;

pub struct Engine {
    backend: Arc<dyn Backend + Send + Sync>,
    frames: Vec<Frame>,
    variables: Vec<Variable>,
    kept: HashSet<StorageId>,
}

impl Engine {
    /// Engine over the reference backend.
    pub fn cpu() -> Self {
        Self::with_backend(Arc::new(CpuBackend::new()))
    }

    /// Engine over the accelerated backend.
    pub fn accel() -> Self {
        Self::with_backend(Arc::new(AccelBackend::new()))
    }

    pub fn new(device: Device) -> Self {
        match device {
            Device::CPU => Self::cpu(),
            Device::Accel => Self::accel(),
        }
    }

    pub fn with_backend(backend: Arc<dyn Backend + Send + Sync>) -> Self {
        Self {
            backend,
            frames: vec![Frame::new(false)],
            variables: Vec::new(),
            kept: HashSet::new(),
        }
    }

    pub fn device(&self) -> Device {
        self.backend.device()
    }

    /// Live storage entries on the backend.
    pub fn storage_count(&self) -> usize {
        self.backend.storage_count()
    }

    /// Blocking readback of a tensor's contents.
    pub fn read(&self, tensor: &Tensor) -> Result<HostBuffer> {
        self.backend.read_sync(tensor.sid)
    }

    /// Readback as `Vec<f32>`, whatever the dtype.
    pub fn read_f32(&self, tensor: &Tensor) -> Result<Vec<f32>> {
        Ok(self.read(tensor)?.to_f32_vec())
    }

    /// The scalar value of a single-element tensor.
    pub fn read_scalar(&self, tensor: &Tensor) -> Result<f32> {
        let values = self.read_f32(tensor)?;
        match values.first() {
            Some(&value) if values.len() == 1 => Ok(value),
            _ => Err(Error::InvalidArgument(format!(
                "expected a scalar, got shape {:?}",
                tensor.shape()
            ))),
        }
    }

    /// Non-blocking readback; resolves once pending work on the tensor's
    /// storage has drained.
    pub fn read_async(&self, tensor: &Tensor) -> Readback {
        self.backend.read_async(tensor.sid)
    }

    /// Overwrites a tensor's storage with new host data of the same
    /// element count.
    pub fn write(&mut self, tensor: &Tensor, data: impl Into<HostBuffer>) -> Result<()> {
        self.backend.write(tensor.sid, data.into())
    }

    /// Frees one tensor's storage immediately, dropping any keep pin.
    pub fn dispose(&mut self, tensor: &Tensor) -> Result<()> {
        self.kept.remove(&tensor.sid);
        self.backend.free(tensor.sid)
    }

    /// Drops every storage entry and all lifetime bookkeeping.
    pub fn dispose_all(&mut self) {
        self.backend.dispose_all();
        self.frames = vec![Frame::new(false)];
        self.variables.clear();
        self.kept.clear();
    }
}
