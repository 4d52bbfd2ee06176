use gradix_core::{backend::StorageId, dtype::DType, layout::Layout};
use std::sync::atomic::{AtomicUsize, Ordering};

/// Identity of a tensor handle, distinct from the storage it points at:
/// two handles can share storage (a clone), but no two dispatches ever
/// produce the same id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TensorId(usize);

static TENSOR_COUNTER: AtomicUsize = AtomicUsize::new(1);

pub(crate) fn next_tensor_id() -> TensorId {
    TensorId(TENSOR_COUNTER.fetch_add(1, Ordering::SeqCst))
}

impl TensorId {
    pub fn as_usize(&self) -> usize {
        self.0
    }
}

/// A lightweight handle: shape, dtype and an opaque pointer into backend
/// storage. All data access goes through the engine that produced it.
#[derive(Debug, Clone)]
pub struct Tensor {
    pub(crate) id: TensorId,
    pub(crate) sid: StorageId,
    pub(crate) layout: Layout,
    pub(crate) dtype: DType,
}

impl Tensor {
    pub(crate) fn new(sid: StorageId, layout: Layout, dtype: DType) -> Self {
        Self {
            id: next_tensor_id(),
            sid,
            layout,
            dtype,
        }
    }

    pub fn id(&self) -> TensorId {
        self.id
    }

    pub fn storage_id(&self) -> StorageId {
        self.sid
    }

    pub fn shape(&self) -> &[usize] {
        self.layout.shape()
    }

    pub fn ndim(&self) -> usize {
        self.layout.ndim()
    }

    pub fn size(&self) -> usize {
        self.layout.size()
    }

    pub fn dtype(&self) -> DType {
        self.dtype
    }

    /// True for rank-0 tensors only; a `[1]`-shaped tensor is not a
    /// scalar.
    pub fn is_scalar(&self) -> bool {
        self.layout.ndim() == 0
    }
}
