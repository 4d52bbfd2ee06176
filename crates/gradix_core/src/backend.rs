use crate::{
    buffer::HostBuffer,
    device::Device,
    dtype::DType,
    error::{Error, Result},
    kernel::Kernel,
    layout::Layout,
    readback::Readback,
};
use std::sync::atomic::{AtomicUsize, Ordering};

/// Opaque handle into a backend's storage table. Ids are process-unique
/// across backends so a stale handle can never alias fresh storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StorageId(usize);

static STORAGE_COUNTER: AtomicUsize = AtomicUsize::new(1);

pub fn next_storage_id() -> StorageId {
    StorageId(STORAGE_COUNTER.fetch_add(1, Ordering::SeqCst))
}

/// Rejects reservations whose byte size cannot exist as a single host
/// allocation. Both backends call this before touching memory.
pub fn reserve_check(count: usize, dtype: DType) -> Result<()> {
    match count.checked_mul(dtype.size_in_bytes()) {
        Some(bytes) if bytes <= isize::MAX as usize => Ok(()),
        _ => Err(Error::AllocationFailure { count, dtype }),
    }
}

impl StorageId {
    pub fn as_usize(&self) -> usize {
        self.0
    }
}

/// One tensor argument to a kernel: a role tag for gradient bookkeeping, a
/// storage handle, and the (possibly zero-strided broadcast) view through
/// which the kernel reads it.
#[derive(Debug, Clone, Copy)]
pub struct KernelInput<'a> {
    pub role: &'static str,
    pub sid: StorageId,
    pub layout: &'a Layout,
    pub dtype: DType,
}

/// Uniform execution contract. Two conforming implementations exist: the
/// reference backend (immediate, value-by-value) and the accelerated
/// backend (queued compute with parallel kernels). Both must agree within
/// f32 tolerance for every kernel and shape.
///
/// Storage is owned exclusively by the implementation's table; only the
/// engine's scope manager calls `free`.
pub trait Backend {
    fn device(&self) -> Device;

    /// Reserves zero-initialized storage for `count` elements.
    fn alloc(&self, count: usize, dtype: DType) -> Result<StorageId>;

    /// Copies host data into existing storage.
    fn write(&self, sid: StorageId, data: HostBuffer) -> Result<()>;

    /// Runs one kernel. Inputs were validated against
    /// [`Kernel::output_spec`] before this call; `out` was allocated to the
    /// resulting layout and dtype.
    fn execute(
        &self,
        kernel: &Kernel,
        inputs: &[KernelInput<'_>],
        out: StorageId,
        out_layout: &Layout,
        out_dtype: DType,
    ) -> Result<()>;

    /// Blocking readback into host memory.
    fn read_sync(&self, sid: StorageId) -> Result<HostBuffer>;

    /// Non-blocking readback; the future resolves once every previously
    /// issued write to `sid` has landed.
    fn read_async(&self, sid: StorageId) -> Readback;

    /// Releases one storage entry.
    fn free(&self, sid: StorageId) -> Result<()>;

    /// Number of live storage entries, used by lifetime tests.
    fn storage_count(&self) -> usize;

    /// Bulk teardown: drop every storage entry. The coarse-grained
    /// equivalent of cancellation.
    fn dispose_all(&self);
}
