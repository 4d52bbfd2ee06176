//! Reference backend. Executes every kernel immediately on the calling
//! thread with straightforward value-by-value loops; serves as the
//! correctness oracle for the accelerated backend.

mod kernels;

use dashmap::DashMap;
use gradix_core::{
    backend::{next_storage_id, reserve_check, Backend, KernelInput, StorageId},
    buffer::HostBuffer,
    device::Device,
    dtype::DType,
    error::{Error, Result},
    kernel::Kernel,
    layout::Layout,
    readback::Readback,
};

#[derive(Default)]
pub struct CpuBackend {
    storages: DashMap<StorageId, HostBuffer>,
}

impl CpuBackend {
    pub fn new() -> Self {
        Self::default()
    }

    fn fetch(&self, sid: StorageId) -> Result<HostBuffer> {
        self.storages
            .get(&sid)
            .map(|entry| entry.value().clone())
            .ok_or(Error::StorageNotFound)
    }
}

impl Backend for CpuBackend {
    fn device(&self) -> Device {
        Device::CPU
    }

    fn alloc(&self, count: usize, dtype: DType) -> Result<StorageId> {
        reserve_check(count, dtype)?;
        let sid = next_storage_id();
        self.storages.insert(sid, HostBuffer::zeros(count, dtype));
        Ok(sid)
    }

    fn write(&self, sid: StorageId, data: HostBuffer) -> Result<()> {
        match self.storages.get_mut(&sid) {
            Some(mut entry) => {
                if entry.len() != data.len() {
                    return Err(Error::InvalidArgument(format!(
                        "write of {} elements into storage of {}",
                        data.len(),
                        entry.len()
                    )));
                }
                *entry.value_mut() = data;
                Ok(())
            }
            None => Err(Error::StorageNotFound),
        }
    }

    fn execute(
        &self,
        kernel: &Kernel,
        inputs: &[KernelInput<'_>],
        out: StorageId,
        out_layout: &Layout,
        out_dtype: DType,
    ) -> Result<()> {
        // Clones keep the shard locks out of kernel execution.
        let mut buffers = Vec::with_capacity(inputs.len());
        for input in inputs {
            buffers.push(self.fetch(input.sid)?);
        }

        let result = kernels::run(kernel, inputs, &buffers, out_layout, out_dtype)?;
        self.storages.insert(out, result);
        Ok(())
    }

    fn read_sync(&self, sid: StorageId) -> Result<HostBuffer> {
        self.fetch(sid)
    }

    fn read_async(&self, sid: StorageId) -> Readback {
        Readback::ready(self.fetch(sid))
    }

    fn free(&self, sid: StorageId) -> Result<()> {
        self.storages
            .remove(&sid)
            .map(|_| ())
            .ok_or(Error::StorageNotFound)
    }

    fn storage_count(&self) -> usize {
        self.storages.len()
    }

    fn dispose_all(&self) {
        self.storages.clear();
    }
}
