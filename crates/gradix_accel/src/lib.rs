//! Accelerated backend. Commands are queued to a dedicated worker thread
//! in issue order, which preserves causality between writes, kernel
//! launches and readbacks; the kernels themselves run data-parallel on
//! the rayon pool. The calling thread never blocks on compute, only a
//! readback can suspend.

mod cell;
mod kernels;
mod worker;

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
use std::sync::{
    mpsc::{self, Sender},
    Arc, Mutex,
};
use std::thread::JoinHandle;

pub(crate) use cell::Cell;

pub(crate) struct ExecInput {
    pub cell: Arc<Cell>,
    pub layout: Layout,
}

pub(crate) enum Command {
    Write {
        cell: Arc<Cell>,
        data: HostBuffer,
    },
    Execute {
        kernel: Kernel,
        inputs: Vec<ExecInput>,
        out: Arc<Cell>,
        out_layout: Layout,
        out_dtype: DType,
    },
    Readback {
        cell: Arc<Cell>,
        handle: gradix_core::readback::ReadbackHandle,
    },
    Shutdown,
}

pub struct AccelBackend {
    cells: DashMap<StorageId, Arc<Cell>>,
    queue: Mutex<Sender<Command>>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl AccelBackend {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::channel();
        let handle = std::thread::Builder::new()
            .name("gradix-accel-worker".into())
            .spawn(move || worker::run(rx))
            .ok();
        Self {
            cells: DashMap::new(),
            queue: Mutex::new(tx),
            worker: Mutex::new(handle),
        }
    }

    fn cell(&self, sid: StorageId) -> Result<Arc<Cell>> {
        self.cells
            .get(&sid)
            .map(|entry| entry.value().clone())
            .ok_or(Error::StorageNotFound)
    }

    fn send(&self, command: Command) -> Result<()> {
        let queue = self.queue.lock().map_err(|_| Error::Internal {
            message: "accel queue mutex poisoned".into(),
        })?;
        queue.send(command).map_err(|_| Error::Disconnected)
    }
}

impl Default for AccelBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl Backend for AccelBackend {
    fn device(&self) -> Device {
        Device::Accel
    }

    fn alloc(&self, count: usize, dtype: DType) -> Result<StorageId> {
        reserve_check(count, dtype)?;
        let sid = next_storage_id();
        let cell = Arc::new(Cell::ready(count, dtype, HostBuffer::zeros(count, dtype)));
        self.cells.insert(sid, cell);
        Ok(sid)
    }

    fn write(&self, sid: StorageId, data: HostBuffer) -> Result<()> {
        let cell = self.cell(sid)?;
        if cell.dtype() != data.dtype() {
            return Err(Error::DTypeMismatch {
                expected: cell.dtype(),
                got: data.dtype(),
            });
        }
        if cell.len() != data.len() {
            return Err(Error::InvalidArgument(format!(
                "write of {} elements into storage of {}",
                data.len(),
                cell.len()
            )));
        }
        // A fresh cell replaces the table entry: commands queued before
        // this write keep the old cell and read the value they were
        // issued against, while anything issued after sees the new cell
        // and blocks until the worker lands the write. Repointing
        // instead of mutating in place is what keeps the single worker
        // deadlock-free.
        let fresh = Arc::new(Cell::pending(cell.len(), cell.dtype()));
        self.cells.insert(sid, fresh.clone());
        self.send(Command::Write { cell: fresh, data })
    }

    fn execute(
        &self,
        kernel: &Kernel,
        inputs: &[KernelInput<'_>],
        out: StorageId,
        out_layout: &Layout,
        out_dtype: DType,
    ) -> Result<()> {
        // Cells are captured here so a `free` racing the queue cannot
        // pull storage out from under an in-flight launch.
        let mut exec_inputs = Vec::with_capacity(inputs.len());
        for input in inputs {
            exec_inputs.push(ExecInput {
                cell: self.cell(input.sid)?,
                layout: input.layout.clone(),
            });
        }
        let out_cell = self.cell(out)?;
        out_cell.mark_pending();
        self.send(Command::Execute {
            kernel: kernel.clone(),
            inputs: exec_inputs,
            out: out_cell,
            out_layout: out_layout.clone(),
            out_dtype,
        })
    }

    fn read_sync(&self, sid: StorageId) -> Result<HostBuffer> {
        self.cell(sid)?.wait()
    }

    fn read_async(&self, sid: StorageId) -> Readback {
        match self.cell(sid) {
            Ok(cell) => {
                let (readback, handle) = Readback::pending();
                // A failed send drops the handle, which resolves the
                // readback with `Disconnected`.
                let _ = self.send(Command::Readback { cell, handle });
                readback
            }
            Err(err) => Readback::ready(Err(err)),
        }
    }

    fn free(&self, sid: StorageId) -> Result<()> {
        self.cells
            .remove(&sid)
            .map(|_| ())
            .ok_or(Error::StorageNotFound)
    }

    fn storage_count(&self) -> usize {
        self.cells.len()
    }

    fn dispose_all(&self) {
        self.cells.clear();
    }
}

impl Drop for AccelBackend {
    fn drop(&mut self) {
        let _ = self.send(Command::Shutdown);
        if let Ok(mut guard) = self.worker.lock() {
            if let Some(handle) = guard.take() {
                let _ = handle.join();
            }
        }
    }
}
