use gradix_core::{
    buffer::HostBuffer,
    dtype::DType,
    error::{Error, Result},
};
use std::sync::{Condvar, Mutex};

enum State {
    /// A queued write or launch will fill this cell.
    Pending,
    Ready(HostBuffer),
    /// A kernel failed after validation; the message is kept so every
    /// later reader sees the original failure.
    Failed(String),
}

/// One storage slot. The element count and dtype are fixed at allocation
/// so writes can be validated without waiting on the worker.
pub(crate) struct Cell {
    len: usize,
    dtype: DType,
    state: Mutex<State>,
    cond: Condvar,
}

impl Cell {
    pub fn ready(len: usize, dtype: DType, data: HostBuffer) -> Self {
        Self {
            len,
            dtype,
            state: Mutex::new(State::Ready(data)),
            cond: Condvar::new(),
        }
    }

    pub fn pending(len: usize, dtype: DType) -> Self {
        Self {
            len,
            dtype,
            state: Mutex::new(State::Pending),
            cond: Condvar::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn dtype(&self) -> DType {
        self.dtype
    }

    pub fn mark_pending(&self) {
        if let Ok(mut state) = self.state.lock() {
            *state = State::Pending;
        }
    }

    /// Worker side: publish the result and wake blocked readers.
    pub fn fulfill(&self, result: Result<HostBuffer>) {
        if let Ok(mut state) = self.state.lock() {
            *state = match result {
                Ok(data) => State::Ready(data),
                Err(err) => State::Failed(err.to_string()),
            };
        }
        self.cond.notify_all();
    }

    /// Blocks until the cell is filled, then clones the contents out.
    pub fn wait(&self) -> Result<HostBuffer> {
        let mut state = self.state.lock().map_err(|_| Error::Internal {
            message: "storage cell mutex poisoned".into(),
        })?;
        loop {
            match &*state {
                State::Ready(data) => return Ok(data.clone()),
                State::Failed(message) => {
                    return Err(Error::Internal {
                        message: message.clone(),
                    })
                }
                State::Pending => {
                    state = self.cond.wait(state).map_err(|_| Error::Internal {
                        message: "storage cell mutex poisoned".into(),
                    })?;
                }
            }
        }
    }
}
