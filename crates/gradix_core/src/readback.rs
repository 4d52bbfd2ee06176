use crate::{
    buffer::HostBuffer,
    error::{Error, Result},
};
use std::{
    future::Future,
    pin::Pin,
    sync::{Arc, Condvar, Mutex},
    task::{Context, Poll, Waker},
};

enum Slot {
    Pending,
    Done(Result<HostBuffer>),
    Taken,
}

struct Shared {
    slot: Mutex<(Slot, Option<Waker>)>,
    cond: Condvar,
}

/// A readback in flight: resolves to host-addressable memory once the
/// backend has materialized the storage. Awaitable, or blockable via
/// [`Readback::wait`]. Dispatch never suspends; this is the one point in
/// the system where suspension happens.
pub struct Readback {
    shared: Arc<Shared>,
}

/// Completion side of a pending [`Readback`], held by the backend worker.
pub struct ReadbackHandle {
    shared: Arc<Shared>,
}

impl Readback {
    /// A readback that will be completed later through the returned handle.
    pub fn pending() -> (Readback, ReadbackHandle) {
        let shared = Arc::new(Shared {
            slot: Mutex::new((Slot::Pending, None)),
            cond: Condvar::new(),
        });
        (
            Readback {
                shared: shared.clone(),
            },
            ReadbackHandle { shared },
        )
    }

    /// An already-resolved readback, used by synchronous backends.
    pub fn ready(result: Result<HostBuffer>) -> Readback {
        let shared = Arc::new(Shared {
            slot: Mutex::new((Slot::Done(result), None)),
            cond: Condvar::new(),
        });
        Readback { shared }
    }

    /// Blocks the calling thread until the value is available.
    pub fn wait(self) -> Result<HostBuffer> {
        let mut guard = self
            .shared
            .slot
            .lock()
            .map_err(|_| Error::Internal {
                message: "readback mutex poisoned".into(),
            })?;
        loop {
            match std::mem::replace(&mut guard.0, Slot::Taken) {
                Slot::Done(result) => return result,
                Slot::Taken => return Err(Error::Internal {
                    message: "readback polled after completion".into(),
                }),
                Slot::Pending => {
                    guard.0 = Slot::Pending;
                    guard = self
                        .shared
                        .cond
                        .wait(guard)
                        .map_err(|_| Error::Internal {
                            message: "readback mutex poisoned".into(),
                        })?;
                }
            }
        }
    }
}

impl Future for Readback {
    type Output = Result<HostBuffer>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let mut guard = match self.shared.slot.lock() {
            Ok(guard) => guard,
            Err(_) => {
                return Poll::Ready(Err(Error::Internal {
                    message: "readback mutex poisoned".into(),
                }))
            }
        };
        match std::mem::replace(&mut guard.0, Slot::Taken) {
            Slot::Done(result) => Poll::Ready(result),
            Slot::Taken => Poll::Ready(Err(Error::Internal {
                message: "readback polled after completion".into(),
            })),
            Slot::Pending => {
                guard.0 = Slot::Pending;
                guard.1 = Some(cx.waker().clone());
                Poll::Pending
            }
        }
    }
}

impl ReadbackHandle {
    /// Publishes the result and wakes any waiter.
    pub fn complete(self, result: Result<HostBuffer>) {
        if let Ok(mut guard) = self.shared.slot.lock() {
            guard.0 = Slot::Done(result);
            if let Some(waker) = guard.1.take() {
                waker.wake();
            }
        }
        self.shared.cond.notify_all();
    }
}

impl Drop for ReadbackHandle {
    fn drop(&mut self) {
        // A handle dropped without completing (worker shutdown) must not
        // leave waiters parked forever.
        if let Ok(mut guard) = self.shared.slot.lock() {
            if matches!(guard.0, Slot::Pending) {
                guard.0 = Slot::Done(Err(Error::Disconnected));
                if let Some(waker) = guard.1.take() {
                    waker.wake();
                }
            }
        }
        self.shared.cond.notify_all();
    }
}
