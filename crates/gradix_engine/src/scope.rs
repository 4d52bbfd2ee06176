use crate::{tape::TapeEntry, tensor::Tensor, Engine};
use gradix_core::{backend::StorageId, error::Result};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// One level of the tensor-lifetime stack. The bottom frame is never
/// popped; everything allocated outside an explicit scope lives there
/// until `dispose` or `dispose_all`.
pub(crate) struct Frame {
    pub recording: bool,
    pub created: Vec<StorageId>,
    pub tape: Vec<Arc<TapeEntry>>,
}

impl Frame {
    pub fn new(recording: bool) -> Self {
        Self {
            recording,
            created: Vec::new(),
            tape: Vec::new(),
        }
    }
}

/// Values a scope closure may return. Storage reachable from the result
/// escapes the scope instead of being freed with it.
pub trait ScopeResult {
    fn storage_ids(&self, out: &mut Vec<StorageId>);
}

impl ScopeResult for () {
    fn storage_ids(&self, _out: &mut Vec<StorageId>) {}
}

impl ScopeResult for Tensor {
    fn storage_ids(&self, out: &mut Vec<StorageId>) {
        out.push(self.sid);
    }
}

impl<T: ScopeResult> ScopeResult for Option<T> {
    fn storage_ids(&self, out: &mut Vec<StorageId>) {
        if let Some(value) = self {
            value.storage_ids(out);
        }
    }
}

impl<T: ScopeResult> ScopeResult for Vec<T> {
    fn storage_ids(&self, out: &mut Vec<StorageId>) {
        for value in self {
            value.storage_ids(out);
        }
    }
}

impl<A: ScopeResult, B: ScopeResult> ScopeResult for (A, B) {
    fn storage_ids(&self, out: &mut Vec<StorageId>) {
        self.0.storage_ids(out);
        self.1.storage_ids(out);
    }
}

impl<A: ScopeResult, B: ScopeResult, C: ScopeResult> ScopeResult for (A, B, C) {
    fn storage_ids(&self, out: &mut Vec<StorageId>) {
        self.0.storage_ids(out);
        self.1.storage_ids(out);
        self.2.storage_ids(out);
    }
}

impl<T: ScopeResult> ScopeResult for HashMap<String, T> {
    fn storage_ids(&self, out: &mut Vec<StorageId>) {
        for value in self.values() {
            value.storage_ids(out);
        }
    }
}

impl Engine {
    /// Runs `f` inside a fresh lifetime scope. Every tensor created by
    /// the closure is freed when it returns, except tensors reachable
    /// from the result and tensors pinned with [`Engine::keep`].
    pub fn scope<R, F>(&mut self, f: F) -> Result<R>
    where
        R: ScopeResult,
        F: FnOnce(&mut Engine) -> Result<R>,
    {
        self.push_frame(false);
        let result = f(self);
        self.pop_frame(result)
    }

    /// Pins a tensor so no scope frees it on exit, however deeply
    /// nested. The pin holds until [`Engine::dispose`] or
    /// [`Engine::dispose_all`].
    pub fn keep(&mut self, tensor: &Tensor) {
        self.kept.insert(tensor.sid);
    }

    pub(crate) fn push_frame(&mut self, recording: bool) {
        self.frames.push(Frame::new(recording));
    }

    pub(crate) fn pop_frame<R: ScopeResult>(&mut self, result: Result<R>) -> Result<R> {
        // The bottom frame is not poppable; scopes are strictly nested
        // above it.
        if self.frames.len() < 2 {
            return result;
        }
        let frame = match self.frames.pop() {
            Some(frame) => frame,
            None => return result,
        };
        let mut escaping = Vec::new();
        if let Ok(value) = &result {
            value.storage_ids(&mut escaping);
        }
        self.release_frame(frame, &escaping);
        result
    }

    /// Frees the frame's allocations, minus storage that escapes: the
    /// result, pinned tensors, and storage an enclosing recording frame
    /// still references from its tape (it will be read again at replay).
    fn release_frame(&mut self, frame: Frame, escaping: &[StorageId]) {
        let mut survivors: HashSet<StorageId> = escaping.iter().copied().collect();
        survivors.extend(self.kept.iter().copied());
        survivors.extend(self.variable_storage());
        for open in &self.frames {
            for entry in &open.tape {
                survivors.insert(entry.output.sid);
                for input in &entry.inputs {
                    survivors.insert(input.sid);
                }
            }
        }

        for sid in frame.created {
            if survivors.contains(&sid) {
                if let Some(parent) = self.frames.last_mut() {
                    parent.created.push(sid);
                }
            } else {
                // May have been disposed explicitly already.
                let _ = self.backend.free(sid);
            }
        }
    }

    /// Records a freshly allocated storage id in the innermost frame.
    pub(crate) fn track(&mut self, sid: StorageId) {
        if let Some(frame) = self.frames.last_mut() {
            frame.created.push(sid);
        }
    }
}
