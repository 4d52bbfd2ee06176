use crate::{tensor::Tensor, Engine};
use gradix_core::error::{Error, Result};
use std::sync::{Arc, Mutex};

/// A named, reassignable tensor slot. Variables survive scope exits and
/// are the default differentiation targets of
/// [`Engine::variable_gradients`].
#[derive(Clone)]
pub struct Variable {
    name: String,
    value: Arc<Mutex<Tensor>>,
}

impl Variable {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Snapshot of the current tensor behind this variable.
    pub fn value(&self) -> Result<Tensor> {
        self.value
            .lock()
            .map(|guard| guard.clone())
            .map_err(|_| Error::Internal {
                message: "variable mutex poisoned".into(),
            })
    }

    pub(crate) fn storage_id(&self) -> Option<gradix_core::backend::StorageId> {
        self.value.lock().ok().map(|guard| guard.sid)
    }
}

impl Engine {
    /// Registers `init` as a named variable. Its storage is exempt from
    /// scope disposal until the variable is reassigned or the engine is
    /// torn down.
    pub fn variable(&mut self, name: &str, init: Tensor) -> Result<Variable> {
        if self.variables.iter().any(|var| var.name == name) {
            return Err(Error::InvalidArgument(format!(
                "variable {name:?} already registered"
            )));
        }
        let variable = Variable {
            name: name.to_string(),
            value: Arc::new(Mutex::new(init)),
        };
        self.variables.push(variable.clone());
        Ok(variable)
    }

    pub fn variables(&self) -> &[Variable] {
        &self.variables
    }

    /// Swaps in a new value and frees the old storage, unless the new
    /// value shares it.
    pub fn assign(&mut self, variable: &Variable, value: Tensor) -> Result<()> {
        if value.dtype != variable.value()?.dtype {
            return Err(Error::DTypeMismatch {
                expected: variable.value()?.dtype,
                got: value.dtype,
            });
        }
        let mut guard = variable.value.lock().map_err(|_| Error::Internal {
            message: "variable mutex poisoned".into(),
        })?;
        let new_sid = value.sid;
        let old = std::mem::replace(&mut *guard, value);
        drop(guard);
        if old.sid != new_sid {
            let _ = self.backend.free(old.sid);
        }
        Ok(())
    }

    /// Storage ids currently pinned by variables.
    pub(crate) fn variable_storage(&self) -> Vec<gradix_core::backend::StorageId> {
        self.variables
            .iter()
            .filter_map(|var| var.storage_id())
            .collect()
    }
}
