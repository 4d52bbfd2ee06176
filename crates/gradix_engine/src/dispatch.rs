use crate::{
    tape::{GradFn, TapeEntry},
    tensor::Tensor,
    Engine,
};
use gradix_core::{
    backend::KernelInput,
    error::Result,
    kernel::Kernel,
    layout::Layout,
};
use std::sync::Arc;

/// One tensor argument to a dispatch: the handle plus the view the
/// kernel reads it through (a zero-strided broadcast view, usually just
/// the tensor's own layout).
pub(crate) struct Arg<'a> {
    pub role: &'static str,
    pub tensor: &'a Tensor,
    pub view: Layout,
}

impl<'a> Arg<'a> {
    pub fn new(role: &'static str, tensor: &'a Tensor) -> Self {
        Self {
            role,
            tensor,
            view: tensor.layout.clone(),
        }
    }

    pub fn viewed(role: &'static str, tensor: &'a Tensor, view: Layout) -> Self {
        Self { role, tensor, view }
    }
}

impl Engine {
    /// The single choke point every operation goes through: validate,
    /// allocate, execute, track lifetime, record on the tape. A dispatch
    /// either completes fully or leaves no trace: on kernel failure the
    /// output storage is freed and nothing is recorded.
    pub(crate) fn dispatch(
        &mut self,
        kernel: Kernel,
        args: &[Arg<'_>],
        grad_fn: Option<GradFn>,
    ) -> Result<Tensor> {
        let specs: Vec<_> = args.iter().map(|arg| (&arg.view, arg.tensor.dtype)).collect();
        let (out_layout, out_dtype) = kernel.output_spec(&specs)?;

        let out_sid = self.backend.alloc(out_layout.size(), out_dtype)?;
        let inputs: Vec<KernelInput<'_>> = args
            .iter()
            .map(|arg| KernelInput {
                role: arg.role,
                sid: arg.tensor.sid,
                layout: &arg.view,
                dtype: arg.tensor.dtype,
            })
            .collect();

        if let Err(err) = self
            .backend
            .execute(&kernel, &inputs, out_sid, &out_layout, out_dtype)
        {
            let _ = self.backend.free(out_sid);
            return Err(err);
        }

        let tensor = Tensor::new(out_sid, out_layout, out_dtype);
        self.track(out_sid);

        if let Some(grad_fn) = grad_fn {
            let entry = Arc::new(TapeEntry {
                output: tensor.clone(),
                inputs: args.iter().map(|arg| arg.tensor.clone()).collect(),
                grad_fn,
            });
            for frame in self.frames.iter_mut().filter(|frame| frame.recording) {
                frame.tape.push(entry.clone());
            }
        }

        Ok(tensor)
    }
}
