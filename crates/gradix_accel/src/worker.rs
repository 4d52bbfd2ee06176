use crate::{kernels, Command, ExecInput};
use gradix_core::{
    buffer::HostBuffer,
    dtype::DType,
    error::Result,
    kernel::Kernel,
    layout::Layout,
};
use std::sync::mpsc::Receiver;

/// Drains the command queue in issue order. Every mutation of a storage
/// cell flows through here, so by the time a launch is processed all of
/// its inputs are already resolved.
pub(crate) fn run(queue: Receiver<Command>) {
    while let Ok(command) = queue.recv() {
        match command {
            Command::Write { cell, data } => cell.fulfill(Ok(data)),
            Command::Execute {
                kernel,
                inputs,
                out,
                out_layout,
                out_dtype,
            } => {
                let result = launch(&kernel, &inputs, &out_layout, out_dtype);
                out.fulfill(result);
            }
            Command::Readback { cell, handle } => handle.complete(cell.wait()),
            Command::Shutdown => break,
        }
    }
}

fn launch(
    kernel: &Kernel,
    inputs: &[ExecInput],
    out_layout: &Layout,
    out_dtype: DType,
) -> Result<HostBuffer> {
    let mut buffers = Vec::with_capacity(inputs.len());
    for input in inputs {
        buffers.push(input.cell.wait()?);
    }
    let views: Vec<(&HostBuffer, &Layout)> = buffers
        .iter()
        .zip(inputs)
        .map(|(buffer, input)| (buffer, &input.layout))
        .collect();
    kernels::run(kernel, &views, out_layout, out_dtype)
}
