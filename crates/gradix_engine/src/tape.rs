use crate::{tensor::Tensor, Engine};
use gradix_core::error::Result;
use std::sync::Arc;

/// Produces the gradient contribution for each input of a recorded
/// dispatch, given the gradient flowing into the output (`dy`) and the
/// output itself (`y`). Entries are aligned with [`TapeEntry::inputs`];
/// `None` marks an input gradients do not flow through, such as a
/// selection mask.
pub(crate) type GradFn =
    Arc<dyn Fn(&mut Engine, &Tensor, &Tensor) -> Result<Vec<Option<Tensor>>> + Send + Sync>;

/// One recorded dispatch. Entries are append-only and shared by every
/// recording frame that was open at dispatch time, so a nested gradient
/// computation can itself be differentiated.
pub(crate) struct TapeEntry {
    pub output: Tensor,
    pub inputs: Vec<Tensor>,
    pub grad_fn: GradFn,
}
