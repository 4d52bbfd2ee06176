use crate::{tape::TapeEntry, tensor::Tensor, Engine};
use gradix_core::{
    backend::StorageId,
    error::{Error, Result},
};
use std::collections::HashMap;
use std::sync::Arc;

impl Engine {
    /// Gradients of the scalar produced by `f` with respect to each
    /// target, in target order. Every intermediate of both the forward
    /// pass and the replay is freed before this returns; only the
    /// gradients escape.
    pub fn gradients<F>(&mut self, f: F, targets: &[&Tensor]) -> Result<Vec<Tensor>>
    where
        F: FnOnce(&mut Engine) -> Result<Tensor>,
    {
        self.push_frame(true);
        let result = self
            .run_backward(f, targets, None)
            .map(|(_, grads)| grads);
        self.pop_frame(result)
    }

    /// Like [`Engine::gradients`], but also returns the forward value.
    pub fn value_and_gradients<F>(
        &mut self,
        f: F,
        targets: &[&Tensor],
    ) -> Result<(Tensor, Vec<Tensor>)>
    where
        F: FnOnce(&mut Engine) -> Result<Tensor>,
    {
        self.push_frame(true);
        let result = self.run_backward(f, targets, None);
        self.pop_frame(result)
    }

    /// Vector-Jacobian product: like [`Engine::gradients`] except `f` may
    /// produce a tensor of any shape, and the backward pass is seeded
    /// with `seed` instead of 1. `seed` must match the output's shape.
    pub fn vjp<F>(&mut self, f: F, targets: &[&Tensor], seed: &Tensor) -> Result<Vec<Tensor>>
    where
        F: FnOnce(&mut Engine) -> Result<Tensor>,
    {
        self.push_frame(true);
        let seed = seed.clone();
        let result = self
            .run_backward(f, targets, Some(seed))
            .map(|(_, grads)| grads);
        self.pop_frame(result)
    }

    /// Gradients of the scalar produced by `f` with respect to every
    /// registered variable, keyed by variable name.
    pub fn variable_gradients<F>(&mut self, f: F) -> Result<(Tensor, HashMap<String, Tensor>)>
    where
        F: FnOnce(&mut Engine) -> Result<Tensor>,
    {
        let variables = self.variables.clone();
        let snapshot: Vec<(String, Tensor)> = variables
            .iter()
            .map(|var| Ok((var.name().to_string(), var.value()?)))
            .collect::<Result<_>>()?;

        self.push_frame(true);
        let result = (|| {
            let targets: Vec<&Tensor> = snapshot.iter().map(|(_, t)| t).collect();
            let (value, grads) = self.run_backward(f, &targets, None)?;
            let named = snapshot
                .iter()
                .map(|(name, _)| name.clone())
                .zip(grads)
                .collect();
            Ok((value, named))
        })();
        self.pop_frame(result)
    }

    /// Forward pass, seed, reverse replay, gradient collection. Runs
    /// inside an already-pushed recording frame.
    fn run_backward<F>(
        &mut self,
        f: F,
        targets: &[&Tensor],
        seed: Option<Tensor>,
    ) -> Result<(Tensor, Vec<Tensor>)>
    where
        F: FnOnce(&mut Engine) -> Result<Tensor>,
    {
        let y = f(self)?;

        let seed = match seed {
            Some(seed) => {
                if seed.shape() != y.shape() {
                    return Err(Error::ShapeMismatch {
                        op: "vjp",
                        lhs: y.shape().to_vec(),
                        rhs: seed.shape().to_vec(),
                    });
                }
                seed
            }
            None => {
                // Differentiation is defined for scalar-valued floats
                // only; anything else needs an explicit seed via `vjp`.
                if !y.is_scalar() || !y.dtype().is_float() {
                    return Err(Error::InvalidGradientTarget {
                        shape: y.shape().to_vec(),
                    });
                }
                self.ones_like(&y)?
            }
        };

        let accum = self.replay(seed, &y)?;

        let mut grads = Vec::with_capacity(targets.len());
        for target in targets {
            match accum.get(&target.sid) {
                Some(grad) => grads.push(grad.clone()),
                None => {
                    return Err(Error::MissingGradient {
                        target: format!(
                            "tensor #{} of shape {:?}",
                            target.id().as_usize(),
                            target.shape()
                        ),
                    })
                }
            }
        }
        Ok((y, grads))
    }

    /// Walks the innermost recording tape strictly backwards, summing
    /// gradient contributions per storage id. Entries whose output never
    /// received a gradient are dead branches and are skipped.
    fn replay(&mut self, seed: Tensor, y: &Tensor) -> Result<HashMap<StorageId, Tensor>> {
        // Taking the tape out lets replay dispatch freely; anything the
        // replay itself records lands on the frame's fresh tape (and on
        // any enclosing recording frame, which is what makes gradients
        // of gradients work).
        let tape: Vec<Arc<TapeEntry>> = match self.frames.last_mut() {
            Some(frame) => std::mem::take(&mut frame.tape),
            None => Vec::new(),
        };

        let mut accum: HashMap<StorageId, Tensor> = HashMap::new();
        accum.insert(y.sid, seed);

        for entry in tape.iter().rev() {
            let dy = match accum.get(&entry.output.sid) {
                Some(dy) => dy.clone(),
                None => continue,
            };
            let contributions = (entry.grad_fn)(self, &dy, &entry.output)?;
            for (input, contribution) in entry.inputs.iter().zip(contributions) {
                let Some(contribution) = contribution else {
                    continue;
                };
                // Fan-out: a tensor consumed twice gets the sum of both
                // contributions, never the last one.
                let total = match accum.remove(&input.sid) {
                    Some(existing) => self.add(&existing, &contribution)?,
                    None => contribution,
                };
                accum.insert(input.sid, total);
            }
        }
        Ok(accum)
    }
}
