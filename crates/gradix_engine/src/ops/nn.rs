use crate::{tensor::Tensor, Engine};
use gradix_core::error::{Error, Result};

/// One recurrent cell: `(engine, data, c, h) -> (new_c, new_h)`.
pub type LstmCellFn<'a> =
    dyn Fn(&mut Engine, &Tensor, &Tensor, &Tensor) -> Result<(Tensor, Tensor)> + 'a;

impl Engine {
    /// Numerically stable softmax along the last axis, composed from
    /// primitive dispatches so the gradient falls out of the tape.
    pub fn softmax(&mut self, x: &Tensor) -> Result<Tensor> {
        if x.ndim() == 0 {
            return Err(Error::InvalidShape {
                message: "softmax needs at least one axis".into(),
            });
        }
        let last = x.ndim() - 1;
        let peak = self.max_axes(x, &[last], true)?;
        let shifted = self.sub(x, &peak)?;
        let exps = self.exp(&shifted)?;
        let total = self.sum_axes(&exps, &[last], true)?;
        self.div(&exps, &total)
    }

    /// `(x - mean) / sqrt(variance + epsilon) * scale + offset`, with the
    /// moments broadcast against `x`.
    pub fn batch_norm(
        &mut self,
        x: &Tensor,
        mean: &Tensor,
        variance: &Tensor,
        scale: Option<&Tensor>,
        offset: Option<&Tensor>,
        epsilon: f32,
    ) -> Result<Tensor> {
        let centered = self.sub(x, mean)?;
        let eps = self.scalar(epsilon)?;
        let padded_var = self.add(variance, &eps)?;
        let denom = self.sqrt(&padded_var)?;
        let mut out = self.div(&centered, &denom)?;
        if let Some(scale) = scale {
            out = self.mul(&out, scale)?;
        }
        if let Some(offset) = offset {
            out = self.add(&out, offset)?;
        }
        Ok(out)
    }

    /// One step of a basic LSTM cell. `lstm_kernel` is
    /// `[input + hidden, 4 * hidden]` with gates ordered i, j, f, o;
    /// `lstm_bias` is `[4 * hidden]`.
    pub fn basic_lstm_cell(
        &mut self,
        forget_bias: f32,
        lstm_kernel: &Tensor,
        lstm_bias: &Tensor,
        data: &Tensor,
        c: &Tensor,
        h: &Tensor,
    ) -> Result<(Tensor, Tensor)> {
        let combined = self.concat(data, h, 1)?;
        let weighted = self.matmul(&combined, lstm_kernel)?;
        let res = self.add(&weighted, lstm_bias)?;

        let batch = res.shape()[0];
        let width = res.shape()[1];
        if width % 4 != 0 {
            return Err(Error::InvalidShape {
                message: format!("lstm activations of width {width} do not split into 4 gates"),
            });
        }
        let hidden = width / 4;
        let gate = |d: usize| ([0, d * hidden], [batch, hidden]);

        let (begin, size) = gate(0);
        let i = self.slice(&res, &begin, &size)?;
        let (begin, size) = gate(1);
        let j = self.slice(&res, &begin, &size)?;
        let (begin, size) = gate(2);
        let f = self.slice(&res, &begin, &size)?;
        let (begin, size) = gate(3);
        let o = self.slice(&res, &begin, &size)?;

        let forget = self.scalar(forget_bias)?;
        let f_biased = self.add(&f, &forget)?;
        let keep_gate = self.sigmoid(&f_biased)?;
        let retained = self.mul(c, &keep_gate)?;
        let write_gate = self.sigmoid(&i)?;
        let candidate = self.tanh(&j)?;
        let written = self.mul(&write_gate, &candidate)?;
        let new_c = self.add(&retained, &written)?;

        let read_gate = self.sigmoid(&o)?;
        let c_out = self.tanh(&new_c)?;
        let new_h = self.mul(&read_gate, &c_out)?;
        Ok((new_c, new_h))
    }

    /// Feeds `data` through a stack of recurrent cells, each cell's
    /// hidden state becoming the next cell's input. Returns the new cell
    /// and hidden states, layer by layer.
    pub fn multi_rnn_cell(
        &mut self,
        cells: &[&LstmCellFn<'_>],
        data: &Tensor,
        c: &[Tensor],
        h: &[Tensor],
    ) -> Result<(Vec<Tensor>, Vec<Tensor>)> {
        if cells.len() != c.len() || cells.len() != h.len() {
            return Err(Error::InvalidArgument(format!(
                "{} cells with {} cell states and {} hidden states",
                cells.len(),
                c.len(),
                h.len()
            )));
        }
        let mut input = data.clone();
        let mut new_c = Vec::with_capacity(cells.len());
        let mut new_h = Vec::with_capacity(cells.len());
        for (layer, cell) in cells.iter().enumerate() {
            let (ci, hi) = cell(self, &input, &c[layer], &h[layer])?;
            input = hi.clone();
            new_c.push(ci);
            new_h.push(hi);
        }
        Ok((new_c, new_h))
    }
}
