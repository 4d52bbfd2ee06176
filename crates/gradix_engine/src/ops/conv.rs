use crate::{dispatch::Arg, tensor::Tensor, Engine};
use gradix_core::{
    error::Result,
    kernel::{Conv2dParams, Kernel, PoolParams},
};
use std::sync::Arc;

impl Engine {
    /// NHWC convolution with `[fh, fw, in_c, out_c]` filters. Gradients
    /// run through the dedicated backprop kernels rather than a composed
    /// graph, so both passes stay in backend code.
    pub fn conv2d(
        &mut self,
        x: &Tensor,
        filter: &Tensor,
        stride: (usize, usize),
        padding: (usize, usize),
    ) -> Result<Tensor> {
        let params = Conv2dParams { stride, padding };
        let (xc, fc) = (x.clone(), filter.clone());
        let x_shape = x.shape().to_vec();
        let f_shape = filter.shape().to_vec();
        self.dispatch(
            Kernel::Conv2d(params),
            &[Arg::new("x", x), Arg::new("filter", filter)],
            Some(Arc::new(move |eng: &mut Engine, dy: &Tensor, _y: &Tensor| {
                let dx = eng.dispatch(
                    Kernel::Conv2dBackpropInput {
                        input_shape: x_shape.clone(),
                        params,
                    },
                    &[Arg::new("dy", dy), Arg::new("filter", &fc)],
                    None,
                )?;
                let df = eng.dispatch(
                    Kernel::Conv2dBackpropFilter {
                        filter_shape: f_shape.clone(),
                        params,
                    },
                    &[Arg::new("x", &xc), Arg::new("dy", dy)],
                    None,
                )?;
                Ok(vec![Some(dx), Some(df)])
            })),
        )
    }

    /// Max pooling; the gradient routes each `dy` element to the first
    /// position that attained its window's maximum.
    pub fn max_pool(
        &mut self,
        x: &Tensor,
        window: (usize, usize),
        stride: (usize, usize),
        padding: (usize, usize),
    ) -> Result<Tensor> {
        let params = PoolParams {
            window,
            stride,
            padding,
        };
        let xc = x.clone();
        self.dispatch(
            Kernel::MaxPool(params),
            &[Arg::new("x", x)],
            Some(Arc::new(move |eng: &mut Engine, dy: &Tensor, _y: &Tensor| {
                let dx = eng.dispatch(
                    Kernel::MaxPoolBackprop(params),
                    &[Arg::new("dy", dy), Arg::new("x", &xc)],
                    None,
                )?;
                Ok(vec![Some(dx)])
            })),
        )
    }

    /// Average pooling with a constant window-area divisor, padding
    /// included.
    pub fn avg_pool(
        &mut self,
        x: &Tensor,
        window: (usize, usize),
        stride: (usize, usize),
        padding: (usize, usize),
    ) -> Result<Tensor> {
        let params = PoolParams {
            window,
            stride,
            padding,
        };
        let x_shape = x.shape().to_vec();
        self.dispatch(
            Kernel::AvgPool(params),
            &[Arg::new("x", x)],
            Some(Arc::new(move |eng: &mut Engine, dy: &Tensor, _y: &Tensor| {
                let dx = eng.dispatch(
                    Kernel::AvgPoolBackprop {
                        input_shape: x_shape.clone(),
                        params,
                    },
                    &[Arg::new("dy", dy)],
                    None,
                )?;
                Ok(vec![Some(dx)])
            })),
        )
    }
}
