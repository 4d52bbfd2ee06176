use crate::{tensor::Tensor, Engine};
use gradix_core::{
    buffer::HostBuffer,
    dtype::DType,
    error::{Error, Result},
    layout::Layout,
};
use rand::Rng;
use rand_distr::{Distribution, Normal};

impl Engine {
    /// Uploads host data as a new tensor of the given shape.
    pub fn tensor(&mut self, data: impl Into<HostBuffer>, shape: &[usize]) -> Result<Tensor> {
        let data = data.into();
        let layout = Layout::from_shape(shape);
        if layout.size() != data.len() {
            return Err(Error::InvalidShape {
                message: format!(
                    "{} elements cannot fill shape {:?}",
                    data.len(),
                    shape
                ),
            });
        }
        self.upload(data, layout)
    }

    /// A rank-0 tensor holding one value.
    pub fn scalar(&mut self, value: f32) -> Result<Tensor> {
        self.upload(HostBuffer::F32(vec![value]), Layout::scalar())
    }

    pub fn fill(&mut self, shape: &[usize], value: f32, dtype: DType) -> Result<Tensor> {
        let layout = Layout::from_shape(shape);
        let data = HostBuffer::from_f32_vec(vec![value; layout.size()], dtype);
        self.upload(data, layout)
    }

    pub fn zeros(&mut self, shape: &[usize]) -> Result<Tensor> {
        self.fill(shape, 0.0, DType::F32)
    }

    pub fn ones(&mut self, shape: &[usize]) -> Result<Tensor> {
        self.fill(shape, 1.0, DType::F32)
    }

    pub fn zeros_like(&mut self, tensor: &Tensor) -> Result<Tensor> {
        self.fill(tensor.shape(), 0.0, tensor.dtype)
    }

    pub fn ones_like(&mut self, tensor: &Tensor) -> Result<Tensor> {
        self.fill(tensor.shape(), 1.0, tensor.dtype)
    }

    /// Samples from a normal distribution.
    pub fn randn(&mut self, shape: &[usize], mean: f32, std_dev: f32) -> Result<Tensor> {
        let layout = Layout::from_shape(shape);
        let normal = Normal::new(mean, std_dev)
            .map_err(|err| Error::InvalidArgument(format!("randn: {err}")))?;
        let mut rng = rand::thread_rng();
        let values: Vec<f32> = (0..layout.size()).map(|_| normal.sample(&mut rng)).collect();
        self.upload(HostBuffer::F32(values), layout)
    }

    /// Samples uniformly from `[low, high)`.
    pub fn uniform(&mut self, shape: &[usize], low: f32, high: f32) -> Result<Tensor> {
        if low >= high {
            return Err(Error::InvalidArgument(format!(
                "uniform: empty range [{low}, {high})"
            )));
        }
        let layout = Layout::from_shape(shape);
        let mut rng = rand::thread_rng();
        let values: Vec<f32> = (0..layout.size()).map(|_| rng.gen_range(low..high)).collect();
        self.upload(HostBuffer::F32(values), layout)
    }

    fn upload(&mut self, data: HostBuffer, layout: Layout) -> Result<Tensor> {
        let dtype = data.dtype();
        let sid = self.backend.alloc(data.len(), dtype)?;
        if let Err(err) = self.backend.write(sid, data) {
            let _ = self.backend.free(sid);
            return Err(err);
        }
        let tensor = Tensor::new(sid, layout, dtype);
        self.track(sid);
        Ok(tensor)
    }
}
