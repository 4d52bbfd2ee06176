pub mod prelude;

pub use gradix_accel as accel;
pub use gradix_core as core;
pub use gradix_cpu as cpu;
pub use gradix_engine as engine;

pub use gradix_engine::{Engine, Tensor};
