pub mod backend;
pub mod buffer;
pub mod device;
pub mod dtype;
pub mod error;
pub mod kernel;
pub mod layout;
pub mod readback;
pub mod scalar;
