use crate::dtype::DType;
use std::fmt;

#[derive(Debug)]
pub enum Error {
    ShapeMismatch {
        op: &'static str,
        lhs: Vec<usize>,
        rhs: Vec<usize>,
    },
    InvalidShape {
        message: String,
    },
    UnsupportedDType {
        kernel: &'static str,
        dtype: DType,
    },
    AllocationFailure {
        count: usize,
        dtype: DType,
    },
    InvalidGradientTarget {
        shape: Vec<usize>,
    },
    MissingGradient {
        target: String,
    },
    DTypeMismatch {
        expected: DType,
        got: DType,
    },
    StorageNotFound,
    IndexOutOfBounds {
        index: usize,
        size: usize,
    },
    DimensionOutOfBounds {
        dim: usize,
        ndim: usize,
    },
    InvalidArgument(String),
    Disconnected,
    Internal {
        message: String,
    },
}

pub type Result<T> = std::result::Result<T, Error>;

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ShapeMismatch { op, lhs, rhs } => {
                write!(f, "Shape mismatch in {}: {:?} vs {:?}", op, lhs, rhs)
            }
            Self::InvalidShape { message } => write!(f, "Invalid shape: {}", message),
            Self::UnsupportedDType { kernel, dtype } => {
                write!(f, "Kernel {} does not support dtype {}", kernel, dtype.as_str())
            }
            Self::AllocationFailure { count, dtype } => {
                write!(f, "Failed to allocate storage for {} {} elements", count, dtype.as_str())
            }
            Self::InvalidGradientTarget { shape } => {
                write!(
                    f,
                    "Gradients require a scalar output, got a tensor of shape {:?}",
                    shape
                )
            }
            Self::MissingGradient { target } => {
                write!(f, "Target {} did not participate in the differentiated computation", target)
            }
            Self::DTypeMismatch { expected, got } => {
                write!(f, "DType mismatch: expected {}, got {}", expected.as_str(), got.as_str())
            }
            Self::StorageNotFound => write!(f, "Storage id not found in backend table"),
            Self::IndexOutOfBounds { index, size } => {
                write!(f, "Index {} is out of bounds for size {}", index, size)
            }
            Self::DimensionOutOfBounds { dim, ndim } => {
                write!(f, "Dimension {} is not valid for a rank-{} tensor", dim, ndim)
            }
            Self::InvalidArgument(msg) => write!(f, "Invalid argument: {}", msg),
            Self::Disconnected => write!(f, "Backend worker has shut down"),
            Self::Internal { message } => write!(f, "Internal error: {}", message),
        }
    }
}

impl std::error::Error for Error {}
