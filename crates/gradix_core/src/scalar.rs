use crate::dtype::DType;
use half::f16;

/// A single element read out of (or written into) a buffer, carrying its
/// dtype alongside the value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Scalar {
    F16(f16),
    F32(f32),
    I32(i32),
    BOOL(bool),
}

impl Scalar {
    pub fn dtype(&self) -> DType {
        match self {
            Self::F16(_) => DType::F16,
            Self::F32(_) => DType::F32,
            Self::I32(_) => DType::I32,
            Self::BOOL(_) => DType::BOOL,
        }
    }

    pub fn to_f32(&self) -> f32 {
        match self {
            Self::F16(v) => v.to_f32(),
            Self::F32(v) => *v,
            Self::I32(v) => *v as f32,
            Self::BOOL(v) => {
                if *v {
                    1.0
                } else {
                    0.0
                }
            }
        }
    }

    pub fn to_i32(&self) -> i32 {
        match self {
            Self::F16(v) => v.to_f32() as i32,
            Self::F32(v) => *v as i32,
            Self::I32(v) => *v,
            Self::BOOL(v) => *v as i32,
        }
    }

    pub fn to_bool(&self) -> bool {
        match self {
            Self::F16(v) => v.to_f32() != 0.0,
            Self::F32(v) => *v != 0.0,
            Self::I32(v) => *v != 0,
            Self::BOOL(v) => *v,
        }
    }

    /// Re-types an f32 value into `dtype`.
    pub fn from_f32(value: f32, dtype: DType) -> Self {
        match dtype {
            DType::F16 => Self::F16(f16::from_f32(value)),
            DType::F32 => Self::F32(value),
            DType::I32 => Self::I32(value as i32),
            DType::BOOL => Self::BOOL(value != 0.0),
        }
    }
}

impl From<f32> for Scalar {
    fn from(v: f32) -> Self {
        Self::F32(v)
    }
}

impl From<f16> for Scalar {
    fn from(v: f16) -> Self {
        Self::F16(v)
    }
}

impl From<i32> for Scalar {
    fn from(v: i32) -> Self {
        Self::I32(v)
    }
}

impl From<bool> for Scalar {
    fn from(v: bool) -> Self {
        Self::BOOL(v)
    }
}
