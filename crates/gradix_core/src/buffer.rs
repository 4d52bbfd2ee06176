use crate::{
    dtype::DType,
    error::{Error, Result},
    scalar::Scalar,
};
use half::f16;

/// Host-addressable tensor data. Device backends materialize into this type
/// on readback and accept it on write.
#[derive(Debug, Clone, PartialEq)]
pub enum HostBuffer {
    F16(Vec<f16>),
    F32(Vec<f32>),
    I32(Vec<i32>),
    BOOL(Vec<bool>),
}

macro_rules! typed_accessors {
    ($($variant:ident => $ty:ty),* $(,)?) => {
        $(
            paste::paste! {
                pub fn [<as_ $ty:snake>](&self) -> Result<&[$ty]> {
                    match self {
                        Self::$variant(v) => Ok(v),
                        other => Err(Error::DTypeMismatch {
                            expected: DType::$variant,
                            got: other.dtype(),
                        }),
                    }
                }

                pub fn [<into_ $ty:snake>](self) -> Result<Vec<$ty>> {
                    match self {
                        Self::$variant(v) => Ok(v),
                        other => Err(Error::DTypeMismatch {
                            expected: DType::$variant,
                            got: other.dtype(),
                        }),
                    }
                }
            }
        )*
    };
}

impl HostBuffer {
    pub fn zeros(count: usize, dtype: DType) -> Self {
        match dtype {
            DType::F16 => Self::F16(vec![f16::ZERO; count]),
            DType::F32 => Self::F32(vec![0.0; count]),
            DType::I32 => Self::I32(vec![0; count]),
            DType::BOOL => Self::BOOL(vec![false; count]),
        }
    }

    pub fn dtype(&self) -> DType {
        match self {
            Self::F16(_) => DType::F16,
            Self::F32(_) => DType::F32,
            Self::I32(_) => DType::I32,
            Self::BOOL(_) => DType::BOOL,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Self::F16(v) => v.len(),
            Self::F32(v) => v.len(),
            Self::I32(v) => v.len(),
            Self::BOOL(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self, index: usize) -> Result<Scalar> {
        if index >= self.len() {
            return Err(Error::IndexOutOfBounds {
                index,
                size: self.len(),
            });
        }

        Ok(match self {
            Self::F16(v) => Scalar::F16(v[index]),
            Self::F32(v) => Scalar::F32(v[index]),
            Self::I32(v) => Scalar::I32(v[index]),
            Self::BOOL(v) => Scalar::BOOL(v[index]),
        })
    }

    pub fn set(&mut self, index: usize, value: Scalar) -> Result<()> {
        if index >= self.len() {
            return Err(Error::IndexOutOfBounds {
                index,
                size: self.len(),
            });
        }

        match self {
            Self::F16(v) => v[index] = f16::from_f32(value.to_f32()),
            Self::F32(v) => v[index] = value.to_f32(),
            Self::I32(v) => v[index] = value.to_i32(),
            Self::BOOL(v) => v[index] = value.to_bool(),
        }
        Ok(())
    }

    pub fn to_f32_vec(&self) -> Vec<f32> {
        match self {
            Self::F16(v) => v.iter().map(|x| x.to_f32()).collect(),
            Self::F32(v) => v.clone(),
            Self::I32(v) => v.iter().map(|&x| x as f32).collect(),
            Self::BOOL(v) => v.iter().map(|&x| if x { 1.0 } else { 0.0 }).collect(),
        }
    }

    pub fn from_f32_vec(values: Vec<f32>, dtype: DType) -> Self {
        match dtype {
            DType::F16 => Self::F16(values.into_iter().map(f16::from_f32).collect()),
            DType::F32 => Self::F32(values),
            DType::I32 => Self::I32(values.into_iter().map(|x| x as i32).collect()),
            DType::BOOL => Self::BOOL(values.into_iter().map(|x| x != 0.0).collect()),
        }
    }

    pub fn cast(&self, dtype: DType) -> Self {
        if self.dtype() == dtype {
            return self.clone();
        }
        Self::from_f32_vec(self.to_f32_vec(), dtype)
    }

    typed_accessors! {
        F16 => f16,
        F32 => f32,
        I32 => i32,
        BOOL => bool,
    }
}

impl From<Vec<f32>> for HostBuffer {
    fn from(v: Vec<f32>) -> Self {
        Self::F32(v)
    }
}

impl From<Vec<i32>> for HostBuffer {
    fn from(v: Vec<i32>) -> Self {
        Self::I32(v)
    }
}

impl From<Vec<bool>> for HostBuffer {
    fn from(v: Vec<bool>) -> Self {
        Self::BOOL(v)
    }
}
