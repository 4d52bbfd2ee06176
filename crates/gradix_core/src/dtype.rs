#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DType {
    F16,
    F32,
    I32,
    BOOL,
}

impl DType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::F16 => "f16",
            Self::F32 => "f32",
            Self::I32 => "i32",
            Self::BOOL => "bool",
        }
    }

    pub fn size_in_bytes(&self) -> usize {
        match self {
            Self::F16 => 2,
            Self::F32 => 4,
            Self::I32 => 4,
            Self::BOOL => 1,
        }
    }

    pub fn is_float(&self) -> bool {
        matches!(self, Self::F16 | Self::F32)
    }

    pub fn is_int(&self) -> bool {
        matches!(self, Self::I32)
    }
}

/// Promotion rule for mixed-dtype binary ops: floats win over ints, wider
/// floats win over narrower ones, and BOOL promotes to whatever it meets.
pub fn promoted_dtype(a: DType, b: DType) -> DType {
    use DType::*;
    match (a, b) {
        (x, y) if x == y => x,
        (F32, _) | (_, F32) => F32,
        (F16, _) | (_, F16) => F16,
        (I32, _) | (_, I32) => I32,
        (BOOL, BOOL) => BOOL,
    }
}

impl std::fmt::Display for DType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
