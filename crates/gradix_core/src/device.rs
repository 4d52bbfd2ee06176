#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Device {
    CPU,
    Accel,
}

impl Device {
    pub fn name(&self) -> &'static str {
        match self {
            Device::CPU => "CPU",
            Device::Accel => "Accel",
        }
    }
}

impl std::fmt::Display for Device {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
