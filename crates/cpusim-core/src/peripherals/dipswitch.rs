use crate::{Address, BusDevice, Enabler, SimError};

/// Input port that always reads back a jumpered byte.
#[derive(Debug, Clone)]
pub struct DipSwitch {
    name: String,
    addr: Address,
    value: u8,
    enabler: Enabler,
}

impl DipSwitch {
    /// Creates a switch bank readable at `addr`.
    #[must_use]
    pub fn new(name: impl Into<String>, addr: Address, value: u8, enabler: Enabler) -> Self {
        Self {
            name: name.into(),
            addr,
            value,
            enabler,
        }
    }
}

impl BusDevice for DipSwitch {
    fn name(&self) -> &str {
        &self.name
    }

    fn has_address(&self, addr: Address) -> bool {
        self.enabler.is_enabled() && addr == self.addr
    }

    fn read(&mut self, addr: Address) -> Result<u8, SimError> {
        if addr == self.addr {
            Ok(self.value)
        } else {
            Err(SimError::invalid_address(&self.name, addr))
        }
    }

    fn write(&mut self, _addr: Address, _value: u8) -> Result<(), SimError> {
        Err(SimError::read_only(&self.name))
    }

    fn read_status(&mut self, _addr: Address, _index: u8) -> Result<u8, SimError> {
        Err(SimError::read_only(&self.name))
    }
}
