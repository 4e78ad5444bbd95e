//! Byte-wide peripheral adapter driven through 4004 status characters.
//!
//! The 4004 can only move nibbles. This adapter answers every RC address
//! while its enabler holds and turns status characters 0 and 1 into byte
//! transfers on its own port list:
//!
//! - RD0 reads a byte from the attached port at RC, latches it and returns
//!   the low nibble; RD1 returns the latched high nibble.
//! - WR1 stages the high nibble; WR0 sets the low nibble and writes the
//!   assembled byte to the attached port at RC.

use crate::{Address, BusDevice, DeviceKind, DeviceList, Enabler, SimError, STATUS_CHARACTERS};

const LOW_NIBBLE: u8 = 0;
const HIGH_NIBBLE: u8 = 1;

/// 8-bit peripheral bus hung off the 4004 RAM status lanes.
#[derive(Debug)]
pub struct Bus8Bit {
    name: String,
    enabler: Enabler,
    ports: DeviceList,
    last_read: u8,
    pending_write: u8,
}

impl Bus8Bit {
    /// Creates an adapter with nothing attached.
    #[must_use]
    pub fn new(name: impl Into<String>, enabler: Enabler) -> Self {
        Self {
            name: name.into(),
            enabler,
            ports: DeviceList::new(),
            last_read: 0,
            pending_write: 0,
        }
    }

    /// Attaches an 8-bit peripheral.
    pub fn attach(&mut self, device: impl BusDevice + 'static) {
        self.ports.push(device);
    }

    fn check(&self, addr: Address, index: u8) -> Result<(), SimError> {
        if !self.has_address(addr) {
            return Err(SimError::invalid_address(&self.name, addr));
        }
        if usize::from(index) >= STATUS_CHARACTERS {
            return Err(SimError::invalid_address(&self.name, Address::from(index)));
        }
        Ok(())
    }
}

impl BusDevice for Bus8Bit {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> DeviceKind {
        DeviceKind::Ram
    }

    fn has_address(&self, addr: Address) -> bool {
        self.enabler.is_enabled() && addr <= 0xFF
    }

    fn read(&mut self, _addr: Address) -> Result<u8, SimError> {
        Err(SimError::not_implemented(&self.name, "read"))
    }

    fn write(&mut self, _addr: Address, _value: u8) -> Result<(), SimError> {
        Err(SimError::not_implemented(&self.name, "write"))
    }

    fn read_status(&mut self, addr: Address, index: u8) -> Result<u8, SimError> {
        self.check(addr, index)?;
        match index {
            LOW_NIBBLE => {
                self.last_read = self.ports.read(addr)?;
                Ok(self.last_read & 0x0F)
            }
            HIGH_NIBBLE => Ok(self.last_read >> 4),
            _ => Err(SimError::not_implemented(&self.name, "read status")),
        }
    }

    fn write_status(&mut self, addr: Address, index: u8, value: u8) -> Result<(), SimError> {
        self.check(addr, index)?;
        match index {
            LOW_NIBBLE => {
                self.pending_write = (self.pending_write & 0xF0) | (value & 0x0F);
                self.ports.write(addr, self.pending_write)
            }
            HIGH_NIBBLE => {
                self.pending_write = (self.pending_write & 0x0F) | ((value & 0x0F) << 4);
                Ok(())
            }
            _ => Err(SimError::not_implemented(&self.name, "write status")),
        }
    }
}
