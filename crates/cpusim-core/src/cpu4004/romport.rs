//! ROM I/O ports reached through WRR/RDR.

use crate::{Address, BusDevice, DeviceKind, DeviceList, Enabler, SimError};

/// Fans RC addresses out to the I/O port of the selected ROM chip.
///
/// The ROM chip number is the high nibble of RC; an attached device at that
/// chip number (0-15) receives the transfer.
#[derive(Debug)]
pub struct RomPort {
    name: String,
    enabler: Enabler,
    ports: DeviceList,
}

impl RomPort {
    /// Creates an adapter with nothing attached.
    #[must_use]
    pub fn new(name: impl Into<String>, enabler: Enabler) -> Self {
        Self {
            name: name.into(),
            enabler,
            ports: DeviceList::new(),
        }
    }

    /// Attaches a device addressed by ROM chip number.
    pub fn attach(&mut self, device: impl BusDevice + 'static) {
        self.ports.push(device);
    }

    const fn chip(addr: Address) -> Address {
        (addr >> 4) & 0x0F
    }
}

impl BusDevice for RomPort {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> DeviceKind {
        DeviceKind::RomPort
    }

    fn has_address(&self, addr: Address) -> bool {
        self.enabler.is_enabled() && addr <= 0xFF
    }

    fn read(&mut self, addr: Address) -> Result<u8, SimError> {
        self.ports.read(Self::chip(addr))
    }

    fn write(&mut self, addr: Address, value: u8) -> Result<(), SimError> {
        self.ports.write(Self::chip(addr), value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{DipSwitch, ErrorKind, MemoryDevice};

    #[test]
    fn rc_high_nibble_selects_chip() {
        let mut port = RomPort::new("romport", Enabler::Always);
        port.attach(MemoryDevice::new("latches", DeviceKind::Port, 0, 0x0F, false, Enabler::Always));

        port.write(0x30, 0x9).expect("chip 3");
        assert_eq!(port.read(0x3F), Ok(0x9));
        assert_eq!(port.read(0x20), Ok(0));
    }

    #[test]
    fn attached_device_errors_propagate() {
        let mut port = RomPort::new("romport", Enabler::Always);
        port.attach(DipSwitch::new("switches", 0x1, 0x6, Enabler::Always));
        assert_eq!(port.read(0x10), Ok(0x6));
        assert_eq!(
            port.write(0x10, 1).map_err(|e| e.kind()),
            Err(ErrorKind::ReadOnly)
        );
    }

    #[test]
    fn status_lanes_are_not_implemented() {
        let mut port = RomPort::new("romport", Enabler::Always);
        assert_eq!(
            port.read_status(0, 0).map_err(|e| e.kind()),
            Err(ErrorKind::NotImplemented)
        );
    }
}
