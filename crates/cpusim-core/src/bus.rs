//! Address routing: mapper chain, memory scan and port scan.
//!
//! Every memory access first runs through each registered mapper in
//! registration order, then goes to the first memory device whose enabler
//! holds and whose window contains the mapped address. Port accesses skip the
//! mapper chain. When nothing answers, reads return 0 and writes are dropped.
//! Overlapping enabled windows are not diagnosed; the first registered device
//! wins.

use std::fmt;

use tracing::trace;

use crate::{Address, AddressMapper, BusDevice, DeviceKind, SimError};

/// Ordered device list resolved by linear scan.
#[derive(Default)]
pub struct DeviceList {
    devices: Vec<Box<dyn BusDevice>>,
}

impl DeviceList {
    /// Creates an empty list.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a device; earlier devices win address conflicts.
    pub fn push(&mut self, device: impl BusDevice + 'static) {
        self.devices.push(Box::new(device));
    }

    /// Number of registered devices.
    #[must_use]
    pub fn len(&self) -> usize {
        self.devices.len()
    }

    /// Returns true when no device is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }

    /// First device answering `addr`, optionally restricted to one kind.
    pub fn find_mut(
        &mut self,
        addr: Address,
        kind: Option<DeviceKind>,
    ) -> Option<&mut (dyn BusDevice + 'static)> {
        self.devices
            .iter_mut()
            .find(|device| kind.is_none_or(|k| device.kind() == k) && device.has_address(addr))
            .map(|device| &mut **device)
    }

    /// Reads from the answering device, or 0 on an open bus.
    ///
    /// # Errors
    ///
    /// Propagates the answering device's error.
    pub fn read(&mut self, addr: Address) -> Result<u8, SimError> {
        match self.find_mut(addr, None) {
            Some(device) => device.read(addr),
            None => {
                trace!(addr, "open bus read");
                Ok(0)
            }
        }
    }

    /// Writes to the answering device; dropped on an open bus.
    ///
    /// # Errors
    ///
    /// Propagates the answering device's error.
    pub fn write(&mut self, addr: Address, value: u8) -> Result<(), SimError> {
        match self.find_mut(addr, None) {
            Some(device) => device.write(addr, value),
            None => {
                trace!(addr, value, "open bus write dropped");
                Ok(())
            }
        }
    }
}

impl fmt::Debug for DeviceList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.devices.iter().map(|device| device.name()))
            .finish()
    }
}

/// System bus shared by CPUs, memory, ports and mappers.
#[derive(Default)]
pub struct Bus {
    memory: DeviceList,
    ports: DeviceList,
    mappers: Vec<Box<dyn AddressMapper>>,
    kind_filter: Option<DeviceKind>,
}

impl Bus {
    /// Creates an empty bus.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a memory-space device.
    pub fn add_memory(&mut self, device: impl BusDevice + 'static) {
        self.memory.push(device);
    }

    /// Registers a port-space device.
    pub fn add_port(&mut self, device: impl BusDevice + 'static) {
        self.ports.push(device);
    }

    /// Registers a mapper; mappers run in registration order.
    pub fn add_mapper(&mut self, mapper: impl AddressMapper + 'static) {
        self.mappers.push(Box::new(mapper));
    }

    /// Restricts the next memory access to devices of `kind`.
    ///
    /// The filter is consumed by that access whether or not a device answers.
    pub fn filter_kind(&mut self, kind: DeviceKind) {
        self.kind_filter = Some(kind);
    }

    /// Runs `addr` through the mapper chain.
    pub fn map(&mut self, addr: Address) -> Address {
        self.mappers
            .iter_mut()
            .fold(addr, |addr, mapper| mapper.map(addr))
    }

    fn memory_device(&mut self, addr: Address) -> (Address, Option<&mut (dyn BusDevice + 'static)>) {
        let kind = self.kind_filter.take();
        let mapped = self.map(addr);
        (mapped, self.memory.find_mut(mapped, kind))
    }

    /// Reads a byte from memory space.
    ///
    /// # Errors
    ///
    /// Propagates the answering device's error. An open bus is not an error.
    pub fn read_memory(&mut self, addr: Address) -> Result<u8, SimError> {
        match self.memory_device(addr) {
            (mapped, Some(device)) => device.read(mapped),
            (mapped, None) => {
                trace!(addr, mapped, "open bus memory read");
                Ok(0)
            }
        }
    }

    /// Writes a byte to memory space.
    ///
    /// # Errors
    ///
    /// Propagates the answering device's error. An open bus is not an error.
    pub fn write_memory(&mut self, addr: Address, value: u8) -> Result<(), SimError> {
        match self.memory_device(addr) {
            (mapped, Some(device)) => device.write(mapped, value),
            (mapped, None) => {
                trace!(addr, mapped, value, "open bus memory write dropped");
                Ok(())
            }
        }
    }

    /// Reads a status lane from the device answering `addr`.
    ///
    /// # Errors
    ///
    /// Propagates the answering device's error. An open bus is not an error.
    pub fn read_memory_status(&mut self, addr: Address, index: u8) -> Result<u8, SimError> {
        match self.memory_device(addr) {
            (mapped, Some(device)) => device.read_status(mapped, index),
            (_, None) => Ok(0),
        }
    }

    /// Writes a status lane on the device answering `addr`.
    ///
    /// # Errors
    ///
    /// Propagates the answering device's error. An open bus is not an error.
    pub fn write_memory_status(
        &mut self,
        addr: Address,
        index: u8,
        value: u8,
    ) -> Result<(), SimError> {
        match self.memory_device(addr) {
            (mapped, Some(device)) => device.write_status(mapped, index, value),
            (_, None) => Ok(()),
        }
    }

    /// Reads a byte from port space.
    ///
    /// # Errors
    ///
    /// Propagates the answering device's error. An open bus is not an error.
    pub fn read_port(&mut self, addr: Address) -> Result<u8, SimError> {
        self.ports.read(addr)
    }

    /// Writes a byte to port space.
    ///
    /// # Errors
    ///
    /// Propagates the answering device's error. An open bus is not an error.
    pub fn write_port(&mut self, addr: Address, value: u8) -> Result<(), SimError> {
        self.ports.write(addr, value)
    }
}

impl fmt::Debug for Bus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Bus")
            .field("memory", &self.memory)
            .field("ports", &self.ports)
            .field("mappers", &self.mappers.len())
            .field("kind_filter", &self.kind_filter)
            .finish()
    }
}
