//! Contiguous RAM/ROM devices with optional status lanes.

/// Per-cell status lanes.
pub mod status;

pub use status::{StatusStore, STATUS_CHARACTERS};

use tracing::debug;

use crate::{Address, BusDevice, DeviceKind, Enabler, SimError};

/// Byte array answering the inclusive window `[start, end]`.
#[derive(Debug, Clone)]
pub struct MemoryDevice {
    name: String,
    kind: DeviceKind,
    start: Address,
    end: Address,
    read_only: bool,
    enabler: Enabler,
    contents: Vec<u8>,
    status: Option<StatusStore>,
}

impl MemoryDevice {
    /// Creates a zero-filled device covering `[start, end]`.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        kind: DeviceKind,
        start: Address,
        end: Address,
        read_only: bool,
        enabler: Enabler,
    ) -> Self {
        let len = if end >= start {
            usize::from(end - start) + 1
        } else {
            0
        };
        Self {
            name: name.into(),
            kind,
            start,
            end,
            read_only,
            enabler,
            contents: vec![0; len],
            status: None,
        }
    }

    /// Attaches four status lanes to each of the first `cells` cells.
    #[must_use]
    pub fn with_status(mut self, cells: usize) -> Self {
        self.status = Some(StatusStore::new(cells));
        self
    }

    /// Copies `bytes` in from offset 0, truncated to the device size.
    ///
    /// Returns the number of bytes copied. Cells past the image keep their
    /// previous contents.
    pub fn load(&mut self, bytes: &[u8]) -> usize {
        let count = bytes.len().min(self.contents.len());
        self.contents[..count].copy_from_slice(&bytes[..count]);
        debug!(
            device = %self.name,
            loaded = count,
            offered = bytes.len(),
            "memory image loaded"
        );
        count
    }

    /// First address of the window.
    #[must_use]
    pub const fn start(&self) -> Address {
        self.start
    }

    /// Last address of the window, inclusive.
    #[must_use]
    pub const fn end(&self) -> Address {
        self.end
    }

    /// Size of the backing store in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.contents.len()
    }

    /// Returns true for a zero-sized window.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.contents.is_empty()
    }

    /// Returns true when writes are rejected.
    #[must_use]
    pub const fn is_read_only(&self) -> bool {
        self.read_only
    }

    /// Raw backing store.
    #[must_use]
    pub fn contents(&self) -> &[u8] {
        &self.contents
    }

    fn offset(&self, addr: Address) -> Result<usize, SimError> {
        if self.has_address(addr) {
            Ok(usize::from(addr - self.start))
        } else {
            Err(SimError::invalid_address(&self.name, addr))
        }
    }

    fn status_mut(&mut self) -> Result<&mut StatusStore, SimError> {
        let name = &self.name;
        self.status
            .as_mut()
            .ok_or_else(|| SimError::not_implemented(name, "status"))
    }
}

impl BusDevice for MemoryDevice {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> DeviceKind {
        self.kind
    }

    fn has_address(&self, addr: Address) -> bool {
        self.enabler.is_enabled() && (self.start..=self.end).contains(&addr)
    }

    fn read(&mut self, addr: Address) -> Result<u8, SimError> {
        let offset = self.offset(addr)?;
        Ok(self.contents[offset])
    }

    fn write(&mut self, addr: Address, value: u8) -> Result<(), SimError> {
        let offset = self.offset(addr)?;
        if self.read_only {
            return Err(SimError::read_only(&self.name));
        }
        self.contents[offset] = value;
        Ok(())
    }

    fn read_status(&mut self, addr: Address, index: u8) -> Result<u8, SimError> {
        let offset = self.offset(addr)?;
        let value = self.status_mut()?.get(offset, index);
        value.ok_or_else(|| SimError::invalid_address(&self.name, addr))
    }

    fn write_status(&mut self, addr: Address, index: u8, value: u8) -> Result<(), SimError> {
        let offset = self.offset(addr)?;
        if self.status_mut()?.set(offset, index, value) {
            Ok(())
        } else {
            Err(SimError::invalid_address(&self.name, addr))
        }
    }
}
