//! 74LS670 bank-select mapper.
//!
//! The mapper is a small register file written through the port space. On
//! every memory access it picks a page register with the high address bits,
//! scatters the low nibble of that register onto the configured destination
//! address lines and drives any connected chip-select latches from the
//! register's bits. Two 74LS670s side by side give eight data bits, so up to
//! eight latches can hang off one page register.

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

use crate::{Address, AddressMapper, BusDevice, EnableBit, Enabler, SimError};

/// Page registers addressable by the source slice.
pub const PAGE_REGISTERS: usize = 16;
/// Address lines the mapper can rewrite.
pub const DEST_LINES: usize = 4;
/// Width of a page register.
pub const LATCH_LINES: usize = 8;

/// How a mapper is wired to the address bus and to chip-select latches.
#[derive(Debug, Clone, Default)]
pub struct Map670Wiring {
    /// First address bit of the page-register selector.
    pub source_bit: u8,
    /// Address bit driven by page-register bit `i`, if any.
    pub dest_bits: [Option<u8>; DEST_LINES],
    /// Latch driven by page-register bit `i`, if any.
    pub latches: [Option<EnableBit>; LATCH_LINES],
}

impl Map670Wiring {
    /// Wiring with the given selector and destination lines and no latches.
    #[must_use]
    pub fn new(source_bit: u8, dest_bits: [Option<u8>; DEST_LINES]) -> Self {
        Self {
            source_bit,
            dest_bits,
            latches: Default::default(),
        }
    }

    /// Connects page-register bit `line` to `latch`. Lines past 7 are ignored.
    #[must_use]
    pub fn with_latch(mut self, line: usize, latch: EnableBit) -> Self {
        if let Some(slot) = self.latches.get_mut(line) {
            *slot = Some(latch);
        }
        self
    }
}

#[derive(Debug)]
struct Map670Inner {
    name: String,
    base: Address,
    wiring: Map670Wiring,
    enabler: Enabler,
    pages: [AtomicU8; PAGE_REGISTERS],
}

/// Shared handle to one mapper.
///
/// Clones refer to the same page registers, so one clone can sit on the port
/// list while another is registered as the memory mapper.
#[derive(Debug, Clone)]
pub struct Map670 {
    inner: Arc<Map670Inner>,
}

impl Map670 {
    /// Creates a mapper whose four write ports start at `base`.
    #[must_use]
    pub fn new(name: impl Into<String>, base: Address, wiring: Map670Wiring, enabler: Enabler) -> Self {
        Self {
            inner: Arc::new(Map670Inner {
                name: name.into(),
                base,
                wiring,
                enabler,
                pages: Default::default(),
            }),
        }
    }

    /// Current value of page register `index`.
    #[must_use]
    pub fn page(&self, index: usize) -> Option<u8> {
        self.inner
            .pages
            .get(index)
            .map(|page| page.load(Ordering::Relaxed))
    }

    fn translate(&self, addr: Address) -> Address {
        let wiring = &self.inner.wiring;
        let index = usize::from(addr.checked_shr(u32::from(wiring.source_bit)).unwrap_or(0))
            % PAGE_REGISTERS;
        let value = self.inner.pages[index].load(Ordering::Relaxed);

        let mut mapped = addr;
        for (line, dest) in wiring.dest_bits.iter().enumerate() {
            if let Some(mask) = dest.and_then(|bit| 1u16.checked_shl(u32::from(bit))) {
                mapped &= !mask;
                if value & (1 << line) != 0 {
                    mapped |= mask;
                }
            }
        }
        for (line, latch) in wiring.latches.iter().enumerate() {
            if let Some(latch) = latch {
                latch.set(value & (1 << line) != 0);
            }
        }
        mapped
    }
}

impl AddressMapper for Map670 {
    fn map(&mut self, addr: Address) -> Address {
        self.translate(addr)
    }
}

impl BusDevice for Map670 {
    fn name(&self) -> &str {
        &self.inner.name
    }

    fn has_address(&self, addr: Address) -> bool {
        let base = self.inner.base;
        self.inner.enabler.is_enabled() && (base..=base.saturating_add(3)).contains(&addr)
    }

    fn read(&mut self, _addr: Address) -> Result<u8, SimError> {
        Err(SimError::read_only(&self.inner.name))
    }

    fn write(&mut self, addr: Address, value: u8) -> Result<(), SimError> {
        let index = usize::from(addr.wrapping_sub(self.inner.base) & 0x03);
        self.inner.pages[index].store(value, Ordering::Relaxed);
        Ok(())
    }

    fn write_status(&mut self, _addr: Address, _index: u8, _value: u8) -> Result<(), SimError> {
        Err(SimError::read_only(&self.inner.name))
    }
}
