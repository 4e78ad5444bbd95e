//! Enable predicates gating bus devices.
//!
//! An [`Enabler`] never owns the state it looks at. It holds a handle to a
//! latch owned by a CPU or a mapper and evaluates it on every address match,
//! so a device appears and disappears as soon as the latch changes.

use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::Arc;

/// Shared single-bit latch, typically driven by a bank mapper.
#[derive(Debug, Clone, Default)]
pub struct EnableBit {
    value: Arc<AtomicBool>,
}

impl EnableBit {
    /// Creates a latch with the given initial level.
    #[must_use]
    pub fn new(value: bool) -> Self {
        Self {
            value: Arc::new(AtomicBool::new(value)),
        }
    }

    /// Current latch level.
    #[must_use]
    pub fn get(&self) -> bool {
        self.value.load(Ordering::Relaxed)
    }

    /// Drives the latch.
    pub fn set(&self, value: bool) {
        self.value.store(value, Ordering::Relaxed);
    }

    /// Enabler that holds while the latch is high.
    #[must_use]
    pub fn high_enabler(&self) -> Enabler {
        Enabler::Flag {
            bit: self.clone(),
            inverted: false,
        }
    }

    /// Enabler that holds while the latch is low.
    #[must_use]
    pub fn low_enabler(&self) -> Enabler {
        Enabler::Flag {
            bit: self.clone(),
            inverted: true,
        }
    }
}

/// Shared byte-wide register, such as the 4004 RAM control latch.
#[derive(Debug, Clone, Default)]
pub struct ByteLatch {
    value: Arc<AtomicU8>,
}

impl ByteLatch {
    /// Creates a register with the given initial value.
    #[must_use]
    pub fn new(value: u8) -> Self {
        Self {
            value: Arc::new(AtomicU8::new(value)),
        }
    }

    /// Current register value.
    #[must_use]
    pub fn get(&self) -> u8 {
        self.value.load(Ordering::Relaxed)
    }

    /// Stores a new value.
    pub fn set(&self, value: u8) {
        self.value.store(value, Ordering::Relaxed);
    }

    /// Enabler that holds while the register equals `value`.
    #[must_use]
    pub fn match_enabler(&self, value: u8) -> Enabler {
        Enabler::ByteMatch {
            latch: self.clone(),
            value,
        }
    }
}

/// Predicate deciding whether a device currently takes part in decoding.
#[derive(Debug, Clone, Default)]
pub enum Enabler {
    /// Always enabled.
    #[default]
    Always,
    /// Never enabled.
    Never,
    /// Follows a shared bit, optionally inverted.
    Flag {
        /// Observed latch.
        bit: EnableBit,
        /// Enabled while the latch is low instead of high.
        inverted: bool,
    },
    /// Enabled while a shared byte register equals `value`.
    ByteMatch {
        /// Observed register.
        latch: ByteLatch,
        /// Value that enables the device.
        value: u8,
    },
}

impl Enabler {
    /// Evaluates the predicate against the current latch state.
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        match self {
            Self::Always => true,
            Self::Never => false,
            Self::Flag { bit, inverted } => bit.get() != *inverted,
            Self::ByteMatch { latch, value } => latch.get() == *value,
        }
    }
}
