use thiserror::Error;

/// Stable error taxonomy shared by every device and CPU engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[repr(u8)]
pub enum ErrorKind {
    /// Register or flag index outside the register file.
    InvalidRegister = 0x01,
    /// Address outside a device window, or the device is disabled.
    InvalidAddress = 0x02,
    /// Write to a read-only device.
    ReadOnly = 0x03,
    /// Opcode with no defined meaning for the ISA.
    InvalidOpcode = 0x04,
    /// Return executed with nothing on the call stack.
    StackUnderflow = 0x05,
    /// Operation the device does not support.
    NotImplemented = 0x06,
}

impl ErrorKind {
    /// Converts the kind to its stable byte value.
    #[must_use]
    pub const fn as_u8(self) -> u8 {
        self as u8
    }

    /// Converts a stable byte value back into a kind.
    #[must_use]
    pub const fn from_u8(code: u8) -> Option<Self> {
        match code {
            0x01 => Some(Self::InvalidRegister),
            0x02 => Some(Self::InvalidAddress),
            0x03 => Some(Self::ReadOnly),
            0x04 => Some(Self::InvalidOpcode),
            0x05 => Some(Self::StackUnderflow),
            0x06 => Some(Self::NotImplemented),
            _ => None,
        }
    }
}

/// Error raised by a bus device or a CPU engine.
///
/// Bus misses are never reported through this type: an address nobody
/// answers reads as zero and swallows writes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Error)]
pub enum SimError {
    /// Register or flag index outside the register file.
    #[error("{device}: invalid register {index}")]
    InvalidRegister {
        /// Name of the CPU that rejected the index.
        device: String,
        /// Offending register index.
        index: usize,
    },
    /// Address outside a device window, or the device is disabled.
    #[error("device {device}: invalid address {address:#06X}")]
    InvalidAddress {
        /// Name of the device that rejected the access.
        device: String,
        /// Offending address.
        address: u16,
    },
    /// Write to a read-only device.
    #[error("device {device}: read only")]
    ReadOnly {
        /// Name of the read-only device.
        device: String,
    },
    /// Opcode with no defined meaning for the ISA.
    #[error("{device}: invalid opcode {opcode:#04X} at {pc:#06X}")]
    InvalidOpcode {
        /// Name of the CPU that fetched the opcode.
        device: String,
        /// Raw opcode byte.
        opcode: u8,
        /// Address the opcode was fetched from.
        pc: u16,
    },
    /// Return executed with nothing on the call stack.
    #[error("{device}: stack underflow")]
    StackUnderflow {
        /// Name of the CPU whose stack underflowed.
        device: String,
    },
    /// Operation the device does not support.
    #[error("device {device}: {operation} not implemented")]
    NotImplemented {
        /// Name of the device.
        device: String,
        /// Short name of the unsupported operation.
        operation: &'static str,
    },
}

impl SimError {
    /// Builds an [`SimError::InvalidAddress`] for `device`.
    #[must_use]
    pub fn invalid_address(device: &str, address: u16) -> Self {
        Self::InvalidAddress {
            device: device.to_owned(),
            address,
        }
    }

    /// Builds an [`SimError::ReadOnly`] for `device`.
    #[must_use]
    pub fn read_only(device: &str) -> Self {
        Self::ReadOnly {
            device: device.to_owned(),
        }
    }

    /// Builds an [`SimError::NotImplemented`] for `device`.
    #[must_use]
    pub fn not_implemented(device: &str, operation: &'static str) -> Self {
        Self::NotImplemented {
            device: device.to_owned(),
            operation,
        }
    }

    /// Builds an [`SimError::InvalidRegister`] for `device`.
    #[must_use]
    pub fn invalid_register(device: &str, index: usize) -> Self {
        Self::InvalidRegister {
            device: device.to_owned(),
            index,
        }
    }

    /// Returns the stable kind of this error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidRegister { .. } => ErrorKind::InvalidRegister,
            Self::InvalidAddress { .. } => ErrorKind::InvalidAddress,
            Self::ReadOnly { .. } => ErrorKind::ReadOnly,
            Self::InvalidOpcode { .. } => ErrorKind::InvalidOpcode,
            Self::StackUnderflow { .. } => ErrorKind::StackUnderflow,
            Self::NotImplemented { .. } => ErrorKind::NotImplemented,
        }
    }
}
