//! Port-space peripherals.

/// Serial console.
pub mod uart;
pub use uart::{Uart, UartAddresses, UartInput, CTRL_C};

/// Fixed-value input port.
pub mod dipswitch;
pub use dipswitch::DipSwitch;
