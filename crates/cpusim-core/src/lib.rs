//! Instruction-level emulation of the Intel 4004 and 8008.
//!
//! A [`Bus`] routes memory accesses through registered [`AddressMapper`]s
//! and then to the first enabled [`BusDevice`] whose window holds the
//! address; port accesses are routed the same way without mapping. Unclaimed
//! addresses read as zero and drop writes. [`Enabler`]s gate devices on live
//! latch state owned by a CPU or a mapper.

/// Error taxonomy.
pub mod error;
pub use error::{ErrorKind, SimError};

/// Device gating predicates and the latches they observe.
pub mod enable;
pub use enable::{ByteLatch, EnableBit, Enabler};

/// Device, mapper, CPU and trace contracts.
pub mod api;
pub use api::{
    Address, AddressMapper, BusDevice, Cpu, DeviceKind, RunOutcome, StepOutcome, StopReason,
    TraceBuffer, TraceSink, TracingSink,
};

/// RAM/ROM devices with status lanes.
pub mod memory;
pub use memory::{MemoryDevice, StatusStore, STATUS_CHARACTERS};

/// 74LS670 bank mapper.
pub mod mapper;
pub use mapper::{Map670, Map670Wiring};

/// Memory and port routing.
pub mod bus;
pub use bus::{Bus, DeviceList};

/// Hardware return stack.
pub mod stack;
pub use stack::CallStack;

/// Simulation context and threaded runner.
pub mod sim;
pub use sim::{CancelFlag, CpuExit, SimHandle, Simulator};

/// Console and switch peripherals.
pub mod peripherals;
pub use peripherals::{DipSwitch, Uart, UartAddresses, UartInput, CTRL_C};

/// Intel 4004 engine and its bus adapters.
pub mod cpu4004;
pub use cpu4004::{Bus8Bit, Cpu4004, RomPort, Snapshot4004};

/// Intel 8008 engine.
pub mod cpu8008;
pub use cpu8008::{Cpu8008, Flags8008, Snapshot8008};

/// Listings for both instruction sets.
pub mod disasm;
pub use disasm::{disassemble_listing, DisassemblyRow, Isa};

/// Reference boards.
pub mod machine;
pub use machine::{build_4004, build_8008, BoardConfig4004, BoardConfig8008, ConsoleOutput};

#[cfg(test)]
use proptest as _;
#[cfg(test)]
use rstest as _;
