//! Contracts shared by bus devices, mappers, CPU engines and hosts.

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::{Bus, CancelFlag, SimError};

/// Bus address. Each ISA wraps its own arithmetic at its native width.
pub type Address = u16;

/// Device tag used by the one-shot visibility filter on memory accesses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum DeviceKind {
    /// Program memory.
    Rom,
    /// Data memory.
    Ram,
    /// I/O lines attached to a 4004 ROM chip.
    RomPort,
    /// Output lines attached to a 4002 RAM chip.
    RamPort,
    /// Peripheral on the port address space.
    Port,
}

/// Uniform contract for everything that answers bus addresses.
///
/// Devices without a status lane keep the default status methods, which
/// report [`SimError::NotImplemented`].
pub trait BusDevice: Send {
    /// Human-readable device name used in errors and logs.
    fn name(&self) -> &str;

    /// Tag matched by the bus visibility filter.
    fn kind(&self) -> DeviceKind {
        DeviceKind::Port
    }

    /// Returns true when the device is enabled and `addr` is inside its window.
    fn has_address(&self, addr: Address) -> bool;

    /// Reads one byte.
    ///
    /// # Errors
    ///
    /// Device specific; see each implementation.
    fn read(&mut self, addr: Address) -> Result<u8, SimError>;

    /// Writes one byte.
    ///
    /// # Errors
    ///
    /// Device specific; see each implementation.
    fn write(&mut self, addr: Address, value: u8) -> Result<(), SimError>;

    /// Reads a status lane byte.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::NotImplemented`] unless the device has status lanes.
    fn read_status(&mut self, addr: Address, index: u8) -> Result<u8, SimError> {
        let _ = (addr, index);
        Err(SimError::not_implemented(self.name(), "read status"))
    }

    /// Writes a status lane byte.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::NotImplemented`] unless the device has status lanes.
    fn write_status(&mut self, addr: Address, index: u8, value: u8) -> Result<(), SimError> {
        let _ = (addr, index, value);
        Err(SimError::not_implemented(self.name(), "write status"))
    }
}

/// Address translation stage run before memory devices are scanned.
pub trait AddressMapper: Send {
    /// Translates `addr`, possibly driving external latches on the way.
    fn map(&mut self, addr: Address) -> Address;
}

/// Result of one fetch/decode/execute cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StepOutcome {
    /// Instruction retired and the CPU keeps running.
    Retired,
    /// CPU is halted, either by this instruction or before it.
    Halted,
}

/// Why a run loop returned without an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StopReason {
    /// The CPU executed a halt instruction.
    Halted,
    /// The shared cancellation flag was raised.
    Cancelled,
    /// The caller's step budget ran out.
    StepLimit,
}

/// Aggregated result of a run loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RunOutcome {
    /// Number of instructions executed.
    pub steps: u64,
    /// Why the loop stopped.
    pub stop: StopReason,
}

/// Receiver for formatted per-instruction trace lines.
pub trait TraceSink: Send {
    /// Records one line in execution order.
    fn trace(&mut self, line: &str);
}

impl<F> TraceSink for F
where
    F: FnMut(&str) + Send,
{
    fn trace(&mut self, line: &str) {
        self(line);
    }
}

/// Sink forwarding trace lines to the `tracing` subscriber at trace level.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl TraceSink for TracingSink {
    fn trace(&mut self, line: &str) {
        tracing::trace!(target: "cpusim::trace", "{line}");
    }
}

/// In-memory sink whose lines stay readable through any clone.
#[derive(Debug, Clone, Default)]
pub struct TraceBuffer {
    lines: Arc<Mutex<Vec<String>>>,
}

impl TraceBuffer {
    /// Creates an empty buffer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Copies out every recorded line.
    #[must_use]
    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().clone()
    }
}

impl TraceSink for TraceBuffer {
    fn trace(&mut self, line: &str) {
        self.lines.lock().push(line.to_owned());
    }
}

/// Behaviour common to both CPU engines.
pub trait Cpu: Send + fmt::Display {
    /// CPU name used in errors and logs.
    fn name(&self) -> &str;

    /// Clears registers, flags, stack and PC.
    fn reset(&mut self);

    /// Executes one instruction against `bus`.
    ///
    /// # Errors
    ///
    /// Returns the first device or decode error; the CPU state is left as it
    /// was when the error surfaced.
    fn step(&mut self, bus: &mut Bus) -> Result<StepOutcome, SimError>;

    /// Current program counter.
    fn pc(&self) -> Address;

    /// Moves the program counter, wrapped to the ISA width.
    fn set_pc(&mut self, pc: Address);

    /// Returns true once a halt instruction has executed.
    fn is_halted(&self) -> bool;

    /// Attaches or detaches the instruction trace sink.
    fn set_trace_sink(&mut self, sink: Option<Box<dyn TraceSink>>);

    /// Runs until halt, cancellation or an error.
    ///
    /// The cancel flag is checked once before every instruction.
    ///
    /// # Errors
    ///
    /// Returns the error that stopped the CPU.
    fn run(&mut self, bus: &mut Bus, cancel: &CancelFlag) -> Result<RunOutcome, SimError> {
        run_loop(self, bus, cancel, None)
    }

    /// Runs at most `max_steps` instructions.
    ///
    /// # Errors
    ///
    /// Returns the error that stopped the CPU.
    fn run_steps(&mut self, bus: &mut Bus, max_steps: u64) -> Result<RunOutcome, SimError> {
        run_loop(self, bus, &CancelFlag::new(), Some(max_steps))
    }
}

fn run_loop<C>(
    cpu: &mut C,
    bus: &mut Bus,
    cancel: &CancelFlag,
    limit: Option<u64>,
) -> Result<RunOutcome, SimError>
where
    C: Cpu + ?Sized,
{
    let mut steps = 0u64;
    loop {
        if cancel.is_cancelled() {
            debug!(cpu = cpu.name(), steps, "run cancelled");
            return Ok(RunOutcome {
                steps,
                stop: StopReason::Cancelled,
            });
        }
        if limit.is_some_and(|max| steps >= max) {
            return Ok(RunOutcome {
                steps,
                stop: StopReason::StepLimit,
            });
        }
        match cpu.step(bus) {
            Ok(StepOutcome::Retired) => steps += 1,
            Ok(StepOutcome::Halted) => {
                debug!(cpu = cpu.name(), steps, pc = cpu.pc(), "cpu halted");
                return Ok(RunOutcome {
                    steps,
                    stop: StopReason::Halted,
                });
            }
            Err(error) => {
                warn!(cpu = cpu.name(), steps, %error, "cpu stopped on error");
                return Err(error);
            }
        }
    }
}
