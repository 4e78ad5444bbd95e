//! Polled serial console.
//!
//! The guest sees four port addresses: data read, data write, control read
//! and control write. Control reads report transmit-ready in bit 0 (always
//! set) and receive-ready in bit 1. Received bytes come from a queue fed by a
//! separate reader thread; the CPU side never blocks on it.

use std::collections::VecDeque;
use std::fmt;
use std::io::{self, Read, Write};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::{Address, BusDevice, CancelFlag, Enabler, SimError};

/// Byte that raises the cancellation flag when typed on the console.
pub const CTRL_C: u8 = 0x03;

const TX_READY: u8 = 0x01;
const RX_READY: u8 = 0x02;

/// Port addresses decoded by a [`Uart`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct UartAddresses {
    /// Receive data register.
    pub data_read: Address,
    /// Transmit data register.
    pub data_write: Address,
    /// Status register.
    pub control_read: Address,
    /// Control register; writes are accepted and ignored.
    pub control_write: Address,
}

impl UartAddresses {
    fn contains(self, addr: Address) -> bool {
        [
            self.data_read,
            self.data_write,
            self.control_read,
            self.control_write,
        ]
        .contains(&addr)
    }
}

type RxQueue = Arc<Mutex<VecDeque<u8>>>;

/// Console device.
pub struct Uart {
    name: String,
    addresses: UartAddresses,
    enabler: Enabler,
    rx: RxQueue,
    output: Box<dyn Write + Send>,
}

impl Uart {
    /// Creates a console writing to the process's standard output.
    #[must_use]
    pub fn new(name: impl Into<String>, addresses: UartAddresses, enabler: Enabler) -> Self {
        Self {
            name: name.into(),
            addresses,
            enabler,
            rx: RxQueue::default(),
            output: Box::new(io::stdout()),
        }
    }

    /// Replaces the transmit sink.
    #[must_use]
    pub fn with_output(mut self, output: impl Write + Send + 'static) -> Self {
        self.output = Box::new(output);
        self
    }

    /// Handle for feeding received bytes from another thread.
    #[must_use]
    pub fn input(&self) -> UartInput {
        UartInput {
            rx: Arc::clone(&self.rx),
        }
    }

    fn transmit(&mut self, value: u8) {
        let result = self
            .output
            .write_all(&[value])
            .and_then(|()| self.output.flush());
        if let Err(error) = result {
            warn!(device = %self.name, %error, "console output failed");
        }
    }
}

impl fmt::Debug for Uart {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Uart")
            .field("name", &self.name)
            .field("addresses", &self.addresses)
            .field("pending", &self.rx.lock().len())
            .finish_non_exhaustive()
    }
}

impl BusDevice for Uart {
    fn name(&self) -> &str {
        &self.name
    }

    fn has_address(&self, addr: Address) -> bool {
        self.enabler.is_enabled() && self.addresses.contains(addr)
    }

    fn read(&mut self, addr: Address) -> Result<u8, SimError> {
        if !self.has_address(addr) {
            return Err(SimError::invalid_address(&self.name, addr));
        }
        if addr == self.addresses.data_read {
            if let Some(byte) = self.rx.lock().pop_front() {
                return Ok(if byte == b'\n' { b'\r' } else { byte });
            }
        }
        if addr == self.addresses.control_read {
            let mut status = TX_READY;
            if !self.rx.lock().is_empty() {
                status |= RX_READY;
            }
            return Ok(status);
        }
        Ok(0)
    }

    fn write(&mut self, addr: Address, value: u8) -> Result<(), SimError> {
        if !self.has_address(addr) {
            return Err(SimError::invalid_address(&self.name, addr));
        }
        if addr == self.addresses.data_write {
            self.transmit(value);
        }
        Ok(())
    }
}

/// Producer side of a console's receive queue.
#[derive(Debug, Clone)]
pub struct UartInput {
    rx: RxQueue,
}

impl UartInput {
    /// Queues one received byte.
    pub fn push(&self, byte: u8) {
        self.rx.lock().push_back(byte);
    }

    /// Queues every byte of `bytes` in order.
    pub fn push_all(&self, bytes: &[u8]) {
        self.rx.lock().extend(bytes.iter().copied());
    }

    /// Number of bytes waiting for the guest.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.rx.lock().len()
    }

    /// Feeds bytes from `reader` until end of input or cancellation.
    ///
    /// [`CTRL_C`] raises `cancel` and is still queued. The flag is checked
    /// once per byte, so a reader blocked on input only notices cancellation
    /// when its next byte arrives.
    ///
    /// # Errors
    ///
    /// Returns the first read error.
    pub fn pump<R: Read>(&self, mut reader: R, cancel: &CancelFlag) -> io::Result<()> {
        let mut byte = [0u8; 1];
        while !cancel.is_cancelled() {
            match reader.read(&mut byte) {
                Ok(0) => {
                    debug!("console input closed");
                    return Ok(());
                }
                Ok(_) => {
                    if byte[0] == CTRL_C {
                        debug!("ctrl-c on console");
                        cancel.cancel();
                    }
                    self.push(byte[0]);
                }
                Err(error) if error.kind() == io::ErrorKind::Interrupted => {}
                Err(error) => return Err(error),
            }
        }
        Ok(())
    }

    /// Runs [`UartInput::pump`] on a new thread.
    #[must_use]
    pub fn spawn_reader<R>(self, reader: R, cancel: CancelFlag) -> JoinHandle<io::Result<()>>
    where
        R: Read + Send + 'static,
    {
        thread::spawn(move || self.pump(reader, &cancel))
    }
}
