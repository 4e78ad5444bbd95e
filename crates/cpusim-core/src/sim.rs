//! Simulation context: bus, CPUs and the shared cancellation flag.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::{Bus, Cpu, RunOutcome, SimError, StepOutcome, StopReason};

/// Cooperative cancellation flag shared by CPU and console threads.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag {
    raised: Arc<AtomicBool>,
}

impl CancelFlag {
    /// Creates a lowered flag.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Raises the flag. Every holder observes it at its next check.
    pub fn cancel(&self) {
        self.raised.store(true, Ordering::Relaxed);
    }

    /// Returns true once the flag has been raised.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.raised.load(Ordering::Relaxed)
    }
}

/// Final report of one CPU thread.
#[derive(Debug)]
pub struct CpuExit {
    /// CPU name.
    pub name: String,
    /// How the run loop ended.
    pub result: Result<RunOutcome, SimError>,
}

/// An assembled machine ready to run.
pub struct Simulator {
    bus: Bus,
    cpus: Vec<Box<dyn Cpu>>,
    cancel: CancelFlag,
}

impl Simulator {
    /// Wraps an assembled bus with no CPUs yet.
    #[must_use]
    pub fn new(bus: Bus) -> Self {
        Self {
            bus,
            cpus: Vec::new(),
            cancel: CancelFlag::new(),
        }
    }

    /// Adds a CPU. Each CPU gets its own thread on [`Simulator::start`].
    pub fn add_cpu(&mut self, cpu: impl Cpu + 'static) {
        self.cpus.push(Box::new(cpu));
    }

    /// Shared bus.
    #[must_use]
    pub const fn bus(&self) -> &Bus {
        &self.bus
    }

    /// Shared bus, mutably, for wiring or pre-run pokes.
    pub fn bus_mut(&mut self) -> &mut Bus {
        &mut self.bus
    }

    /// Registered CPUs.
    pub fn cpus_mut(&mut self) -> &mut [Box<dyn Cpu>] {
        &mut self.cpus
    }

    /// Handle to the cancellation flag checked by every run loop.
    #[must_use]
    pub fn cancel_flag(&self) -> CancelFlag {
        self.cancel.clone()
    }

    /// Runs the first CPU on the calling thread.
    ///
    /// Returns `None` when no CPU is registered.
    ///
    /// # Errors
    ///
    /// Returns the error that stopped the CPU.
    pub fn run(&mut self) -> Option<Result<RunOutcome, SimError>> {
        let cancel = self.cancel.clone();
        let bus = &mut self.bus;
        self.cpus.first_mut().map(|cpu| cpu.run(bus, &cancel))
    }

    /// Spawns one thread per CPU.
    ///
    /// The bus sits behind one mutex taken for the duration of each
    /// instruction, so a lone CPU never contends for it.
    #[must_use]
    pub fn start(self) -> SimHandle {
        let bus = Arc::new(Mutex::new(self.bus));
        let threads = self
            .cpus
            .into_iter()
            .map(|mut cpu| {
                let bus = Arc::clone(&bus);
                let cancel = self.cancel.clone();
                thread::spawn(move || {
                    info!(cpu = cpu.name(), pc = cpu.pc(), "cpu started");
                    let result = run_shared(cpu.as_mut(), &bus, &cancel);
                    CpuExit {
                        name: cpu.name().to_owned(),
                        result,
                    }
                })
            })
            .collect();
        SimHandle {
            bus,
            threads,
            cancel: self.cancel,
        }
    }
}

fn run_shared(cpu: &mut dyn Cpu, bus: &Mutex<Bus>, cancel: &CancelFlag) -> Result<RunOutcome, SimError> {
    let mut steps = 0u64;
    loop {
        if cancel.is_cancelled() {
            debug!(cpu = cpu.name(), steps, "run cancelled");
            return Ok(RunOutcome {
                steps,
                stop: StopReason::Cancelled,
            });
        }
        let outcome = cpu.step(&mut bus.lock());
        match outcome {
            Ok(StepOutcome::Retired) => steps += 1,
            Ok(StepOutcome::Halted) => {
                info!(cpu = cpu.name(), steps, pc = cpu.pc(), "cpu halted");
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

/// Running simulation.
pub struct SimHandle {
    bus: Arc<Mutex<Bus>>,
    threads: Vec<JoinHandle<CpuExit>>,
    cancel: CancelFlag,
}

impl SimHandle {
    /// Asks every CPU to stop after its current instruction.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Shared bus, for inspection while or after the CPUs run.
    #[must_use]
    pub fn bus(&self) -> Arc<Mutex<Bus>> {
        Arc::clone(&self.bus)
    }

    /// Waits for every CPU thread and returns their reports in CPU order.
    ///
    /// A panic on a CPU thread is resumed on the caller.
    #[must_use]
    pub fn join(self) -> Vec<CpuExit> {
        self.threads
            .into_iter()
            .map(|thread| match thread.join() {
                Ok(exit) => exit,
                Err(panic) => std::panic::resume_unwind(panic),
            })
            .collect()
    }
}
