//! Instruction throughput of both engines on tight loops.
//!
//! ```sh
//! cargo run --release -p cpusim-core --example throughput
//! ```
//!
//! Each benchmark runs one CPU per thread against its own bus and reports
//! aggregate instructions per second next to the original parts' speeds.

#![allow(clippy::pedantic)]

use cpusim_core::{Bus, Cpu, Cpu4004, Cpu8008, DeviceKind, Enabler, MemoryDevice};
use parking_lot as _;
use proptest as _;
use rstest as _;
#[cfg(feature = "serde")]
use serde as _;
use thiserror as _;
use tracing as _;

use std::sync::mpsc;
use std::thread;
use std::time::{Duration, Instant};

const NUM_THREADS: usize = 4;
const SLICE_STEPS: u64 = 10_000;

/// INC R0 ; ISZ R1, 00h ; JUN 000h
const LOOP_4004: [u8; 5] = [0x60, 0x71, 0x00, 0x40, 0x00];
/// Instructions per second of a 740 kHz 4004 (8 clocks per cycle, 1-2 cycles each).
const NATIVE_4004: f64 = 92_500.0;

/// INR B ; ADD B ; JMP 0000h
const LOOP_8008: [u8; 5] = [0x08, 0x81, 0x44, 0x00, 0x00];
/// Rough instructions per second of a 500 kHz 8008.
const NATIVE_8008: f64 = 50_000.0;

#[derive(Debug, Clone, Copy)]
struct BenchmarkResult {
    name: &'static str,
    instructions_per_second: f64,
    native_multiple: f64,
}

fn rom_bus(image: &[u8]) -> Bus {
    let mut rom = MemoryDevice::new("rom", DeviceKind::Rom, 0, 0x0FFF, true, Enabler::Always);
    rom.load(image);
    let mut bus = Bus::new();
    bus.add_memory(rom);
    bus
}

fn benchmark<C, F>(name: &'static str, image: &'static [u8], native: f64, make: F, duration: Duration) -> BenchmarkResult
where
    C: Cpu,
    F: Fn() -> C + Send + Copy + 'static,
{
    let (tx, rx) = mpsc::channel();

    let handles: Vec<_> = (0..NUM_THREADS)
        .map(|_| {
            let tx = tx.clone();
            thread::spawn(move || {
                let mut cpu = make();
                let mut bus = rom_bus(image);
                let mut total = 0u64;
                let start = Instant::now();
                while start.elapsed() < duration {
                    match cpu.run_steps(&mut bus, SLICE_STEPS) {
                        Ok(outcome) => total += outcome.steps,
                        Err(_) => break,
                    }
                }
                tx.send(total).ok();
            })
        })
        .collect();

    for h in handles {
        h.join().ok();
    }
    drop(tx);

    let total: u64 = rx.iter().sum();
    let instructions_per_second = total as f64 / duration.as_secs_f64();
    BenchmarkResult {
        name,
        instructions_per_second,
        native_multiple: instructions_per_second / (native * NUM_THREADS as f64),
    }
}

fn run_all(duration: Duration) -> [BenchmarkResult; 2] {
    [
        benchmark("4004_loop", &LOOP_4004, NATIVE_4004, || Cpu4004::new("cpu"), duration),
        benchmark("8008_loop", &LOOP_8008, NATIVE_8008, || Cpu8008::new("cpu"), duration),
    ]
}

fn main() {
    let warmup = Duration::from_millis(300);
    let duration = Duration::from_secs(2);

    println!("Running warmup for {warmup:?}...");
    let _ = run_all(warmup);
    println!("Running benchmarks for {duration:?} each on {NUM_THREADS} threads...\n");

    println!("{:12} | {:>15} | {:>12}", "Benchmark", "Instr/sec", "x native");
    for result in run_all(duration) {
        println!(
            "{:12} | {:>15.0} | {:>12.1}",
            result.name, result.instructions_per_second, result.native_multiple
        );
    }
}
