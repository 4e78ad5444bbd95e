//! Command-line runner for the reference 4004 and 8008 boards.

use std::fs;
use std::io::{self, IsTerminal};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use cpusim_core::{
    build_4004, build_8008, disassemble_listing, BoardConfig4004, BoardConfig8008, CpuExit,
    DisassemblyRow, Isa, Simulator, StopReason, TracingSink, UartInput,
};
#[cfg(test)]
use tempfile as _;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// CPU variant; each one comes with its own board wiring.
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum CpuKind {
    /// 8-bit 8008 board with the 74LS670 bank mapper.
    #[value(name = "8008")]
    I8008,
    /// 4-bit 4004 board with the console on the RAM status lanes.
    #[value(name = "4004")]
    I4004,
}

impl CpuKind {
    const fn isa(self) -> Isa {
        match self {
            Self::I8008 => Isa::I8008,
            Self::I4004 => Isa::I4004,
        }
    }
}

#[derive(Parser, Debug)]
#[command(
    name = "cpusim",
    version,
    about = "Run a ROM image on a 4004 or 8008 single-board computer."
)]
struct Args {
    /// CPU variant to simulate.
    #[arg(value_enum)]
    cpu: CpuKind,

    /// ROM image loaded at address 0.
    #[arg(short = 'f', long, value_name = "PATH")]
    rom_file: PathBuf,

    /// Trace every instruction and raise the default log level to trace.
    #[arg(short, long)]
    debug: bool,

    /// Leave the terminal in line mode.
    #[arg(long)]
    no_raw: bool,

    /// Print the first N instructions of the image instead of running it.
    #[arg(long, value_name = "N")]
    disassemble: Option<usize>,
}

/// Raw terminal mode for the lifetime of the value.
struct RawTerminal {
    active: bool,
}

impl RawTerminal {
    fn enter(enable: bool) -> Result<Self> {
        if enable {
            crossterm::terminal::enable_raw_mode().context("failed to enable raw terminal mode")?;
        }
        Ok(Self { active: enable })
    }
}

impl Drop for RawTerminal {
    fn drop(&mut self) {
        if self.active {
            if let Err(error) = crossterm::terminal::disable_raw_mode() {
                warn!(%error, "failed to restore terminal mode");
            }
        }
    }
}

fn init_logging(debug: bool) {
    let default_level = if debug { "trace" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn load_rom(path: &Path) -> Result<Vec<u8>> {
    let image = fs::read(path)
        .with_context(|| format!("failed to load ROM file '{}'", path.display()))?;
    info!(path = %path.display(), bytes = image.len(), "rom image read");
    Ok(image)
}

fn build_board(cpu: CpuKind, rom: &[u8]) -> (Simulator, UartInput) {
    match cpu {
        CpuKind::I8008 => build_8008(&BoardConfig8008::default(), rom, None),
        CpuKind::I4004 => build_4004(&BoardConfig4004::default(), rom, None),
    }
}

fn listing_line(row: &DisassemblyRow) -> String {
    let bytes = row
        .raw_bytes
        .iter()
        .map(|b| format!("{b:02X}"))
        .collect::<Vec<_>>()
        .join(" ");
    format!("{:04X}: {bytes:<9} {}", row.addr_start, row.text())
}

fn report(exits: Vec<CpuExit>) -> Result<()> {
    for exit in exits {
        let outcome = exit
            .result
            .with_context(|| format!("cpu {} stopped", exit.name))?;
        match outcome.stop {
            StopReason::Halted => info!(cpu = %exit.name, steps = outcome.steps, "halted"),
            StopReason::Cancelled => info!(cpu = %exit.name, steps = outcome.steps, "interrupted"),
            StopReason::StepLimit => {}
        }
    }
    Ok(())
}

fn run(args: &Args) -> Result<()> {
    let rom = load_rom(&args.rom_file)?;

    if let Some(count) = args.disassemble {
        for row in disassemble_listing(args.cpu.isa(), &rom, 0, count) {
            println!("{}", listing_line(&row));
        }
        return Ok(());
    }

    let (mut sim, input) = build_board(args.cpu, &rom);
    if args.debug {
        for cpu in sim.cpus_mut() {
            cpu.set_trace_sink(Some(Box::new(TracingSink)));
        }
    }

    let _terminal = RawTerminal::enter(!args.no_raw && io::stdin().is_terminal())?;
    // The reader blocks on stdin and is left behind once the CPUs stop.
    let _reader = input.spawn_reader(io::stdin(), sim.cancel_flag());
    report(sim.start().join())
}

fn main() -> ExitCode {
    let args = Args::parse();
    init_logging(args.debug);

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            eprintln!("error: {error:#}");
            ExitCode::FAILURE
        }
    }
}
