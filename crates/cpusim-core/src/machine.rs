//! Reference single-board computers.
//!
//! Two boards are wired here: an 8008 board with a 74LS670 bank mapper in
//! front of 64 KiB of RAM and 64 KiB of ROM, and a 4004 board whose console
//! hangs off the RAM status lanes through a [`Bus8Bit`] adapter.

use std::io::Write;

use crate::mapper::DEST_LINES;
use crate::{
    Bus, Bus8Bit, Cpu4004, Cpu8008, DeviceKind, DipSwitch, EnableBit, Enabler, Map670,
    Map670Wiring, MemoryDevice, Simulator, Uart, UartAddresses, UartInput,
};

/// Transmit sink for the console; `None` means standard output.
pub type ConsoleOutput = Option<Box<dyn Write + Send>>;

/// Wiring of the 8008 board.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct BoardConfig8008 {
    /// First of the four mapper write ports.
    pub mapper_port: u16,
    /// Address bit where the page-register selector starts.
    pub mapper_source_bit: u8,
    /// Address lines rewritten from page-register bits 0-3.
    pub mapper_dest_bits: [u8; DEST_LINES],
    /// Page-register bit selecting RAM (set) or ROM (clear).
    pub ram_select_line: usize,
    /// Console ports.
    pub uart: UartAddresses,
    /// Port of the dip switch bank.
    pub dip_switch_port: u16,
    /// Value the dip switches read back.
    pub dip_switch_value: u8,
}

impl Default for BoardConfig8008 {
    fn default() -> Self {
        Self {
            mapper_port: 0x0C,
            mapper_source_bit: 12,
            mapper_dest_bits: [12, 13, 14, 15],
            ram_select_line: 7,
            uart: UartAddresses {
                data_read: 0x02,
                data_write: 0x12,
                control_read: 0x03,
                control_write: 0x13,
            },
            dip_switch_port: 0x00,
            // A low bit 0 aborts the monitor's memory dump.
            dip_switch_value: 0xFF,
        }
    }
}

/// Wiring of the 4004 board.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct BoardConfig4004 {
    /// Last ROM address.
    pub rom_end: u16,
    /// Last RAM address; every RAM cell carries status lanes.
    pub ram_end: u16,
    /// CL value selecting the RAM.
    pub ram_bank: u8,
    /// CL value selecting the 8-bit peripheral bus.
    pub io_bank: u8,
    /// Console ports on the 8-bit peripheral bus.
    pub uart: UartAddresses,
}

impl Default for BoardConfig4004 {
    fn default() -> Self {
        Self {
            rom_end: 0x3FFF,
            ram_end: 0x3F,
            ram_bank: 0,
            io_bank: 4,
            uart: UartAddresses {
                data_read: 0xE0,
                data_write: 0xE0,
                control_read: 0xE1,
                control_write: 0xE1,
            },
        }
    }
}

fn console(addresses: UartAddresses, output: ConsoleOutput) -> Uart {
    let uart = Uart::new("uart", addresses, Enabler::Always);
    match output {
        Some(output) => uart.with_output(output),
        None => uart,
    }
}

/// Assembles the 8008 board with `rom` loaded at ROM offset 0.
#[must_use]
pub fn build_8008(config: &BoardConfig8008, rom: &[u8], output: ConsoleOutput) -> (Simulator, UartInput) {
    let ram_select = EnableBit::new(false);
    let wiring = Map670Wiring::new(config.mapper_source_bit, config.mapper_dest_bits.map(Some))
        .with_latch(config.ram_select_line, ram_select.clone());
    let mapper = Map670::new("mapper", config.mapper_port, wiring, Enabler::Always);

    let ram = MemoryDevice::new("ram", DeviceKind::Ram, 0x0000, 0xFFFF, false, ram_select.high_enabler());
    let mut rom_device = MemoryDevice::new("rom", DeviceKind::Rom, 0x0000, 0xFFFF, true, ram_select.low_enabler());
    rom_device.load(rom);

    let uart = console(config.uart, output);
    let input = uart.input();

    let mut bus = Bus::new();
    bus.add_mapper(mapper.clone());
    bus.add_port(mapper);
    bus.add_memory(ram);
    bus.add_memory(rom_device);
    bus.add_port(uart);
    bus.add_port(DipSwitch::new(
        "dipswitch",
        config.dip_switch_port,
        config.dip_switch_value,
        Enabler::Always,
    ));

    let mut sim = Simulator::new(bus);
    sim.add_cpu(Cpu8008::new("cpu"));
    (sim, input)
}

/// Assembles the 4004 board with `rom` loaded at ROM offset 0.
#[must_use]
pub fn build_4004(config: &BoardConfig4004, rom: &[u8], output: ConsoleOutput) -> (Simulator, UartInput) {
    let cpu = Cpu4004::new("cpu");

    let mut rom_device = MemoryDevice::new("rom", DeviceKind::Rom, 0x0000, config.rom_end, true, Enabler::Always);
    rom_device.load(rom);
    let ram = MemoryDevice::new(
        "ram",
        DeviceKind::Ram,
        0x0000,
        config.ram_end,
        false,
        cpu.dcl_enabler(config.ram_bank),
    )
    .with_status(usize::from(config.ram_end) + 1);

    let uart = console(config.uart, output);
    let input = uart.input();
    let mut io = Bus8Bit::new("bus8", cpu.dcl_enabler(config.io_bank));
    io.attach(uart);

    let mut bus = Bus::new();
    bus.add_memory(rom_device);
    bus.add_memory(ram);
    bus.add_memory(io);

    let mut sim = Simulator::new(bus);
    sim.add_cpu(cpu);
    (sim, input)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{StopReason, TraceBuffer};

    #[test]
    fn default_8008_board_boots_from_rom() {
        // MVI A, 41h ; OUT 12h ; HLT
        let rom = [0x06, 0x41, 0x65, 0x00];
        let (mut sim, _input) = build_8008(&BoardConfig8008::default(), &rom, Some(Box::new(std::io::sink())));
        let outcome = sim.run().expect("cpu").expect("runs");
        assert_eq!(outcome.stop, StopReason::Halted);
        assert_eq!(outcome.steps, 2);
    }

    #[test]
    fn default_4004_board_halts() {
        let buffer = TraceBuffer::new();
        let (mut sim, _input) = build_4004(&BoardConfig4004::default(), &[0xD5, 0x01], Some(Box::new(std::io::sink())));
        sim.cpus_mut()[0].set_trace_sink(Some(Box::new(buffer.clone())));
        let outcome = sim.run().expect("cpu").expect("runs");
        assert_eq!(outcome.stop, StopReason::Halted);
        assert_eq!(buffer.lines().len(), 2);
    }

    #[test]
    fn configs_default_to_reference_wiring() {
        let board = BoardConfig8008::default();
        assert_eq!(board.uart.control_write, 0x13);
        assert_eq!(board.mapper_dest_bits, [12, 13, 14, 15]);
        let board = BoardConfig4004::default();
        assert_eq!((board.ram_bank, board.io_bank), (0, 4));
    }
}
