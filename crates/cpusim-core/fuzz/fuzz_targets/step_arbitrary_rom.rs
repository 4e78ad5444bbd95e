#![no_main]

use cpusim_core::{
    disassemble_listing, Bus, Bus8Bit, Cpu, Cpu4004, Cpu8008, DeviceKind, DipSwitch, Enabler,
    Isa, MemoryDevice, RomPort,
};
use libfuzzer_sys::fuzz_target;

const MAX_STEPS: u64 = 512;

fn run_4004(rom: &[u8]) {
    let mut cpu = Cpu4004::new("cpu");
    let mut program = MemoryDevice::new("rom", DeviceKind::Rom, 0, 0x0FFF, true, Enabler::Always);
    program.load(rom);
    let ram = MemoryDevice::new("ram", DeviceKind::Ram, 0, 0x3F, false, cpu.dcl_enabler(0))
        .with_status(0x40);
    let mut io = Bus8Bit::new("bus8", cpu.dcl_enabler(4));
    io.attach(DipSwitch::new("switches", 0xE0, 0xA5, Enabler::Always));
    let mut ports = RomPort::new("rom-io", Enabler::Always);
    ports.attach(MemoryDevice::new("latches", DeviceKind::Port, 0, 0x0F, false, Enabler::Always));

    let mut bus = Bus::new();
    bus.add_memory(program);
    bus.add_memory(ram);
    bus.add_memory(io);
    bus.add_memory(ports);
    let _ = cpu.run_steps(&mut bus, MAX_STEPS);
}

fn run_8008(rom: &[u8]) {
    let mut cpu = Cpu8008::new("cpu");
    let mut ram = MemoryDevice::new("ram", DeviceKind::Ram, 0, 0x3FFF, false, Enabler::Always);
    ram.load(rom);
    let mut bus = Bus::new();
    bus.add_memory(ram);
    bus.add_port(DipSwitch::new("switches", 0x00, 0xFF, Enabler::Always));
    let _ = cpu.run_steps(&mut bus, MAX_STEPS);
}

fuzz_target!(|data: &[u8]| {
    let Some((&selector, rom)) = data.split_first() else {
        return;
    };
    if selector & 1 == 0 {
        let _ = disassemble_listing(Isa::I4004, rom, 0, 64);
        run_4004(rom);
    } else {
        let _ = disassemble_listing(Isa::I8008, rom, 0, 64);
        run_8008(rom);
    }
});
