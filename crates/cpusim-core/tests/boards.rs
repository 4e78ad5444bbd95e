//! Whole-board runs through the reference wiring.

#[cfg(feature = "serde")]
use serde as _;
use proptest as _;
use rstest as _;
use thiserror as _;
use tracing as _;

use std::io::{self, Write};
use std::sync::Arc;
use std::time::Duration;

use cpusim_core::{
    build_4004, build_8008, BoardConfig4004, BoardConfig8008, DeviceKind, StopReason,
};
use parking_lot::Mutex;

/// Console sink whose bytes stay readable after the board owns it.
#[derive(Clone, Default)]
struct Captured(Arc<Mutex<Vec<u8>>>);

impl Captured {
    fn bytes(&self) -> Vec<u8> {
        self.0.lock().clone()
    }
}

impl Write for Captured {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// LDM 4 ; DCL ; FIM P0, E0h ; SRC P0 ; RD0 ; XCH R2 ; RD1 ; WR1 ; LD R2 ; WR0 ; HLT
const ECHO_4004: [u8; 12] = [
    0xD4, 0xFD, 0x20, 0xE0, 0x21, 0xEC, 0xB2, 0xED, 0xE5, 0xA2, 0xE4, 0x01,
];

#[test]
fn echo_through_4004_status_lanes() {
    for (typed, echoed) in [(b'x', b'x'), (b'\n', b'\r')] {
        let console = Captured::default();
        let (mut sim, input) = build_4004(
            &BoardConfig4004::default(),
            &ECHO_4004,
            Some(Box::new(console.clone())),
        );
        input.push(typed);
        let outcome = sim.run().expect("cpu").expect("runs");
        assert_eq!(outcome.stop, StopReason::Halted);
        assert_eq!(console.bytes(), vec![echoed]);
        assert_eq!(input.pending(), 0);
    }
}

#[test]
fn echo_polls_8008_console() {
    let rom = [
        0x47, // wait: IN 3
        0x24, 0x02, // ANI 02h
        0x68, 0x00, 0x00, // JZ wait
        0x45, // IN 2
        0x65, // OUT 12h
        0x00,
    ];
    let console = Captured::default();
    let (mut sim, input) = build_8008(&BoardConfig8008::default(), &rom, Some(Box::new(console.clone())));
    input.push_all(b"ok");
    let outcome = sim.run().expect("cpu").expect("runs");
    assert_eq!(outcome.stop, StopReason::Halted);
    assert_eq!(console.bytes(), b"o");
    assert_eq!(input.pending(), 1);
}

#[test]
fn dip_switches_read_on_port_zero() {
    // IN 0 ; HLT
    let config = BoardConfig8008 {
        dip_switch_value: 0x5A,
        ..BoardConfig8008::default()
    };
    let (mut sim, _input) = build_8008(&config, &[0x41, 0x00], Some(Box::new(io::sink())));
    sim.run().expect("cpu").expect("runs");
    assert!(sim.cpus_mut()[0].to_string().starts_with("A=5A "));
}

#[test]
fn mapper_banks_ram_into_upper_window() {
    let rom = [
        0x06, 0x80, // MVI A, 80h
        0x5B, // OUT 0Dh: page register 1 selects RAM page 0
        0x2E, 0x10, 0x36, 0x05, // MVI H, 10h ; MVI L, 05h
        0x3E, 0x77, // MVI M, 77h
        0x00,
    ];
    let (mut sim, _input) = build_8008(&BoardConfig8008::default(), &rom, Some(Box::new(io::sink())));
    sim.run().expect("cpu").expect("runs");

    let bus = sim.bus_mut();
    assert_eq!(bus.read_memory(0x1005), Ok(0x77));
    // The same physical cell seen through page register 0 is ROM.
    assert_eq!(bus.read_memory(0x0005), Ok(0x36));
}

#[test]
fn writes_to_rom_through_the_mapper_are_rejected() {
    // MVI H, 00h ; MVI L, 20h ; MVI M, 01h
    let rom = [0x2E, 0x00, 0x36, 0x20, 0x3E, 0x01, 0x00];
    let (mut sim, _input) = build_8008(&BoardConfig8008::default(), &rom, Some(Box::new(io::sink())));
    let err = sim.run().expect("cpu").expect_err("rom is read only");
    assert_eq!(err.to_string(), "device rom: read only");
}

#[test]
fn threaded_board_stops_on_cancel() {
    // JMP 0000h
    let (sim, _input) = build_8008(&BoardConfig8008::default(), &[0x44, 0x00, 0x00], Some(Box::new(io::sink())));
    let handle = sim.start();
    std::thread::sleep(Duration::from_millis(20));
    handle.cancel();

    let bus = handle.bus();
    let exits = handle.join();
    assert_eq!(exits.len(), 1);
    let outcome = exits[0].result.as_ref().expect("no error");
    assert_eq!(outcome.stop, StopReason::Cancelled);
    assert!(outcome.steps > 0);

    let mut bus = bus.lock();
    bus.filter_kind(DeviceKind::Rom);
    assert_eq!(bus.read_memory(0x0000), Ok(0x44));
}
