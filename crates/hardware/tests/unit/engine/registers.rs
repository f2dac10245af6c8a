//! Control-register window tests.
//!
//! Verifies the region layout, address round trips and the fatal decode errors.

use accelsim_core::common::{PhysAddr, SimError};
use accelsim_core::config::EngineConfig;
use accelsim_core::engine::{ControlWindow, Register};
use rstest::rstest;

const BASE: u64 = 0xE_0000_0000;

fn window() -> ControlWindow {
    ControlWindow::new(&EngineConfig {
        base_addr: BASE,
        num_callers: 4,
        regs_per_caller: 8,
        ..EngineConfig::default()
    })
    .unwrap()
}

#[test]
fn window_spans_callers_plus_global_region() {
    let w = window();
    assert_eq!(w.stride(), 64);
    assert_eq!(w.range().base(), BASE);
    assert_eq!(w.range().size(), 5 * 64);
}

#[rstest]
#[case(0x00, Register::Status)]
#[case(0x40, Register::Arg(0))]
#[case(0x48, Register::Addr(0))]
#[case(0x50, Register::Data(0))]
#[case(0x100, Register::Arg(3))]
#[case(0x110, Register::Data(3))]
fn decode_known_offsets(#[case] offset: u64, #[case] expected: Register) {
    let w = window();
    assert_eq!(w.decode(PhysAddr(BASE + offset)), Ok(expected));
    assert_eq!(w.address_of(expected), PhysAddr(BASE + offset));
}

#[rstest]
#[case::global_reg_1(0x08)]
#[case::misaligned(0x41)]
#[case::caller_reg_3(0x58)]
#[case::caller_last_reg(0x78)]
fn undefined_offsets_are_fatal(#[case] offset: u64) {
    let addr = BASE + offset;
    assert_eq!(
        window().decode(PhysAddr(addr)),
        Err(SimError::UndefinedRegister { addr })
    );
}

#[rstest]
#[case(BASE - 8)]
#[case(BASE + 5 * 64)]
fn addresses_outside_the_window(#[case] addr: u64) {
    assert_eq!(
        window().decode(PhysAddr(addr)),
        Err(SimError::OutsideWindow { addr })
    );
}
