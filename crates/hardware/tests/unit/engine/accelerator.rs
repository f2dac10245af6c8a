//! Engine tests.
//!
//! Drives an engine directly, playing the memory side by hand through the port buffers.

use crate::common::builder::lane::LaneBuilder;
use crate::common::harness::{init_tracing, load_kernel};
use accelsim_core::common::constants::{RETCODE_DEFAULT, RETCODE_RUNNING};
use accelsim_core::common::{ConfigError, SimError};
use accelsim_core::config::{EngineConfig, LaneConfig};
use accelsim_core::engine::{
    Dispatch, Engine, EngineBuilder, LinearKernel, MemRequest, MemResponse, Register, SeqNum,
    Stage, Stall, Step, Token,
};
use accelsim_core::soc::traits::ControlTarget;
use pretty_assertions::assert_eq;

fn default_lane() -> LaneConfig {
    LaneBuilder::new("l").edge(0, 1, 1).config()
}

fn simple_engine() -> Engine {
    init_tracing();
    EngineBuilder::new("engine")
        .lane(default_lane(), LinearKernel)
        .build()
        .unwrap()
}

fn load_engine(capacity: usize, ports: usize) -> Engine {
    init_tracing();
    EngineBuilder::new("engine")
        .mem_ports(ports)
        .lane_boxed(
            LaneBuilder::new("l").capacity(capacity).edge(0, 1, 1).config(),
            load_kernel(),
        )
        .build()
        .unwrap()
}

fn fifo_engine(fifo_capacity: usize) -> EngineBuilder {
    init_tracing();
    EngineBuilder::new("engine").engine_config(EngineConfig {
        fifo_capacity,
        ..EngineConfig::default()
    })
}

fn tick_range(engine: &mut Engine, cycles: std::ops::RangeInclusive<u64>) {
    for cycle in cycles {
        engine.tick(cycle).unwrap();
    }
}

/// Answers the request waiting on `port` with `data`.
fn respond(engine: &mut Engine, port: usize, data: u64) -> SeqNum {
    let slot = engine.port_mut(port).unwrap();
    let packet = slot.req_buf.take().expect("request waiting on port");
    slot.resp_buf = Some(MemResponse {
        seq: packet.seq,
        port,
        data,
    });
    packet.seq
}

// ══════════════════════════════════════════════════════════
// 1. Construction
// ══════════════════════════════════════════════════════════

#[test]
fn builder_requires_a_lane() {
    assert_eq!(EngineBuilder::new("e").build().unwrap_err(), ConfigError::NoLanes);
}

#[test]
fn builder_rejects_zero_ports_and_bad_tables() {
    let err = EngineBuilder::new("e")
        .mem_ports(0)
        .lane(default_lane(), LinearKernel)
        .build()
        .unwrap_err();
    assert!(matches!(err, ConfigError::ZeroParameter { .. }));

    let err = EngineBuilder::new("e")
        .lane(LaneBuilder::new("z").edge(0, 1, 0).config(), LinearKernel)
        .build()
        .unwrap_err();
    assert!(matches!(err, ConfigError::ZeroLatency { .. }));
}

#[test]
fn address_range_matches_configuration() {
    let engine = EngineBuilder::new("e")
        .engine_config(EngineConfig {
            base_addr: 0x4000_0000,
            num_callers: 2,
            regs_per_caller: 4,
            mem_ports: 1,
            fifo_capacity: 8,
        })
        .lane(default_lane(), LinearKernel)
        .build()
        .unwrap();
    assert_eq!(engine.address_range().base(), 0x4000_0000);
    assert_eq!(engine.address_range().size(), 3 * 32);
    assert_eq!(engine.num_callers(), 2);
    assert!(format!("{engine:?}").starts_with("Engine"));
}

// ══════════════════════════════════════════════════════════
// 2. Dispatch and results
// ══════════════════════════════════════════════════════════

#[test]
fn call_without_memory_posts_default_result() {
    let mut engine = simple_engine();
    let accepted = engine.dispatch(7, 0x5).unwrap();
    assert!(matches!(accepted, Dispatch::Accepted { call: 0, .. }));
    assert_eq!(engine.poll(7), Ok(None));

    tick_range(&mut engine, 0..=1);
    assert_eq!(engine.poll(7), Ok(Some(RETCODE_DEFAULT)));
    assert_eq!(engine.poll(7), Err(SimError::UnknownCaller { caller: 7 }));
    assert_eq!(engine.stats().finished, 1);
    assert_eq!(engine.stats().exectime.max, 1);
    assert!(!engine.is_busy());
}

#[test]
fn load_result_is_returned_to_the_caller() {
    let mut engine = load_engine(1, 1);
    assert!(matches!(
        engine.dispatch_with(0, 1, 0x100, 0).unwrap(),
        Dispatch::Accepted { .. }
    ));
    tick_range(&mut engine, 0..=1);
    assert_eq!(engine.rob().len(), 1);
    assert!(engine.ports()[0].req_buf.is_none());

    engine.tick(2).unwrap();
    let packet = engine.ports()[0].req_buf.unwrap();
    assert_eq!(packet.request, MemRequest::load(0x100));
    assert_eq!(respond(&mut engine, 0, 42), SeqNum(0));

    engine.tick(3).unwrap();
    assert_eq!(engine.poll(0), Ok(Some(42)));
    assert_eq!(engine.stats().mem_issued, 1);
    assert_eq!(engine.stats().mem_released, 1);
    assert_eq!(engine.stats().exectime.total, 3);
}

#[test]
fn out_of_order_responses_release_in_issue_order() {
    let mut engine = load_engine(2, 2);
    let _ = engine.dispatch_with(0, 0, 0x10, 0).unwrap();
    let _ = engine.dispatch_with(1, 0, 0x20, 0).unwrap();
    tick_range(&mut engine, 0..=2);
    assert_eq!(engine.ports()[0].req_buf.map(|p| p.seq), Some(SeqNum(0)));
    assert_eq!(engine.ports()[1].req_buf.map(|p| p.seq), Some(SeqNum(1)));

    let _ = respond(&mut engine, 1, 11);
    engine.tick(3).unwrap();
    assert_eq!(engine.stats().mem_released, 0);

    let _ = respond(&mut engine, 0, 10);
    engine.tick(4).unwrap();
    assert_eq!(engine.stats().finished, 1);
    engine.tick(5).unwrap();
    assert_eq!(engine.stats().finished, 2);
    assert_eq!(engine.poll(0), Ok(Some(10)));
    assert_eq!(engine.poll(1), Ok(Some(11)));
}

#[test]
fn posted_store_finishes_once_sent() {
    init_tracing();
    let kernel = |token: &Token, targets: &[Stage]| match targets.first() {
        Some(&to) if token.stage() == 0 => {
            Step::goto(to).with_request(MemRequest::posted_store(0x8, 3))
        }
        Some(&to) => Step::goto(to),
        None => Step::exit(),
    };
    let mut engine = EngineBuilder::new("e")
        .lane(default_lane(), kernel)
        .build()
        .unwrap();
    let _ = engine.dispatch(0, 0).unwrap();
    tick_range(&mut engine, 0..=2);
    assert_eq!(engine.stats().finished, 0);
    let packet = engine.port_mut(0).unwrap().req_buf.take().unwrap();
    assert!(packet.request.posted);
    engine.tick(3).unwrap();
    assert_eq!(engine.poll(0), Ok(Some(RETCODE_DEFAULT)));
}

// ══════════════════════════════════════════════════════════
// 3. Backpressure
// ══════════════════════════════════════════════════════════

#[test]
fn caller_id_outside_the_window_is_fatal() {
    let mut engine = EngineBuilder::new("e")
        .engine_config(EngineConfig {
            num_callers: 2,
            ..EngineConfig::default()
        })
        .lane(default_lane(), LinearKernel)
        .build()
        .unwrap();
    assert_eq!(
        engine.dispatch(1000, 0),
        Err(SimError::CallerOutOfRange {
            caller: 1000,
            num_callers: 2
        })
    );
    assert_eq!(
        engine.dispatch(2, 0),
        Err(SimError::CallerOutOfRange {
            caller: 2,
            num_callers: 2
        })
    );
    assert_eq!(engine.stats().rejected, 0);
    assert_eq!(engine.running_calls(), 0);

    assert!(matches!(engine.dispatch(1, 0), Ok(Dispatch::Accepted { call: 0, .. })));
}

#[test]
fn full_lane_rejects_dispatch() {
    let mut engine = simple_engine();
    assert!(matches!(engine.dispatch(0, 0), Ok(Dispatch::Accepted { .. })));
    assert_eq!(engine.dispatch(1, 0), Ok(Dispatch::Rejected(Stall::Full)));
    assert_eq!(engine.stats().rejected, 1);
    assert_eq!(engine.stats().stalls_full, 1);

    tick_range(&mut engine, 0..=1);
    assert!(matches!(engine.dispatch(1, 0), Ok(Dispatch::Accepted { .. })));
    assert_eq!(engine.stats().waittime.max, 1);
}

#[test]
fn slow_downstream_lane_pushes_back_to_dispatch() {
    // Lane b holds one token for 1000 cycles; the latch between a and b holds one more.
    let mut engine = fifo_engine(1)
        .lane(LaneBuilder::new("a").edge(0, 1, 1).config(), LinearKernel)
        .lane(LaneBuilder::new("b").edge(0, 1, 1000).config(), LinearKernel)
        .build()
        .unwrap();
    let mut accepted = Vec::new();
    for cycle in 0..200 {
        engine.begin_cycle(cycle);
        match engine.dispatch(0, cycle).unwrap() {
            Dispatch::Accepted { .. } => accepted.push(cycle),
            Dispatch::Rejected(stall) => assert_eq!(stall, Stall::Full, "cycle {cycle}"),
        }
        engine.tick(cycle).unwrap();
    }
    assert_eq!(accepted, vec![0, 2, 4]);
    assert_eq!(engine.running_calls(), 3);
    assert_eq!(engine.lanes()[0].occupancy(), 1);
    assert_eq!(engine.lanes()[1].occupancy(), 1);
    assert_eq!(engine.stats().rejected, 197);
    assert!(engine.stats().retire_stalls > 0);
}

#[test]
fn full_result_queue_holds_the_finishing_call() {
    let mut engine = fifo_engine(1)
        .lane(LaneBuilder::new("l").capacity(4).edge(0, 1, 1).config(), LinearKernel)
        .build()
        .unwrap();
    let _ = engine.dispatch(0, 0).unwrap();
    let _ = engine.dispatch(0, 0).unwrap();

    tick_range(&mut engine, 0..=1);
    assert_eq!(engine.stats().finished, 1);
    assert_eq!(engine.running_calls(), 1);
    assert_eq!(engine.lanes()[0].occupancy(), 1);

    engine.tick(2).unwrap();
    assert_eq!(engine.stats().finished, 1);
    assert_eq!(engine.lanes()[0].occupancy(), 1);
    assert_eq!(engine.stats().retire_stalls, 2);

    assert_eq!(engine.poll(0), Ok(Some(RETCODE_DEFAULT)));
    engine.tick(3).unwrap();
    assert_eq!(engine.stats().finished, 2);
    assert!(engine.lanes()[0].is_empty());
    assert_eq!(engine.poll(0), Ok(Some(RETCODE_DEFAULT)));
    assert_eq!(engine.active_callers(), 0);
}

#[test]
fn full_rob_stalls_the_issuing_token() {
    init_tracing();
    let mut engine = EngineBuilder::new("e")
        .rob_capacity(1)
        .lane_boxed(LaneBuilder::new("l").capacity(2).edge(0, 1, 1).config(), load_kernel())
        .build()
        .unwrap();
    let _ = engine.dispatch(0, 0).unwrap();
    let _ = engine.dispatch(1, 0).unwrap();
    tick_range(&mut engine, 0..=1);
    assert_eq!(engine.rob().len(), 1);
    assert_eq!(engine.stats().rob_full, 1);
    assert_eq!(engine.lanes()[0].occupancy(), 1);
}

// ══════════════════════════════════════════════════════════
// 4. Lane chaining
// ══════════════════════════════════════════════════════════

#[test]
fn tokens_walk_every_lane_and_wait_in_the_latch() {
    init_tracing();
    let mut engine = EngineBuilder::new("e")
        .lane(LaneBuilder::new("a").edge(0, 1, 2).config(), LinearKernel)
        .lane(LaneBuilder::new("b").edge(0, 1, 3).config(), LinearKernel)
        .build()
        .unwrap();
    let _ = engine.dispatch(0, 0).unwrap();
    tick_range(&mut engine, 0..=2);
    assert_eq!(engine.lanes()[0].occupancy(), 0);
    assert_eq!(engine.lanes()[1].occupancy(), 1);

    let _ = engine.dispatch(0, 0).unwrap();
    tick_range(&mut engine, 3..=4);
    assert_eq!(engine.lanes()[0].occupancy(), 0);
    assert_eq!(engine.lanes()[1].occupancy(), 1);
    assert!(engine.is_busy());

    tick_range(&mut engine, 5..=8);
    assert_eq!(engine.stats().finished, 2);
    assert_eq!(engine.stats().exectime.max, 6);
    assert_eq!(engine.stats().exectime.total, 5 + 6);
}

// ══════════════════════════════════════════════════════════
// 5. Control registers
// ══════════════════════════════════════════════════════════

#[test]
fn register_interface_dispatches_and_returns_results() {
    let mut engine = simple_engine();
    let window = *engine.control_window();
    let arg = window.address_of(Register::Arg(2));

    assert_eq!(engine.write_reg(window.address_of(Register::Addr(2)), 0x80), Ok(true));
    assert_eq!(engine.read_reg(window.address_of(Register::Addr(2))), Ok(0x80));
    assert_eq!(engine.read_reg(arg), Err(SimError::UnknownCaller { caller: 2 }));

    assert_eq!(engine.write_reg(arg, 9), Ok(true));
    assert_eq!(engine.lanes()[0].tokens().next().map(|t| t.payload().addr), Some(0x80));
    assert_eq!(engine.read_reg(window.address_of(Register::Status)), Ok(1));
    assert_eq!(engine.read_reg(arg), Ok(RETCODE_RUNNING));

    // Lane capacity is one, so a second caller is refused by backpressure.
    assert_eq!(engine.write_reg(window.address_of(Register::Arg(3)), 1), Ok(false));

    tick_range(&mut engine, 0..=1);
    assert_eq!(engine.read_reg(window.address_of(Register::Status)), Ok(0));
    assert_eq!(engine.read_reg(arg), Ok(RETCODE_DEFAULT));
}

#[test]
fn status_write_is_fatal() {
    let mut engine = simple_engine();
    let status = engine.control_window().address_of(Register::Status);
    assert_eq!(
        engine.write_reg(status, 1),
        Err(SimError::UndefinedRegister { addr: status.val() })
    );
}
