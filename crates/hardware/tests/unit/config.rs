//! # Configuration Tests
//!
//! Defaults, JSON deserialization, file loading and build-time validation.

use accelsim_core::common::ConfigError;
use accelsim_core::config::*;
use pretty_assertions::assert_eq;
use rstest::rstest;
use std::io::Write;

// ══════════════════════════════════════════════════════════
// 1. Defaults
// ══════════════════════════════════════════════════════════

#[test]
fn test_config_default() {
    let config = Config::default();
    assert_eq!(config.clocks.host_period, 500);
    assert_eq!(config.clocks.engine_period, 1000);
    assert_eq!(config.clocks.memory_period, 500);
    assert_eq!(config.lanes.len(), 1);
    assert_eq!(config.rob.capacity, 64);
    assert!(config.validate().is_ok());
}

#[test]
fn test_engine_config_defaults() {
    let engine = EngineConfig::default();
    assert_eq!(engine.base_addr, 0xE_0000_0000);
    assert_eq!(engine.num_callers, 64);
    assert_eq!(engine.regs_per_caller, 8);
    assert_eq!(engine.mem_ports, 1);
    assert_eq!(engine.fifo_capacity, 64);
    assert_eq!(engine.stride(), 64);
    let window = engine.window().unwrap();
    assert_eq!(window.base(), 0xE_0000_0000);
    assert_eq!(window.size(), 65 * 64);
}

#[test]
fn test_lane_config_default_is_single_edge() {
    let lane = LaneConfig::default();
    assert_eq!(lane.kind, LaneKindConfig::Simple);
    assert_eq!(lane.capacity, 1);
    assert_eq!(lane.transition_from_stage, vec![0]);
    assert_eq!(lane.transition_to_stage, vec![1]);
    assert_eq!(lane.transition_latency, vec![1]);
}

#[test]
fn test_async_fifo_and_memory_defaults() {
    let fifo = AsyncFifoConfig::default();
    assert_eq!(fifo.stage, 2);
    assert_eq!(fifo.capacity, 64);
    assert!(!fifo.snooping);
    assert_eq!(fifo.snoop_capacity, 8);

    let memory = MemoryConfig::default();
    assert_eq!(memory.controller, MemoryController::Simple);
    assert_eq!(memory.latency, 10);
    assert_eq!((memory.t_cas, memory.t_ras, memory.t_pre), (14, 14, 14));
}

// ══════════════════════════════════════════════════════════
// 2. JSON
// ══════════════════════════════════════════════════════════

#[test]
fn test_json_partial_override() {
    let json = r#"{
        "engine": { "num_callers": 4 },
        "lanes": [
            {
                "name": "fetch",
                "kind": "pipelined",
                "interval": 2,
                "capacity": 4,
                "transition_from_stage": [0, 1],
                "transition_to_stage": [1, 2],
                "transition_latency": [3, 5]
            }
        ],
        "memory": { "controller": "DRAM" }
    }"#;
    let config = Config::from_json(json).unwrap();
    assert_eq!(config.engine.num_callers, 4);
    assert_eq!(config.engine.regs_per_caller, 8);
    assert_eq!(config.lanes[0].name, "fetch");
    assert_eq!(config.lanes[0].kind, LaneKindConfig::Pipelined);
    assert_eq!(config.lanes[0].transition_latency, vec![3, 5]);
    assert_eq!(config.memory.controller, MemoryController::Dram);
    assert!(config.validate().is_ok());
}

#[test]
fn test_json_syntax_error_is_parse_error() {
    assert!(matches!(
        Config::from_json("{ \"rob\": "),
        Err(ConfigError::Parse(_))
    ));
}

#[test]
fn test_json_unknown_lane_kind_is_parse_error() {
    let json = r#"{ "lanes": [ { "kind": "superscalar" } ] }"#;
    assert!(matches!(Config::from_json(json), Err(ConfigError::Parse(_))));
}

#[test]
fn test_from_file_reads_json() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(file, r#"{{ "rob": {{ "capacity": 2 }}, "async_fifo": {{ "snooping": true }} }}"#).unwrap();
    let config = Config::from_file(file.path()).unwrap();
    assert_eq!(config.rob.capacity, 2);
    assert!(config.async_fifo.snooping);
}

#[test]
fn test_from_file_missing_path_is_parse_error() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("absent.json");
    assert!(matches!(Config::from_file(&missing), Err(ConfigError::Parse(_))));
}

// ══════════════════════════════════════════════════════════
// 3. Validation
// ══════════════════════════════════════════════════════════

fn lane(from: Vec<u32>, to: Vec<u32>, latency: Vec<u64>) -> LaneConfig {
    LaneConfig {
        name: "l".to_owned(),
        transition_from_stage: from,
        transition_to_stage: to,
        transition_latency: latency,
        ..LaneConfig::default()
    }
}

#[rstest]
#[case::length_mismatch(lane(vec![0, 1], vec![1], vec![1, 1]))]
#[case::latency_short(lane(vec![0, 1], vec![1, 2], vec![1]))]
#[case::zero_latency(lane(vec![0], vec![1], vec![0]))]
#[case::duplicate_edge(lane(vec![0, 0], vec![1, 1], vec![1, 2]))]
fn test_bad_transition_tables_rejected(#[case] bad: LaneConfig) {
    let config = Config {
        lanes: vec![bad],
        ..Config::default()
    };
    assert!(config.validate().is_err());
}

#[test]
fn test_length_mismatch_reports_lengths() {
    let err = lane(vec![0, 1], vec![1], vec![1, 1]).validate().unwrap_err();
    assert!(matches!(
        err,
        ConfigError::TransitionLengthMismatch {
            from: 2,
            to: 1,
            latency: 2,
            ..
        }
    ));
}

#[rstest]
#[case::no_lanes(Config { lanes: vec![], ..Config::default() }, ConfigError::NoLanes)]
#[case::zero_rob(
    Config { rob: RobConfig { capacity: 0 }, ..Config::default() },
    ConfigError::ZeroCapacity { what: "reorder buffer".to_owned() }
)]
#[case::zero_callers(
    Config { engine: EngineConfig { num_callers: 0, ..EngineConfig::default() }, ..Config::default() },
    ConfigError::ZeroParameter { what: "engine.num_callers".to_owned() }
)]
#[case::few_regs(
    Config { engine: EngineConfig { regs_per_caller: 2, ..EngineConfig::default() }, ..Config::default() },
    ConfigError::TooSmall { what: "engine.regs_per_caller".to_owned(), min: 3, value: 2 }
)]
#[case::zero_engine_fifo(
    Config { engine: EngineConfig { fifo_capacity: 0, ..EngineConfig::default() }, ..Config::default() },
    ConfigError::ZeroCapacity { what: "engine.fifo_capacity".to_owned() }
)]
#[case::zero_stage(
    Config { async_fifo: AsyncFifoConfig { stage: 0, ..AsyncFifoConfig::default() }, ..Config::default() },
    ConfigError::ZeroParameter { what: "async_fifo.stage".to_owned() }
)]
fn test_invalid_config_reports_error(#[case] config: Config, #[case] expected: ConfigError) {
    assert_eq!(config.validate(), Err(expected));
}

#[test]
fn test_zero_lane_capacity_rejected() {
    let mut bad = LaneConfig::default();
    bad.capacity = 0;
    assert!(matches!(bad.validate(), Err(ConfigError::ZeroCapacity { .. })));
}

#[test]
fn test_window_overflow_rejected() {
    let engine = EngineConfig {
        base_addr: u64::MAX - 64,
        ..EngineConfig::default()
    };
    assert!(matches!(engine.window(), Err(ConfigError::RangeOverflow { .. })));
}
