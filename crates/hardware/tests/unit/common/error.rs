//! Error message tests.
//!
//! Runtime errors must name the offending sequence number, token or address.

use accelsim_core::common::{ConfigError, SimError};

#[test]
fn not_oldest_names_both_sequence_numbers() {
    let err = SimError::NotOldest {
        seq: 3,
        oldest: Some(1),
    };
    let text = err.to_string();
    assert!(text.contains('3'), "{text}");
    assert!(text.contains('1'), "{text}");
}

#[test]
fn unknown_transition_names_lane_and_token() {
    let err = SimError::UnknownTransition {
        lane: "compute".to_owned(),
        token: 17,
        from: 2,
        to: 9,
    };
    let text = err.to_string();
    assert!(text.contains("compute"));
    assert!(text.contains("17"));
    assert!(text.contains("2 -> 9"));
}

#[test]
fn undefined_register_prints_hex_address() {
    let err = SimError::UndefinedRegister { addr: 0xE_0000_0010 };
    assert!(err.to_string().contains("0xe00000010"));
}

#[test]
fn config_errors_compare_by_value() {
    let a = ConfigError::NoLanes;
    assert_eq!(a.clone(), ConfigError::NoLanes);
    assert_ne!(
        a,
        ConfigError::ZeroParameter {
            what: "x".to_owned()
        }
    );
}
