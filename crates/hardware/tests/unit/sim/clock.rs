//! Clock domain tests.

use accelsim_core::common::ConfigError;
use accelsim_core::sim::ClockDomain;
use pretty_assertions::assert_eq;
use proptest::prelude::*;
use rstest::rstest;

// ══════════════════════════════════════════════════════════
// 1. Construction
// ══════════════════════════════════════════════════════════

#[test]
fn zero_period_names_the_clock() {
    let err = ClockDomain::new("engine", 0).unwrap_err();
    assert_eq!(
        err,
        ConfigError::ZeroParameter {
            what: "period of clock `engine`".to_owned()
        }
    );
}

// ══════════════════════════════════════════════════════════
// 2. Edge arithmetic
// ══════════════════════════════════════════════════════════

#[rstest]
#[case(500, 0, 0, 0)]
#[case(500, 0, 3, 1500)]
#[case(500, 1, 0, 500)]
#[case(500, 500, 1, 1000)]
#[case(333, 1000, 0, 1332)]
fn clock_edge_rounds_up_then_adds_cycles(
    #[case] period: u64,
    #[case] tick: u64,
    #[case] n: u64,
    #[case] expected: u64,
) {
    let clock = ClockDomain::new("c", period).unwrap();
    assert_eq!(clock.clock_edge(tick, n), expected);
}

#[rstest]
#[case(1000, 500, 2)]
#[case(500, 1000, 1)]
#[case(1000, 300, 4)]
#[case(700, 700, 1)]
fn ratio_counts_whole_cycles_covering_the_other_period(
    #[case] other: u64,
    #[case] own: u64,
    #[case] expected: u64,
) {
    let own = ClockDomain::new("own", own).unwrap();
    let other = ClockDomain::new("other", other).unwrap();
    assert_eq!(own.ratio_ceil(&other), expected);
}

proptest! {
    #[test]
    fn clock_edge_is_the_nth_edge_at_or_after(
        period in 1u64..5_000,
        tick in 0u64..1_000_000,
        n in 0u64..16,
    ) {
        let clock = ClockDomain::new("c", period).unwrap();
        let edge = clock.clock_edge(tick, n);
        prop_assert!(clock.is_edge(edge));
        prop_assert!(edge >= tick + n * period);
        prop_assert!(edge < tick + (n + 1) * period);
    }

    #[test]
    fn cycles_and_ticks_round_trip(period in 1u64..5_000, cycle in 0u64..100_000) {
        let clock = ClockDomain::new("c", period).unwrap();
        prop_assert_eq!(clock.cycle_at(clock.ticks(cycle)), cycle);
        prop_assert_eq!(clock.cycle_at(clock.ticks(cycle) + period - 1), cycle);
    }
}
