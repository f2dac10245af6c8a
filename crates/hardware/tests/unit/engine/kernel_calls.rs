//! Kernel consultation tests using a mocked `StageKernel`.
//!
//! The kernel is asked exactly once per stage entry, with the stage's sorted targets.

use crate::common::builder::lane::LaneBuilder;
use crate::common::mocks::kernel::MockKernel;
use accelsim_core::engine::{NullSink, Payload, Step};
use mockall::Sequence;

#[test]
fn kernel_called_once_per_stage_entry() {
    let mut lane = LaneBuilder::new("m").edge(0, 2, 1).edge(0, 1, 4).build();
    let mut kernel = MockKernel::new();
    let mut seq = Sequence::new();
    let _ = kernel
        .expect_step()
        .withf(|token, targets| token.stage() == 0 && targets == [1, 2])
        .times(1)
        .in_sequence(&mut seq)
        .returning(|_, _| Step::goto(2));
    let _ = kernel
        .expect_step()
        .withf(|token, targets| token.stage() == 2 && targets.is_empty())
        .times(1)
        .in_sequence(&mut seq)
        .returning(|_, _| Step::exit());

    let _ = lane.admit(Payload::default(), 0).unwrap();
    assert!(lane.advance(0, &mut kernel, &mut NullSink).unwrap().is_empty());
    let retired = lane.advance(1, &mut kernel, &mut NullSink).unwrap();
    assert_eq!(retired.len(), 1);
    assert_eq!(retired[0].stage(), 2);
}

#[test]
fn kernel_not_called_while_counting_down() {
    let mut lane = LaneBuilder::new("m").edge(0, 1, 10).build();
    let mut kernel = MockKernel::new();
    let _ = kernel
        .expect_step()
        .times(1)
        .returning(|_, _| Step::goto(1));

    let _ = lane.admit(Payload::default(), 0).unwrap();
    for cycle in 0..10 {
        assert!(lane.advance(cycle, &mut kernel, &mut NullSink).unwrap().is_empty());
    }
    kernel.checkpoint();
}
