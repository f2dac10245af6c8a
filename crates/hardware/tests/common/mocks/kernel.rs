use accelsim_core::engine::{Stage, StageKernel, Step, Token};
use mockall::mock;

mock! {
    pub Kernel {}
    impl StageKernel for Kernel {
        fn step(&mut self, token: &Token, targets: &[Stage]) -> Step;
    }
}
