// Handoff State Machine - READY/BLOCKED with guarded submit/ack/result transitions

pub mod state_machine;

pub use state_machine::{GuardFailure, HandoffMachine, TransitionResult};
