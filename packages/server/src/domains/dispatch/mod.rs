pub mod dispatcher;
pub mod eligibility;
pub mod ranking;

pub use dispatcher::{spawn_dispatch, DispatchOutcome, WaveDispatcher};
