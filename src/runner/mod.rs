//! Step resolution and the run loop.

pub mod check;
pub mod resolver;
pub mod state;

pub use check::NO_CHECK;
pub use resolver::{clamp_exit_code, run_commands, Resolver, RunOutcome, MAX_EXIT_CODE};
pub use state::ResolutionState;
