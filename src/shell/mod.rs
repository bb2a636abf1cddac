//! Host program execution and environment detection.

pub mod command;
pub mod platform;

pub use command::{
    command_line, execute, execute_interactive, execute_quiet, CommandOptions, CommandResult,
};
pub use platform::{is_ci, stdin_is_terminal, terminal_size};
