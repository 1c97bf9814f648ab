//! Command execution, interrupt handling and host platform detection.

pub mod command;
pub mod interrupt;
pub mod platform;

pub use command::{
    execute, execute_quiet, program_exists, CommandOptions, CommandResult, CommandSpec,
};
pub use interrupt::install_interrupt_handler;
pub use platform::{is_ci, is_elevated, OsRelease, OS_RELEASE};
