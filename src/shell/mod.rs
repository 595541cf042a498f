//! Process execution, Ctrl-C handling and PATH utilities.

pub mod command;
pub mod fake;
pub mod interrupt;
pub mod platform;

pub use command::{CommandOutput, CommandSpec, ProcessRunner, SystemRunner, DEFAULT_TIMEOUT};
pub use fake::{FakeResponse, FakeRunner};
pub use interrupt::{install_handler, InterruptFlag};
pub use platform::{find_program, home_dir, is_ci, is_elevated};
