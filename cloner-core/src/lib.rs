pub mod command_stream;
pub mod error;
pub mod validation;

pub use command_stream::{is_tool_installed, run_command, run_command_quiet};
pub use error::{CoreError, Result};
pub use validation::validate_workspace_id;

// Re-exported so downstream crates share one token type with the runner.
pub use tokio_util::sync::CancellationToken;
