pub mod cli;
pub mod config;
pub mod error;
pub mod routes;
pub mod state;
pub mod views;

pub use cli::Cli;
pub use config::{Config, ProgressMode};
pub use error::{ApiError, ApiResult, PageError};
pub use routes::create_app;
pub use state::{AppState, StreamSettings};
