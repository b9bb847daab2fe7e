use std::fmt::{self, Display, Formatter};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    Validation(String),
    Command(String),
    Timeout(String),
    Cancelled(String),
}

impl Display for CoreError {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        match self {
            CoreError::Validation(s) => write!(f, "{}", s),
            CoreError::Command(s) => write!(f, "Command failed: {}", s),
            CoreError::Timeout(s) => write!(f, "Command timed out: {}", s),
            CoreError::Cancelled(s) => write!(f, "Command cancelled: {}", s),
        }
    }
}

pub type Result<T> = std::result::Result<T, CoreError>;
