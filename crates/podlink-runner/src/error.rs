//! Runner errors.

use podlink_core::{ConfigError, ModuleError};
use thiserror::Error;

/// Errors that end a run.
#[derive(Debug, Error)]
pub enum RunnerError {
    /// Configuration could not be loaded.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// The command module failed to start.
    #[error("module error: {0}")]
    Module(#[from] ModuleError),
}
