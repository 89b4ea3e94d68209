//! Error taxonomy for the engine.
//!
//! `VmError` is the adapter's own error type (§4.1 of the design); every
//! other engine operation folds it into `EngineError`, which is the one
//! error type the rest of this crate's public API returns. Callers match on
//! `EngineError`'s variants rather than catching a single opaque failure.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised by the `ScriptVm` adapter itself.
#[derive(Debug, Error)]
pub enum VmError {
    #[error("could not read script file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("script failed to compile in env '{env}': {message}")]
    Compile { env: String, message: String },
    #[error("script raised an error in env '{env}': {message}")]
    Runtime { env: String, message: String },
}

impl VmError {
    pub(crate) fn from_lua(env: &str, err: mlua::Error) -> Self {
        match err {
            mlua::Error::SyntaxError { message, .. } => Self::Compile { env: env.to_string(), message },
            other => Self::Runtime { env: env.to_string(), message: other.to_string() },
        }
    }
}

/// The full error taxonomy surfaced by `Engine` and `Page` operations.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("could not read {path}: {source}")]
    Load {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("script failed to compile in env '{env}': {message}")]
    ScriptCompile { env: String, message: String },

    #[error("script raised an error in env '{env}': {message}")]
    ScriptRuntime { env: String, message: String },

    #[error("page '{page}' does not have a valid config/story/actions shape: {reason}")]
    PageShape { page: String, reason: String },

    #[error(transparent)]
    Parse(#[from] adventure_parser::ParseError),

    #[error("page '{0}' is not loaded")]
    UnknownPage(String),

    #[error("action '{action}' is not present on page '{page}'")]
    UnknownAction { page: String, action: String },

    #[error("condition for action '{0}' was not met")]
    ConditionNotMet(String),

    #[error("{context}: expected {expected}, found {found}")]
    TypeError {
        context: String,
        expected: &'static str,
        found: String,
    },
}

impl From<VmError> for EngineError {
    fn from(err: VmError) -> Self {
        match err {
            VmError::Io { path, source } => Self::Load { path, source },
            VmError::Compile { env, message } => Self::ScriptCompile { env, message },
            VmError::Runtime { env, message } => Self::ScriptRuntime { env, message },
        }
    }
}
