//! Error kinds of the evaluation engine and its drivers.

use thiserror::Error;

/// Errors raised while reading inputs, evaluating matrix elements or
/// dispatching work to the worker pool.
#[derive(Error, Debug)]
pub enum FmdError {
    /// Malformed or missing interaction, Slater determinant or run file.
    #[error("input error in {path}: {message}")]
    Input { path: String, message: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("yaml error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("formatting report: {0}")]
    Format(#[from] std::fmt::Error),

    /// The (cross-)overlap matrix of a determinant cannot be inverted reliably.
    ///
    /// `pair` names the two wave packets with the largest normalised overlap,
    /// which usually are the linearly dependent ones.
    #[error(
        "degenerate Slater determinant `{name}`: overlap condition number {condition:.3e}, \
         most parallel wave packets {pair:?}"
    )]
    DegenerateState {
        name: String,
        condition: f64,
        pair: (usize, usize),
    },

    #[error("parameter vector has {found} entries, parameterization expects {expected}")]
    ParameterMismatch { expected: usize, found: usize },

    #[error("worker pool: {0}")]
    Dispatch(String),
}

impl FmdError {
    pub fn input(path: impl Into<String>, message: impl Into<String>) -> Self {
        FmdError::Input {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Degenerate states abort a single trial step but never a whole run.
    pub fn is_degenerate(&self) -> bool {
        matches!(self, FmdError::DegenerateState { .. })
    }
}

pub type Result<T> = std::result::Result<T, FmdError>;
