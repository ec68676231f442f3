//! Engine errors

use thiserror::Error;

/// Errors raised by the field engine.
///
/// The per-cell math is total; only configuration and frame shape can fail.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(&'static str),
    #[error("invalid configuration: frame is {actual} bytes, expected {expected}")]
    FrameSizeMismatch { expected: usize, actual: usize },
}

impl EngineError {
    /// Both variants are configuration failures from the caller's view.
    pub fn is_invalid_configuration(&self) -> bool {
        matches!(
            self,
            Self::InvalidConfiguration(_) | Self::FrameSizeMismatch { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, EngineError>;
