use thiserror::Error;

/// Caller-visible failures for the validation core.
///
/// Only malformed input reaches here — degenerate numerics and
/// insufficient-data conditions are handled locally by each gate and
/// folded into that gate's own `reason` field instead.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
}
