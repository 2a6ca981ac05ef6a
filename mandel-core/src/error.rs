/// Errors produced by the numeric layer.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// An argument was outside the domain of the operation, e.g. a zero divisor.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    /// A value did not fit its representation.
    #[error("overflow: {0}")]
    Overflow(String),
    /// Malformed numeric text.
    #[error("parse error: {0}")]
    Parse(String),
}

pub type Result<T> = std::result::Result<T, Error>;
