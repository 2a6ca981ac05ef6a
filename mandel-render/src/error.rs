/// Errors that can occur while driving a render.
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum Error {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error(transparent)]
    Numeric(#[from] mandel_core::Error),
    /// The render machinery itself failed, e.g. a worker thread could not start.
    #[error("internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, Error>;
