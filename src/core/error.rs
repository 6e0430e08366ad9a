use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Command not found")]
    NotFound,

    #[error("Bucket '{0}' not found")]
    BucketNotFound(String),

    #[error("Key required")]
    KeyRequired,

    #[error("Key too large: {0} bytes")]
    KeyTooLarge(usize),

    #[error("Value too large: {size} bytes exceeds the {limit} byte limit")]
    ValueTooLarge { size: usize, limit: usize },

    #[error("Sequence overflow in bucket '{0}'")]
    SequenceOverflow(String),

    #[error("Command has no identifier")]
    Unassigned,

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Corrupted data: {0}")]
    Corrupted(String),

    #[error("I/O error: {0}")]
    IoError(String),
}

pub type Result<T> = std::result::Result<T, StoreError>;

impl StoreError {
    pub(crate) fn io(context: &str, err: std::io::Error) -> Self {
        Self::IoError(format!("{}: {}", context, err))
    }
}
