use thiserror::Error;

#[derive(Error, Debug)]
pub enum DedupeError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON deserialization failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("partition '{partition}' unreadable: {message}")]
    PartitionRead { partition: String, message: String },

    #[error("not a point feature collection: {message}")]
    InvalidCollection { message: String },

    #[error("configuration error: {message}")]
    Config { message: String },
}

pub type Result<T> = std::result::Result<T, DedupeError>;
