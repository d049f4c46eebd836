use thiserror::Error;

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("map grid must be a JSON array of rows")]
    MapNotArray,

    #[error("map row {row} has unsupported shape")]
    InvalidMapRow { row: usize },

    #[error("map cell ({row}, {column}) is not a character or char code")]
    InvalidMapCell { row: usize, column: usize },

    #[error("command encoding failed: {0}")]
    Encode(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, ModelError>;
