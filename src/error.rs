//! Error types for record validation and persistence.

/// A rejected field value.
///
/// Raised by the validators in [`crate::validation`] before a value is
/// accepted into a record. `field` is the column name the value was meant for.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{field}: {message}")]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    pub fn new(field: &'static str, message: impl Into<String>) -> Self {
        ValidationError {
            field,
            message: message.into(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("an author named '{0}' already exists")]
    DuplicateAuthorName(String),

    #[error("author {0} does not exist")]
    AuthorNotFound(i64),

    #[error("record has not been saved yet")]
    NotPersisted,

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
