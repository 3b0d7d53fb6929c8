use crate::query::EntityType;

#[derive(Debug, thiserror::Error)]
pub enum QueryError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid predicate: {0}")]
    InvalidPredicate(String),

    #[error("Unsupported target entity: {0}")]
    UnsupportedEntity(EntityType),

    #[error("Not implemented: {0}")]
    NotImplemented(String),

    #[error("Collaborator error: {0}")]
    Collaborator(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl QueryError {
    /// True for checks with no evaluator: date and pass-through explainers
    /// and free-text reference evaluation.
    pub fn is_not_implemented(&self) -> bool {
        matches!(self, QueryError::NotImplemented(_))
    }
}

pub type Result<T> = std::result::Result<T, QueryError>;
