use crate::object::KindId;

/// The full set of error kinds the engine and its collaborators can raise.
///
/// These are kinds, not a type hierarchy: callers match on the variant rather
/// than downcasting, and nothing inside the engine recovers from one of these
/// by falling back to a default — every condition here is surfaced to the
/// caller of `Visit`.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("kind {0:?} is not registered")]
    NotRegistered(KindId),

    #[error("kind {0:?} is already registered")]
    AlreadyRegistered(KindId),

    #[error("query failed: {0}")]
    QueryFailure(#[source] Box<dyn std::error::Error + Send + Sync>),

    #[error("handler failed: {0}")]
    HandlerFailure(#[source] Box<dyn std::error::Error + Send + Sync>),

    #[error("visit cancelled")]
    Cancelled,

    #[error("object is missing kind or uid: {0}")]
    MissingMetadata(String),
}

impl EngineError {
    pub fn query(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        EngineError::QueryFailure(Box::new(err))
    }

    pub fn handler(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        EngineError::HandlerFailure(Box::new(err))
    }
}

/// A `JoinError` (task panic or cancellation) surfaced from a spawned
/// `recurse` task is not itself an engine error kind, so it's folded into
/// `QueryFailure` — from the caller's point of view a panicking fan-out task
/// is indistinguishable from an upstream failure.
impl From<tokio::task::JoinError> for EngineError {
    fn from(err: tokio::task::JoinError) -> Self {
        EngineError::QueryFailure(Box::new(err))
    }
}
