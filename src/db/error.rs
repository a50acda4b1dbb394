use thiserror::Error;

#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error("database connection error: {0}")]
    Connection(String),

    #[error("database query error: {0}")]
    Query(String),

    #[error("database migration error: {0}")]
    Migration(String),

    /// Rejected before any SQL is built; the allow-list of editable event
    /// columns lives in [`crate::db::models::EventField`].
    #[error("'{0}' is not an editable event field")]
    InvalidField(String),

    #[error("invalid RSVP response '{0}': expected yes, maybe or no")]
    InvalidResponse(String),
}
