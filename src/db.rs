pub use self::error::DatabaseError;
pub use self::manager::DatabaseManager;
pub use self::models::{
    Event, EventField, EventResponses, NewEvent, NewMessageLog, NewPokerSession, PokerLifetime,
    RsvpKind,
};
pub use self::stores::{AuditStore, DirectoryStore, EventStore, PokerStore};

pub mod error;
pub mod manager;
pub mod models;
pub mod stores;

#[cfg(feature = "postgres")]
pub mod postgres;
#[cfg(feature = "postgres")]
pub mod schema;

#[cfg(feature = "sqlite")]
pub mod schema_sqlite;
#[cfg(feature = "sqlite")]
pub mod sqlite;
