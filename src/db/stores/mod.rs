use async_trait::async_trait;

use super::DatabaseError;
use super::models::{
    Event, EventField, EventResponses, NewEvent, NewMessageLog, NewPokerSession, PokerLifetime,
    RsvpKind,
};

/// The authoritative record for events and their RSVP rows. One event per
/// channel; the channel reference is the lookup key everywhere.
#[async_trait]
pub trait EventStore: Send + Sync {
    /// Inserts a new event row and returns its id. Fails with a constraint
    /// error when the channel mirror row does not exist yet; callers upsert
    /// the channel first.
    async fn create_event(&self, event: &NewEvent) -> Result<i64, DatabaseError>;

    async fn get_event_by_channel(&self, channel_id: &str)
    -> Result<Option<Event>, DatabaseError>;

    /// Updates a single event column. Date values are passed in their
    /// canonical RFC 3339 text form and parsed back at this edge.
    async fn update_event_field(
        &self,
        channel_id: &str,
        field: EventField,
        value: &str,
    ) -> Result<(), DatabaseError>;

    /// Read-then-write upsert on the (event, user) pair. Two concurrent
    /// calls for the same pair race to last-write-wins; the final row always
    /// holds one of the submitted kinds.
    async fn upsert_response(
        &self,
        event_id: i64,
        user_id: &str,
        kind: RsvpKind,
    ) -> Result<(), DatabaseError>;

    async fn get_responses(&self, event_id: i64) -> Result<EventResponses, DatabaseError>;
}

/// Denormalized identity mirrors for users and channels, refreshed
/// opportunistically whenever one acts. A non-empty display name always
/// wins over an empty incoming one.
#[async_trait]
pub trait DirectoryStore: Send + Sync {
    async fn upsert_user(&self, user_id: &str, username: &str) -> Result<(), DatabaseError>;
    async fn upsert_channel(&self, channel_id: &str, name: &str) -> Result<(), DatabaseError>;
}

/// Insert-only session ledger with lifetime aggregation.
#[async_trait]
pub trait PokerStore: Send + Sync {
    async fn create_session(&self, session: &NewPokerSession) -> Result<(), DatabaseError>;
    async fn lifetime(&self, user_id: &str) -> Result<PokerLifetime, DatabaseError>;
}

/// Best-effort audit trail of commands and messages.
#[async_trait]
pub trait AuditStore: Send + Sync {
    async fn record_command(
        &self,
        user_id: &str,
        username: &str,
        command_text: &str,
    ) -> Result<(), DatabaseError>;

    async fn record_message(&self, message: &NewMessageLog) -> Result<(), DatabaseError>;
}
