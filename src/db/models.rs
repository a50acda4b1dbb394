use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::DatabaseError;
use crate::parsers::Stakes;

/// One announced gathering, keyed by the channel that hosts it.
///
/// `message_id` stays empty until the announcement message has actually been
/// posted; `date` stays empty for a "TBD" event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub id: i64,
    pub channel_id: String,
    pub message_id: Option<String>,
    pub emoji: String,
    pub date: Option<DateTime<Utc>>,
    pub title: String,
    pub location: String,
    pub price: String,
    pub description: String,
    pub author_id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewEvent {
    pub channel_id: String,
    pub message_id: Option<String>,
    pub emoji: String,
    pub date: Option<DateTime<Utc>>,
    pub title: String,
    pub location: String,
    pub price: String,
    pub author_id: String,
}

/// The closed set of event columns a caller may change.
///
/// Internal call sites pass the variant directly, so an unknown column is
/// unrepresentable there; strings arriving from outside go through
/// [`EventField::parse`] and get rejected before any query is assembled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventField {
    Title,
    Date,
    Location,
    Price,
    Emoji,
    MessageId,
    Description,
}

impl EventField {
    pub fn name(self) -> &'static str {
        match self {
            EventField::Title => "title",
            EventField::Date => "date",
            EventField::Location => "location",
            EventField::Price => "price",
            EventField::Emoji => "emoji",
            EventField::MessageId => "message_id",
            EventField::Description => "description",
        }
    }

    pub fn parse(input: &str) -> Result<Self, DatabaseError> {
        match input {
            "title" => Ok(EventField::Title),
            "date" => Ok(EventField::Date),
            "location" => Ok(EventField::Location),
            "price" => Ok(EventField::Price),
            "emoji" => Ok(EventField::Emoji),
            "message_id" => Ok(EventField::MessageId),
            "description" => Ok(EventField::Description),
            other => Err(DatabaseError::InvalidField(other.to_string())),
        }
    }
}

/// A declared attendance intent. Stored as its lowercase text form.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RsvpKind {
    Yes,
    Maybe,
    No,
}

impl RsvpKind {
    pub fn as_str(self) -> &'static str {
        match self {
            RsvpKind::Yes => "yes",
            RsvpKind::Maybe => "maybe",
            RsvpKind::No => "no",
        }
    }

    /// Case-insensitive, whitespace-tolerant; anything outside the
    /// three-value set is rejected before it can reach storage.
    pub fn parse(input: &str) -> Result<Self, DatabaseError> {
        match input.trim().to_lowercase().as_str() {
            "yes" => Ok(RsvpKind::Yes),
            "maybe" => Ok(RsvpKind::Maybe),
            "no" => Ok(RsvpKind::No),
            _ => Err(DatabaseError::InvalidResponse(input.to_string())),
        }
    }

    fn from_stored(value: &str) -> Option<Self> {
        match value {
            "yes" => Some(RsvpKind::Yes),
            "maybe" => Some(RsvpKind::Maybe),
            "no" => Some(RsvpKind::No),
            _ => None,
        }
    }
}

impl fmt::Display for RsvpKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The three disjoint user-ID lists derived from an event's RSVP rows.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventResponses {
    pub going: Vec<String>,
    pub maybe: Vec<String>,
    pub declined: Vec<String>,
}

impl EventResponses {
    /// Rows with an unrecognized stored kind are dropped; the write side
    /// validates, so such rows should not exist.
    pub fn partition<I>(rows: I) -> Self
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut responses = EventResponses::default();
        for (user_id, kind) in rows {
            match RsvpKind::from_stored(&kind) {
                Some(RsvpKind::Yes) => responses.going.push(user_id),
                Some(RsvpKind::Maybe) => responses.maybe.push(user_id),
                Some(RsvpKind::No) => responses.declined.push(user_id),
                None => {}
            }
        }
        responses
    }
}

#[derive(Debug, Clone)]
pub struct NewPokerSession {
    pub user_id: String,
    pub buy_in: f64,
    pub cash_out: f64,
    pub location: Option<String>,
    pub stakes: Stakes,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PokerLifetime {
    pub sessions: i64,
    pub net: f64,
}

/// Audit-log row for a message seen in the guild. `channel_name` may be
/// empty when the lookup failed; the channel mirror keeps its last name.
#[derive(Debug, Clone)]
pub struct NewMessageLog {
    pub message_id: String,
    pub channel_id: String,
    pub channel_name: String,
    pub user_id: String,
    pub username: String,
    pub content: String,
}

#[cfg(test)]
mod tests {
    use super::{EventField, EventResponses, RsvpKind};
    use crate::db::DatabaseError;

    #[test]
    fn rsvp_kind_parses_case_insensitively() {
        assert_eq!(RsvpKind::parse("yes").unwrap(), RsvpKind::Yes);
        assert_eq!(RsvpKind::parse(" MAYBE ").unwrap(), RsvpKind::Maybe);
        assert_eq!(RsvpKind::parse("No").unwrap(), RsvpKind::No);
    }

    #[test]
    fn rsvp_kind_rejects_unknown_values() {
        assert!(matches!(
            RsvpKind::parse("perhaps"),
            Err(DatabaseError::InvalidResponse(_))
        ));
        assert!(matches!(
            RsvpKind::parse(""),
            Err(DatabaseError::InvalidResponse(_))
        ));
    }

    #[test]
    fn event_field_parses_the_allow_list() {
        for name in [
            "title",
            "date",
            "location",
            "price",
            "emoji",
            "message_id",
            "description",
        ] {
            assert_eq!(EventField::parse(name).unwrap().name(), name);
        }
    }

    #[test]
    fn event_field_rejects_anything_else() {
        assert!(matches!(
            EventField::parse("author_id"),
            Err(DatabaseError::InvalidField(_))
        ));
        assert!(matches!(
            EventField::parse("id; DROP TABLE events"),
            Err(DatabaseError::InvalidField(_))
        ));
    }

    #[test]
    fn partition_buckets_by_kind_and_skips_unknown() {
        let rows = vec![
            ("a".to_string(), "yes".to_string()),
            ("b".to_string(), "maybe".to_string()),
            ("c".to_string(), "no".to_string()),
            ("d".to_string(), "definitely".to_string()),
        ];
        let responses = EventResponses::partition(rows);
        assert_eq!(responses.going, vec!["a"]);
        assert_eq!(responses.maybe, vec!["b"]);
        assert_eq!(responses.declined, vec!["c"]);
    }
}
