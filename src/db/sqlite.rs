use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel::sql_types::{BigInt, Double, Text};
use diesel::sqlite::SqliteConnection;

use crate::db::schema_sqlite::{commands, event_responses, events, messages, poker_sessions};

use super::{
    DatabaseError,
    models::{
        Event, EventField, EventResponses, NewEvent, NewMessageLog, NewPokerSession,
        PokerLifetime, RsvpKind,
    },
};

// SQLite stores timestamps as RFC 3339 text
fn datetime_to_string(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339()
}

fn string_to_datetime(s: &str) -> Result<DateTime<Utc>, DatabaseError> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| DatabaseError::Query(format!("invalid datetime format: {}", e)))
}

// SQLite uses i32 for INTEGER primary keys, but the store API stays on i64
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = events)]
struct DbEvent {
    id: i32,
    discord_channel_id: String,
    discord_message_id: Option<String>,
    emoji: String,
    date: Option<String>,
    title: String,
    location: String,
    price: String,
    description: String,
    author_id: String,
    created_at: String,
    updated_at: String,
}

impl DbEvent {
    fn to_event(&self) -> Result<Event, DatabaseError> {
        Ok(Event {
            id: self.id as i64,
            channel_id: self.discord_channel_id.clone(),
            message_id: self.discord_message_id.clone(),
            emoji: self.emoji.clone(),
            date: self
                .date
                .as_deref()
                .map(string_to_datetime)
                .transpose()?,
            title: self.title.clone(),
            location: self.location.clone(),
            price: self.price.clone(),
            description: self.description.clone(),
            author_id: self.author_id.clone(),
            created_at: string_to_datetime(&self.created_at)?,
            updated_at: string_to_datetime(&self.updated_at)?,
        })
    }
}

#[derive(Insertable)]
#[diesel(table_name = events)]
struct NewEventRow<'a> {
    discord_channel_id: &'a str,
    discord_message_id: Option<&'a str>,
    emoji: &'a str,
    date: Option<String>,
    title: &'a str,
    location: &'a str,
    price: &'a str,
    description: &'a str,
    author_id: &'a str,
    created_at: String,
    updated_at: String,
}

#[derive(Insertable)]
#[diesel(table_name = event_responses)]
struct NewResponseRow<'a> {
    event_id: i32,
    user_id: &'a str,
    response_type: &'a str,
    updated_at: String,
}

#[derive(Insertable)]
#[diesel(table_name = poker_sessions)]
struct NewPokerRow<'a> {
    user_id: &'a str,
    in_amount: f64,
    out_amount: f64,
    location: Option<&'a str>,
    stakes_sb: Option<f64>,
    stakes_bb: Option<f64>,
    stakes_text: Option<&'a str>,
    created_at: String,
}

#[derive(Insertable)]
#[diesel(table_name = messages)]
struct NewMessageRow<'a> {
    discord_message_id: &'a str,
    discord_channel_id: &'a str,
    discord_user_id: &'a str,
    message: &'a str,
    created_at: String,
}

#[derive(Insertable)]
#[diesel(table_name = commands)]
struct NewCommandRow<'a> {
    discord_user_id: &'a str,
    command_text: &'a str,
    created_at: String,
}

#[derive(QueryableByName)]
struct LifetimeRow {
    #[diesel(sql_type = BigInt)]
    sessions: i64,
    #[diesel(sql_type = Double)]
    net: f64,
}

fn establish_connection(path: &str) -> Result<SqliteConnection, DatabaseError> {
    let mut conn = SqliteConnection::establish(path)
        .map_err(|e| DatabaseError::Connection(e.to_string()))?;
    // events -> channels is a real constraint on this backend too
    diesel::sql_query("PRAGMA foreign_keys = ON")
        .execute(&mut conn)
        .map_err(|e| DatabaseError::Connection(e.to_string()))?;
    Ok(conn)
}

fn upsert_user_in(
    conn: &mut SqliteConnection,
    user_id: &str,
    username: &str,
) -> Result<(), DatabaseError> {
    let now = datetime_to_string(&Utc::now());
    diesel::sql_query(
        "INSERT INTO users (discord_user_id, username, created_at, updated_at) \
         VALUES (?, ?, ?, ?) \
         ON CONFLICT (discord_user_id) DO UPDATE SET \
         username = COALESCE(NULLIF(excluded.username, ''), users.username), \
         updated_at = excluded.updated_at",
    )
    .bind::<Text, _>(user_id)
    .bind::<Text, _>(username)
    .bind::<Text, _>(&now)
    .bind::<Text, _>(&now)
    .execute(conn)
    .map(|_| ())
    .map_err(|e| DatabaseError::Query(e.to_string()))
}

fn upsert_channel_in(
    conn: &mut SqliteConnection,
    channel_id: &str,
    name: &str,
) -> Result<(), DatabaseError> {
    let now = datetime_to_string(&Utc::now());
    diesel::sql_query(
        "INSERT INTO channels (discord_channel_id, channel_name, created_at, updated_at) \
         VALUES (?, ?, ?, ?) \
         ON CONFLICT (discord_channel_id) DO UPDATE SET \
         channel_name = COALESCE(NULLIF(excluded.channel_name, ''), channels.channel_name), \
         updated_at = excluded.updated_at",
    )
    .bind::<Text, _>(channel_id)
    .bind::<Text, _>(name)
    .bind::<Text, _>(&now)
    .bind::<Text, _>(&now)
    .execute(conn)
    .map(|_| ())
    .map_err(|e| DatabaseError::Query(e.to_string()))
}

pub struct SqliteEventStore {
    db_path: Arc<String>,
}

impl SqliteEventStore {
    pub fn new(db_path: Arc<String>) -> Self {
        Self { db_path }
    }
}

#[async_trait]
impl super::EventStore for SqliteEventStore {
    async fn create_event(&self, event: &NewEvent) -> Result<i64, DatabaseError> {
        let db_path = self.db_path.clone();
        let event = event.clone();
        tokio::task::spawn_blocking(move || {
            let mut conn = establish_connection(&db_path)?;
            let now = datetime_to_string(&Utc::now());
            let row = NewEventRow {
                discord_channel_id: &event.channel_id,
                discord_message_id: event.message_id.as_deref(),
                emoji: &event.emoji,
                date: event.date.as_ref().map(datetime_to_string),
                title: &event.title,
                location: &event.location,
                price: &event.price,
                description: "",
                author_id: &event.author_id,
                created_at: now.clone(),
                updated_at: now,
            };

            diesel::insert_into(events::table)
                .values(&row)
                .execute(&mut conn)
                .map_err(|e| DatabaseError::Query(e.to_string()))?;

            // channel id is unique, so the fresh row is unambiguous
            use crate::db::schema_sqlite::events::dsl;
            dsl::events
                .filter(dsl::discord_channel_id.eq(event.channel_id.as_str()))
                .select(dsl::id)
                .first::<i32>(&mut conn)
                .map(|value| value as i64)
                .map_err(|e| DatabaseError::Query(e.to_string()))
        })
        .await
        .map_err(|e| DatabaseError::Query(format!("database task failed: {e}")))?
    }

    async fn get_event_by_channel(
        &self,
        channel_id: &str,
    ) -> Result<Option<Event>, DatabaseError> {
        let db_path = self.db_path.clone();
        let channel_id = channel_id.to_string();
        tokio::task::spawn_blocking(move || {
            let mut conn = establish_connection(&db_path)?;
            use crate::db::schema_sqlite::events::dsl::*;
            events
                .filter(discord_channel_id.eq(channel_id))
                .select(DbEvent::as_select())
                .first::<DbEvent>(&mut conn)
                .optional()
                .map_err(|e| DatabaseError::Query(e.to_string()))?
                .map(|row| row.to_event())
                .transpose()
        })
        .await
        .map_err(|e| DatabaseError::Query(format!("database task failed: {e}")))?
    }

    async fn update_event_field(
        &self,
        channel_id: &str,
        field: EventField,
        value: &str,
    ) -> Result<(), DatabaseError> {
        let db_path = self.db_path.clone();
        let channel_id = channel_id.to_string();
        let value = value.to_string();
        tokio::task::spawn_blocking(move || {
            let mut conn = establish_connection(&db_path)?;
            use crate::db::schema_sqlite::events::dsl as ev;
            let now = datetime_to_string(&Utc::now());
            let target = diesel::update(ev::events.filter(ev::discord_channel_id.eq(channel_id.as_str())));

            let result = match field {
                EventField::Title => target
                    .set((ev::title.eq(value.as_str()), ev::updated_at.eq(now.as_str())))
                    .execute(&mut conn),
                EventField::Date => {
                    // validate, then store the canonical text form
                    let parsed = string_to_datetime(&value)?;
                    target
                        .set((
                            ev::date.eq(Some(datetime_to_string(&parsed))),
                            ev::updated_at.eq(now.as_str()),
                        ))
                        .execute(&mut conn)
                }
                EventField::Location => target
                    .set((ev::location.eq(value.as_str()), ev::updated_at.eq(now.as_str())))
                    .execute(&mut conn),
                EventField::Price => target
                    .set((ev::price.eq(value.as_str()), ev::updated_at.eq(now.as_str())))
                    .execute(&mut conn),
                EventField::Emoji => target
                    .set((ev::emoji.eq(value.as_str()), ev::updated_at.eq(now.as_str())))
                    .execute(&mut conn),
                EventField::MessageId => target
                    .set((
                        ev::discord_message_id.eq(Some(value.as_str())),
                        ev::updated_at.eq(now.as_str()),
                    ))
                    .execute(&mut conn),
                EventField::Description => target
                    .set((ev::description.eq(value.as_str()), ev::updated_at.eq(now.as_str())))
                    .execute(&mut conn),
            };

            result
                .map(|_| ())
                .map_err(|e| DatabaseError::Query(e.to_string()))
        })
        .await
        .map_err(|e| DatabaseError::Query(format!("database task failed: {e}")))?
    }

    async fn upsert_response(
        &self,
        event_id: i64,
        user_id: &str,
        kind: RsvpKind,
    ) -> Result<(), DatabaseError> {
        let db_path = self.db_path.clone();
        let user_id = user_id.to_string();
        tokio::task::spawn_blocking(move || {
            let mut conn = establish_connection(&db_path)?;
            use crate::db::schema_sqlite::event_responses::dsl as resp;
            let now = datetime_to_string(&Utc::now());
            let event_key = event_id as i32;

            let existing: Option<i32> = resp::event_responses
                .filter(resp::event_id.eq(event_key))
                .filter(resp::user_id.eq(user_id.as_str()))
                .select(resp::id)
                .first::<i32>(&mut conn)
                .optional()
                .map_err(|e| DatabaseError::Query(e.to_string()))?;

            match existing {
                Some(row_id) => diesel::update(resp::event_responses.filter(resp::id.eq(row_id)))
                    .set((
                        resp::response_type.eq(kind.as_str()),
                        resp::updated_at.eq(now.as_str()),
                    ))
                    .execute(&mut conn),
                None => diesel::insert_into(event_responses::table)
                    .values(&NewResponseRow {
                        event_id: event_key,
                        user_id: &user_id,
                        response_type: kind.as_str(),
                        updated_at: now.clone(),
                    })
                    .execute(&mut conn),
            }
            .map(|_| ())
            .map_err(|e| DatabaseError::Query(e.to_string()))
        })
        .await
        .map_err(|e| DatabaseError::Query(format!("database task failed: {e}")))?
    }

    async fn get_responses(&self, event_id: i64) -> Result<EventResponses, DatabaseError> {
        let db_path = self.db_path.clone();
        tokio::task::spawn_blocking(move || {
            let mut conn = establish_connection(&db_path)?;
            use crate::db::schema_sqlite::event_responses::dsl as resp;
            resp::event_responses
                .filter(resp::event_id.eq(event_id as i32))
                .order(resp::id.asc())
                .select((resp::user_id, resp::response_type))
                .load::<(String, String)>(&mut conn)
                .map(EventResponses::partition)
                .map_err(|e| DatabaseError::Query(e.to_string()))
        })
        .await
        .map_err(|e| DatabaseError::Query(format!("database task failed: {e}")))?
    }
}

pub struct SqliteDirectoryStore {
    db_path: Arc<String>,
}

impl SqliteDirectoryStore {
    pub fn new(db_path: Arc<String>) -> Self {
        Self { db_path }
    }
}

#[async_trait]
impl super::DirectoryStore for SqliteDirectoryStore {
    async fn upsert_user(&self, user_id: &str, username: &str) -> Result<(), DatabaseError> {
        let db_path = self.db_path.clone();
        let user_id = user_id.to_string();
        let username = username.to_string();
        tokio::task::spawn_blocking(move || {
            let mut conn = establish_connection(&db_path)?;
            upsert_user_in(&mut conn, &user_id, &username)
        })
        .await
        .map_err(|e| DatabaseError::Query(format!("database task failed: {e}")))?
    }

    async fn upsert_channel(&self, channel_id: &str, name: &str) -> Result<(), DatabaseError> {
        let db_path = self.db_path.clone();
        let channel_id = channel_id.to_string();
        let name = name.to_string();
        tokio::task::spawn_blocking(move || {
            let mut conn = establish_connection(&db_path)?;
            upsert_channel_in(&mut conn, &channel_id, &name)
        })
        .await
        .map_err(|e| DatabaseError::Query(format!("database task failed: {e}")))?
    }
}

pub struct SqlitePokerStore {
    db_path: Arc<String>,
}

impl SqlitePokerStore {
    pub fn new(db_path: Arc<String>) -> Self {
        Self { db_path }
    }
}

#[async_trait]
impl super::PokerStore for SqlitePokerStore {
    async fn create_session(&self, session: &NewPokerSession) -> Result<(), DatabaseError> {
        let db_path = self.db_path.clone();
        let session = session.clone();
        tokio::task::spawn_blocking(move || {
            let mut conn = establish_connection(&db_path)?;
            upsert_user_in(&mut conn, &session.user_id, "")?;

            diesel::insert_into(poker_sessions::table)
                .values(&NewPokerRow {
                    user_id: &session.user_id,
                    in_amount: session.buy_in,
                    out_amount: session.cash_out,
                    location: session.location.as_deref(),
                    stakes_sb: session.stakes.small,
                    stakes_bb: session.stakes.big,
                    stakes_text: session.stakes.raw.as_deref(),
                    created_at: datetime_to_string(&Utc::now()),
                })
                .execute(&mut conn)
                .map(|_| ())
                .map_err(|e| DatabaseError::Query(e.to_string()))
        })
        .await
        .map_err(|e| DatabaseError::Query(format!("database task failed: {e}")))?
    }

    async fn lifetime(&self, user_id: &str) -> Result<PokerLifetime, DatabaseError> {
        let db_path = self.db_path.clone();
        let user_id = user_id.to_string();
        tokio::task::spawn_blocking(move || {
            let mut conn = establish_connection(&db_path)?;
            diesel::sql_query(
                "SELECT COUNT(*) AS sessions, \
                 COALESCE(SUM(out_amount - in_amount), 0.0) AS net \
                 FROM poker_sessions WHERE user_id = ?",
            )
            .bind::<Text, _>(&user_id)
            .get_result::<LifetimeRow>(&mut conn)
            .map(|row| PokerLifetime {
                sessions: row.sessions,
                net: row.net,
            })
            .map_err(|e| DatabaseError::Query(e.to_string()))
        })
        .await
        .map_err(|e| DatabaseError::Query(format!("database task failed: {e}")))?
    }
}

pub struct SqliteAuditStore {
    db_path: Arc<String>,
}

impl SqliteAuditStore {
    pub fn new(db_path: Arc<String>) -> Self {
        Self { db_path }
    }
}

#[async_trait]
impl super::AuditStore for SqliteAuditStore {
    async fn record_command(
        &self,
        user_id: &str,
        username: &str,
        command_text: &str,
    ) -> Result<(), DatabaseError> {
        let db_path = self.db_path.clone();
        let user_id = user_id.to_string();
        let username = username.to_string();
        let command_text = command_text.to_string();
        tokio::task::spawn_blocking(move || {
            let mut conn = establish_connection(&db_path)?;
            upsert_user_in(&mut conn, &user_id, &username)?;

            diesel::insert_into(commands::table)
                .values(&NewCommandRow {
                    discord_user_id: &user_id,
                    command_text: &command_text,
                    created_at: datetime_to_string(&Utc::now()),
                })
                .execute(&mut conn)
                .map(|_| ())
                .map_err(|e| DatabaseError::Query(e.to_string()))
        })
        .await
        .map_err(|e| DatabaseError::Query(format!("database task failed: {e}")))?
    }

    async fn record_message(&self, message: &NewMessageLog) -> Result<(), DatabaseError> {
        let db_path = self.db_path.clone();
        let message = message.clone();
        tokio::task::spawn_blocking(move || {
            let mut conn = establish_connection(&db_path)?;
            upsert_user_in(&mut conn, &message.user_id, &message.username)?;
            if !message.channel_id.is_empty() {
                upsert_channel_in(&mut conn, &message.channel_id, &message.channel_name)?;
            }

            diesel::insert_into(messages::table)
                .values(&NewMessageRow {
                    discord_message_id: &message.message_id,
                    discord_channel_id: &message.channel_id,
                    discord_user_id: &message.user_id,
                    message: &message.content,
                    created_at: datetime_to_string(&Utc::now()),
                })
                .on_conflict_do_nothing()
                .execute(&mut conn)
                .map(|_| ())
                .map_err(|e| DatabaseError::Query(e.to_string()))
        })
        .await
        .map_err(|e| DatabaseError::Query(format!("database task failed: {e}")))?
    }
}
