use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::pg::PgConnection;
use diesel::prelude::*;
use diesel::sql_types::{BigInt, Double, Text};

use crate::db::manager::Pool;
use crate::db::schema::{commands, event_responses, events, messages, poker_sessions};

use super::{
    DatabaseError,
    models::{
        Event, EventField, EventResponses, NewEvent, NewMessageLog, NewPokerSession,
        PokerLifetime, RsvpKind,
    },
};

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = events)]
struct DbEvent {
    id: i64,
    discord_channel_id: String,
    discord_message_id: Option<String>,
    emoji: String,
    date: Option<DateTime<Utc>>,
    title: String,
    location: String,
    price: String,
    description: String,
    author_id: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<DbEvent> for Event {
    fn from(value: DbEvent) -> Self {
        Self {
            id: value.id,
            channel_id: value.discord_channel_id,
            message_id: value.discord_message_id,
            emoji: value.emoji,
            date: value.date,
            title: value.title,
            location: value.location,
            price: value.price,
            description: value.description,
            author_id: value.author_id,
            created_at: value.created_at,
            updated_at: value.updated_at,
        }
    }
}

#[derive(Insertable)]
#[diesel(table_name = events)]
struct NewEventRow<'a> {
    discord_channel_id: &'a str,
    discord_message_id: Option<&'a str>,
    emoji: &'a str,
    date: Option<DateTime<Utc>>,
    title: &'a str,
    location: &'a str,
    price: &'a str,
    description: &'a str,
    author_id: &'a str,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(Insertable)]
#[diesel(table_name = event_responses)]
struct NewResponseRow<'a> {
    event_id: i64,
    user_id: &'a str,
    response_type: &'a str,
    updated_at: DateTime<Utc>,
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
    created_at: DateTime<Utc>,
}

#[derive(Insertable)]
#[diesel(table_name = messages)]
struct NewMessageRow<'a> {
    discord_message_id: &'a str,
    discord_channel_id: &'a str,
    discord_user_id: &'a str,
    message: &'a str,
    created_at: DateTime<Utc>,
}

#[derive(Insertable)]
#[diesel(table_name = commands)]
struct NewCommandRow<'a> {
    discord_user_id: &'a str,
    command_text: &'a str,
    created_at: DateTime<Utc>,
}

#[derive(QueryableByName)]
struct LifetimeRow {
    #[diesel(sql_type = BigInt)]
    sessions: i64,
    #[diesel(sql_type = Double)]
    net: f64,
}

fn parse_stored_date(value: &str) -> Result<DateTime<Utc>, DatabaseError> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| DatabaseError::Query(format!("invalid datetime '{value}': {e}")))
}

async fn with_connection<T, F>(pool: Pool, operation: F) -> Result<T, DatabaseError>
where
    T: Send + 'static,
    F: FnOnce(&mut PgConnection) -> Result<T, DatabaseError> + Send + 'static,
{
    tokio::task::spawn_blocking(move || {
        let mut conn = pool
            .get()
            .map_err(|e| DatabaseError::Connection(e.to_string()))?;
        operation(&mut conn)
    })
    .await
    .map_err(|e| DatabaseError::Query(format!("database task failed: {e}")))?
}

fn upsert_user_in(conn: &mut PgConnection, user_id: &str, username: &str) -> Result<(), DatabaseError> {
    diesel::sql_query(
        "INSERT INTO users (discord_user_id, username) VALUES ($1, $2) \
         ON CONFLICT (discord_user_id) DO UPDATE SET \
         username = COALESCE(NULLIF(EXCLUDED.username, ''), users.username), \
         updated_at = NOW()",
    )
    .bind::<Text, _>(user_id)
    .bind::<Text, _>(username)
    .execute(conn)
    .map(|_| ())
    .map_err(|e| DatabaseError::Query(e.to_string()))
}

fn upsert_channel_in(conn: &mut PgConnection, channel_id: &str, name: &str) -> Result<(), DatabaseError> {
    diesel::sql_query(
        "INSERT INTO channels (discord_channel_id, channel_name) VALUES ($1, $2) \
         ON CONFLICT (discord_channel_id) DO UPDATE SET \
         channel_name = COALESCE(NULLIF(EXCLUDED.channel_name, ''), channels.channel_name), \
         updated_at = NOW()",
    )
    .bind::<Text, _>(channel_id)
    .bind::<Text, _>(name)
    .execute(conn)
    .map(|_| ())
    .map_err(|e| DatabaseError::Query(e.to_string()))
}

pub struct PostgresEventStore {
    pool: Pool,
}

impl PostgresEventStore {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl super::EventStore for PostgresEventStore {
    async fn create_event(&self, event: &NewEvent) -> Result<i64, DatabaseError> {
        let pool = self.pool.clone();
        let event = event.clone();
        with_connection(pool, move |conn| {
            let now = Utc::now();
            let row = NewEventRow {
                discord_channel_id: &event.channel_id,
                discord_message_id: event.message_id.as_deref(),
                emoji: &event.emoji,
                date: event.date,
                title: &event.title,
                location: &event.location,
                price: &event.price,
                description: "",
                author_id: &event.author_id,
                created_at: now,
                updated_at: now,
            };

            diesel::insert_into(events::table)
                .values(&row)
                .returning(events::id)
                .get_result::<i64>(conn)
                .map_err(|e| DatabaseError::Query(e.to_string()))
        })
        .await
    }

    async fn get_event_by_channel(
        &self,
        channel_id: &str,
    ) -> Result<Option<Event>, DatabaseError> {
        let pool = self.pool.clone();
        let channel_id = channel_id.to_string();
        with_connection(pool, move |conn| {
            use crate::db::schema::events::dsl::*;
            events
                .filter(discord_channel_id.eq(channel_id))
                .select(DbEvent::as_select())
                .first::<DbEvent>(conn)
                .optional()
                .map(|value| value.map(Into::into))
                .map_err(|e| DatabaseError::Query(e.to_string()))
        })
        .await
    }

    async fn update_event_field(
        &self,
        channel_id: &str,
        field: EventField,
        value: &str,
    ) -> Result<(), DatabaseError> {
        let pool = self.pool.clone();
        let channel_id = channel_id.to_string();
        let value = value.to_string();
        with_connection(pool, move |conn| {
            use crate::db::schema::events::dsl as ev;
            let now = Utc::now();
            let target = diesel::update(ev::events.filter(ev::discord_channel_id.eq(channel_id.as_str())));

            let result = match field {
                EventField::Title => target
                    .set((ev::title.eq(value.as_str()), ev::updated_at.eq(now)))
                    .execute(conn),
                EventField::Date => {
                    let parsed = parse_stored_date(&value)?;
                    target
                        .set((ev::date.eq(Some(parsed)), ev::updated_at.eq(now)))
                        .execute(conn)
                }
                EventField::Location => target
                    .set((ev::location.eq(value.as_str()), ev::updated_at.eq(now)))
                    .execute(conn),
                EventField::Price => target
                    .set((ev::price.eq(value.as_str()), ev::updated_at.eq(now)))
                    .execute(conn),
                EventField::Emoji => target
                    .set((ev::emoji.eq(value.as_str()), ev::updated_at.eq(now)))
                    .execute(conn),
                EventField::MessageId => target
                    .set((ev::discord_message_id.eq(Some(value.as_str())), ev::updated_at.eq(now)))
                    .execute(conn),
                EventField::Description => target
                    .set((ev::description.eq(value.as_str()), ev::updated_at.eq(now)))
                    .execute(conn),
            };

            result
                .map(|_| ())
                .map_err(|e| DatabaseError::Query(e.to_string()))
        })
        .await
    }

    async fn upsert_response(
        &self,
        event_id: i64,
        user_id: &str,
        kind: RsvpKind,
    ) -> Result<(), DatabaseError> {
        let pool = self.pool.clone();
        let user_id = user_id.to_string();
        with_connection(pool, move |conn| {
            use crate::db::schema::event_responses::dsl as resp;
            let now = Utc::now();

            let existing: Option<i64> = resp::event_responses
                .filter(resp::event_id.eq(event_id))
                .filter(resp::user_id.eq(user_id.as_str()))
                .select(resp::id)
                .first::<i64>(conn)
                .optional()
                .map_err(|e| DatabaseError::Query(e.to_string()))?;

            match existing {
                Some(row_id) => diesel::update(resp::event_responses.filter(resp::id.eq(row_id)))
                    .set((
                        resp::response_type.eq(kind.as_str()),
                        resp::updated_at.eq(now),
                    ))
                    .execute(conn),
                None => diesel::insert_into(event_responses::table)
                    .values(&NewResponseRow {
                        event_id,
                        user_id: &user_id,
                        response_type: kind.as_str(),
                        updated_at: now,
                    })
                    .execute(conn),
            }
            .map(|_| ())
            .map_err(|e| DatabaseError::Query(e.to_string()))
        })
        .await
    }

    async fn get_responses(&self, event_id: i64) -> Result<EventResponses, DatabaseError> {
        let pool = self.pool.clone();
        with_connection(pool, move |conn| {
            use crate::db::schema::event_responses::dsl as resp;
            resp::event_responses
                .filter(resp::event_id.eq(event_id))
                .order(resp::id.asc())
                .select((resp::user_id, resp::response_type))
                .load::<(String, String)>(conn)
                .map(EventResponses::partition)
                .map_err(|e| DatabaseError::Query(e.to_string()))
        })
        .await
    }
}

pub struct PostgresDirectoryStore {
    pool: Pool,
}

impl PostgresDirectoryStore {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl super::DirectoryStore for PostgresDirectoryStore {
    async fn upsert_user(&self, user_id: &str, username: &str) -> Result<(), DatabaseError> {
        let pool = self.pool.clone();
        let user_id = user_id.to_string();
        let username = username.to_string();
        with_connection(pool, move |conn| upsert_user_in(conn, &user_id, &username)).await
    }

    async fn upsert_channel(&self, channel_id: &str, name: &str) -> Result<(), DatabaseError> {
        let pool = self.pool.clone();
        let channel_id = channel_id.to_string();
        let name = name.to_string();
        with_connection(pool, move |conn| upsert_channel_in(conn, &channel_id, &name)).await
    }
}

pub struct PostgresPokerStore {
    pool: Pool,
}

impl PostgresPokerStore {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl super::PokerStore for PostgresPokerStore {
    async fn create_session(&self, session: &NewPokerSession) -> Result<(), DatabaseError> {
        let pool = self.pool.clone();
        let session = session.clone();
        with_connection(pool, move |conn| {
            upsert_user_in(conn, &session.user_id, "")?;

            diesel::insert_into(poker_sessions::table)
                .values(&NewPokerRow {
                    user_id: &session.user_id,
                    in_amount: session.buy_in,
                    out_amount: session.cash_out,
                    location: session.location.as_deref(),
                    stakes_sb: session.stakes.small,
                    stakes_bb: session.stakes.big,
                    stakes_text: session.stakes.raw.as_deref(),
                    created_at: Utc::now(),
                })
                .execute(conn)
                .map(|_| ())
                .map_err(|e| DatabaseError::Query(e.to_string()))
        })
        .await
    }

    async fn lifetime(&self, user_id: &str) -> Result<PokerLifetime, DatabaseError> {
        let pool = self.pool.clone();
        let user_id = user_id.to_string();
        with_connection(pool, move |conn| {
            diesel::sql_query(
                "SELECT COUNT(*) AS sessions, \
                 COALESCE(SUM(out_amount - in_amount), 0.0) AS net \
                 FROM poker_sessions WHERE user_id = $1",
            )
            .bind::<Text, _>(&user_id)
            .get_result::<LifetimeRow>(conn)
            .map(|row| PokerLifetime {
                sessions: row.sessions,
                net: row.net,
            })
            .map_err(|e| DatabaseError::Query(e.to_string()))
        })
        .await
    }
}

pub struct PostgresAuditStore {
    pool: Pool,
}

impl PostgresAuditStore {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl super::AuditStore for PostgresAuditStore {
    async fn record_command(
        &self,
        user_id: &str,
        username: &str,
        command_text: &str,
    ) -> Result<(), DatabaseError> {
        let pool = self.pool.clone();
        let user_id = user_id.to_string();
        let username = username.to_string();
        let command_text = command_text.to_string();
        with_connection(pool, move |conn| {
            upsert_user_in(conn, &user_id, &username)?;

            diesel::insert_into(commands::table)
                .values(&NewCommandRow {
                    discord_user_id: &user_id,
                    command_text: &command_text,
                    created_at: Utc::now(),
                })
                .execute(conn)
                .map(|_| ())
                .map_err(|e| DatabaseError::Query(e.to_string()))
        })
        .await
    }

    async fn record_message(&self, message: &NewMessageLog) -> Result<(), DatabaseError> {
        let pool = self.pool.clone();
        let message = message.clone();
        with_connection(pool, move |conn| {
            upsert_user_in(conn, &message.user_id, &message.username)?;
            if !message.channel_id.is_empty() {
                upsert_channel_in(conn, &message.channel_id, &message.channel_name)?;
            }

            diesel::insert_into(messages::table)
                .values(&NewMessageRow {
                    discord_message_id: &message.message_id,
                    discord_channel_id: &message.channel_id,
                    discord_user_id: &message.user_id,
                    message: &message.content,
                    created_at: Utc::now(),
                })
                .on_conflict_do_nothing()
                .execute(conn)
                .map(|_| ())
                .map_err(|e| DatabaseError::Query(e.to_string()))
        })
        .await
    }
}
