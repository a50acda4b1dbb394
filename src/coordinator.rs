use std::sync::Arc;

use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::{error, info, warn};

use crate::db::{
    AuditStore, DatabaseManager, DirectoryStore, EventField, EventStore, NewEvent, NewMessageLog,
    NewPokerSession, PokerStore, RsvpKind,
};
use crate::parsers::{parse_flexible_time, parse_stakes};
use crate::render::MessageRenderer;
use crate::surface::ChatSurface;

pub mod logic;

const TIME_HINT: &str = "Please provide a valid time (formats like YYYY-MM-DD HH:MM:SS).";

const HELP_TEXT: &str = "**Available Commands:**\n\
    1. `/help` - Get a list of available commands.\n\
    2. `/event [name] [location] (time) (price) (emoji)` - Create a planning channel and announce an event.\n\
    3. `/rsvp [yes/no/maybe] (@user optional)` - RSVP to the event in this channel; mention someone to RSVP for them.\n\
    4. `/change_name [name]` - Change the name of the event.\n\
    5. `/change_date [new_date]` - Change the event's date/time.\n\
    6. `/change_location [new_location]` - Change the event location.\n\
    7. `/change_price [new_price]` - Change the event price.\n\
    8. `/change_notes` - Update the event notes in a form.\n\
    9. `/change_emoji [new_emoji]` - Change the event emoji.\n\
    10. `/session [in] [out] (location) (stakes)` - Log a poker session.\n\
    11. `/lifetime (@user optional)` - Show lifetime poker stats.";

/// What the invoking user sees. Replies are always ephemeral; the durable
/// record of a command's effect is the re-rendered announcement message.
#[derive(Debug, Clone)]
pub struct CommandReply {
    pub content: String,
}

impl CommandReply {
    fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum CommandError {
    /// Malformed user input; the message is specific and goes straight back
    /// to the invoker.
    #[error("{0}")]
    Validation(String),

    #[error("no event record for this channel")]
    NoEvent,

    /// An internal step failed. The user gets the generic `user_text`; the
    /// detail stays in the logs.
    #[error("{user_text}")]
    Failed {
        user_text: &'static str,
        #[source]
        source: anyhow::Error,
    },
}

impl CommandError {
    pub fn user_message(&self) -> String {
        match self {
            CommandError::Validation(message) => message.clone(),
            CommandError::NoEvent => "Could not find the event record.".to_string(),
            CommandError::Failed { user_text, .. } => (*user_text).to_string(),
        }
    }
}

fn failed<E>(user_text: &'static str) -> impl FnOnce(E) -> CommandError
where
    E: Into<anyhow::Error>,
{
    move |err| CommandError::Failed {
        user_text,
        source: err.into(),
    }
}

#[derive(Debug, Clone)]
pub struct CreateEventRequest {
    pub guild_id: String,
    pub author_id: String,
    pub name: String,
    pub time: Option<String>,
    pub location: String,
    pub price: Option<String>,
    pub emoji: Option<String>,
}

/// Orchestrates every command as the same short machine: validate, write to
/// the store, re-read, re-render, push the edit. The store write is the only
/// fatal step; the rendered message is a best-effort mirror and may lag one
/// edit behind under concurrent commands, corrected by the next render.
pub struct EventCoordinator {
    events: Arc<dyn EventStore>,
    directory: Arc<dyn DirectoryStore>,
    poker: Arc<dyn PokerStore>,
    audit: Arc<dyn AuditStore>,
    surface: Arc<dyn ChatSurface>,
    renderer: MessageRenderer,
}

impl EventCoordinator {
    pub fn new(
        db: Arc<DatabaseManager>,
        surface: Arc<dyn ChatSurface>,
        renderer: MessageRenderer,
    ) -> Self {
        Self {
            events: db.event_store(),
            directory: db.directory_store(),
            poker: db.poker_store(),
            audit: db.audit_store(),
            surface,
            renderer,
        }
    }

    /// Event creation bootstrap. The row is persisted before the message
    /// exists (the renderer reads it), then the message id is linked back.
    /// If the preliminary insert failed, a full insert runs after the send.
    pub async fn create_event(
        &self,
        request: CreateEventRequest,
    ) -> Result<CommandReply, CommandError> {
        let when: Option<DateTime<Utc>> = match request.time.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(raw) => Some(
                parse_flexible_time(raw)
                    .map_err(|_| CommandError::Validation(TIME_HINT.to_string()))?,
            ),
        };

        let price = request
            .price
            .filter(|value| !value.trim().is_empty())
            .unwrap_or_else(|| logic::DEFAULT_PRICE.to_string());
        let emoji = request
            .emoji
            .filter(|value| !value.trim().is_empty())
            .unwrap_or_else(|| logic::DEFAULT_EMOJI.to_string());

        let channel_name = logic::sanitize_channel_name(&request.name);
        let topic = format!("Event planning for {}", request.name);

        let channel = self
            .surface
            .create_event_channel(&request.guild_id, &channel_name, &topic, &request.author_id)
            .await
            .map_err(failed("Failed to create event channel."))?;

        // the events table has a foreign key onto the channel mirror, so the
        // channel row must exist before the event row
        if let Err(err) = self.directory.upsert_channel(&channel.id, &channel.name).await {
            warn!("failed to upsert channel before persisting event: {err}");
        }

        let new_event = NewEvent {
            channel_id: channel.id.clone(),
            message_id: None,
            emoji: emoji.clone(),
            date: when,
            title: request.name.clone(),
            location: request.location.clone(),
            price: price.clone(),
            author_id: request.author_id.clone(),
        };

        let preliminary = self.events.create_event(&new_event).await;
        if let Err(err) = &preliminary {
            warn!("failed to persist preliminary event row: {err}");
        }

        let rendered = match self.renderer.render(&channel.id).await {
            Ok(text) => text,
            Err(err) => {
                warn!("template render failed, sending plain announcement: {err}");
                logic::fallback_event_message(
                    &emoji,
                    &request.name,
                    when,
                    &request.location,
                    &price,
                    &request.author_id,
                )
            }
        };

        match self.surface.send_message(&channel.id, &rendered).await {
            Ok(message_id) => {
                if preliminary.is_ok() {
                    if let Err(err) = self
                        .events
                        .update_event_field(&channel.id, EventField::MessageId, &message_id)
                        .await
                    {
                        error!("failed to link announcement message to event: {err}");
                    }
                } else {
                    // slow path: the event row only comes into existence now
                    let mut full_event = new_event.clone();
                    full_event.message_id = Some(message_id.clone());
                    if let Err(err) = self.events.create_event(&full_event).await {
                        error!("failed to persist event after send: {err}");
                    }
                }

                if let Some((bot_id, bot_name)) = self.surface.bot_identity().await {
                    let log = NewMessageLog {
                        message_id,
                        channel_id: channel.id.clone(),
                        channel_name: channel.name.clone(),
                        user_id: bot_id,
                        username: bot_name,
                        content: rendered,
                    };
                    if let Err(err) = self.audit.record_message(&log).await {
                        warn!("failed to audit announcement message: {err}");
                    }
                }
            }
            Err(err) => {
                // durable state exists; the mirror can be repaired by any
                // later field change or RSVP
                error!("failed to send event announcement: {err}");
            }
        }

        info!("event created in channel {} ({})", channel.name, channel.id);
        Ok(CommandReply::new(format!(
            "Event channel '{}' created!",
            channel.name
        )))
    }

    pub async fn change_name(
        &self,
        channel_id: &str,
        new_name: &str,
    ) -> Result<CommandReply, CommandError> {
        let sanitized = logic::sanitize_channel_name(new_name);
        if let Err(err) = self.surface.rename_channel(channel_id, &sanitized).await {
            warn!("failed to rename channel {channel_id}: {err}");
        }

        self.events
            .update_event_field(channel_id, EventField::Title, new_name)
            .await
            .map_err(failed("Failed to update event in DB."))?;

        self.refresh_message(channel_id).await;
        Ok(CommandReply::new(format!(
            "Event name changed to '{new_name}'!"
        )))
    }

    pub async fn change_date(
        &self,
        channel_id: &str,
        raw_date: &str,
    ) -> Result<CommandReply, CommandError> {
        let when = parse_flexible_time(raw_date)
            .map_err(|_| CommandError::Validation(TIME_HINT.to_string()))?;

        self.events
            .update_event_field(channel_id, EventField::Date, &when.to_rfc3339())
            .await
            .map_err(failed("Failed to update event date in DB."))?;

        self.refresh_message(channel_id).await;
        Ok(CommandReply::new(format!(
            "Event date changed to <t:{}:R>!",
            when.timestamp()
        )))
    }

    pub async fn change_location(
        &self,
        channel_id: &str,
        new_location: &str,
    ) -> Result<CommandReply, CommandError> {
        self.events
            .update_event_field(channel_id, EventField::Location, new_location)
            .await
            .map_err(failed("Failed to update event location in DB."))?;

        self.refresh_message(channel_id).await;
        Ok(CommandReply::new(format!("Location updated: {new_location}")))
    }

    pub async fn change_price(
        &self,
        channel_id: &str,
        new_price: &str,
    ) -> Result<CommandReply, CommandError> {
        self.events
            .update_event_field(channel_id, EventField::Price, new_price)
            .await
            .map_err(failed("Failed to update event price in DB."))?;

        self.refresh_message(channel_id).await;
        Ok(CommandReply::new(format!("Price updated: {new_price}")))
    }

    pub async fn change_notes(
        &self,
        channel_id: &str,
        notes: &str,
    ) -> Result<CommandReply, CommandError> {
        self.events
            .update_event_field(channel_id, EventField::Description, notes)
            .await
            .map_err(failed("Failed to update event notes in DB."))?;

        self.refresh_message(channel_id).await;
        Ok(CommandReply::new("Notes updated."))
    }

    pub async fn change_emoji(
        &self,
        channel_id: &str,
        new_emoji: &str,
    ) -> Result<CommandReply, CommandError> {
        self.events
            .update_event_field(channel_id, EventField::Emoji, new_emoji)
            .await
            .map_err(failed("Failed to update event emoji in DB."))?;

        self.refresh_message(channel_id).await;
        Ok(CommandReply::new(format!("Emoji updated to {new_emoji}")))
    }

    /// RSVP machine: validate kind, find the event, upsert, refresh mirror.
    pub async fn rsvp(
        &self,
        channel_id: &str,
        invoker_id: &str,
        target_user: Option<String>,
        raw_kind: &str,
    ) -> Result<CommandReply, CommandError> {
        let kind = RsvpKind::parse(raw_kind).map_err(|_| {
            CommandError::Validation("Invalid response. Please use yes, no, or maybe.".to_string())
        })?;
        let user_id = target_user.unwrap_or_else(|| invoker_id.to_string());

        let event = self
            .events
            .get_event_by_channel(channel_id)
            .await
            .map_err(failed("Failed to save RSVP."))?
            .ok_or(CommandError::NoEvent)?;

        self.events
            .upsert_response(event.id, &user_id, kind)
            .await
            .map_err(failed("Failed to save RSVP."))?;

        self.refresh_message(channel_id).await;
        Ok(CommandReply::new(logic::rsvp_confirmation(&user_id, kind)))
    }

    pub async fn log_session(
        &self,
        user_id: &str,
        buy_in: f64,
        cash_out: f64,
        location: Option<String>,
        stakes: Option<String>,
    ) -> Result<CommandReply, CommandError> {
        if !buy_in.is_finite() || !cash_out.is_finite() || buy_in < 0.0 || cash_out < 0.0 {
            return Err(CommandError::Validation(
                "Buy-in and cash-out must be non-negative amounts.".to_string(),
            ));
        }

        let stakes = stakes.as_deref().map(parse_stakes).unwrap_or_default();
        let location = location.filter(|value| !value.trim().is_empty());

        let session = NewPokerSession {
            user_id: user_id.to_string(),
            buy_in,
            cash_out,
            location: location.clone(),
            stakes: stakes.clone(),
        };
        self.poker
            .create_session(&session)
            .await
            .map_err(failed("Failed to save poker session."))?;

        Ok(CommandReply::new(logic::session_summary(
            buy_in,
            cash_out,
            location.as_deref(),
            stakes.raw.as_deref(),
        )))
    }

    pub async fn lifetime(&self, user_id: &str) -> Result<CommandReply, CommandError> {
        let stats = self
            .poker
            .lifetime(user_id)
            .await
            .map_err(failed("Failed to fetch lifetime stats."))?;

        Ok(CommandReply::new(logic::lifetime_summary(
            user_id,
            stats.sessions,
            stats.net,
        )))
    }

    pub fn help(&self) -> CommandReply {
        CommandReply::new(HELP_TEXT)
    }

    /// Best-effort audit trail; never surfaces to the user.
    pub async fn audit_command(&self, user_id: &str, username: &str, command_text: &str) {
        if let Err(err) = self.audit.record_command(user_id, username, command_text).await {
            warn!("failed to audit command: {err}");
        }
    }

    pub async fn audit_message(&self, log: NewMessageLog) {
        if let Err(err) = self.audit.record_message(&log).await {
            warn!("failed to audit message: {err}");
        }
    }

    /// Re-renders the announcement from current store state and pushes the
    /// edit. Stops silently while no message reference exists yet; an edit
    /// failure is logged, never fatal, since the store already holds the
    /// durable change.
    async fn refresh_message(&self, channel_id: &str) {
        let event = match self.events.get_event_by_channel(channel_id).await {
            Ok(Some(event)) => event,
            Ok(None) => return,
            Err(err) => {
                warn!("failed to re-read event for channel {channel_id}: {err}");
                return;
            }
        };

        let Some(message_id) = event.message_id else {
            return;
        };

        match self.renderer.render(channel_id).await {
            Ok(text) => {
                if let Err(err) = self.surface.edit_message(channel_id, &message_id, &text).await {
                    warn!("failed to edit announcement message {message_id}: {err}");
                }
            }
            Err(err) => warn!("failed to render announcement for {channel_id}: {err}"),
        }
    }
}

#[cfg(all(test, feature = "sqlite"))]
mod tests {
    use std::sync::Arc;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicBool, Ordering};

    use async_trait::async_trait;
    use tempfile::NamedTempFile;

    use super::{CommandError, CreateEventRequest, EventCoordinator};
    use crate::config::DatabaseConfig;
    use crate::db::DatabaseManager;
    use crate::render::MessageRenderer;
    use crate::surface::{ChatSurface, CreatedChannel, SurfaceError};

    const TEMPLATE: &str = "{{ Emoji }} {{ Title }} | {{ Dates }} | {{ Location }} | {{ Price }} | \
        going={% for user in Going %}{{ user }}{% endfor %} \
        maybe={% for user in Maybe %}{{ user }}{% endfor %} \
        out={% for user in CantMakeIt %}{{ user }}{% endfor %}";

    #[derive(Debug, Clone, PartialEq, Eq)]
    enum SurfaceCall {
        CreateChannel { name: String },
        Send { channel_id: String },
        Edit { channel_id: String, message_id: String },
        Rename { channel_id: String, name: String },
    }

    struct RecordingSurface {
        calls: Mutex<Vec<SurfaceCall>>,
        fail_sends: AtomicBool,
    }

    impl RecordingSurface {
        fn new() -> Self {
            Self {
                calls: Mutex::new(Vec::new()),
                fail_sends: AtomicBool::new(false),
            }
        }

        fn calls(&self) -> Vec<SurfaceCall> {
            self.calls.lock().unwrap().clone()
        }

        fn edits(&self) -> usize {
            self.calls()
                .iter()
                .filter(|call| matches!(call, SurfaceCall::Edit { .. }))
                .count()
        }
    }

    #[async_trait]
    impl ChatSurface for RecordingSurface {
        async fn create_event_channel(
            &self,
            _guild_id: &str,
            name: &str,
            _topic: &str,
            _creator_id: &str,
        ) -> Result<CreatedChannel, SurfaceError> {
            self.calls.lock().unwrap().push(SurfaceCall::CreateChannel {
                name: name.to_string(),
            });
            Ok(CreatedChannel {
                id: format!("chan-{name}"),
                name: name.to_string(),
            })
        }

        async fn send_message(
            &self,
            channel_id: &str,
            _content: &str,
        ) -> Result<String, SurfaceError> {
            if self.fail_sends.load(Ordering::SeqCst) {
                return Err(SurfaceError::Api("send rejected".to_string()));
            }
            self.calls.lock().unwrap().push(SurfaceCall::Send {
                channel_id: channel_id.to_string(),
            });
            Ok("msg-1".to_string())
        }

        async fn edit_message(
            &self,
            channel_id: &str,
            message_id: &str,
            _content: &str,
        ) -> Result<(), SurfaceError> {
            self.calls.lock().unwrap().push(SurfaceCall::Edit {
                channel_id: channel_id.to_string(),
                message_id: message_id.to_string(),
            });
            Ok(())
        }

        async fn rename_channel(&self, channel_id: &str, name: &str) -> Result<(), SurfaceError> {
            self.calls.lock().unwrap().push(SurfaceCall::Rename {
                channel_id: channel_id.to_string(),
                name: name.to_string(),
            });
            Ok(())
        }

        async fn bot_identity(&self) -> Option<(String, String)> {
            Some(("bot-1".to_string(), "eventbot".to_string()))
        }
    }

    async fn build_coordinator(
        file: &NamedTempFile,
    ) -> (Arc<DatabaseManager>, Arc<RecordingSurface>, EventCoordinator) {
        let config = DatabaseConfig {
            url: None,
            conn_string: None,
            filename: Some(file.path().to_string_lossy().to_string()),
            max_connections: Some(1),
            min_connections: Some(1),
        };
        let manager = Arc::new(DatabaseManager::new(&config).await.expect("db manager"));
        manager.migrate().await.expect("migrate");

        let surface = Arc::new(RecordingSurface::new());
        let renderer = MessageRenderer::from_template_str(manager.event_store(), TEMPLATE)
            .expect("renderer");
        let coordinator =
            EventCoordinator::new(manager.clone(), surface.clone(), renderer);
        (manager, surface, coordinator)
    }

    fn game_night_request() -> CreateEventRequest {
        CreateEventRequest {
            guild_id: "guild-1".to_string(),
            author_id: "organizer".to_string(),
            name: "Game Night".to_string(),
            time: None,
            location: "Mike's place".to_string(),
            price: None,
            emoji: None,
        }
    }

    #[tokio::test]
    async fn create_event_persists_row_and_links_message() {
        let file = NamedTempFile::new().expect("temp sqlite file");
        let (manager, surface, coordinator) = build_coordinator(&file).await;

        let reply = coordinator
            .create_event(game_night_request())
            .await
            .expect("create event");
        assert_eq!(reply.content, "Event channel 'game-night' created!");

        let event = manager
            .event_store()
            .get_event_by_channel("chan-game-night")
            .await
            .expect("query")
            .expect("event row exists");
        assert_eq!(event.title, "Game Night");
        assert!(event.date.is_none(), "no explicit time means TBD");
        assert_eq!(event.message_id.as_deref(), Some("msg-1"));
        assert_eq!(event.price, "Free");
        assert_eq!(event.emoji, ":loudspeaker:");

        let calls = surface.calls();
        assert!(matches!(&calls[0], SurfaceCall::CreateChannel { name } if name == "game-night"));
        assert!(calls.iter().any(|c| matches!(c, SurfaceCall::Send { .. })));
    }

    #[tokio::test]
    async fn create_event_rejects_bad_time() {
        let file = NamedTempFile::new().expect("temp sqlite file");
        let (_, surface, coordinator) = build_coordinator(&file).await;

        let mut request = game_night_request();
        request.time = Some("not a date".to_string());
        let result = coordinator.create_event(request).await;
        assert!(matches!(result, Err(CommandError::Validation(_))));
        assert!(surface.calls().is_empty(), "validation stops before any surface call");
    }

    #[tokio::test]
    async fn create_event_survives_send_failure() {
        let file = NamedTempFile::new().expect("temp sqlite file");
        let (manager, surface, coordinator) = build_coordinator(&file).await;
        surface.fail_sends.store(true, Ordering::SeqCst);

        let reply = coordinator
            .create_event(game_night_request())
            .await
            .expect("create event still succeeds");
        assert!(reply.content.contains("created"));

        // durable row exists, just without a message reference
        let event = manager
            .event_store()
            .get_event_by_channel("chan-game-night")
            .await
            .expect("query")
            .expect("event row exists");
        assert!(event.message_id.is_none());
    }

    #[tokio::test]
    async fn rsvp_updates_store_and_edits_once() {
        let file = NamedTempFile::new().expect("temp sqlite file");
        let (manager, surface, coordinator) = build_coordinator(&file).await;
        coordinator
            .create_event(game_night_request())
            .await
            .expect("create event");

        let reply = coordinator
            .rsvp("chan-game-night", "user-x", None, "yes")
            .await
            .expect("rsvp");
        assert!(reply.content.contains("<@user-x>"));
        assert!(reply.content.contains("yes"));
        assert_eq!(surface.edits(), 1, "one re-render, one edit");

        let event = manager
            .event_store()
            .get_event_by_channel("chan-game-night")
            .await
            .expect("query")
            .expect("event");
        let responses = manager
            .event_store()
            .get_responses(event.id)
            .await
            .expect("responses");
        assert_eq!(responses.going, vec!["user-x"]);
    }

    #[tokio::test]
    async fn rsvp_for_someone_else_uses_their_mention() {
        let file = NamedTempFile::new().expect("temp sqlite file");
        let (_, _, coordinator) = build_coordinator(&file).await;
        coordinator
            .create_event(game_night_request())
            .await
            .expect("create event");

        let reply = coordinator
            .rsvp("chan-game-night", "user-x", Some("friend".to_string()), "maybe")
            .await
            .expect("rsvp");
        assert!(reply.content.contains("<@friend>"));
    }

    #[tokio::test]
    async fn rsvp_rejects_unknown_kind_before_any_write() {
        let file = NamedTempFile::new().expect("temp sqlite file");
        let (manager, surface, coordinator) = build_coordinator(&file).await;
        coordinator
            .create_event(game_night_request())
            .await
            .expect("create event");

        let result = coordinator
            .rsvp("chan-game-night", "user-x", None, "definitely")
            .await;
        assert!(matches!(result, Err(CommandError::Validation(_))));
        assert_eq!(surface.edits(), 0);

        let event = manager
            .event_store()
            .get_event_by_channel("chan-game-night")
            .await
            .expect("query")
            .expect("event");
        let responses = manager
            .event_store()
            .get_responses(event.id)
            .await
            .expect("responses");
        assert!(responses.going.is_empty());
        assert!(responses.maybe.is_empty());
        assert!(responses.declined.is_empty());
    }

    #[tokio::test]
    async fn rsvp_without_event_reports_no_record() {
        let file = NamedTempFile::new().expect("temp sqlite file");
        let (_, _, coordinator) = build_coordinator(&file).await;

        let result = coordinator.rsvp("empty-channel", "user-x", None, "yes").await;
        assert!(matches!(result, Err(CommandError::NoEvent)));
    }

    #[tokio::test]
    async fn field_change_writes_then_edits_mirror() {
        let file = NamedTempFile::new().expect("temp sqlite file");
        let (manager, surface, coordinator) = build_coordinator(&file).await;
        coordinator
            .create_event(game_night_request())
            .await
            .expect("create event");

        let reply = coordinator
            .change_location("chan-game-night", "the park")
            .await
            .expect("change location");
        assert_eq!(reply.content, "Location updated: the park");
        assert_eq!(surface.edits(), 1);

        let event = manager
            .event_store()
            .get_event_by_channel("chan-game-night")
            .await
            .expect("query")
            .expect("event");
        assert_eq!(event.location, "the park");
    }

    #[tokio::test]
    async fn field_change_without_message_skips_edit() {
        let file = NamedTempFile::new().expect("temp sqlite file");
        let (_, surface, coordinator) = build_coordinator(&file).await;
        surface.fail_sends.store(true, Ordering::SeqCst);
        coordinator
            .create_event(game_night_request())
            .await
            .expect("create event");
        surface.fail_sends.store(false, Ordering::SeqCst);

        coordinator
            .change_price("chan-game-night", "$5")
            .await
            .expect("change price");
        assert_eq!(surface.edits(), 0, "no message reference yet, stop silently");
    }

    #[tokio::test]
    async fn change_date_validates_then_reports_relative_timestamp() {
        let file = NamedTempFile::new().expect("temp sqlite file");
        let (_, _, coordinator) = build_coordinator(&file).await;
        coordinator
            .create_event(game_night_request())
            .await
            .expect("create event");

        let bad = coordinator.change_date("chan-game-night", "2025-13-40").await;
        assert!(matches!(bad, Err(CommandError::Validation(_))));

        let good = coordinator
            .change_date("chan-game-night", "2025-05-02 15:04")
            .await
            .expect("change date");
        assert!(good.content.starts_with("Event date changed to <t:"));
    }

    #[tokio::test]
    async fn change_name_renames_channel_too() {
        let file = NamedTempFile::new().expect("temp sqlite file");
        let (_, surface, coordinator) = build_coordinator(&file).await;
        coordinator
            .create_event(game_night_request())
            .await
            .expect("create event");

        coordinator
            .change_name("chan-game-night", "Board Game Night")
            .await
            .expect("change name");
        assert!(surface.calls().iter().any(|call| matches!(
            call,
            SurfaceCall::Rename { name, .. } if name == "board-game-night"
        )));
    }

    #[tokio::test]
    async fn session_validates_amounts_and_reports_lifetime() {
        let file = NamedTempFile::new().expect("temp sqlite file");
        let (_, _, coordinator) = build_coordinator(&file).await;

        let negative = coordinator
            .log_session("player", -5.0, 10.0, None, None)
            .await;
        assert!(matches!(negative, Err(CommandError::Validation(_))));

        let reply = coordinator
            .log_session("player", 100.0, 250.0, Some("Casino".to_string()), Some("1/2".to_string()))
            .await
            .expect("log session");
        assert_eq!(
            reply.content,
            "Session logged: In=100.00 Out=250.00 Profit=150.00 Location=Casino Stakes=1/2"
        );

        let lifetime = coordinator.lifetime("player").await.expect("lifetime");
        assert_eq!(
            lifetime.content,
            "Lifetime sessions for <@player>: 1 sessions, Net=150.00"
        );
    }
}
