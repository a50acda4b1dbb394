use std::sync::Arc;

use chrono::{DateTime, Utc};
use tera::{Context, Tera};
use thiserror::Error;
use tracing::warn;

use crate::db::{DatabaseError, Event, EventResponses, EventStore};

const TEMPLATE_NAME: &str = "event";

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("no event record for channel {0}")]
    EventNotFound(String),

    #[error(transparent)]
    Store(#[from] DatabaseError),

    #[error("failed to read template '{path}': {source}")]
    TemplateIo {
        path: String,
        source: std::io::Error,
    },

    #[error("template error: {0}")]
    Template(#[from] tera::Error),
}

/// Renders the canonical announcement text for a channel's event.
///
/// Every render re-reads the full event row and its RSVP rows, so the output
/// is a pure function of store state: identical state renders byte-identical
/// text. Nothing is ever derived from the previous message content.
pub struct MessageRenderer {
    store: Arc<dyn EventStore>,
    tera: Tera,
}

impl MessageRenderer {
    /// Loads the external template asset. The file is a swappable layout;
    /// this renderer only supplies the substitution values.
    pub fn from_file(store: Arc<dyn EventStore>, path: &str) -> Result<Self, RenderError> {
        let template = std::fs::read_to_string(path).map_err(|source| RenderError::TemplateIo {
            path: path.to_string(),
            source,
        })?;
        Self::from_template_str(store, &template)
    }

    pub fn from_template_str(
        store: Arc<dyn EventStore>,
        template: &str,
    ) -> Result<Self, RenderError> {
        let mut tera = Tera::default();
        tera.add_raw_template(TEMPLATE_NAME, template)?;
        Ok(Self { store, tera })
    }

    pub async fn render(&self, channel_id: &str) -> Result<String, RenderError> {
        let event = self
            .store
            .get_event_by_channel(channel_id)
            .await?
            .ok_or_else(|| RenderError::EventNotFound(channel_id.to_string()))?;

        // an event with no RSVPs yet must still render
        let responses = match self.store.get_responses(event.id).await {
            Ok(responses) => responses,
            Err(err) => {
                warn!("failed to fetch RSVPs for event {}: {err}", event.id);
                EventResponses::default()
            }
        };

        let context = build_context(&event, &responses);
        Ok(self.tera.render(TEMPLATE_NAME, &context)?)
    }
}

fn build_context(event: &Event, responses: &EventResponses) -> Context {
    let mut context = Context::new();
    context.insert("Emoji", &event.emoji);
    context.insert("Title", &event.title);
    context.insert("Organizer", &mention(&event.author_id));
    context.insert("Dates", &display_date(event.date.as_ref()));
    context.insert("Location", &event.location);
    context.insert("Price", &event.price);
    context.insert("Going", &mentions(&responses.going));
    context.insert("Maybe", &mentions(&responses.maybe));
    context.insert("CantMakeIt", &mentions(&responses.declined));

    let notes: Vec<&str> = if event.description.is_empty() {
        Vec::new()
    } else {
        vec![event.description.as_str()]
    };
    context.insert("Notes", &notes);

    context
}

/// Discord's relative-timestamp marker, or the literal TBD for a dateless event.
fn display_date(date: Option<&DateTime<Utc>>) -> String {
    match date {
        Some(when) => format!("<t:{}:R>", when.timestamp()),
        None => "TBD".to_string(),
    }
}

fn mention(user_id: &str) -> String {
    format!("<@{user_id}>")
}

fn mentions(ids: &[String]) -> Vec<String> {
    ids.iter().map(|id| mention(id)).collect()
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::display_date;

    #[test]
    fn display_date_uses_relative_marker() {
        let when = Utc.with_ymd_and_hms(2025, 5, 2, 20, 4, 0).unwrap();
        assert_eq!(display_date(Some(&when)), format!("<t:{}:R>", when.timestamp()));
    }

    #[test]
    fn display_date_falls_back_to_tbd() {
        assert_eq!(display_date(None), "TBD");
    }
}

#[cfg(all(test, feature = "sqlite"))]
mod store_tests {
    use tempfile::NamedTempFile;

    use super::{MessageRenderer, RenderError};
    use crate::config::DatabaseConfig;
    use crate::db::{DatabaseManager, EventField, NewEvent, RsvpKind};

    const TEMPLATE: &str = "{{ Emoji }} **{{ Title }}**\n\
        Hosted by {{ Organizer }}\n\
        When: {{ Dates }}\n\
        Where: {{ Location }}\n\
        Price: {{ Price }}\n\
        Going: {% for user in Going %}{{ user }} {% endfor %}\n\
        Maybe: {% for user in Maybe %}{{ user }} {% endfor %}\n\
        Out: {% for user in CantMakeIt %}{{ user }} {% endfor %}\n\
        {% for note in Notes %}Notes: {{ note }}\n{% endfor %}";

    async fn seeded_manager(file: &NamedTempFile) -> (DatabaseManager, i64) {
        let config = DatabaseConfig {
            url: None,
            conn_string: None,
            filename: Some(file.path().to_string_lossy().to_string()),
            max_connections: Some(1),
            min_connections: Some(1),
        };
        let manager = DatabaseManager::new(&config).await.expect("db manager");
        manager.migrate().await.expect("migrate");
        manager
            .directory_store()
            .upsert_channel("chan-1", "game-night")
            .await
            .expect("channel");
        let event_id = manager
            .event_store()
            .create_event(&NewEvent {
                channel_id: "chan-1".to_string(),
                message_id: None,
                emoji: ":tada:".to_string(),
                date: None,
                title: "Game Night".to_string(),
                location: "Mike's place".to_string(),
                price: "Free".to_string(),
                author_id: "organizer".to_string(),
            })
            .await
            .expect("event");
        (manager, event_id)
    }

    #[tokio::test]
    async fn dateless_event_renders_tbd() {
        let file = NamedTempFile::new().expect("temp sqlite file");
        let (manager, _) = seeded_manager(&file).await;
        let renderer =
            MessageRenderer::from_template_str(manager.event_store(), TEMPLATE).expect("renderer");

        let text = renderer.render("chan-1").await.expect("render");
        assert!(text.contains("TBD"));
        assert!(text.contains(":tada: **Game Night**"));
        assert!(text.contains("Hosted by <@organizer>"));
    }

    #[tokio::test]
    async fn render_is_deterministic_for_identical_state() {
        let file = NamedTempFile::new().expect("temp sqlite file");
        let (manager, event_id) = seeded_manager(&file).await;
        manager
            .event_store()
            .upsert_response(event_id, "alice", RsvpKind::Yes)
            .await
            .expect("rsvp");
        let renderer =
            MessageRenderer::from_template_str(manager.event_store(), TEMPLATE).expect("renderer");

        let first = renderer.render("chan-1").await.expect("render once");
        let second = renderer.render("chan-1").await.expect("render twice");
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn rsvps_become_mention_tokens() {
        let file = NamedTempFile::new().expect("temp sqlite file");
        let (manager, event_id) = seeded_manager(&file).await;
        let events = manager.event_store();
        events.upsert_response(event_id, "alice", RsvpKind::Yes).await.expect("a");
        events.upsert_response(event_id, "bob", RsvpKind::Maybe).await.expect("b");
        events.upsert_response(event_id, "carol", RsvpKind::No).await.expect("c");

        let renderer = MessageRenderer::from_template_str(events.clone(), TEMPLATE).expect("renderer");
        let text = renderer.render("chan-1").await.expect("render");
        assert!(text.contains("Going: <@alice>"));
        assert!(text.contains("Maybe: <@bob>"));
        assert!(text.contains("Out: <@carol>"));
    }

    #[tokio::test]
    async fn notes_render_only_when_present() {
        let file = NamedTempFile::new().expect("temp sqlite file");
        let (manager, _) = seeded_manager(&file).await;
        let events = manager.event_store();
        let renderer = MessageRenderer::from_template_str(events.clone(), TEMPLATE).expect("renderer");

        let without = renderer.render("chan-1").await.expect("render");
        assert!(!without.contains("Notes:"));

        events
            .update_event_field("chan-1", EventField::Description, "bring snacks")
            .await
            .expect("notes");
        let with = renderer.render("chan-1").await.expect("render");
        assert!(with.contains("Notes: bring snacks"));
    }

    #[tokio::test]
    async fn unknown_channel_is_not_found() {
        let file = NamedTempFile::new().expect("temp sqlite file");
        let (manager, _) = seeded_manager(&file).await;
        let renderer =
            MessageRenderer::from_template_str(manager.event_store(), TEMPLATE).expect("renderer");

        let result = renderer.render("other-channel").await;
        assert!(matches!(result, Err(RenderError::EventNotFound(_))));
    }
}
