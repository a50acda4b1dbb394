use chrono::{DateTime, SecondsFormat, Utc};

use crate::db::RsvpKind;

pub(crate) const DEFAULT_PRICE: &str = "Free";
pub(crate) const DEFAULT_EMOJI: &str = ":loudspeaker:";

/// Discord channel names: lowercase, no spaces.
pub(crate) fn sanitize_channel_name(name: &str) -> String {
    name.to_lowercase().replace(' ', "-")
}

pub(crate) fn mention(user_id: &str) -> String {
    format!("<@{user_id}>")
}

/// Plain announcement used when the template renderer fails during event
/// creation; the user still sees the essentials.
pub(crate) fn fallback_event_message(
    emoji: &str,
    title: &str,
    when: Option<DateTime<Utc>>,
    location: &str,
    price: &str,
    author_id: &str,
) -> String {
    let time_display = match when {
        Some(instant) => instant.to_rfc3339_opts(SecondsFormat::Secs, true),
        None => "TBD".to_string(),
    };
    format!(
        "{emoji} **{title}**\nTime: {time_display}\nLocation: {location}\nPrice: {price}\nCreated by: {}",
        mention(author_id)
    )
}

pub(crate) fn rsvp_confirmation(user_id: &str, kind: RsvpKind) -> String {
    format!("RSVP updated for {}: {kind}", mention(user_id))
}

pub(crate) fn session_summary(
    buy_in: f64,
    cash_out: f64,
    location: Option<&str>,
    stakes: Option<&str>,
) -> String {
    let mut summary = format!(
        "Session logged: In={buy_in:.2} Out={cash_out:.2} Profit={:.2}",
        cash_out - buy_in
    );
    if let Some(location) = location {
        summary.push_str(" Location=");
        summary.push_str(location);
    }
    if let Some(stakes) = stakes {
        summary.push_str(" Stakes=");
        summary.push_str(stakes);
    }
    summary
}

pub(crate) fn lifetime_summary(user_id: &str, sessions: i64, net: f64) -> String {
    format!(
        "Lifetime sessions for {}: {sessions} sessions, Net={net:.2}",
        mention(user_id)
    )
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::{
        fallback_event_message, lifetime_summary, mention, rsvp_confirmation,
        sanitize_channel_name, session_summary,
    };
    use crate::db::RsvpKind;

    #[test]
    fn sanitize_channel_name_lowercases_and_dashes() {
        assert_eq!(sanitize_channel_name("Game Night"), "game-night");
        assert_eq!(sanitize_channel_name("BBQ at the Lake"), "bbq-at-the-lake");
        assert_eq!(sanitize_channel_name("trivia"), "trivia");
    }

    #[test]
    fn mention_wraps_user_id() {
        assert_eq!(mention("12345"), "<@12345>");
    }

    #[test]
    fn fallback_message_includes_all_fields() {
        let when = Utc.with_ymd_and_hms(2025, 5, 2, 20, 4, 0).unwrap();
        let message = fallback_event_message(
            ":tada:",
            "Game Night",
            Some(when),
            "Mike's place",
            "Free",
            "42",
        );
        assert!(message.starts_with(":tada: **Game Night**"));
        assert!(message.contains("Time: 2025-05-02T20:04:00Z"));
        assert!(message.contains("Location: Mike's place"));
        assert!(message.contains("Price: Free"));
        assert!(message.contains("Created by: <@42>"));
    }

    #[test]
    fn fallback_message_shows_tbd_without_date() {
        let message =
            fallback_event_message(":tada:", "Game Night", None, "somewhere", "Free", "42");
        assert!(message.contains("Time: TBD"));
    }

    #[test]
    fn rsvp_confirmation_names_user_and_kind() {
        assert_eq!(
            rsvp_confirmation("7", RsvpKind::Yes),
            "RSVP updated for <@7>: yes"
        );
    }

    #[test]
    fn session_summary_appends_optional_parts() {
        assert_eq!(
            session_summary(100.0, 250.0, None, None),
            "Session logged: In=100.00 Out=250.00 Profit=150.00"
        );
        assert_eq!(
            session_summary(100.0, 80.5, Some("Casino"), Some("1/2")),
            "Session logged: In=100.00 Out=80.50 Profit=-19.50 Location=Casino Stakes=1/2"
        );
    }

    #[test]
    fn lifetime_summary_formats_net_to_cents() {
        assert_eq!(
            lifetime_summary("9", 3, 120.5),
            "Lifetime sessions for <@9>: 3 sessions, Net=120.50"
        );
    }
}
