use anyhow::Result;
use tracing::error;

use serenity::all::{
    ActionRowComponent, CommandData, CommandDataOptionValue, CommandInteraction,
    CommandOptionType, Context as SerenityContext, CreateActionRow, CreateCommand,
    CreateCommandOption, CreateInputText, CreateInteractionResponse,
    CreateInteractionResponseMessage, CreateModal, GuildId, Http, InputTextStyle,
    ModalInteraction,
};

use crate::coordinator::{CommandError, CommandReply, CreateEventRequest, EventCoordinator};

const NOTES_MODAL_ID: &str = "change_notes_modal";
const NOTES_INPUT_ID: &str = "notes_input";

/// Slash-command surface, registered per guild. Argument schemas mirror the
/// coordinator's typed inputs; extraction below is the only place raw
/// interaction payloads are touched.
pub fn definitions() -> Vec<CreateCommand> {
    vec![
        CreateCommand::new("event")
            .description("Create an event.")
            .add_option(
                CreateCommandOption::new(CommandOptionType::String, "event_name", "Name of the event")
                    .required(true),
            )
            .add_option(
                CreateCommandOption::new(
                    CommandOptionType::String,
                    "location",
                    "Location of the event",
                )
                .required(true),
            )
            .add_option(CreateCommandOption::new(
                CommandOptionType::String,
                "time",
                "Time/date of the event (flexible formats like YYYY-MM-DD HH:MM:SS; partials accepted e.g. 2025-05)",
            ))
            .add_option(CreateCommandOption::new(
                CommandOptionType::String,
                "price",
                "Price of the event (default: Free)",
            ))
            .add_option(CreateCommandOption::new(
                CommandOptionType::String,
                "emoji",
                "Custom emoji for the event (default: :loudspeaker:)",
            )),
        CreateCommand::new("rsvp")
            .description("RSVP for the event by choosing yes, no, or maybe")
            .add_option(
                CreateCommandOption::new(
                    CommandOptionType::String,
                    "response",
                    "Your RSVP response (yes, no, maybe)",
                )
                .required(true),
            )
            .add_option(CreateCommandOption::new(
                CommandOptionType::User,
                "user",
                "Optional: The user to RSVP for",
            )),
        CreateCommand::new("change_name")
            .description("Change the name of the event in the current channel")
            .add_option(
                CreateCommandOption::new(CommandOptionType::String, "new_name", "New name of event")
                    .required(true),
            ),
        CreateCommand::new("change_date")
            .description("Change the date/time of the event in the current channel")
            .add_option(
                CreateCommandOption::new(
                    CommandOptionType::String,
                    "new_date",
                    "New date/time of event (flexible formats like YYYY-MM-DD HH:MM:SS)",
                )
                .required(true),
            ),
        CreateCommand::new("change_location")
            .description("Change the location of the event in the current channel")
            .add_option(
                CreateCommandOption::new(
                    CommandOptionType::String,
                    "new_location",
                    "New location of the event",
                )
                .required(true),
            ),
        CreateCommand::new("change_price")
            .description("Change the price of the event in the current channel")
            .add_option(
                CreateCommandOption::new(
                    CommandOptionType::String,
                    "new_price",
                    "New price of the event",
                )
                .required(true),
            ),
        CreateCommand::new("change_notes")
            .description("Change the notes for the event in the current channel"),
        CreateCommand::new("change_emoji")
            .description("Change the emoji for the event in the current channel")
            .add_option(
                CreateCommandOption::new(
                    CommandOptionType::String,
                    "new_emoji",
                    "New emoji for the event (e.g., :tada:, :calendar:)",
                )
                .required(true),
            ),
        CreateCommand::new("help").description("Get a list of available commands."),
        CreateCommand::new("session")
            .description("Log a poker session: /session [in] [out] (location) (stakes)")
            .add_option(
                CreateCommandOption::new(
                    CommandOptionType::Number,
                    "in",
                    "Buy-in amount (e.g. 100.00)",
                )
                .required(true),
            )
            .add_option(
                CreateCommandOption::new(
                    CommandOptionType::Number,
                    "out",
                    "Cash-out amount (e.g. 250.00)",
                )
                .required(true),
            )
            .add_option(CreateCommandOption::new(
                CommandOptionType::String,
                "location",
                "Optional location",
            ))
            .add_option(CreateCommandOption::new(
                CommandOptionType::String,
                "stakes",
                "Optional stakes (e.g. 1/2)",
            )),
        CreateCommand::new("lifetime")
            .description("Show lifetime poker stats for a user")
            .add_option(CreateCommandOption::new(
                CommandOptionType::User,
                "user",
                "Optional user to query",
            )),
    ]
}

pub async fn register_guild_commands(http: &Http, guild_id: &str) -> Result<usize> {
    let guild = GuildId::new(guild_id.parse()?);
    let registered = guild.set_commands(http, definitions()).await?;
    Ok(registered.len())
}

/// Short "name opt=value" line for the command audit log.
pub fn audit_text(data: &CommandData) -> String {
    let mut text = data.name.clone();
    for option in &data.options {
        text.push(' ');
        text.push_str(&option.name);
        let value = match &option.value {
            CommandDataOptionValue::String(value) => Some(value.clone()),
            CommandDataOptionValue::Number(value) => Some(value.to_string()),
            CommandDataOptionValue::Integer(value) => Some(value.to_string()),
            CommandDataOptionValue::Boolean(value) => Some(value.to_string()),
            CommandDataOptionValue::User(user_id) => Some(user_id.to_string()),
            _ => None,
        };
        if let Some(value) = value {
            text.push('=');
            text.push_str(&value);
        }
    }
    text
}

fn option_str(data: &CommandData, name: &str) -> Option<String> {
    data.options
        .iter()
        .find(|option| option.name == name)
        .and_then(|option| match &option.value {
            CommandDataOptionValue::String(value) => Some(value.clone()),
            _ => None,
        })
}

fn option_f64(data: &CommandData, name: &str) -> Option<f64> {
    data.options
        .iter()
        .find(|option| option.name == name)
        .and_then(|option| match &option.value {
            CommandDataOptionValue::Number(value) => Some(*value),
            CommandDataOptionValue::Integer(value) => Some(*value as f64),
            _ => None,
        })
}

fn option_user(data: &CommandData, name: &str) -> Option<String> {
    data.options
        .iter()
        .find(|option| option.name == name)
        .and_then(|option| match &option.value {
            CommandDataOptionValue::User(user_id) => Some(user_id.to_string()),
            _ => None,
        })
}

pub async fn handle_command(
    ctx: &SerenityContext,
    coordinator: &EventCoordinator,
    command: &CommandInteraction,
) {
    let data = &command.data;
    let channel_id = command.channel_id.to_string();
    let invoker_id = command.user.id.to_string();

    let result: Result<CommandReply, CommandError> = match data.name.as_str() {
        "event" => {
            let Some(guild) = command.guild_id else {
                respond(ctx, command, "This command only works in a server.").await;
                return;
            };
            coordinator
                .create_event(CreateEventRequest {
                    guild_id: guild.to_string(),
                    author_id: invoker_id.clone(),
                    name: option_str(data, "event_name").unwrap_or_default(),
                    time: option_str(data, "time"),
                    location: option_str(data, "location").unwrap_or_default(),
                    price: option_str(data, "price"),
                    emoji: option_str(data, "emoji"),
                })
                .await
        }
        "rsvp" => {
            let response = option_str(data, "response").unwrap_or_default();
            coordinator
                .rsvp(&channel_id, &invoker_id, option_user(data, "user"), &response)
                .await
        }
        "change_name" => {
            coordinator
                .change_name(&channel_id, &option_str(data, "new_name").unwrap_or_default())
                .await
        }
        "change_date" => {
            coordinator
                .change_date(&channel_id, &option_str(data, "new_date").unwrap_or_default())
                .await
        }
        "change_location" => {
            coordinator
                .change_location(
                    &channel_id,
                    &option_str(data, "new_location").unwrap_or_default(),
                )
                .await
        }
        "change_price" => {
            coordinator
                .change_price(&channel_id, &option_str(data, "new_price").unwrap_or_default())
                .await
        }
        "change_emoji" => {
            coordinator
                .change_emoji(&channel_id, &option_str(data, "new_emoji").unwrap_or_default())
                .await
        }
        "change_notes" => {
            open_notes_modal(ctx, command).await;
            return;
        }
        "help" => Ok(coordinator.help()),
        "session" => {
            coordinator
                .log_session(
                    &invoker_id,
                    option_f64(data, "in").unwrap_or(0.0),
                    option_f64(data, "out").unwrap_or(0.0),
                    option_str(data, "location"),
                    option_str(data, "stakes"),
                )
                .await
        }
        "lifetime" => {
            let target = option_user(data, "user").unwrap_or_else(|| invoker_id.clone());
            coordinator.lifetime(&target).await
        }
        _ => return,
    };

    let content = match result {
        Ok(reply) => reply.content,
        Err(err) => {
            error!("command '{}' failed: {err:#}", data.name);
            err.user_message()
        }
    };
    respond(ctx, command, &content).await;
}

/// Notes are collected through a modal form rather than a command option, so
/// multi-line text survives intact.
async fn open_notes_modal(ctx: &SerenityContext, command: &CommandInteraction) {
    let input = CreateInputText::new(InputTextStyle::Paragraph, "Notes / Description", NOTES_INPUT_ID)
        .required(false)
        .placeholder("Add or edit notes for this event...")
        .max_length(2000);
    let modal = CreateModal::new(NOTES_MODAL_ID, "Change event notes")
        .components(vec![CreateActionRow::InputText(input)]);

    if let Err(err) = command
        .create_response(&ctx.http, CreateInteractionResponse::Modal(modal))
        .await
    {
        error!("failed to open notes modal: {err}");
    }
}

pub async fn handle_modal(
    ctx: &SerenityContext,
    coordinator: &EventCoordinator,
    modal: &ModalInteraction,
) {
    if modal.data.custom_id != NOTES_MODAL_ID {
        return;
    }

    let mut notes = String::new();
    for row in &modal.data.components {
        for component in &row.components {
            if let ActionRowComponent::InputText(input) = component {
                if input.custom_id == NOTES_INPUT_ID {
                    notes = input.value.clone().unwrap_or_default();
                }
            }
        }
    }

    coordinator
        .audit_command(
            &modal.user.id.to_string(),
            &modal.user.name,
            &format!("change_notes: {notes}"),
        )
        .await;

    let channel_id = modal.channel_id.to_string();
    let content = match coordinator.change_notes(&channel_id, &notes).await {
        Ok(reply) => reply.content,
        Err(err) => {
            error!("change_notes failed: {err:#}");
            err.user_message()
        }
    };

    let response = CreateInteractionResponse::Message(
        CreateInteractionResponseMessage::new()
            .content(content)
            .ephemeral(true),
    );
    if let Err(err) = modal.create_response(&ctx.http, response).await {
        error!("failed to respond to notes modal: {err}");
    }
}

async fn respond(ctx: &SerenityContext, command: &CommandInteraction, content: &str) {
    let response = CreateInteractionResponse::Message(
        CreateInteractionResponseMessage::new()
            .content(content)
            .ephemeral(true),
    );
    if let Err(err) = command.create_response(&ctx.http, response).await {
        error!("failed to respond to interaction: {err}");
    }
}

#[cfg(test)]
mod tests {
    use super::definitions;

    #[test]
    fn definitions_cover_every_registered_command() {
        let payload = serde_json::to_value(definitions()).expect("serializable builders");
        let names: Vec<&str> = payload
            .as_array()
            .expect("array of commands")
            .iter()
            .map(|command| command["name"].as_str().expect("command name"))
            .collect();

        assert_eq!(
            names,
            vec![
                "event",
                "rsvp",
                "change_name",
                "change_date",
                "change_location",
                "change_price",
                "change_notes",
                "change_emoji",
                "help",
                "session",
                "lifetime",
            ]
        );
    }

    #[test]
    fn event_command_requires_name_and_location_first() {
        let payload = serde_json::to_value(definitions()).expect("serializable builders");
        let event = &payload[0];
        let options = event["options"].as_array().expect("event options");

        assert_eq!(options[0]["name"], "event_name");
        assert_eq!(options[0]["required"], true);
        assert_eq!(options[1]["name"], "location");
        assert_eq!(options[1]["required"], true);
        // optional fields follow the required ones, per Discord's schema rules
        assert_eq!(options[2]["name"], "time");
    }
}
