use std::sync::Arc;

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use tracing::{debug, error, info, warn};

use serenity::all::{
    ChannelId, ChannelType, Client as SerenityClient, Context as SerenityContext, CreateChannel,
    CreateMessage, EditChannel, EditMessage, EventHandler as SerenityEventHandler, GatewayIntents,
    GuildId, Http, Interaction, Message as SerenityMessage, MessageId, PermissionOverwrite,
    PermissionOverwriteType, Permissions, Ready, RoleId, UserId,
};
use tokio::sync::{Mutex as AsyncMutex, RwLock, oneshot};

use crate::config::Config;
use crate::coordinator::EventCoordinator;
use crate::db::NewMessageLog;
use crate::surface::{ChatSurface, CreatedChannel, SurfaceError};

pub mod commands;

const INITIAL_LOGIN_RETRY_SECONDS: u64 = 2;
const MAX_LOGIN_RETRY_SECONDS: u64 = 300;

/// Event channels are parented under this category when the guild has one.
const ACTIVE_PLANS_CATEGORY: &str = "active plans";

#[derive(Clone)]
pub struct DiscordClient {
    config: Arc<Config>,
    login_state: Arc<AsyncMutex<LoginState>>,
    coordinator: Arc<RwLock<Option<Arc<EventCoordinator>>>>,
    http: Arc<RwLock<Option<Arc<Http>>>>,
    identity: Arc<RwLock<Option<(String, String)>>>,
}

#[derive(Default)]
struct LoginState {
    is_logged_in: bool,
    gateway_task: Option<tokio::task::JoinHandle<()>>,
}

struct GatewayHandler {
    config: Arc<Config>,
    ready_sender: Arc<AsyncMutex<Option<oneshot::Sender<()>>>>,
    http_sender: Arc<AsyncMutex<Option<oneshot::Sender<Arc<Http>>>>>,
    coordinator: Arc<RwLock<Option<Arc<EventCoordinator>>>>,
    identity: Arc<RwLock<Option<(String, String)>>>,
}

#[serenity::async_trait]
impl SerenityEventHandler for GatewayHandler {
    async fn ready(&self, ctx: SerenityContext, ready: Ready) {
        info!(
            "connected to discord as {} ({})",
            ready.user.name, ready.user.id
        );
        *self.identity.write().await =
            Some((ready.user.id.to_string(), ready.user.name.clone()));

        // commands are registered per guild once the session is live
        match commands::register_guild_commands(&ctx.http, &self.config.auth.guild_id).await {
            Ok(count) => info!("registered {count} guild slash commands"),
            Err(err) => error!("failed to register slash commands: {err}"),
        }

        if let Some(sender) = self.ready_sender.lock().await.take() {
            let _ = sender.send(());
        }
        if let Some(sender) = self.http_sender.lock().await.take() {
            let _ = sender.send(ctx.http.clone());
        }
    }

    async fn message(&self, ctx: SerenityContext, msg: SerenityMessage) {
        if msg.author.bot {
            // the bot's own announcement is audited at creation time
            return;
        }

        let coordinator = self.coordinator.read().await.clone();
        let Some(coordinator) = coordinator else {
            debug!("ignoring message before coordinator binding");
            return;
        };

        // channel name lookup is best-effort; the mirror keeps a stale name
        let channel_name = match msg.channel_id.to_channel(&ctx.http).await {
            Ok(channel) => channel
                .guild()
                .map(|guild_channel| guild_channel.name)
                .unwrap_or_default(),
            Err(_) => String::new(),
        };

        coordinator
            .audit_message(NewMessageLog {
                message_id: msg.id.to_string(),
                channel_id: msg.channel_id.to_string(),
                channel_name,
                user_id: msg.author.id.to_string(),
                username: msg.author.name.clone(),
                content: msg.content.clone(),
            })
            .await;
    }

    async fn interaction_create(&self, ctx: SerenityContext, interaction: Interaction) {
        let coordinator = self.coordinator.read().await.clone();
        let Some(coordinator) = coordinator else {
            warn!("interaction received before coordinator binding");
            return;
        };

        match interaction {
            Interaction::Command(command) => {
                coordinator
                    .audit_command(
                        &command.user.id.to_string(),
                        &command.user.name,
                        &commands::audit_text(&command.data),
                    )
                    .await;
                commands::handle_command(&ctx, coordinator.as_ref(), &command).await;
            }
            Interaction::Modal(modal) => {
                commands::handle_modal(&ctx, coordinator.as_ref(), &modal).await;
            }
            _ => {}
        }
    }
}

impl DiscordClient {
    pub async fn new(config: Arc<Config>) -> Result<Self> {
        info!("initializing discord client");
        Ok(Self {
            config,
            login_state: Arc::new(AsyncMutex::new(LoginState::default())),
            coordinator: Arc::new(RwLock::new(None)),
            http: Arc::new(RwLock::new(None)),
            identity: Arc::new(RwLock::new(None)),
        })
    }

    pub async fn set_coordinator(&self, coordinator: Arc<EventCoordinator>) {
        *self.coordinator.write().await = Some(coordinator);
    }

    pub async fn login(&self) -> Result<()> {
        let mut state = self.login_state.lock().await;
        if state.is_logged_in {
            return Ok(());
        }

        let intents = if self.config.auth.use_privileged_intents {
            GatewayIntents::all()
        } else {
            GatewayIntents::non_privileged()
        };

        let (ready_tx, ready_rx) = oneshot::channel();
        let (http_tx, http_rx) = oneshot::channel();
        let event_handler = GatewayHandler {
            config: self.config.clone(),
            ready_sender: Arc::new(AsyncMutex::new(Some(ready_tx))),
            http_sender: Arc::new(AsyncMutex::new(Some(http_tx))),
            coordinator: self.coordinator.clone(),
            identity: self.identity.clone(),
        };

        let mut gateway_client = SerenityClient::builder(&self.config.auth.bot_token, intents)
            .event_handler(event_handler)
            .await
            .map_err(|err| anyhow!("failed to build discord gateway client: {err}"))?;

        let gateway_task = tokio::spawn(async move {
            if let Err(err) = gateway_client.start_autosharded().await {
                error!("discord gateway stopped: {err}");
            }
        });

        match tokio::time::timeout(std::time::Duration::from_secs(30), ready_rx).await {
            Ok(Ok(())) => {
                state.is_logged_in = true;
                state.gateway_task = Some(gateway_task);
                info!("discord bot login succeeded and gateway is connected");

                if let Ok(Ok(http)) =
                    tokio::time::timeout(std::time::Duration::from_secs(5), http_rx).await
                {
                    *self.http.write().await = Some(http);
                }

                Ok(())
            }
            Ok(Err(_)) => {
                gateway_task.abort();
                Err(anyhow!("discord gateway exited before receiving Ready event"))
            }
            Err(_) => {
                gateway_task.abort();
                Err(anyhow!("timed out waiting for discord Ready event"))
            }
        }
    }

    pub async fn start(&self) -> Result<()> {
        let mut retry_seconds = INITIAL_LOGIN_RETRY_SECONDS;

        loop {
            match self.login().await {
                Ok(()) => {
                    info!("discord client is ready");
                    return Ok(());
                }
                Err(err) => {
                    error!(
                        "failed to start discord client: {err}. retrying in {} seconds",
                        retry_seconds
                    );
                    tokio::time::sleep(std::time::Duration::from_secs(retry_seconds)).await;
                    retry_seconds = (retry_seconds * 2).min(MAX_LOGIN_RETRY_SECONDS);
                }
            }
        }
    }

    pub async fn stop(&self) -> Result<()> {
        let mut state = self.login_state.lock().await;
        if !state.is_logged_in {
            return Ok(());
        }

        if let Some(gateway_task) = state.gateway_task.take() {
            gateway_task.abort();
            match gateway_task.await {
                Ok(()) => info!("discord gateway task exited"),
                Err(join_err) if join_err.is_cancelled() => {
                    info!("discord gateway task aborted")
                }
                Err(join_err) => {
                    error!("discord gateway task join error: {join_err}");
                }
            }
        }

        state.is_logged_in = false;
        info!("discord client stopped");
        Ok(())
    }

    async fn http(&self) -> Result<Arc<Http>, SurfaceError> {
        self.http
            .read()
            .await
            .clone()
            .ok_or(SurfaceError::NotConnected)
    }
}

fn parse_discord_id(value: &str) -> Result<u64, SurfaceError> {
    value
        .parse()
        .map_err(|_| SurfaceError::InvalidId(value.to_string()))
}

#[async_trait]
impl ChatSurface for DiscordClient {
    async fn create_event_channel(
        &self,
        guild_id: &str,
        name: &str,
        topic: &str,
        creator_id: &str,
    ) -> Result<CreatedChannel, SurfaceError> {
        let http = self.http().await?;
        let guild = GuildId::new(parse_discord_id(guild_id)?);
        let creator = UserId::new(parse_discord_id(creator_id)?);

        let category = match guild.channels(http.as_ref()).await {
            Ok(channels) => channels
                .values()
                .find(|channel| {
                    channel.kind == ChannelType::Category
                        && channel.name.to_lowercase() == ACTIVE_PLANS_CATEGORY
                })
                .map(|channel| channel.id),
            Err(err) => {
                warn!("failed to list guild channels for category lookup: {err}");
                None
            }
        };

        // hidden from @everyone, visible to the creator
        let overwrites = vec![
            PermissionOverwrite {
                allow: Permissions::empty(),
                deny: Permissions::VIEW_CHANNEL,
                kind: PermissionOverwriteType::Role(RoleId::new(guild.get())),
            },
            PermissionOverwrite {
                allow: Permissions::VIEW_CHANNEL | Permissions::SEND_MESSAGES,
                deny: Permissions::empty(),
                kind: PermissionOverwriteType::Member(creator),
            },
        ];

        let mut builder = CreateChannel::new(name)
            .kind(ChannelType::Text)
            .topic(topic)
            .permissions(overwrites);
        if let Some(category_id) = category {
            builder = builder.category(category_id);
        }

        let channel = guild
            .create_channel(http.as_ref(), builder)
            .await
            .map_err(|e| SurfaceError::Api(e.to_string()))?;

        info!("created event channel {} ({})", channel.name, channel.id);
        Ok(CreatedChannel {
            id: channel.id.to_string(),
            name: channel.name.clone(),
        })
    }

    async fn send_message(
        &self,
        channel_id: &str,
        content: &str,
    ) -> Result<String, SurfaceError> {
        let http = self.http().await?;
        let channel = ChannelId::new(parse_discord_id(channel_id)?);

        let message = channel
            .send_message(http.as_ref(), CreateMessage::new().content(content))
            .await
            .map_err(|e| SurfaceError::Api(e.to_string()))?;

        debug!("sent message {} to channel {}", message.id, channel_id);
        Ok(message.id.to_string())
    }

    async fn edit_message(
        &self,
        channel_id: &str,
        message_id: &str,
        content: &str,
    ) -> Result<(), SurfaceError> {
        let http = self.http().await?;
        let channel = ChannelId::new(parse_discord_id(channel_id)?);
        let message = MessageId::new(parse_discord_id(message_id)?);

        channel
            .edit_message(http.as_ref(), message, EditMessage::new().content(content))
            .await
            .map_err(|e| SurfaceError::Api(e.to_string()))?;

        debug!("edited message {} in channel {}", message_id, channel_id);
        Ok(())
    }

    async fn rename_channel(&self, channel_id: &str, name: &str) -> Result<(), SurfaceError> {
        let http = self.http().await?;
        let channel = ChannelId::new(parse_discord_id(channel_id)?);

        channel
            .edit(http.as_ref(), EditChannel::new().name(name))
            .await
            .map_err(|e| SurfaceError::Api(e.to_string()))?;

        Ok(())
    }

    async fn bot_identity(&self) -> Option<(String, String)> {
        self.identity.read().await.clone()
    }
}
