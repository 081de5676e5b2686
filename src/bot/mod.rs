//! # Bot Module
//!
//! Discord glue around the playback engine:
//! - Slash command registration ([`commands`])
//! - Interaction dispatch ([`handlers`])
//! - Voice state updates, so a session leaves when its channel empties
//!
//! Every command ends up as one call on a guild's
//! [`PlaybackSession`](crate::audio::PlaybackSession) and the resulting
//! [`Notice`](crate::audio::Notice) is rendered as an embed.

use anyhow::Result;
use serenity::{
    all::{ChannelId, Context, EventHandler, GuildId, Interaction, Ready, VoiceState},
    async_trait,
};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

pub mod commands;
pub mod handlers;

use crate::{audio::SessionRegistry, config::Config, sources::SongResolver};

/// Main Discord bot handler.
pub struct CroissantBot {
    pub config: Arc<Config>,
    pub registry: Arc<SessionRegistry>,
    pub resolver: Arc<dyn SongResolver>,
}

impl CroissantBot {
    pub fn new(
        config: Config,
        registry: Arc<SessionRegistry>,
        resolver: Arc<dyn SongResolver>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            registry,
            resolver,
        }
    }

    /// Registers slash commands on `GUILD_ID` when set (instant, for
    /// development), globally otherwise.
    async fn register_commands(&self, ctx: &Context) -> Result<()> {
        info!("📝 Registrando comandos slash...");

        match self.config.guild_id {
            Some(guild_id) => {
                let guild_id = GuildId::new(guild_id);
                info!("🏠 Registrando comandos para guild específica: {}", guild_id);
                commands::register_guild_commands(ctx, guild_id).await?;
                info!("✅ Comandos de guild registrados para: {}", guild_id);
            }
            None => {
                info!("🌐 Registrando comandos globalmente");
                commands::register_global_commands(ctx).await?;
                info!("✅ Comandos globales registrados");
            }
        }

        Ok(())
    }

    /// Channel the session of `guild_id` is connected to, if any.
    async fn session_channel(&self, guild_id: GuildId) -> Option<ChannelId> {
        let handle = self.registry.get(guild_id)?;
        let session = handle.lock().await;
        session.channel()
    }
}

/// Voice channel `user_id` is sitting in, from the gateway cache.
pub fn user_voice_channel(
    ctx: &Context,
    guild_id: GuildId,
    user_id: serenity::all::UserId,
) -> Option<ChannelId> {
    let guild = guild_id.to_guild_cached(&ctx.cache)?;
    guild
        .voice_states
        .get(&user_id)
        .and_then(|voice_state| voice_state.channel_id)
}

/// Non-bot members currently in `channel_id`, `None` when the guild is not
/// in the cache.
pub fn humans_in_channel(
    ctx: &Context,
    guild_id: GuildId,
    channel_id: ChannelId,
) -> Option<usize> {
    let guild = guild_id.to_guild_cached(&ctx.cache)?;

    let humans = guild
        .voice_states
        .values()
        .filter(|voice_state| voice_state.channel_id == Some(channel_id))
        .filter(|voice_state| {
            let is_bot = voice_state
                .member
                .as_ref()
                .map(|member| member.user.bot)
                .or_else(|| {
                    guild
                        .members
                        .get(&voice_state.user_id)
                        .map(|member| member.user.bot)
                })
                .unwrap_or(false);
            !is_bot
        })
        .count();

    Some(humans)
}

/// Users left in the bot's channel for a membership check. A bot that was
/// disconnected counts as an empty channel; an uncached guild gives `None`
/// and the session is left alone.
fn occupants(bot_left: bool, count: impl FnOnce() -> Option<usize>) -> Option<usize> {
    if bot_left {
        Some(0)
    } else {
        count()
    }
}

/// `/movehere` only relocates out of a channel known to be empty.
pub fn channel_occupied(humans: Option<usize>) -> bool {
    humans.map_or(true, |humans| humans > 0)
}

#[async_trait]
impl EventHandler for CroissantBot {
    async fn ready(&self, ctx: Context, ready: Ready) {
        info!("🤖 {} está en línea!", ready.user.name);
        info!("📊 Conectado a {} servidores", ready.guilds.len());

        if let Err(e) = self.register_commands(&ctx).await {
            error!("Error al registrar comandos: {:?}", e);
        }
    }

    async fn interaction_create(&self, ctx: Context, interaction: Interaction) {
        if let Interaction::Command(command_interaction) = interaction {
            if let Err(e) = handlers::handle_command(&ctx, command_interaction, self).await {
                error!("Error manejando comando: {:?}", e);
            }
        }
    }

    /// Leaves when the bot's channel has no users left, or when the bot was
    /// disconnected from outside.
    async fn voice_state_update(&self, ctx: Context, old: Option<VoiceState>, new: VoiceState) {
        let Some(guild_id) = new.guild_id.or_else(|| old.as_ref().and_then(|o| o.guild_id)) else {
            return;
        };
        let Some(bot_channel) = self.session_channel(guild_id).await else {
            return;
        };

        let current_user_id = ctx.cache.current_user().id;
        let bot_left = new.user_id == current_user_id && new.channel_id.is_none();
        if bot_left {
            warn!("🔌 Bot desconectado externamente en guild {}", guild_id);
        }

        let Some(humans) = occupants(bot_left, || humans_in_channel(&ctx, guild_id, bot_channel))
        else {
            debug!("Guild {} no está en caché, se ignora el cambio de voz", guild_id);
            return;
        };

        debug!(
            "Usuarios en {} (guild {}): {}",
            bot_channel, guild_id, humans
        );

        if let Some(notice) = self.registry.handle_membership(guild_id, humans).await {
            info!("🚪 {} (guild {})", notice, guild_id);
        }
    }
}
