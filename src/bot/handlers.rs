use anyhow::Result;
use serenity::{
    builder::{
        CreateEmbed, CreateInteractionResponse, CreateInteractionResponseMessage,
        EditInteractionResponse,
    },
    model::application::CommandInteraction,
    prelude::Context,
};
use tracing::{info, warn};

use crate::{
    audio::{registry::resolve_notice, Notice},
    bot::{channel_occupied, humans_in_channel, user_voice_channel, CroissantBot},
    ui::embeds,
};

/// Resultados que muestra `/search`
const SEARCH_RESULTS: usize = 5;

/// Comandos lentos (voz o yt-dlp): defer primero, responder con edit_response
const DEFERRED_COMMANDS: &[&str] = &["play", "search", "join", "movehere"];

/// Maneja comandos slash
pub async fn handle_command(
    ctx: &Context,
    command: CommandInteraction,
    bot: &CroissantBot,
) -> Result<()> {
    let guild_id = command
        .guild_id
        .ok_or_else(|| anyhow::anyhow!("Comando usado fuera de un servidor"))?;

    info!(
        "📝 Comando /{} usado por {} en guild {}",
        command.data.name, command.user.name, guild_id
    );

    if DEFERRED_COMMANDS.contains(&command.data.name.as_str()) {
        return match command.data.name.as_str() {
            // /play resuelve la canción fuera del lock de la sesión
            "play" => handle_play(ctx, command, bot).await,
            "search" => handle_search(ctx, command, bot).await,
            _ => handle_connect(ctx, command, bot).await,
        };
    }

    let user_channel = user_voice_channel(ctx, guild_id, command.user.id);
    let handle = bot.registry.ensure(guild_id);
    let mut session = handle.lock().await;

    let embed = match command.data.name.as_str() {
        "leave" => embeds::notice_embed(&session.leave().await),
        "pause" => embeds::notice_embed(&session.pause().await),
        "resume" => embeds::notice_embed(&session.resume().await),
        "stop" => embeds::notice_embed(&session.stop().await),
        "skip" => {
            let amount = int_option(&command, "amount").unwrap_or(1);
            embeds::notice_embed(&session.skip(amount).await)
        }
        "remove" => {
            let index = required_int(&command, "index")?;
            embeds::notice_embed(&session.remove(index))
        }
        "move" => {
            let from = required_int(&command, "from")?;
            let to = required_int(&command, "to")?;
            embeds::notice_embed(&session.move_song(from, to))
        }
        "queue" => {
            let upcoming = session.queue_snapshot();
            embeds::queue_embed(session.now_playing(), upcoming.as_deref())
        }
        "nowplaying" => embeds::now_playing_embed(session.now_playing()),
        "volume" => {
            let notice = match int_option(&command, "level") {
                Some(level) => session.set_volume(level),
                None => Notice::VolumeLevel {
                    percent: (session.volume() * 100.0).round() as u32,
                },
            };
            embeds::notice_embed(&notice)
        }
        _ => {
            drop(session);
            command
                .create_response(
                    &ctx.http,
                    CreateInteractionResponse::Message(
                        CreateInteractionResponseMessage::new()
                            .content("❌ Comando no reconocido")
                            .ephemeral(true),
                    ),
                )
                .await?;
            return Ok(());
        }
    };
    drop(session);

    respond(ctx, &command, embed).await
}

async fn handle_play(ctx: &Context, command: CommandInteraction, bot: &CroissantBot) -> Result<()> {
    let guild_id = command
        .guild_id
        .ok_or_else(|| anyhow::anyhow!("Comando usado fuera de un servidor"))?;
    let query = required_str(&command, "query")?;
    let position = int_option(&command, "position");

    // Defer la respuesta ya que yt-dlp puede tardar
    defer(ctx, &command).await?;

    let user_channel = user_voice_channel(ctx, guild_id, command.user.id);
    let notice = bot
        .registry
        .enqueue_query(
            guild_id,
            user_channel,
            bot.resolver.as_ref(),
            &query,
            position,
            bot.config.max_song_duration(),
        )
        .await;

    command
        .edit_response(
            &ctx.http,
            EditInteractionResponse::new().embed(embeds::notice_embed(&notice)),
        )
        .await?;

    Ok(())
}

async fn handle_search(
    ctx: &Context,
    command: CommandInteraction,
    bot: &CroissantBot,
) -> Result<()> {
    let query = required_str(&command, "query")?;

    defer(ctx, &command).await?;

    let response = match bot.resolver.search(&query, SEARCH_RESULTS).await {
        Ok(results) => {
            EditInteractionResponse::new().embeds(embeds::search_embeds(&query, &results))
        }
        Err(e) => {
            warn!("Búsqueda fallida para {}: {}", query, e);
            let notice = resolve_notice(e, &query);
            EditInteractionResponse::new().embed(embeds::notice_embed(&notice))
        }
    };

    command.edit_response(&ctx.http, response).await?;

    Ok(())
}

/// `/join` y `/movehere`: conectar a voz puede tardar más que la ventana de
/// 3 s de Discord.
async fn handle_connect(
    ctx: &Context,
    command: CommandInteraction,
    bot: &CroissantBot,
) -> Result<()> {
    let guild_id = command
        .guild_id
        .ok_or_else(|| anyhow::anyhow!("Comando usado fuera de un servidor"))?;

    defer(ctx, &command).await?;

    let user_channel = user_voice_channel(ctx, guild_id, command.user.id);
    let notice = {
        let handle = bot.registry.ensure(guild_id);
        let mut session = handle.lock().await;

        if command.data.name == "movehere" {
            let occupied = session
                .channel()
                .is_some_and(|channel| channel_occupied(humans_in_channel(ctx, guild_id, channel)));
            session.relocate(user_channel, occupied).await
        } else {
            session.join(user_channel).await
        }
    };

    command
        .edit_response(
            &ctx.http,
            EditInteractionResponse::new().embed(embeds::notice_embed(&notice)),
        )
        .await?;

    Ok(())
}

async fn defer(ctx: &Context, command: &CommandInteraction) -> Result<()> {
    command
        .create_response(
            &ctx.http,
            CreateInteractionResponse::Defer(CreateInteractionResponseMessage::new()),
        )
        .await?;

    Ok(())
}

async fn respond(ctx: &Context, command: &CommandInteraction, embed: CreateEmbed) -> Result<()> {
    command
        .create_response(
            &ctx.http,
            CreateInteractionResponse::Message(
                CreateInteractionResponseMessage::new().embed(embed),
            ),
        )
        .await?;

    Ok(())
}

// Funciones auxiliares

fn int_option(command: &CommandInteraction, name: &str) -> Option<i64> {
    command
        .data
        .options
        .iter()
        .find(|opt| opt.name == name)
        .and_then(|opt| opt.value.as_i64())
}

fn required_str(command: &CommandInteraction, name: &str) -> Result<String> {
    command
        .data
        .options
        .iter()
        .find(|opt| opt.name == name)
        .and_then(|opt| opt.value.as_str())
        .map(str::to_string)
        .ok_or_else(|| anyhow::anyhow!("Opción {} no proporcionada", name))
}

fn required_int(command: &CommandInteraction, name: &str) -> Result<i64> {
    int_option(command, name).ok_or_else(|| anyhow::anyhow!("Opción {} no proporcionada", name))
}
