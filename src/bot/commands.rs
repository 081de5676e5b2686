use anyhow::Result;
use serenity::{
    builder::{CreateCommand, CreateCommandOption},
    model::{application::CommandOptionType, id::GuildId},
    prelude::Context,
};

/// Registra comandos globales
pub async fn register_global_commands(ctx: &Context) -> Result<()> {
    for command in all_commands() {
        ctx.http.create_global_command(&command).await?;
    }

    Ok(())
}

/// Registra comandos para una guild específica (desarrollo)
pub async fn register_guild_commands(ctx: &Context, guild_id: GuildId) -> Result<()> {
    guild_id.set_commands(&ctx.http, all_commands()).await?;

    Ok(())
}

pub fn all_commands() -> Vec<CreateCommand> {
    vec![
        join_command(),
        leave_command(),
        movehere_command(),
        play_command(),
        search_command(),
        pause_command(),
        resume_command(),
        stop_command(),
        skip_command(),
        queue_command(),
        remove_command(),
        move_command(),
        nowplaying_command(),
        volume_command(),
    ]
}

// Comandos de conexión

fn join_command() -> CreateCommand {
    CreateCommand::new("join").description("Joins your voice channel")
}

fn leave_command() -> CreateCommand {
    CreateCommand::new("leave").description("Stops the music and leaves the voice channel")
}

fn movehere_command() -> CreateCommand {
    CreateCommand::new("movehere")
        .description("Moves the bot to your voice channel if its current one is empty")
}

// Comandos de reproducción

fn play_command() -> CreateCommand {
    CreateCommand::new("play")
        .description("Plays a song from a URL or a search, use `/search` to get more results")
        .add_option(
            CreateCommandOption::new(CommandOptionType::String, "query", "URL or search terms")
                .required(true),
        )
        .add_option(
            CreateCommandOption::new(
                CommandOptionType::Integer,
                "position",
                "Position in the queue, 1 is next",
            )
            .min_int_value(1),
        )
}

fn search_command() -> CreateCommand {
    CreateCommand::new("search")
        .description("Shows the top 5 YouTube results for a search")
        .add_option(
            CreateCommandOption::new(CommandOptionType::String, "query", "Search terms")
                .required(true),
        )
}

fn pause_command() -> CreateCommand {
    CreateCommand::new("pause").description("Pauses the current song")
}

fn resume_command() -> CreateCommand {
    CreateCommand::new("resume").description("Resumes the current song or starts the queue")
}

fn stop_command() -> CreateCommand {
    CreateCommand::new("stop").description("Stops the music and clears the queue")
}

fn skip_command() -> CreateCommand {
    CreateCommand::new("skip")
        .description("Skips songs, the current one included")
        .add_option(CreateCommandOption::new(
            CommandOptionType::Integer,
            "amount",
            "Number of songs to skip (default 1)",
        ))
}

// Comandos de cola

fn queue_command() -> CreateCommand {
    CreateCommand::new("queue").description("Shows the queue")
}

fn remove_command() -> CreateCommand {
    CreateCommand::new("remove")
        .description("Removes a song from the queue")
        .add_option(
            CreateCommandOption::new(CommandOptionType::Integer, "index", "Index in `/queue`")
                .required(true),
        )
}

fn move_command() -> CreateCommand {
    CreateCommand::new("move")
        .description("Moves a song to another position in the queue")
        .add_option(
            CreateCommandOption::new(CommandOptionType::Integer, "from", "Current index")
                .required(true),
        )
        .add_option(
            CreateCommandOption::new(CommandOptionType::Integer, "to", "New index")
                .required(true),
        )
}

fn nowplaying_command() -> CreateCommand {
    CreateCommand::new("nowplaying").description("Shows the current song")
}

// Comandos de audio

fn volume_command() -> CreateCommand {
    CreateCommand::new("volume")
        .description("Shows or changes the volume, range: 0-100")
        .add_option(CreateCommandOption::new(
            CommandOptionType::Integer,
            "level",
            "New volume level",
        ))
}
