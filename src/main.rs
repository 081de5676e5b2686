use anyhow::{Context as _, Result};
use serenity::{model::gateway::GatewayIntents, Client};
use songbird::{SerenityInit, Songbird};
use std::sync::Arc;
use tracing::{error, info};

use croissant_bot::{
    audio::{SessionRegistry, SongbirdTransport},
    bot::CroissantBot,
    config::Config,
    sources::YtDlpResolver,
};

#[tokio::main]
async fn main() -> Result<()> {
    // Inicializar logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("croissant_bot=debug".parse()?)
                .add_directive("serenity=info".parse()?)
                .add_directive("songbird=info".parse()?),
        )
        .init();

    info!("🥐 Iniciando Croissant Bot v{}", env!("CARGO_PKG_VERSION"));

    // Cargar configuración
    let config = Config::load().context("Configuración inválida")?;
    info!("{}", config.summary());

    // Manejar health check si es necesario
    if std::env::args().any(|arg| arg == "--health-check") {
        return health_check(&config).await;
    }

    // Configurar intents mínimos necesarios
    let intents = GatewayIntents::GUILDS | GatewayIntents::GUILD_VOICE_STATES;

    // Motor de reproducción
    let songbird = Songbird::serenity();
    let transport = Arc::new(SongbirdTransport::new(
        songbird.clone(),
        reqwest::Client::new(),
    ));
    let (registry, events) = SessionRegistry::new(transport, config.default_volume);
    tokio::spawn(registry.clone().run_events(events));

    let resolver = Arc::new(YtDlpResolver::new(config.ytdlp_path.clone()));

    // Crear handler del bot
    let handler = CroissantBot::new(config.clone(), registry.clone(), resolver);

    // Construir cliente
    let mut client = Client::builder(&config.discord_token, intents)
        .event_handler(handler)
        .register_songbird_with(songbird)
        .await
        .context("Error al crear el cliente de Discord")?;

    // Manejar shutdown graceful
    let shard_manager = client.shard_manager.clone();
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Error al registrar Ctrl+C: {:?}", e);
            return;
        }
        info!("⚠️ Señal de shutdown recibida, cerrando...");

        if registry.shutdown_all().await {
            info!("🧹 Sesiones de voz cerradas");
        } else {
            info!("No había sesiones de voz activas");
        }
        shard_manager.shutdown_all().await;
    });

    // Iniciar bot
    info!("🚀 Bot iniciado exitosamente");
    if let Err(why) = client.start().await {
        error!("Error al ejecutar cliente: {:?}", why);
    }

    Ok(())
}

async fn health_check(config: &Config) -> Result<()> {
    // yt-dlp es la única dependencia externa; songbird decodifica con symphonia
    let version = YtDlpResolver::new(config.ytdlp_path.clone())
        .version()
        .await
        .context("Dependencias faltantes")?;

    info!("✅ yt-dlp {}", version);
    println!("OK");
    Ok(())
}
