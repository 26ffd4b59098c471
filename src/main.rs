use anyhow::{Context, Result};
use serenity::{http::Http, model::gateway::GatewayIntents, Client};
use songbird::{SerenityInit, Songbird};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{error, info};

use lavaqueue::{
    audio::{lavalink_client, lavalink_client::LavalinkNode, AudioNode, SessionRegistry},
    bot::{events, LavaqueueBot},
    config::Config,
};

#[tokio::main]
async fn main() -> Result<()> {
    // Inicializar logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("lavaqueue=debug".parse()?)
                .add_directive("serenity=info".parse()?)
                .add_directive("songbird=info".parse()?)
                .add_directive("lavalink_rs=info".parse()?),
        )
        .init();

    info!("🎵 Iniciando Lavaqueue v{}", env!("CARGO_PKG_VERSION"));

    // Cargar configuración
    let config = Arc::new(Config::load()?);
    info!("{}", config.summary());

    // Sin nodo de audio no hay bot
    let version = lavalink_client::probe_node(&config)
        .await
        .context("Lavalink node is not reachable")?;
    info!("✅ Lavalink {} disponible", version);

    let http = Arc::new(Http::new(&config.discord_token));
    let user_id = http.get_current_user().await?.id;

    // Inicializar Lavalink
    let songbird = Songbird::serenity();
    let (events_tx, events_rx) = mpsc::unbounded_channel();
    let node: Arc<dyn AudioNode> = Arc::new(
        LavalinkNode::new(&config, user_id.get(), songbird.clone(), events_tx)
            .await
            .context("Error al inicializar Lavalink")?,
    );

    let registry = SessionRegistry::new(node.clone());
    let notifier = Arc::new(events::ChannelNotifier::new(http));
    events::spawn_event_loop(registry.clone(), notifier.clone(), events_rx);

    // Configurar intents mínimos necesarios
    let intents = GatewayIntents::GUILDS
        | GatewayIntents::GUILD_VOICE_STATES
        | GatewayIntents::GUILD_MESSAGES
        | GatewayIntents::MESSAGE_CONTENT;

    let handler = LavaqueueBot::new(config.clone(), registry.clone(), node, notifier);

    let mut client = Client::builder(&config.discord_token, intents)
        .event_handler(handler)
        .register_songbird_with(songbird)
        .await?;

    // Manejar shutdown graceful
    let shard_manager = client.shard_manager.clone();
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Error al registrar Ctrl+C: {:?}", e);
            return;
        }
        info!("⚠️ Señal de shutdown recibida, cerrando...");
        registry.shutdown_all().await;
        shard_manager.shutdown_all().await;
    });

    // Iniciar bot
    info!("🚀 Bot iniciado exitosamente");
    if let Err(why) = client.start().await {
        error!("Error al ejecutar cliente: {:?}", why);
    }

    Ok(())
}
