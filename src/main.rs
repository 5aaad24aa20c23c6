use native_vids::discord::{Handler, intents};
use native_vids::hosting::{PublicStore, start_file_server};
use native_vids::{Config, Error, MediaBot, Result, SHUTDOWN_TIMEOUT, wait_for_signal};
use serenity::Client;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    // A missing .env file is fine
    let _ = dotenvy::dotenv();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("native-vids: {e}");
            std::process::exit(1);
        }
    };

    let default_filter = if config.debug {
        "info,native_vids=debug,tower_http=debug"
    } else {
        "info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .init();

    if let Err(e) = run(config).await {
        tracing::error!(error = %e, "Bot stopped with an error");
        std::process::exit(1);
    }
}

async fn run(config: Config) -> Result<()> {
    let token = config
        .chat_token
        .clone()
        .ok_or_else(|| Error::config("DISCORD_TOKEN", "a bot token is required"))?;

    let bot = MediaBot::new(config)?;
    let shutdown = CancellationToken::new();

    let server = bot.config().serve.bind_address.map(|address| {
        let store = PublicStore::from_config(&bot.config().storage);
        tokio::spawn(start_file_server(address, store, shutdown.clone()))
    });

    let mut client = Client::builder(&token, intents())
        .event_handler(Handler::new(bot.clone()))
        .await
        .map_err(|e| Error::Other(format!("failed to create discord client: {e}")))?;
    let shard_manager = client.shard_manager.clone();

    let mut gateway = tokio::spawn(async move { client.start().await });
    tokio::select! {
        _ = wait_for_signal() => {}
        joined = &mut gateway => match joined {
            Ok(Ok(())) => tracing::warn!("Discord gateway closed"),
            Ok(Err(e)) => tracing::error!(error = %e, "Discord gateway failed"),
            Err(e) => tracing::error!(error = %e, "Discord gateway task panicked"),
        },
    }

    shard_manager.shutdown_all().await;
    shutdown.cancel();
    if !bot.shutdown(SHUTDOWN_TIMEOUT).await {
        tracing::warn!("Some downloads were still running at exit");
    }

    if let Some(server) = server {
        match server.await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => tracing::error!(error = %e, "Hosted video server failed"),
            Err(e) => tracing::error!(error = %e, "Hosted video server task panicked"),
        }
    }

    Ok(())
}
