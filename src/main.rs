use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use discourse_chat_notifier::config::Config;
use discourse_chat_notifier::handler::{EventHandler, API_KEY_ENV};
use discourse_chat_notifier::notify::{
    LogNotifier, Notifier, SubscriberRegistry, TelegramNotifier,
};
use discourse_chat_notifier::web::{self, AppState};

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("Fatal error: {e:#}");
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    // Load .env file if present
    let _ = dotenvy::dotenv();

    init_tracing()?;

    info!("Starting discourse-chat-notifier");

    let config = Config::from_env().context("Failed to load configuration")?;
    config.validate().context("Invalid configuration")?;

    info!(
        theme = %config.notify_theme,
        locale = ?config.locale,
        preview = config.include_preview,
        "Configuration loaded"
    );

    if std::env::var(API_KEY_ENV).map_or(true, |k| k.is_empty()) {
        info!("{API_KEY_ENV} not set; posts without an embedded topic use the generic wording");
    }

    let notifier: Arc<dyn Notifier> = match config.telegram_bot_token.as_deref() {
        Some(token) => {
            let subscribers = SubscriberRegistry::from((
                config.notify_theme.as_str(),
                config.subscriber_chat_ids.iter().copied(),
            ));
            if config.subscriber_chat_ids.is_empty() {
                warn!("Telegram enabled but SUBSCRIBER_CHAT_IDS is empty");
            } else {
                info!(
                    chats = config.subscriber_chat_ids.len(),
                    "Telegram delivery enabled"
                );
            }
            Arc::new(
                TelegramNotifier::new(&config.telegram_api_url, token, subscribers)
                    .context("Failed to initialize Telegram notifier")?,
            )
        }
        None => {
            warn!("TELEGRAM_BOT_TOKEN not set; notifications will only be logged");
            Arc::new(LogNotifier)
        }
    };

    let handler = EventHandler::from_config(&config, notifier)
        .context("Failed to initialize event handler")?;
    let state = AppState::new(handler, config.discourse_base_url.clone());

    web::serve(&config, state, shutdown_signal()).await?;

    info!("Shutdown complete");

    Ok(())
}

fn init_tracing() -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,discourse_chat_notifier=debug"));

    // Check if JSON logging is requested
    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| matches!(v.to_lowercase().as_str(), "json" | "structured"))
        .unwrap_or(false);

    if use_json {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .try_init()
            .map_err(|e| anyhow::anyhow!("Failed to initialize tracing: {e}"))?;
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .try_init()
            .map_err(|e| anyhow::anyhow!("Failed to initialize tracing: {e}"))?;
    }

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!("Failed to install signal handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    info!("Shutting down...");
}
