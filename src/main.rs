mod bot;
mod config;
mod tournament;

use std::sync::Arc;

use teloxide::error_handlers::LoggingErrorHandler;
use teloxide::prelude::*;
use teloxide::update_listeners::webhooks;
use tracing::{error, info};
use tracing_subscriber::prelude::*;

use bot::{AdminCommand, BotState, Command, TelegramClient};
use config::Config;
use tournament::Database;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Schema setup and admin seeding, done once before any update is handled.
fn prepare_database(config: &Config) -> Result<Database, BoxError> {
    std::fs::create_dir_all(&config.data_dir)?;
    let db = Database::open(&config.database_path())?;
    for admin in &config.admin_ids {
        db.seed_admin(admin.0 as i64)?;
        info!("Admin rights granted to user ID: {}", admin);
    }
    Ok(db)
}

#[tokio::main]
async fn main() {
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "tourney.json".to_string());
    let config = match Config::load(&config_path) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{e}");
            std::process::exit(1);
        }
    };

    // Setup logging
    let log_dir = config.log_dir();
    std::fs::create_dir_all(&log_dir).ok();
    let file_appender = tracing_appender::rolling::never(&log_dir, "tourney.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stdout)
                .with_filter(
                    tracing_subscriber::EnvFilter::from_default_env()
                        .add_directive(tracing::Level::INFO.into()),
                ),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(false)
                .with_filter(
                    tracing_subscriber::EnvFilter::from_default_env()
                        .add_directive(tracing::Level::INFO.into()),
                ),
        )
        .init();

    info!("🚀 Starting tourney...");
    info!("Loaded config from {}", config.config_path.display());
    info!("Admin IDs: {:?}", config.admin_ids);

    if let Err(e) = run(config).await {
        error!("Fatal: {e}");
        std::process::exit(1);
    }
}

async fn run(config: Config) -> Result<(), BoxError> {
    let db = prepare_database(&config)?;
    let bot = Bot::new(&config.telegram_bot_token);

    let state = Arc::new(BotState::new(db, TelegramClient::new(bot.clone()), config.broadcast_delay));

    let handler = dptree::entry()
        .branch(
            Update::filter_message()
                .filter_command::<Command>()
                .endpoint(bot::handlers::handle_command),
        )
        .branch(
            Update::filter_message()
                .filter_command::<AdminCommand>()
                .endpoint(bot::handlers::handle_admin_command),
        )
        .branch(Update::filter_message().endpoint(bot::handlers::handle_text))
        .branch(Update::filter_callback_query().endpoint(bot::handlers::handle_callback));

    let mut dispatcher = Dispatcher::builder(bot.clone(), handler)
        .dependencies(dptree::deps![state])
        .enable_ctrlc_handler()
        .build();

    match config.webhook {
        Some(ref webhook) => {
            let url = webhook.endpoint(&config.telegram_bot_token)?;
            info!("Listening for webhook updates on {}", webhook.listen_addr);
            let listener = webhooks::axum(bot, webhooks::Options::new(webhook.listen_addr, url)).await?;
            dispatcher
                .dispatch_with_listener(listener, LoggingErrorHandler::with_custom_text("An error from the update listener"))
                .await;
        }
        None => {
            info!("Polling for updates");
            dispatcher.dispatch().await;
        }
    }

    info!("Stopped");
    Ok(())
}
