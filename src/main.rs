use anyhow::Context;
use database::AlertStore;
use engine::{Dispatcher, Evaluator, Inbound};
use price_client::BinanceSpotClient;
use std::sync::Arc;
use std::time::Duration;
use telegram::TelegramBot;
use tracing_subscriber::EnvFilter;

/// How long `getUpdates` blocks server-side when there is nothing new.
const POLL_TIMEOUT_SECS: u64 = 30;

/// The main entry point for the Vigil alert bot.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file, if present.
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let settings = configuration::load_config().context("Failed to load configuration")?;

    // Initialize the database connection and run migrations. These are the
    // only errors that are allowed to kill the process.
    let pool = database::connect()
        .await
        .context("Failed to connect to the database")?;
    database::run_migrations(&pool)
        .await
        .context("Failed to run database migrations")?;

    let store: Arc<dyn AlertStore> = Arc::new(database::DbRepository::new(pool));
    let bot = Arc::new(TelegramBot::new(&settings.telegram));
    let prices = Arc::new(BinanceSpotClient::new(&settings.price_feed));

    // The evaluator runs on its own task so a slow price fetch never blocks
    // the message-handling path.
    let evaluator = Evaluator::new(store.clone(), prices, bot.clone());
    tokio::spawn(evaluator.run(Duration::from_secs(settings.evaluator.interval_secs)));

    let dispatcher = Arc::new(Dispatcher::new(store, bot.clone()));

    tracing::info!("Vigil started, long-polling for updates");
    run_polling(bot, dispatcher).await
}

/// The inbound side of the chat transport: long-polls `getUpdates` and hands
/// each message to the dispatcher on its own task, so chats are handled
/// concurrently. Runs until the process is interrupted.
async fn run_polling(bot: Arc<TelegramBot>, dispatcher: Arc<Dispatcher>) -> anyhow::Result<()> {
    let mut offset = 0i64;

    loop {
        let updates = match bot.get_updates(offset, POLL_TIMEOUT_SECS).await {
            Ok(updates) => updates,
            Err(e) => {
                tracing::error!(error = %e, "getUpdates failed, retrying shortly");
                tokio::time::sleep(Duration::from_secs(5)).await;
                continue;
            }
        };

        for update in updates {
            offset = offset.max(update.update_id + 1);

            let Some(message) = update.message else {
                continue;
            };
            let (Some(from), Some(text)) = (message.from, message.text) else {
                continue;
            };

            let inbound = Inbound {
                telegram_id: from.id,
                first_name: from.first_name,
                chat_id: message.chat.id,
                text,
            };

            let dispatcher = Arc::clone(&dispatcher);
            tokio::spawn(async move {
                dispatcher.handle(inbound).await;
            });
        }
    }
}
