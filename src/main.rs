//! TradeDesk Telegram Bot
//!
//! Main application entry point

use std::sync::Arc;
use std::time::Duration;
use teloxide::{prelude::*, types::{CallbackQuery, Message, Update}};
use teloxide::dispatching::UpdateHandler;
use tracing::{error, info, warn, Instrument};

use TradeDesk::{
    config::Settings,
    database::{health_check, DatabaseService},
    handlers::{handle_callback_query, handle_command, handle_message, Command},
    middleware::LoggingMiddleware,
    models::DealStatus,
    services::{Notifier, ServiceFactory, TelegramNotifier},
    utils::logging,
};

type HandlerResult = Result<(), Box<dyn std::error::Error + Send + Sync>>;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();

    // Load configuration
    let settings = Settings::new()?;
    settings.validate()?;

    // Initialize logging; the guard flushes the file writer on exit
    let _log_guard = logging::init_logging(&settings.logging)?;

    info!("Starting {}...", TradeDesk::info());

    info!(url = %settings.database.url, "Opening database...");
    let database = DatabaseService::connect(&(&settings.database).into()).await?;
    health_check(&database.pool).await?;

    let open_deals = database.deals.list_by_statuses(&DealStatus::ACTIVE).await?;
    let completed = database.deals.count_by_status(DealStatus::Done).await?;
    info!(open_deals = open_deals.len(), completed = completed, "Database ready");

    let bot = Bot::new(&settings.bot.token);
    let notifier: Arc<dyn Notifier> = Arc::new(TelegramNotifier::new(bot.clone()));
    let services = ServiceFactory::new(&settings, database, notifier)?;

    services.expiry_watcher.clone().spawn();
    spawn_housekeeping(services.clone(), settings.deals.sweep_interval());

    let mut dispatcher = Dispatcher::builder(bot, create_handler())
        .dependencies(dptree::deps![Arc::new(services), LoggingMiddleware::new()])
        .default_handler(|upd| async move {
            warn!(update_id = upd.id.0, "Unhandled update");
        })
        .enable_ctrlc_handler()
        .build();

    info!("TradeDesk bot is ready, polling for updates");
    dispatcher.dispatch().await;

    info!("TradeDesk bot has been shut down.");
    Ok(())
}

/// Periodically forget idle rate limiter entries and report session counts
fn spawn_housekeeping(services: ServiceFactory, period: Duration) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        loop {
            ticker.tick().await;
            services.gate.cleanup();
            let stats = services.storage.stats().await;
            info!(sessions = stats.sessions, admin_prompts = stats.admin_prompts, "Conversation state");
        }
    });
}

/// Create the main update handler
fn create_handler() -> UpdateHandler<Box<dyn std::error::Error + Send + Sync + 'static>> {
    dptree::entry()
        .chain(dptree::inspect(|update: Update, logging: LoggingMiddleware| logging.log_update(&update)))
        .branch(
            Update::filter_message()
                .branch(
                    dptree::entry()
                        .filter_command::<Command>()
                        .endpoint(handle_commands),
                )
                .branch(dptree::endpoint(handle_messages)),
        )
        .branch(Update::filter_callback_query().endpoint(handle_callbacks))
}

/// Handle bot commands
async fn handle_commands(
    bot: Bot,
    msg: Message,
    cmd: Command,
    update: Update,
    services: Arc<ServiceFactory>,
    logging: LoggingMiddleware,
) -> HandlerResult {
    let services = (*services).clone();

    if let Err(e) = handle_command(bot, msg, cmd, services)
        .instrument(logging.update_span(&update))
        .await
    {
        error!(error = %e, severity = %e.severity(), "Error handling command");
        return Err(e.into());
    }

    Ok(())
}

/// Handle regular messages
async fn handle_messages(
    bot: Bot,
    msg: Message,
    update: Update,
    services: Arc<ServiceFactory>,
    logging: LoggingMiddleware,
) -> HandlerResult {
    let services = (*services).clone();

    if let Err(e) = handle_message(bot, msg, services)
        .instrument(logging.update_span(&update))
        .await
    {
        error!(error = %e, severity = %e.severity(), "Error handling message");
        return Err(e.into());
    }

    Ok(())
}

/// Handle callback queries
async fn handle_callbacks(
    bot: Bot,
    query: CallbackQuery,
    update: Update,
    services: Arc<ServiceFactory>,
    logging: LoggingMiddleware,
) -> HandlerResult {
    let user_id = query.from.id.0 as i64;
    let services = (*services).clone();

    if let Err(e) = handle_callback_query(bot, query, services)
        .instrument(logging.update_span(&update))
        .await
    {
        error!(user_id = user_id, error = %e, severity = %e.severity(), "Error handling callback query");
        return Err(e.into());
    }

    Ok(())
}
