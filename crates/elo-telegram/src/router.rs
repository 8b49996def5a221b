use std::sync::Arc;

use teloxide::{dispatching::Dispatcher, dptree, prelude::*};
use tokio_util::sync::CancellationToken;

use elo_core::messaging::throttled::{ThrottleConfig, ThrottledMessenger};
use elo_core::{
    commands::CommandService, config::Config, messaging::port::MessagingPort,
    notifier::Notifier, ports::MetricFetcher, reconcile::Reconciler, roster::RosterStore,
};

use crate::handlers;
use crate::TelegramMessenger;

#[derive(Clone)]
pub struct AppState {
    pub commands: Arc<CommandService>,
    /// Replies share the notifier's splitting and the throttled messenger.
    pub replies: Notifier,
    pub bot_username: Option<String>,
}

/// Run the bot until Ctrl-C: the command dispatcher in the foreground and the
/// reconciliation loop on its own task.
pub async fn run_polling(
    cfg: Arc<Config>,
    store: Arc<dyn RosterStore>,
    fetcher: Arc<dyn MetricFetcher>,
) -> anyhow::Result<()> {
    let bot = Bot::new(cfg.telegram_bot_token.clone());

    let bot_username = match bot.get_me().await {
        Ok(me) => {
            let username = me.user.username.clone();
            tracing::info!(bot = ?username, game = %cfg.game, "elo bot started");
            username
        }
        Err(e) => {
            tracing::warn!(error = %e, "get_me failed, start links disabled");
            None
        }
    };

    // Reports from one cycle can go out to many groups at once; throttle below
    // Telegram's flood limits. The adapter still retries once on RetryAfter.
    let raw_messenger: Arc<dyn MessagingPort> = Arc::new(TelegramMessenger::new(bot.clone()));
    let messenger: Arc<dyn MessagingPort> = Arc::new(ThrottledMessenger::new(
        raw_messenger,
        ThrottleConfig::default(),
    ));
    let notifier = Notifier::new(messenger, cfg.telegram_safe_limit);

    let reconciler = Arc::new(Reconciler::new(
        store.clone(),
        fetcher.clone(),
        notifier.clone(),
        cfg.poll_interval,
        cfg.fetch_timeout,
    ));
    let cancel = CancellationToken::new();
    let loop_handle = reconciler.spawn(cancel.clone());

    let state = Arc::new(AppState {
        commands: Arc::new(CommandService::new(
            store,
            fetcher,
            cfg.fetch_timeout,
            &cfg.game,
        )),
        replies: notifier,
        bot_username,
    });

    let handler =
        dptree::entry().branch(Update::filter_message().endpoint(handlers::handle_message));

    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![state])
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;

    tracing::info!("dispatcher stopped, waiting for the reconciliation loop");
    cancel.cancel();
    if let Err(e) = loop_handle.await {
        tracing::warn!(error = %e, "reconciliation task ended abnormally");
    }

    Ok(())
}
