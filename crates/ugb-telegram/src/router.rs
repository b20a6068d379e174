use std::sync::Arc;

use teloxide::{dispatching::Dispatcher, dptree, prelude::*};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use ugb_core::{
    accounts::AccountService,
    config::Config,
    job::{JobTiming, PurchaseJob},
    messaging::port::MessagingPort,
    purchase::UgPhoneApi,
    store::AccountStore,
    tracker::StatusTracker,
};

use crate::handlers;
use crate::TelegramMessenger;

/// Shared state injected into every handler.
#[derive(Clone)]
pub struct AppState {
    pub cfg: Arc<Config>,
    pub accounts: Arc<AccountService>,
    pub messenger: Arc<dyn MessagingPort>,
}

/// Start the purchase job and long-poll Telegram until the dispatcher stops.
pub async fn run_polling(
    cfg: Arc<Config>,
    store: Arc<AccountStore>,
    api: Arc<dyn UgPhoneApi>,
) -> anyhow::Result<()> {
    let bot = Bot::new(cfg.telegram_bot_token.clone());

    match bot.get_me().await {
        Ok(me) => info!(username = %me.username(), "bot started"),
        Err(e) => warn!(error = %e, "get_me failed; continuing"),
    }
    info!(
        accounts_file = %store.path().display(),
        allowed_users = cfg.telegram_allowed_users.len(),
        "configuration loaded"
    );

    let messenger: Arc<dyn MessagingPort> = Arc::new(TelegramMessenger::new(bot.clone()));
    let tracker = Arc::new(StatusTracker::new());

    let job = PurchaseJob::new(
        store.clone(),
        tracker.clone(),
        api.clone(),
        messenger.clone(),
        JobTiming::from(cfg.as_ref()),
    );
    let cancel = CancellationToken::new();
    let job_handle = job.spawn(cancel.clone());

    let accounts = Arc::new(AccountService::new(
        store,
        tracker,
        api,
        messenger.clone(),
        cfg.validation_timeout,
    ));
    let state = Arc::new(AppState {
        cfg,
        accounts,
        messenger,
    });

    let handler = dptree::entry()
        .branch(Update::filter_callback_query().endpoint(handlers::handle_callback))
        .branch(Update::filter_message().endpoint(handlers::handle_message));

    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![state])
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;

    info!("dispatcher stopped; shutting down purchase job");
    cancel.cancel();
    if let Err(e) = job_handle.await {
        warn!(error = %e, "purchase job ended abnormally");
    }

    Ok(())
}
