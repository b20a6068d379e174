use std::sync::Arc;

use tracing::error;

use ugb_core::{config::Config, purchase::UgPhoneApi, store::AccountStore};
use ugb_ugphone::UgPhoneClient;

#[tokio::main]
async fn main() -> Result<(), ugb_core::Error> {
    ugb_core::logging::init("ugb")?;

    let cfg = match Config::load() {
        Ok(cfg) => Arc::new(cfg),
        Err(e) => {
            error!(error = %e, "invalid configuration; bot not started");
            eprintln!("ugb: {e}");
            std::process::exit(1);
        }
    };

    let store = Arc::new(AccountStore::open(cfg.accounts_file.clone()));
    let api: Arc<dyn UgPhoneApi> = Arc::new(UgPhoneClient::new(
        cfg.ugphone_base_url.clone(),
        cfg.request_timeout,
    )?);

    ugb_telegram::router::run_polling(cfg, store, api)
        .await
        .map_err(|e| ugb_core::Error::External(format!("telegram bot failed: {e}")))?;

    Ok(())
}
