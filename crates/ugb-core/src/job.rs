//! Periodic purchase job.
//!
//! Every tick walks all stored accounts, one at a time, runs a purchase
//! attempt and reports the outcome to the owning user:
//!
//! - success: notify, drop the account and its tracker entry
//! - fatal failure: notify loudly, drop the account and its tracker entry
//! - transient failure: edit the tracked progress message, or send a new one
//!   (and track it) when there is none or the edit fails
//!
//! Chat delivery failures are logged and never change account state.

use std::{sync::Arc, time::Duration};

use chrono::Local;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::{
    config::Config,
    domain::{Account, MessageRef, UserId},
    formatting::{critical_html, processing_html, stamped_status, success_html},
    messaging::port::MessagingPort,
    purchase::{attempt_purchase, UgPhoneApi},
    store::AccountStore,
    tracker::StatusTracker,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct JobTiming {
    pub first_delay: Duration,
    pub interval: Duration,
}

impl Default for JobTiming {
    fn default() -> Self {
        Self {
            first_delay: Duration::from_secs(10),
            interval: Duration::from_secs(60),
        }
    }
}

impl From<&Config> for JobTiming {
    fn from(cfg: &Config) -> Self {
        Self {
            first_delay: cfg.purchase_first_delay,
            interval: cfg.purchase_interval,
        }
    }
}

/// What happened to one account during a cycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Disposition {
    Purchased,
    Removed,
    Pending,
    /// The account disappeared (e.g. `/remove`) before its turn.
    Skipped,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CycleReport {
    pub attempted: usize,
    pub purchased: usize,
    pub removed: usize,
    pub pending: usize,
}

impl CycleReport {
    fn record(&mut self, d: Disposition) {
        match d {
            Disposition::Purchased => self.purchased += 1,
            Disposition::Removed => self.removed += 1,
            Disposition::Pending => self.pending += 1,
            Disposition::Skipped => return,
        }
        self.attempted += 1;
    }
}

#[derive(Clone)]
pub struct PurchaseJob {
    inner: Arc<JobInner>,
}

struct JobInner {
    store: Arc<AccountStore>,
    tracker: Arc<StatusTracker>,
    api: Arc<dyn UgPhoneApi>,
    messenger: Arc<dyn MessagingPort>,
    timing: JobTiming,
}

impl PurchaseJob {
    pub fn new(
        store: Arc<AccountStore>,
        tracker: Arc<StatusTracker>,
        api: Arc<dyn UgPhoneApi>,
        messenger: Arc<dyn MessagingPort>,
        timing: JobTiming,
    ) -> Self {
        Self {
            inner: Arc::new(JobInner {
                store,
                tracker,
                api,
                messenger,
                timing,
            }),
        }
    }

    /// Run cycles forever on the configured schedule until `cancel` fires.
    pub fn spawn(&self, cancel: CancellationToken) -> JoinHandle<()> {
        let job = self.clone();
        tokio::spawn(async move { job.run_loop(cancel).await })
    }

    async fn run_loop(&self, cancel: CancellationToken) {
        let timing = self.inner.timing;
        info!(
            first_delay_secs = timing.first_delay.as_secs(),
            interval_secs = timing.interval.as_secs(),
            "purchase job scheduled"
        );

        let mut tick = interval_at(Instant::now() + timing.first_delay, timing.interval);
        // A slow cycle pushes the next one back instead of bunching ticks.
        tick.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
              _ = cancel.cancelled() => break,
              _ = tick.tick() => {
                let report = self.run_cycle().await;
                if report.attempted > 0 {
                    info!(
                        attempted = report.attempted,
                        purchased = report.purchased,
                        removed = report.removed,
                        pending = report.pending,
                        "purchase cycle finished"
                    );
                } else {
                    debug!("purchase cycle: no accounts");
                }
              }
            }
        }

        info!("purchase job stopped");
    }

    /// One pass over every user's accounts, strictly sequential.
    pub async fn run_cycle(&self) -> CycleReport {
        let mut report = CycleReport::default();

        for user in self.inner.store.all_users().await {
            // Snapshot: removals below must not disturb this iteration.
            let accounts = self.inner.store.list(user).await;
            for account in accounts {
                let d = self.process_account(user, &account).await;
                report.record(d);
            }
        }

        report
    }

    pub async fn process_account(&self, user: UserId, account: &Account) -> Disposition {
        let ug_id = account.ug_id.as_str();
        if !self.inner.store.contains(user, ug_id).await {
            return Disposition::Skipped;
        }

        let outcome = attempt_purchase(self.inner.api.as_ref(), &account.credentials()).await;
        info!(user_id = %user, ug_id, success = outcome.success, "{}", outcome.message);

        if outcome.success {
            self.finish_account(user, ug_id, &success_html(ug_id, &outcome.message))
                .await;
            return Disposition::Purchased;
        }

        if outcome.is_fatal() {
            warn!(user_id = %user, ug_id, "fatal purchase failure; removing account");
            self.finish_account(user, ug_id, &critical_html(ug_id, &outcome.message))
                .await;
            return Disposition::Removed;
        }

        let status = stamped_status(Local::now(), &outcome.message);
        self.report_progress(user, ug_id, &status).await;
        Disposition::Pending
    }

    /// Terminal transition: notify, then forget the account and its tracker entry.
    async fn finish_account(&self, user: UserId, ug_id: &str, html: &str) {
        if let Err(e) = self.inner.messenger.send_html(user.chat(), html).await {
            error!(user_id = %user, ug_id, "failed to send final notification: {e}");
        }

        if let Err(e) = self.inner.store.remove(user, ug_id).await {
            error!(user_id = %user, ug_id, "failed to persist account removal: {e}");
        }
        self.inner.tracker.clear(user, ug_id).await;
    }

    /// Non-terminal transition: edit the tracked message, falling back to a new one.
    async fn report_progress(&self, user: UserId, ug_id: &str, status: &str) {
        let html = processing_html(ug_id, status);

        if let Some(entry) = self.inner.tracker.get(user, ug_id).await {
            let msg = MessageRef {
                chat_id: user.chat(),
                message_id: entry.last_message_id,
            };
            match self.inner.messenger.edit_html(msg, &html).await {
                Ok(()) => {
                    self.inner.tracker.touch(user, ug_id, status).await;
                    return;
                }
                Err(e) => {
                    debug!(user_id = %user, ug_id, "status edit failed, sending a new message: {e}");
                }
            }
        }

        match self.inner.messenger.send_html(user.chat(), &html).await {
            Ok(sent) => {
                self.inner
                    .tracker
                    .update(user, ug_id, sent.message_id, status)
                    .await;
                // The account may have been removed while we were talking to Telegram.
                if !self.inner.store.contains(user, ug_id).await {
                    self.inner.tracker.clear(user, ug_id).await;
                }
            }
            Err(e) => {
                error!(user_id = %user, ug_id, "failed to send status message: {e}");
            }
        }
    }
}
