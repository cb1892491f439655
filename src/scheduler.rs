//! Periodic dispatcher that triggers question deliveries.
//!
//! Every 60 seconds the loop compares the local wall-clock minute against
//! all registered schedules and spawns one delivery task per due chat. The
//! loop never awaits a delivery; each spawned task records its own outcome
//! in [`DeliveryStats`] and logs it, so failures are visible instead of
//! disappearing with the task.

use crate::config::DISPATCH_TICK_SECS;
use crate::llm::QuestionGenerator;
use crate::schedule::ScheduleStore;
use anyhow::Result;
use chrono::{Local, NaiveDateTime};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use teloxide::prelude::*;
use teloxide::types::ChatId;
use tokio::time::{self, MissedTickBehavior};
use tracing::{debug, error, info};

/// Header line attached to every delivered question
const ASSIGNMENT_PREFIX: &str = "📚 Ваше задание на сегодня:";

/// Formats the outgoing assignment message
#[must_use]
pub fn assignment_text(question: &str) -> String {
    format!("{ASSIGNMENT_PREFIX}\n\n{question}")
}

/// Counters describing the fate of every dispatched delivery
#[derive(Debug, Default)]
pub struct DeliveryStats {
    dispatched: AtomicU64,
    delivered: AtomicU64,
    failed: AtomicU64,
}

impl DeliveryStats {
    /// Creates zeroed counters
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Counts one launched delivery task
    pub fn record_dispatched(&self) {
        self.dispatched.fetch_add(1, Ordering::Relaxed);
    }

    /// Counts one delivery that reached Telegram
    pub fn record_delivered(&self) {
        self.delivered.fetch_add(1, Ordering::Relaxed);
    }

    /// Counts one delivery whose send failed
    pub fn record_failed(&self) {
        self.failed.fetch_add(1, Ordering::Relaxed);
    }

    /// Total launched delivery tasks
    #[must_use]
    pub fn dispatched(&self) -> u64 {
        self.dispatched.load(Ordering::Relaxed)
    }

    /// Total successful deliveries
    #[must_use]
    pub fn delivered(&self) -> u64 {
        self.delivered.load(Ordering::Relaxed)
    }

    /// Total failed deliveries
    #[must_use]
    pub fn failed(&self) -> u64 {
        self.failed.load(Ordering::Relaxed)
    }
}

/// The dispatcher loop over the shared schedule store.
///
/// Runs as one long-lived task next to the Telegram dispatcher; only reads
/// and re-arms the store, never registers or removes schedules.
pub struct Scheduler {
    bot: Bot,
    store: ScheduleStore,
    generator: Arc<QuestionGenerator>,
    stats: Arc<DeliveryStats>,
}

impl Scheduler {
    /// Creates a dispatcher over the shared store
    #[must_use]
    pub fn new(
        bot: Bot,
        store: ScheduleStore,
        generator: Arc<QuestionGenerator>,
        stats: Arc<DeliveryStats>,
    ) -> Self {
        Self {
            bot,
            store,
            generator,
            stats,
        }
    }

    /// Runs the dispatch loop forever.
    ///
    /// The interval is fixed-rate: ticks stay aligned to whole periods of
    /// the start instant instead of drifting by per-tick processing time.
    /// Missed ticks are skipped, not replayed as a burst; the fired-today
    /// marker in the store makes replays harmless anyway.
    pub async fn run(self) {
        let mut interval = time::interval(Duration::from_secs(DISPATCH_TICK_SECS));
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        info!("Dispatcher loop started (tick every {DISPATCH_TICK_SECS}s).");

        loop {
            interval.tick().await;
            self.tick(Local::now().naive_local()).await;
        }
    }

    /// One dispatch pass over the store at the given instant
    async fn tick(&self, now: NaiveDateTime) {
        let due = self.store.claim_due(now).await;
        if due.is_empty() {
            let registered = self.store.len().await;
            debug!(
                "Tick at {}: nothing due ({registered} schedule(s) registered).",
                now.format("%H:%M")
            );
            return;
        }

        info!("Tick at {}: {} delivery(ies) due.", now.format("%H:%M"), due.len());

        for chat_id in due {
            self.stats.record_dispatched();

            let bot = self.bot.clone();
            let generator = Arc::clone(&self.generator);
            let stats = Arc::clone(&self.stats);

            tokio::spawn(async move {
                match deliver(&bot, &generator, chat_id).await {
                    Ok(()) => {
                        stats.record_delivered();
                        info!("Delivered daily question to chat {chat_id}.");
                    }
                    Err(e) => {
                        stats.record_failed();
                        error!("Delivery to chat {chat_id} failed: {e}");
                    }
                }
            });
        }
    }
}

/// Generates one question and sends it to `chat_id`.
///
/// # Errors
///
/// Returns an error if the Telegram send fails. Generation itself cannot
/// fail; the generator substitutes a fallback string.
pub async fn deliver(bot: &Bot, generator: &QuestionGenerator, chat_id: ChatId) -> Result<()> {
    let question = generator.generate().await;
    bot.send_message(chat_id, assignment_text(&question)).await?;
    Ok(())
}
