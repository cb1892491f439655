//! In-memory per-user delivery schedule.
//!
//! The store is owned by the top-level runtime and injected into both the
//! dialogue handlers (writers) and the dispatcher loop (reader). Nothing is
//! persisted: every registration is lost when the process restarts.

use chrono::{NaiveDate, NaiveDateTime, Timelike};
use lazy_regex::lazy_regex;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use teloxide::types::ChatId;
use tokio::sync::RwLock;

/// Strict 24-hour time: exactly two digits, colon, two digits, in range.
/// `[0-9]` instead of `\d` keeps non-ASCII digits out.
static RE_DAILY_TIME: lazy_regex::Lazy<regex::Regex> =
    lazy_regex!(r"^([01][0-9]|2[0-3]):([0-5][0-9])$");

/// A daily wall-clock delivery time, no timezone, no date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DailyTime {
    hour: u8,
    minute: u8,
}

impl DailyTime {
    /// Parses a time string in the strict `HH:MM` 24-hour format.
    ///
    /// Exactly two digits on each side of the colon; out-of-range values and
    /// any extra characters (including whitespace and seconds) are rejected.
    ///
    /// # Examples
    ///
    /// ```
    /// use fingram_bot::schedule::DailyTime;
    ///
    /// assert!(DailyTime::parse("18:30").is_some());
    /// assert!(DailyTime::parse("9:30").is_none());
    /// assert!(DailyTime::parse("25:00").is_none());
    /// ```
    #[must_use]
    pub fn parse(text: &str) -> Option<Self> {
        let caps = RE_DAILY_TIME.captures(text)?;
        let hour = caps[1].parse().ok()?;
        let minute = caps[2].parse().ok()?;
        Some(Self { hour, minute })
    }

    /// Hour component, 0-23
    #[must_use]
    pub const fn hour(&self) -> u8 {
        self.hour
    }

    /// Minute component, 0-59
    #[must_use]
    pub const fn minute(&self) -> u8 {
        self.minute
    }

    /// Whether this time equals the (hour, minute) of the given instant
    #[must_use]
    pub fn matches(&self, now: NaiveDateTime) -> bool {
        u32::from(self.hour) == now.hour() && u32::from(self.minute) == now.minute()
    }
}

impl fmt::Display for DailyTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.hour, self.minute)
    }
}

#[derive(Debug, Clone)]
struct ScheduleEntry {
    time: DailyTime,
    /// Dedup marker: the entry fires at most once per date, even if the
    /// dispatcher observes the same minute on two consecutive ticks.
    fired_on: Option<NaiveDate>,
}

/// Process-lifetime mapping from chat id to a registered daily delivery time.
///
/// One entry per chat; re-registration overwrites and re-arms the entry.
/// Guarded by an async `RwLock` because the handlers and the dispatcher loop
/// run on a multi-threaded runtime.
#[derive(Clone, Default)]
pub struct ScheduleStore {
    inner: Arc<RwLock<HashMap<ChatId, ScheduleEntry>>>,
}

impl ScheduleStore {
    /// Creates an empty store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `time` for `chat_id`, overwriting any previous registration.
    ///
    /// Overwriting also clears the fired-today marker, so a fresh
    /// registration is always eligible to fire.
    pub async fn set(&self, chat_id: ChatId, time: DailyTime) {
        let mut entries = self.inner.write().await;
        entries.insert(
            chat_id,
            ScheduleEntry {
                time,
                fired_on: None,
            },
        );
    }

    /// Returns the registered time for `chat_id`, if any
    pub async fn get(&self, chat_id: ChatId) -> Option<DailyTime> {
        let entries = self.inner.read().await;
        entries.get(&chat_id).map(|entry| entry.time)
    }

    /// Removes the registration for `chat_id`, returning the removed time
    pub async fn remove(&self, chat_id: ChatId) -> Option<DailyTime> {
        let mut entries = self.inner.write().await;
        entries.remove(&chat_id).map(|entry| entry.time)
    }

    /// Number of registered schedules
    pub async fn len(&self) -> usize {
        self.inner.read().await.len()
    }

    /// Whether no schedule is registered
    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.is_empty()
    }

    /// Selects every chat whose registered time equals the (hour, minute) of
    /// `now` and which has not fired yet today, marking each as fired.
    ///
    /// Marking happens before the caller launches any delivery, so one
    /// (chat, date) pair can never be claimed twice, regardless of how often
    /// the dispatcher observes the matching minute.
    pub async fn claim_due(&self, now: NaiveDateTime) -> Vec<ChatId> {
        let today = now.date();
        let mut due = Vec::new();

        let mut entries = self.inner.write().await;
        for (chat_id, entry) in entries.iter_mut() {
            if entry.time.matches(now) && entry.fired_on != Some(today) {
                entry.fired_on = Some(today);
                due.push(*chat_id);
            }
        }

        due
    }
}
