//! Command and dialogue handlers for the registration flow.
//!
//! The flow is two messages long: `/start` asks for a delivery time and moves
//! the dialogue to [`State::AwaitingTime`]; the next text message is parsed as
//! strict `HH:MM` and, when valid, registered in the schedule store.

use crate::bot::state::State;
use crate::schedule::{DailyTime, ScheduleStore};
use anyhow::Result;
use teloxide::dispatching::dialogue::InMemStorage;
use teloxide::prelude::*;
use teloxide::utils::command::BotCommands;
use tracing::{debug, info};

/// Type alias for dialogue
pub type BotDialogue = Dialogue<State, InMemStorage<State>>;

/// Supported bot commands
#[derive(BotCommands, Clone)]
#[command(rename_rule = "lowercase", description = "Поддерживаемые команды:")]
pub enum Command {
    /// Begin the registration flow
    #[command(description = "Установить время ежедневных заданий.")]
    Start,
    /// Show the registered delivery time
    #[command(description = "Показать установленное время.")]
    Schedule,
    /// Remove the registered delivery time
    #[command(description = "Отменить ежедневную рассылку.")]
    Cancel,
    /// Show command descriptions
    #[command(description = "Показать справку.")]
    Help,
}

/// Greeting and instruction sent by `/start`, verbatim from the product text
const GREETING: &str = "Привет! Я бот, который поможет тебе стать финансово грамотным!\n\
    Давайте установим время для отправки ежедневных заданий.\n\
    Введите время в формате HH:MM (например, 18:30):";

/// Reply to input that does not parse as a strict `HH:MM` time
const TIME_FORMAT_ERROR: &str =
    "Неверный формат времени. Пожалуйста, введите время в формате HH:MM.";

/// Confirmation naming the registered time
fn confirmation_text(time: DailyTime) -> String {
    format!("Время установлено на {time}. Вы будете получать задания каждый день в это время.")
}

/// Status line for `/schedule`
fn schedule_text(registered: Option<DailyTime>) -> String {
    match registered {
        Some(time) => {
            format!("Ваше время рассылки: {time}. Задания приходят каждый день в это время.")
        }
        None => "Время рассылки не установлено. Отправьте /start, чтобы настроить его.".to_string(),
    }
}

/// Confirmation for `/cancel`
fn cancel_text(removed: Option<DailyTime>) -> String {
    match removed {
        Some(time) => format!("Ежедневная рассылка в {time} отменена."),
        None => "У вас нет настроенной рассылки.".to_string(),
    }
}

/// Handle the `/start` command: greet and ask for a delivery time.
///
/// Always restarts the flow; a `/start` sent mid-registration discards the
/// unfinished attempt.
///
/// # Errors
///
/// Returns an error if the greeting cannot be sent or the dialogue state
/// cannot be updated.
pub async fn start(bot: Bot, msg: Message, dialogue: BotDialogue) -> Result<()> {
    info!("Starting time registration for chat {}", msg.chat.id);
    bot.send_message(msg.chat.id, GREETING).await?;
    dialogue.update(State::AwaitingTime).await?;
    Ok(())
}

/// Handle a message while the dialogue waits for a time.
///
/// A non-text message counts as a failed parse. On failure the dialogue
/// stays in [`State::AwaitingTime`], so the user may retry indefinitely.
///
/// # Errors
///
/// Returns an error if a reply cannot be sent or the dialogue state cannot
/// be reset.
pub async fn receive_time(
    bot: Bot,
    msg: Message,
    store: ScheduleStore,
    dialogue: BotDialogue,
) -> Result<()> {
    let chat_id = msg.chat.id;

    let Some(time) = msg.text().and_then(DailyTime::parse) else {
        debug!("Rejected time input {:?} from chat {chat_id}", msg.text());
        bot.send_message(chat_id, TIME_FORMAT_ERROR).await?;
        return Ok(());
    };

    store.set(chat_id, time).await;
    info!("Registered daily delivery at {time} for chat {chat_id}");

    bot.send_message(chat_id, confirmation_text(time)).await?;
    dialogue.exit().await?;
    Ok(())
}

/// Handle the `/schedule` command: show the registered time, if any.
///
/// # Errors
///
/// Returns an error if the reply cannot be sent.
pub async fn schedule(bot: Bot, msg: Message, store: ScheduleStore) -> Result<()> {
    let registered = store.get(msg.chat.id).await;
    bot.send_message(msg.chat.id, schedule_text(registered))
        .await?;
    Ok(())
}

/// Handle the `/cancel` command: remove the registration and abort any
/// unfinished time-input flow.
///
/// # Errors
///
/// Returns an error if the reply cannot be sent or the dialogue state
/// cannot be reset.
pub async fn cancel(
    bot: Bot,
    msg: Message,
    store: ScheduleStore,
    dialogue: BotDialogue,
) -> Result<()> {
    let chat_id = msg.chat.id;

    let removed = store.remove(chat_id).await;
    if removed.is_some() {
        info!("Cancelled daily delivery for chat {chat_id}");
    }
    // A half-finished registration is discarded as well
    if dialogue.get().await?.is_some() {
        dialogue.exit().await?;
    }

    bot.send_message(chat_id, cancel_text(removed)).await?;
    Ok(())
}

/// Handle the `/help` command
///
/// # Errors
///
/// Returns an error if the reply cannot be sent.
pub async fn help(bot: Bot, msg: Message) -> Result<()> {
    bot.send_message(msg.chat.id, Command::descriptions().to_string())
        .await?;
    Ok(())
}
