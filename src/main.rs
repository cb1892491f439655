use dotenvy::dotenv;
use fingram_bot::bot::handlers::Command;
use fingram_bot::bot::state::State;
use fingram_bot::config::Settings;
use fingram_bot::schedule::ScheduleStore;
use fingram_bot::scheduler::{DeliveryStats, Scheduler};
use fingram_bot::{bot, llm};
use regex::Regex;
use std::io::{self, Write};
use std::sync::Arc;
use teloxide::dispatching::dialogue::InMemStorage;
use teloxide::dispatching::UpdateHandler;
use teloxide::prelude::*;
use tracing::{debug, error, info};
use tracing_subscriber::{prelude::*, EnvFilter};

/// Regex patterns for redacting sensitive data
struct RedactionPatterns {
    token1: Regex,
    token2: Regex,
    token3: Regex,
    key1: Regex,
    key2: Regex,
}

impl RedactionPatterns {
    /// Initialize all regex patterns
    ///
    /// # Errors
    ///
    /// Returns an error if any regex pattern is invalid
    fn new() -> Result<Self, regex::Error> {
        Ok(Self {
            token1: Regex::new(r"(https?://[^/]+/bot)([0-9]+:[A-Za-z0-9_-]+)(/['\s]*)")?,
            token2: Regex::new(r"([0-9]{8,10}:[A-Za-z0-9_-]{35})")?,
            token3: Regex::new(r"(bot[0-9]{8,10}:)[A-Za-z0-9_-]+")?,
            key1: Regex::new(r"DEEPSEEK_API_KEY=[^\s&]+")?,
            key2: Regex::new(r"(Bearer\s+)[A-Za-z0-9_-]{8,}")?,
        })
    }

    fn redact(&self, input: &str) -> String {
        let mut output = input.to_string();
        output = self
            .token1
            .replace_all(&output, "$1[TELEGRAM_TOKEN]$3")
            .to_string();
        output = self
            .token2
            .replace_all(&output, "[TELEGRAM_TOKEN]")
            .to_string();
        output = self
            .token3
            .replace_all(&output, "$1[TELEGRAM_TOKEN]")
            .to_string();
        output = self
            .key1
            .replace_all(&output, "DEEPSEEK_API_KEY=[MASKED]")
            .to_string();
        output = self.key2.replace_all(&output, "$1[MASKED]").to_string();
        output
    }
}

struct RedactingWriter<W: Write> {
    inner: W,
    patterns: Arc<RedactionPatterns>,
}

impl<W: Write> RedactingWriter<W> {
    const fn new(inner: W, patterns: Arc<RedactionPatterns>) -> Self {
        Self { inner, patterns }
    }
}

impl<W: Write> Write for RedactingWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let s = String::from_utf8_lossy(buf);
        let redacted = self.patterns.redact(&s);
        self.inner.write_all(redacted.as_bytes())?;
        // We return the original buffer length to satisfy the contract,
        // even if the redacted string length differs.
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

struct RedactingMakeWriter<F> {
    make_inner: F,
    patterns: Arc<RedactionPatterns>,
}

impl<F> RedactingMakeWriter<F> {
    const fn new(make_inner: F, patterns: Arc<RedactionPatterns>) -> Self {
        Self {
            make_inner,
            patterns,
        }
    }
}

impl<'a, F, W> tracing_subscriber::fmt::MakeWriter<'a> for RedactingMakeWriter<F>
where
    F: Fn() -> W + 'static,
    W: Write,
{
    type Writer = RedactingWriter<W>;

    fn make_writer(&'a self) -> Self::Writer {
        RedactingWriter::new((self.make_inner)(), self.patterns.clone())
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load .env file
    dotenv().ok();

    // Initialize redaction patterns early (before logging)
    let patterns = Arc::new(RedactionPatterns::new().map_err(|e| {
        eprintln!("Failed to compile regex patterns: {e}");
        e
    })?);

    // Setup logging with redaction
    init_logging(patterns);

    info!("Starting Fingram bot...");

    // Load settings
    let settings = init_settings();

    // Initialize the question generator
    let generator = Arc::new(llm::QuestionGenerator::new(&settings));
    info!("Question generator initialized.");

    // Initialize Bot
    let bot = Bot::new(settings.telegram_token.clone());

    // Shared state: schedule store, dialogue storage, delivery counters
    let store = ScheduleStore::new();
    let dialogue_storage = init_dialogue_storage();
    let stats = Arc::new(DeliveryStats::new());

    // Launch the dispatcher loop next to the Telegram dispatcher
    let scheduler = Scheduler::new(bot.clone(), store.clone(), generator, Arc::clone(&stats));
    tokio::spawn(scheduler.run());

    // Setup handlers
    let handler = setup_handler();

    info!("Bot is running...");

    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![store, dialogue_storage])
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;

    info!(
        "Shutting down. Deliveries: {} dispatched, {} delivered, {} failed.",
        stats.dispatched(),
        stats.delivered(),
        stats.failed()
    );

    Ok(())
}

fn init_logging(patterns: Arc<RedactionPatterns>) {
    let make_writer = RedactingMakeWriter::new(io::stderr, patterns);
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(make_writer))
        .init();
}

fn init_settings() -> Arc<Settings> {
    match Settings::new() {
        Ok(s) => {
            info!("Configuration loaded successfully.");
            Arc::new(s)
        }
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    }
}

fn init_dialogue_storage() -> Arc<InMemStorage<State>> {
    InMemStorage::<State>::new()
}

fn setup_handler() -> UpdateHandler<teloxide::RequestError> {
    Update::filter_message()
        .enter_dialogue::<Message, InMemStorage<State>, State>()
        .branch(
            dptree::entry()
                .filter_command::<Command>()
                .endpoint(handle_command),
        )
        .branch(dptree::case![State::AwaitingTime].endpoint(handle_time_input))
        .branch(dptree::case![State::Idle].endpoint(handle_idle_message))
}

async fn handle_command(
    bot: Bot,
    msg: Message,
    cmd: Command,
    store: ScheduleStore,
    dialogue: Dialogue<State, InMemStorage<State>>,
) -> Result<(), teloxide::RequestError> {
    let res = match cmd {
        Command::Start => bot::handlers::start(bot, msg, dialogue).await,
        Command::Schedule => bot::handlers::schedule(bot, msg, store).await,
        Command::Cancel => bot::handlers::cancel(bot, msg, store, dialogue).await,
        Command::Help => bot::handlers::help(bot, msg).await,
    };
    if let Err(e) = res {
        error!("Command error: {}", e);
    }
    respond(())
}

async fn handle_time_input(
    bot: Bot,
    msg: Message,
    store: ScheduleStore,
    dialogue: Dialogue<State, InMemStorage<State>>,
) -> Result<(), teloxide::RequestError> {
    if let Err(e) = bot::handlers::receive_time(bot, msg, store, dialogue).await {
        error!("Time input handler error: {}", e);
    }
    respond(())
}

async fn handle_idle_message(msg: Message) -> Result<(), teloxide::RequestError> {
    // Chatter outside the registration flow gets no reply
    debug!("Ignoring message from chat {}", msg.chat.id);
    respond(())
}
