#![deny(missing_docs)]
//! Fingram bot library.
//!
//! A Telegram bot that asks the user for a daily delivery time and then, once
//! per day at that time, sends an AI-generated financial literacy question.

/// Telegram dialogue state and message handlers.
pub mod bot;
/// Configuration management.
pub mod config;
/// Question generation via the DeepSeek chat-completions API.
pub mod llm;
/// In-memory per-user schedule store.
pub mod schedule;
/// Periodic dispatcher that triggers question deliveries.
pub mod scheduler;
