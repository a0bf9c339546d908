//! Telegram bot behavior
//!
//! - [`handlers`] turns one inbound message into exactly one reply
//! - [`runner`] long-polls Telegram and dispatches updates concurrently
//! - [`prompts`] holds the persona and fixed reply texts
//! - [`documents`] reads uploaded text documents

#![allow(missing_docs)]

pub mod documents;
pub mod handlers;
pub mod prompts;
pub mod runner;

pub use handlers::{Command, handle_message};
pub use runner::{Dispatcher, run};
