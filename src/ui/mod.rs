//! Line-oriented terminal front end.
//!
//! - [`transcript`]: how messages look on screen and in transcript logs.
//! - [`chat_loop`]: reads the prompt, runs commands and submissions through
//!   [`crate::core::dispatch`], and prints session events as they arrive.

pub mod chat_loop;
pub mod transcript;
