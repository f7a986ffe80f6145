//! Sagechat is a terminal client for the Sage log analysis service.
//!
//! The crate is organized around a small set of collaborating layers:
//! - [`core`] owns the session: the append-only message store, the dispatch
//!   controller that turns each submission into one user/assistant pair, and
//!   configuration.
//! - [`api`] defines the analysis service payloads and the HTTP backend.
//! - [`capture`] validates file attachments and records voice messages.
//! - [`ui`] runs the interactive loop and renders the transcript.
//! - [`commands`] parses slash commands typed at the prompt.
//! - [`relay`] is a small HTTP service forwarding log batches downstream.
//! - [`logs`] reads and cleans log files for `sagechat upload-logs`.
//!
//! Runtime entrypoints live in the binary crate (`src/main.rs`) and route
//! through [`crate::cli::main`].

pub mod api;
pub mod capture;
pub mod cli;
pub mod commands;
pub mod core;
pub mod logs;
pub mod relay;
pub mod ui;
pub mod utils;
