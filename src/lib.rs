//! Causerie is a command-driven chat client core for remote LLM completion APIs.
//!
//! The crate is organized around a small set of collaborating layers:
//! - [`core`] owns the conversation store (message log, pagination, model
//!   selection, activity flags), input sanitization, configuration, and the
//!   session orchestrator that routes raw input.
//! - [`commands`] implements slash-command parsing and the dispatcher that
//!   intercepts command-shaped input before it can reach the API.
//! - [`api`] defines the completion wire payloads and the client that sends
//!   them, with per-minute rate limiting and a request timeout race.
//! - [`session`] persists the conversation to client-local storage, renders
//!   plain-text exports, and runs the auto-save task.
//!
//! Runtime entrypoints live in the binary crate (`src/main.rs`) and route
//! through [`crate::cli::main`], which bootstraps a session and runs the
//! line-oriented chat host.

pub mod api;
pub mod cli;
pub mod commands;
pub mod core;
pub mod session;
