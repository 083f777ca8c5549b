//! Core state and policy for the chat client.

pub mod chat;
pub mod config;
pub mod constants;
pub mod conversation;
pub mod message;
pub mod models;
pub mod sanitize;
