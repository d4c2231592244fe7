//! sqlchat - Chat with a SQL database from your terminal.
//!
//! This library exposes the core modules for use in integration tests.

pub mod agent;
pub mod app;
pub mod cli;
pub mod config;
pub mod db;
pub mod error;
pub mod logging;
pub mod session;
pub mod tui;
