// Discord layer - commands and the serenity adapter for the core ports.

#[path = "commands/command_catalog.rs"]
pub mod commands;

#[path = "quotes/serenity_platform.rs"]
pub mod platform;

// Re-export command types for convenience
pub use commands::quote::{Context, Data, Error};
