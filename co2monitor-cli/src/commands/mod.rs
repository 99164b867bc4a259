//! Subcommand implementations.

pub mod cities;
pub mod common;
pub mod config;
pub mod locate;
pub mod search;
pub mod show;
pub mod watch;
