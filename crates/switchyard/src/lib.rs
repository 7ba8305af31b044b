//! Command-line front end for `switchyard-dispatch`.
//!
//! The binary assembles a registry from the built-in handlers plus the
//! aliases persisted in a YAML config file, then lists, dispatches or edits
//! them. See [`cli::Cli`] for the command surface.

pub mod alias;
pub mod builtins;
pub mod cli;
pub mod config;
pub mod logging;

pub use cli::run;
