//! ActivityWatch migration CLI library.
//!
//! This crate wires the stores, the loader and the sweep into the `awm`
//! commands.

mod cli;
pub mod commands;
mod config;
mod error;
pub mod loader;

pub use cli::{Cli, Commands, MigrateArgs};
pub use config::Config;
pub use error::MigrateError;
