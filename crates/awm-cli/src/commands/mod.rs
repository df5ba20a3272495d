//! CLI subcommand implementations.

pub mod buckets;
pub mod migrate;
