//! CLI subcommand implementations.

pub mod entries;
pub mod profile;
pub mod rate;
pub mod salary;
pub mod status;
pub mod sweep;
pub mod timer;
