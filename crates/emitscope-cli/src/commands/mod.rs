//! CLI commands.

pub mod replay;
pub mod validate;
