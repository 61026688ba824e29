//! CLI command implementations.

pub mod common;
pub mod export;
pub mod optimize;
pub mod parse;
pub mod run;
pub mod unitary;
pub mod version;
