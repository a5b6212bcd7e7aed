// library crate for motion-wol
// the binary and the integration tests both build on these modules

pub mod cli;
pub mod conditions;
pub mod config;
pub mod daemon;
pub mod engine;
pub mod rules;
pub mod state;
