// Command modules for the launchpad CLI

pub mod market;
pub mod tokens;
pub mod trade;
pub mod utils;
