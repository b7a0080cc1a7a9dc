pub mod cli;
pub mod config;
pub mod juju;
pub mod logger;
pub mod proxy;
pub mod utils;
