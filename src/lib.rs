pub mod buttons;
pub mod config;
pub mod extension;
pub mod host;
pub mod paths;
pub mod runner;
