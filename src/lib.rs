pub mod cli;
pub mod config;
pub mod engine;
pub mod error;
pub mod events;
pub mod logging;
pub mod models;
pub mod navigation;
pub mod picker;
pub mod scripture;
pub mod scroll;
pub mod session;
pub mod settings;
pub mod state;
pub mod streak;
pub mod ui;
pub mod window;
