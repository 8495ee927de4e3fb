pub mod app;
pub mod config;
pub mod domain;
pub mod error;
pub mod not_found;
pub mod output;
pub mod progress;
pub mod pubchem;
pub mod store;
pub mod table;
pub mod tui;
