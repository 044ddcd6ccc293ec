//! Command-line front end for the audit engine.

pub mod args;
pub mod audit;
pub mod config;
pub mod history;
pub mod ui;
