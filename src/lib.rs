//! taskpoet library
//!
//! Tasks stored under `/<state>/<plugin>/<id>` keys in a SQLite-backed
//! bucket store, with urgency curation and human date expressions.

pub mod calendar;
pub mod cli;
pub mod config;
pub mod curator;
pub mod db;
pub mod error;
pub mod format;
pub mod logging;
pub mod plugins;
pub mod query;
pub mod types;
