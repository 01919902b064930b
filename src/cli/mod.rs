//! Terminal surface over the dashboard and the record store

pub mod import;
pub mod series;
pub mod setup;
pub mod snapshot;
pub mod ui;
pub mod view;
