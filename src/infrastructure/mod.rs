pub mod config;
pub mod error;
pub mod event_mapper;
pub mod event_snapshot;
pub mod logging;
