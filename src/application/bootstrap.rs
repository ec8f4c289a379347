use crate::application::calendar_engine::CalendarEngine;
use crate::infrastructure::config::{ensure_default_config, load_engine_config};
use crate::infrastructure::error::EngineError;
use chrono::{DateTime, TimeZone};
use std::path::Path;

/// Loads `engine.json` from `config_dir`, writing defaults on first run, and
/// builds an engine whose offset is resolved at `now`.
pub fn bootstrap_engine<Tz: TimeZone>(
    config_dir: &Path,
    now: &DateTime<Tz>,
) -> Result<CalendarEngine, EngineError> {
    ensure_default_config(config_dir)?;
    let config = load_engine_config(config_dir)?;
    CalendarEngine::new(config, now)
}
