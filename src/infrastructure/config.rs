use crate::domain::grid::{GridOptions, HourRange};
use crate::infrastructure::error::EngineError;
use chrono::{DateTime, FixedOffset, Offset, TimeZone, Weekday};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;
use tracing::debug;

const ENGINE_JSON: &str = "engine.json";
const SCHEMA_VERSION: u64 = 1;
pub const DEFAULT_TIMEZONE: &str = "Asia/Tokyo";
pub const DEFAULT_DEBOUNCE_MS: u64 = 300;
pub const MAX_DEBOUNCE_MS: u64 = 5_000;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct GridHoursConfig {
    pub start: u32,
    pub end: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct EngineConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timezone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub utc_offset: Option<String>,
    #[serde(default = "default_week_starts_on")]
    pub week_starts_on: String,
    #[serde(default = "default_grid_hours")]
    pub grid_hours: GridHoursConfig,
    #[serde(default = "default_allow_adjacent")]
    pub allow_adjacent: bool,
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
}

fn default_week_starts_on() -> String {
    "sunday".to_string()
}

fn default_grid_hours() -> GridHoursConfig {
    GridHoursConfig { start: 0, end: 24 }
}

fn default_allow_adjacent() -> bool {
    true
}

fn default_debounce_ms() -> u64 {
    DEFAULT_DEBOUNCE_MS
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            timezone: Some(DEFAULT_TIMEZONE.to_string()),
            utc_offset: None,
            week_starts_on: default_week_starts_on(),
            grid_hours: default_grid_hours(),
            allow_adjacent: default_allow_adjacent(),
            debounce_ms: default_debounce_ms(),
        }
    }
}

impl EngineConfig {
    pub fn with_utc_offset(mut self, utc_offset: impl Into<String>) -> Self {
        self.utc_offset = Some(utc_offset.into());
        self
    }

    pub fn validate(&self) -> Result<(), EngineError> {
        if let Some(raw) = &self.utc_offset {
            parse_utc_offset(raw)?;
        }
        if let Some(name) = &self.timezone {
            parse_timezone(name)?;
        }
        self.week_start()?;
        self.hour_range()?;
        if self.debounce_ms > MAX_DEBOUNCE_MS {
            return Err(EngineError::InvalidConfig(format!(
                "debounceMs must be <= {MAX_DEBOUNCE_MS}, got {}",
                self.debounce_ms
            )));
        }
        Ok(())
    }

    /// The fixed offset the engine works in. An explicit `utcOffset` wins;
    /// otherwise the IANA `timezone` is resolved to the offset in effect at
    /// `at`; with neither the engine runs in UTC.
    pub fn resolve_offset<Tz: TimeZone>(&self, at: &DateTime<Tz>) -> Result<FixedOffset, EngineError> {
        if let Some(raw) = &self.utc_offset {
            return parse_utc_offset(raw);
        }
        let Some(name) = &self.timezone else {
            return Ok(Offset::fix(&chrono::Utc));
        };
        let timezone = parse_timezone(name)?;
        Ok(timezone.offset_from_utc_datetime(&at.naive_utc()).fix())
    }

    pub fn week_start(&self) -> Result<Weekday, EngineError> {
        parse_weekday(&self.week_starts_on).ok_or_else(|| {
            EngineError::InvalidConfig(format!(
                "unsupported weekStartsOn: {}",
                self.week_starts_on
            ))
        })
    }

    pub fn hour_range(&self) -> Result<HourRange, EngineError> {
        HourRange::new(self.grid_hours.start, self.grid_hours.end).map_err(|error| {
            EngineError::InvalidConfig(format!("invalid gridHours: {error}"))
        })
    }

    pub fn grid_options(&self) -> Result<GridOptions, EngineError> {
        Ok(GridOptions {
            week_starts_on: self.week_start()?,
            hours: self.hour_range()?,
        })
    }

    pub fn debounce_window(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}

pub fn parse_weekday(value: &str) -> Option<Weekday> {
    match value.trim().to_ascii_lowercase().as_str() {
        "monday" | "mon" => Some(Weekday::Mon),
        "tuesday" | "tue" => Some(Weekday::Tue),
        "wednesday" | "wed" => Some(Weekday::Wed),
        "thursday" | "thu" => Some(Weekday::Thu),
        "friday" | "fri" => Some(Weekday::Fri),
        "saturday" | "sat" => Some(Weekday::Sat),
        "sunday" | "sun" => Some(Weekday::Sun),
        _ => None,
    }
}

/// Accepts `Z`, `UTC`, `±HH:MM` and `±HHMM`.
pub fn parse_utc_offset(value: &str) -> Result<FixedOffset, EngineError> {
    let trimmed = value.trim();
    let invalid = || EngineError::InvalidConfig(format!("utcOffset must be ±HH:MM, got '{value}'"));
    if trimmed.eq_ignore_ascii_case("z") || trimmed.eq_ignore_ascii_case("utc") {
        return Ok(Offset::fix(&chrono::Utc));
    }

    let (sign, digits) = match trimmed.split_at_checked(1) {
        Some(("+", rest)) => (1, rest),
        Some(("-", rest)) => (-1, rest),
        _ => return Err(invalid()),
    };
    let digits = digits.replace(':', "");
    if digits.len() != 4 || !digits.chars().all(|character| character.is_ascii_digit()) {
        return Err(invalid());
    }
    let hours: i32 = digits[..2].parse().map_err(|_| invalid())?;
    let minutes: i32 = digits[2..].parse().map_err(|_| invalid())?;
    if hours > 23 || minutes > 59 {
        return Err(invalid());
    }
    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60)).ok_or_else(invalid)
}

fn parse_timezone(name: &str) -> Result<chrono_tz::Tz, EngineError> {
    name.trim()
        .parse::<chrono_tz::Tz>()
        .map_err(|_| EngineError::InvalidConfig(format!("unknown timezone: {name}")))
}

fn engine_config_path(config_dir: &Path) -> std::path::PathBuf {
    config_dir.join(ENGINE_JSON)
}

pub fn ensure_default_config(config_dir: &Path) -> Result<(), EngineError> {
    let path = engine_config_path(config_dir);
    if !path.exists() {
        fs::create_dir_all(config_dir)?;
        write_config(&path, &EngineConfig::default())?;
        debug!(path = %path.display(), "wrote default engine config");
    }
    Ok(())
}

pub fn load_engine_config(config_dir: &Path) -> Result<EngineConfig, EngineError> {
    let path = engine_config_path(config_dir);
    let raw = fs::read_to_string(&path)?;
    let parsed: serde_json::Value = serde_json::from_str(&raw)?;
    let schema = parsed
        .get("schema")
        .and_then(serde_json::Value::as_u64)
        .ok_or_else(|| EngineError::InvalidConfig(format!("missing schema in {}", path.display())))?;
    if schema != SCHEMA_VERSION {
        return Err(EngineError::InvalidConfig(format!(
            "unsupported schema {} in {}",
            schema,
            path.display()
        )));
    }

    let config: EngineConfig = serde_json::from_value(parsed)?;
    config.validate()?;
    debug!(path = %path.display(), ?config, "loaded engine config");
    Ok(config)
}

pub fn save_engine_config(config_dir: &Path, config: &EngineConfig) -> Result<(), EngineError> {
    config.validate()?;
    fs::create_dir_all(config_dir)?;
    write_config(&engine_config_path(config_dir), config)
}

fn write_config(path: &Path, config: &EngineConfig) -> Result<(), EngineError> {
    let mut value = serde_json::to_value(config)?;
    let object = value.as_object_mut().ok_or_else(|| {
        EngineError::InvalidConfig(format!("invalid object structure for {}", path.display()))
    })?;
    object.insert("schema".to_string(), serde_json::json!(SCHEMA_VERSION));
    let formatted = serde_json::to_string_pretty(&value)?;
    fs::write(path, format!("{formatted}\n"))?;
    Ok(())
}
