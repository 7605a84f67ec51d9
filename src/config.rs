use chrono::{FixedOffset, NaiveTime};

use crate::jobs::reminder::{ReminderSchedule, DEFAULT_REMINDER_MESSAGE};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Postgres,
    Memory,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub database_url: String,
    /// Set via FITTRACK_STORE (`postgres` | `memory`). Default: postgres.
    pub store: StoreBackend,
    /// Local time the daily reminder fires. FITTRACK_REMINDER_AT, default 08:00.
    pub reminder_at: NaiveTime,
    /// Fixed offset the reminder time and calendar day are computed in.
    /// FITTRACK_REMINDER_UTC_OFFSET (e.g. `+02:00`). Unset: host local time, DST-aware.
    pub reminder_offset: Option<FixedOffset>,
    pub reminder_message: String,
    /// Dashboard origin allowed by CORS. DASHBOARD_ORIGIN.
    pub dashboard_origin: String,
    /// Emit JSON log lines. FITTRACK_LOG_FORMAT=json.
    pub json_logs: bool,
}

impl Config {
    pub fn reminder_schedule(&self) -> ReminderSchedule {
        match self.reminder_offset {
            Some(offset) => ReminderSchedule::new(self.reminder_at, offset),
            None => ReminderSchedule::local(self.reminder_at),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 3000,
            database_url: "postgres://localhost/fittrack".into(),
            store: StoreBackend::Postgres,
            reminder_at: NaiveTime::from_hms_opt(8, 0, 0).unwrap_or(NaiveTime::MIN),
            reminder_offset: None,
            reminder_message: DEFAULT_REMINDER_MESSAGE.into(),
            dashboard_origin: "http://localhost:5173".into(),
            json_logs: false,
        }
    }
}

pub fn load() -> anyhow::Result<Config> {
    dotenvy::dotenv().ok();
    from_lookup(|key| std::env::var(key).ok())
}

/// Build a config from any key lookup. Unset keys take defaults; set but
/// invalid values are errors.
pub fn from_lookup(get: impl Fn(&str) -> Option<String>) -> anyhow::Result<Config> {
    let defaults = Config::default();

    let port = match get("FITTRACK_PORT") {
        Some(v) => v
            .parse()
            .map_err(|_| anyhow::anyhow!("FITTRACK_PORT is not a valid port: {}", v))?,
        None => defaults.port,
    };

    let store = match get("FITTRACK_STORE").as_deref().map(str::trim) {
        None | Some("") | Some("postgres") => StoreBackend::Postgres,
        Some("memory") => StoreBackend::Memory,
        Some(other) => anyhow::bail!("FITTRACK_STORE must be 'postgres' or 'memory', got '{}'", other),
    };

    let reminder_at = match get("FITTRACK_REMINDER_AT") {
        Some(v) => NaiveTime::parse_from_str(v.trim(), "%H:%M")
            .map_err(|_| anyhow::anyhow!("FITTRACK_REMINDER_AT must be HH:MM, got '{}'", v))?,
        None => defaults.reminder_at,
    };

    let reminder_offset = match get("FITTRACK_REMINDER_UTC_OFFSET") {
        Some(v) => Some(parse_utc_offset(&v)?),
        None => defaults.reminder_offset,
    };

    let reminder_message = get("FITTRACK_REMINDER_MESSAGE")
        .map(|m| m.trim().to_string())
        .filter(|m| !m.is_empty())
        .unwrap_or(defaults.reminder_message);

    Ok(Config {
        port,
        database_url: get("DATABASE_URL").unwrap_or(defaults.database_url),
        store,
        reminder_at,
        reminder_offset,
        reminder_message,
        dashboard_origin: get("DASHBOARD_ORIGIN").unwrap_or(defaults.dashboard_origin),
        json_logs: get("FITTRACK_LOG_FORMAT").is_some_and(|v| v.eq_ignore_ascii_case("json")),
    })
}

/// Parses `Z`, `+HH:MM` or `-HH:MM`.
fn parse_utc_offset(raw: &str) -> anyhow::Result<FixedOffset> {
    let raw = raw.trim();
    if raw.eq_ignore_ascii_case("z") || raw == "+00:00" || raw == "-00:00" {
        return FixedOffset::east_opt(0).ok_or_else(|| anyhow::anyhow!("invalid offset"));
    }
    let invalid = || anyhow::anyhow!("FITTRACK_REMINDER_UTC_OFFSET must be ±HH:MM, got '{}'", raw);

    let (sign, rest) = if let Some(rest) = raw.strip_prefix('+') {
        (1, rest)
    } else if let Some(rest) = raw.strip_prefix('-') {
        (-1, rest)
    } else {
        return Err(invalid());
    };
    let (h, m) = rest.split_once(':').ok_or_else(invalid)?;
    let hours: i32 = h.parse().map_err(|_| invalid())?;
    let minutes: i32 = m.parse().map_err(|_| invalid())?;
    if hours > 14 || minutes > 59 {
        return Err(invalid());
    }
    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60)).ok_or_else(invalid)
}
