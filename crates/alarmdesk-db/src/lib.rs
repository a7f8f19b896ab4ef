// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use alarmdesk_app::{AppSetting, DateRange, SettingKey, SettingValue};
use anyhow::{Context, Result, anyhow, bail};
use rusqlite::{Connection, OptionalExtension, params};
use std::collections::BTreeSet;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;
use tracing::{debug, info};

pub const APP_NAME: &str = "alarmdesk";
pub const DB_PATH_ENV: &str = "ALARMDESK_DB_PATH";

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS settings (
  key TEXT PRIMARY KEY,
  value TEXT NOT NULL,
  updated_at TEXT NOT NULL
);
";

const REQUIRED_SCHEMA: &[(&str, &[&str])] = &[("settings", &["key", "value", "updated_at"])];

/// Local preference store. Everything about incidents lives behind the API;
/// this only remembers the session and a few UI choices between runs.
pub struct Store {
    conn: Connection,
}

impl Store {
    pub fn open(path: &Path) -> Result<Self> {
        let printable = path.to_string_lossy().to_string();
        validate_db_path(&printable)?;
        let conn = Connection::open(path)
            .with_context(|| format!("open database at {}", path.display()))?;
        configure_connection(&conn)?;
        // The store holds the session cookie.
        set_private_permissions(path)?;
        info!(path = %path.display(), "opened preference store");
        Ok(Self { conn })
    }

    pub fn open_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("open in-memory database")?;
        configure_connection(&conn)?;
        Ok(Self { conn })
    }

    pub fn raw_connection(&self) -> &Connection {
        &self.conn
    }

    pub fn bootstrap(&self) -> Result<()> {
        if has_user_tables(&self.conn)? {
            validate_schema(&self.conn)?;
        } else {
            self.conn.execute_batch(SCHEMA).context("create schema")?;
            debug!("created settings schema");
        }
        Ok(())
    }

    pub fn get(&self, key: &str) -> Result<Option<String>> {
        self.conn
            .query_row(
                "SELECT value FROM settings WHERE key = ?",
                params![key],
                |row| row.get::<_, String>(0),
            )
            .optional()
            .with_context(|| format!("read setting {key}"))
    }

    pub fn put(&self, key: &str, value: &str) -> Result<()> {
        if key.trim().is_empty() {
            bail!("setting key must not be empty");
        }
        let now = now_rfc3339()?;
        self.conn
            .execute(
                "
                INSERT INTO settings (key, value, updated_at)
                VALUES (?, ?, ?)
                ON CONFLICT(key) DO UPDATE SET
                  value = excluded.value,
                  updated_at = excluded.updated_at
                ",
                params![key, value, now],
            )
            .with_context(|| format!("upsert setting {key}"))?;
        debug!(key, "stored setting");
        Ok(())
    }

    /// Returns whether a value was present.
    pub fn remove(&self, key: &str) -> Result<bool> {
        let removed = self
            .conn
            .execute("DELETE FROM settings WHERE key = ?", params![key])
            .with_context(|| format!("delete setting {key}"))?;
        Ok(removed > 0)
    }

    pub fn keys(&self) -> Result<Vec<String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT key FROM settings ORDER BY key ASC")
            .context("prepare settings keys query")?;
        let rows = stmt
            .query_map([], |row| row.get::<_, String>(0))
            .context("query settings keys")?;
        rows.collect::<rusqlite::Result<Vec<_>>>()
            .context("collect settings keys")
    }

    pub fn get_setting(&self, key: SettingKey) -> Result<Option<SettingValue>> {
        let raw = self.get(key.as_str())?;
        raw.map(|value| {
            SettingValue::parse_for_key(key, &value).ok_or_else(|| {
                anyhow!(
                    "setting `{}` has invalid value `{}`; run `alarmdesk --check`, then clear it or set a valid value",
                    key.as_str(),
                    value
                )
            })
        })
        .transpose()
    }

    pub fn put_setting(&self, key: SettingKey, value: SettingValue) -> Result<()> {
        let raw = value.to_storage(key).ok_or_else(|| {
            anyhow!(
                "setting `{}` expected {:?} value, got {}",
                key.as_str(),
                key.expected_value_kind(),
                value.display()
            )
        })?;
        self.put(key.as_str(), &raw)
    }

    pub fn list_settings(&self) -> Result<Vec<AppSetting>> {
        let mut settings = Vec::with_capacity(SettingKey::ALL.len());
        for key in SettingKey::ALL {
            if let Some(value) = self.get_setting(key)? {
                settings.push(AppSetting { key, value });
            } else if let Some(value) = default_setting_value(key) {
                settings.push(AppSetting { key, value });
            }
        }
        Ok(settings)
    }

    pub fn session_cookie(&self) -> Result<Option<String>> {
        self.get_text(SettingKey::SessionCookie)
    }

    pub fn put_session_cookie(&self, cookie: &str) -> Result<()> {
        self.put_setting(
            SettingKey::SessionCookie,
            SettingValue::Text(cookie.to_owned()),
        )
    }

    pub fn clear_session(&self) -> Result<()> {
        if self.remove(SettingKey::SessionCookie.as_str())? {
            info!("cleared stored session");
        }
        Ok(())
    }

    pub fn username(&self) -> Result<Option<String>> {
        self.get_text(SettingKey::Username)
    }

    pub fn put_username(&self, username: &str) -> Result<()> {
        self.put_setting(SettingKey::Username, SettingValue::Text(username.to_owned()))
    }

    pub fn last_query(&self) -> Result<String> {
        Ok(self.get_text(SettingKey::LastQuery)?.unwrap_or_default())
    }

    pub fn put_last_query(&self, query: &str) -> Result<()> {
        self.put_setting(
            SettingKey::LastQuery,
            SettingValue::Text(query.trim().to_owned()),
        )
    }

    pub fn history_range(&self) -> Result<Option<DateRange>> {
        match self.get_setting(SettingKey::HistoryRange)? {
            Some(SettingValue::Range(range)) => Ok(Some(range)),
            Some(_) => bail!(
                "setting `{}` must be a date range; clear it with `alarmdesk --reset-settings`",
                SettingKey::HistoryRange.as_str()
            ),
            None => Ok(None),
        }
    }

    pub fn put_history_range(&self, range: DateRange) -> Result<()> {
        self.put_setting(SettingKey::HistoryRange, SettingValue::Range(range))
    }

    pub fn show_calls(&self) -> Result<bool> {
        match self.get_setting(SettingKey::ShowCalls)? {
            Some(SettingValue::Bool(value)) => Ok(value),
            Some(_) => bail!(
                "setting `{}` must be on/off",
                SettingKey::ShowCalls.as_str()
            ),
            None => Ok(true),
        }
    }

    pub fn put_show_calls(&self, show: bool) -> Result<()> {
        self.put_setting(SettingKey::ShowCalls, SettingValue::Bool(show))
    }

    fn get_text(&self, key: SettingKey) -> Result<Option<String>> {
        match self.get_setting(key)? {
            Some(SettingValue::Text(value)) => {
                let trimmed = value.trim();
                if trimmed.is_empty() {
                    Ok(None)
                } else {
                    Ok(Some(trimmed.to_owned()))
                }
            }
            Some(_) => bail!("setting `{}` must be text", key.as_str()),
            None => Ok(None),
        }
    }
}

pub fn default_db_path() -> Result<PathBuf> {
    if let Some(override_path) = env::var_os(DB_PATH_ENV) {
        return Ok(PathBuf::from(override_path));
    }

    let data_root = dirs::data_local_dir().ok_or_else(|| {
        anyhow!("cannot resolve data directory; set {DB_PATH_ENV} to a writable database path")
    })?;

    let app_dir = data_root.join(APP_NAME);
    fs::create_dir_all(&app_dir)
        .with_context(|| format!("create data directory {}", app_dir.display()))?;
    Ok(app_dir.join("alarmdesk.db"))
}

pub fn validate_db_path(path: &str) -> Result<()> {
    if path.is_empty() {
        bail!("database path must not be empty");
    }
    if path == ":memory:" {
        return Ok(());
    }

    if let Some(index) = path.find("://")
        && index > 0
    {
        let scheme = &path[..index];
        if scheme.chars().all(char::is_alphabetic) {
            bail!(
                "database path {path:?} looks like a URI ({scheme}://); pass a filesystem path instead"
            );
        }
    }

    if path.starts_with("file:") {
        bail!("database path {path:?} uses file: URI syntax; pass a plain filesystem path");
    }

    if path.contains('?') {
        bail!(
            "database path {path:?} contains '?'; remove query parameters and use a plain file path"
        );
    }

    Ok(())
}

fn has_user_tables(conn: &Connection) -> Result<bool> {
    let count: i64 = conn
        .query_row(
            "
            SELECT COUNT(*)
            FROM sqlite_master
            WHERE type = 'table'
              AND name NOT LIKE 'sqlite_%'
            ",
            [],
            |row| row.get(0),
        )
        .context("count user tables")?;
    Ok(count > 0)
}

fn validate_schema(conn: &Connection) -> Result<()> {
    for (table, required_columns) in REQUIRED_SCHEMA {
        let columns = table_columns(conn, table)?;
        if columns.is_empty() {
            bail!(
                "database is missing required table `{table}`; point {DB_PATH_ENV} at an alarmdesk database or a new file"
            );
        }

        let missing: Vec<&str> = required_columns
            .iter()
            .copied()
            .filter(|column| !columns.contains(*column))
            .collect();
        if !missing.is_empty() {
            bail!(
                "table `{table}` is missing required columns: {}; delete the database to start fresh",
                missing.join(", ")
            );
        }
    }
    Ok(())
}

fn table_columns(conn: &Connection, table: &str) -> Result<BTreeSet<String>> {
    let mut stmt = conn
        .prepare(&format!("PRAGMA table_info({table})"))
        .with_context(|| format!("inspect columns for {table}"))?;
    let rows = stmt
        .query_map([], |row| row.get::<_, String>(1))
        .with_context(|| format!("query column info for {table}"))?;

    rows.collect::<rusqlite::Result<BTreeSet<_>>>()
        .with_context(|| format!("collect columns for {table}"))
}

fn configure_connection(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        PRAGMA journal_mode = WAL;
        PRAGMA synchronous = NORMAL;
        PRAGMA busy_timeout = 5000;
        ",
    )
    .context("configure sqlite pragmas")
}

fn default_setting_value(key: SettingKey) -> Option<SettingValue> {
    match key {
        SettingKey::ShowCalls => Some(SettingValue::Bool(true)),
        SettingKey::LastQuery => Some(SettingValue::Text(String::new())),
        SettingKey::SessionCookie | SettingKey::Username | SettingKey::HistoryRange => None,
    }
}

fn now_rfc3339() -> Result<String> {
    OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .context("format current timestamp")
}

fn set_private_permissions(path: &Path) -> Result<()> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;

        if !path.exists() {
            return Ok(());
        }
        let mut permissions = fs::metadata(path)
            .with_context(|| format!("stat {}", path.display()))?
            .permissions();
        permissions.set_mode(0o600);
        fs::set_permissions(path, permissions)
            .with_context(|| format!("set permissions on {}", path.display()))?;
    }
    Ok(())
}
