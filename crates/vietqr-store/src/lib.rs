// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, anyhow, bail};
use rusqlite::{Connection, OptionalExtension, params};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;
use vietqr_app::{Catalog, Named, Profile, SavedMessage, names_equal};

pub const APP_NAME: &str = "vietqr";
pub const PROFILES_KEY: &str = "vietqr_profiles";
pub const MESSAGES_KEY: &str = "vietqr_messages";
pub const DB_PATH_ENV: &str = "VIETQR_DB_PATH";

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS kv (
  key TEXT PRIMARY KEY,
  value TEXT NOT NULL,
  updated_at TEXT NOT NULL
);
";

pub struct Store {
    conn: Connection,
}

struct StoredList<T> {
    items: Vec<T>,
    unreadable: Vec<Value>,
}

impl Store {
    pub fn open(path: &Path) -> Result<Self> {
        let printable = path.to_string_lossy().to_string();
        validate_db_path(&printable)?;
        let conn = Connection::open(path)
            .with_context(|| format!("open database at {}", path.display()))?;
        configure_connection(&conn)?;
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
        self.conn
            .execute_batch(SCHEMA)
            .context("create key-value table")
    }

    pub fn list_profiles(&self) -> Result<Vec<Profile>> {
        self.load_list(PROFILES_KEY)
    }

    pub fn save_profile(&self, profile: &Profile) -> Result<Vec<Profile>> {
        self.upsert_into(PROFILES_KEY, profile.clone())
    }

    pub fn delete_profile(&self, name: &str) -> Result<Vec<Profile>> {
        self.remove_from(PROFILES_KEY, name)
    }

    pub fn list_messages(&self) -> Result<Vec<SavedMessage>> {
        self.load_list(MESSAGES_KEY)
    }

    pub fn save_message(&self, message: &SavedMessage) -> Result<Vec<SavedMessage>> {
        self.upsert_into(MESSAGES_KEY, message.clone())
    }

    pub fn delete_message(&self, name: &str) -> Result<Vec<SavedMessage>> {
        self.remove_from(MESSAGES_KEY, name)
    }

    fn load_list<T: DeserializeOwned>(&self, key: &str) -> Result<Vec<T>> {
        Ok(self.load_entries(key)?.items)
    }

    // Entries that do not parse are skipped and kept aside. A value that is not a JSON
    // array reads as empty.
    fn load_entries<T: DeserializeOwned>(&self, key: &str) -> Result<StoredList<T>> {
        let mut list = StoredList {
            items: Vec::new(),
            unreadable: Vec::new(),
        };
        let Some(raw) = self.get_raw(key)? else {
            return Ok(list);
        };
        let values = match serde_json::from_str::<Vec<Value>>(&raw) {
            Ok(values) => values,
            Err(error) => {
                tracing::warn!(key, %error, "stored list is malformed; treating as empty");
                return Ok(list);
            }
        };
        for (index, value) in values.into_iter().enumerate() {
            match T::deserialize(&value) {
                Ok(item) => list.items.push(item),
                Err(error) => {
                    tracing::warn!(key, index, %error, "skipping unreadable stored entry");
                    list.unreadable.push(value);
                }
            }
        }
        Ok(list)
    }

    fn upsert_into<T>(&self, key: &str, item: T) -> Result<Vec<T>>
    where
        T: Named + Serialize + DeserializeOwned,
    {
        let StoredList { items, unreadable } = self.load_entries::<T>(key)?;
        let mut catalog = Catalog::from_vec(items);
        let name = item.name().to_owned();
        let replaced = catalog.upsert(item);
        let items = catalog.into_vec();
        self.put_list(key, &items, unreadable)?;
        tracing::debug!(key, name = %name, replaced, "stored list updated");
        Ok(items)
    }

    fn remove_from<T>(&self, key: &str, name: &str) -> Result<Vec<T>>
    where
        T: Named + Serialize + DeserializeOwned,
    {
        let StoredList {
            mut items,
            unreadable,
        } = self.load_entries::<T>(key)?;
        let before = items.len();
        items.retain(|item| !names_equal(item.name(), name));
        if items.len() == before {
            tracing::debug!(key, name, "nothing to remove");
            return Ok(items);
        }
        self.put_list(key, &items, unreadable)?;
        tracing::debug!(key, name, "stored list entry removed");
        Ok(items)
    }

    // Unreadable entries are written back after the readable ones.
    fn put_list<T: Serialize>(
        &self,
        key: &str,
        items: &[T],
        unreadable: Vec<Value>,
    ) -> Result<()> {
        let mut values = items
            .iter()
            .map(serde_json::to_value)
            .collect::<serde_json::Result<Vec<Value>>>()
            .with_context(|| format!("encode {key}"))?;
        values.extend(unreadable);
        let value = serde_json::to_string(&values).with_context(|| format!("encode {key}"))?;
        self.put_raw(key, &value)
    }

    fn get_raw(&self, key: &str) -> Result<Option<String>> {
        self.conn
            .query_row("SELECT value FROM kv WHERE key = ?", params![key], |row| {
                row.get::<_, String>(0)
            })
            .optional()
            .with_context(|| format!("read {key}"))
    }

    fn put_raw(&self, key: &str, value: &str) -> Result<()> {
        let now = now_rfc3339()?;
        self.conn
            .execute(
                "
                INSERT INTO kv (key, value, updated_at)
                VALUES (?, ?, ?)
                ON CONFLICT(key) DO UPDATE SET
                  value = excluded.value,
                  updated_at = excluded.updated_at
                ",
                params![key, value, now],
            )
            .with_context(|| format!("write {key}"))?;
        Ok(())
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
    Ok(app_dir.join("vietqr.db"))
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

fn now_rfc3339() -> Result<String> {
    OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .context("format current timestamp")
}
