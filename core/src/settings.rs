//! Persisted key/value settings, including the one encrypted secret the UI
//! can read and write.
//!
//! Secrets are replaced wholesale on every write. Setting an empty value
//! clears the row, so an empty read means either "cleared" or "never set";
//! a value that fails authentication also reads as empty, with the
//! distinction recorded in the event log only.

use anyhow::Result;
use rusqlite::{params, Connection, OptionalExtension};
use time::OffsetDateTime;

use crate::logging::log_event;
use crate::secrets::SecretStore;

/// Settings key holding the encrypted weather API key.
pub const WEATHER_API_KEY: &str = "weather.api_key";

pub fn get_setting(conn: &Connection, key: &str) -> Result<Option<String>> {
    let value = conn
        .query_row(
            "SELECT value FROM app_settings WHERE key = ?1",
            params![key],
            |row| row.get(0),
        )
        .optional()?;
    Ok(value)
}

pub fn set_setting(conn: &Connection, key: &str, value: &str) -> Result<()> {
    let now = OffsetDateTime::now_utc().unix_timestamp();
    conn.execute(
        "INSERT INTO app_settings (key, value, updated_at) VALUES (?1, ?2, ?3)
         ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
        params![key, value, now],
    )?;
    Ok(())
}

/// Read a secret back as plaintext, or `""` when absent or unreadable.
pub fn get_secret(conn: &Connection, store: &SecretStore, key: &str) -> Result<String> {
    let stored = get_setting(conn, key)?.unwrap_or_default();
    let plain = store.decrypt_field(&stored);
    if plain.is_empty() && !stored.is_empty() {
        let _ = log_event(
            conn,
            "warn",
            Some("SEC-0201"),
            "settings",
            "stored secret failed to decrypt",
            Some("The value reads as absent; it may predate the current master key"),
            Some(serde_json::json!({ "key": key })),
        );
    }
    Ok(plain)
}

/// Encrypt and store a secret, replacing any previous value. An empty value
/// clears the row.
pub fn set_secret(conn: &Connection, store: &SecretStore, key: &str, value: &str) -> Result<()> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        conn.execute("DELETE FROM app_settings WHERE key = ?1", params![key])?;
    } else {
        let sealed = store.encrypt_field(trimmed)?;
        set_setting(conn, key, &sealed)?;
    }
    audit_settings_change(conn, key);
    Ok(())
}

fn audit_settings_change(conn: &Connection, key: &str) {
    let _ = log_event(
        conn,
        "info",
        Some("SET-0001"),
        "settings",
        "secret setting updated",
        None,
        Some(serde_json::json!({ "key": key })),
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init_db;
    use tempfile::TempDir;

    fn fixture() -> (TempDir, crate::db::DbPool, SecretStore) {
        let dir = TempDir::new().expect("tempdir");
        let pool = init_db(dir.path().to_path_buf()).expect("init");
        let store = SecretStore::open(&dir.path().join("master.key")).expect("store");
        (dir, pool, store)
    }

    #[test]
    fn secret_round_trips_through_the_database() {
        let (_dir, pool, store) = fixture();
        let conn = pool.get().expect("conn");

        set_secret(&conn, &store, WEATHER_API_KEY, "wx-key-123").expect("set");
        assert_eq!(
            get_secret(&conn, &store, WEATHER_API_KEY).expect("get"),
            "wx-key-123"
        );

        let raw = get_setting(&conn, WEATHER_API_KEY)
            .expect("raw")
            .expect("row exists");
        assert_ne!(raw, "wx-key-123", "value must not be stored in plaintext");
        assert_eq!(raw.split(':').count(), 3);
    }

    #[test]
    fn unset_secret_reads_as_empty() {
        let (_dir, pool, store) = fixture();
        let conn = pool.get().expect("conn");
        assert_eq!(get_secret(&conn, &store, WEATHER_API_KEY).expect("get"), "");
    }

    #[test]
    fn empty_value_clears_the_row() {
        let (_dir, pool, store) = fixture();
        let conn = pool.get().expect("conn");

        set_secret(&conn, &store, WEATHER_API_KEY, "wx-key-123").expect("set");
        set_secret(&conn, &store, WEATHER_API_KEY, "").expect("clear");

        assert_eq!(get_setting(&conn, WEATHER_API_KEY).expect("raw"), None);
        assert_eq!(get_secret(&conn, &store, WEATHER_API_KEY).expect("get"), "");
    }

    #[test]
    fn corrupted_stored_value_reads_as_absent_and_leaves_a_diagnostic() {
        let (_dir, pool, store) = fixture();
        let conn = pool.get().expect("conn");

        set_setting(&conn, WEATHER_API_KEY, "not:a:ciphertext").expect("seed garbage");
        assert_eq!(get_secret(&conn, &store, WEATHER_API_KEY).expect("get"), "");

        let diagnostics: i64 = conn
            .query_row(
                "SELECT COUNT(1) FROM event_log WHERE code = 'SEC-0201'",
                [],
                |row| row.get(0),
            )
            .expect("count");
        assert_eq!(diagnostics, 1);
    }

    #[test]
    fn plain_settings_upsert() {
        let (_dir, pool, _store) = fixture();
        let conn = pool.get().expect("conn");

        set_setting(&conn, "ui.theme", "dark").expect("set");
        set_setting(&conn, "ui.theme", "light").expect("overwrite");
        assert_eq!(
            get_setting(&conn, "ui.theme").expect("get"),
            Some("light".to_string())
        );
    }
}
