use r2d2_sqlite::rusqlite::{params, Connection};
use serde_json::Value;
use time::OffsetDateTime;
use uuid::Uuid;

/// Write a structured event to the SQLite event log and mirror it to the
/// `log` facade for console diagnostics.
pub fn log_event(
    conn: &Connection,
    level: &str,
    code: Option<&str>,
    module: &str,
    message: &str,
    explain: Option<&str>,
    data: Option<Value>,
) -> rusqlite::Result<()> {
    let id = Uuid::new_v4().to_string();
    let ts = OffsetDateTime::now_utc().unix_timestamp();
    let data_str = data.map(|v| v.to_string());
    log::log!(target: module, facade_level(level), "{message}");
    conn.execute(
        "INSERT INTO event_log (id, ts, level, code, module, message, explain, data) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![id, ts, level, code, module, message, explain, data_str],
    )?;
    Ok(())
}

fn facade_level(level: &str) -> log::Level {
    match level {
        "error" => log::Level::Error,
        "warn" => log::Level::Warn,
        "debug" => log::Level::Debug,
        "trace" => log::Level::Trace,
        _ => log::Level::Info,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init_db;
    use tempfile::TempDir;

    #[test]
    fn events_are_persisted_with_payload() {
        let dir = TempDir::new().expect("tempdir");
        let pool = init_db(dir.path().to_path_buf()).expect("init");
        let conn = pool.get().expect("conn");

        log_event(
            &conn,
            "info",
            Some("AI-0200"),
            "ai.runtime",
            "invocation succeeded",
            Some("provider answered"),
            Some(serde_json::json!({ "provider": "mock" })),
        )
        .expect("log");

        let (level, code, data): (String, String, String) = conn
            .query_row(
                "SELECT level, code, data FROM event_log WHERE module = 'ai.runtime'",
                [],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )
            .expect("row");
        assert_eq!(level, "info");
        assert_eq!(code, "AI-0200");
        let payload: Value = serde_json::from_str(&data).expect("json");
        assert_eq!(payload["provider"], "mock");
    }
}
