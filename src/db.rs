// ==========================================
// 诊所预约排队系统 - SQLite 连接初始化
// ==========================================
// 目标:
// - 统一所有 Connection::open 的 PRAGMA 行为，避免“部分模块外键开启/部分不开启”
// - 统一 busy_timeout，减少并发写入时的偶发 busy 错误
// - 统一建表入口，保证库/测试使用同一份 schema
// ==========================================

use rusqlite::Connection;
use rusqlite::OptionalExtension;
use std::time::Duration;

/// 默认 busy_timeout（毫秒）
pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

/// 当前代码所期望的 schema_version
pub const CURRENT_SCHEMA_VERSION: i64 = 1;

/// 配置 SQLite 连接的统一 PRAGMA
///
/// 说明：
/// - foreign_keys 需要“每个连接”单独开启
/// - busy_timeout 需要“每个连接”单独配置
pub fn configure_sqlite_connection(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    conn.busy_timeout(Duration::from_millis(DEFAULT_BUSY_TIMEOUT_MS))?;
    Ok(())
}

/// 打开 SQLite 连接并应用统一配置
pub fn open_sqlite_connection(db_path: &str) -> rusqlite::Result<Connection> {
    let conn = Connection::open(db_path)?;
    configure_sqlite_connection(&conn)?;
    Ok(conn)
}

/// 建表（幂等）
///
/// appointment: 队列重算的唯一业务实体
/// action_log:  变更审计
/// config_kv:   队列策略配置 (scope_id='global')
pub fn ensure_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS appointment (
            appointment_id      TEXT PRIMARY KEY,
            doctor_id           TEXT NOT NULL,
            patient_id          TEXT NOT NULL,
            scheduled_at        TEXT NOT NULL,
            duration_min        INTEGER NOT NULL DEFAULT 15,
            status              TEXT NOT NULL DEFAULT 'SCHEDULED',
            is_emergency        INTEGER NOT NULL DEFAULT 0,
            delay_minutes       INTEGER NOT NULL DEFAULT 0,
            computed_start_time TEXT,
            computed_end_time   TEXT,
            queue_position      INTEGER,
            created_at          TEXT NOT NULL,
            updated_at          TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_appt_doctor_sched
            ON appointment(doctor_id, scheduled_at);
        CREATE INDEX IF NOT EXISTS idx_appt_patient_sched
            ON appointment(patient_id, scheduled_at);
        CREATE INDEX IF NOT EXISTS idx_appt_status
            ON appointment(status);

        CREATE TABLE IF NOT EXISTS action_log (
            action_id      TEXT PRIMARY KEY,
            action_type    TEXT NOT NULL,
            doctor_id      TEXT,
            appointment_id TEXT,
            payload_json   TEXT,
            action_ts      TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_action_ts ON action_log(action_ts);
        CREATE INDEX IF NOT EXISTS idx_action_type_ts ON action_log(action_type, action_ts);
        CREATE INDEX IF NOT EXISTS idx_action_doctor_ts ON action_log(doctor_id, action_ts);

        CREATE TABLE IF NOT EXISTS config_kv (
            scope_id TEXT NOT NULL,
            key      TEXT NOT NULL,
            value    TEXT NOT NULL,
            PRIMARY KEY (scope_id, key)
        );

        CREATE TABLE IF NOT EXISTS schema_version (
            version    INTEGER NOT NULL,
            applied_at TEXT NOT NULL
        );
        "#,
    )?;

    let current = read_schema_version(conn)?;
    if current.is_none() {
        conn.execute(
            "INSERT INTO schema_version (version, applied_at) VALUES (?1, datetime('now'))",
            [CURRENT_SCHEMA_VERSION],
        )?;
    }
    Ok(())
}

/// 读取 schema_version（若表不存在则返回 None）
pub fn read_schema_version(conn: &Connection) -> rusqlite::Result<Option<i64>> {
    let has_table: bool = conn
        .query_row(
            "SELECT 1 FROM sqlite_master WHERE type='table' AND name='schema_version' LIMIT 1",
            [],
            |_row| Ok(true),
        )
        .optional()?
        .unwrap_or(false);

    if !has_table {
        return Ok(None);
    }

    let v: Option<i64> =
        conn.query_row("SELECT MAX(version) FROM schema_version", [], |row| row.get(0))?;
    Ok(v)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ensure_schema_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        configure_sqlite_connection(&conn).unwrap();
        ensure_schema(&conn).unwrap();
        ensure_schema(&conn).unwrap();
        assert_eq!(read_schema_version(&conn).unwrap(), Some(CURRENT_SCHEMA_VERSION));
    }
}
