// ==========================================
// 诊所预约排队系统 - 操作日志仓储
// ==========================================
// 红线: Repository 不含业务逻辑
// ==========================================

use crate::db::open_sqlite_connection;
use crate::domain::action_log::{ActionLog, ActionType};
use crate::repository::appointment_repo::{format_datetime, DATETIME_FMT};
use crate::repository::error::{RepositoryError, RepositoryResult};
use chrono::NaiveDateTime;
use rusqlite::{params, Connection, Result as SqliteResult, Row};
use std::sync::{Arc, Mutex, MutexGuard};

fn map_action_log(row: &Row<'_>) -> SqliteResult<ActionLog> {
    let type_raw: String = row.get(1)?;
    let action_type = ActionType::parse_str(&type_raw).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            1,
            rusqlite::types::Type::Text,
            format!("非法的操作类型: {}", type_raw).into(),
        )
    })?;

    let payload_raw: Option<String> = row.get(4)?;
    let payload_json = payload_raw
        .map(|s| {
            serde_json::from_str(&s).map_err(|e| {
                rusqlite::Error::FromSqlConversionFailure(
                    4,
                    rusqlite::types::Type::Text,
                    Box::new(e),
                )
            })
        })
        .transpose()?;

    let ts_raw: String = row.get(5)?;
    let action_ts = NaiveDateTime::parse_from_str(&ts_raw, DATETIME_FMT).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(5, rusqlite::types::Type::Text, Box::new(e))
    })?;

    Ok(ActionLog {
        action_id: row.get(0)?,
        action_type,
        doctor_id: row.get(2)?,
        appointment_id: row.get(3)?,
        payload_json,
        action_ts,
    })
}

// ==========================================
// ActionLogRepository - 操作日志仓储
// ==========================================

/// 操作日志仓储
/// 职责: 管理 action_log 表的追加与查询
pub struct ActionLogRepository {
    conn: Arc<Mutex<Connection>>,
}

impl ActionLogRepository {
    /// 创建新的操作日志仓储实例
    pub fn new(db_path: &str) -> RepositoryResult<Self> {
        let conn = open_sqlite_connection(db_path)
            .map_err(|e| RepositoryError::DatabaseConnectionError(e.to_string()))?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// 从已有连接创建仓储实例
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 追加一条操作日志
    pub fn insert(&self, log: &ActionLog) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        Self::insert_in(&conn, log)
    }

    /// 追加一条操作日志（事务内）
    pub fn insert_in(conn: &Connection, log: &ActionLog) -> RepositoryResult<()> {
        let payload = log
            .payload_json
            .as_ref()
            .map(serde_json::to_string)
            .transpose()
            .map_err(|e| RepositoryError::FieldValueError {
                field: "payload_json".to_string(),
                message: e.to_string(),
            })?;

        conn.execute(
            r#"
            INSERT INTO action_log (
                action_id, action_type, doctor_id, appointment_id, payload_json, action_ts
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
            params![
                log.action_id,
                log.action_type.to_db_str(),
                log.doctor_id,
                log.appointment_id,
                payload,
                format_datetime(log.action_ts),
            ],
        )?;
        Ok(())
    }

    /// 查询最近的操作日志（时间倒序）
    pub fn list_recent(&self, limit: i64) -> RepositoryResult<Vec<ActionLog>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT action_id, action_type, doctor_id, appointment_id, payload_json, action_ts
            FROM action_log
            ORDER BY action_ts DESC, action_id DESC
            LIMIT ?1
            "#,
        )?;

        let rows = stmt
            .query_map(params![limit], map_action_log)?
            .collect::<SqliteResult<Vec<ActionLog>>>()?;
        Ok(rows)
    }

    /// 查询某医生相关的操作日志（时间倒序）
    pub fn list_for_doctor(&self, doctor_id: &str, limit: i64) -> RepositoryResult<Vec<ActionLog>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT action_id, action_type, doctor_id, appointment_id, payload_json, action_ts
            FROM action_log
            WHERE doctor_id = ?1
            ORDER BY action_ts DESC, action_id DESC
            LIMIT ?2
            "#,
        )?;

        let rows = stmt
            .query_map(params![doctor_id, limit], map_action_log)?
            .collect::<SqliteResult<Vec<ActionLog>>>()?;
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{configure_sqlite_connection, ensure_schema};
    use chrono::NaiveDate;
    use serde_json::json;

    fn test_conn() -> Connection {
        let conn = Connection::open_in_memory().expect("open in-memory db");
        configure_sqlite_connection(&conn).expect("pragma");
        ensure_schema(&conn).expect("schema");
        conn
    }

    #[test]
    fn test_insert_and_list_roundtrip() {
        let conn = test_conn();
        let ts = NaiveDate::from_ymd_opt(2026, 8, 6)
            .unwrap()
            .and_hms_opt(9, 0, 0)
            .unwrap();
        let log = ActionLog::new(
            ActionType::Recalc,
            Some("d1"),
            None,
            Some(json!({"queue_len": 3})),
            ts,
        );
        ActionLogRepository::insert_in(&conn, &log).expect("insert");

        let repo = ActionLogRepository::from_connection(Arc::new(Mutex::new(conn)));
        let rows = repo.list_for_doctor("d1", 10).expect("list");
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].action_type, ActionType::Recalc);
        assert_eq!(rows[0].payload_json, Some(json!({"queue_len": 3})));
    }
}
