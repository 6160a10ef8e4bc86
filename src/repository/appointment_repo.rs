// ==========================================
// 诊所预约排队系统 - 预约数据仓储
// ==========================================
// 红线: Repository 不含业务逻辑
// 约束: 所有查询使用参数化,防止 SQL 注入
// 约束: SQL 层的 ORDER BY 仅作提示, 队列顺序由引擎层比较器最终裁定
// ==========================================

use crate::db::open_sqlite_connection;
use crate::domain::appointment::Appointment;
use crate::domain::types::AppointmentStatus;
use crate::repository::error::{RepositoryError, RepositoryResult};
use chrono::NaiveDateTime;
use rusqlite::{params, Connection, OptionalExtension, Result as SqliteResult, Row};
use std::sync::{Arc, Mutex, MutexGuard};

/// 日期时间统一存储格式（零填充,字典序与时间序一致）
pub const DATETIME_FMT: &str = "%Y-%m-%d %H:%M:%S";

/// 格式化日期时间为数据库字符串
pub fn format_datetime(dt: NaiveDateTime) -> String {
    dt.format(DATETIME_FMT).to_string()
}

fn parse_datetime(col: usize, raw: &str) -> SqliteResult<NaiveDateTime> {
    NaiveDateTime::parse_from_str(raw, DATETIME_FMT).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(col, rusqlite::types::Type::Text, Box::new(e))
    })
}

fn parse_status(col: usize, raw: &str) -> SqliteResult<AppointmentStatus> {
    AppointmentStatus::parse_str(raw).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            col,
            rusqlite::types::Type::Text,
            format!("非法的预约状态: {}", raw).into(),
        )
    })
}

const APPOINTMENT_COLUMNS: &str = r#"
    appointment_id, doctor_id, patient_id, scheduled_at, duration_min,
    status, is_emergency, delay_minutes,
    computed_start_time, computed_end_time, queue_position,
    created_at, updated_at
"#;

fn map_appointment(row: &Row<'_>) -> SqliteResult<Appointment> {
    let computed_start: Option<String> = row.get(8)?;
    let computed_end: Option<String> = row.get(9)?;

    Ok(Appointment {
        appointment_id: row.get(0)?,
        doctor_id: row.get(1)?,
        patient_id: row.get(2)?,
        scheduled_at: parse_datetime(3, &row.get::<_, String>(3)?)?,
        duration_min: row.get(4)?,
        status: parse_status(5, &row.get::<_, String>(5)?)?,
        is_emergency: row.get(6)?,
        delay_minutes: row.get(7)?,
        computed_start_time: computed_start.map(|s| parse_datetime(8, &s)).transpose()?,
        computed_end_time: computed_end.map(|s| parse_datetime(9, &s)).transpose()?,
        queue_position: row.get(10)?,
        created_at: parse_datetime(11, &row.get::<_, String>(11)?)?,
        updated_at: parse_datetime(12, &row.get::<_, String>(12)?)?,
    })
}

// ==========================================
// AppointmentRepository - 预约仓储
// ==========================================

/// 预约仓储
/// 职责: 管理 appointment 表的 CRUD 操作
///
/// 带 `_in` 后缀的关联函数在调用方提供的连接/事务上执行，
/// 供变更网关把“应用变更 → 读取 → 重算 → 回写”放进同一个事务。
pub struct AppointmentRepository {
    conn: Arc<Mutex<Connection>>,
}

impl AppointmentRepository {
    /// 创建新的预约仓储实例
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

    /// 获取数据库连接
    fn get_conn(&self) -> RepositoryResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    // ==========================================
    // 自持锁的读写接口
    // ==========================================

    /// 插入一条预约
    pub fn insert(&self, appointment: &Appointment) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        Self::insert_in(&conn, appointment)
    }

    /// 按ID查询预约
    pub fn find_by_id(&self, appointment_id: &str) -> RepositoryResult<Option<Appointment>> {
        let conn = self.get_conn()?;
        Self::find_by_id_in(&conn, appointment_id)
    }

    /// 查询某医生当日的全部未取消预约（看板用，含 IN_PROGRESS / COMPLETED）
    pub fn find_day_excluding_cancelled(
        &self,
        doctor_id: &str,
        day_start: NaiveDateTime,
        day_end: NaiveDateTime,
    ) -> RepositoryResult<Vec<Appointment>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(&format!(
            r#"
            SELECT {APPOINTMENT_COLUMNS}
            FROM appointment
            WHERE doctor_id = ?1
              AND scheduled_at BETWEEN ?2 AND ?3
              AND status != 'CANCELLED'
            ORDER BY is_emergency DESC, scheduled_at ASC
            "#
        ))?;

        let rows = stmt
            .query_map(
                params![
                    doctor_id,
                    format_datetime(day_start),
                    format_datetime(day_end)
                ],
                map_appointment,
            )?
            .collect::<SqliteResult<Vec<Appointment>>>()?;
        Ok(rows)
    }

    /// 查询某医生一段时间内的后续已预约记录（看板“未来7天”用）
    pub fn find_upcoming_for_doctor(
        &self,
        doctor_id: &str,
        after: NaiveDateTime,
        until: NaiveDateTime,
    ) -> RepositoryResult<Vec<Appointment>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(&format!(
            r#"
            SELECT {APPOINTMENT_COLUMNS}
            FROM appointment
            WHERE doctor_id = ?1
              AND scheduled_at > ?2
              AND scheduled_at <= ?3
              AND status = 'SCHEDULED'
            ORDER BY scheduled_at ASC
            "#
        ))?;

        let rows = stmt
            .query_map(
                params![doctor_id, format_datetime(after), format_datetime(until)],
                map_appointment,
            )?
            .collect::<SqliteResult<Vec<Appointment>>>()?;
        Ok(rows)
    }

    /// 查询某患者从指定时刻起的后续预约
    pub fn find_upcoming_for_patient(
        &self,
        patient_id: &str,
        from: NaiveDateTime,
        limit: i64,
    ) -> RepositoryResult<Vec<Appointment>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(&format!(
            r#"
            SELECT {APPOINTMENT_COLUMNS}
            FROM appointment
            WHERE patient_id = ?1
              AND status = 'SCHEDULED'
              AND scheduled_at >= ?2
            ORDER BY scheduled_at ASC
            LIMIT ?3
            "#
        ))?;

        let rows = stmt
            .query_map(
                params![patient_id, format_datetime(from), limit],
                map_appointment,
            )?
            .collect::<SqliteResult<Vec<Appointment>>>()?;
        Ok(rows)
    }

    // ==========================================
    // 事务内变体（由变更网关在同一事务中调用）
    // ==========================================

    /// 插入一条预约（事务内）
    pub fn insert_in(conn: &Connection, a: &Appointment) -> RepositoryResult<()> {
        conn.execute(
            r#"
            INSERT INTO appointment (
                appointment_id, doctor_id, patient_id, scheduled_at, duration_min,
                status, is_emergency, delay_minutes,
                computed_start_time, computed_end_time, queue_position,
                created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)
            "#,
            params![
                a.appointment_id,
                a.doctor_id,
                a.patient_id,
                format_datetime(a.scheduled_at),
                a.duration_min,
                a.status.to_db_str(),
                a.is_emergency,
                a.delay_minutes,
                a.computed_start_time.map(format_datetime),
                a.computed_end_time.map(format_datetime),
                a.queue_position,
                format_datetime(a.created_at),
                format_datetime(a.updated_at),
            ],
        )?;
        Ok(())
    }

    /// 按ID查询预约（事务内）
    pub fn find_by_id_in(
        conn: &Connection,
        appointment_id: &str,
    ) -> RepositoryResult<Option<Appointment>> {
        let mut stmt = conn.prepare(&format!(
            "SELECT {APPOINTMENT_COLUMNS} FROM appointment WHERE appointment_id = ?1"
        ))?;

        let appointment = stmt
            .query_row(params![appointment_id], map_appointment)
            .optional()?;
        Ok(appointment)
    }

    /// 查询某医生当日的可排队预约（事务内）
    ///
    /// SCHEDULED 恒参与；IN_PROGRESS 由策略开关决定。
    /// SQL 排序仅作提示，最终顺序由 QueueBuilder 比较器裁定。
    pub fn find_actionable_in(
        conn: &Connection,
        doctor_id: &str,
        day_start: NaiveDateTime,
        day_end: NaiveDateTime,
        include_in_progress: bool,
    ) -> RepositoryResult<Vec<Appointment>> {
        let mut stmt = conn.prepare(&format!(
            r#"
            SELECT {APPOINTMENT_COLUMNS}
            FROM appointment
            WHERE doctor_id = ?1
              AND scheduled_at BETWEEN ?2 AND ?3
              AND (status = 'SCHEDULED' OR (status = 'IN_PROGRESS' AND ?4))
            ORDER BY is_emergency DESC, scheduled_at ASC
            "#
        ))?;

        let rows = stmt
            .query_map(
                params![
                    doctor_id,
                    format_datetime(day_start),
                    format_datetime(day_end),
                    include_in_progress
                ],
                map_appointment,
            )?
            .collect::<SqliteResult<Vec<Appointment>>>()?;
        Ok(rows)
    }

    /// 更新预约状态（事务内）
    pub fn update_status_in(
        conn: &Connection,
        appointment_id: &str,
        status: AppointmentStatus,
        now: NaiveDateTime,
    ) -> RepositoryResult<()> {
        let affected = conn.execute(
            "UPDATE appointment SET status = ?2, updated_at = ?3 WHERE appointment_id = ?1",
            params![appointment_id, status.to_db_str(), format_datetime(now)],
        )?;
        Self::expect_one_row(affected, appointment_id)
    }

    /// 更新预约延误分钟数（事务内）
    pub fn update_delay_in(
        conn: &Connection,
        appointment_id: &str,
        delay_minutes: i64,
        now: NaiveDateTime,
    ) -> RepositoryResult<()> {
        let affected = conn.execute(
            "UPDATE appointment SET delay_minutes = ?2, updated_at = ?3 WHERE appointment_id = ?1",
            params![appointment_id, delay_minutes, format_datetime(now)],
        )?;
        Self::expect_one_row(affected, appointment_id)
    }

    /// 更新预约时刻与状态（事务内，显式改期专用）
    pub fn update_schedule_in(
        conn: &Connection,
        appointment_id: &str,
        scheduled_at: NaiveDateTime,
        status: AppointmentStatus,
        now: NaiveDateTime,
    ) -> RepositoryResult<()> {
        let affected = conn.execute(
            r#"
            UPDATE appointment
            SET scheduled_at = ?2, status = ?3, updated_at = ?4
            WHERE appointment_id = ?1
            "#,
            params![
                appointment_id,
                format_datetime(scheduled_at),
                status.to_db_str(),
                format_datetime(now)
            ],
        )?;
        Self::expect_one_row(affected, appointment_id)
    }

    /// 回写派生字段（事务内，仅重算流程调用）
    pub fn update_computed_in(
        conn: &Connection,
        appointment_id: &str,
        computed_start: NaiveDateTime,
        computed_end: NaiveDateTime,
        queue_position: i32,
        now: NaiveDateTime,
    ) -> RepositoryResult<()> {
        let affected = conn.execute(
            r#"
            UPDATE appointment
            SET computed_start_time = ?2,
                computed_end_time = ?3,
                queue_position = ?4,
                updated_at = ?5
            WHERE appointment_id = ?1
            "#,
            params![
                appointment_id,
                format_datetime(computed_start),
                format_datetime(computed_end),
                queue_position,
                format_datetime(now)
            ],
        )?;
        Self::expect_one_row(affected, appointment_id)
    }

    fn expect_one_row(affected: usize, appointment_id: &str) -> RepositoryResult<()> {
        if affected == 0 {
            return Err(RepositoryError::NotFound {
                entity: "Appointment".to_string(),
                id: appointment_id.to_string(),
            });
        }
        Ok(())
    }
}
