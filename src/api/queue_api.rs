// ==========================================
// 诊所预约排队系统 - 变更网关 (Mutation Gateway)
// ==========================================
// 职责: "应用至多一个待定变更 → 读取当日可排队集合 → 整体重算 →
//       回写派生字段" 作为一个原子工作单元执行
// 红线: 同一 (doctorId, day) 的重算串行化; 部分写入不可被并发读者观察到
// ==========================================

use chrono::{NaiveDate, NaiveDateTime};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tracing::instrument;

use crate::api::error::{ApiError, ApiResult};
use crate::api::validator::{self, PendingChange, QueueChangeRequest};
use crate::config::ConfigManager;
use crate::domain::action_log::{ActionLog, ActionType};
use crate::domain::appointment::Appointment;
use crate::domain::types::AppointmentStatus;
use crate::engine::day_lock::DayLockRegistry;
use crate::engine::queue_builder::QueueBuilder;
use crate::engine::recalc::{QueueSlot, RecalcEngine};
use crate::repository::action_log_repo::ActionLogRepository;
use crate::repository::appointment_repo::AppointmentRepository;

// ==========================================
// QueueEntryView - 对外的队列条目
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueEntryView {
    pub appointment_id: String,
    pub doctor_id: String,
    pub patient_id: String,
    pub status: AppointmentStatus,
    pub is_emergency: bool,
    pub scheduled_at: NaiveDateTime,
    pub computed_start_time: NaiveDateTime,
    pub computed_end_time: NaiveDateTime,
    pub queue_position: i32,
    pub estimated_wait_minutes: i64,
    pub total_delay_before: i64,
    pub delay_reason: String,
    pub human_readable_status: String,
}

impl From<QueueSlot> for QueueEntryView {
    fn from(slot: QueueSlot) -> Self {
        Self {
            appointment_id: slot.appointment.appointment_id,
            doctor_id: slot.appointment.doctor_id,
            patient_id: slot.appointment.patient_id,
            status: slot.appointment.status,
            is_emergency: slot.appointment.is_emergency,
            scheduled_at: slot.appointment.scheduled_at,
            computed_start_time: slot.computed_start_time,
            computed_end_time: slot.computed_end_time,
            queue_position: slot.queue_position,
            estimated_wait_minutes: slot.estimated_wait_minutes,
            total_delay_before: slot.total_delay_before,
            delay_reason: slot.delay_reason,
            human_readable_status: slot.human_readable_status,
        }
    }
}

// ==========================================
// QueueApi - 变更网关
// ==========================================

/// 变更网关
///
/// 两个对外操作:
/// - recalculate: 应用至多一个待定变更后整体重算
/// - insert_emergency: 以当前时刻创建急诊预约后整体重算
pub struct QueueApi {
    conn: Arc<Mutex<Connection>>,
    config_manager: Arc<ConfigManager>,
    day_locks: Arc<DayLockRegistry>,
}

impl QueueApi {
    pub fn new(
        conn: Arc<Mutex<Connection>>,
        config_manager: Arc<ConfigManager>,
        day_locks: Arc<DayLockRegistry>,
    ) -> Self {
        Self {
            conn,
            config_manager,
            day_locks,
        }
    }

    fn get_conn(&self) -> ApiResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| ApiError::DatabaseConnectionError(format!("数据库锁获取失败: {}", e)))
    }

    /// 队列重算
    ///
    /// # 参数
    /// - doctor_id: 医生ID
    /// - day: 自然日
    /// - change: 至多一个待定变更 (状态与延误允许部分更新)
    ///
    /// # 返回
    /// - Ok(Vec<QueueEntryView>): 重算后的完整队列 (按位置升序)
    /// - Err(ApiError): 校验/未找到在任何写入前拒绝; 锁超时可重试;
    ///   通道内故障整体回滚
    #[instrument(skip(self, change), fields(doctor_id = %doctor_id, day = %day))]
    pub fn recalculate(
        &self,
        doctor_id: &str,
        day: NaiveDate,
        change: Option<QueueChangeRequest>,
    ) -> ApiResult<Vec<QueueEntryView>> {
        validator::validate_doctor_id(doctor_id)?;
        let pending = change.map(validator::validate_queue_change).transpose()?;

        let policy = self
            .config_manager
            .queue_policy()
            .map_err(|e| ApiError::DatabaseError(e.to_string()))?;

        let _day_guard = self
            .day_locks
            .acquire(
                doctor_id,
                day,
                Duration::from_millis(policy.day_lock_wait_ms),
            )
            .ok_or_else(|| {
                ApiError::ConcurrencyConflict(format!(
                    "获取医生{}在{}的队列独占权超时",
                    doctor_id, day
                ))
            })?;

        let now = crate::api::now_local();
        self.run_pass(doctor_id, day, pending, None, &policy, now)
    }

    /// 急诊插队
    ///
    /// 以当前时刻为 scheduled_at 创建 is_emergency 预约
    /// (固定时长, 合成患者引用), 随后执行与 recalculate 相同的重算。
    #[instrument(skip(self), fields(doctor_id = %doctor_id, day = %day))]
    pub fn insert_emergency(
        &self,
        doctor_id: &str,
        day: NaiveDate,
    ) -> ApiResult<Vec<QueueEntryView>> {
        validator::validate_doctor_id(doctor_id)?;

        let policy = self
            .config_manager
            .queue_policy()
            .map_err(|e| ApiError::DatabaseError(e.to_string()))?;

        let _day_guard = self
            .day_locks
            .acquire(
                doctor_id,
                day,
                Duration::from_millis(policy.day_lock_wait_ms),
            )
            .ok_or_else(|| {
                ApiError::ConcurrencyConflict(format!(
                    "获取医生{}在{}的队列独占权超时",
                    doctor_id, day
                ))
            })?;

        let now = crate::api::now_local();
        let emergency = Appointment::new_emergency(doctor_id, now, policy.emergency_duration_min);
        self.run_pass(doctor_id, day, None, Some(emergency), &policy, now)
    }

    /// 原子通道: 变更/插入 → 读取 → 排序 → 重算 → 回写 → 审计 → 提交
    ///
    /// 任何 `?` 早退都会丢弃未提交事务并整体回滚。
    fn run_pass(
        &self,
        doctor_id: &str,
        day: NaiveDate,
        pending: Option<PendingChange>,
        insert: Option<Appointment>,
        policy: &crate::config::QueuePolicy,
        now: NaiveDateTime,
    ) -> ApiResult<Vec<QueueEntryView>> {
        let conn = self.get_conn()?;
        let tx = conn
            .unchecked_transaction()
            .map_err(|e| ApiError::DatabaseError(e.to_string()))?;

        // 1. 应用至多一个待定变更 (目标缺失 → 未找到, 任何写入前中止)
        if let Some(change) = &pending {
            Self::apply_pending_change(&tx, change, now)?;
        }

        // 1'. 急诊插入
        if let Some(appointment) = &insert {
            AppointmentRepository::insert_in(&tx, appointment)?;
        }

        // 2. 读取当日可排队集合
        let (day_start, day_end) = QueueBuilder::day_bounds(day);
        let candidates = AppointmentRepository::find_actionable_in(
            &tx,
            doctor_id,
            day_start,
            day_end,
            policy.include_in_progress,
        )?;

        // 3. 排序 + 整体重算 (有序快照上的纯函数)
        let ordered = QueueBuilder::new(policy.clone()).build(candidates);
        let slots = RecalcEngine::new(policy.clone()).recalc(&ordered, now);

        // 4. 回写派生字段: 自此任何失败都属通道内故障, 整体回滚
        for slot in &slots {
            AppointmentRepository::update_computed_in(
                &tx,
                &slot.appointment.appointment_id,
                slot.computed_start_time,
                slot.computed_end_time,
                slot.queue_position,
                now,
            )
            .map_err(|e| ApiError::IntegrityFailure(e.to_string()))?;
        }

        // 5. 审计
        let (action_type, appointment_ref, payload) = match (&insert, &pending) {
            (Some(appointment), _) => (
                ActionType::EmergencyInsert,
                Some(appointment.appointment_id.clone()),
                json!({ "queue_len": slots.len() }),
            ),
            (None, Some(change)) => (
                ActionType::Recalc,
                Some(change.appointment_id.clone()),
                json!({
                    "queue_len": slots.len(),
                    "new_status": change.new_status.map(|s| s.to_db_str()),
                    "delay_minutes": change.delay_minutes,
                }),
            ),
            (None, None) => (ActionType::Recalc, None, json!({ "queue_len": slots.len() })),
        };
        let log = ActionLog::new(
            action_type,
            Some(doctor_id),
            appointment_ref.as_deref(),
            Some(payload),
            now,
        );
        ActionLogRepository::insert_in(&tx, &log)
            .map_err(|e| ApiError::IntegrityFailure(e.to_string()))?;

        tx.commit()
            .map_err(|e| ApiError::IntegrityFailure(e.to_string()))?;

        tracing::info!(
            doctor_id = %doctor_id,
            day = %day,
            queue_len = slots.len(),
            "队列重算完成"
        );

        Ok(slots.into_iter().map(QueueEntryView::from).collect())
    }

    /// 应用待定变更 (部分更新: 缺省字段不触碰)
    fn apply_pending_change(
        conn: &Connection,
        change: &PendingChange,
        now: NaiveDateTime,
    ) -> ApiResult<()> {
        let existing = AppointmentRepository::find_by_id_in(conn, &change.appointment_id)?;
        if existing.is_none() {
            return Err(ApiError::NotFound(format!(
                "预约{}不存在",
                change.appointment_id
            )));
        }

        if let Some(status) = change.new_status {
            AppointmentRepository::update_status_in(conn, &change.appointment_id, status, now)?;
        }
        if let Some(delay) = change.delay_minutes {
            AppointmentRepository::update_delay_in(conn, &change.appointment_id, delay, now)?;
        }
        Ok(())
    }
}
