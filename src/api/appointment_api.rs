// ==========================================
// 诊所预约排队系统 - 预约管理接口
// ==========================================
// 职责: 挂号 / 改期 / 取消
// 约束: 改期与取消完成后, 原日期必须重算以收口缺口;
//       移动到新日期时, 新日期一并重算
// ==========================================

use chrono::Duration;
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::instrument;

use crate::api::error::{ApiError, ApiResult};
use crate::api::queue_api::{QueueApi, QueueEntryView};
use crate::api::validator::{self, BookingRequest};
use crate::domain::action_log::{ActionLog, ActionType};
use crate::domain::appointment::Appointment;
use crate::domain::types::{AppointmentStatus, RescheduleAction};
use crate::repository::action_log_repo::ActionLogRepository;
use crate::repository::appointment_repo::AppointmentRepository;

// ==========================================
// RescheduleOutcome - 改期结果
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RescheduleOutcome {
    pub appointment: Appointment,
    /// 原日期重算后的队列 (收口缺口)
    pub original_day_queue: Vec<QueueEntryView>,
    /// 移动到新日期时, 新日期重算后的队列
    pub new_day_queue: Option<Vec<QueueEntryView>>,
}

// ==========================================
// AppointmentApi - 预约管理接口
// ==========================================
pub struct AppointmentApi {
    conn: Arc<Mutex<Connection>>,
    queue_api: Arc<QueueApi>,
}

impl AppointmentApi {
    pub fn new(conn: Arc<Mutex<Connection>>, queue_api: Arc<QueueApi>) -> Self {
        Self { conn, queue_api }
    }

    fn get_conn(&self) -> ApiResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| ApiError::DatabaseConnectionError(format!("数据库锁获取失败: {}", e)))
    }

    /// 挂号
    ///
    /// 创建 SCHEDULED 预约, 派生字段为空。队列按需重推,
    /// 挂号本身不触发重算。
    #[instrument(skip(self, request))]
    pub fn book(&self, request: BookingRequest) -> ApiResult<Appointment> {
        let validated = validator::validate_booking(request)?;
        let now = crate::api::now_local();

        let appointment = Appointment::new_booking(
            &validated.patient_id,
            &validated.doctor_id,
            validated.scheduled_at,
            validated.duration_min,
            now,
        );

        let conn = self.get_conn()?;
        let tx = conn
            .unchecked_transaction()
            .map_err(|e| ApiError::DatabaseError(e.to_string()))?;

        AppointmentRepository::insert_in(&tx, &appointment)?;

        let log = ActionLog::new(
            ActionType::Book,
            Some(&appointment.doctor_id),
            Some(&appointment.appointment_id),
            Some(json!({
                "patient_id": appointment.patient_id,
                "scheduled_at": appointment.scheduled_at.to_string(),
                "duration_min": appointment.duration_min,
            })),
            now,
        );
        ActionLogRepository::insert_in(&tx, &log)?;

        tx.commit()
            .map_err(|e| ApiError::IntegrityFailure(e.to_string()))?;

        tracing::info!(
            appointment_id = %appointment.appointment_id,
            doctor_id = %appointment.doctor_id,
            "挂号完成"
        );
        Ok(appointment)
    }

    /// 改期 / 取消
    ///
    /// - Tomorrow: 顺延至次日同一时刻, 状态回到 SCHEDULED
    /// - Cancel: 状态置为 CANCELLED, 退出队列
    ///
    /// 变更提交后, 原日期重算收口缺口; 移动时新日期一并重算。
    /// 两次重算各自是独立的原子单元。
    #[instrument(skip(self), fields(appointment_id = %appointment_id, action = %action))]
    pub fn reschedule(
        &self,
        appointment_id: &str,
        action: RescheduleAction,
    ) -> ApiResult<RescheduleOutcome> {
        validator::validate_appointment_id(appointment_id)?;
        let now = crate::api::now_local();

        // 第一步: 单事务内完成改期/取消
        // 连接守卫必须在触发重算前释放, 后续重算会再次取锁
        let (before, after) = {
            let conn = self.get_conn()?;
            let tx = conn
                .unchecked_transaction()
                .map_err(|e| ApiError::DatabaseError(e.to_string()))?;

            let before = AppointmentRepository::find_by_id_in(&tx, appointment_id)?
                .ok_or_else(|| ApiError::NotFound(format!("预约{}不存在", appointment_id)))?;

            let mut after = before.clone();
            let action_type = match action {
                RescheduleAction::Tomorrow => {
                    after.scheduled_at = before.scheduled_at + Duration::days(1);
                    after.status = AppointmentStatus::Scheduled;
                    AppointmentRepository::update_schedule_in(
                        &tx,
                        appointment_id,
                        after.scheduled_at,
                        after.status,
                        now,
                    )?;
                    ActionType::Reschedule
                }
                RescheduleAction::Cancel => {
                    after.status = AppointmentStatus::Cancelled;
                    AppointmentRepository::update_status_in(
                        &tx,
                        appointment_id,
                        after.status,
                        now,
                    )?;
                    ActionType::Cancel
                }
            };
            after.updated_at = now;

            let log = ActionLog::new(
                action_type,
                Some(&before.doctor_id),
                Some(appointment_id),
                Some(json!({
                    "from_scheduled_at": before.scheduled_at.to_string(),
                    "to_scheduled_at": after.scheduled_at.to_string(),
                    "to_status": after.status.to_db_str(),
                })),
                now,
            );
            ActionLogRepository::insert_in(&tx, &log)?;

            tx.commit()
                .map_err(|e| ApiError::IntegrityFailure(e.to_string()))?;
            (before, after)
        };

        // 第二步: 原日期重算, 收口被挪走/取消的时段
        let original_day = before.scheduled_at.date();
        let original_day_queue =
            self.queue_api
                .recalculate(&before.doctor_id, original_day, None)?;

        // 移动到新日期时, 新日期一并重算
        let new_day_queue = match action {
            RescheduleAction::Tomorrow => Some(self.queue_api.recalculate(
                &before.doctor_id,
                after.scheduled_at.date(),
                None,
            )?),
            RescheduleAction::Cancel => None,
        };

        tracing::info!(
            appointment_id = %appointment_id,
            action = %action,
            "改期/取消完成, 受影响日期已重算"
        );

        Ok(RescheduleOutcome {
            appointment: after,
            original_day_queue,
            new_day_queue,
        })
    }
}
