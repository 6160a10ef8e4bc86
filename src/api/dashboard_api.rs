// ==========================================
// 诊所预约排队系统 - 看板查询接口
// ==========================================
// 职责: 医生/患者视角的只读队列视图
// 约束: 只读, 不触发重算, 不记录审计
// ==========================================

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::instrument;

use crate::api::error::{ApiError, ApiResult};
use crate::api::validator;
use crate::domain::appointment::Appointment;
use crate::domain::types::AppointmentStatus;
use crate::engine::queue_builder::QueueBuilder;
use crate::engine::recalc::estimate_wait_minutes;
use crate::i18n;
use crate::repository::appointment_repo::AppointmentRepository;

// ==========================================
// 视图结构
// ==========================================

/// 医生看板中的单个队列条目
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DoctorQueueEntry {
    pub number: i32,
    pub appointment_id: String,
    pub patient_id: String,
    pub status: AppointmentStatus,
    pub is_emergency: bool,
    pub estimated_wait_minutes: i64,
}

/// 医生当日统计
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DoctorDayStats {
    pub total_today: usize,
    pub pending: usize,
}

/// 医生当日总览
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DoctorDayOverview {
    pub queue: Vec<DoctorQueueEntry>,
    pub upcoming: Vec<Appointment>,
    pub stats: DoctorDayStats,
}

/// 患者视角的预约视图
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatientAppointmentView {
    pub appointment: Appointment,
    pub estimated_wait_minutes: i64,
    pub delay_reason: String,
    pub human_readable_status: String,
}

// ==========================================
// DashboardApi - 看板查询接口
// ==========================================
pub struct DashboardApi {
    appointment_repo: Arc<AppointmentRepository>,
}

impl DashboardApi {
    pub fn new(appointment_repo: Arc<AppointmentRepository>) -> Self {
        Self { appointment_repo }
    }

    /// 医生当日总览
    ///
    /// 队列排序: 急诊优先, 其后按已落库的 queue_position,
    /// 双方缺位时回退到 scheduled_at。
    /// 等待时长以 computed_start_time 为准, 未重算过的预约回退到 scheduled_at。
    #[instrument(skip(self), fields(doctor_id = %doctor_id, day = %day))]
    pub fn doctor_day_overview(
        &self,
        doctor_id: &str,
        day: NaiveDate,
    ) -> ApiResult<DoctorDayOverview> {
        validator::validate_doctor_id(doctor_id)?;
        let now = crate::api::now_local();

        let (day_start, day_end) = QueueBuilder::day_bounds(day);
        let mut todays = self
            .appointment_repo
            .find_day_excluding_cancelled(doctor_id, day_start, day_end)
            .map_err(ApiError::from)?;

        todays.sort_by(|a, b| {
            b.is_emergency.cmp(&a.is_emergency).then_with(|| {
                match (a.queue_position, b.queue_position) {
                    (Some(x), Some(y)) => x.cmp(&y),
                    _ => a.scheduled_at.cmp(&b.scheduled_at),
                }
            })
        });

        let queue = todays
            .iter()
            .enumerate()
            .map(|(index, a)| DoctorQueueEntry {
                number: (index + 1) as i32,
                appointment_id: a.appointment_id.clone(),
                patient_id: a.patient_id.clone(),
                status: a.status,
                is_emergency: a.is_emergency,
                estimated_wait_minutes: estimate_wait_minutes(
                    a.computed_start_time.unwrap_or(a.scheduled_at),
                    now,
                ),
            })
            .collect();

        let upcoming = self
            .appointment_repo
            .find_upcoming_for_doctor(doctor_id, day_end, day_end + Duration::days(7))
            .map_err(ApiError::from)?;

        let stats = DoctorDayStats {
            total_today: todays.len(),
            pending: todays
                .iter()
                .filter(|a| a.status == AppointmentStatus::Scheduled)
                .count(),
        };

        Ok(DoctorDayOverview {
            queue,
            upcoming,
            stats,
        })
    }

    /// 患者视角的后续预约
    ///
    /// 文案口径: 此处的延误说明只看预约自身的 delay_minutes
    /// (患者关心"我的号是否被延误"), 与队列重算输出的
    /// "前方是否有延误" 口径不同。
    #[instrument(skip(self), fields(patient_id = %patient_id))]
    pub fn patient_upcoming(
        &self,
        patient_id: &str,
        take: i64,
    ) -> ApiResult<Vec<PatientAppointmentView>> {
        if patient_id.trim().is_empty() {
            return Err(ApiError::ValidationError("患者ID不能为空".to_string()));
        }
        let now = crate::api::now_local();

        let rows = self
            .appointment_repo
            .find_upcoming_for_patient(patient_id, now, take)
            .map_err(ApiError::from)?;

        let views = rows
            .into_iter()
            .map(|a| {
                let estimated_wait_minutes =
                    estimate_wait_minutes(a.computed_start_time.unwrap_or(a.scheduled_at), now);

                let delay_reason = if a.delay_minutes > 0 {
                    i18n::t("queue.own_delay")
                } else {
                    i18n::t("queue.on_schedule")
                };

                let position_text = a
                    .queue_position
                    .map(|p| p.to_string())
                    .unwrap_or_else(|| "-".to_string());
                let human_readable_status = i18n::t_with_args(
                    "queue.human_status",
                    &[
                        ("position", &position_text),
                        ("minutes", &estimated_wait_minutes.to_string()),
                    ],
                );

                PatientAppointmentView {
                    appointment: a,
                    estimated_wait_minutes,
                    delay_reason,
                    human_readable_status,
                }
            })
            .collect();

        Ok(views)
    }
}
