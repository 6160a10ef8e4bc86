// ==========================================
// 诊所预约排队系统 - 预约领域模型
// ==========================================
// 红线: computedStartTime / computedEndTime / queuePosition 为派生字段,
//       仅由重算流程整体覆写, 不可独立修改
// ==========================================

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::types::AppointmentStatus;

/// 队列重算的兜底时长（分钟），duration 缺失/非法时生效
pub const FALLBACK_DURATION_MIN: i64 = 15;

// ==========================================
// Appointment - 预约
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Appointment {
    // ===== 主键与外部引用 =====
    pub appointment_id: String,          // 预约ID (uuid v4)
    pub doctor_id: String,               // 医生ID (外部引用,不归核心所有)
    pub patient_id: String,              // 患者ID (外部引用,不归核心所有)

    // ===== 预约信息 =====
    pub scheduled_at: NaiveDateTime,     // 患者原始预约时刻 (仅显式改期可变)
    pub duration_min: i64,               // 时长(分钟)
    pub status: AppointmentStatus,       // 状态
    pub is_emergency: bool,              // 急诊标记 (创建时确定,此后不变)
    pub delay_minutes: i64,              // 本预约自身的附加延误(分钟)

    // ===== 派生字段 (每次重算整体覆写) =====
    pub computed_start_time: Option<NaiveDateTime>, // 引擎推算开始时刻
    pub computed_end_time: Option<NaiveDateTime>,   // 引擎推算结束时刻
    pub queue_position: Option<i32>,                // 1-based 队列位置

    // ===== 审计 =====
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl Appointment {
    /// 常规挂号创建（派生字段为空，等待首次重算）
    pub fn new_booking(
        patient_id: &str,
        doctor_id: &str,
        scheduled_at: NaiveDateTime,
        duration_min: i64,
        now: NaiveDateTime,
    ) -> Self {
        Self {
            appointment_id: Uuid::new_v4().to_string(),
            doctor_id: doctor_id.to_string(),
            patient_id: patient_id.to_string(),
            scheduled_at,
            duration_min,
            status: AppointmentStatus::Scheduled,
            is_emergency: false,
            delay_minutes: 0,
            computed_start_time: None,
            computed_end_time: None,
            queue_position: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// 急诊插队创建
    ///
    /// scheduled_at 取插入时刻；患者身份不归核心所有，
    /// 这里生成 `EMG-` 前缀的合成引用，核心从不解引用它。
    pub fn new_emergency(doctor_id: &str, now: NaiveDateTime, duration_min: i64) -> Self {
        Self {
            appointment_id: Uuid::new_v4().to_string(),
            doctor_id: doctor_id.to_string(),
            patient_id: format!("EMG-{}", Uuid::new_v4()),
            scheduled_at: now,
            duration_min,
            status: AppointmentStatus::Scheduled,
            is_emergency: true,
            delay_minutes: 0,
            computed_start_time: None,
            computed_end_time: None,
            queue_position: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// 参与时间线计算的有效时长（非正值回退到默认时长）
    pub fn effective_duration(&self, default_min: i64) -> i64 {
        if self.duration_min > 0 {
            self.duration_min
        } else {
            default_min
        }
    }

    /// 参与时间线计算的有效延误（负值按 0 处理）
    pub fn effective_delay(&self) -> i64 {
        self.delay_minutes.max(0)
    }

    /// 是否已取消
    pub fn is_cancelled(&self) -> bool {
        self.status == AppointmentStatus::Cancelled
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn dt(h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 8, 6)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    }

    #[test]
    fn test_new_booking_defaults() {
        let a = Appointment::new_booking("p1", "d1", dt(9, 0), 20, dt(8, 0));
        assert_eq!(a.status, AppointmentStatus::Scheduled);
        assert!(!a.is_emergency);
        assert_eq!(a.delay_minutes, 0);
        assert!(a.computed_start_time.is_none());
        assert!(a.queue_position.is_none());
    }

    #[test]
    fn test_new_emergency() {
        let a = Appointment::new_emergency("d1", dt(10, 30), 15);
        assert!(a.is_emergency);
        assert_eq!(a.scheduled_at, dt(10, 30));
        assert_eq!(a.duration_min, 15);
        assert!(a.patient_id.starts_with("EMG-"));
    }

    #[test]
    fn test_effective_duration_fallback() {
        let mut a = Appointment::new_booking("p1", "d1", dt(9, 0), 0, dt(8, 0));
        assert_eq!(a.effective_duration(FALLBACK_DURATION_MIN), 15);
        a.duration_min = -5;
        assert_eq!(a.effective_duration(FALLBACK_DURATION_MIN), 15);
        a.duration_min = 30;
        assert_eq!(a.effective_duration(FALLBACK_DURATION_MIN), 30);
    }

    #[test]
    fn test_effective_delay_clamps_negative() {
        let mut a = Appointment::new_booking("p1", "d1", dt(9, 0), 20, dt(8, 0));
        a.delay_minutes = -10;
        assert_eq!(a.effective_delay(), 0);
        a.delay_minutes = 15;
        assert_eq!(a.effective_delay(), 15);
    }
}
