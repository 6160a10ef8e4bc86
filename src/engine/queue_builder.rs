// ==========================================
// 诊所预约排队系统 - 队列构建器
// ==========================================
// 职责: 圈定某医生某自然日的可排队集合并给出最终顺序
// 红线: 顺序由应用层比较器裁定 (急诊优先, 其后按预约时刻升序),
//       不信任存储层 ORDER BY
// ==========================================

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use std::cmp::Ordering;

use crate::config::QueuePolicy;
use crate::domain::appointment::Appointment;
use crate::domain::types::AppointmentStatus;

// ==========================================
// QueueBuilder - 队列构建器
// ==========================================

/// 队列构建器
///
/// 只读组件: 过滤 + 排序, 无任何副作用。
pub struct QueueBuilder {
    policy: QueuePolicy,
}

impl QueueBuilder {
    pub fn new(policy: QueuePolicy) -> Self {
        Self { policy }
    }

    /// 自然日边界 [00:00:00, 23:59:59]（含两端）
    pub fn day_bounds(day: NaiveDate) -> (NaiveDateTime, NaiveDateTime) {
        let start = day.and_time(NaiveTime::MIN);
        let end = day.and_hms_opt(23, 59, 59).unwrap();
        (start, end)
    }

    /// 队列比较器: 急诊在前, 组内按预约时刻升序
    pub fn compare(a: &Appointment, b: &Appointment) -> Ordering {
        b.is_emergency
            .cmp(&a.is_emergency)
            .then_with(|| a.scheduled_at.cmp(&b.scheduled_at))
    }

    /// 状态是否参与排队
    ///
    /// SCHEDULED 恒参与; IN_PROGRESS 受策略开关控制; 终态一律不参与。
    pub fn is_actionable(&self, status: AppointmentStatus) -> bool {
        match status {
            AppointmentStatus::Scheduled => true,
            AppointmentStatus::InProgress => self.policy.include_in_progress,
            AppointmentStatus::Completed | AppointmentStatus::Cancelled => false,
        }
    }

    /// 对仓储返回的候选集做最终过滤与排序
    ///
    /// 过滤在此处重做一遍: SQL 谓词与内存判定必须得出同一集合,
    /// 以 is_actionable 为准。
    pub fn build(&self, mut candidates: Vec<Appointment>) -> Vec<Appointment> {
        candidates.retain(|a| self.is_actionable(a.status));
        candidates.sort_by(Self::compare);
        candidates
    }
}
