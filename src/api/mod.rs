// ==========================================
// 诊所预约排队系统 - API 层
// ==========================================
// 职责: 变更网关与只读查询接口
// 约束: 入口处完成请求校验, 校验失败不产生任何写入
// ==========================================

use chrono::{Local, NaiveDateTime, Timelike};

pub mod appointment_api;
pub mod dashboard_api;
pub mod error;
pub mod queue_api;
pub mod validator;

// 重导出核心接口
pub use appointment_api::{AppointmentApi, RescheduleOutcome};
pub use dashboard_api::{
    DashboardApi, DoctorDayOverview, DoctorDayStats, DoctorQueueEntry, PatientAppointmentView,
};
pub use error::{ApiError, ApiResult};
pub use queue_api::{QueueApi, QueueEntryView};
pub use validator::{BookingRequest, PendingChange, QueueChangeRequest};

/// 当前本地时刻, 截断到秒 (与存储精度一致, 保证回写值与返回值相等)
pub(crate) fn now_local() -> NaiveDateTime {
    let now = Local::now().naive_local();
    now.with_nanosecond(0).unwrap_or(now)
}
