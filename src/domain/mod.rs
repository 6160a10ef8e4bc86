// ==========================================
// 诊所预约排队系统 - 领域层
// ==========================================
// 职责: 实体与类型定义, 不含数据访问
// ==========================================

pub mod action_log;
pub mod appointment;
pub mod types;

// 重导出核心实体
pub use action_log::{ActionLog, ActionType};
pub use appointment::{Appointment, FALLBACK_DURATION_MIN};
pub use types::{AppointmentStatus, RescheduleAction};
