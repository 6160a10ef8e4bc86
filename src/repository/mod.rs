// ==========================================
// 诊所预约排队系统 - 数据仓储层
// ==========================================
// 红线: Repository 不含业务逻辑
// 约束: 所有查询使用参数化,防止 SQL 注入
// ==========================================

pub mod action_log_repo;
pub mod appointment_repo;
pub mod error;

// 重导出核心仓储
pub use action_log_repo::ActionLogRepository;
pub use appointment_repo::{format_datetime, AppointmentRepository, DATETIME_FMT};
pub use error::{RepositoryError, RepositoryResult};
