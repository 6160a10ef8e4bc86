// ==========================================
// 诊所预约排队系统 - 引擎层
// ==========================================
// 职责: 实现队列业务规则, 不拼 SQL
// 红线: 队列状态每次整体重推, 引擎是有序快照上的纯函数
// ==========================================

pub mod day_lock;
pub mod queue_builder;
pub mod recalc;

// 重导出核心引擎
pub use day_lock::{DayLockGuard, DayLockRegistry};
pub use queue_builder::QueueBuilder;
pub use recalc::{QueueSlot, RecalcEngine};
