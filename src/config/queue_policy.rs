// ==========================================
// 诊所预约排队系统 - 队列策略
// ==========================================
// 队列重算的可配置开关集合, 由 ConfigManager 从 config_kv 读取
// ==========================================

use serde::{Deserialize, Serialize};

use crate::domain::appointment::FALLBACK_DURATION_MIN;

/// 队列策略
///
/// - include_in_progress: IN_PROGRESS 预约是否参与排队。
///   观察到的两个重算入口在此不一致，统一收敛为本开关，
///   Queue Builder 与对外文案共用同一过滤结果。
/// - default_duration_min: duration 缺失/非法时的兜底时长
/// - emergency_duration_min: 急诊插队的固定时长
/// - day_lock_wait_ms: 获取 (医生,日期) 互斥锁的有界等待
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueuePolicy {
    pub include_in_progress: bool,
    pub default_duration_min: i64,
    pub emergency_duration_min: i64,
    pub day_lock_wait_ms: u64,
}

impl Default for QueuePolicy {
    fn default() -> Self {
        Self {
            include_in_progress: true,
            default_duration_min: FALLBACK_DURATION_MIN,
            emergency_duration_min: FALLBACK_DURATION_MIN,
            day_lock_wait_ms: 3_000,
        }
    }
}

// ===== config_kv 配置键 =====
pub const KEY_INCLUDE_IN_PROGRESS: &str = "queue/include_in_progress";
pub const KEY_DEFAULT_DURATION_MIN: &str = "queue/default_duration_min";
pub const KEY_EMERGENCY_DURATION_MIN: &str = "queue/emergency_duration_min";
pub const KEY_DAY_LOCK_WAIT_MS: &str = "queue/day_lock_wait_ms";
