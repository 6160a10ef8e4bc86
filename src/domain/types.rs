// ==========================================
// 诊所预约排队系统 - 领域类型定义
// ==========================================
// 序列化格式: SCREAMING_SNAKE_CASE (与数据库一致)
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;

// ==========================================
// 预约状态 (Appointment Status)
// ==========================================
// 红线: 仅 SCHEDULED / IN_PROGRESS 参与排队（IN_PROGRESS 受策略开关控制）
// CANCELLED / COMPLETED 为终态，彻底退出队列与时间线
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AppointmentStatus {
    Scheduled,  // 已预约
    InProgress, // 就诊中
    Completed,  // 已完成
    Cancelled,  // 已取消
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppointmentStatus::Scheduled => write!(f, "SCHEDULED"),
            AppointmentStatus::InProgress => write!(f, "IN_PROGRESS"),
            AppointmentStatus::Completed => write!(f, "COMPLETED"),
            AppointmentStatus::Cancelled => write!(f, "CANCELLED"),
        }
    }
}

impl AppointmentStatus {
    /// 从字符串解析状态（未知值返回 None，由调用方决定如何拒绝）
    pub fn parse_str(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "SCHEDULED" => Some(AppointmentStatus::Scheduled),
            "IN_PROGRESS" => Some(AppointmentStatus::InProgress),
            "COMPLETED" => Some(AppointmentStatus::Completed),
            "CANCELLED" => Some(AppointmentStatus::Cancelled),
            _ => None,
        }
    }

    /// 转换为数据库存储的字符串
    pub fn to_db_str(&self) -> &'static str {
        match self {
            AppointmentStatus::Scheduled => "SCHEDULED",
            AppointmentStatus::InProgress => "IN_PROGRESS",
            AppointmentStatus::Completed => "COMPLETED",
            AppointmentStatus::Cancelled => "CANCELLED",
        }
    }

    /// 是否为终态（不再参与任何排队）
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            AppointmentStatus::Completed | AppointmentStatus::Cancelled
        )
    }
}

// ==========================================
// 改期动作 (Reschedule Action)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RescheduleAction {
    Tomorrow, // 顺延至次日同一时刻
    Cancel,   // 取消预约
}

impl fmt::Display for RescheduleAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RescheduleAction::Tomorrow => write!(f, "TOMORROW"),
            RescheduleAction::Cancel => write!(f, "CANCEL"),
        }
    }
}

impl RescheduleAction {
    /// 从字符串解析动作（未知值返回 None）
    pub fn parse_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "tomorrow" => Some(RescheduleAction::Tomorrow),
            "cancel" => Some(RescheduleAction::Cancel),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_roundtrip() {
        for s in [
            AppointmentStatus::Scheduled,
            AppointmentStatus::InProgress,
            AppointmentStatus::Completed,
            AppointmentStatus::Cancelled,
        ] {
            assert_eq!(AppointmentStatus::parse_str(s.to_db_str()), Some(s));
        }
        assert_eq!(AppointmentStatus::parse_str("NO_SHOW"), None);
    }

    #[test]
    fn test_terminal_states() {
        assert!(!AppointmentStatus::Scheduled.is_terminal());
        assert!(!AppointmentStatus::InProgress.is_terminal());
        assert!(AppointmentStatus::Completed.is_terminal());
        assert!(AppointmentStatus::Cancelled.is_terminal());
    }

    #[test]
    fn test_reschedule_action_parse() {
        assert_eq!(
            RescheduleAction::parse_str("tomorrow"),
            Some(RescheduleAction::Tomorrow)
        );
        assert_eq!(
            RescheduleAction::parse_str("CANCEL"),
            Some(RescheduleAction::Cancel)
        );
        assert_eq!(RescheduleAction::parse_str("postpone"), None);
    }
}
