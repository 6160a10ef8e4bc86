// ==========================================
// 诊所预约排队系统 - 操作日志领域模型
// ==========================================
// 红线: 所有经由变更网关的写入必须记录
// 用途: 审计追踪；只读的队列查询不记录
// ==========================================

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::fmt;
use uuid::Uuid;

// ==========================================
// ActionType - 操作类型
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActionType {
    Book,            // 挂号
    Reschedule,      // 改期
    Cancel,          // 取消
    StatusChange,    // 状态变更
    DelayUpdate,     // 延误更新
    EmergencyInsert, // 急诊插队
    Recalc,          // 队列重算
}

impl fmt::Display for ActionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActionType::Book => write!(f, "BOOK"),
            ActionType::Reschedule => write!(f, "RESCHEDULE"),
            ActionType::Cancel => write!(f, "CANCEL"),
            ActionType::StatusChange => write!(f, "STATUS_CHANGE"),
            ActionType::DelayUpdate => write!(f, "DELAY_UPDATE"),
            ActionType::EmergencyInsert => write!(f, "EMERGENCY_INSERT"),
            ActionType::Recalc => write!(f, "RECALC"),
        }
    }
}

impl ActionType {
    /// 从字符串解析操作类型（未知值返回 None）
    pub fn parse_str(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "BOOK" => Some(ActionType::Book),
            "RESCHEDULE" => Some(ActionType::Reschedule),
            "CANCEL" => Some(ActionType::Cancel),
            "STATUS_CHANGE" => Some(ActionType::StatusChange),
            "DELAY_UPDATE" => Some(ActionType::DelayUpdate),
            "EMERGENCY_INSERT" => Some(ActionType::EmergencyInsert),
            "RECALC" => Some(ActionType::Recalc),
            _ => None,
        }
    }

    /// 转换为数据库存储的字符串
    pub fn to_db_str(&self) -> &'static str {
        match self {
            ActionType::Book => "BOOK",
            ActionType::Reschedule => "RESCHEDULE",
            ActionType::Cancel => "CANCEL",
            ActionType::StatusChange => "STATUS_CHANGE",
            ActionType::DelayUpdate => "DELAY_UPDATE",
            ActionType::EmergencyInsert => "EMERGENCY_INSERT",
            ActionType::Recalc => "RECALC",
        }
    }
}

// ==========================================
// ActionLog - 操作日志
// ==========================================
// 对齐: action_log 表
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionLog {
    pub action_id: String,               // 日志ID
    pub action_type: ActionType,         // 操作类型
    pub doctor_id: Option<String>,       // 关联医生 (队列域)
    pub appointment_id: Option<String>,  // 关联预约 (可选)
    pub payload_json: Option<JsonValue>, // 操作参数 (JSON)
    pub action_ts: NaiveDateTime,        // 操作时间戳
}

impl ActionLog {
    pub fn new(
        action_type: ActionType,
        doctor_id: Option<&str>,
        appointment_id: Option<&str>,
        payload_json: Option<JsonValue>,
        action_ts: NaiveDateTime,
    ) -> Self {
        Self {
            action_id: Uuid::new_v4().to_string(),
            action_type,
            doctor_id: doctor_id.map(str::to_string),
            appointment_id: appointment_id.map(str::to_string),
            payload_json,
            action_ts,
        }
    }
}
