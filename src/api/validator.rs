// ==========================================
// 诊所预约排队系统 - 请求校验器
// ==========================================
// 职责: 变更网关入口处的请求校验
// 红线: 校验失败必须发生在任何写入之前
// ==========================================

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::api::error::{ApiError, ApiResult};
use crate::domain::types::AppointmentStatus;
use crate::repository::appointment_repo::DATETIME_FMT;

// ==========================================
// 请求结构 (来自外部路由, 字段保持宽类型)
// ==========================================

/// 队列重算时携带的"至多一个"待定变更
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueChangeRequest {
    pub appointment_id: String,
    pub new_status: Option<String>,
    pub delay_minutes: Option<i64>,
}

/// 挂号请求
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookingRequest {
    pub patient_id: String,
    pub doctor_id: String,
    pub scheduled_at: String,
    pub duration_min: i64,
}

// ==========================================
// 校验后的强类型结构
// ==========================================

/// 校验通过的待定变更
#[derive(Debug, Clone)]
pub struct PendingChange {
    pub appointment_id: String,
    pub new_status: Option<AppointmentStatus>,
    pub delay_minutes: Option<i64>,
}

/// 校验通过的挂号参数
#[derive(Debug, Clone)]
pub struct ValidatedBooking {
    pub patient_id: String,
    pub doctor_id: String,
    pub scheduled_at: NaiveDateTime,
    pub duration_min: i64,
}

// ==========================================
// 校验函数
// ==========================================

/// 医生ID非空
pub fn validate_doctor_id(doctor_id: &str) -> ApiResult<()> {
    if doctor_id.trim().is_empty() {
        return Err(ApiError::ValidationError("医生ID不能为空".to_string()));
    }
    Ok(())
}

/// 预约ID非空
pub fn validate_appointment_id(appointment_id: &str) -> ApiResult<()> {
    if appointment_id.trim().is_empty() {
        return Err(ApiError::ValidationError("预约ID不能为空".to_string()));
    }
    Ok(())
}

/// 校验待定变更
///
/// - 状态字符串必须是受支持的枚举值
/// - 延误分钟数不允许为负
/// - 两个字段均可缺省 (缺省字段不触碰), 仅校验目标预约存在性的变更也合法
pub fn validate_queue_change(request: QueueChangeRequest) -> ApiResult<PendingChange> {
    validate_appointment_id(&request.appointment_id)?;

    let new_status = request
        .new_status
        .as_deref()
        .map(|raw| {
            AppointmentStatus::parse_str(raw)
                .ok_or_else(|| ApiError::ValidationError(format!("不支持的预约状态: {}", raw)))
        })
        .transpose()?;

    if let Some(delay) = request.delay_minutes {
        if delay < 0 {
            return Err(ApiError::ValidationError(format!(
                "延误分钟数不能为负: {}",
                delay
            )));
        }
    }

    Ok(PendingChange {
        appointment_id: request.appointment_id,
        new_status,
        delay_minutes: request.delay_minutes,
    })
}

/// 校验挂号请求
pub fn validate_booking(request: BookingRequest) -> ApiResult<ValidatedBooking> {
    if request.patient_id.trim().is_empty() {
        return Err(ApiError::ValidationError("患者ID不能为空".to_string()));
    }
    validate_doctor_id(&request.doctor_id)?;

    let scheduled_at = parse_request_datetime(&request.scheduled_at).ok_or_else(|| {
        ApiError::ValidationError(format!("预约时刻格式非法: {}", request.scheduled_at))
    })?;

    if request.duration_min <= 0 {
        return Err(ApiError::ValidationError(format!(
            "时长必须为正整数分钟: {}",
            request.duration_min
        )));
    }

    Ok(ValidatedBooking {
        patient_id: request.patient_id,
        doctor_id: request.doctor_id,
        scheduled_at,
        duration_min: request.duration_min,
    })
}

/// 解析请求中的日期时间 (接受空格或 T 分隔)
fn parse_request_datetime(raw: &str) -> Option<NaiveDateTime> {
    let trimmed = raw.trim();
    NaiveDateTime::parse_from_str(trimmed, DATETIME_FMT)
        .or_else(|_| NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%dT%H:%M:%S"))
        .ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn change(status: Option<&str>, delay: Option<i64>) -> QueueChangeRequest {
        QueueChangeRequest {
            appointment_id: "a1".to_string(),
            new_status: status.map(str::to_string),
            delay_minutes: delay,
        }
    }

    #[test]
    fn test_valid_change_parses_status() {
        let pending = validate_queue_change(change(Some("CANCELLED"), Some(10))).expect("valid");
        assert_eq!(pending.new_status, Some(AppointmentStatus::Cancelled));
        assert_eq!(pending.delay_minutes, Some(10));
    }

    #[test]
    fn test_unknown_status_rejected() {
        let err = validate_queue_change(change(Some("NO_SHOW"), None)).expect_err("reject");
        assert!(matches!(err, ApiError::ValidationError(_)));
    }

    #[test]
    fn test_negative_delay_rejected() {
        let err = validate_queue_change(change(None, Some(-5))).expect_err("reject");
        assert!(matches!(err, ApiError::ValidationError(_)));
    }

    #[test]
    fn test_empty_change_is_allowed() {
        let pending = validate_queue_change(change(None, None)).expect("valid");
        assert!(pending.new_status.is_none());
        assert!(pending.delay_minutes.is_none());
    }

    #[test]
    fn test_empty_appointment_id_rejected() {
        let mut request = change(None, Some(5));
        request.appointment_id = "  ".to_string();
        assert!(validate_queue_change(request).is_err());
    }

    #[test]
    fn test_booking_validation() {
        let valid = validate_booking(BookingRequest {
            patient_id: "p1".to_string(),
            doctor_id: "d1".to_string(),
            scheduled_at: "2026-08-06 09:00:00".to_string(),
            duration_min: 20,
        })
        .expect("valid");
        assert_eq!(valid.duration_min, 20);

        // T 分隔同样接受
        assert!(validate_booking(BookingRequest {
            patient_id: "p1".to_string(),
            doctor_id: "d1".to_string(),
            scheduled_at: "2026-08-06T09:00:00".to_string(),
            duration_min: 20,
        })
        .is_ok());

        // 非法日期
        assert!(validate_booking(BookingRequest {
            patient_id: "p1".to_string(),
            doctor_id: "d1".to_string(),
            scheduled_at: "someday".to_string(),
            duration_min: 20,
        })
        .is_err());

        // 非正时长
        assert!(validate_booking(BookingRequest {
            patient_id: "p1".to_string(),
            doctor_id: "d1".to_string(),
            scheduled_at: "2026-08-06 09:00:00".to_string(),
            duration_min: 0,
        })
        .is_err());
    }
}
