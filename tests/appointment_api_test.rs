// ==========================================
// 预约管理 API 测试
// ==========================================
// 测试目标: 挂号校验、改期/取消及两个受影响日期的联动重算
// ==========================================


use chrono::Duration;
use clinic_queue::api::{ApiError, BookingRequest};
use clinic_queue::domain::{AppointmentStatus, RescheduleAction};
use clinic_queue::logging;
use test_helpers::*;

#[test]
fn test_booking_validation() {
    logging::init_test();
    let (_db, state) = create_test_state();

    // 患者ID为空
    let err = state
        .appointment_api
        .book(BookingRequest {
            patient_id: " ".to_string(),
            doctor_id: "doc-1".to_string(),
            scheduled_at: "2026-08-06 09:00:00".to_string(),
            duration_min: 20,
        })
        .expect_err("应该被拒绝");
    assert!(matches!(err, ApiError::ValidationError(_)));

    // 日期格式非法
    let err = state
        .appointment_api
        .book(BookingRequest {
            patient_id: "p1".to_string(),
            doctor_id: "doc-1".to_string(),
            scheduled_at: "someday".to_string(),
            duration_min: 20,
        })
        .expect_err("应该被拒绝");
    assert!(matches!(err, ApiError::ValidationError(_)));

    // 时长非正
    let err = state
        .appointment_api
        .book(BookingRequest {
            patient_id: "p1".to_string(),
            doctor_id: "doc-1".to_string(),
            scheduled_at: "2026-08-06 09:00:00".to_string(),
            duration_min: 0,
        })
        .expect_err("应该被拒绝");
    assert!(matches!(err, ApiError::ValidationError(_)));
}

#[test]
fn test_booking_creates_scheduled_appointment() {
    logging::init_test();
    let (_db, state) = create_test_state();

    let a = book(&state, "p1", "doc-1", fixed_dt(9, 0), 20);
    assert_eq!(a.status, AppointmentStatus::Scheduled);
    assert_eq!(a.scheduled_at, fixed_dt(9, 0));
    assert!(!a.is_emergency);
    assert!(a.computed_start_time.is_none());
}

#[test]
fn test_cancel_removes_from_queue_and_closes_gap() {
    logging::init_test();
    let (_db, state) = create_test_state();

    let a = book(&state, "p1", "doc-1", fixed_dt(9, 0), 20);
    let b = book(&state, "p2", "doc-1", fixed_dt(9, 10), 20);
    let c = book(&state, "p3", "doc-1", fixed_dt(9, 30), 20);

    let outcome = state
        .appointment_api
        .reschedule(&b.appointment_id, RescheduleAction::Cancel)
        .expect("取消应该成功");

    assert_eq!(outcome.appointment.status, AppointmentStatus::Cancelled);
    assert!(outcome.new_day_queue.is_none());

    // 原日期队列已收口: 只剩 A、C, 位置连续, C 紧贴 A
    let queue = &outcome.original_day_queue;
    assert_eq!(queue.len(), 2);
    assert_eq!(queue[0].appointment_id, a.appointment_id);
    assert_eq!(queue[0].queue_position, 1);
    assert_eq!(queue[1].appointment_id, c.appointment_id);
    assert_eq!(queue[1].queue_position, 2);
    assert_eq!(queue[1].computed_start_time, fixed_dt(9, 20));
}

#[test]
fn test_reschedule_tomorrow_recalculates_both_days() {
    logging::init_test();
    let (_db, state) = create_test_state();

    let a = book(&state, "p1", "doc-1", fixed_dt(9, 0), 20);
    let b = book(&state, "p2", "doc-1", fixed_dt(9, 10), 20);

    let outcome = state
        .appointment_api
        .reschedule(&b.appointment_id, RescheduleAction::Tomorrow)
        .expect("改期应该成功");

    // 顺延至次日同一时刻
    assert_eq!(
        outcome.appointment.scheduled_at,
        fixed_dt(9, 10) + Duration::days(1)
    );
    assert_eq!(outcome.appointment.status, AppointmentStatus::Scheduled);

    // 原日期只剩 A
    assert_eq!(outcome.original_day_queue.len(), 1);
    assert_eq!(
        outcome.original_day_queue[0].appointment_id,
        a.appointment_id
    );

    // 新日期包含被挪来的 B, 位置从 1 起
    let new_day_queue = outcome.new_day_queue.expect("应有新日期队列");
    assert_eq!(new_day_queue.len(), 1);
    assert_eq!(new_day_queue[0].appointment_id, b.appointment_id);
    assert_eq!(new_day_queue[0].queue_position, 1);
    assert_eq!(
        new_day_queue[0].computed_start_time,
        fixed_dt(9, 10) + Duration::days(1)
    );
}

#[test]
fn test_reschedule_missing_appointment_is_not_found() {
    logging::init_test();
    let (_db, state) = create_test_state();

    let err = state
        .appointment_api
        .reschedule("missing-id", RescheduleAction::Cancel)
        .expect_err("应该未找到");
    assert!(matches!(err, ApiError::NotFound(_)));
}
