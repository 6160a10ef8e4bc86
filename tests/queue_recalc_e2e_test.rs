// ==========================================
// 队列重算 E2E 测试
// ==========================================
// 测试目标: 变更网关 + 队列构建 + 重算引擎的完整通路
// ==========================================


use clinic_queue::api::{ApiError, QueueChangeRequest};
use clinic_queue::domain::AppointmentStatus;
use clinic_queue::{i18n, logging};
use test_helpers::*;

fn change(id: &str, status: Option<&str>, delay: Option<i64>) -> QueueChangeRequest {
    QueueChangeRequest {
        appointment_id: id.to_string(),
        new_status: status.map(str::to_string),
        delay_minutes: delay,
    }
}

#[test]
fn test_dense_ripple_with_delay() {
    logging::init_test();
    i18n::set_locale("en");
    let (_db, state) = create_test_state();

    // A(09:00,20) B(09:10,20) C(09:30,20)
    let a = book(&state, "p1", "doc-1", fixed_dt(9, 0), 20);
    let b = book(&state, "p2", "doc-1", fixed_dt(9, 10), 20);
    let c = book(&state, "p3", "doc-1", fixed_dt(9, 30), 20);

    // C 延误 15 分钟后整体重算
    let queue = state
        .queue_api
        .recalculate("doc-1", fixed_day(), Some(change(&c.appointment_id, None, Some(15))))
        .expect("重算应该成功");

    assert_eq!(queue.len(), 3);

    assert_eq!(queue[0].appointment_id, a.appointment_id);
    assert_eq!(queue[0].queue_position, 1);
    assert_eq!(queue[0].computed_start_time, fixed_dt(9, 0));
    assert_eq!(queue[0].computed_end_time, fixed_dt(9, 20));
    assert_eq!(queue[0].delay_reason, "On schedule");

    // B 的 09:10 被密集纹波覆盖
    assert_eq!(queue[1].appointment_id, b.appointment_id);
    assert_eq!(queue[1].queue_position, 2);
    assert_eq!(queue[1].computed_start_time, fixed_dt(9, 20));
    assert_eq!(queue[1].computed_end_time, fixed_dt(9, 40));
    assert_eq!(queue[1].delay_reason, "On schedule");

    // C: 前一结束 09:40 + 自身延误 15
    assert_eq!(queue[2].appointment_id, c.appointment_id);
    assert_eq!(queue[2].queue_position, 3);
    assert_eq!(queue[2].computed_start_time, fixed_dt(9, 55));
    assert_eq!(queue[2].computed_end_time, fixed_dt(10, 15));
    // C 之前无延误, 文案仍为按时
    assert_eq!(queue[2].delay_reason, "On schedule");

    // C 之后若还有预约, 文案应提示前方延误
    let d = book(&state, "p4", "doc-1", fixed_dt(10, 0), 20);
    let queue = state
        .queue_api
        .recalculate("doc-1", fixed_day(), None)
        .expect("重算应该成功");
    assert_eq!(queue[3].appointment_id, d.appointment_id);
    assert_eq!(
        queue[3].delay_reason,
        "There are delayed appointments ahead."
    );
    assert_eq!(queue[3].total_delay_before, 15);
    assert!(queue[3]
        .human_readable_status
        .starts_with("You are position 4 in queue."));
}

#[test]
fn test_recalc_is_idempotent() {
    logging::init_test();
    let (_db, state) = create_test_state();

    book(&state, "p1", "doc-1", fixed_dt(9, 0), 20);
    book(&state, "p2", "doc-1", fixed_dt(9, 10), 20);

    let first = state
        .queue_api
        .recalculate("doc-1", fixed_day(), None)
        .expect("第一次重算");
    let second = state
        .queue_api
        .recalculate("doc-1", fixed_day(), None)
        .expect("第二次重算");

    assert_eq!(first.len(), second.len());
    for (x, y) in first.iter().zip(second.iter()) {
        assert_eq!(x.appointment_id, y.appointment_id);
        assert_eq!(x.computed_start_time, y.computed_start_time);
        assert_eq!(x.computed_end_time, y.computed_end_time);
        assert_eq!(x.queue_position, y.queue_position);
    }
}

#[test]
fn test_cancellation_closes_gap() {
    logging::init_test();
    let (_db, state) = create_test_state();

    let a = book(&state, "p1", "doc-1", fixed_dt(9, 0), 20);
    let b = book(&state, "p2", "doc-1", fixed_dt(9, 10), 20);
    let c = book(&state, "p3", "doc-1", fixed_dt(9, 30), 20);

    // 先让 C 带上 15 分钟延误
    state
        .queue_api
        .recalculate("doc-1", fixed_day(), Some(change(&c.appointment_id, None, Some(15))))
        .expect("重算");

    // 取消 B 后重算: C 紧贴 A 的结束 + 自身延误
    let queue = state
        .queue_api
        .recalculate(
            "doc-1",
            fixed_day(),
            Some(change(&b.appointment_id, Some("CANCELLED"), None)),
        )
        .expect("重算");

    assert_eq!(queue.len(), 2);
    assert_eq!(queue[0].appointment_id, a.appointment_id);
    assert_eq!(queue[0].queue_position, 1);
    assert_eq!(queue[0].computed_start_time, fixed_dt(9, 0));
    assert_eq!(queue[0].computed_end_time, fixed_dt(9, 20));

    assert_eq!(queue[1].appointment_id, c.appointment_id);
    assert_eq!(queue[1].queue_position, 2);
    assert_eq!(queue[1].computed_start_time, fixed_dt(9, 35));
    assert_eq!(queue[1].computed_end_time, fixed_dt(9, 55));
}

#[test]
fn test_not_found_change_aborts_whole_pass() {
    logging::init_test();
    let (_db, state) = create_test_state();

    book(&state, "p1", "doc-1", fixed_dt(9, 0), 20);
    let baseline = state
        .queue_api
        .recalculate("doc-1", fixed_day(), None)
        .expect("基线重算");

    let err = state
        .queue_api
        .recalculate(
            "doc-1",
            fixed_day(),
            Some(change("missing-appointment", None, Some(30))),
        )
        .expect_err("目标缺失应该中止");
    assert!(matches!(err, ApiError::NotFound(_)));

    // 中止后队列保持不变
    let after = state
        .queue_api
        .recalculate("doc-1", fixed_day(), None)
        .expect("重算");
    assert_eq!(baseline.len(), after.len());
    for (x, y) in baseline.iter().zip(after.iter()) {
        assert_eq!(x.computed_start_time, y.computed_start_time);
        assert_eq!(x.queue_position, y.queue_position);
    }
}

#[test]
fn test_unsupported_status_rejected_before_mutation() {
    logging::init_test();
    let (_db, state) = create_test_state();

    let a = book(&state, "p1", "doc-1", fixed_dt(9, 0), 20);

    let err = state
        .queue_api
        .recalculate(
            "doc-1",
            fixed_day(),
            Some(change(&a.appointment_id, Some("FROZEN"), None)),
        )
        .expect_err("未知状态应该被拒绝");
    assert!(matches!(err, ApiError::ValidationError(_)));

    let err = state
        .queue_api
        .recalculate("", fixed_day(), None)
        .expect_err("空医生ID应该被拒绝");
    assert!(matches!(err, ApiError::ValidationError(_)));
}

#[test]
fn test_status_transition_and_policy_flag() {
    logging::init_test();
    let (_db, state) = create_test_state();

    let a = book(&state, "p1", "doc-1", fixed_dt(9, 0), 20);
    let b = book(&state, "p2", "doc-1", fixed_dt(9, 10), 20);

    // SCHEDULED → IN_PROGRESS, 默认策略下仍占用时间线
    let queue = state
        .queue_api
        .recalculate(
            "doc-1",
            fixed_day(),
            Some(change(&a.appointment_id, Some("IN_PROGRESS"), None)),
        )
        .expect("重算");
    assert_eq!(queue.len(), 2);
    assert_eq!(queue[0].status, AppointmentStatus::InProgress);
    assert_eq!(queue[1].computed_start_time, fixed_dt(9, 20));

    // 关闭开关后 IN_PROGRESS 退出队列, B 回到自身预约时刻起排
    state
        .config_manager
        .set_global_config_value("queue/include_in_progress", "false")
        .expect("写配置");
    let queue = state
        .queue_api
        .recalculate("doc-1", fixed_day(), None)
        .expect("重算");
    assert_eq!(queue.len(), 1);
    assert_eq!(queue[0].appointment_id, b.appointment_id);
    assert_eq!(queue[0].queue_position, 1);
    assert_eq!(queue[0].computed_start_time, fixed_dt(9, 10));
}

#[test]
fn test_empty_day_is_noop() {
    logging::init_test();
    let (_db, state) = create_test_state();

    let queue = state
        .queue_api
        .recalculate("doc-1", fixed_day(), None)
        .expect("空队列重算");
    assert!(queue.is_empty());
}

#[test]
fn test_recalc_appends_action_log() {
    logging::init_test();
    let (_db, state) = create_test_state();

    book(&state, "p1", "doc-1", fixed_dt(9, 0), 20);
    state
        .queue_api
        .recalculate("doc-1", fixed_day(), None)
        .expect("重算");

    let logs = state
        .action_log_repo
        .list_for_doctor("doc-1", 10)
        .expect("查询日志");
    // 挂号 + 重算各一条
    assert!(logs.len() >= 2);
    assert!(logs
        .iter()
        .any(|l| l.action_type == clinic_queue::domain::ActionType::Recalc));
}
