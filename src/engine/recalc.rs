// ==========================================
// 诊所预约排队系统 - 队列重算引擎
// ==========================================
// 职责: 对 Queue Builder 给定的有序快照做一次 O(n) 前向扫描,
//       推算每个预约的开始/结束时刻、队列位置与等待文案
// 红线: 纯函数, 不触数据库; 队列永远整体重推, 不做增量维护
// ==========================================

use chrono::{Duration, NaiveDateTime};
use tracing::instrument;

use crate::config::QueuePolicy;
use crate::domain::appointment::Appointment;
use crate::i18n;

// ==========================================
// QueueSlot - 单个预约的重算结果
// ==========================================
#[derive(Debug, Clone)]
pub struct QueueSlot {
    pub appointment: Appointment,             // 输入快照
    pub computed_start_time: NaiveDateTime,   // 推算开始时刻 (落库)
    pub computed_end_time: NaiveDateTime,     // 推算结束时刻 (落库)
    pub queue_position: i32,                  // 1-based 队列位置 (落库)
    pub estimated_wait_minutes: i64,          // 预计等待(分钟), 仅读取时派生
    pub total_delay_before: i64,              // 本预约之前累计的正延误(分钟)
    pub delay_reason: String,                 // 延误说明文案
    pub human_readable_status: String,        // 排队状态文案
}

// ==========================================
// RecalcEngine - 重算引擎
// ==========================================

/// 队列重算引擎
///
/// 时间线模型 (密集纹波):
/// - 首个预约以自身 scheduled_at 为锚点, 仅可能被自身延误推后;
/// - 其后每个预约的最早开始时刻 = 前一个预约的推算结束时刻,
///   自身 scheduled_at 自第 2 位起仅作展示, 不参与时间线;
/// - start = cursor + delay, end = start + duration, cursor = end。
/// 任何延误因此向后传导到当日队列的每个后续预约。
pub struct RecalcEngine {
    policy: QueuePolicy,
}

impl RecalcEngine {
    pub fn new(policy: QueuePolicy) -> Self {
        Self { policy }
    }

    /// 对有序快照执行一次完整重算
    ///
    /// 输入为空时返回空结果。`now` 由调用方注入, 仅用于等待时长估算。
    #[instrument(skip(self, ordered), fields(queue_len = ordered.len()))]
    pub fn recalc(&self, ordered: &[Appointment], now: NaiveDateTime) -> Vec<QueueSlot> {
        let mut slots = Vec::with_capacity(ordered.len());
        let mut cursor: Option<NaiveDateTime> = None;
        let mut total_delay_before: i64 = 0;

        for (index, appointment) in ordered.iter().enumerate() {
            let duration = appointment.effective_duration(self.policy.default_duration_min);
            let delay = appointment.effective_delay();

            let anchor = match cursor {
                None => appointment.scheduled_at,
                Some(previous_end) => previous_end,
            };

            let start = anchor + Duration::minutes(delay);
            let end = start + Duration::minutes(duration);
            let queue_position = (index + 1) as i32;

            let estimated_wait_minutes = estimate_wait_minutes(start, now);

            // 文案只看“前序是否有延误”, 时间线传导已由纹波本身完成
            let delay_reason = if total_delay_before > 0 {
                i18n::t("queue.delayed_ahead")
            } else {
                i18n::t("queue.on_schedule")
            };

            let human_readable_status = i18n::t_with_args(
                "queue.human_status",
                &[
                    ("position", &queue_position.to_string()),
                    ("minutes", &estimated_wait_minutes.to_string()),
                ],
            );

            slots.push(QueueSlot {
                appointment: appointment.clone(),
                computed_start_time: start,
                computed_end_time: end,
                queue_position,
                estimated_wait_minutes,
                total_delay_before,
                delay_reason,
                human_readable_status,
            });

            cursor = Some(end);
            if delay > 0 {
                total_delay_before += delay;
            }
        }

        slots
    }
}

/// 预计等待分钟数: max(0, ceil((start − now) / 60_000))
pub fn estimate_wait_minutes(start: NaiveDateTime, now: NaiveDateTime) -> i64 {
    let diff_ms = (start - now).num_milliseconds();
    if diff_ms > 0 {
        (diff_ms + 59_999) / 60_000
    } else {
        0
    }
}
