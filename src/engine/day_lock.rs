// ==========================================
// 诊所预约排队系统 - (医生,日期) 互斥锁
// ==========================================
// 职责: 同一 (doctorId, day) 的重算请求串行化
// 约束: 有界等待, 超时交由调用方作为可重试失败上抛, 不无限挂起
// ==========================================

use chrono::NaiveDate;
use std::collections::HashSet;
use std::sync::{Condvar, Mutex, PoisonError};
use std::time::{Duration, Instant};

type DayKey = (String, NaiveDate);

// ==========================================
// DayLockRegistry - 互斥锁登记表
// ==========================================

/// (医生,日期) 互斥锁登记表
///
/// 不同 (doctorId, day) 可并行; 相同键上的竞争者在有界等待内
/// 轮候, 超时返回 None。锁的释放由 guard 的 Drop 完成。
pub struct DayLockRegistry {
    held: Mutex<HashSet<DayKey>>,
    released: Condvar,
}

impl DayLockRegistry {
    pub fn new() -> Self {
        Self {
            held: Mutex::new(HashSet::new()),
            released: Condvar::new(),
        }
    }

    /// 在 max_wait 内尝试获取 (doctor_id, day) 的独占权
    ///
    /// # 返回
    /// - Some(guard): 获取成功, guard 存续期间持有独占权
    /// - None: 有界等待超时
    pub fn acquire(
        &self,
        doctor_id: &str,
        day: NaiveDate,
        max_wait: Duration,
    ) -> Option<DayLockGuard<'_>> {
        let key: DayKey = (doctor_id.to_string(), day);
        let deadline = Instant::now() + max_wait;

        // Mutex 中毒仅发生在持锁线程 panic, 集合本身仍一致, 直接恢复使用
        let mut held = self.held.lock().unwrap_or_else(PoisonError::into_inner);
        loop {
            if held.insert(key.clone()) {
                return Some(DayLockGuard {
                    registry: self,
                    key,
                });
            }

            let now = Instant::now();
            if now >= deadline {
                return None;
            }

            let (guard, _timeout) = self
                .released
                .wait_timeout(held, deadline - now)
                .unwrap_or_else(PoisonError::into_inner);
            held = guard;
            // 被唤醒或超时都回到循环顶部重查, 退出统一由 deadline 判定
        }
    }
}

impl Default for DayLockRegistry {
    fn default() -> Self {
        Self::new()
    }
}

// ==========================================
// DayLockGuard - RAII 守卫
// ==========================================
pub struct DayLockGuard<'a> {
    registry: &'a DayLockRegistry,
    key: DayKey,
}

impl Drop for DayLockGuard<'_> {
    fn drop(&mut self) {
        let mut held = self
            .registry
            .held
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        held.remove(&self.key);
        self.registry.released.notify_all();
    }
}
