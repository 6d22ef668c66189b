// ==========================================
// 值班排班系统 - 时间锁规则
// ==========================================
// 清单项 unlock_time 为不带时区的 HH:mm
// 时区口径: 网点本地时间 (UTC + roster.utc_offset_minutes)
// 夜班跨日: 早于 checklist.night_rollover_before 的解锁时刻落在排班日期次日
// 红线: 同一批次内所有清单项使用同一个 now
// ==========================================

use crate::domain::types::ShiftType;
use crate::i18n;
use chrono::{Duration, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, Offset, Utc};
use std::sync::Mutex;

// ==========================================
// Clock - 时钟
// ==========================================

/// 时钟接口 (返回 UTC 时间)
pub trait Clock: Send + Sync {
    fn now_utc(&self) -> NaiveDateTime;
}

/// 系统时钟
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_utc(&self) -> NaiveDateTime {
        Utc::now().naive_utc()
    }
}

/// 固定时钟 (测试与回放使用)
#[derive(Debug)]
pub struct FixedClock {
    now: Mutex<NaiveDateTime>,
}

impl FixedClock {
    pub fn new(now: NaiveDateTime) -> Self {
        Self {
            now: Mutex::new(now),
        }
    }

    pub fn set(&self, now: NaiveDateTime) {
        match self.now.lock() {
            Ok(mut guard) => *guard = now,
            Err(poisoned) => *poisoned.into_inner() = now,
        }
    }

    pub fn advance(&self, delta: Duration) {
        let next = self.now_utc() + delta;
        self.set(next);
    }
}

impl Clock for FixedClock {
    fn now_utc(&self) -> NaiveDateTime {
        match self.now.lock() {
            Ok(guard) => *guard,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }
}

// ==========================================
// 纯函数
// ==========================================

/// 解析 HH:mm (兼容 HH:mm:ss)
pub fn parse_unlock_time(value: &str) -> Option<NaiveTime> {
    let value = value.trim();
    NaiveTime::parse_from_str(value, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(value, "%H:%M:%S"))
        .ok()
}

/// 清单项是否已解锁
///
/// unlock_time 视为 assignment_date 当天的本地墙钟时刻;
/// 未设置 unlock_time 的清单项始终解锁
pub fn is_unlocked(
    unlock_time: Option<NaiveTime>,
    assignment_date: NaiveDate,
    now_local: NaiveDateTime,
) -> bool {
    match unlock_time {
        None => true,
        Some(t) => now_local >= assignment_date.and_time(t),
    }
}

// ==========================================
// LockState - 锁定状态
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LockState {
    Unlocked,
    Locked {
        unlock_at: NaiveDateTime, // 本地解锁时刻
        remaining: Duration,
    },
}

impl LockState {
    pub fn is_locked(&self) -> bool {
        matches!(self, LockState::Locked { .. })
    }
}

// ==========================================
// TimeLockPolicy - 网点时间锁策略
// ==========================================
#[derive(Debug, Clone, Copy)]
pub struct TimeLockPolicy {
    offset: FixedOffset,
    night_rollover_before: NaiveTime,
}

impl TimeLockPolicy {
    /// 创建策略
    ///
    /// # 参数
    /// - offset_minutes: 相对 UTC 的偏移 (越界时按 UTC 处理)
    /// - night_rollover_before: 夜班跨日分界时刻
    pub fn new(offset_minutes: i32, night_rollover_before: NaiveTime) -> Self {
        let offset = FixedOffset::east_opt(offset_minutes.saturating_mul(60)).unwrap_or_else(|| {
            tracing::warn!("UTC 偏移越界: {} 分钟, 按 UTC 处理", offset_minutes);
            Utc.fix()
        });
        Self {
            offset,
            night_rollover_before,
        }
    }

    pub fn offset_minutes(&self) -> i32 {
        self.offset.local_minus_utc() / 60
    }

    /// UTC → 网点本地时间
    pub fn to_local(&self, now_utc: NaiveDateTime) -> NaiveDateTime {
        now_utc + Duration::seconds(i64::from(self.offset.local_minus_utc()))
    }

    /// 解锁时刻所在的本地日期
    ///
    /// 夜班的清晨任务 (如 06:00 交班检查) 落在排班日期次日
    pub fn effective_date(
        &self,
        shift_type: ShiftType,
        assignment_date: NaiveDate,
        unlock_time: NaiveTime,
    ) -> NaiveDate {
        if shift_type.is_night() && unlock_time < self.night_rollover_before {
            assignment_date.succ_opt().unwrap_or(assignment_date)
        } else {
            assignment_date
        }
    }

    /// 判定清单项锁定状态
    pub fn check(
        &self,
        unlock_time: Option<NaiveTime>,
        shift_type: ShiftType,
        assignment_date: NaiveDate,
        now_utc: NaiveDateTime,
    ) -> LockState {
        let unlock_time = match unlock_time {
            None => return LockState::Unlocked,
            Some(t) => t,
        };

        let date = self.effective_date(shift_type, assignment_date, unlock_time);
        let now_local = self.to_local(now_utc);
        if is_unlocked(Some(unlock_time), date, now_local) {
            LockState::Unlocked
        } else {
            let unlock_at = date.and_time(unlock_time);
            LockState::Locked {
                unlock_at,
                remaining: unlock_at - now_local,
            }
        }
    }
}

// ==========================================
// 提示信息
// ==========================================

/// 剩余时间文本 (按小时/分钟/不足一分钟)
pub fn format_remaining(locale: &str, remaining: Duration) -> String {
    let total_secs = remaining.num_seconds().max(0);
    let hours = total_secs / 3600;
    let minutes = (total_secs % 3600) / 60;

    if hours > 0 {
        i18n::t_with_args(
            locale,
            "checklist.remaining_hm",
            &[("hours", &hours.to_string()), ("minutes", &minutes.to_string())],
        )
    } else if minutes > 0 {
        i18n::t_with_args(
            locale,
            "checklist.remaining_m",
            &[("minutes", &minutes.to_string())],
        )
    } else {
        i18n::t_with_args(locale, "checklist.remaining_s", &[])
    }
}

/// 锁定提示信息
pub fn locked_message(locale: &str, unlock_at: NaiveDateTime, remaining: Duration) -> String {
    let time = unlock_at.format("%Y-%m-%d %H:%M").to_string();
    let remaining = format_remaining(locale, remaining);
    i18n::t_with_args(
        locale,
        "checklist.locked",
        &[("time", &time), ("remaining", &remaining)],
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dt(s: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").unwrap()
    }

    fn d(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn t(s: &str) -> NaiveTime {
        parse_unlock_time(s).unwrap()
    }

    #[test]
    fn test_boundary_at_unlock_time() {
        let unlock = Some(t("06:00"));
        assert!(!is_unlocked(unlock, d("2024-05-10"), dt("2024-05-10 05:59:59")));
        assert!(is_unlocked(unlock, d("2024-05-10"), dt("2024-05-10 06:00:00")));
        // 前一天的任何时刻都未解锁
        assert!(!is_unlocked(unlock, d("2024-05-10"), dt("2024-05-09 23:00:00")));
    }

    #[test]
    fn test_missing_unlock_time_is_always_open() {
        assert!(is_unlocked(None, d("2024-05-10"), dt("2000-01-01 00:00:00")));
    }

    #[test]
    fn test_parse_unlock_time() {
        assert_eq!(parse_unlock_time("06:00"), NaiveTime::from_hms_opt(6, 0, 0));
        assert_eq!(parse_unlock_time(" 21:30:15 "), NaiveTime::from_hms_opt(21, 30, 15));
        assert_eq!(parse_unlock_time("6am"), None);
        assert_eq!(parse_unlock_time("25:00"), None);
    }

    #[test]
    fn test_policy_uses_branch_local_time() {
        // UTC+8: 本地 06:00 = UTC 前一天 22:00
        let policy = TimeLockPolicy::new(480, t("08:00"));
        let state = policy.check(
            Some(t("06:00")),
            ShiftType::Day,
            d("2024-05-10"),
            dt("2024-05-09 21:59:59"),
        );
        assert!(state.is_locked());

        let state = policy.check(
            Some(t("06:00")),
            ShiftType::Day,
            d("2024-05-10"),
            dt("2024-05-09 22:00:00"),
        );
        assert_eq!(state, LockState::Unlocked);
    }

    #[test]
    fn test_night_shift_rollover() {
        let policy = TimeLockPolicy::new(0, t("08:00"));

        // 夜班 06:00 任务落在次日
        assert_eq!(
            policy.effective_date(ShiftType::Night, d("2024-06-01"), t("06:00")),
            d("2024-06-02")
        );
        // 夜班 22:00 任务仍在当天
        assert_eq!(
            policy.effective_date(ShiftType::SaturdayNight, d("2024-06-01"), t("22:00")),
            d("2024-06-01")
        );
        // 白班不跨日
        assert_eq!(
            policy.effective_date(ShiftType::Day, d("2024-06-01"), t("06:00")),
            d("2024-06-01")
        );

        match policy.check(
            Some(t("06:00")),
            ShiftType::Night,
            d("2024-06-01"),
            dt("2024-06-01 23:00:00"),
        ) {
            LockState::Locked { unlock_at, remaining } => {
                assert_eq!(unlock_at, dt("2024-06-02 06:00:00"));
                assert_eq!(remaining, Duration::hours(7));
            }
            LockState::Unlocked => panic!("夜班清晨任务应仍锁定"),
        }
    }

    #[test]
    fn test_out_of_range_offset_falls_back_to_utc() {
        let policy = TimeLockPolicy::new(100_000, t("08:00"));
        assert_eq!(policy.offset_minutes(), 0);
        assert_eq!(policy.to_local(dt("2024-05-10 06:00:00")), dt("2024-05-10 06:00:00"));
    }

    #[test]
    fn test_fixed_clock() {
        let clock = FixedClock::new(dt("2024-05-10 05:59:59"));
        clock.advance(Duration::seconds(1));
        assert_eq!(clock.now_utc(), dt("2024-05-10 06:00:00"));
    }

    #[test]
    fn test_locked_message_mentions_time_and_remaining() {
        let msg = locked_message(
            "en",
            dt("2024-05-10 06:00:00"),
            Duration::minutes(90),
        );
        assert!(msg.contains("2024-05-10 06:00"));
        assert!(msg.contains("1h 30m"));

        assert!(format_remaining("en", Duration::seconds(59)).contains("less than a minute"));
        assert_eq!(format_remaining("en", Duration::minutes(5)), "5m");
    }
}
