// ==========================================
// 值班排班系统 - 排班配置读取 Trait
// ==========================================
// 职责: 定义引擎层所需的配置读取接口（不包含实现）
// 红线: 不包含配置写入、不包含业务逻辑
// ==========================================

use chrono::NaiveTime;
use std::error::Error;

// ==========================================
// RosterConfigReader Trait
// ==========================================
// 用途: 改派引擎/时间锁引擎/资格登记所需的配置读取接口
// 实现者: ConfigManager（从 config_kv 表读取, 网点作用域覆盖全局）
pub trait RosterConfigReader: Send + Sync {
    /// 获取网点本地时间相对 UTC 的偏移（分钟）
    ///
    /// # 默认值
    /// - 480 (UTC+8)
    fn get_utc_offset_minutes(&self, branch_id: &str) -> Result<i32, Box<dyn Error>>;

    /// 获取夜班跨日分界时刻
    ///
    /// 夜班清单中早于该时刻的解锁时间落在排班日期的次日
    ///
    /// # 默认值
    /// - 08:00
    fn get_night_rollover_before(&self, branch_id: &str) -> Result<NaiveTime, Box<dyn Error>>;

    /// 获取并发冲突时的乐观重试次数
    ///
    /// # 默认值
    /// - 3
    fn get_reassign_max_retries(&self) -> Result<u32, Box<dyn Error>>;

    /// 获取新资格档案的默认每月夜班上限
    ///
    /// # 默认值
    /// - 5
    fn get_default_max_night_shifts(&self) -> Result<i32, Box<dyn Error>>;

    /// 获取新资格档案的默认夜班最小间隔
    ///
    /// # 默认值
    /// - 3
    fn get_default_min_days_between_nights(&self) -> Result<i32, Box<dyn Error>>;

    /// 获取提示信息语言
    ///
    /// # 默认值
    /// - en
    fn get_locale(&self) -> Result<String, Box<dyn Error>>;
}
