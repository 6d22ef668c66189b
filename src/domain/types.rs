// ==========================================
// 值班排班系统 - 领域类型定义
// ==========================================
// 班次类型 / 排班表状态 / 换班状态 / 清单状态 / 报告状态
// 序列化格式: SCREAMING_SNAKE_CASE (与数据库一致)
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;

// ==========================================
// 班次类型 (Shift Type)
// ==========================================
// 一人一天只有一个班次状态
// OFF/LEAVE/HOLIDAY 为占位班次, 不产生值班报告
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ShiftType {
    Day,           // 工作日白班
    Night,         // 工作日夜班
    SaturdayDay,   // 周六白班
    SaturdayNight, // 周六夜班
    SundayDay,     // 周日白班
    SundayNight,   // 周日夜班
    Off,           // 休息
    Leave,         // 请假
    Holiday,       // 节假日
}

impl ShiftType {
    pub const ALL: [ShiftType; 9] = [
        ShiftType::Day,
        ShiftType::Night,
        ShiftType::SaturdayDay,
        ShiftType::SaturdayNight,
        ShiftType::SundayDay,
        ShiftType::SundayNight,
        ShiftType::Off,
        ShiftType::Leave,
        ShiftType::Holiday,
    ];

    /// 是否为夜班 (NIGHT / *_NIGHT)
    pub fn is_night(&self) -> bool {
        matches!(
            self,
            ShiftType::Night | ShiftType::SaturdayNight | ShiftType::SundayNight
        )
    }

    /// 是否为周末白班
    pub fn is_weekend_day(&self) -> bool {
        matches!(self, ShiftType::SaturdayDay | ShiftType::SundayDay)
    }

    /// 是否为占位班次 (OFF/LEAVE/HOLIDAY)
    pub fn is_placeholder(&self) -> bool {
        matches!(self, ShiftType::Off | ShiftType::Leave | ShiftType::Holiday)
    }

    /// 是否为实际值班 (产生值班报告)
    pub fn is_working(&self) -> bool {
        !self.is_placeholder()
    }

    /// 从数据库字符串解析 (未知值返回 None)
    pub fn from_db_str(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "DAY" => Some(ShiftType::Day),
            "NIGHT" => Some(ShiftType::Night),
            "SATURDAY_DAY" => Some(ShiftType::SaturdayDay),
            "SATURDAY_NIGHT" => Some(ShiftType::SaturdayNight),
            "SUNDAY_DAY" => Some(ShiftType::SundayDay),
            "SUNDAY_NIGHT" => Some(ShiftType::SundayNight),
            "OFF" => Some(ShiftType::Off),
            "LEAVE" => Some(ShiftType::Leave),
            "HOLIDAY" => Some(ShiftType::Holiday),
            _ => None,
        }
    }

    /// 转换为数据库存储的字符串
    pub fn to_db_str(&self) -> &'static str {
        match self {
            ShiftType::Day => "DAY",
            ShiftType::Night => "NIGHT",
            ShiftType::SaturdayDay => "SATURDAY_DAY",
            ShiftType::SaturdayNight => "SATURDAY_NIGHT",
            ShiftType::SundayDay => "SUNDAY_DAY",
            ShiftType::SundayNight => "SUNDAY_NIGHT",
            ShiftType::Off => "OFF",
            ShiftType::Leave => "LEAVE",
            ShiftType::Holiday => "HOLIDAY",
        }
    }
}

impl fmt::Display for ShiftType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.to_db_str())
    }
}

// ==========================================
// 排班表状态 (Schedule Status)
// ==========================================
// 红线: PUBLISHED 为单向锁, 不提供 unpublish
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ScheduleStatus {
    Draft,     // 草稿
    Published, // 已发布
}

impl ScheduleStatus {
    pub fn from_db_str(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "DRAFT" => Some(ScheduleStatus::Draft),
            "PUBLISHED" => Some(ScheduleStatus::Published),
            _ => None,
        }
    }

    pub fn to_db_str(&self) -> &'static str {
        match self {
            ScheduleStatus::Draft => "DRAFT",
            ScheduleStatus::Published => "PUBLISHED",
        }
    }
}

impl fmt::Display for ScheduleStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.to_db_str())
    }
}

// ==========================================
// 换班申请状态 (Swap Status)
// ==========================================
// 终态: REJECTED / APPLIED / CANCELLED
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SwapStatus {
    PendingRecipient, // 等待接收人确认
    Accepted,         // 接收人已同意
    Rejected,         // 接收人已拒绝
    Applied,          // 已生效
    Cancelled,        // 已撤销
}

impl SwapStatus {
    /// 是否为终态 (终态不可再变更)
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            SwapStatus::Rejected | SwapStatus::Applied | SwapStatus::Cancelled
        )
    }

    pub fn from_db_str(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "PENDING_RECIPIENT" => Some(SwapStatus::PendingRecipient),
            "ACCEPTED" => Some(SwapStatus::Accepted),
            "REJECTED" => Some(SwapStatus::Rejected),
            "APPLIED" => Some(SwapStatus::Applied),
            "CANCELLED" => Some(SwapStatus::Cancelled),
            _ => None,
        }
    }

    pub fn to_db_str(&self) -> &'static str {
        match self {
            SwapStatus::PendingRecipient => "PENDING_RECIPIENT",
            SwapStatus::Accepted => "ACCEPTED",
            SwapStatus::Rejected => "REJECTED",
            SwapStatus::Applied => "APPLIED",
            SwapStatus::Cancelled => "CANCELLED",
        }
    }
}

impl fmt::Display for SwapStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.to_db_str())
    }
}

// ==========================================
// 换班类型 (Swap Type)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SwapType {
    GiveAway, // 转让: 接收人接手该班次
    Trade,    // 互换: 接收人在 proposed_date 的班次转给发起人
}

impl SwapType {
    pub fn from_db_str(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "GIVE_AWAY" => Some(SwapType::GiveAway),
            "TRADE" => Some(SwapType::Trade),
            _ => None,
        }
    }

    pub fn to_db_str(&self) -> &'static str {
        match self {
            SwapType::GiveAway => "GIVE_AWAY",
            SwapType::Trade => "TRADE",
        }
    }
}

impl fmt::Display for SwapType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.to_db_str())
    }
}

// ==========================================
// 清单项状态 (Checklist Status)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ChecklistStatus {
    Pending,    // 待处理
    InProgress, // 处理中
    Completed,  // 已完成
    Skipped,    // 已跳过
}

impl ChecklistStatus {
    /// 是否已结清 (COMPLETED 或 SKIPPED)
    pub fn is_settled(&self) -> bool {
        matches!(self, ChecklistStatus::Completed | ChecklistStatus::Skipped)
    }

    pub fn from_db_str(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "PENDING" => Some(ChecklistStatus::Pending),
            "IN_PROGRESS" => Some(ChecklistStatus::InProgress),
            "COMPLETED" => Some(ChecklistStatus::Completed),
            "SKIPPED" => Some(ChecklistStatus::Skipped),
            _ => None,
        }
    }

    pub fn to_db_str(&self) -> &'static str {
        match self {
            ChecklistStatus::Pending => "PENDING",
            ChecklistStatus::InProgress => "IN_PROGRESS",
            ChecklistStatus::Completed => "COMPLETED",
            ChecklistStatus::Skipped => "SKIPPED",
        }
    }
}

impl fmt::Display for ChecklistStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.to_db_str())
    }
}

// ==========================================
// 值班报告状态 (Report Status)
// ==========================================
// 由清单项推导, 不可直接设置
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReportStatus {
    Draft,      // 未开始
    InProgress, // 进行中
    Completed,  // 已完成
}

impl ReportStatus {
    pub fn from_db_str(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "DRAFT" => Some(ReportStatus::Draft),
            "IN_PROGRESS" => Some(ReportStatus::InProgress),
            "COMPLETED" => Some(ReportStatus::Completed),
            _ => None,
        }
    }

    pub fn to_db_str(&self) -> &'static str {
        match self {
            ReportStatus::Draft => "DRAFT",
            ReportStatus::InProgress => "IN_PROGRESS",
            ReportStatus::Completed => "COMPLETED",
        }
    }
}

impl fmt::Display for ReportStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.to_db_str())
    }
}

// ==========================================
// 值班问题状态 (Issue Status)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IssueStatus {
    Ongoing,  // 处理中
    Resolved, // 已解决
}

impl IssueStatus {
    pub fn from_db_str(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "ONGOING" => Some(IssueStatus::Ongoing),
            "RESOLVED" => Some(IssueStatus::Resolved),
            _ => None,
        }
    }

    pub fn to_db_str(&self) -> &'static str {
        match self {
            IssueStatus::Ongoing => "ONGOING",
            IssueStatus::Resolved => "RESOLVED",
        }
    }
}

impl fmt::Display for IssueStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.to_db_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shift_type_classification() {
        assert!(ShiftType::Night.is_night());
        assert!(ShiftType::SaturdayNight.is_night());
        assert!(ShiftType::SundayNight.is_night());
        assert!(!ShiftType::Day.is_night());

        assert!(ShiftType::SaturdayDay.is_weekend_day());
        assert!(ShiftType::SundayDay.is_weekend_day());
        assert!(!ShiftType::SaturdayNight.is_weekend_day());

        for t in [ShiftType::Off, ShiftType::Leave, ShiftType::Holiday] {
            assert!(t.is_placeholder());
            assert!(!t.is_working());
        }
    }

    #[test]
    fn test_shift_type_db_str() {
        for t in ShiftType::ALL {
            assert_eq!(ShiftType::from_db_str(t.to_db_str()), Some(t));
        }
        assert_eq!(ShiftType::from_db_str("saturday_night"), Some(ShiftType::SaturdayNight));
        assert_eq!(ShiftType::from_db_str("EVENING"), None);
    }

    #[test]
    fn test_swap_status_terminal() {
        assert!(!SwapStatus::PendingRecipient.is_terminal());
        assert!(!SwapStatus::Accepted.is_terminal());
        assert!(SwapStatus::Rejected.is_terminal());
        assert!(SwapStatus::Applied.is_terminal());
        assert!(SwapStatus::Cancelled.is_terminal());
    }

    #[test]
    fn test_serde_format() {
        let json = serde_json::to_string(&ShiftType::SaturdayDay).unwrap();
        assert_eq!(json, "\"SATURDAY_DAY\"");
        let status: SwapStatus = serde_json::from_str("\"PENDING_RECIPIENT\"").unwrap();
        assert_eq!(status, SwapStatus::PendingRecipient);
    }
}
