// ==========================================
// 值班排班系统 - 值班报告领域模型
// ==========================================
// 每条实际值班 (非 OFF/LEAVE/HOLIDAY) 对应一份报告
// 报告拥有: 清单项 / 备份清单 / 问题记录
// 红线: 报告状态由清单项推导, 不可直接设置
// ==========================================

use chrono::{NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::domain::types::{ChecklistStatus, IssueStatus, ReportStatus, ShiftType};

// ==========================================
// ChecklistTemplate - 清单模板
// ==========================================
// shift_type 为空表示适用于所有值班班次
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChecklistTemplate {
    pub template_id: String,
    pub shift_type: Option<ShiftType>,
    pub category: String,
    pub title: String,
    pub description: Option<String>,
    pub order_no: i32,
    pub is_required: bool,
    pub unlock_time: Option<NaiveTime>, // 解锁时刻 (HH:mm, 网点本地时间)
    pub active: bool,
}

// ==========================================
// BackupTemplate - 备份清单模板
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackupTemplate {
    pub template_id: String,
    pub database_name: String,
    pub description: Option<String>,
    pub order_no: i32,
    pub active: bool,
}

// ==========================================
// ShiftReport - 值班报告
// ==========================================
// assignment_id 为非拥有引用
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShiftReport {
    pub report_id: String,
    pub assignment_id: String,
    pub status: ReportStatus,                // 推导状态 (随清单项重算)
    pub started_at: Option<NaiveDateTime>,   // 首次离开 DRAFT 的时间
    pub completed_at: Option<NaiveDateTime>, // 进入 COMPLETED 的时间
    pub summary: Option<String>,
    pub handover_notes: Option<String>,
    pub notes: Option<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

// ==========================================
// ChecklistItem - 清单项
// ==========================================
// 红线: now < unlock_time 时拒绝 COMPLETED
// 红线: completed_at 仅在 COMPLETED 时存在
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChecklistItem {
    pub item_id: String,
    pub report_id: String,
    pub category: String,
    pub title: String,
    pub description: Option<String>,
    pub order_no: i32,
    pub is_required: bool,
    pub unlock_time: Option<NaiveTime>,
    pub status: ChecklistStatus,
    pub notes: Option<String>,
    pub completed_at: Option<NaiveDateTime>,
    pub updated_at: NaiveDateTime,
}

impl ChecklistItem {
    /// 按新状态更新, 同步维护 completed_at
    pub fn apply_status(&mut self, status: ChecklistStatus, now: NaiveDateTime) {
        self.status = status;
        self.completed_at = if status == ChecklistStatus::Completed {
            Some(now)
        } else {
            None
        };
        self.updated_at = now;
    }
}

// ==========================================
// BackupChecklistItem - 备份清单项
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackupChecklistItem {
    pub backup_id: String,
    pub report_id: String,
    pub database_name: String,
    pub description: Option<String>,
    pub order_no: i32,
    pub is_checked: bool,
    pub checked_at: Option<NaiveDateTime>,
}

// ==========================================
// ShiftIssue - 值班问题记录
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShiftIssue {
    pub issue_id: String,
    pub report_id: String,
    pub title: String,
    pub description: Option<String>,
    pub status: IssueStatus,
    pub resolution: Option<String>,
    pub ticket_number: Option<String>, // 关联工单号 (外部工单系统)
    pub created_by: String,
    pub created_at: NaiveDateTime,
    pub resolved_at: Option<NaiveDateTime>,
}

// ==========================================
// ReportStats - 报告统计 (只读派生)
// ==========================================
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportStats {
    pub checklist_total: i32,
    pub checklist_completed: i32,
    pub checklist_skipped: i32,
    pub checklist_in_progress: i32,
    pub checklist_pending: i32,
    pub backup_total: i32,
    pub backup_checked: i32,
    pub issues_ongoing: i32,
    pub issues_resolved: i32,
}

// ==========================================
// ChecklistUpdate / BatchUpdateResult - 批量更新
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChecklistUpdate {
    pub item_id: String,
    pub status: ChecklistStatus,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChecklistItemError {
    pub item_id: String,
    pub message: String,
}

/// 批量更新结果: 部分成功
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BatchUpdateResult {
    pub updated: Vec<ChecklistItem>,
    pub errors: Vec<ChecklistItemError>,
}
