// ==========================================
// 值班排班系统 - 值班报告汇总
// ==========================================
// 只读派生: 统计数据不落库
// 报告状态推导:
//   - 所有必填项 COMPLETED/SKIPPED → COMPLETED
//   - 任一清单项离开 PENDING      → IN_PROGRESS
//   - 否则                        → DRAFT
// ==========================================

use crate::domain::report::{BackupChecklistItem, ChecklistItem, ReportStats, ShiftIssue};
use crate::domain::types::{ChecklistStatus, IssueStatus, ReportStatus};
use crate::engine::error::RosterError;
use crate::repository::report_repo::ShiftReportRepository;
use std::sync::Arc;

/// 由清单项推导报告状态
///
/// 没有任何必填项时, 全部清单项按必填处理; 无清单项的报告保持 DRAFT
pub fn derive_status(items: &[ChecklistItem]) -> ReportStatus {
    if items.is_empty() {
        return ReportStatus::Draft;
    }

    let any_required = items.iter().any(|i| i.is_required);
    let all_settled = items
        .iter()
        .filter(|i| i.is_required || !any_required)
        .all(|i| i.status.is_settled());

    if all_settled {
        ReportStatus::Completed
    } else if items.iter().any(|i| i.status != ChecklistStatus::Pending) {
        ReportStatus::InProgress
    } else {
        ReportStatus::Draft
    }
}

/// 计算报告统计
pub fn compute_stats(
    items: &[ChecklistItem],
    backups: &[BackupChecklistItem],
    issues: &[ShiftIssue],
) -> ReportStats {
    let count_items = |status: ChecklistStatus| items.iter().filter(|i| i.status == status).count() as i32;
    let count_issues = |status: IssueStatus| issues.iter().filter(|i| i.status == status).count() as i32;

    ReportStats {
        checklist_total: items.len() as i32,
        checklist_completed: count_items(ChecklistStatus::Completed),
        checklist_skipped: count_items(ChecklistStatus::Skipped),
        checklist_in_progress: count_items(ChecklistStatus::InProgress),
        checklist_pending: count_items(ChecklistStatus::Pending),
        backup_total: backups.len() as i32,
        backup_checked: backups.iter().filter(|b| b.is_checked).count() as i32,
        issues_ongoing: count_issues(IssueStatus::Ongoing),
        issues_resolved: count_issues(IssueStatus::Resolved),
    }
}

// ==========================================
// ShiftReportAggregator - 报告汇总器
// ==========================================
pub struct ShiftReportAggregator {
    report_repo: Arc<ShiftReportRepository>,
}

impl ShiftReportAggregator {
    pub fn new(report_repo: Arc<ShiftReportRepository>) -> Self {
        Self { report_repo }
    }

    /// 读取报告当前子记录并计算统计
    pub fn stats(&self, report_id: &str) -> Result<ReportStats, RosterError> {
        if self.report_repo.find_by_id(report_id)?.is_none() {
            return Err(RosterError::not_found("ShiftReport", report_id));
        }

        let items = self.report_repo.list_items(report_id)?;
        let backups = self.report_repo.list_backups(report_id)?;
        let issues = self.report_repo.list_issues(report_id)?;

        Ok(compute_stats(&items, &backups, &issues))
    }
}
