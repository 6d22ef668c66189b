// ==========================================
// 值班排班系统 - 值班报告 API
// ==========================================
// 职责: 报告创建/查询、清单项更新、备份勾选、问题记录、模板维护、导出
// 权限: 排班持有人或本网点 MANAGER / ADMIN; 模板维护仅 MANAGER / ADMIN
// 红线: 报告状态只由清单项推导, 备注更新不触碰状态
// ==========================================

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::api::error::{logged, ApiError, ApiResult};
use crate::api::validator::{
    require_manager_role, require_non_empty, require_self_or_manager, validate_max_len,
    validate_opt_text, MAX_TEXT_LEN,
};
use crate::domain::action_log::{ActionLog, ActionType};
use crate::domain::actor::Actor;
use crate::domain::report::{
    BackupChecklistItem, BackupTemplate, BatchUpdateResult, ChecklistItem, ChecklistTemplate,
    ChecklistUpdate, ReportStats, ShiftIssue, ShiftReport,
};
use crate::domain::schedule::Assignment;
use crate::domain::types::{ChecklistStatus, IssueStatus};
use crate::engine::audit::AuditRecorder;
use crate::engine::checklist::ChecklistEngine;
use crate::engine::report_stats::{compute_stats, derive_status, ShiftReportAggregator};
use crate::engine::time_lock::Clock;
use crate::repository::report_repo::ShiftReportRepository;
use crate::repository::schedule_repo::{AssignmentRepository, ScheduleRepository};

/// 报告详情
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportDetail {
    pub report: ShiftReport,
    pub items: Vec<ChecklistItem>,
    pub backups: Vec<BackupChecklistItem>,
    pub issues: Vec<ShiftIssue>,
    pub stats: ReportStats,
}

/// 导出的清单行
#[derive(Debug, Serialize)]
struct ChecklistCsvRow<'a> {
    category: &'a str,
    title: &'a str,
    unlock_time: String,
    status: &'static str,
    completed_at: String,
    notes: &'a str,
}

// ==========================================
// ReportApi - 值班报告 API
// ==========================================
pub struct ReportApi {
    report_repo: Arc<ShiftReportRepository>,
    assignment_repo: Arc<AssignmentRepository>,
    schedule_repo: Arc<ScheduleRepository>,
    checklist: Arc<ChecklistEngine>,
    aggregator: ShiftReportAggregator,
    clock: Arc<dyn Clock>,
    audit: AuditRecorder,
}

impl ReportApi {
    pub fn new(
        report_repo: Arc<ShiftReportRepository>,
        assignment_repo: Arc<AssignmentRepository>,
        schedule_repo: Arc<ScheduleRepository>,
        checklist: Arc<ChecklistEngine>,
        clock: Arc<dyn Clock>,
        audit: AuditRecorder,
    ) -> Self {
        let aggregator = ShiftReportAggregator::new(report_repo.clone());
        Self {
            report_repo,
            assignment_repo,
            schedule_repo,
            checklist,
            aggregator,
            clock,
            audit,
        }
    }

    // ==========================================
    // 权限辅助
    // ==========================================

    /// 排班持有人或网点管理者
    fn authorize_assignment(&self, actor: &Actor, assignment: &Assignment, operation: &str) -> ApiResult<()> {
        let schedule = self
            .schedule_repo
            .find_by_id(&assignment.schedule_id)?
            .ok_or_else(|| ApiError::not_found("Schedule", &assignment.schedule_id))?;
        require_self_or_manager(actor, &assignment.staff_id, &schedule.branch_id, operation)
    }

    fn authorized_report(&self, actor: &Actor, report_id: &str, operation: &str) -> ApiResult<ShiftReport> {
        let (report, assignment) = self.checklist.assignment_for_report(report_id)?;
        self.authorize_assignment(actor, &assignment, operation)?;
        Ok(report)
    }

    fn load_report(&self, report_id: &str) -> ApiResult<ShiftReport> {
        self.report_repo
            .find_by_id(report_id)?
            .ok_or_else(|| ApiError::not_found("ShiftReport", report_id))
    }

    // ==========================================
    // 报告
    // ==========================================

    /// 获取或创建排班对应的报告
    ///
    /// 首次创建时按有效模板生成清单项与备份清单; 占位班次不建报告
    pub fn get_or_create_report(&self, actor: &Actor, assignment_id: &str) -> ApiResult<ShiftReport> {
        logged("get_or_create_report", &actor.actor_id, || {
            let assignment = self
                .assignment_repo
                .find_by_id(assignment_id)?
                .ok_or_else(|| ApiError::not_found("Assignment", assignment_id))?;
            self.authorize_assignment(actor, &assignment, "get_or_create_report")?;

            if assignment.shift_type.is_placeholder() {
                return Err(ApiError::ValidationError(format!(
                    "占位班次无值班报告: {}",
                    assignment.shift_type
                )));
            }
            if let Some(existing) = self.report_repo.find_by_assignment(assignment_id)? {
                return Ok(existing);
            }

            let now = self.clock.now_utc();
            let report_id = Uuid::new_v4().to_string();
            let items: Vec<ChecklistItem> = self
                .report_repo
                .list_templates_for_shift(assignment.shift_type)?
                .into_iter()
                .map(|t| ChecklistItem {
                    item_id: Uuid::new_v4().to_string(),
                    report_id: report_id.clone(),
                    category: t.category,
                    title: t.title,
                    description: t.description,
                    order_no: t.order_no,
                    is_required: t.is_required,
                    unlock_time: t.unlock_time,
                    status: ChecklistStatus::Pending,
                    notes: None,
                    completed_at: None,
                    updated_at: now,
                })
                .collect();
            let backups: Vec<BackupChecklistItem> = self
                .report_repo
                .list_backup_templates(true)?
                .into_iter()
                .map(|t| BackupChecklistItem {
                    backup_id: Uuid::new_v4().to_string(),
                    report_id: report_id.clone(),
                    database_name: t.database_name,
                    description: t.description,
                    order_no: t.order_no,
                    is_checked: false,
                    checked_at: None,
                })
                .collect();

            let report = ShiftReport {
                report_id: report_id.clone(),
                assignment_id: assignment_id.to_string(),
                status: derive_status(&items),
                started_at: None,
                completed_at: None,
                summary: None,
                handover_notes: None,
                notes: None,
                created_at: now,
                updated_at: now,
            };

            if let Err(e) = self.report_repo.create_with_children(&report, &items, &backups) {
                // 并发创建: 返回先到者
                if e.is_concurrency_conflict() {
                    if let Some(existing) = self.report_repo.find_by_assignment(assignment_id)? {
                        return Ok(existing);
                    }
                }
                return Err(e.into());
            }

            self.audit.record(
                ActionLog::new(ActionType::CreateReport, &actor.actor_id, "ShiftReport", &report_id)
                    .with_new_value(&report)
                    .with_detail(format!("items={}, backups={}", items.len(), backups.len())),
            );
            info!(
                actor = %actor.actor_id,
                report_id = %report_id,
                assignment_id = %assignment_id,
                items = items.len(),
                "值班报告已创建"
            );
            Ok(report)
        })
    }

    /// 报告详情 (含清单项、备份、问题与统计)
    pub fn get_report_detail(&self, actor: &Actor, report_id: &str) -> ApiResult<ReportDetail> {
        logged("get_report_detail", &actor.actor_id, || {
            let report = self.authorized_report(actor, report_id, "get_report_detail")?;
            let items = self.report_repo.list_items(report_id)?;
            let backups = self.report_repo.list_backups(report_id)?;
            let issues = self.report_repo.list_issues(report_id)?;
            let stats = compute_stats(&items, &backups, &issues);
            Ok(ReportDetail {
                report,
                items,
                backups,
                issues,
                stats,
            })
        })
    }

    pub fn report_stats(&self, actor: &Actor, report_id: &str) -> ApiResult<ReportStats> {
        logged("report_stats", &actor.actor_id, || {
            self.authorized_report(actor, report_id, "report_stats")?;
            Ok(self.aggregator.stats(report_id)?)
        })
    }

    /// 更新报告备注 (不影响状态)
    pub fn update_report_notes(
        &self,
        actor: &Actor,
        report_id: &str,
        summary: Option<String>,
        handover_notes: Option<String>,
        notes: Option<String>,
    ) -> ApiResult<ShiftReport> {
        logged("update_report_notes", &actor.actor_id, || {
            validate_opt_text("summary", summary.as_deref())?;
            validate_opt_text("handover_notes", handover_notes.as_deref())?;
            validate_opt_text("notes", notes.as_deref())?;
            let before = self.authorized_report(actor, report_id, "update_report_notes")?;

            self.report_repo.update_notes(
                report_id,
                summary.as_deref(),
                handover_notes.as_deref(),
                notes.as_deref(),
                self.clock.now_utc(),
            )?;
            let updated = self.load_report(report_id)?;

            self.audit.record(
                ActionLog::new(ActionType::UpdateReport, &actor.actor_id, "ShiftReport", report_id)
                    .with_old_value(&before)
                    .with_new_value(&updated),
            );
            info!(actor = %actor.actor_id, report_id = %report_id, "报告备注已更新");
            Ok(updated)
        })
    }

    // ==========================================
    // 清单项
    // ==========================================

    /// 批量更新清单项 (部分成功)
    pub fn update_checklist_items(
        &self,
        actor: &Actor,
        report_id: &str,
        updates: &[ChecklistUpdate],
    ) -> ApiResult<BatchUpdateResult> {
        logged("update_checklist_items", &actor.actor_id, || {
            if updates.is_empty() {
                return Err(ApiError::ValidationError("清单更新列表不能为空".to_string()));
            }
            for update in updates {
                require_non_empty("item_id", &update.item_id)?;
                validate_opt_text("notes", update.notes.as_deref())?;
            }
            self.authorized_report(actor, report_id, "update_checklist_items")?;

            let outcome = self.checklist.update_items(report_id, updates)?;

            for item in &outcome.result.updated {
                let mut log =
                    ActionLog::new(ActionType::UpdateChecklist, &actor.actor_id, "ChecklistItem", &item.item_id)
                        .with_new_value(item);
                if let Some(before) = outcome.previous_of(&item.item_id) {
                    log = log.with_old_value(before);
                }
                self.audit.record(log);
            }
            info!(
                actor = %actor.actor_id,
                report_id = %report_id,
                updated = outcome.result.updated.len(),
                rejected = outcome.result.errors.len(),
                report_status = %outcome.report.status,
                "清单项批量更新完成"
            );
            Ok(outcome.result)
        })
    }

    /// 更新单个清单项
    ///
    /// # 返回
    /// - Err(ItemLocked): 未到解锁时刻
    pub fn set_checklist_item_status(
        &self,
        actor: &Actor,
        item_id: &str,
        status: ChecklistStatus,
        notes: Option<String>,
    ) -> ApiResult<ChecklistItem> {
        logged("set_checklist_item_status", &actor.actor_id, || {
            validate_opt_text("notes", notes.as_deref())?;
            let before = self
                .report_repo
                .find_item(item_id)?
                .ok_or_else(|| ApiError::not_found("ChecklistItem", item_id))?;
            self.authorized_report(actor, &before.report_id, "set_checklist_item_status")?;

            let (report, updated) = self.checklist.set_status(item_id, status, notes)?;

            self.audit.record(
                ActionLog::new(ActionType::UpdateChecklist, &actor.actor_id, "ChecklistItem", item_id)
                    .with_old_value(&before)
                    .with_new_value(&updated),
            );
            info!(
                actor = %actor.actor_id,
                item_id = %item_id,
                status = %updated.status,
                report_status = %report.status,
                "清单项已更新"
            );
            Ok(updated)
        })
    }

    // ==========================================
    // 备份清单
    // ==========================================

    pub fn set_backup_checked(
        &self,
        actor: &Actor,
        report_id: &str,
        backup_id: &str,
        checked: bool,
    ) -> ApiResult<BackupChecklistItem> {
        logged("set_backup_checked", &actor.actor_id, || {
            self.authorized_report(actor, report_id, "set_backup_checked")?;
            let updated =
                self.report_repo
                    .set_backup_checked(report_id, backup_id, checked, self.clock.now_utc())?;

            self.audit.record(
                ActionLog::new(ActionType::ToggleBackup, &actor.actor_id, "BackupChecklistItem", backup_id)
                    .with_new_value(&updated),
            );
            info!(actor = %actor.actor_id, backup_id = %backup_id, checked, "备份项已勾选");
            Ok(updated)
        })
    }

    // ==========================================
    // 问题记录
    // ==========================================

    pub fn create_issue(
        &self,
        actor: &Actor,
        report_id: &str,
        title: &str,
        description: Option<String>,
        ticket_number: Option<String>,
    ) -> ApiResult<ShiftIssue> {
        logged("create_issue", &actor.actor_id, || {
            require_non_empty("title", title)?;
            validate_max_len("title", title, 200)?;
            validate_opt_text("description", description.as_deref())?;
            validate_opt_text("ticket_number", ticket_number.as_deref())?;
            self.authorized_report(actor, report_id, "create_issue")?;

            let issue = ShiftIssue {
                issue_id: Uuid::new_v4().to_string(),
                report_id: report_id.to_string(),
                title: title.trim().to_string(),
                description,
                status: IssueStatus::Ongoing,
                resolution: None,
                ticket_number,
                created_by: actor.actor_id.clone(),
                created_at: self.clock.now_utc(),
                resolved_at: None,
            };
            self.report_repo.insert_issue(&issue)?;

            self.audit.record(
                ActionLog::new(ActionType::CreateIssue, &actor.actor_id, "ShiftIssue", &issue.issue_id)
                    .with_new_value(&issue),
            );
            info!(actor = %actor.actor_id, issue_id = %issue.issue_id, report_id = %report_id, "问题已记录");
            Ok(issue)
        })
    }

    /// 解决问题 (ONGOING → RESOLVED)
    pub fn resolve_issue(
        &self,
        actor: &Actor,
        issue_id: &str,
        resolution: Option<String>,
    ) -> ApiResult<ShiftIssue> {
        logged("resolve_issue", &actor.actor_id, || {
            validate_opt_text("resolution", resolution.as_deref())?;
            self.transition_issue(actor, issue_id, IssueStatus::Resolved, resolution, "RESOLVE")
        })
    }

    /// 重新打开问题 (RESOLVED → ONGOING)
    pub fn reopen_issue(&self, actor: &Actor, issue_id: &str) -> ApiResult<ShiftIssue> {
        logged("reopen_issue", &actor.actor_id, || {
            self.transition_issue(actor, issue_id, IssueStatus::Ongoing, None, "REOPEN")
        })
    }

    fn transition_issue(
        &self,
        actor: &Actor,
        issue_id: &str,
        target: IssueStatus,
        resolution: Option<String>,
        event: &str,
    ) -> ApiResult<ShiftIssue> {
        let before = self
            .report_repo
            .find_issue(issue_id)?
            .ok_or_else(|| ApiError::not_found("ShiftIssue", issue_id))?;
        self.authorized_report(actor, &before.report_id, "update_issue")?;

        if before.status == target {
            return Err(ApiError::InvalidState {
                from: before.status.to_string(),
                event: event.to_string(),
            });
        }

        let mut updated = before.clone();
        updated.status = target;
        match target {
            IssueStatus::Resolved => {
                updated.resolved_at = Some(self.clock.now_utc());
                if resolution.is_some() {
                    updated.resolution = resolution;
                }
            }
            IssueStatus::Ongoing => updated.resolved_at = None,
        }
        self.report_repo.update_issue(&updated)?;

        self.audit.record(
            ActionLog::new(ActionType::UpdateIssue, &actor.actor_id, "ShiftIssue", issue_id)
                .with_old_value(&before)
                .with_new_value(&updated),
        );
        info!(actor = %actor.actor_id, issue_id = %issue_id, status = %updated.status, "问题状态已更新");
        Ok(updated)
    }

    // ==========================================
    // 模板
    // ==========================================

    /// 写入清单模板 (template_id 为空时新建)
    pub fn upsert_checklist_template(
        &self,
        actor: &Actor,
        template: ChecklistTemplate,
    ) -> ApiResult<ChecklistTemplate> {
        logged("upsert_checklist_template", &actor.actor_id, || {
            require_manager_role(actor, "upsert_checklist_template")?;
            require_non_empty("category", &template.category)?;
            require_non_empty("title", &template.title)?;
            validate_max_len("title", &template.title, 200)?;
            validate_opt_text("description", template.description.as_deref())?;

            let mut template = template;
            if template.template_id.trim().is_empty() {
                template.template_id = Uuid::new_v4().to_string();
            }
            self.report_repo.upsert_checklist_template(&template)?;

            self.audit.record(
                ActionLog::new(ActionType::UpsertTemplate, &actor.actor_id, "ChecklistTemplate", &template.template_id)
                    .with_new_value(&template),
            );
            info!(actor = %actor.actor_id, template_id = %template.template_id, "清单模板已写入");
            Ok(template)
        })
    }

    pub fn list_checklist_templates(&self) -> ApiResult<Vec<ChecklistTemplate>> {
        Ok(self.report_repo.list_checklist_templates()?)
    }

    pub fn upsert_backup_template(
        &self,
        actor: &Actor,
        template: BackupTemplate,
    ) -> ApiResult<BackupTemplate> {
        logged("upsert_backup_template", &actor.actor_id, || {
            require_manager_role(actor, "upsert_backup_template")?;
            require_non_empty("database_name", &template.database_name)?;
            validate_max_len("database_name", &template.database_name, 200)?;

            let mut template = template;
            if template.template_id.trim().is_empty() {
                template.template_id = Uuid::new_v4().to_string();
            }
            self.report_repo.upsert_backup_template(&template)?;

            self.audit.record(
                ActionLog::new(ActionType::UpsertTemplate, &actor.actor_id, "BackupTemplate", &template.template_id)
                    .with_new_value(&template),
            );
            info!(actor = %actor.actor_id, template_id = %template.template_id, "备份模板已写入");
            Ok(template)
        })
    }

    pub fn list_backup_templates(&self, active_only: bool) -> ApiResult<Vec<BackupTemplate>> {
        Ok(self.report_repo.list_backup_templates(active_only)?)
    }

    // ==========================================
    // 导出
    // ==========================================

    /// 导出清单为 CSV
    ///
    /// 列: category, title, unlock_time, status, completed_at, notes
    pub fn export_report_csv(&self, actor: &Actor, report_id: &str) -> ApiResult<String> {
        logged("export_report_csv", &actor.actor_id, || {
            self.authorized_report(actor, report_id, "export_report_csv")?;
            let items = self.report_repo.list_items(report_id)?;

            let mut writer = csv::Writer::from_writer(Vec::new());
            for item in &items {
                writer
                    .serialize(ChecklistCsvRow {
                        category: &item.category,
                        title: &item.title,
                        unlock_time: item
                            .unlock_time
                            .map(|t| t.format("%H:%M").to_string())
                            .unwrap_or_default(),
                        status: item.status.to_db_str(),
                        completed_at: item
                            .completed_at
                            .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
                            .unwrap_or_default(),
                        notes: item.notes.as_deref().unwrap_or(""),
                    })
                    .map_err(|e| ApiError::internal(&e))?;
            }
            if items.is_empty() {
                writer
                    .write_record(["category", "title", "unlock_time", "status", "completed_at", "notes"])
                    .map_err(|e| ApiError::internal(&e))?;
            }

            let bytes = writer.into_inner().map_err(|e| ApiError::internal(&e))?;
            let csv = String::from_utf8(bytes).map_err(|e| ApiError::internal(&e))?;
            info!(actor = %actor.actor_id, report_id = %report_id, rows = items.len(), "清单已导出");
            Ok(csv)
        })
    }
}
