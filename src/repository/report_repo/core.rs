use crate::domain::report::{BackupChecklistItem, ChecklistItem, ShiftReport};
use crate::domain::types::ReportStatus;
use crate::repository::error::{
    conversion_error, fmt_datetime, fmt_time, parse_datetime, parse_opt_datetime,
    RepositoryError, RepositoryResult,
};
use chrono::NaiveDateTime;
use rusqlite::{params, Connection, OptionalExtension};
use std::sync::{Arc, Mutex};

pub(super) const REPORT_COLUMNS: &str = r#"
    report_id, assignment_id, status, started_at, completed_at,
    summary, handover_notes, notes, created_at, updated_at
"#;

// ==========================================
// ShiftReportRepository - 值班报告仓储
// ==========================================
pub struct ShiftReportRepository {
    conn: Arc<Mutex<Connection>>,
}

impl ShiftReportRepository {
    /// 创建新的值班报告仓储
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    /// 获取数据库连接
    pub(super) fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    // ==========================================
    // 写入操作
    // ==========================================

    /// 创建报告及其清单项、备份清单 (单事务)
    ///
    /// # 返回
    /// - Err(UniqueConstraintViolation): 该排班已有报告
    pub fn create_with_children(
        &self,
        report: &ShiftReport,
        items: &[ChecklistItem],
        backups: &[BackupChecklistItem],
    ) -> RepositoryResult<()> {
        let mut conn = self.get_conn()?;
        let tx = conn.transaction()?;

        tx.execute(
            r#"
            INSERT INTO shift_report (
                report_id, assignment_id, status, started_at, completed_at,
                summary, handover_notes, notes, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            "#,
            params![
                report.report_id,
                report.assignment_id,
                report.status.to_db_str(),
                report.started_at.map(fmt_datetime),
                report.completed_at.map(fmt_datetime),
                report.summary,
                report.handover_notes,
                report.notes,
                fmt_datetime(report.created_at),
                fmt_datetime(report.updated_at),
            ],
        )?;

        for item in items {
            tx.execute(
                r#"
                INSERT INTO shift_checklist_item (
                    item_id, report_id, category, title, description, order_no, is_required,
                    unlock_time, status, notes, completed_at, updated_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
                "#,
                params![
                    item.item_id,
                    item.report_id,
                    item.category,
                    item.title,
                    item.description,
                    item.order_no,
                    item.is_required,
                    item.unlock_time.map(fmt_time),
                    item.status.to_db_str(),
                    item.notes,
                    item.completed_at.map(fmt_datetime),
                    fmt_datetime(item.updated_at),
                ],
            )?;
        }

        for backup in backups {
            tx.execute(
                r#"
                INSERT INTO shift_backup_item (
                    backup_id, report_id, database_name, description, order_no, is_checked, checked_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                "#,
                params![
                    backup.backup_id,
                    backup.report_id,
                    backup.database_name,
                    backup.description,
                    backup.order_no,
                    backup.is_checked,
                    backup.checked_at.map(fmt_datetime),
                ],
            )?;
        }

        tx.commit()?;
        Ok(())
    }

    /// 更新报告备注 (不涉及状态)
    pub fn update_notes(
        &self,
        report_id: &str,
        summary: Option<&str>,
        handover_notes: Option<&str>,
        notes: Option<&str>,
        updated_at: NaiveDateTime,
    ) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        let rows = conn.execute(
            "UPDATE shift_report SET summary = ?1, handover_notes = ?2, notes = ?3, updated_at = ?4
             WHERE report_id = ?5",
            params![summary, handover_notes, notes, fmt_datetime(updated_at), report_id],
        )?;
        if rows == 0 {
            return Err(RepositoryError::NotFound {
                entity: "ShiftReport".to_string(),
                id: report_id.to_string(),
            });
        }
        Ok(())
    }

    // ==========================================
    // 查询操作
    // ==========================================

    pub fn find_by_id(&self, report_id: &str) -> RepositoryResult<Option<ShiftReport>> {
        let conn = self.get_conn()?;
        let sql = format!("SELECT {} FROM shift_report WHERE report_id = ?1", REPORT_COLUMNS);
        let report = conn
            .query_row(&sql, params![report_id], map_report_row)
            .optional()?;
        Ok(report)
    }

    pub fn find_by_assignment(&self, assignment_id: &str) -> RepositoryResult<Option<ShiftReport>> {
        let conn = self.get_conn()?;
        let sql = format!(
            "SELECT {} FROM shift_report WHERE assignment_id = ?1",
            REPORT_COLUMNS
        );
        let report = conn
            .query_row(&sql, params![assignment_id], map_report_row)
            .optional()?;
        Ok(report)
    }
}

pub(super) fn map_report_row(row: &rusqlite::Row) -> rusqlite::Result<ShiftReport> {
    let status_str: String = row.get(2)?;
    let status = ReportStatus::from_db_str(&status_str)
        .ok_or_else(|| conversion_error(2, format!("未知报告状态: {}", status_str)))?;
    let created_at: String = row.get(8)?;
    let updated_at: String = row.get(9)?;

    Ok(ShiftReport {
        report_id: row.get(0)?,
        assignment_id: row.get(1)?,
        status,
        started_at: parse_opt_datetime(3, row.get(3)?)?,
        completed_at: parse_opt_datetime(4, row.get(4)?)?,
        summary: row.get(5)?,
        handover_notes: row.get(6)?,
        notes: row.get(7)?,
        created_at: parse_datetime(8, &created_at)?,
        updated_at: parse_datetime(9, &updated_at)?,
    })
}
