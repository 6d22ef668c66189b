use super::core::ShiftReportRepository;
use crate::domain::report::{BackupChecklistItem, ShiftIssue};
use crate::domain::types::IssueStatus;
use crate::repository::error::{
    conversion_error, fmt_datetime, parse_datetime, parse_opt_datetime, RepositoryError,
    RepositoryResult,
};
use chrono::NaiveDateTime;
use rusqlite::{params, OptionalExtension};

const BACKUP_COLUMNS: &str =
    "backup_id, report_id, database_name, description, order_no, is_checked, checked_at";

const ISSUE_COLUMNS: &str = r#"
    issue_id, report_id, title, description, status, resolution, ticket_number,
    created_by, created_at, resolved_at
"#;

impl ShiftReportRepository {
    // ==========================================
    // 备份清单
    // ==========================================

    pub fn list_backups(&self, report_id: &str) -> RepositoryResult<Vec<BackupChecklistItem>> {
        let conn = self.get_conn()?;
        let sql = format!(
            "SELECT {} FROM shift_backup_item WHERE report_id = ?1 ORDER BY order_no, backup_id",
            BACKUP_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let backups = stmt
            .query_map(params![report_id], map_backup_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(backups)
    }

    /// 勾选/取消勾选备份项
    ///
    /// 勾选时写入 checked_at, 取消时清空
    pub fn set_backup_checked(
        &self,
        report_id: &str,
        backup_id: &str,
        checked: bool,
        at: NaiveDateTime,
    ) -> RepositoryResult<BackupChecklistItem> {
        let conn = self.get_conn()?;
        let checked_at = if checked { Some(fmt_datetime(at)) } else { None };
        let rows = conn.execute(
            "UPDATE shift_backup_item SET is_checked = ?1, checked_at = ?2
             WHERE backup_id = ?3 AND report_id = ?4",
            params![checked, checked_at, backup_id, report_id],
        )?;
        if rows == 0 {
            return Err(RepositoryError::NotFound {
                entity: "BackupChecklistItem".to_string(),
                id: backup_id.to_string(),
            });
        }

        let sql = format!(
            "SELECT {} FROM shift_backup_item WHERE backup_id = ?1",
            BACKUP_COLUMNS
        );
        Ok(conn.query_row(&sql, params![backup_id], map_backup_row)?)
    }

    // ==========================================
    // 问题记录
    // ==========================================

    pub fn insert_issue(&self, issue: &ShiftIssue) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            r#"
            INSERT INTO shift_issue (
                issue_id, report_id, title, description, status, resolution, ticket_number,
                created_by, created_at, resolved_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            "#,
            params![
                issue.issue_id,
                issue.report_id,
                issue.title,
                issue.description,
                issue.status.to_db_str(),
                issue.resolution,
                issue.ticket_number,
                issue.created_by,
                fmt_datetime(issue.created_at),
                issue.resolved_at.map(fmt_datetime),
            ],
        )?;
        Ok(())
    }

    pub fn find_issue(&self, issue_id: &str) -> RepositoryResult<Option<ShiftIssue>> {
        let conn = self.get_conn()?;
        let sql = format!("SELECT {} FROM shift_issue WHERE issue_id = ?1", ISSUE_COLUMNS);
        let issue = conn
            .query_row(&sql, params![issue_id], map_issue_row)
            .optional()?;
        Ok(issue)
    }

    pub fn list_issues(&self, report_id: &str) -> RepositoryResult<Vec<ShiftIssue>> {
        let conn = self.get_conn()?;
        let sql = format!(
            "SELECT {} FROM shift_issue WHERE report_id = ?1 ORDER BY created_at, issue_id",
            ISSUE_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let issues = stmt
            .query_map(params![report_id], map_issue_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(issues)
    }

    /// 更新问题状态/处理结果
    pub fn update_issue(&self, issue: &ShiftIssue) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        let rows = conn.execute(
            "UPDATE shift_issue SET title = ?1, description = ?2, status = ?3, resolution = ?4,
                 ticket_number = ?5, resolved_at = ?6
             WHERE issue_id = ?7",
            params![
                issue.title,
                issue.description,
                issue.status.to_db_str(),
                issue.resolution,
                issue.ticket_number,
                issue.resolved_at.map(fmt_datetime),
                issue.issue_id,
            ],
        )?;
        if rows == 0 {
            return Err(RepositoryError::NotFound {
                entity: "ShiftIssue".to_string(),
                id: issue.issue_id.clone(),
            });
        }
        Ok(())
    }
}

fn map_backup_row(row: &rusqlite::Row) -> rusqlite::Result<BackupChecklistItem> {
    Ok(BackupChecklistItem {
        backup_id: row.get(0)?,
        report_id: row.get(1)?,
        database_name: row.get(2)?,
        description: row.get(3)?,
        order_no: row.get(4)?,
        is_checked: row.get(5)?,
        checked_at: parse_opt_datetime(6, row.get(6)?)?,
    })
}

fn map_issue_row(row: &rusqlite::Row) -> rusqlite::Result<ShiftIssue> {
    let status_str: String = row.get(4)?;
    let status = IssueStatus::from_db_str(&status_str)
        .ok_or_else(|| conversion_error(4, format!("未知问题状态: {}", status_str)))?;
    let created_at: String = row.get(8)?;

    Ok(ShiftIssue {
        issue_id: row.get(0)?,
        report_id: row.get(1)?,
        title: row.get(2)?,
        description: row.get(3)?,
        status,
        resolution: row.get(5)?,
        ticket_number: row.get(6)?,
        created_by: row.get(7)?,
        created_at: parse_datetime(8, &created_at)?,
        resolved_at: parse_opt_datetime(9, row.get(9)?)?,
    })
}
