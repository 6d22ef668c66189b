use super::core::{map_report_row, ShiftReportRepository, REPORT_COLUMNS};
use crate::domain::report::{ChecklistItem, ShiftReport};
use crate::domain::types::{ChecklistStatus, ReportStatus};
use crate::repository::error::{
    conversion_error, fmt_datetime, parse_datetime, parse_opt_datetime, parse_opt_time,
    RepositoryError, RepositoryResult,
};
use chrono::NaiveDateTime;
use rusqlite::{params, Connection, OptionalExtension};

const ITEM_COLUMNS: &str = r#"
    item_id, report_id, category, title, description, order_no, is_required,
    unlock_time, status, notes, completed_at, updated_at
"#;

impl ShiftReportRepository {
    // ==========================================
    // 清单项
    // ==========================================

    /// 查询报告的全部清单项 (按 order_no 排序)
    pub fn list_items(&self, report_id: &str) -> RepositoryResult<Vec<ChecklistItem>> {
        let conn = self.get_conn()?;
        load_items(&conn, report_id)
    }

    pub fn find_item(&self, item_id: &str) -> RepositoryResult<Option<ChecklistItem>> {
        let conn = self.get_conn()?;
        let sql = format!(
            "SELECT {} FROM shift_checklist_item WHERE item_id = ?1",
            ITEM_COLUMNS
        );
        let item = conn
            .query_row(&sql, params![item_id], map_item_row)
            .optional()?;
        Ok(item)
    }

    /// 保存清单项变更并重算报告状态 (单事务)
    ///
    /// 报告状态由 `derive_status` 基于事务内最新的全部清单项计算:
    /// - started_at: 首次离开 DRAFT 时写入, 之后保持
    /// - completed_at: 进入 COMPLETED 时写入, 离开时清空
    ///
    /// # 返回
    /// - Ok(ShiftReport): 更新后的报告
    pub fn save_checklist_updates<F>(
        &self,
        report_id: &str,
        items: &[ChecklistItem],
        now: NaiveDateTime,
        derive_status: F,
    ) -> RepositoryResult<ShiftReport>
    where
        F: FnOnce(&[ChecklistItem]) -> ReportStatus,
    {
        let mut conn = self.get_conn()?;
        let tx = conn.transaction()?;

        for item in items {
            let rows = tx.execute(
                "UPDATE shift_checklist_item
                 SET status = ?1, notes = ?2, completed_at = ?3, updated_at = ?4
                 WHERE item_id = ?5 AND report_id = ?6",
                params![
                    item.status.to_db_str(),
                    item.notes,
                    item.completed_at.map(fmt_datetime),
                    fmt_datetime(item.updated_at),
                    item.item_id,
                    report_id,
                ],
            )?;
            if rows == 0 {
                return Err(RepositoryError::NotFound {
                    entity: "ChecklistItem".to_string(),
                    id: item.item_id.clone(),
                });
            }
        }

        let all_items = load_items(&tx, report_id)?;
        let status = derive_status(&all_items);

        let sql = format!("SELECT {} FROM shift_report WHERE report_id = ?1", REPORT_COLUMNS);
        let mut report = tx
            .query_row(&sql, params![report_id], map_report_row)
            .optional()?
            .ok_or_else(|| RepositoryError::NotFound {
                entity: "ShiftReport".to_string(),
                id: report_id.to_string(),
            })?;

        if status != ReportStatus::Draft && report.started_at.is_none() {
            report.started_at = Some(now);
        }
        report.completed_at = match status {
            ReportStatus::Completed => report.completed_at.or(Some(now)),
            _ => None,
        };
        report.status = status;
        report.updated_at = now;

        tx.execute(
            "UPDATE shift_report SET status = ?1, started_at = ?2, completed_at = ?3, updated_at = ?4
             WHERE report_id = ?5",
            params![
                report.status.to_db_str(),
                report.started_at.map(fmt_datetime),
                report.completed_at.map(fmt_datetime),
                fmt_datetime(report.updated_at),
                report_id,
            ],
        )?;

        tx.commit()?;
        Ok(report)
    }
}

fn load_items(conn: &Connection, report_id: &str) -> RepositoryResult<Vec<ChecklistItem>> {
    let sql = format!(
        "SELECT {} FROM shift_checklist_item WHERE report_id = ?1 ORDER BY order_no, item_id",
        ITEM_COLUMNS
    );
    let mut stmt = conn.prepare(&sql)?;
    let items = stmt
        .query_map(params![report_id], map_item_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(items)
}

fn map_item_row(row: &rusqlite::Row) -> rusqlite::Result<ChecklistItem> {
    let status_str: String = row.get(8)?;
    let status = ChecklistStatus::from_db_str(&status_str)
        .ok_or_else(|| conversion_error(8, format!("未知清单状态: {}", status_str)))?;
    let updated_at: String = row.get(11)?;

    Ok(ChecklistItem {
        item_id: row.get(0)?,
        report_id: row.get(1)?,
        category: row.get(2)?,
        title: row.get(3)?,
        description: row.get(4)?,
        order_no: row.get(5)?,
        is_required: row.get(6)?,
        unlock_time: parse_opt_time(7, row.get(7)?)?,
        status,
        notes: row.get(9)?,
        completed_at: parse_opt_datetime(10, row.get(10)?)?,
        updated_at: parse_datetime(11, &updated_at)?,
    })
}
