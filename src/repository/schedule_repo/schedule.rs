use super::ensure_schedule_draft;
use crate::domain::schedule::Schedule;
use crate::domain::types::ScheduleStatus;
use crate::repository::error::{
    conversion_error, fmt_datetime, parse_datetime, parse_opt_datetime, RepositoryError,
    RepositoryResult,
};
use chrono::NaiveDateTime;
use rusqlite::{params, Connection, OptionalExtension};
use std::sync::{Arc, Mutex};

const SCHEDULE_COLUMNS: &str =
    "schedule_id, branch_id, year, month, status, published_at, published_by, created_at";

// ==========================================
// ScheduleRepository - 月度排班表仓储
// ==========================================
pub struct ScheduleRepository {
    conn: Arc<Mutex<Connection>>,
}

impl ScheduleRepository {
    /// 创建新的ScheduleRepository实例
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 创建排班表
    ///
    /// # 返回
    /// - Err(UniqueConstraintViolation): (branch_id, year, month) 已存在
    pub fn insert(&self, schedule: &Schedule) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            r#"
            INSERT INTO shift_schedule (
                schedule_id, branch_id, year, month, status, published_at, published_by, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
            params![
                schedule.schedule_id,
                schedule.branch_id,
                schedule.year,
                schedule.month,
                schedule.status.to_db_str(),
                schedule.published_at.map(fmt_datetime),
                schedule.published_by,
                fmt_datetime(schedule.created_at),
            ],
        )?;
        Ok(())
    }

    pub fn find_by_id(&self, schedule_id: &str) -> RepositoryResult<Option<Schedule>> {
        let conn = self.get_conn()?;
        let sql = format!(
            "SELECT {} FROM shift_schedule WHERE schedule_id = ?1",
            SCHEDULE_COLUMNS
        );
        let schedule = conn
            .query_row(&sql, params![schedule_id], map_schedule_row)
            .optional()?;
        Ok(schedule)
    }

    /// 按作用域 (网点, 年, 月) 查询
    pub fn find_by_scope(
        &self,
        branch_id: &str,
        year: i32,
        month: u32,
    ) -> RepositoryResult<Option<Schedule>> {
        let conn = self.get_conn()?;
        let sql = format!(
            "SELECT {} FROM shift_schedule WHERE branch_id = ?1 AND year = ?2 AND month = ?3",
            SCHEDULE_COLUMNS
        );
        let schedule = conn
            .query_row(&sql, params![branch_id, year, month], map_schedule_row)
            .optional()?;
        Ok(schedule)
    }

    pub fn list_by_branch(&self, branch_id: &str) -> RepositoryResult<Vec<Schedule>> {
        let conn = self.get_conn()?;
        let sql = format!(
            "SELECT {} FROM shift_schedule WHERE branch_id = ?1 ORDER BY year DESC, month DESC",
            SCHEDULE_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let schedules = stmt
            .query_map(params![branch_id], map_schedule_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(schedules)
    }

    /// 发布排班表 (DRAFT → PUBLISHED)
    ///
    /// # 返回
    /// - Ok(true): 状态已变更
    /// - Ok(false): 排班表已是 PUBLISHED, 未做任何修改
    /// - Err(NotFound): 排班表不存在
    pub fn publish(
        &self,
        schedule_id: &str,
        published_by: &str,
        published_at: NaiveDateTime,
    ) -> RepositoryResult<bool> {
        let conn = self.get_conn()?;
        let rows = conn.execute(
            "UPDATE shift_schedule SET status = 'PUBLISHED', published_at = ?1, published_by = ?2
             WHERE schedule_id = ?3 AND status = 'DRAFT'",
            params![fmt_datetime(published_at), published_by, schedule_id],
        )?;

        if rows == 1 {
            return Ok(true);
        }

        let exists: Option<i64> = conn
            .query_row(
                "SELECT 1 FROM shift_schedule WHERE schedule_id = ?1",
                params![schedule_id],
                |row| row.get(0),
            )
            .optional()?;
        match exists {
            Some(_) => Ok(false),
            None => Err(RepositoryError::NotFound {
                entity: "Schedule".to_string(),
                id: schedule_id.to_string(),
            }),
        }
    }

    /// 删除草稿排班表
    ///
    /// 事务内依次删除: 报告 (清单/备份/问题随报告级联) → 换班申请 → 排班表
    /// (排班/节假日/待命随排班表级联)
    ///
    /// # 返回
    /// - Err(ScheduleLocked): 排班表已发布
    /// - Err(NotFound): 排班表不存在
    pub fn delete_draft(&self, schedule_id: &str) -> RepositoryResult<()> {
        let mut conn = self.get_conn()?;
        let tx = conn.transaction()?;

        ensure_schedule_draft(&tx, schedule_id)?;

        tx.execute(
            "DELETE FROM shift_report WHERE assignment_id IN (
                SELECT assignment_id FROM shift_assignment WHERE schedule_id = ?1
             )",
            params![schedule_id],
        )?;
        tx.execute(
            "DELETE FROM shift_swap_request WHERE schedule_id = ?1",
            params![schedule_id],
        )?;
        tx.execute(
            "DELETE FROM shift_schedule WHERE schedule_id = ?1",
            params![schedule_id],
        )?;

        tx.commit()?;
        Ok(())
    }
}

fn map_schedule_row(row: &rusqlite::Row) -> rusqlite::Result<Schedule> {
    let status_str: String = row.get(4)?;
    let status = ScheduleStatus::from_db_str(&status_str)
        .ok_or_else(|| conversion_error(4, format!("未知排班表状态: {}", status_str)))?;
    let published_at: Option<String> = row.get(5)?;
    let created_at: String = row.get(7)?;

    Ok(Schedule {
        schedule_id: row.get(0)?,
        branch_id: row.get(1)?,
        year: row.get(2)?,
        month: row.get(3)?,
        status,
        published_at: parse_opt_datetime(5, published_at)?,
        published_by: row.get(6)?,
        created_at: parse_datetime(7, &created_at)?,
    })
}
