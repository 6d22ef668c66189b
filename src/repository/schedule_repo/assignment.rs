use super::ensure_schedule_draft;
use crate::domain::schedule::Assignment;
use crate::domain::types::ShiftType;
use crate::repository::error::{
    conversion_error, fmt_date, fmt_datetime, parse_date, parse_datetime, RepositoryError,
    RepositoryResult,
};
use chrono::{NaiveDate, NaiveDateTime};
use rusqlite::{params, Connection, OptionalExtension};
use std::sync::{Arc, Mutex};

const ASSIGNMENT_COLUMNS: &str =
    "assignment_id, schedule_id, staff_id, date, shift_type, revision, updated_at";

// ==========================================
// 事务写入计划
// ==========================================

/// 记录引用 + 读取时的修订号
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RevisionRef {
    pub id: String,
    pub revision: i32,
}

impl RevisionRef {
    pub fn of(assignment: &Assignment) -> Self {
        Self {
            id: assignment.assignment_id.clone(),
            revision: assignment.revision,
        }
    }
}

/// 一次改派: 排班换人, 并可选删除目标人员当天的占位排班
#[derive(Debug, Clone)]
pub struct SlotMove {
    pub assignment: RevisionRef,
    pub new_staff_id: String,
    pub superseded: Option<RevisionRef>,
}

/// 换班生效时与改派同事务落库的申请状态
#[derive(Debug, Clone)]
pub struct SwapFinalize {
    pub request_id: String,
    pub expected_revision: i32,
    pub applied_by: String,
    pub applied_at: NaiveDateTime,
    pub manager_notes: Option<String>,
}

// ==========================================
// AssignmentRepository - 排班记录仓储
// ==========================================
// 红线: 每个 (schedule_id, staff_id, date) 至多一条 (UNIQUE 约束兜底)
pub struct AssignmentRepository {
    conn: Arc<Mutex<Connection>>,
}

impl AssignmentRepository {
    /// 创建新的AssignmentRepository实例
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    // ==========================================
    // 查询
    // ==========================================

    pub fn find_by_id(&self, assignment_id: &str) -> RepositoryResult<Option<Assignment>> {
        let conn = self.get_conn()?;
        let sql = format!(
            "SELECT {} FROM shift_assignment WHERE assignment_id = ?1",
            ASSIGNMENT_COLUMNS
        );
        let assignment = conn
            .query_row(&sql, params![assignment_id], map_assignment_row)
            .optional()?;
        Ok(assignment)
    }

    /// 查询人员某日的排班 (唯一)
    pub fn find_by_staff_date(
        &self,
        schedule_id: &str,
        staff_id: &str,
        date: NaiveDate,
    ) -> RepositoryResult<Option<Assignment>> {
        let conn = self.get_conn()?;
        let sql = format!(
            "SELECT {} FROM shift_assignment
             WHERE schedule_id = ?1 AND staff_id = ?2 AND date = ?3",
            ASSIGNMENT_COLUMNS
        );
        let assignment = conn
            .query_row(
                &sql,
                params![schedule_id, staff_id, fmt_date(date)],
                map_assignment_row,
            )
            .optional()?;
        Ok(assignment)
    }

    /// 查询排班表全部排班 (按日期, 人员排序)
    pub fn list_by_schedule(&self, schedule_id: &str) -> RepositoryResult<Vec<Assignment>> {
        let conn = self.get_conn()?;
        let sql = format!(
            "SELECT {} FROM shift_assignment WHERE schedule_id = ?1 ORDER BY date, staff_id",
            ASSIGNMENT_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let assignments = stmt
            .query_map(params![schedule_id], map_assignment_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(assignments)
    }

    /// 查询人员在排班表内的全部排班
    pub fn list_by_staff(
        &self,
        schedule_id: &str,
        staff_id: &str,
    ) -> RepositoryResult<Vec<Assignment>> {
        let conn = self.get_conn()?;
        let sql = format!(
            "SELECT {} FROM shift_assignment WHERE schedule_id = ?1 AND staff_id = ?2 ORDER BY date",
            ASSIGNMENT_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let assignments = stmt
            .query_map(params![schedule_id, staff_id], map_assignment_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(assignments)
    }

    // ==========================================
    // 事务写入
    // ==========================================

    /// 新增排班, 并可选删除同一人员当天的占位排班
    ///
    /// 删除与插入在同一事务内: 任一步失败则全部回滚
    pub fn insert_with_supersede(
        &self,
        assignment: &Assignment,
        superseded: Option<&RevisionRef>,
    ) -> RepositoryResult<()> {
        let mut conn = self.get_conn()?;
        let tx = conn.transaction()?;

        ensure_schedule_draft(&tx, &assignment.schedule_id)?;

        if let Some(old) = superseded {
            delete_with_revision(&tx, old)?;
        }

        tx.execute(
            r#"
            INSERT INTO shift_assignment (
                assignment_id, schedule_id, staff_id, date, shift_type, revision, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
            params![
                assignment.assignment_id,
                assignment.schedule_id,
                assignment.staff_id,
                fmt_date(assignment.date),
                assignment.shift_type.to_db_str(),
                assignment.revision,
                fmt_datetime(assignment.updated_at),
            ],
        )?;

        tx.commit()?;
        Ok(())
    }

    /// 执行一组改派 (可选同时将换班申请置为 APPLIED)
    ///
    /// 顺序: 复核 DRAFT → 删除被取代的占位排班 → 逐条换人 → 换班申请落库 → 提交
    ///
    /// # 返回
    /// - Ok(Vec<Assignment>): 改派后的排班 (与 moves 顺序一致)
    /// - Err(OptimisticLockFailure): 任一记录在读取后已被修改
    /// - Err(UniqueConstraintViolation): 目标人员当天已有排班
    pub fn apply_moves(
        &self,
        schedule_id: &str,
        moves: &[SlotMove],
        finalize: Option<&SwapFinalize>,
        now: NaiveDateTime,
    ) -> RepositoryResult<Vec<Assignment>> {
        let mut conn = self.get_conn()?;
        let tx = conn.transaction()?;

        ensure_schedule_draft(&tx, schedule_id)?;

        for m in moves {
            if let Some(old) = &m.superseded {
                delete_with_revision(&tx, old)?;
            }
        }

        for m in moves {
            let rows = tx.execute(
                "UPDATE shift_assignment
                 SET staff_id = ?1, revision = revision + 1, updated_at = ?2
                 WHERE assignment_id = ?3 AND revision = ?4 AND schedule_id = ?5",
                params![
                    m.new_staff_id,
                    fmt_datetime(now),
                    m.assignment.id,
                    m.assignment.revision,
                    schedule_id,
                ],
            )?;
            if rows == 0 {
                return Err(revision_mismatch(&tx, &m.assignment)?);
            }
        }

        if let Some(f) = finalize {
            let rows = tx.execute(
                "UPDATE shift_swap_request
                 SET status = 'APPLIED', applied_by = ?1, applied_at = ?2,
                     manager_notes = COALESCE(?3, manager_notes), revision = revision + 1
                 WHERE request_id = ?4 AND revision = ?5 AND status = 'ACCEPTED'",
                params![
                    f.applied_by,
                    fmt_datetime(f.applied_at),
                    f.manager_notes,
                    f.request_id,
                    f.expected_revision,
                ],
            )?;
            if rows == 0 {
                let actual: Option<i32> = tx
                    .query_row(
                        "SELECT revision FROM shift_swap_request WHERE request_id = ?1",
                        params![f.request_id],
                        |row| row.get(0),
                    )
                    .optional()?;
                return Err(RepositoryError::OptimisticLockFailure {
                    entity: "SwapRequest".to_string(),
                    id: f.request_id.clone(),
                    expected: f.expected_revision,
                    actual: actual.unwrap_or(-1),
                });
            }
        }

        let sql = format!(
            "SELECT {} FROM shift_assignment WHERE assignment_id = ?1",
            ASSIGNMENT_COLUMNS
        );
        let mut updated = Vec::with_capacity(moves.len());
        for m in moves {
            updated.push(tx.query_row(&sql, params![m.assignment.id], map_assignment_row)?);
        }

        tx.commit()?;
        Ok(updated)
    }

    /// 删除草稿排班 (连同其值班报告)
    pub fn delete_draft(&self, assignment: &RevisionRef, schedule_id: &str) -> RepositoryResult<()> {
        let mut conn = self.get_conn()?;
        let tx = conn.transaction()?;

        ensure_schedule_draft(&tx, schedule_id)?;
        tx.execute(
            "DELETE FROM shift_report WHERE assignment_id = ?1",
            params![assignment.id],
        )?;
        delete_with_revision(&tx, assignment)?;

        tx.commit()?;
        Ok(())
    }
}

/// 按修订号删除排班
fn delete_with_revision(conn: &Connection, target: &RevisionRef) -> RepositoryResult<()> {
    let rows = conn.execute(
        "DELETE FROM shift_assignment WHERE assignment_id = ?1 AND revision = ?2",
        params![target.id, target.revision],
    )?;
    if rows == 0 {
        return Err(revision_mismatch(conn, target)?);
    }
    Ok(())
}

/// 判断零行更新是记录不存在还是修订号冲突
fn revision_mismatch(conn: &Connection, target: &RevisionRef) -> RepositoryResult<RepositoryError> {
    let actual: Option<i32> = conn
        .query_row(
            "SELECT revision FROM shift_assignment WHERE assignment_id = ?1",
            params![target.id],
            |row| row.get(0),
        )
        .optional()?;

    // 读取后被删除 (actual=-1) 同样视为并发冲突, 由上层重读
    Ok(RepositoryError::OptimisticLockFailure {
        entity: "Assignment".to_string(),
        id: target.id.clone(),
        expected: target.revision,
        actual: actual.unwrap_or(-1),
    })
}

pub(super) fn map_assignment_row(row: &rusqlite::Row) -> rusqlite::Result<Assignment> {
    let date: String = row.get(3)?;
    let shift_type_str: String = row.get(4)?;
    let shift_type = ShiftType::from_db_str(&shift_type_str)
        .ok_or_else(|| conversion_error(4, format!("未知班次类型: {}", shift_type_str)))?;
    let updated_at: String = row.get(6)?;

    Ok(Assignment {
        assignment_id: row.get(0)?,
        schedule_id: row.get(1)?,
        staff_id: row.get(2)?,
        date: parse_date(3, &date)?,
        shift_type,
        revision: row.get(5)?,
        updated_at: parse_datetime(6, &updated_at)?,
    })
}
