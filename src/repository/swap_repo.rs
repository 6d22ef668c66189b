// ==========================================
// 值班排班系统 - 换班申请数据仓储
// ==========================================
// 红线: Repository 不含业务逻辑 (状态转换由 domain::swap::transition 决定)
// 并发: revision 乐观锁
// ==========================================

use crate::domain::swap::SwapRequest;
use crate::domain::types::{SwapStatus, SwapType};
use crate::repository::error::{
    conversion_error, fmt_date, fmt_datetime, parse_date, parse_datetime, parse_opt_datetime,
    RepositoryError, RepositoryResult,
};
use rusqlite::{params, Connection, OptionalExtension};
use std::sync::{Arc, Mutex};

const SWAP_COLUMNS: &str = r#"
    request_id, schedule_id, initiator_staff_id, recipient_staff_id, assignment_id,
    proposed_date, reason, swap_type, status, recipient_response, responded_at,
    manager_notes, applied_by, applied_at, cancelled_by, cancelled_at, created_at, revision
"#;

// ==========================================
// SwapRequestRepository - 换班申请仓储
// ==========================================
pub struct SwapRequestRepository {
    conn: Arc<Mutex<Connection>>,
}

impl SwapRequestRepository {
    /// 创建新的SwapRequestRepository实例
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 创建换班申请
    pub fn insert(&self, request: &SwapRequest) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            r#"
            INSERT INTO shift_swap_request (
                request_id, schedule_id, initiator_staff_id, recipient_staff_id, assignment_id,
                proposed_date, reason, swap_type, status, recipient_response, responded_at,
                manager_notes, applied_by, applied_at, cancelled_by, cancelled_at, created_at, revision
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18)
            "#,
            params![
                request.request_id,
                request.schedule_id,
                request.initiator_staff_id,
                request.recipient_staff_id,
                request.assignment_id,
                request.proposed_date.map(fmt_date),
                request.reason,
                request.swap_type.to_db_str(),
                request.status.to_db_str(),
                request.recipient_response,
                request.responded_at.map(fmt_datetime),
                request.manager_notes,
                request.applied_by,
                request.applied_at.map(fmt_datetime),
                request.cancelled_by,
                request.cancelled_at.map(fmt_datetime),
                fmt_datetime(request.created_at),
                request.revision,
            ],
        )?;
        Ok(())
    }

    pub fn find_by_id(&self, request_id: &str) -> RepositoryResult<Option<SwapRequest>> {
        let conn = self.get_conn()?;
        let sql = format!(
            "SELECT {} FROM shift_swap_request WHERE request_id = ?1",
            SWAP_COLUMNS
        );
        let request = conn
            .query_row(&sql, params![request_id], map_swap_row)
            .optional()?;
        Ok(request)
    }

    /// 查询排班表内的换班申请
    ///
    /// # 参数
    /// - status: None 表示全部状态
    pub fn list_by_schedule(
        &self,
        schedule_id: &str,
        status: Option<SwapStatus>,
    ) -> RepositoryResult<Vec<SwapRequest>> {
        let conn = self.get_conn()?;
        let sql = format!(
            "SELECT {} FROM shift_swap_request
             WHERE schedule_id = ?1 AND (?2 IS NULL OR status = ?2)
             ORDER BY created_at DESC",
            SWAP_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let requests = stmt
            .query_map(
                params![schedule_id, status.map(|s| s.to_db_str())],
                map_swap_row,
            )?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(requests)
    }

    /// 查询人员发起或收到的换班申请
    pub fn list_by_staff(&self, staff_id: &str) -> RepositoryResult<Vec<SwapRequest>> {
        let conn = self.get_conn()?;
        let sql = format!(
            "SELECT {} FROM shift_swap_request
             WHERE initiator_staff_id = ?1 OR recipient_staff_id = ?1
             ORDER BY created_at DESC",
            SWAP_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let requests = stmt
            .query_map(params![staff_id], map_swap_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(requests)
    }

    /// 更新换班申请 (带修订号检查)
    ///
    /// `request.revision` 为读取时的修订号; 成功后数据库修订号 +1
    ///
    /// # 返回
    /// - Err(OptimisticLockFailure): 修订号不匹配 (其他请求已更新)
    /// - Err(NotFound): 申请不存在
    pub fn update(&self, request: &SwapRequest) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        let rows = conn.execute(
            r#"
            UPDATE shift_swap_request SET
                status = ?1, recipient_response = ?2, responded_at = ?3, manager_notes = ?4,
                applied_by = ?5, applied_at = ?6, cancelled_by = ?7, cancelled_at = ?8,
                revision = revision + 1
            WHERE request_id = ?9 AND revision = ?10
            "#,
            params![
                request.status.to_db_str(),
                request.recipient_response,
                request.responded_at.map(fmt_datetime),
                request.manager_notes,
                request.applied_by,
                request.applied_at.map(fmt_datetime),
                request.cancelled_by,
                request.cancelled_at.map(fmt_datetime),
                request.request_id,
                request.revision,
            ],
        )?;

        if rows == 0 {
            let actual: Option<i32> = conn
                .query_row(
                    "SELECT revision FROM shift_swap_request WHERE request_id = ?1",
                    params![request.request_id],
                    |row| row.get(0),
                )
                .optional()?;
            return Err(match actual {
                Some(actual) => RepositoryError::OptimisticLockFailure {
                    entity: "SwapRequest".to_string(),
                    id: request.request_id.clone(),
                    expected: request.revision,
                    actual,
                },
                None => RepositoryError::NotFound {
                    entity: "SwapRequest".to_string(),
                    id: request.request_id.clone(),
                },
            });
        }

        Ok(())
    }
}

fn map_swap_row(row: &rusqlite::Row) -> rusqlite::Result<SwapRequest> {
    let proposed_date: Option<String> = row.get(5)?;
    let swap_type_str: String = row.get(7)?;
    let swap_type = SwapType::from_db_str(&swap_type_str)
        .ok_or_else(|| conversion_error(7, format!("未知换班类型: {}", swap_type_str)))?;
    let status_str: String = row.get(8)?;
    let status = SwapStatus::from_db_str(&status_str)
        .ok_or_else(|| conversion_error(8, format!("未知换班状态: {}", status_str)))?;
    let created_at: String = row.get(16)?;

    Ok(SwapRequest {
        request_id: row.get(0)?,
        schedule_id: row.get(1)?,
        initiator_staff_id: row.get(2)?,
        recipient_staff_id: row.get(3)?,
        assignment_id: row.get(4)?,
        proposed_date: proposed_date.map(|s| parse_date(5, &s)).transpose()?,
        reason: row.get(6)?,
        swap_type,
        status,
        recipient_response: row.get(9)?,
        responded_at: parse_opt_datetime(10, row.get(10)?)?,
        manager_notes: row.get(11)?,
        applied_by: row.get(12)?,
        applied_at: parse_opt_datetime(13, row.get(13)?)?,
        cancelled_by: row.get(14)?,
        cancelled_at: parse_opt_datetime(15, row.get(15)?)?,
        created_at: parse_datetime(16, &created_at)?,
        revision: row.get(17)?,
    })
}
