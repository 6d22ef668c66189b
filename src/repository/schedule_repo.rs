// ==========================================
// 值班排班系统 - 排班表数据仓储
// ==========================================
// 红线: Repository 不含业务逻辑
// 红线: 多记录写入必须在单个事务内完成
// ==========================================
// 说明: 写事务内复核排班表仍为 DRAFT, 防止读取与写入之间被发布
// ==========================================

mod assignment;
mod calendar;
mod schedule;

#[cfg(test)]
mod tests;

pub use assignment::{AssignmentRepository, RevisionRef, SlotMove, SwapFinalize};
pub use calendar::CalendarRepository;
pub use schedule::ScheduleRepository;

use crate::repository::error::{RepositoryError, RepositoryResult};
use rusqlite::{params, Connection, OptionalExtension};

/// 事务内复核排班表状态
///
/// # 返回
/// - Err(NotFound): 排班表不存在
/// - Err(ScheduleLocked): 排班表已发布
pub(crate) fn ensure_schedule_draft(conn: &Connection, schedule_id: &str) -> RepositoryResult<()> {
    let status: Option<String> = conn
        .query_row(
            "SELECT status FROM shift_schedule WHERE schedule_id = ?1",
            params![schedule_id],
            |row| row.get(0),
        )
        .optional()?;

    match status.as_deref() {
        None => Err(RepositoryError::NotFound {
            entity: "Schedule".to_string(),
            id: schedule_id.to_string(),
        }),
        Some("DRAFT") => Ok(()),
        Some(_) => Err(RepositoryError::ScheduleLocked {
            schedule_id: schedule_id.to_string(),
        }),
    }
}
