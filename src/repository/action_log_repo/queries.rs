use super::core::ActionLogRepository;
use crate::domain::action_log::ActionLog;
use crate::repository::error::{fmt_datetime, parse_datetime, RepositoryResult};
use chrono::NaiveDateTime;
use rusqlite::{params, OptionalExtension, Params, Result as SqliteResult, Row};

const SELECT_COLUMNS: &str = "SELECT action_id, action_type, action_ts, actor, entity_type, entity_id,
            old_value_json, new_value_json, detail
     FROM action_log";

// ==========================================
// 审计追溯查询 (均按时间倒序)
// ==========================================
impl ActionLogRepository {
    pub fn find_by_id(&self, action_id: &str) -> RepositoryResult<Option<ActionLog>> {
        let conn = self.get_conn()?;
        let sql = format!("{} WHERE action_id = ?1", SELECT_COLUMNS);
        Ok(conn
            .query_row(&sql, params![action_id], map_row)
            .optional()?)
    }

    /// 单个实体的变更历史 (排班/换班申请/清单项...)
    pub fn find_by_entity(&self, entity_id: &str) -> RepositoryResult<Vec<ActionLog>> {
        self.select("WHERE entity_id = ?1", None, params![entity_id])
    }

    pub fn find_by_time_range(
        &self,
        start_time: NaiveDateTime,
        end_time: NaiveDateTime,
    ) -> RepositoryResult<Vec<ActionLog>> {
        self.select(
            "WHERE action_ts BETWEEN ?1 AND ?2",
            None,
            params![fmt_datetime(start_time), fmt_datetime(end_time)],
        )
    }

    pub fn find_by_actor(&self, actor: &str, limit: i32) -> RepositoryResult<Vec<ActionLog>> {
        self.select("WHERE actor = ?1", Some(limit), params![actor])
    }

    pub fn find_by_action_type(
        &self,
        action_type: &str,
        limit: i32,
    ) -> RepositoryResult<Vec<ActionLog>> {
        self.select("WHERE action_type = ?1", Some(limit), params![action_type])
    }

    pub fn find_recent(&self, limit: i32) -> RepositoryResult<Vec<ActionLog>> {
        self.select("", Some(limit), params![])
    }

    pub fn count_by_actor(&self, actor: &str) -> RepositoryResult<i32> {
        let conn = self.get_conn()?;
        let count = conn.query_row(
            "SELECT COUNT(*) FROM action_log WHERE actor = ?1",
            params![actor],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    fn select<P: Params>(
        &self,
        filter: &str,
        limit: Option<i32>,
        params: P,
    ) -> RepositoryResult<Vec<ActionLog>> {
        let limit = limit
            .map(|n| format!("LIMIT {}", n.max(0)))
            .unwrap_or_default();
        let sql = format!(
            "{} {} ORDER BY action_ts DESC, rowid DESC {}",
            SELECT_COLUMNS, filter, limit
        );

        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(&sql)?;
        let logs = stmt
            .query_map(params, map_row)?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(logs)
    }
}

/// JSON 列解析失败时按缺失处理
fn map_row(row: &Row) -> SqliteResult<ActionLog> {
    let action_ts: String = row.get(2)?;
    let old_value: Option<String> = row.get(6)?;
    let new_value: Option<String> = row.get(7)?;

    Ok(ActionLog {
        action_id: row.get(0)?,
        action_type: row.get(1)?,
        action_ts: parse_datetime(2, &action_ts)?,
        actor: row.get(3)?,
        entity_type: row.get(4)?,
        entity_id: row.get(5)?,
        old_value_json: old_value.and_then(|s| serde_json::from_str(&s).ok()),
        new_value_json: new_value.and_then(|s| serde_json::from_str(&s).ok()),
        detail: row.get(8)?,
    })
}
