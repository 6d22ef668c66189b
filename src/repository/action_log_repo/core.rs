use crate::domain::action_log::ActionLog;
use crate::repository::error::{fmt_datetime, RepositoryError, RepositoryResult};
use rusqlite::{params, Connection};
use std::sync::{Arc, Mutex, MutexGuard};

// ==========================================
// ActionLogRepository - 操作日志仓储
// ==========================================
// 只追加: 不提供更新与删除
pub struct ActionLogRepository {
    conn: Arc<Mutex<Connection>>,
}

impl ActionLogRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    pub(super) fn get_conn(&self) -> RepositoryResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 追加一条审计记录
    ///
    /// # 返回
    /// - `Ok(action_id)`
    pub fn insert(&self, log: &ActionLog) -> RepositoryResult<String> {
        let conn = self.get_conn()?;
        append(&conn, log)?;
        Ok(log.action_id.clone())
    }
}

/// 写入单条记录 (JSON 值按文本存储)
fn append(conn: &Connection, log: &ActionLog) -> RepositoryResult<()> {
    let old_value = log.old_value_json.as_ref().map(|v| v.to_string());
    let new_value = log.new_value_json.as_ref().map(|v| v.to_string());

    conn.execute(
        "INSERT INTO action_log (
             action_id, action_type, action_ts, actor, entity_type, entity_id,
             old_value_json, new_value_json, detail
         ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        params![
            log.action_id,
            log.action_type,
            fmt_datetime(log.action_ts),
            log.actor,
            log.entity_type,
            log.entity_id,
            old_value,
            new_value,
            log.detail,
        ],
    )?;
    Ok(())
}
