// ==========================================
// 值班排班系统 - SQLite 连接初始化与建库
// ==========================================
// 目标:
// - 统一所有 Connection::open 的 PRAGMA 行为 (外键 + busy_timeout)
// - 幂等建表, 记录 schema_version
// ==========================================

use rusqlite::Connection;
use rusqlite::OptionalExtension;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// 默认 busy_timeout（毫秒）
pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

/// 当前代码所期望的 schema_version
pub const CURRENT_SCHEMA_VERSION: i64 = 1;

/// SQLite 日期/时间存储格式
pub const DATE_FMT: &str = "%Y-%m-%d";
pub const DATETIME_FMT: &str = "%Y-%m-%d %H:%M:%S";
pub const TIME_FMT: &str = "%H:%M";

/// 建表语句
///
/// 说明:
/// - shift_assignment / shift_holiday / shift_oncall 随排班表级联删除
/// - shift_swap_request / shift_report 只持有 assignment_id 引用, 不设外键级联
const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS schema_version (
    version INTEGER PRIMARY KEY,
    applied_at TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE TABLE IF NOT EXISTS config_kv (
    scope_id TEXT NOT NULL,
    key TEXT NOT NULL,
    value TEXT NOT NULL,
    updated_at TEXT NOT NULL DEFAULT (datetime('now')),
    PRIMARY KEY (scope_id, key)
);

CREATE TABLE IF NOT EXISTS branch (
    branch_id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    code TEXT NOT NULL UNIQUE,
    created_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS staff_eligibility (
    staff_id TEXT PRIMARY KEY,
    branch_id TEXT NOT NULL REFERENCES branch(branch_id),
    can_work_night INTEGER NOT NULL DEFAULT 0,
    can_work_weekend_day INTEGER NOT NULL DEFAULT 0,
    has_server_access INTEGER NOT NULL DEFAULT 0,
    has_sabbath_restriction INTEGER NOT NULL DEFAULT 0,
    max_night_shifts_per_month INTEGER NOT NULL,
    min_days_between_night_shifts INTEGER NOT NULL,
    active INTEGER NOT NULL DEFAULT 1,
    updated_by TEXT,
    updated_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS shift_schedule (
    schedule_id TEXT PRIMARY KEY,
    branch_id TEXT NOT NULL REFERENCES branch(branch_id),
    year INTEGER NOT NULL,
    month INTEGER NOT NULL CHECK (month BETWEEN 1 AND 12),
    status TEXT NOT NULL DEFAULT 'DRAFT',
    published_at TEXT,
    published_by TEXT,
    created_at TEXT NOT NULL,
    UNIQUE (branch_id, year, month)
);

CREATE TABLE IF NOT EXISTS shift_assignment (
    assignment_id TEXT PRIMARY KEY,
    schedule_id TEXT NOT NULL REFERENCES shift_schedule(schedule_id) ON DELETE CASCADE,
    staff_id TEXT NOT NULL REFERENCES staff_eligibility(staff_id),
    date TEXT NOT NULL,
    shift_type TEXT NOT NULL,
    revision INTEGER NOT NULL DEFAULT 1,
    updated_at TEXT NOT NULL,
    UNIQUE (schedule_id, staff_id, date)
);
CREATE INDEX IF NOT EXISTS idx_assignment_schedule_date
    ON shift_assignment(schedule_id, date);

CREATE TABLE IF NOT EXISTS shift_holiday (
    holiday_id TEXT PRIMARY KEY,
    schedule_id TEXT NOT NULL REFERENCES shift_schedule(schedule_id) ON DELETE CASCADE,
    date TEXT NOT NULL,
    name TEXT NOT NULL,
    UNIQUE (schedule_id, date)
);

CREATE TABLE IF NOT EXISTS shift_oncall (
    oncall_id TEXT PRIMARY KEY,
    schedule_id TEXT NOT NULL REFERENCES shift_schedule(schedule_id) ON DELETE CASCADE,
    staff_id TEXT NOT NULL REFERENCES staff_eligibility(staff_id),
    date TEXT NOT NULL,
    UNIQUE (schedule_id, staff_id, date)
);

CREATE TABLE IF NOT EXISTS shift_swap_request (
    request_id TEXT PRIMARY KEY,
    schedule_id TEXT NOT NULL,
    initiator_staff_id TEXT NOT NULL,
    recipient_staff_id TEXT NOT NULL,
    assignment_id TEXT NOT NULL,
    proposed_date TEXT,
    reason TEXT NOT NULL,
    swap_type TEXT NOT NULL,
    status TEXT NOT NULL,
    recipient_response TEXT,
    responded_at TEXT,
    manager_notes TEXT,
    applied_by TEXT,
    applied_at TEXT,
    cancelled_by TEXT,
    cancelled_at TEXT,
    created_at TEXT NOT NULL,
    revision INTEGER NOT NULL DEFAULT 1
);
CREATE INDEX IF NOT EXISTS idx_swap_schedule ON shift_swap_request(schedule_id, status);

CREATE TABLE IF NOT EXISTS checklist_template (
    template_id TEXT PRIMARY KEY,
    shift_type TEXT,
    category TEXT NOT NULL,
    title TEXT NOT NULL,
    description TEXT,
    order_no INTEGER NOT NULL DEFAULT 0,
    is_required INTEGER NOT NULL DEFAULT 1,
    unlock_time TEXT,
    active INTEGER NOT NULL DEFAULT 1
);

CREATE TABLE IF NOT EXISTS backup_template (
    template_id TEXT PRIMARY KEY,
    database_name TEXT NOT NULL,
    description TEXT,
    order_no INTEGER NOT NULL DEFAULT 0,
    active INTEGER NOT NULL DEFAULT 1
);

CREATE TABLE IF NOT EXISTS shift_report (
    report_id TEXT PRIMARY KEY,
    assignment_id TEXT NOT NULL UNIQUE,
    status TEXT NOT NULL DEFAULT 'DRAFT',
    started_at TEXT,
    completed_at TEXT,
    summary TEXT,
    handover_notes TEXT,
    notes TEXT,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS shift_checklist_item (
    item_id TEXT PRIMARY KEY,
    report_id TEXT NOT NULL REFERENCES shift_report(report_id) ON DELETE CASCADE,
    category TEXT NOT NULL,
    title TEXT NOT NULL,
    description TEXT,
    order_no INTEGER NOT NULL DEFAULT 0,
    is_required INTEGER NOT NULL DEFAULT 1,
    unlock_time TEXT,
    status TEXT NOT NULL DEFAULT 'PENDING',
    notes TEXT,
    completed_at TEXT,
    updated_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS shift_backup_item (
    backup_id TEXT PRIMARY KEY,
    report_id TEXT NOT NULL REFERENCES shift_report(report_id) ON DELETE CASCADE,
    database_name TEXT NOT NULL,
    description TEXT,
    order_no INTEGER NOT NULL DEFAULT 0,
    is_checked INTEGER NOT NULL DEFAULT 0,
    checked_at TEXT
);

CREATE TABLE IF NOT EXISTS shift_issue (
    issue_id TEXT PRIMARY KEY,
    report_id TEXT NOT NULL REFERENCES shift_report(report_id) ON DELETE CASCADE,
    title TEXT NOT NULL,
    description TEXT,
    status TEXT NOT NULL DEFAULT 'ONGOING',
    resolution TEXT,
    ticket_number TEXT,
    created_by TEXT NOT NULL,
    created_at TEXT NOT NULL,
    resolved_at TEXT
);

CREATE TABLE IF NOT EXISTS action_log (
    action_id TEXT PRIMARY KEY,
    action_type TEXT NOT NULL,
    action_ts TEXT NOT NULL,
    actor TEXT NOT NULL,
    entity_type TEXT NOT NULL,
    entity_id TEXT NOT NULL,
    old_value_json TEXT,
    new_value_json TEXT,
    detail TEXT
);
CREATE INDEX IF NOT EXISTS idx_action_log_entity ON action_log(entity_id, action_ts);
"#;

/// 配置 SQLite 连接的统一 PRAGMA
///
/// 说明：
/// - foreign_keys 需要“每个连接”单独开启
/// - busy_timeout 需要“每个连接”单独配置
pub fn configure_sqlite_connection(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    conn.busy_timeout(Duration::from_millis(DEFAULT_BUSY_TIMEOUT_MS))?;
    Ok(())
}

/// 打开 SQLite 连接并应用统一配置
pub fn open_sqlite_connection(db_path: &str) -> rusqlite::Result<Connection> {
    let conn = Connection::open(db_path)?;
    configure_sqlite_connection(&conn)?;
    Ok(conn)
}

/// 打开连接并包装为仓储共享句柄
///
/// 所有仓储共用同一把 Mutex: 写操作天然串行 (单写者语义)
pub fn open_shared_connection(db_path: &str) -> rusqlite::Result<Arc<Mutex<Connection>>> {
    let conn = open_sqlite_connection(db_path)?;
    Ok(Arc::new(Mutex::new(conn)))
}

/// 初始化 schema (幂等)
pub fn init_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(SCHEMA_SQL)?;
    conn.execute(
        "INSERT OR IGNORE INTO schema_version (version) VALUES (?1)",
        [CURRENT_SCHEMA_VERSION],
    )?;
    Ok(())
}

/// 读取 schema_version（若表不存在则返回 None）
pub fn read_schema_version(conn: &Connection) -> rusqlite::Result<Option<i64>> {
    let has_table: bool = conn
        .query_row(
            "SELECT 1 FROM sqlite_master WHERE type='table' AND name='schema_version' LIMIT 1",
            [],
            |_row| Ok(true),
        )
        .optional()?
        .unwrap_or(false);

    if !has_table {
        return Ok(None);
    }

    let v: Option<i64> = conn.query_row("SELECT MAX(version) FROM schema_version", [], |row| row.get(0))?;
    Ok(v)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_schema_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        configure_sqlite_connection(&conn).unwrap();

        assert_eq!(read_schema_version(&conn).unwrap(), None);
        init_schema(&conn).unwrap();
        init_schema(&conn).unwrap();
        assert_eq!(read_schema_version(&conn).unwrap(), Some(CURRENT_SCHEMA_VERSION));
    }

    #[test]
    fn test_foreign_keys_enabled() {
        let conn = Connection::open_in_memory().unwrap();
        configure_sqlite_connection(&conn).unwrap();
        let fk: i64 = conn
            .query_row("PRAGMA foreign_keys", [], |row| row.get(0))
            .unwrap();
        assert_eq!(fk, 1);
    }
}
