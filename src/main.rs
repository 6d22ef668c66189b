// ==========================================
// 值班排班系统 - 数据库初始化/状态工具
// ==========================================
// 用法: shift-roster [DB_PATH]
// 未指定路径时使用 SHIFT_ROSTER_DB_PATH 或用户数据目录
// ==========================================

use anyhow::Context;
use shift_roster::app::get_default_db_path;
use shift_roster::{db, logging};

fn main() -> anyhow::Result<()> {
    logging::init();

    tracing::info!("==================================================");
    tracing::info!("{} v{}", shift_roster::APP_NAME, shift_roster::VERSION);
    tracing::info!("==================================================");

    let db_path = std::env::args()
        .nth(1)
        .unwrap_or_else(get_default_db_path);
    tracing::info!("使用数据库: {}", db_path);

    let conn = db::open_sqlite_connection(&db_path)
        .with_context(|| format!("无法打开数据库: {}", db_path))?;
    db::init_schema(&conn).context("schema 初始化失败")?;

    let version = db::read_schema_version(&conn)
        .context("读取 schema_version 失败")?
        .unwrap_or_default();

    let count = |table: &str| -> anyhow::Result<i64> {
        let sql = format!("SELECT COUNT(*) FROM {}", table);
        conn.query_row(&sql, [], |row| row.get(0))
            .with_context(|| format!("统计 {} 失败", table))
    };

    tracing::info!("schema_version = {}", version);
    for table in [
        "branch",
        "staff_eligibility",
        "shift_schedule",
        "shift_assignment",
        "shift_swap_request",
        "shift_report",
        "action_log",
    ] {
        tracing::info!("{:<20} {}", table, count(table)?);
    }

    Ok(())
}
