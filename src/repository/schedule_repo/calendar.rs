use super::ensure_schedule_draft;
use crate::domain::schedule::{Holiday, OnCallAssignment};
use crate::repository::error::{fmt_date, parse_date, RepositoryError, RepositoryResult};
use rusqlite::{params, Connection, OptionalExtension};
use std::sync::{Arc, Mutex};

// ==========================================
// CalendarRepository - 节假日/待命仓储
// ==========================================
// 节假日与待命都由排班表独占, 随排班表级联删除
pub struct CalendarRepository {
    conn: Arc<Mutex<Connection>>,
}

impl CalendarRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    // ==========================================
    // 节假日
    // ==========================================

    /// 新增节假日
    ///
    /// # 返回
    /// - Err(UniqueConstraintViolation): 当天已登记节假日
    pub fn insert_holiday(&self, holiday: &Holiday) -> RepositoryResult<()> {
        let mut conn = self.get_conn()?;
        let tx = conn.transaction()?;

        ensure_schedule_draft(&tx, &holiday.schedule_id)?;
        tx.execute(
            "INSERT INTO shift_holiday (holiday_id, schedule_id, date, name) VALUES (?1, ?2, ?3, ?4)",
            params![
                holiday.holiday_id,
                holiday.schedule_id,
                fmt_date(holiday.date),
                holiday.name,
            ],
        )?;

        tx.commit()?;
        Ok(())
    }

    pub fn find_holiday(&self, holiday_id: &str) -> RepositoryResult<Option<Holiday>> {
        let conn = self.get_conn()?;
        let holiday = conn
            .query_row(
                "SELECT holiday_id, schedule_id, date, name FROM shift_holiday WHERE holiday_id = ?1",
                params![holiday_id],
                map_holiday_row,
            )
            .optional()?;
        Ok(holiday)
    }

    pub fn list_holidays(&self, schedule_id: &str) -> RepositoryResult<Vec<Holiday>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            "SELECT holiday_id, schedule_id, date, name FROM shift_holiday
             WHERE schedule_id = ?1 ORDER BY date",
        )?;
        let holidays = stmt
            .query_map(params![schedule_id], map_holiday_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(holidays)
    }

    pub fn delete_holiday(&self, schedule_id: &str, holiday_id: &str) -> RepositoryResult<()> {
        let mut conn = self.get_conn()?;
        let tx = conn.transaction()?;

        ensure_schedule_draft(&tx, schedule_id)?;
        let rows = tx.execute(
            "DELETE FROM shift_holiday WHERE holiday_id = ?1 AND schedule_id = ?2",
            params![holiday_id, schedule_id],
        )?;
        if rows == 0 {
            return Err(RepositoryError::NotFound {
                entity: "Holiday".to_string(),
                id: holiday_id.to_string(),
            });
        }

        tx.commit()?;
        Ok(())
    }

    // ==========================================
    // 待命
    // ==========================================

    pub fn insert_on_call(&self, on_call: &OnCallAssignment) -> RepositoryResult<()> {
        let mut conn = self.get_conn()?;
        let tx = conn.transaction()?;

        ensure_schedule_draft(&tx, &on_call.schedule_id)?;
        tx.execute(
            "INSERT INTO shift_oncall (oncall_id, schedule_id, staff_id, date) VALUES (?1, ?2, ?3, ?4)",
            params![
                on_call.oncall_id,
                on_call.schedule_id,
                on_call.staff_id,
                fmt_date(on_call.date),
            ],
        )?;

        tx.commit()?;
        Ok(())
    }

    pub fn find_on_call(&self, oncall_id: &str) -> RepositoryResult<Option<OnCallAssignment>> {
        let conn = self.get_conn()?;
        let on_call = conn
            .query_row(
                "SELECT oncall_id, schedule_id, staff_id, date FROM shift_oncall WHERE oncall_id = ?1",
                params![oncall_id],
                map_on_call_row,
            )
            .optional()?;
        Ok(on_call)
    }

    pub fn list_on_call(&self, schedule_id: &str) -> RepositoryResult<Vec<OnCallAssignment>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            "SELECT oncall_id, schedule_id, staff_id, date FROM shift_oncall
             WHERE schedule_id = ?1 ORDER BY date, staff_id",
        )?;
        let on_calls = stmt
            .query_map(params![schedule_id], map_on_call_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(on_calls)
    }

    pub fn delete_on_call(&self, schedule_id: &str, oncall_id: &str) -> RepositoryResult<()> {
        let mut conn = self.get_conn()?;
        let tx = conn.transaction()?;

        ensure_schedule_draft(&tx, schedule_id)?;
        let rows = tx.execute(
            "DELETE FROM shift_oncall WHERE oncall_id = ?1 AND schedule_id = ?2",
            params![oncall_id, schedule_id],
        )?;
        if rows == 0 {
            return Err(RepositoryError::NotFound {
                entity: "OnCallAssignment".to_string(),
                id: oncall_id.to_string(),
            });
        }

        tx.commit()?;
        Ok(())
    }
}

fn map_holiday_row(row: &rusqlite::Row) -> rusqlite::Result<Holiday> {
    let date: String = row.get(2)?;
    Ok(Holiday {
        holiday_id: row.get(0)?,
        schedule_id: row.get(1)?,
        date: parse_date(2, &date)?,
        name: row.get(3)?,
    })
}

fn map_on_call_row(row: &rusqlite::Row) -> rusqlite::Result<OnCallAssignment> {
    let date: String = row.get(3)?;
    Ok(OnCallAssignment {
        oncall_id: row.get(0)?,
        schedule_id: row.get(1)?,
        staff_id: row.get(2)?,
        date: parse_date(3, &date)?,
    })
}
