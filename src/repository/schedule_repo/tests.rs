use super::*;
use crate::domain::schedule::{Assignment, Holiday, Schedule};
use crate::domain::types::{ScheduleStatus, ShiftType};
use crate::repository::error::RepositoryError;
use chrono::{NaiveDate, NaiveDateTime, Utc};
use rusqlite::{params, Connection};
use std::sync::{Arc, Mutex};

fn setup_test_db() -> Arc<Mutex<Connection>> {
    let conn = Connection::open_in_memory().unwrap();
    crate::db::configure_sqlite_connection(&conn).unwrap();
    crate::db::init_schema(&conn).unwrap();

    conn.execute(
        "INSERT INTO branch (branch_id, name, code, created_at) VALUES ('BR01', 'Main', 'BR01', '2024-01-01 00:00:00')",
        [],
    )
    .unwrap();
    for staff in ["S1", "S2", "S3"] {
        conn.execute(
            "INSERT INTO staff_eligibility (staff_id, branch_id, max_night_shifts_per_month,
                 min_days_between_night_shifts, updated_at)
             VALUES (?1, 'BR01', 5, 3, '2024-01-01 00:00:00')",
            params![staff],
        )
        .unwrap();
    }

    Arc::new(Mutex::new(conn))
}

fn now() -> NaiveDateTime {
    Utc::now().naive_utc()
}

fn d(day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 6, day).unwrap()
}

fn draft_schedule(id: &str) -> Schedule {
    Schedule {
        schedule_id: id.to_string(),
        branch_id: "BR01".to_string(),
        year: 2024,
        month: 6,
        status: ScheduleStatus::Draft,
        published_at: None,
        published_by: None,
        created_at: now(),
    }
}

fn assignment(id: &str, staff_id: &str, day: u32, shift_type: ShiftType) -> Assignment {
    Assignment {
        assignment_id: id.to_string(),
        schedule_id: "SCH1".to_string(),
        staff_id: staff_id.to_string(),
        date: d(day),
        shift_type,
        revision: 1,
        updated_at: now(),
    }
}

#[test]
fn test_publish_is_one_way() {
    let conn = setup_test_db();
    let repo = ScheduleRepository::new(conn);
    repo.insert(&draft_schedule("SCH1")).unwrap();

    assert!(repo.publish("SCH1", "m1", now()).unwrap());
    let first = repo.find_by_id("SCH1").unwrap().unwrap();
    assert_eq!(first.status, ScheduleStatus::Published);

    // 第二次发布不修改任何字段
    assert!(!repo.publish("SCH1", "m2", now()).unwrap());
    let second = repo.find_by_id("SCH1").unwrap().unwrap();
    assert_eq!(second.published_by.as_deref(), Some("m1"));
    assert_eq!(second.published_at, first.published_at);

    assert!(matches!(
        repo.publish("NOPE", "m1", now()),
        Err(RepositoryError::NotFound { .. })
    ));
}

#[test]
fn test_scope_is_unique() {
    let conn = setup_test_db();
    let repo = ScheduleRepository::new(conn);
    repo.insert(&draft_schedule("SCH1")).unwrap();

    let err = repo.insert(&draft_schedule("SCH2")).unwrap_err();
    assert!(matches!(err, RepositoryError::UniqueConstraintViolation(_)));
    assert_eq!(
        repo.find_by_scope("BR01", 2024, 6).unwrap().unwrap().schedule_id,
        "SCH1"
    );
}

#[test]
fn test_delete_draft_cascades_and_published_is_refused() {
    let conn = setup_test_db();
    let schedules = ScheduleRepository::new(conn.clone());
    let assignments = AssignmentRepository::new(conn.clone());
    let calendar = CalendarRepository::new(conn.clone());

    schedules.insert(&draft_schedule("SCH1")).unwrap();
    assignments
        .insert_with_supersede(&assignment("A1", "S1", 1, ShiftType::Day), None)
        .unwrap();
    calendar
        .insert_holiday(&Holiday {
            holiday_id: "H1".to_string(),
            schedule_id: "SCH1".to_string(),
            date: d(17),
            name: "Idul Adha".to_string(),
        })
        .unwrap();

    schedules.delete_draft("SCH1").unwrap();
    assert!(schedules.find_by_id("SCH1").unwrap().is_none());
    assert!(assignments.find_by_id("A1").unwrap().is_none());
    assert!(calendar.find_holiday("H1").unwrap().is_none());

    schedules.insert(&draft_schedule("SCH1")).unwrap();
    schedules.publish("SCH1", "m1", now()).unwrap();
    assert!(matches!(
        schedules.delete_draft("SCH1"),
        Err(RepositoryError::ScheduleLocked { .. })
    ));
    assert!(schedules.find_by_id("SCH1").unwrap().is_some());
}

#[test]
fn test_supersede_and_insert_is_atomic() {
    let conn = setup_test_db();
    let schedules = ScheduleRepository::new(conn.clone());
    let repo = AssignmentRepository::new(conn);
    schedules.insert(&draft_schedule("SCH1")).unwrap();

    let off = assignment("A1", "S1", 3, ShiftType::Off);
    repo.insert_with_supersede(&off, None).unwrap();

    // 修订号过期: 删除失败, 插入也不发生
    let stale = RevisionRef { id: "A1".to_string(), revision: 9 };
    let night = assignment("A2", "S1", 3, ShiftType::Night);
    let err = repo.insert_with_supersede(&night, Some(&stale)).unwrap_err();
    assert!(matches!(err, RepositoryError::OptimisticLockFailure { .. }));
    assert!(repo.find_by_id("A1").unwrap().is_some());
    assert!(repo.find_by_id("A2").unwrap().is_none());

    repo.insert_with_supersede(&night, Some(&RevisionRef::of(&off))).unwrap();
    let on_day = repo.find_by_staff_date("SCH1", "S1", d(3)).unwrap().unwrap();
    assert_eq!(on_day.assignment_id, "A2");
    assert_eq!(on_day.shift_type, ShiftType::Night);
}

#[test]
fn test_apply_moves_bumps_revision_and_detects_conflict() {
    let conn = setup_test_db();
    let schedules = ScheduleRepository::new(conn.clone());
    let repo = AssignmentRepository::new(conn);
    schedules.insert(&draft_schedule("SCH1")).unwrap();

    let a1 = assignment("A1", "S1", 5, ShiftType::Day);
    let a2 = assignment("A2", "S2", 5, ShiftType::Night);
    repo.insert_with_supersede(&a1, None).unwrap();
    repo.insert_with_supersede(&a2, None).unwrap();

    let moved = repo
        .apply_moves(
            "SCH1",
            &[SlotMove {
                assignment: RevisionRef::of(&a1),
                new_staff_id: "S3".to_string(),
                superseded: None,
            }],
            None,
            now(),
        )
        .unwrap();
    assert_eq!(moved[0].staff_id, "S3");
    assert_eq!(moved[0].revision, 2);

    // 同一修订号再次改派: 乐观锁冲突
    let err = repo
        .apply_moves(
            "SCH1",
            &[SlotMove {
                assignment: RevisionRef::of(&a1),
                new_staff_id: "S1".to_string(),
                superseded: None,
            }],
            None,
            now(),
        )
        .unwrap_err();
    assert!(err.is_concurrency_conflict());

    // S3 当天已有排班: 唯一约束兜底
    let err = repo
        .apply_moves(
            "SCH1",
            &[SlotMove {
                assignment: RevisionRef::of(&a2),
                new_staff_id: "S3".to_string(),
                superseded: None,
            }],
            None,
            now(),
        )
        .unwrap_err();
    assert!(matches!(err, RepositoryError::UniqueConstraintViolation(_)));
    assert_eq!(repo.find_by_id("A2").unwrap().unwrap().staff_id, "S2");
}

#[test]
fn test_apply_moves_rolls_back_superseded_placeholder() {
    let conn = setup_test_db();
    let schedules = ScheduleRepository::new(conn.clone());
    let repo = AssignmentRepository::new(conn);
    schedules.insert(&draft_schedule("SCH1")).unwrap();

    let day = assignment("A1", "S1", 7, ShiftType::Day);
    let off = assignment("A3", "S2", 7, ShiftType::Off);
    repo.insert_with_supersede(&day, None).unwrap();
    repo.insert_with_supersede(&off, None).unwrap();

    // 占位删除成功后改派因修订号过期失败: 整个事务回滚
    let err = repo
        .apply_moves(
            "SCH1",
            &[SlotMove {
                assignment: RevisionRef { id: "A1".to_string(), revision: 9 },
                new_staff_id: "S2".to_string(),
                superseded: Some(RevisionRef::of(&off)),
            }],
            None,
            now(),
        )
        .unwrap_err();
    assert!(matches!(err, RepositoryError::OptimisticLockFailure { .. }));

    let kept = repo.find_by_id("A3").unwrap().unwrap();
    assert_eq!(kept.shift_type, ShiftType::Off);
    assert_eq!(kept.revision, 1);
    let slot = repo.find_by_id("A1").unwrap().unwrap();
    assert_eq!(slot.staff_id, "S1");
    assert_eq!(slot.revision, 1);

    let moved = repo
        .apply_moves(
            "SCH1",
            &[SlotMove {
                assignment: RevisionRef::of(&day),
                new_staff_id: "S2".to_string(),
                superseded: Some(RevisionRef::of(&off)),
            }],
            None,
            now(),
        )
        .unwrap();
    assert_eq!(moved[0].staff_id, "S2");
    assert!(repo.find_by_id("A3").unwrap().is_none());
}

#[test]
fn test_supersede_rolls_back_when_insert_fails() {
    let conn = setup_test_db();
    let schedules = ScheduleRepository::new(conn.clone());
    let repo = AssignmentRepository::new(conn);
    schedules.insert(&draft_schedule("SCH1")).unwrap();

    let other = assignment("A1", "S2", 8, ShiftType::Day);
    let leave = assignment("A2", "S1", 8, ShiftType::Leave);
    repo.insert_with_supersede(&other, None).unwrap();
    repo.insert_with_supersede(&leave, None).unwrap();

    // 占位已删除, 插入因主键重复失败
    let clash = assignment("A1", "S1", 8, ShiftType::Night);
    let err = repo
        .insert_with_supersede(&clash, Some(&RevisionRef::of(&leave)))
        .unwrap_err();
    assert!(matches!(err, RepositoryError::UniqueConstraintViolation(_)));
    let kept = repo.find_by_staff_date("SCH1", "S1", d(8)).unwrap().unwrap();
    assert_eq!(kept.assignment_id, "A2");
    assert_eq!(kept.shift_type, ShiftType::Leave);
}

#[test]
fn test_writes_refused_after_publish() {
    let conn = setup_test_db();
    let schedules = ScheduleRepository::new(conn.clone());
    let repo = AssignmentRepository::new(conn);
    schedules.insert(&draft_schedule("SCH1")).unwrap();

    let a1 = assignment("A1", "S1", 5, ShiftType::Day);
    repo.insert_with_supersede(&a1, None).unwrap();
    schedules.publish("SCH1", "m1", now()).unwrap();

    let err = repo
        .apply_moves(
            "SCH1",
            &[SlotMove {
                assignment: RevisionRef::of(&a1),
                new_staff_id: "S2".to_string(),
                superseded: None,
            }],
            None,
            now(),
        )
        .unwrap_err();
    assert!(matches!(err, RepositoryError::ScheduleLocked { .. }));

    let err = repo.delete_draft(&RevisionRef::of(&a1), "SCH1").unwrap_err();
    assert!(matches!(err, RepositoryError::ScheduleLocked { .. }));
    assert_eq!(repo.list_by_schedule("SCH1").unwrap().len(), 1);
}
