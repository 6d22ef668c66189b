// ==========================================
// 测试辅助函数
// ==========================================
// 职责: 临时数据库 + 固定时钟装配 AppState, 提供网点/人员/模板的种子数据
// ==========================================

#![allow(dead_code)]

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use shift_roster::app::AppState;
use shift_roster::config::{config_keys, ConfigScope};
use shift_roster::domain::{
    Actor, Assignment, BackupTemplate, ChecklistTemplate, EligibilityInput, Role, Schedule,
    ShiftType,
};
use shift_roster::engine::{FixedClock, ShiftEvent, ShiftEventPublisher};
use std::error::Error;
use std::sync::{Arc, Mutex};
use tempfile::NamedTempFile;

pub const BRANCH: &str = "BR01";
pub const OTHER_BRANCH: &str = "BR02";

/// 记录所有事件的发布者
#[derive(Default)]
pub struct RecordingPublisher {
    events: Mutex<Vec<ShiftEvent>>,
}

impl RecordingPublisher {
    pub fn events(&self) -> Vec<ShiftEvent> {
        self.events.lock().unwrap().clone()
    }
}

impl ShiftEventPublisher for RecordingPublisher {
    fn publish(&self, event: ShiftEvent) -> Result<String, Box<dyn Error + Send + Sync>> {
        self.events.lock().unwrap().push(event);
        Ok(String::new())
    }
}

/// 测试环境
///
/// 临时文件需要与 state 同生命周期
pub struct TestEnv {
    pub _file: NamedTempFile,
    pub state: AppState,
    pub clock: Arc<FixedClock>,
    pub events: Arc<RecordingPublisher>,
}

pub fn at(y: i32, m: u32, d: u32, h: u32, min: u32, s: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(y, m, d)
        .unwrap()
        .and_hms_opt(h, min, s)
        .unwrap()
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn hm(h: u32, m: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(h, m, 0).unwrap()
}

pub fn admin() -> Actor {
    Actor::new("ADMIN01", Role::Admin, None)
}

pub fn manager() -> Actor {
    Actor::new("MGR01", Role::Manager, Some(BRANCH.to_string()))
}

pub fn other_manager() -> Actor {
    Actor::new("MGR02", Role::Manager, Some(OTHER_BRANCH.to_string()))
}

pub fn staff(staff_id: &str) -> Actor {
    Actor::new(staff_id, Role::Staff, Some(BRANCH.to_string()))
}

/// 创建测试环境: 两个网点, 时区偏移统一为 UTC
pub fn create_test_env(now: NaiveDateTime) -> Result<TestEnv, Box<dyn Error>> {
    shift_roster::logging::init_test();

    let file = NamedTempFile::new()?;
    let db_path = file.path().to_str().unwrap().to_string();

    let clock = Arc::new(FixedClock::new(now));
    let events = Arc::new(RecordingPublisher::default());
    let state = AppState::with_options(
        db_path,
        clock.clone(),
        Some(events.clone() as Arc<dyn ShiftEventPublisher>),
    )?;

    let admin = admin();
    state.staff_api.register_branch(&admin, BRANCH, "总部网点", "HQ")?;
    state.staff_api.register_branch(&admin, OTHER_BRANCH, "分部网点", "SUB")?;
    state
        .staff_api
        .set_config(&admin, &ConfigScope::Global, config_keys::UTC_OFFSET_MINUTES, "0")?;

    Ok(TestEnv {
        _file: file,
        state,
        clock,
        events,
    })
}

pub fn eligibility(staff_id: &str, branch_id: &str, can_work_night: bool) -> EligibilityInput {
    EligibilityInput {
        staff_id: staff_id.to_string(),
        branch_id: branch_id.to_string(),
        can_work_night,
        can_work_weekend_day: true,
        has_server_access: true,
        has_sabbath_restriction: false,
        max_night_shifts_per_month: None,
        min_days_between_night_shifts: None,
        active: true,
    }
}

/// 登记 BR01 人员
pub fn add_staff(env: &TestEnv, staff_id: &str, can_work_night: bool) {
    env.state
        .staff_api
        .upsert_eligibility(&manager(), &eligibility(staff_id, BRANCH, can_work_night))
        .unwrap();
}

pub fn create_schedule(env: &TestEnv, year: i32, month: u32) -> Schedule {
    env.state
        .schedule_api
        .create_or_get_schedule(&manager(), BRANCH, year, month)
        .unwrap()
}

pub fn assign(
    env: &TestEnv,
    schedule: &Schedule,
    staff_id: &str,
    day: NaiveDate,
    shift_type: ShiftType,
) -> Assignment {
    env.state
        .schedule_api
        .assign_slot(&manager(), &schedule.schedule_id, staff_id, day, shift_type)
        .unwrap()
}

pub fn checklist_template(title: &str, order_no: i32, unlock_time: Option<NaiveTime>) -> ChecklistTemplate {
    ChecklistTemplate {
        template_id: String::new(),
        shift_type: None,
        category: "机房巡检".to_string(),
        title: title.to_string(),
        description: None,
        order_no,
        is_required: true,
        unlock_time,
        active: true,
    }
}

/// 写入清单模板 (按顺序编号)
pub fn seed_checklist_templates(env: &TestEnv, templates: &[(&str, Option<NaiveTime>)]) {
    for (index, (title, unlock_time)) in templates.iter().enumerate() {
        env.state
            .report_api
            .upsert_checklist_template(
                &admin(),
                checklist_template(title, index as i32 + 1, *unlock_time),
            )
            .unwrap();
    }
}

pub fn seed_backup_template(env: &TestEnv, database_name: &str) -> BackupTemplate {
    env.state
        .report_api
        .upsert_backup_template(
            &admin(),
            BackupTemplate {
                template_id: String::new(),
                database_name: database_name.to_string(),
                description: None,
                order_no: 1,
                active: true,
            },
        )
        .unwrap()
}
