use super::report::{FindingSeverity, RosterValidationReport, RuleCode, ValidationFinding};
use crate::domain::schedule::Assignment;
use crate::domain::staff::StaffEligibility;
use crate::domain::types::ShiftType;
use chrono::{Datelike, NaiveDate, Weekday};
use std::collections::{BTreeMap, HashMap};

/// 周末白班最少人数
const WEEKEND_DAY_MIN_STAFF: usize = 2;
/// 工作日夜班最多人数
const WEEKDAY_NIGHT_MAX_STAFF: usize = 1;

// ==========================================
// RosterValidator - 排班合规校验器
// ==========================================
// 输入: 网点人员资格档案 + 排班表全部排班记录
// 输出: RosterValidationReport (errors / warnings)
pub struct RosterValidator {
    profiles: HashMap<String, StaffEligibility>,
    assignments: Vec<Assignment>,
}

impl RosterValidator {
    pub fn new(profiles: Vec<StaffEligibility>, assignments: Vec<Assignment>) -> Self {
        Self {
            profiles: profiles
                .into_iter()
                .map(|p| (p.staff_id.clone(), p))
                .collect(),
            assignments,
        }
    }

    // ==========================================
    // 对外接口
    // ==========================================

    /// 校验整张排班表
    pub fn validate_schedule(&self) -> RosterValidationReport {
        let mut findings = Vec::new();
        for a in &self.assignments {
            findings.extend(self.check_placement(&a.staff_id, a.date, a.shift_type));
        }
        findings.extend(self.check_coverage());
        RosterValidationReport::from_findings(findings)
    }

    /// 预览单个排班是否合规 (以现有排班为背景)
    pub fn can_assign(&self, staff_id: &str, shift_type: ShiftType, date: NaiveDate) -> RosterValidationReport {
        RosterValidationReport::from_findings(self.check_placement(staff_id, date, shift_type))
    }

    // ==========================================
    // 单条排班规则
    // ==========================================

    fn check_placement(&self, staff_id: &str, date: NaiveDate, shift_type: ShiftType) -> Vec<ValidationFinding> {
        let mut findings = Vec::new();

        let profile = match self.profiles.get(staff_id) {
            Some(p) => p,
            None => {
                findings.push(error(
                    RuleCode::MissingProfile,
                    Some(staff_id),
                    Some(date),
                    format!("{} 无资格档案 ({})", staff_id, date),
                ));
                return findings;
            }
        };

        if shift_type.is_night() {
            self.check_night(profile, date, &mut findings);
        }

        if shift_type.is_weekend_day() && !profile.can_work_weekend_day {
            findings.push(error(
                RuleCode::WeekendDayIneligible,
                Some(staff_id),
                Some(date),
                format!("{} 不具备周末白班资格", staff_id),
            ));
        }

        findings
    }

    fn check_night(&self, profile: &StaffEligibility, date: NaiveDate, findings: &mut Vec<ValidationFinding>) {
        let staff_id = profile.staff_id.as_str();

        if !profile.can_work_night {
            findings.push(error(
                RuleCode::NightIneligible,
                Some(staff_id),
                Some(date),
                format!("{} 不具备夜班资格", staff_id),
            ));
        }

        if profile.has_sabbath_restriction && matches!(date.weekday(), Weekday::Fri | Weekday::Sat) {
            findings.push(error(
                RuleCode::SabbathRestriction,
                Some(staff_id),
                Some(date),
                format!("{} 有安息日限制, 周五/周六不可值夜班 ({})", staff_id, date),
            ));
        }

        let nights = self.night_dates(staff_id);
        if nights.len() as i32 >= profile.max_night_shifts_per_month {
            findings.push(warning(
                RuleCode::MaxNightShifts,
                Some(staff_id),
                None,
                format!(
                    "{} 夜班已达上限 ({})",
                    staff_id, profile.max_night_shifts_per_month
                ),
            ));
        }

        if let Some(last) = nights.iter().filter(|d| **d < date).max() {
            let days_since = (date - *last).num_days();
            if days_since < i64::from(profile.min_days_between_night_shifts) {
                findings.push(error(
                    RuleCode::MinNightGap,
                    Some(staff_id),
                    Some(date),
                    format!(
                        "{} 夜班间隔需 {} 天, 距上次夜班仅 {} 天 ({})",
                        staff_id, profile.min_days_between_night_shifts, days_since, date
                    ),
                ));
            }
        }

        let next_day = date.succ_opt();
        let next_assignment = self
            .assignments
            .iter()
            .find(|a| a.staff_id == staff_id && Some(a.date) == next_day);
        if let Some(next) = next_assignment {
            if next.shift_type != ShiftType::Off {
                findings.push(warning(
                    RuleCode::RestAfterNight,
                    Some(staff_id),
                    Some(date),
                    format!("{} 夜班次日应安排休息 ({})", staff_id, date),
                ));
            }
        }
    }

    // ==========================================
    // 覆盖率规则 (按日期)
    // ==========================================

    fn check_coverage(&self) -> Vec<ValidationFinding> {
        let mut findings = Vec::new();

        let mut by_date: BTreeMap<NaiveDate, Vec<&Assignment>> = BTreeMap::new();
        for a in &self.assignments {
            by_date.entry(a.date).or_default().push(a);
        }

        for (date, day) in &by_date {
            match date.weekday() {
                Weekday::Sat => self.check_weekend_day(*date, day, ShiftType::SaturdayDay, "周六", &mut findings),
                Weekday::Sun => self.check_weekend_day(*date, day, ShiftType::SundayDay, "周日", &mut findings),
                _ => {
                    let nights = day.iter().filter(|a| a.shift_type == ShiftType::Night).count();
                    if nights > WEEKDAY_NIGHT_MAX_STAFF {
                        findings.push(warning(
                            RuleCode::WeekdayNightOverstaffed,
                            None,
                            Some(*date),
                            format!("工作日 {} 夜班应仅 1 人 (现有 {} 人)", date, nights),
                        ));
                    }
                }
            }
        }

        findings
    }

    fn check_weekend_day(
        &self,
        date: NaiveDate,
        day: &[&Assignment],
        shift_type: ShiftType,
        label: &str,
        findings: &mut Vec<ValidationFinding>,
    ) {
        let staffed: Vec<&&Assignment> = day.iter().filter(|a| a.shift_type == shift_type).collect();

        if staffed.len() < WEEKEND_DAY_MIN_STAFF {
            findings.push(warning(
                RuleCode::WeekendCoverage,
                None,
                Some(date),
                format!(
                    "{} {} 白班需 {} 人 (现有 {} 人)",
                    label,
                    date,
                    WEEKEND_DAY_MIN_STAFF,
                    staffed.len()
                ),
            ));
        }

        let has_server_access = staffed.iter().any(|a| {
            self.profiles
                .get(&a.staff_id)
                .map(|p| p.has_server_access)
                .unwrap_or(false)
        });
        if !staffed.is_empty() && !has_server_access {
            findings.push(warning(
                RuleCode::WeekendServerAccess,
                None,
                Some(date),
                format!("{} {} 白班无机房权限人员", label, date),
            ));
        }
    }

    fn night_dates(&self, staff_id: &str) -> Vec<NaiveDate> {
        self.assignments
            .iter()
            .filter(|a| a.staff_id == staff_id && a.shift_type.is_night())
            .map(|a| a.date)
            .collect()
    }
}

fn error(rule: RuleCode, staff_id: Option<&str>, date: Option<NaiveDate>, message: String) -> ValidationFinding {
    ValidationFinding {
        rule,
        severity: FindingSeverity::Error,
        staff_id: staff_id.map(str::to_string),
        date,
        message,
    }
}

fn warning(rule: RuleCode, staff_id: Option<&str>, date: Option<NaiveDate>, message: String) -> ValidationFinding {
    ValidationFinding {
        rule,
        severity: FindingSeverity::Warning,
        staff_id: staff_id.map(str::to_string),
        date,
        message,
    }
}
