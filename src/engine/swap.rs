// ==========================================
// 值班排班系统 - 换班协商引擎
// ==========================================
// 状态机: 见 domain::swap::transition
// 红线: 发起时发起人必须持有该排班
// 红线: 生效时重新执行完整改派校验, 改派与申请状态同事务提交
// 红线: 终态不可变
// ==========================================

use crate::domain::schedule::{Assignment, Schedule};
use crate::domain::swap::{SwapEvent, SwapRequest};
use crate::domain::types::{SwapStatus, SwapType};
use crate::engine::eligibility_core::EligibilityCore;
use crate::engine::error::RosterError;
use crate::engine::mutation::AssignmentMutationEngine;
use crate::repository::schedule_repo::{AssignmentRepository, SwapFinalize};
use crate::repository::staff_repo::StaffRepository;
use crate::repository::swap_repo::SwapRequestRepository;
use chrono::{NaiveDate, Utc};
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

// ==========================================
// SwapDraft - 发起换班参数
// ==========================================
#[derive(Debug, Clone)]
pub struct SwapDraft {
    pub initiator_staff_id: String,
    pub recipient_staff_id: String,
    pub assignment_id: String,
    pub proposed_date: Option<NaiveDate>,
    pub reason: String,
    pub swap_type: SwapType,
}

/// 换班生效结果
#[derive(Debug, Clone)]
pub struct SwapApplyOutcome {
    pub request: SwapRequest,
    /// 改派后的排班 (首条为申请对应的排班; TRADE 时第二条为回换的排班)
    pub assignments: Vec<Assignment>,
}

// ==========================================
// SwapNegotiationEngine - 换班协商引擎
// ==========================================
pub struct SwapNegotiationEngine {
    swap_repo: Arc<SwapRequestRepository>,
    assignment_repo: Arc<AssignmentRepository>,
    staff_repo: Arc<StaffRepository>,
    mutation: Arc<AssignmentMutationEngine>,
}

impl SwapNegotiationEngine {
    pub fn new(
        swap_repo: Arc<SwapRequestRepository>,
        assignment_repo: Arc<AssignmentRepository>,
        staff_repo: Arc<StaffRepository>,
        mutation: Arc<AssignmentMutationEngine>,
    ) -> Self {
        Self {
            swap_repo,
            assignment_repo,
            staff_repo,
            mutation,
        }
    }

    pub fn load(&self, request_id: &str) -> Result<SwapRequest, RosterError> {
        self.swap_repo
            .find_by_id(request_id)?
            .ok_or_else(|| RosterError::not_found("SwapRequest", request_id))
    }

    /// TRADE 回换的排班: 接收人在 proposed_date 的排班
    fn counterpart(
        &self,
        schedule: &Schedule,
        assignment: &Assignment,
        recipient_staff_id: &str,
        proposed_date: Option<NaiveDate>,
    ) -> Result<Assignment, RosterError> {
        let date = proposed_date.ok_or_else(|| {
            RosterError::Validation("TRADE 换班必须指定 proposed_date".to_string())
        })?;
        if date == assignment.date {
            return Err(RosterError::Validation(format!(
                "proposed_date 不能与排班日期相同: {}",
                date
            )));
        }
        if !schedule.covers(date) {
            return Err(RosterError::Validation(format!(
                "proposed_date {} 不属于排班月份 {}-{:02}",
                date, schedule.year, schedule.month
            )));
        }

        self.assignment_repo
            .find_by_staff_date(&schedule.schedule_id, recipient_staff_id, date)?
            .ok_or_else(|| {
                RosterError::not_found(
                    "Assignment",
                    &format!("{}@{}", recipient_staff_id, date),
                )
            })
    }

    // ==========================================
    // 发起
    // ==========================================

    /// 发起换班
    ///
    /// # 校验
    /// - 排班表为 DRAFT
    /// - 发起人当前持有该排班 (NotOwner)
    /// - 接收人同网点、在岗、具备该班次资格
    /// - TRADE: proposed_date 上接收人有排班
    pub fn create(&self, draft: &SwapDraft) -> Result<SwapRequest, RosterError> {
        let (schedule, assignment) = self.mutation.load_slot(&draft.assignment_id)?;
        EligibilityCore::check_schedule_open(&schedule)?;

        if assignment.staff_id != draft.initiator_staff_id {
            return Err(RosterError::NotOwner {
                staff_id: draft.initiator_staff_id.clone(),
                assignment_id: assignment.assignment_id.clone(),
            });
        }
        if draft.recipient_staff_id == draft.initiator_staff_id {
            return Err(RosterError::Validation("不能与本人换班".to_string()));
        }
        if assignment.shift_type.is_placeholder() {
            return Err(RosterError::Validation(format!(
                "占位班次不可换班: {}",
                assignment.shift_type
            )));
        }

        let profile = self.staff_repo.find_eligibility(&draft.recipient_staff_id)?;
        EligibilityCore::check_candidate(
            &schedule,
            &draft.recipient_staff_id,
            profile.as_ref(),
            assignment.shift_type,
        )?;

        let proposed_date = match draft.swap_type {
            SwapType::GiveAway => {
                if draft.proposed_date.is_some() {
                    return Err(RosterError::Validation(
                        "GIVE_AWAY 换班不接受 proposed_date".to_string(),
                    ));
                }
                None
            }
            SwapType::Trade => {
                let other = self.counterpart(
                    &schedule,
                    &assignment,
                    &draft.recipient_staff_id,
                    draft.proposed_date,
                )?;
                Some(other.date)
            }
        };

        let request = SwapRequest {
            request_id: Uuid::new_v4().to_string(),
            schedule_id: schedule.schedule_id.clone(),
            initiator_staff_id: draft.initiator_staff_id.clone(),
            recipient_staff_id: draft.recipient_staff_id.clone(),
            assignment_id: assignment.assignment_id.clone(),
            proposed_date,
            reason: draft.reason.clone(),
            swap_type: draft.swap_type,
            status: SwapStatus::PendingRecipient,
            recipient_response: None,
            responded_at: None,
            manager_notes: None,
            applied_by: None,
            applied_at: None,
            cancelled_by: None,
            cancelled_at: None,
            created_at: Utc::now().naive_utc(),
            revision: 1,
        };
        self.swap_repo.insert(&request)?;

        info!(
            request_id = %request.request_id,
            initiator = %request.initiator_staff_id,
            recipient = %request.recipient_staff_id,
            swap_type = %request.swap_type,
            "发起换班"
        );
        Ok(request)
    }

    // ==========================================
    // 接收人答复
    // ==========================================

    /// 接收人同意/拒绝 (仅 PENDING_RECIPIENT)
    pub fn decide(
        &self,
        request_id: &str,
        accept: bool,
        response: Option<String>,
    ) -> Result<SwapRequest, RosterError> {
        let event = if accept {
            SwapEvent::RecipientAccept
        } else {
            SwapEvent::RecipientReject
        };

        let decided = self.mutation.with_retry("decide_swap", || {
            let mut request = self.load(request_id)?;
            request.status = request.next_status(event)?;
            request.recipient_response = response.clone();
            request.responded_at = Some(Utc::now().naive_utc());

            self.swap_repo.update(&request)?;
            request.revision += 1;
            Ok(request)
        })?;

        info!(request_id = %decided.request_id, status = %decided.status, "换班已答复");
        Ok(decided)
    }

    // ==========================================
    // 生效
    // ==========================================

    /// 换班生效 (仅 ACCEPTED)
    ///
    /// 重新执行完整改派校验; 改派与申请置 APPLIED 在同一事务内提交
    pub fn apply(
        &self,
        request_id: &str,
        applied_by: &str,
        manager_notes: Option<String>,
    ) -> Result<SwapApplyOutcome, RosterError> {
        let outcome = self.mutation.with_retry("apply_swap", || {
            let mut request = self.load(request_id)?;
            let next = request.next_status(SwapEvent::Apply)?;

            let (schedule, assignment) = self.mutation.load_slot(&request.assignment_id)?;
            EligibilityCore::check_schedule_open(&schedule)?;

            if assignment.staff_id != request.initiator_staff_id {
                return Err(RosterError::NotOwner {
                    staff_id: request.initiator_staff_id.clone(),
                    assignment_id: assignment.assignment_id.clone(),
                });
            }

            let mut moves = vec![self.mutation.plan_move(
                &schedule,
                &assignment,
                &request.recipient_staff_id,
            )?];

            if request.swap_type == SwapType::Trade {
                let other = self.counterpart(
                    &schedule,
                    &assignment,
                    &request.recipient_staff_id,
                    request.proposed_date,
                )?;
                moves.push(self.mutation.plan_move(
                    &schedule,
                    &other,
                    &request.initiator_staff_id,
                )?);
            }

            let now = Utc::now().naive_utc();
            let finalize = SwapFinalize {
                request_id: request.request_id.clone(),
                expected_revision: request.revision,
                applied_by: applied_by.to_string(),
                applied_at: now,
                manager_notes: manager_notes.clone(),
            };
            let assignments = self.assignment_repo.apply_moves(
                &schedule.schedule_id,
                &moves,
                Some(&finalize),
                now,
            )?;

            request.status = next;
            request.applied_by = Some(applied_by.to_string());
            request.applied_at = Some(now);
            if manager_notes.is_some() {
                request.manager_notes = manager_notes.clone();
            }
            request.revision += 1;

            Ok(SwapApplyOutcome {
                request,
                assignments,
            })
        })?;

        info!(
            request_id = %outcome.request.request_id,
            applied_by = %applied_by,
            moved = outcome.assignments.len(),
            "换班已生效"
        );
        Ok(outcome)
    }

    // ==========================================
    // 撤销
    // ==========================================

    /// 撤销换班 (任一非终态)
    pub fn cancel(&self, request_id: &str, cancelled_by: &str) -> Result<SwapRequest, RosterError> {
        let cancelled = self.mutation.with_retry("cancel_swap", || {
            let mut request = self.load(request_id)?;
            request.status = request.next_status(SwapEvent::Cancel)?;
            request.cancelled_by = Some(cancelled_by.to_string());
            request.cancelled_at = Some(Utc::now().naive_utc());

            self.swap_repo.update(&request)?;
            request.revision += 1;
            Ok(request)
        })?;

        info!(request_id = %cancelled.request_id, cancelled_by = %cancelled_by, "换班已撤销");
        Ok(cancelled)
    }
}
