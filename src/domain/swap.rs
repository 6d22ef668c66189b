// ==========================================
// 值班排班系统 - 换班申请领域模型
// ==========================================
// 状态机:
//   PENDING_RECIPIENT → {ACCEPTED, REJECTED, CANCELLED}
//   ACCEPTED          → {APPLIED, CANCELLED}
// 终态 (REJECTED/APPLIED/CANCELLED) 不可变
// ==========================================

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::types::{SwapStatus, SwapType};

// ==========================================
// SwapRequest - 换班申请
// ==========================================
// assignment_id 为非拥有引用, 不级联到排班记录
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SwapRequest {
    pub request_id: String,                        // 申请ID
    pub schedule_id: String,                       // 所属排班表
    pub initiator_staff_id: String,                // 发起人
    pub recipient_staff_id: String,                // 接收人
    pub assignment_id: String,                     // 转出的排班
    pub proposed_date: Option<NaiveDate>,          // 互换日期 (TRADE)
    pub reason: String,                            // 申请原因
    pub swap_type: SwapType,                       // 换班类型
    pub status: SwapStatus,                        // 状态
    pub recipient_response: Option<String>,        // 接收人答复
    pub responded_at: Option<NaiveDateTime>,       // 答复时间
    pub manager_notes: Option<String>,             // 经理备注
    pub applied_by: Option<String>,                // 生效操作人
    pub applied_at: Option<NaiveDateTime>,         // 生效时间
    pub cancelled_by: Option<String>,              // 撤销人
    pub cancelled_at: Option<NaiveDateTime>,       // 撤销时间
    pub created_at: NaiveDateTime,                 // 创建时间
    pub revision: i32,                             // 乐观锁: 修订号
}

// ==========================================
// SwapEvent - 状态机事件
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SwapEvent {
    RecipientAccept, // 接收人同意
    RecipientReject, // 接收人拒绝
    Apply,           // 生效
    Cancel,          // 撤销
}

impl fmt::Display for SwapEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SwapEvent::RecipientAccept => write!(f, "RECIPIENT_ACCEPT"),
            SwapEvent::RecipientReject => write!(f, "RECIPIENT_REJECT"),
            SwapEvent::Apply => write!(f, "APPLY"),
            SwapEvent::Cancel => write!(f, "CANCEL"),
        }
    }
}

// ==========================================
// SwapTransitionRejected - 非法状态转换
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SwapTransitionRejected {
    pub from: SwapStatus,
    pub event: SwapEvent,
}

impl fmt::Display for SwapTransitionRejected {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} 状态不接受 {} 事件", self.from, self.event)
    }
}

impl std::error::Error for SwapTransitionRejected {}

/// 状态转换表: (state, event) → state | Rejected
///
/// 所有组合在此穷举, 新增状态或事件时编译器会要求补齐
pub fn transition(
    from: SwapStatus,
    event: SwapEvent,
) -> Result<SwapStatus, SwapTransitionRejected> {
    use SwapEvent::*;
    use SwapStatus::*;

    match (from, event) {
        (PendingRecipient, RecipientAccept) => Ok(Accepted),
        (PendingRecipient, RecipientReject) => Ok(Rejected),
        (PendingRecipient, Cancel) => Ok(Cancelled),
        (PendingRecipient, Apply) => Err(SwapTransitionRejected { from, event }),

        (Accepted, Apply) => Ok(Applied),
        (Accepted, Cancel) => Ok(Cancelled),
        (Accepted, RecipientAccept) | (Accepted, RecipientReject) => {
            Err(SwapTransitionRejected { from, event })
        }

        (Rejected, _) | (Applied, _) | (Cancelled, _) => {
            Err(SwapTransitionRejected { from, event })
        }
    }
}

impl SwapRequest {
    /// 按事件推进状态 (只计算, 不落库)
    pub fn next_status(&self, event: SwapEvent) -> Result<SwapStatus, SwapTransitionRejected> {
        transition(self.status, event)
    }
}
