// ==========================================
// 值班排班系统 - 操作人 (身份/会话提供方输入)
// ==========================================
// 来源: 外部身份/会话服务, 提供 (actor_id, role, branch_id)
// 本模块只做角色判定, 不做认证
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;

// ==========================================
// Role - 角色
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Admin,   // 系统管理员 (跨网点)
    Manager, // 网点经理
    Staff,   // 值班人员
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Admin => write!(f, "ADMIN"),
            Role::Manager => write!(f, "MANAGER"),
            Role::Staff => write!(f, "STAFF"),
        }
    }
}

// ==========================================
// Actor - 当前操作人
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Actor {
    pub actor_id: String,          // 操作人ID (与 staff_id 同一编号空间)
    pub role: Role,                // 角色
    pub branch_id: Option<String>, // 所属网点 (ADMIN 可为空)
}

impl Actor {
    pub fn new(actor_id: impl Into<String>, role: Role, branch_id: Option<String>) -> Self {
        Self {
            actor_id: actor_id.into(),
            role,
            branch_id,
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// 是否具有管理权限 (MANAGER / ADMIN)
    pub fn is_manager_or_admin(&self) -> bool {
        matches!(self.role, Role::Admin | Role::Manager)
    }

    /// 是否可以管理指定网点
    ///
    /// ADMIN 不受网点限制; MANAGER 仅限本网点
    pub fn can_manage_branch(&self, branch_id: &str) -> bool {
        match self.role {
            Role::Admin => true,
            Role::Manager => self.branch_id.as_deref() == Some(branch_id),
            Role::Staff => false,
        }
    }

    /// 是否为本人或具有网点管理权限
    pub fn is_self_or_manager_of(&self, staff_id: &str, branch_id: &str) -> bool {
        self.actor_id == staff_id || self.can_manage_branch(branch_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_branch_scope() {
        let admin = Actor::new("root", Role::Admin, None);
        let manager = Actor::new("m1", Role::Manager, Some("BR01".to_string()));
        let staff = Actor::new("s1", Role::Staff, Some("BR01".to_string()));

        assert!(admin.can_manage_branch("BR99"));
        assert!(manager.can_manage_branch("BR01"));
        assert!(!manager.can_manage_branch("BR02"));
        assert!(!staff.can_manage_branch("BR01"));

        assert!(staff.is_self_or_manager_of("s1", "BR01"));
        assert!(!staff.is_self_or_manager_of("s2", "BR01"));
    }
}
