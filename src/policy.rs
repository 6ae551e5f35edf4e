//! Authorization rules applied by mutating routes.
//!
//! Two rules exist. The ownership rule lets the owner of a red flag or intervention
//! (or an admin) change or delete it. The admin rule reserves status transitions and
//! the status vocabulary for admins. Rules run after the target row has been fetched
//! and before anything is written.

use crate::{
    auth::AuthUser,
    error::{AppError, AppResult},
    models::{AuditEntry, Status},
    repository::Repository,
};

/// How the caller was allowed through the ownership rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Owner,
    /// An admin acting on a record they do not own.
    AdminOverride,
}

impl Access {
    /// Admin overrides are privileged mutations and get an audit row; owners acting on
    /// their own records do not.
    pub fn audit(self, caller: &AuthUser, action: impl Into<String>) -> Option<AuditEntry> {
        match self {
            Access::Owner => None,
            Access::AdminOverride => Some(AuditEntry {
                admin_id: caller.id,
                action: action.into(),
            }),
        }
    }
}

/// Ownership rule.
pub fn require_owner_or_admin(caller: &AuthUser, owner_id: i64) -> AppResult<Access> {
    if caller.id == owner_id {
        Ok(Access::Owner)
    } else if caller.is_admin() {
        Ok(Access::AdminOverride)
    } else {
        tracing::warn!(caller_id = caller.id, owner_id, "ownership check failed");
        Err(AppError::forbidden("Not authorized to modify this record"))
    }
}

/// Admin rule.
pub fn require_admin(caller: &AuthUser) -> AppResult<()> {
    if caller.is_admin() {
        Ok(())
    } else {
        tracing::warn!(caller_id = caller.id, "admin-only operation refused");
        Err(AppError::forbidden("Only administrators can perform this action"))
    }
}

/// Audit entry for a mutation only admins may perform.
pub fn admin_audit(caller: &AuthUser, action: impl Into<String>) -> AuditEntry {
    AuditEntry {
        admin_id: caller.id,
        action: action.into(),
    }
}

/// Looks up the target of a status transition by name.
pub async fn resolve_status(repo: &dyn Repository, name: &str) -> AppResult<Status> {
    repo.find_status_by_name(name)
        .await?
        .ok_or_else(|| AppError::not_found(format!("Status '{name}' not found")))
}
