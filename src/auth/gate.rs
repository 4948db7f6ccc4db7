//! Role-based authorization gate

use tracing::warn;

use super::extractors::AuthedUser;
use crate::common::ApiError;
use crate::users::models::Role;

/// A route's allow-set of roles, optionally also admitting the caller when
/// they are the route's target.
#[derive(Debug, Clone, Copy)]
pub struct RoleGate {
    allowed: &'static [Role],
    allow_self: bool,
}

pub const ADMIN_ONLY: RoleGate = RoleGate::allow(&[Role::Admin]);
pub const SELF_OR_ADMIN: RoleGate = RoleGate::self_or_admin();

impl RoleGate {
    pub const fn allow(allowed: &'static [Role]) -> Self {
        Self {
            allowed,
            allow_self: false,
        }
    }

    pub const fn self_or_admin() -> Self {
        Self {
            allowed: &[Role::Admin],
            allow_self: true,
        }
    }

    pub fn check(&self, user: &AuthedUser, target: Option<i64>) -> Result<(), ApiError> {
        if self.allowed.contains(&user.role) {
            return Ok(());
        }
        if self.allow_self && target == Some(user.id) {
            return Ok(());
        }

        warn!(
            user_id = user.id,
            role = %user.role,
            target = ?target,
            "Authorization denied"
        );
        Err(ApiError::Forbidden("Insufficient permissions".to_string()))
    }
}
