//! Authentication middleware
//! 
//! There is exactly one admin identity; everyone else is a buyer.

use tracing::{debug, warn};
use crate::utils::errors::{TradeDeskError, Result};

#[derive(Debug, Clone, Copy)]
pub struct AuthMiddleware {
    admin_id: i64,
}

impl AuthMiddleware {
    pub fn new(admin_id: i64) -> Self {
        Self { admin_id }
    }

    pub fn admin_id(&self) -> i64 {
        self.admin_id
    }

    /// Check if user is the admin
    pub fn is_admin(&self, user_id: i64) -> bool {
        user_id == self.admin_id
    }

    /// Check if user is authorized for admin actions
    pub fn check_admin(&self, user_id: i64) -> Result<()> {
        if self.is_admin(user_id) {
            debug!(user_id = user_id, "Admin authentication successful");
            Ok(())
        } else {
            warn!(user_id = user_id, "Unauthorized admin access attempt");
            Err(TradeDeskError::PermissionDenied(
                "Admin privileges required".to_string()
            ))
        }
    }

    /// Check that `user_id` owns the deal it is acting on
    pub fn check_owner(&self, user_id: i64, owner_id: i64) -> Result<()> {
        if user_id == owner_id {
            Ok(())
        } else {
            warn!(user_id = user_id, owner_id = owner_id, "Action on someone else's deal");
            Err(TradeDeskError::PermissionDenied(
                "Only the deal owner can do this".to_string()
            ))
        }
    }
}
