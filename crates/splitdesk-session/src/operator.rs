//! Operators and the permissions gating sensitive settlement actions.
//!
//! Who the operator is and what they may do is decided by the host
//! application's auth layer; the desk only checks what it is handed.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use ts_rs::TS;

use crate::error::{SessionError, SessionResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum Permission {
    ApplyDiscount,
    ApplySurcharge,
    FinalizeSettlement,
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Permission::ApplyDiscount => write!(f, "apply_discount"),
            Permission::ApplySurcharge => write!(f, "apply_surcharge"),
            Permission::FinalizeSettlement => write!(f, "finalize_settlement"),
        }
    }
}

/// The person driving the cashier screen.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Operator {
    pub id: String,
    pub name: String,
    permissions: BTreeSet<Permission>,
}

impl Operator {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        permissions: impl IntoIterator<Item = Permission>,
    ) -> Self {
        Operator {
            id: id.into(),
            name: name.into(),
            permissions: permissions.into_iter().collect(),
        }
    }

    /// Operator holding every permission.
    pub fn supervisor(id: impl Into<String>, name: impl Into<String>) -> Self {
        Operator::new(
            id,
            name,
            [
                Permission::ApplyDiscount,
                Permission::ApplySurcharge,
                Permission::FinalizeSettlement,
            ],
        )
    }

    pub fn has(&self, permission: Permission) -> bool {
        self.permissions.contains(&permission)
    }

    pub fn require(&self, permission: Permission) -> SessionResult<()> {
        if self.has(permission) {
            Ok(())
        } else {
            Err(SessionError::PermissionDenied {
                operator_id: self.id.clone(),
                permission,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_require() {
        let cashier = Operator::new("op-1", "Caixa", [Permission::FinalizeSettlement]);
        assert!(cashier.require(Permission::FinalizeSettlement).is_ok());

        let err = cashier.require(Permission::ApplyDiscount).unwrap_err();
        assert!(matches!(
            err,
            SessionError::PermissionDenied {
                permission: Permission::ApplyDiscount,
                ..
            }
        ));
    }

    #[test]
    fn test_supervisor_has_everything() {
        let boss = Operator::supervisor("op-9", "Gerente");
        assert!(boss.has(Permission::ApplyDiscount));
        assert!(boss.has(Permission::ApplySurcharge));
        assert!(boss.has(Permission::FinalizeSettlement));
    }
}
