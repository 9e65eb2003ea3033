//! Actor roles for authorization decisions.

use serde::{Deserialize, Serialize};

use crate::action::PinProtectedAction;

/// Who is asking. Roles form a strict ladder: owner above manager above
/// cashier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActorRole {
    Owner,
    Manager,
    Cashier,
}

impl ActorRole {
    /// Whether this role can ever authorize the action. Owner-only actions
    /// deny everyone else regardless of PIN correctness.
    pub fn satisfies(self, action: PinProtectedAction) -> bool {
        match self {
            ActorRole::Owner => true,
            ActorRole::Manager | ActorRole::Cashier => !action.owner_only(),
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            ActorRole::Owner => "Owner",
            ActorRole::Manager => "Manager",
            ActorRole::Cashier => "Cashier",
        }
    }
}

impl core::fmt::Display for ActorRole {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.display_name())
    }
}
