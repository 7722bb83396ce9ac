//! Workspace membership lookup port.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::DomainError;

/// A member's role within a workspace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WorkspaceRole {
    Owner,
    Admin,
    Member,
    Observer,
}

impl WorkspaceRole {
    /// Returns the stored name of this role.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Owner => "Owner",
            Self::Admin => "Admin",
            Self::Member => "Member",
            Self::Observer => "Observer",
        }
    }
}

impl std::fmt::Display for WorkspaceRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for WorkspaceRole {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Owner" => Ok(Self::Owner),
            "Admin" => Ok(Self::Admin),
            "Member" => Ok(Self::Member),
            "Observer" => Ok(Self::Observer),
            other => Err(DomainError::Validation(format!(
                "unknown workspace role: {other}"
            ))),
        }
    }
}

/// A user's membership in a workspace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkspaceMember {
    /// The member's user id.
    pub user_id: Uuid,
    /// The workspace they belong to.
    pub workspace_id: Uuid,
    /// Their role.
    pub role: WorkspaceRole,
}

/// Looks up the members of a workspace.
#[async_trait]
pub trait MembershipDirectory: Send + Sync {
    /// Returns every current member of the workspace. An unknown workspace
    /// yields an empty list.
    async fn get_workspace_members(
        &self,
        workspace_id: Uuid,
    ) -> Result<Vec<WorkspaceMember>, DomainError>;
}
