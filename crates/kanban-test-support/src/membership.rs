//! `MembershipDirectory` doubles.

use std::collections::HashMap;

use async_trait::async_trait;
use kanban_core::error::DomainError;
use kanban_core::membership::{MembershipDirectory, WorkspaceMember, WorkspaceRole};
use uuid::Uuid;

/// A fixed roster. Unknown workspaces have no members.
#[derive(Debug, Default, Clone)]
pub struct StaticMembershipDirectory {
    members: HashMap<Uuid, Vec<WorkspaceMember>>,
}

impl StaticMembershipDirectory {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `user_ids` to `workspace_id` as plain members.
    #[must_use]
    pub fn with_members(mut self, workspace_id: Uuid, user_ids: &[Uuid]) -> Self {
        let roster = self.members.entry(workspace_id).or_default();
        roster.extend(user_ids.iter().map(|&user_id| WorkspaceMember {
            user_id,
            workspace_id,
            role: WorkspaceRole::Member,
        }));
        self
    }
}

#[async_trait]
impl MembershipDirectory for StaticMembershipDirectory {
    async fn get_workspace_members(
        &self,
        workspace_id: Uuid,
    ) -> Result<Vec<WorkspaceMember>, DomainError> {
        Ok(self.members.get(&workspace_id).cloned().unwrap_or_default())
    }
}

#[derive(Debug)]
pub struct FailingMembershipDirectory;

#[async_trait]
impl MembershipDirectory for FailingMembershipDirectory {
    async fn get_workspace_members(
        &self,
        _workspace_id: Uuid,
    ) -> Result<Vec<WorkspaceMember>, DomainError> {
        Err(DomainError::Infrastructure("connection refused".into()))
    }
}
