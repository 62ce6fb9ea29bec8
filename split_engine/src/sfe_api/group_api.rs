use std::fmt::Debug;

use log::*;

use crate::{
    db::traits::{GroupManagement, UserManagement},
    db_types::{Group, GroupId, GroupMember, GroupSummary, MemberDetail, MemberRole, NewGroup, UserId},
    sfe_api::errors::GroupApiError,
};

/// `GroupApi` owns groups and memberships, including the membership and role checks that gate every other
/// operation. The settlement core never checks membership itself; it assumes it is invoked with a group id that has
/// already passed through [`GroupApi::require_member`].
pub struct GroupApi<B> {
    db: B,
}

impl<B> Debug for GroupApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "GroupApi")
    }
}

impl<B> GroupApi<B> {
    pub fn new(db: B) -> Self {
        Self { db }
    }
}

impl<B> GroupApi<B>
where B: GroupManagement + UserManagement
{
    /// Creates the group; the creator is enrolled as its owner.
    pub async fn create_group(&self, creator: &UserId, group: NewGroup) -> Result<Group, GroupApiError> {
        creator.validate()?;
        if group.name.trim().is_empty() {
            return Err(GroupApiError::Validation(crate::db_types::ValidationError(
                "group name must not be empty".to_string(),
            )));
        }
        let stored = GroupManagement::create_group(&self.db, group, creator)
            .await
            .map_err(|e| GroupApiError::StorageError(e.to_string()))?;
        debug!("🔄️👥️ Group {} created by {creator}", stored.id);
        Ok(stored)
    }

    pub async fn groups_for_user(&self, user_id: &UserId) -> Result<Vec<GroupSummary>, GroupApiError> {
        user_id.validate()?;
        self.db.fetch_groups_for_user(user_id).await.map_err(|e| GroupApiError::StorageError(e.to_string()))
    }

    pub async fn group(&self, group_id: &GroupId) -> Result<Group, GroupApiError> {
        group_id.validate()?;
        self.db
            .fetch_group(group_id)
            .await
            .map_err(|e| GroupApiError::StorageError(e.to_string()))?
            .ok_or_else(|| GroupApiError::GroupNotFound(group_id.to_string()))
    }

    pub async fn members(&self, group_id: &GroupId) -> Result<Vec<MemberDetail>, GroupApiError> {
        group_id.validate()?;
        self.db.fetch_members(group_id).await.map_err(|e| GroupApiError::StorageError(e.to_string()))
    }

    /// Renames the group. Requires an admin or owner role.
    pub async fn update_group(&self, group_id: &GroupId, actor: &UserId, name: &str) -> Result<Group, GroupApiError> {
        self.require_admin(group_id, actor).await?;
        self.db
            .update_group(group_id, name)
            .await
            .map_err(|e| GroupApiError::StorageError(e.to_string()))?
            .ok_or_else(|| GroupApiError::GroupNotFound(group_id.to_string()))
    }

    /// Deletes the group and everything under it. Only the owner may do this.
    pub async fn delete_group(&self, group_id: &GroupId, actor: &UserId) -> Result<(), GroupApiError> {
        let membership = self.require_member(group_id, actor).await?;
        if membership.role != MemberRole::Owner {
            return Err(GroupApiError::AccessDenied("only the group owner can delete the group".to_string()));
        }
        let deleted =
            self.db.delete_group(group_id).await.map_err(|e| GroupApiError::StorageError(e.to_string()))?;
        if !deleted {
            return Err(GroupApiError::GroupNotFound(group_id.to_string()));
        }
        info!("🔄️👥️ Group {group_id} deleted by {actor}");
        Ok(())
    }

    /// Adds a user to the group. Requires an admin or owner role; the user must exist and not already be a member.
    pub async fn add_member(
        &self,
        group_id: &GroupId,
        actor: &UserId,
        user_id: &UserId,
        role: MemberRole,
    ) -> Result<GroupMember, GroupApiError> {
        user_id.validate()?;
        self.require_admin(group_id, actor).await?;
        if self.db.fetch_user(user_id).await.map_err(|e| GroupApiError::StorageError(e.to_string()))?.is_none() {
            return Err(GroupApiError::UserNotFound(user_id.to_string()));
        }
        if self
            .db
            .fetch_membership(group_id, user_id)
            .await
            .map_err(|e| GroupApiError::StorageError(e.to_string()))?
            .is_some()
        {
            return Err(GroupApiError::AlreadyMember);
        }
        let member = GroupManagement::add_member(&self.db, group_id, user_id, role)
            .await
            .map_err(|e| GroupApiError::StorageError(e.to_string()))?;
        debug!("🔄️👥️ {user_id} added to group {group_id} as {role} by {actor}");
        Ok(member)
    }

    /// The membership gate: every group-scoped operation passes through here before touching the ledger.
    pub async fn require_member(&self, group_id: &GroupId, user_id: &UserId) -> Result<GroupMember, GroupApiError> {
        group_id.validate()?;
        user_id.validate()?;
        self.db
            .fetch_membership(group_id, user_id)
            .await
            .map_err(|e| GroupApiError::StorageError(e.to_string()))?
            .ok_or_else(|| GroupApiError::AccessDenied(format!("{user_id} is not a member of group {group_id}")))
    }

    async fn require_admin(&self, group_id: &GroupId, user_id: &UserId) -> Result<GroupMember, GroupApiError> {
        let membership = self.require_member(group_id, user_id).await?;
        if !membership.role.is_admin() {
            return Err(GroupApiError::AccessDenied("only group admins can perform this action".to_string()));
        }
        Ok(membership)
    }
}
