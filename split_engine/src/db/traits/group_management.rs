use crate::db_types::{Group, GroupId, GroupMember, GroupSummary, MemberDetail, MemberRole, NewGroup, UserId};

/// The `GroupManagement` trait defines behaviour for managing groups and their memberships.
///
/// A group is the unit of expense sharing: expenses, splits and settlements all hang off one group, and every
/// operation on them is gated on the caller being a member. The role attached to a membership (owner / admin /
/// member) decides who may change group metadata and membership itself.
#[allow(async_fn_in_trait)]
pub trait GroupManagement: Clone {
    type Error: std::error::Error;

    /// Creates the group and enrols `owner` with the [`MemberRole::Owner`] role in the same transaction.
    async fn create_group(&self, group: NewGroup, owner: &UserId) -> Result<Group, Self::Error>;

    async fn fetch_group(&self, group_id: &GroupId) -> Result<Option<Group>, Self::Error>;

    /// Groups the user belongs to, with member and expense counts.
    async fn fetch_groups_for_user(&self, user_id: &UserId) -> Result<Vec<GroupSummary>, Self::Error>;

    /// Returns `None` when the group does not exist.
    async fn update_group(&self, group_id: &GroupId, name: &str) -> Result<Option<Group>, Self::Error>;

    /// Deletes the group. Memberships, expenses, splits and settlements cascade. Returns whether a row was deleted.
    async fn delete_group(&self, group_id: &GroupId) -> Result<bool, Self::Error>;

    async fn add_member(
        &self,
        group_id: &GroupId,
        user_id: &UserId,
        role: MemberRole,
    ) -> Result<GroupMember, Self::Error>;

    /// The membership row linking the user to the group, if any.
    async fn fetch_membership(&self, group_id: &GroupId, user_id: &UserId)
        -> Result<Option<GroupMember>, Self::Error>;

    async fn fetch_members(&self, group_id: &GroupId) -> Result<Vec<MemberDetail>, Self::Error>;
}
