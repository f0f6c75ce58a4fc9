/// Authorization guard: pure permission decisions
///
/// Every function here is a read-and-decide over rows the caller has
/// already loaded; the guard performs no queries and holds no state. Routes
/// resolve the target (surfacing not-found first), fetch the caller's
/// membership, then consult the guard.
///
/// # Permission matrix
///
/// | Action            | Owner | Admin | Member | Non-member |
/// |-------------------|-------|-------|--------|------------|
/// | edit team         | yes   | yes   | no     | no         |
/// | delete team       | yes   | no    | no     | no         |
/// | invite            | yes   | yes   | (1)    | no         |
/// | manage members    | yes   | yes   | (2)    | no         |
/// | edit/delete task  | creator only, regardless of team role          |
///
/// (1) iff the team's `allowMembersToInvite` setting is on.
/// (2) a member may remove only themself; enforced at the route with
///     [`can_manage_members`] plus the self-removal exception.

use uuid::Uuid;

use crate::models::membership::{Membership, MembershipRole};
use crate::models::task::Task;
use crate::models::team::TeamSettings;

use serde::{Deserialize, Serialize};

/// Looks up a user's role in a loaded membership set
///
/// None means not-a-member.
pub fn role_of(memberships: &[Membership], user_id: Uuid) -> Option<MembershipRole> {
    memberships
        .iter()
        .find(|m| m.user_id == user_id)
        .map(|m| m.role)
}

/// Owner and admin may edit team name, description, and settings
pub fn can_edit_team(role: Option<MembershipRole>) -> bool {
    matches!(role, Some(MembershipRole::Owner | MembershipRole::Admin))
}

/// Only the owner may delete (soft-delete) a team
pub fn can_delete_team(role: Option<MembershipRole>) -> bool {
    matches!(role, Some(MembershipRole::Owner))
}

/// Owner/admin may always invite; members only when the team setting
/// allows it
pub fn can_invite(settings: &TeamSettings, role: Option<MembershipRole>) -> bool {
    match role {
        Some(MembershipRole::Owner | MembershipRole::Admin) => true,
        Some(MembershipRole::Member) => settings.allow_members_to_invite,
        None => false,
    }
}

/// Owner and admin may remove members and change roles
///
/// A plain member removing themself is a route-level exception on top of
/// this check.
pub fn can_manage_members(role: Option<MembershipRole>) -> bool {
    matches!(role, Some(MembershipRole::Owner | MembershipRole::Admin))
}

/// Whether a member role may create tasks scoped to the team
pub fn can_create_team_task(settings: &TeamSettings, role: Option<MembershipRole>) -> bool {
    match role {
        Some(MembershipRole::Owner | MembershipRole::Admin) => true,
        Some(MembershipRole::Member) => settings.task_permissions.member_can_create,
        None => false,
    }
}

/// Only the creator may edit a task
///
/// Single-owner policy: team owners and admins get no edit rights over
/// other members' tasks.
pub fn can_edit_task(task: &Task, user_id: Uuid) -> bool {
    task.creator_id == user_id
}

/// Only the creator may delete (archive) a task
pub fn can_delete_task(task: &Task, user_id: Uuid) -> bool {
    task.creator_id == user_id
}

/// Whether a user may view a task
///
/// Team tasks are visible to any team member; personal tasks only to their
/// creator. `role` is the user's role in the task's team, when the task has
/// one.
pub fn can_view_task(task: &Task, role: Option<MembershipRole>, user_id: Uuid) -> bool {
    if task.team_id.is_some() {
        role.is_some() || task.creator_id == user_id
    } else {
        task.creator_id == user_id
    }
}

/// The caller's effective rights over a team, as reported by the team
/// detail endpoint
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamPermissions {
    pub can_edit: bool,
    pub can_delete: bool,
    pub can_invite: bool,
    pub can_manage_members: bool,
}

/// Derives the full permission set for one caller and team
pub fn team_permissions(settings: &TeamSettings, role: Option<MembershipRole>) -> TeamPermissions {
    TeamPermissions {
        can_edit: can_edit_team(role),
        can_delete: can_delete_team(role),
        can_invite: can_invite(settings, role),
        can_manage_members: can_manage_members(role),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::task::{TaskPriority, TaskStatus};
    use chrono::Utc;

    fn membership(team_id: Uuid, user_id: Uuid, role: MembershipRole) -> Membership {
        Membership {
            team_id,
            user_id,
            role,
            invited_by: None,
            created_at: Utc::now(),
        }
    }

    fn task(creator_id: Uuid, team_id: Option<Uuid>) -> Task {
        Task {
            id: Uuid::new_v4(),
            title: "Write spec".to_string(),
            description: None,
            status: TaskStatus::Todo,
            priority: TaskPriority::Medium,
            due_date: None,
            creator_id,
            team_id,
            assignee_id: None,
            is_archived: false,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_role_of_looks_up_the_unique_row() {
        let team_id = Uuid::new_v4();
        let alice = Uuid::new_v4();
        let bob = Uuid::new_v4();

        let memberships = vec![
            membership(team_id, alice, MembershipRole::Owner),
            membership(team_id, bob, MembershipRole::Member),
        ];

        assert_eq!(role_of(&memberships, alice), Some(MembershipRole::Owner));
        assert_eq!(role_of(&memberships, bob), Some(MembershipRole::Member));
        assert_eq!(role_of(&memberships, Uuid::new_v4()), None);
    }

    #[test]
    fn test_team_edit_and_delete_matrix() {
        assert!(can_edit_team(Some(MembershipRole::Owner)));
        assert!(can_edit_team(Some(MembershipRole::Admin)));
        assert!(!can_edit_team(Some(MembershipRole::Member)));
        assert!(!can_edit_team(None));

        assert!(can_delete_team(Some(MembershipRole::Owner)));
        assert!(!can_delete_team(Some(MembershipRole::Admin)));
        assert!(!can_delete_team(Some(MembershipRole::Member)));
        assert!(!can_delete_team(None));
    }

    #[test]
    fn test_invite_follows_team_setting_for_members() {
        let closed = TeamSettings::default();
        let mut open = TeamSettings::default();
        open.allow_members_to_invite = true;

        assert!(can_invite(&closed, Some(MembershipRole::Owner)));
        assert!(can_invite(&closed, Some(MembershipRole::Admin)));
        assert!(!can_invite(&closed, Some(MembershipRole::Member)));
        assert!(can_invite(&open, Some(MembershipRole::Member)));
        assert!(!can_invite(&open, None));
    }

    #[test]
    fn test_task_edit_is_creator_only_even_for_team_owner() {
        let creator = Uuid::new_v4();
        let team_owner = Uuid::new_v4();
        let task = task(creator, Some(Uuid::new_v4()));

        assert!(can_edit_task(&task, creator));
        assert!(can_delete_task(&task, creator));

        // The team owner is not the creator; no edit rights.
        assert!(!can_edit_task(&task, team_owner));
        assert!(!can_delete_task(&task, team_owner));
    }

    #[test]
    fn test_task_visibility() {
        let creator = Uuid::new_v4();
        let other = Uuid::new_v4();

        let personal = task(creator, None);
        assert!(can_view_task(&personal, None, creator));
        assert!(!can_view_task(&personal, None, other));

        let team_task = task(creator, Some(Uuid::new_v4()));
        assert!(can_view_task(&team_task, Some(MembershipRole::Member), other));
        assert!(!can_view_task(&team_task, None, other));
        // The creator keeps visibility even without a membership row.
        assert!(can_view_task(&team_task, None, creator));
    }

    #[test]
    fn test_team_task_creation_permission() {
        let mut settings = TeamSettings::default();
        assert!(can_create_team_task(&settings, Some(MembershipRole::Member)));

        settings.task_permissions.member_can_create = false;
        assert!(!can_create_team_task(&settings, Some(MembershipRole::Member)));
        assert!(can_create_team_task(&settings, Some(MembershipRole::Admin)));
        assert!(!can_create_team_task(&settings, None));
    }

    #[test]
    fn test_team_permissions_bundle() {
        let settings = TeamSettings::default();

        let owner = team_permissions(&settings, Some(MembershipRole::Owner));
        assert!(owner.can_edit && owner.can_delete && owner.can_invite && owner.can_manage_members);

        let member = team_permissions(&settings, Some(MembershipRole::Member));
        assert!(!member.can_edit && !member.can_delete && !member.can_invite);
        assert!(!member.can_manage_members);
    }
}
