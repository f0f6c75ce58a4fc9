/// Membership model and database operations
///
/// This module provides the Membership model for user-team relationships.
/// It implements a many-to-many relationship between users and teams with
/// role-based access control.
///
/// # Schema
///
/// ```sql
/// CREATE TYPE membership_role AS ENUM ('owner', 'admin', 'member');
///
/// CREATE TABLE memberships (
///     team_id UUID NOT NULL REFERENCES teams(id) ON DELETE CASCADE,
///     user_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
///     role membership_role NOT NULL DEFAULT 'member',
///     invited_by UUID REFERENCES users(id) ON DELETE SET NULL,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     PRIMARY KEY (team_id, user_id)
/// );
/// ```
///
/// The primary key enforces the invariant that a user holds exactly one
/// membership per team. The team creator's `owner` row is inserted in the
/// same transaction as the team itself (see [`crate::models::team::Team::create`]),
/// so a team always has exactly one owner matching `teams.owner_id`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

/// Role a user holds within one team
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "membership_role", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum MembershipRole {
    /// Team creator: full control, including deletion
    Owner,

    /// Can edit the team and manage members
    Admin,

    /// Regular member
    Member,
}

impl MembershipRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            MembershipRole::Owner => "owner",
            MembershipRole::Admin => "admin",
            MembershipRole::Member => "member",
        }
    }

    /// Checks if this role ranks at least as high as `required`
    ///
    /// Hierarchy: Owner > Admin > Member
    pub fn has_permission(&self, required: &MembershipRole) -> bool {
        self.permission_level() >= required.permission_level()
    }

    fn permission_level(&self) -> u8 {
        match self {
            MembershipRole::Owner => 3,
            MembershipRole::Admin => 2,
            MembershipRole::Member => 1,
        }
    }
}

/// Membership model linking a user to a team with a role
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Membership {
    /// Team ID
    pub team_id: Uuid,

    /// User ID
    pub user_id: Uuid,

    /// Role within the team
    pub role: MembershipRole,

    /// Who invited this member (None for the owner and self-service joins)
    pub invited_by: Option<Uuid>,

    /// When the membership was created
    pub created_at: DateTime<Utc>,
}

/// A membership row joined with the member's public identity, for listings
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct MemberEntry {
    pub team_id: Uuid,
    pub user_id: Uuid,
    pub role: MembershipRole,
    pub invited_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub name: String,
    pub email: String,
}

/// Input for creating a new membership
#[derive(Debug, Clone)]
pub struct CreateMembership {
    pub team_id: Uuid,
    pub user_id: Uuid,
    pub role: MembershipRole,
    pub invited_by: Option<Uuid>,
}

impl Membership {
    /// Creates a new membership (adds a user to a team)
    ///
    /// # Errors
    ///
    /// Fails with a unique constraint violation if a row for this
    /// (team, user) pair already exists; callers surface that as a
    /// duplicate-membership conflict rather than ignoring the second join.
    pub async fn create(pool: &PgPool, data: CreateMembership) -> Result<Self, sqlx::Error> {
        let membership = sqlx::query_as::<_, Membership>(
            r#"
            INSERT INTO memberships (team_id, user_id, role, invited_by)
            VALUES ($1, $2, $3, $4)
            RETURNING team_id, user_id, role, invited_by, created_at
            "#,
        )
        .bind(data.team_id)
        .bind(data.user_id)
        .bind(data.role)
        .bind(data.invited_by)
        .fetch_one(pool)
        .await?;

        Ok(membership)
    }

    /// Finds a specific membership by team and user
    pub async fn find(
        pool: &PgPool,
        team_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        let membership = sqlx::query_as::<_, Membership>(
            r#"
            SELECT team_id, user_id, role, invited_by, created_at
            FROM memberships
            WHERE team_id = $1 AND user_id = $2
            "#,
        )
        .bind(team_id)
        .bind(user_id)
        .fetch_optional(pool)
        .await?;

        Ok(membership)
    }

    /// Gets a user's role in a team, or None if they are not a member
    pub async fn get_role(
        pool: &PgPool,
        team_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<MembershipRole>, sqlx::Error> {
        let role: Option<MembershipRole> = sqlx::query_scalar(
            r#"
            SELECT role FROM memberships
            WHERE team_id = $1 AND user_id = $2
            "#,
        )
        .bind(team_id)
        .bind(user_id)
        .fetch_optional(pool)
        .await?;

        Ok(role)
    }

    /// Updates a user's role in a team
    ///
    /// Returns the updated membership, or None if the row does not exist.
    /// The owner row is never updated through this path; the route layer
    /// restricts the assignable roles to admin and member.
    pub async fn update_role(
        pool: &PgPool,
        team_id: Uuid,
        user_id: Uuid,
        role: MembershipRole,
    ) -> Result<Option<Self>, sqlx::Error> {
        let membership = sqlx::query_as::<_, Membership>(
            r#"
            UPDATE memberships
            SET role = $3
            WHERE team_id = $1 AND user_id = $2
            RETURNING team_id, user_id, role, invited_by, created_at
            "#,
        )
        .bind(team_id)
        .bind(user_id)
        .bind(role)
        .fetch_optional(pool)
        .await?;

        Ok(membership)
    }

    /// Deletes a membership (removes a user from a team)
    ///
    /// Returns true if a row was deleted, false if no such membership
    /// existed.
    pub async fn delete(pool: &PgPool, team_id: Uuid, user_id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM memberships WHERE team_id = $1 AND user_id = $2")
            .bind(team_id)
            .bind(user_id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Lists all members of a team with their public identity
    pub async fn list_by_team(pool: &PgPool, team_id: Uuid) -> Result<Vec<MemberEntry>, sqlx::Error> {
        let members = sqlx::query_as::<_, MemberEntry>(
            r#"
            SELECT m.team_id, m.user_id, m.role, m.invited_by, m.created_at,
                   u.name, u.email
            FROM memberships m
            JOIN users u ON u.id = m.user_id
            WHERE m.team_id = $1
            ORDER BY m.created_at ASC
            "#,
        )
        .bind(team_id)
        .fetch_all(pool)
        .await?;

        Ok(members)
    }

    /// Lists all memberships a user holds
    pub async fn list_by_user(pool: &PgPool, user_id: Uuid) -> Result<Vec<Self>, sqlx::Error> {
        let memberships = sqlx::query_as::<_, Membership>(
            r#"
            SELECT team_id, user_id, role, invited_by, created_at
            FROM memberships
            WHERE user_id = $1
            ORDER BY created_at ASC
            "#,
        )
        .bind(user_id)
        .fetch_all(pool)
        .await?;

        Ok(memberships)
    }

    /// Counts members in a team
    pub async fn count_by_team(pool: &PgPool, team_id: Uuid) -> Result<i64, sqlx::Error> {
        let (count,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM memberships WHERE team_id = $1")
                .bind(team_id)
                .fetch_one(pool)
                .await?;

        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_membership_role_as_str() {
        assert_eq!(MembershipRole::Owner.as_str(), "owner");
        assert_eq!(MembershipRole::Admin.as_str(), "admin");
        assert_eq!(MembershipRole::Member.as_str(), "member");
    }

    #[test]
    fn test_role_hierarchy() {
        assert!(MembershipRole::Owner.has_permission(&MembershipRole::Admin));
        assert!(MembershipRole::Owner.has_permission(&MembershipRole::Owner));
        assert!(MembershipRole::Admin.has_permission(&MembershipRole::Member));
        assert!(!MembershipRole::Admin.has_permission(&MembershipRole::Owner));
        assert!(!MembershipRole::Member.has_permission(&MembershipRole::Admin));
        assert!(MembershipRole::Member.has_permission(&MembershipRole::Member));
    }

    #[test]
    fn test_role_serialization_is_lowercase() {
        assert_eq!(
            serde_json::to_string(&MembershipRole::Owner).unwrap(),
            "\"owner\""
        );
        assert_eq!(
            serde_json::from_str::<MembershipRole>("\"member\"").unwrap(),
            MembershipRole::Member
        );
    }
}
