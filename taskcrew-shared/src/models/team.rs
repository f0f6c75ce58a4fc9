/// Team model and database operations
///
/// This module provides the Team model: creation (with the owner's
/// membership inserted atomically), invite codes for self-service joins,
/// JSONB settings with shallow merge, and soft deletion via `is_active`.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE teams (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     name VARCHAR(255) NOT NULL,
///     description TEXT,
///     owner_id UUID NOT NULL REFERENCES users(id),
///     invite_code VARCHAR(32) NOT NULL UNIQUE,
///     is_active BOOLEAN NOT NULL DEFAULT TRUE,
///     settings JSONB NOT NULL DEFAULT '{}',
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```
///
/// The owner is immutable after creation; there is no ownership transfer.
/// Deleting a team flips `is_active` and keeps the row.

use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use sqlx::types::Json;
use sqlx::PgPool;
use uuid::Uuid;

use super::membership::MembershipRole;

/// Length of a generated invite code (base62 characters)
const INVITE_CODE_LENGTH: usize = 10;

/// What team members may do with team-scoped tasks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TaskPermissions {
    /// Members may create tasks in this team
    pub member_can_create: bool,

    /// Members may edit tasks in this team
    pub member_can_edit: bool,

    /// Members may delete tasks in this team
    pub member_can_delete: bool,
}

impl Default for TaskPermissions {
    fn default() -> Self {
        Self {
            member_can_create: true,
            member_can_edit: true,
            member_can_delete: false,
        }
    }
}

/// Per-team settings, stored as JSONB
///
/// Unknown keys in stored settings are dropped on read; missing keys take
/// their defaults, so rows written by older versions stay readable.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TeamSettings {
    /// Hide the team from non-members
    pub is_private: bool,

    /// Let plain members invite new members (owner/admin always can)
    pub allow_members_to_invite: bool,

    /// Member task permissions
    pub task_permissions: TaskPermissions,
}

impl TeamSettings {
    /// Applies a shallow merge of `patch` over these settings
    ///
    /// Mirrors the update semantics of a JS object spread: each top-level
    /// key present in the patch replaces the stored value wholesale, keys
    /// absent from the patch keep their stored values. A caller therefore
    /// cannot null out a previously set key without supplying a replacement.
    ///
    /// # Errors
    ///
    /// Returns a deserialization error when the patch has the wrong shape
    /// (e.g. a string where a bool belongs); callers map that to a
    /// validation failure.
    pub fn merged(&self, patch: &JsonValue) -> Result<TeamSettings, serde_json::Error> {
        let mut base = serde_json::to_value(self)?;

        if let (Some(base_map), Some(patch_map)) = (base.as_object_mut(), patch.as_object()) {
            for (key, value) in patch_map {
                base_map.insert(key.clone(), value.clone());
            }
        }

        serde_json::from_value(base)
    }
}

/// Team model
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Team {
    /// Unique team ID
    pub id: Uuid,

    /// Team name
    pub name: String,

    /// Optional description
    pub description: Option<String>,

    /// The creator; immutable for the lifetime of the team
    pub owner_id: Uuid,

    /// Opaque code permitting self-service joins; single-valued, does not
    /// expire, and is not rotated automatically
    pub invite_code: String,

    /// False once the team is soft-deleted
    pub is_active: bool,

    /// Team settings (JSONB)
    pub settings: Json<TeamSettings>,

    /// When the team was created
    pub created_at: DateTime<Utc>,

    /// When the team was last updated
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a new team
#[derive(Debug, Clone)]
pub struct CreateTeam {
    /// Team name (already trimmed and non-empty; the route validates)
    pub name: String,

    /// Optional description
    pub description: Option<String>,

    /// The creating user, who becomes owner
    pub owner_id: Uuid,

    /// Initial settings
    pub settings: TeamSettings,
}

/// Input for updating a team
///
/// `settings` is a partial JSON object shallow-merged over the stored
/// settings; the other fields replace their columns when present.
#[derive(Debug, Clone, Default)]
pub struct UpdateTeam {
    pub name: Option<String>,
    pub description: Option<String>,
    pub settings: Option<TeamSettings>,
}

/// Generates a random base62 invite code
///
/// Key space at length 10 is 62^10, comfortably unguessable for a
/// shareable code.
pub fn generate_invite_code() -> String {
    const CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";
    let mut rng = rand::thread_rng();

    (0..INVITE_CODE_LENGTH)
        .map(|_| {
            let idx = rng.gen_range(0..CHARSET.len());
            CHARSET[idx] as char
        })
        .collect()
}

impl Team {
    /// Creates a team together with the owner's membership row
    ///
    /// Both inserts run in one transaction, so a team is never observable
    /// without its owner membership and the owner membership always matches
    /// `owner_id`. A fresh invite code is generated here.
    pub async fn create(pool: &PgPool, data: CreateTeam) -> Result<Self, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let team = sqlx::query_as::<_, Team>(
            r#"
            INSERT INTO teams (name, description, owner_id, invite_code, settings)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, name, description, owner_id, invite_code, is_active,
                      settings, created_at, updated_at
            "#,
        )
        .bind(data.name)
        .bind(data.description)
        .bind(data.owner_id)
        .bind(generate_invite_code())
        .bind(Json(data.settings))
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            INSERT INTO memberships (team_id, user_id, role)
            VALUES ($1, $2, $3)
            "#,
        )
        .bind(team.id)
        .bind(data.owner_id)
        .bind(MembershipRole::Owner)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        tracing::info!(team_id = %team.id, owner_id = %team.owner_id, "Team created");
        Ok(team)
    }

    /// Finds a team by ID (active or not; callers decide how to treat
    /// soft-deleted rows)
    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        let team = sqlx::query_as::<_, Team>(
            r#"
            SELECT id, name, description, owner_id, invite_code, is_active,
                   settings, created_at, updated_at
            FROM teams
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(pool)
        .await?;

        Ok(team)
    }

    /// Finds an active team by its invite code
    pub async fn find_by_invite_code(
        pool: &PgPool,
        code: &str,
    ) -> Result<Option<Self>, sqlx::Error> {
        let team = sqlx::query_as::<_, Team>(
            r#"
            SELECT id, name, description, owner_id, invite_code, is_active,
                   settings, created_at, updated_at
            FROM teams
            WHERE invite_code = $1 AND is_active = TRUE
            "#,
        )
        .bind(code)
        .fetch_optional(pool)
        .await?;

        Ok(team)
    }

    /// Lists the active teams a user belongs to, newest first
    pub async fn list_for_user(pool: &PgPool, user_id: Uuid) -> Result<Vec<Self>, sqlx::Error> {
        let teams = sqlx::query_as::<_, Team>(
            r#"
            SELECT t.id, t.name, t.description, t.owner_id, t.invite_code,
                   t.is_active, t.settings, t.created_at, t.updated_at
            FROM teams t
            JOIN memberships m ON m.team_id = t.id
            WHERE m.user_id = $1 AND t.is_active = TRUE
            ORDER BY t.created_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(pool)
        .await?;

        Ok(teams)
    }

    /// Updates the allow-listed team fields
    ///
    /// The caller performs the settings merge (via [`TeamSettings::merged`])
    /// so the stored value is always the complete, merged object.
    pub async fn update(pool: &PgPool, id: Uuid, data: UpdateTeam) -> Result<Self, sqlx::Error> {
        let team = sqlx::query_as::<_, Team>(
            r#"
            UPDATE teams
            SET name = COALESCE($2, name),
                description = COALESCE($3, description),
                settings = COALESCE($4, settings),
                updated_at = NOW()
            WHERE id = $1
            RETURNING id, name, description, owner_id, invite_code, is_active,
                      settings, created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(data.name)
        .bind(data.description)
        .bind(data.settings.map(Json))
        .fetch_one(pool)
        .await?;

        Ok(team)
    }

    /// Soft-deletes a team by flipping `is_active`
    ///
    /// Membership rows are kept; listings filter on `is_active`.
    pub async fn soft_delete(pool: &PgPool, id: Uuid) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE teams SET is_active = FALSE, updated_at = NOW() WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        tracing::info!(team_id = %id, "Team soft-deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_invite_code_shape() {
        let code = generate_invite_code();
        assert_eq!(code.len(), INVITE_CODE_LENGTH);
        assert!(code.chars().all(|c| c.is_ascii_alphanumeric()));

        // Two codes colliding would be a one-in-62^10 event.
        assert_ne!(generate_invite_code(), generate_invite_code());
    }

    #[test]
    fn test_settings_defaults() {
        let settings = TeamSettings::default();
        assert!(!settings.is_private);
        assert!(!settings.allow_members_to_invite);
        assert!(settings.task_permissions.member_can_create);
        assert!(settings.task_permissions.member_can_edit);
        assert!(!settings.task_permissions.member_can_delete);
    }

    #[test]
    fn test_settings_merge_is_shallow() {
        let current = TeamSettings {
            is_private: true,
            allow_members_to_invite: true,
            task_permissions: TaskPermissions::default(),
        };

        let merged = current.merged(&json!({ "isPrivate": false })).unwrap();

        assert!(!merged.is_private);
        // Keys absent from the patch keep their stored values.
        assert!(merged.allow_members_to_invite);
        assert!(merged.task_permissions.member_can_edit);
    }

    #[test]
    fn test_settings_merge_replaces_nested_object_wholesale() {
        let current = TeamSettings::default();

        let merged = current
            .merged(&json!({ "taskPermissions": { "memberCanDelete": true } }))
            .unwrap();

        assert!(merged.task_permissions.member_can_delete);
        // The nested object was replaced, so its unset keys fall back to
        // defaults rather than the stored values.
        assert!(merged.task_permissions.member_can_create);
    }

    #[test]
    fn test_settings_merge_rejects_wrong_types() {
        let current = TeamSettings::default();
        assert!(current.merged(&json!({ "isPrivate": "yes" })).is_err());
    }

    #[test]
    fn test_settings_wire_casing() {
        let json = serde_json::to_string(&TeamSettings::default()).unwrap();
        assert!(json.contains("allowMembersToInvite"));
        assert!(json.contains("memberCanCreate"));
    }
}
