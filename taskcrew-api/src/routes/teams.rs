/// Team endpoints
///
/// Team CRUD, membership management, invites, and self-service joins via
/// invite code. Every permission decision goes through the guard
/// (`taskcrew_shared::auth::guard`) after the target rows are loaded here;
/// not-found always surfaces before a permission check so a caller cannot
/// probe for hidden teams.
///
/// # Endpoints
///
/// - `POST /api/teams` - Create team (creator becomes owner)
/// - `GET /api/teams` - List the caller's active teams
/// - `GET /api/teams/:id` - Team detail with the caller's role and rights
/// - `PUT /api/teams/:id` - Update name/description/settings (owner/admin)
/// - `DELETE /api/teams/:id` - Soft-delete (owner only)
/// - `GET /api/teams/:id/members` - Member listing with the invite code
/// - `POST /api/teams/:id/members` - Invite a registered user by email
/// - `PUT /api/teams/:id/members/:user_id` - Change a member's role (owner)
/// - `DELETE /api/teams/:id/members/:user_id` - Remove a member
/// - `POST /api/teams/join/:invite_code` - Join as member via invite code

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    response::ApiResponse,
};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use taskcrew_shared::{
    auth::{guard, middleware::AuthContext},
    models::{
        membership::{CreateMembership, MemberEntry, Membership, MembershipRole},
        team::{CreateTeam, Team, TeamSettings, UpdateTeam},
        user::User,
    },
};
use uuid::Uuid;

/// Create team request
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTeamRequest {
    pub name: String,
    pub description: Option<String>,
    #[serde(default)]
    pub is_private: bool,
}

/// Update team request
///
/// `settings` is a partial object shallow-merged over the stored settings.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTeamRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub settings: Option<JsonValue>,
}

/// Invite request
#[derive(Debug, Deserialize)]
pub struct InviteMemberRequest {
    pub email: String,
    pub role: Option<String>,
}

/// Role change request
#[derive(Debug, Deserialize)]
pub struct UpdateMemberRoleRequest {
    pub role: String,
}

#[derive(Debug, Serialize)]
pub struct TeamData {
    pub team: Team,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamListData {
    pub teams: Vec<Team>,
    pub count: usize,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamDetailData {
    pub team: Team,
    pub user_role: MembershipRole,
    pub permissions: guard::TeamPermissions,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberListData {
    pub members: Vec<MemberEntry>,
    pub invite_code: String,
    pub count: usize,
}

#[derive(Debug, Serialize)]
pub struct MemberData {
    pub member: Membership,
}

#[derive(Debug, Serialize)]
pub struct MessageData {
    pub message: String,
}

/// Parses a role that may be assigned through the API
///
/// Owner is never assignable; it exists only through team creation.
fn parse_assignable_role(value: &str) -> Result<MembershipRole, ApiError> {
    match value {
        "admin" => Ok(MembershipRole::Admin),
        "member" => Ok(MembershipRole::Member),
        _ => Err(ApiError::Validation(
            "Valid role is required (admin or member)".to_string(),
        )),
    }
}

/// Loads an active team or surfaces not-found
///
/// Soft-deleted teams are invisible everywhere, matching the uniform
/// soft-delete policy.
async fn load_active_team(state: &AppState, team_id: Uuid) -> ApiResult<Team> {
    let team = Team::find_by_id(&state.db, team_id)
        .await?
        .filter(|t| t.is_active)
        .ok_or_else(|| ApiError::NotFound("Team not found".to_string()))?;

    Ok(team)
}

/// Create a new team
///
/// The creator receives the owner membership in the same transaction and
/// an invite code is generated.
pub async fn create_team(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(req): Json<CreateTeamRequest>,
) -> ApiResult<(StatusCode, Json<ApiResponse<TeamData>>)> {
    let name = req.name.trim();
    if name.is_empty() {
        return Err(ApiError::Validation("Team name is required".to_string()));
    }

    let team = Team::create(
        &state.db,
        CreateTeam {
            name: name.to_string(),
            description: req.description.map(|d| d.trim().to_string()),
            owner_id: auth.user_id,
            settings: TeamSettings {
                is_private: req.is_private,
                ..TeamSettings::default()
            },
        },
    )
    .await?;

    Ok(ApiResponse::created(TeamData { team }))
}

/// List the caller's active teams, newest first
pub async fn get_my_teams(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Json<ApiResponse<TeamListData>>> {
    let teams = Team::list_for_user(&state.db, auth.user_id).await?;
    let count = teams.len();

    Ok(ApiResponse::ok(TeamListData { teams, count }))
}

/// Team detail, member-only
///
/// Includes the caller's role and their effective permissions so the
/// client can gate its UI without re-deriving the rules.
pub async fn get_team(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(team_id): Path<Uuid>,
) -> ApiResult<Json<ApiResponse<TeamDetailData>>> {
    let team = load_active_team(&state, team_id).await?;

    let role = Membership::get_role(&state.db, team_id, auth.user_id)
        .await?
        .ok_or_else(|| {
            ApiError::Forbidden("Access denied. You are not a member of this team.".to_string())
        })?;

    let permissions = guard::team_permissions(&team.settings, Some(role));

    Ok(ApiResponse::ok(TeamDetailData {
        team,
        user_role: role,
        permissions,
    }))
}

/// Update team fields (owner/admin)
///
/// Settings are shallow-merged: keys absent from the patch keep their
/// stored values.
pub async fn update_team(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(team_id): Path<Uuid>,
    Json(req): Json<UpdateTeamRequest>,
) -> ApiResult<Json<ApiResponse<TeamData>>> {
    let team = load_active_team(&state, team_id).await?;

    let role = Membership::get_role(&state.db, team_id, auth.user_id).await?;
    if !guard::can_edit_team(role) {
        return Err(ApiError::Forbidden(
            "Access denied. Insufficient permissions.".to_string(),
        ));
    }

    let name = match req.name {
        Some(name) => {
            let name = name.trim().to_string();
            if name.is_empty() {
                return Err(ApiError::Validation("Team name is required".to_string()));
            }
            Some(name)
        }
        None => None,
    };

    let settings = match req.settings {
        Some(patch) => Some(team.settings.merged(&patch).map_err(|_| {
            ApiError::Validation("Invalid team settings".to_string())
        })?),
        None => None,
    };

    let updated = Team::update(
        &state.db,
        team_id,
        UpdateTeam {
            name,
            description: req.description,
            settings,
        },
    )
    .await?;

    Ok(ApiResponse::ok(TeamData { team: updated }))
}

/// Soft-delete a team (owner only)
pub async fn delete_team(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(team_id): Path<Uuid>,
) -> ApiResult<Json<ApiResponse<MessageData>>> {
    let _team = load_active_team(&state, team_id).await?;

    let role = Membership::get_role(&state.db, team_id, auth.user_id).await?;
    if !guard::can_delete_team(role) {
        return Err(ApiError::Forbidden(
            "Access denied. Only team owner can delete the team.".to_string(),
        ));
    }

    Team::soft_delete(&state.db, team_id).await?;

    Ok(ApiResponse::ok(MessageData {
        message: "Team deleted successfully".to_string(),
    }))
}

/// Member listing with the invite code, member-only
pub async fn get_team_members(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(team_id): Path<Uuid>,
) -> ApiResult<Json<ApiResponse<MemberListData>>> {
    let team = load_active_team(&state, team_id).await?;

    if Membership::get_role(&state.db, team_id, auth.user_id)
        .await?
        .is_none()
    {
        return Err(ApiError::Forbidden(
            "Access denied. You are not a member of this team.".to_string(),
        ));
    }

    let members = Membership::list_by_team(&state.db, team_id).await?;
    let count = members.len();

    Ok(ApiResponse::ok(MemberListData {
        members,
        invite_code: team.invite_code,
        count,
    }))
}

/// Invite a registered user by email
///
/// Permission follows the team's invite policy: owner/admin always,
/// members only when `allowMembersToInvite` is set.
pub async fn invite_member(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(team_id): Path<Uuid>,
    Json(req): Json<InviteMemberRequest>,
) -> ApiResult<Json<ApiResponse<MemberData>>> {
    if req.email.trim().is_empty() {
        return Err(ApiError::Validation("Email is required".to_string()));
    }

    let team = load_active_team(&state, team_id).await?;

    let role = Membership::get_role(&state.db, team_id, auth.user_id).await?;
    if !guard::can_invite(&team.settings, role) {
        return Err(ApiError::Forbidden(
            "Access denied. You cannot invite members to this team.".to_string(),
        ));
    }

    let invitee_role = match req.role.as_deref() {
        Some(value) => parse_assignable_role(value)?,
        None => MembershipRole::Member,
    };

    let invitee = User::find_by_email(&state.db, req.email.trim())
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found with this email".to_string()))?;

    if Membership::find(&state.db, team_id, invitee.id)
        .await?
        .is_some()
    {
        return Err(ApiError::Conflict(
            "User is already a member of this team".to_string(),
        ));
    }

    let member = Membership::create(
        &state.db,
        CreateMembership {
            team_id,
            user_id: invitee.id,
            role: invitee_role,
            invited_by: Some(auth.user_id),
        },
    )
    .await?;

    tracing::info!(team_id = %team_id, user_id = %invitee.id, "Member invited");

    Ok(ApiResponse::ok(MemberData { member }))
}

/// Join a team via its invite code
///
/// A second join attempt is rejected with a conflict, not silently
/// ignored.
pub async fn join_team(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(invite_code): Path<String>,
) -> ApiResult<Json<ApiResponse<TeamData>>> {
    let team = Team::find_by_invite_code(&state.db, &invite_code)
        .await?
        .ok_or_else(|| ApiError::NotFound("Invalid invite code".to_string()))?;

    if Membership::find(&state.db, team.id, auth.user_id)
        .await?
        .is_some()
    {
        return Err(ApiError::Conflict(
            "You are already a member of this team".to_string(),
        ));
    }

    Membership::create(
        &state.db,
        CreateMembership {
            team_id: team.id,
            user_id: auth.user_id,
            role: MembershipRole::Member,
            invited_by: None,
        },
    )
    .await?;

    tracing::info!(team_id = %team.id, user_id = %auth.user_id, "Joined team via invite code");

    Ok(ApiResponse::ok(TeamData { team }))
}

/// Remove a member
///
/// Owner/admin may remove anyone but the owner; a plain member may only
/// remove themself.
pub async fn remove_member(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path((team_id, member_id)): Path<(Uuid, Uuid)>,
) -> ApiResult<Json<ApiResponse<MessageData>>> {
    let team = load_active_team(&state, team_id).await?;

    let caller_role = Membership::get_role(&state.db, team_id, auth.user_id).await?;
    let removing_self = auth.user_id == member_id;

    if !guard::can_manage_members(caller_role) && !removing_self {
        return Err(ApiError::Forbidden(
            "Access denied. Insufficient permissions.".to_string(),
        ));
    }

    // The owner row is never removable; a team is never left ownerless.
    if member_id == team.owner_id {
        return Err(ApiError::Validation(
            "Team owner cannot be removed".to_string(),
        ));
    }

    let removed = Membership::delete(&state.db, team_id, member_id).await?;
    if !removed {
        return Err(ApiError::NotFound("Member not found in team".to_string()));
    }

    tracing::info!(team_id = %team_id, user_id = %member_id, "Member removed");

    Ok(ApiResponse::ok(MessageData {
        message: "Member removed successfully".to_string(),
    }))
}

/// Change a member's role (owner only)
///
/// Only admin and member are assignable; the owner role cannot be granted
/// or revoked through this path.
pub async fn update_member_role(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path((team_id, member_id)): Path<(Uuid, Uuid)>,
    Json(req): Json<UpdateMemberRoleRequest>,
) -> ApiResult<Json<ApiResponse<MemberData>>> {
    let new_role = parse_assignable_role(&req.role)?;

    let team = load_active_team(&state, team_id).await?;

    if auth.user_id != team.owner_id {
        return Err(ApiError::Forbidden(
            "Access denied. Only team owner can update member roles.".to_string(),
        ));
    }

    if member_id == team.owner_id {
        return Err(ApiError::Validation(
            "The team owner's role cannot be changed".to_string(),
        ));
    }

    let member = Membership::update_role(&state.db, team_id, member_id, new_role)
        .await?
        .ok_or_else(|| ApiError::NotFound("Member not found in team".to_string()))?;

    Ok(ApiResponse::ok(MemberData { member }))
}
