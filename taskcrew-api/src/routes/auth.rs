/// Authentication endpoints
///
/// # Endpoints
///
/// - `POST /api/auth/register` - Register a new user
/// - `POST /api/auth/login` - Login with email and password
/// - `GET /api/auth/profile` - Current user's profile with teams and open
///   assigned tasks
/// - `PUT /api/auth/profile` - Update profile (and optionally the password)

use crate::{
    app::AppState,
    error::{validation_message, ApiError, ApiResult},
    response::ApiResponse,
};
use axum::{extract::State, http::StatusCode, Extension, Json};
use serde::{Deserialize, Serialize};
use taskcrew_shared::{
    auth::{jwt, middleware::AuthContext, password},
    models::{
        task::Task,
        team::Team,
        user::{CreateUser, PublicUser, UpdateUser, User, UserRole},
    },
};
use uuid::Uuid;
use validator::Validate;

/// Register request
#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    /// Display name
    #[validate(length(min = 1, max = 100, message = "Name is required"))]
    pub name: String,

    /// Email address
    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    /// Password (minimum 8 characters)
    pub password: String,
}

/// Login request
#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    /// Email address
    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    /// Password
    pub password: String,
}

/// The identity payload returned by register and login
#[derive(Debug, Serialize)]
pub struct AuthData {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: UserRole,
    pub token: String,
}

/// Profile response payload
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileData {
    pub user: PublicUser,
    pub teams: Vec<Team>,
    pub open_tasks: Vec<Task>,
}

/// Profile update request
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProfileRequest {
    #[validate(length(min = 1, max = 100, message = "Name must not be empty"))]
    pub name: Option<String>,

    #[validate(email(message = "Invalid email format"))]
    pub email: Option<String>,

    /// Required when changing the password
    pub current_password: Option<String>,

    /// New password (minimum 8 characters)
    pub new_password: Option<String>,
}

/// Register a new user
///
/// # Errors
///
/// - `400 Bad Request`: validation failed, or the email is already
///   registered
/// - `500 Internal Server Error`: server error
pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> ApiResult<(StatusCode, Json<ApiResponse<AuthData>>)> {
    req.validate()
        .map_err(|e| ApiError::Validation(validation_message(&e)))?;
    password::validate_password(&req.password).map_err(ApiError::Validation)?;

    // Duplicate registration is a 400 with a stable message; the unique
    // constraint still backstops concurrent registrations as a 409.
    if User::find_by_email(&state.db, &req.email).await?.is_some() {
        return Err(ApiError::Validation(
            "User with this email already exists".to_string(),
        ));
    }

    let password_hash = password::hash_password(&req.password)?;

    let user = User::create(
        &state.db,
        CreateUser {
            name: req.name,
            email: req.email,
            password_hash,
        },
    )
    .await?;

    let token = jwt::create_token(&jwt::Claims::new(user.id), state.jwt_secret())?;

    tracing::info!(user_id = %user.id, "User registered");

    Ok(ApiResponse::created(AuthData {
        id: user.id,
        name: user.name,
        email: user.email,
        role: user.role,
        token,
    }))
}

/// Login with email and password
///
/// Unknown emails and wrong passwords both return the same 401 so the
/// response does not reveal which accounts exist.
pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> ApiResult<Json<ApiResponse<AuthData>>> {
    req.validate()
        .map_err(|e| ApiError::Validation(validation_message(&e)))?;

    let user = User::find_by_email(&state.db, &req.email)
        .await?
        .ok_or_else(|| ApiError::Unauthorized("Invalid credentials".to_string()))?;

    let valid = password::verify_password(&req.password, &user.password_hash)?;
    if !valid {
        return Err(ApiError::Unauthorized("Invalid credentials".to_string()));
    }

    let token = jwt::create_token(&jwt::Claims::new(user.id), state.jwt_secret())?;

    Ok(ApiResponse::ok(AuthData {
        id: user.id,
        name: user.name,
        email: user.email,
        role: user.role,
        token,
    }))
}

/// Current user's profile with their teams and open assigned tasks
pub async fn get_profile(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Json<ApiResponse<ProfileData>>> {
    let user = User::find_by_id(&state.db, auth.user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    let teams = Team::list_for_user(&state.db, auth.user_id).await?;
    let open_tasks = Task::list_open_for_assignee(&state.db, auth.user_id).await?;

    Ok(ApiResponse::ok(ProfileData {
        user: user.into(),
        teams,
        open_tasks,
    }))
}

/// Update the current user's profile
///
/// Changing the password requires the current password; a mismatch is a
/// 401.
pub async fn update_profile(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(req): Json<UpdateProfileRequest>,
) -> ApiResult<Json<ApiResponse<PublicUser>>> {
    req.validate()
        .map_err(|e| ApiError::Validation(validation_message(&e)))?;

    let user = User::find_by_id(&state.db, auth.user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    let password_hash = match (&req.current_password, &req.new_password) {
        (Some(current), Some(new)) => {
            if !password::verify_password(current, &user.password_hash)? {
                return Err(ApiError::Unauthorized(
                    "Current password is incorrect".to_string(),
                ));
            }
            password::validate_password(new).map_err(ApiError::Validation)?;
            Some(password::hash_password(new)?)
        }
        (None, Some(_)) => {
            return Err(ApiError::Validation(
                "Current password is required to change the password".to_string(),
            ));
        }
        _ => None,
    };

    let updated = User::update(
        &state.db,
        auth.user_id,
        UpdateUser {
            name: req.name,
            email: req.email,
            password_hash,
        },
    )
    .await?;

    Ok(ApiResponse::ok(updated.into()))
}
