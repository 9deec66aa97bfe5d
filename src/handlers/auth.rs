use axum::extract::State;
use axum::http::StatusCode;
use tracing::{info, warn};

use crate::auth::{check_password, create_user, find_by_email, find_by_username};
use crate::error::AppError;
use crate::extract::{Json, Query};
use crate::models::{LoginQuery, Registration, UserResponse};
use crate::AppState;

/// Credential probe. Issues no session or token.
pub async fn login(
    State(state): State<AppState>,
    Query(req): Query<LoginQuery>,
) -> Result<Json<UserResponse>, AppError> {
    let user = find_by_username(&state.db, &req.username)?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    if !check_password(&user, &req.password).await? {
        warn!(username = %user.username, "Wrong password");
        return Err(AppError::BadRequest("Wrong password".to_string()));
    }

    info!(user_id = %user.id, "User logged in");
    // Echoes the submitted password; existing clients depend on the response shape.
    Ok(Json(UserResponse {
        id: user.id,
        registration: Registration {
            username: user.username,
            email: user.email,
            password: req.password,
        },
    }))
}

pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<Registration>,
) -> Result<StatusCode, AppError> {
    if find_by_username(&state.db, &req.username)?.is_some() {
        return Err(AppError::BadRequest(format!(
            "User already exists with user name {}",
            req.username
        )));
    }

    if find_by_email(&state.db, &req.email)?.is_some() {
        return Err(AppError::BadRequest(format!(
            "User already exists with email {}",
            req.email
        )));
    }

    let result = create_user(&state.db, &req).await?;
    if !result.succeeded() {
        return Err(AppError::BadRequest(result.errors.join(";")));
    }

    info!(username = %req.username, "Registered user");
    Ok(StatusCode::OK)
}
