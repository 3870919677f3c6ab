use axum::{
    extract::{Path, State},
    routing::get,
    Json, Router,
};
use serde_json::{json, Value};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::{
    auth::{
        extractors::{AdminClaims, AuthUser},
        password::hash_password,
    },
    error::ApiError,
    state::AppState,
    users::{dto::UpdateUserRequest, repo::User, repo::UserChanges},
    validate::{is_valid_email, is_valid_password},
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/users", get(list_users))
        .route(
            "/users/:id",
            get(get_user).put(update_user).delete(delete_user),
        )
}

#[instrument(skip(state))]
pub async fn list_users(
    State(state): State<AppState>,
    AdminClaims(_): AdminClaims,
) -> Result<Json<Vec<User>>, ApiError> {
    Ok(Json(User::list(&state.db).await?))
}

#[instrument(skip(state, actor))]
pub async fn get_user(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<User>, ApiError> {
    if !actor.is_admin && actor.id != id {
        return Err(ApiError::Forbidden("Access denied".into()));
    }
    let user = User::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".into()))?;
    Ok(Json(user))
}

#[instrument(skip(state, actor, payload))]
pub async fn update_user(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateUserRequest>,
) -> Result<Json<User>, ApiError> {
    if !actor.is_admin && actor.id != id {
        return Err(ApiError::Forbidden("Access denied".into()));
    }
    if User::find_by_id(&state.db, id).await?.is_none() {
        return Err(ApiError::NotFound("User not found".into()));
    }

    if payload.is_admin.is_some() {
        if !actor.is_admin {
            return Err(ApiError::Forbidden(
                "You cannot change admin privileges".into(),
            ));
        }
        // An admin never changes their own flag, in either direction.
        if actor.id == id {
            return Err(ApiError::Forbidden(
                "You cannot change your own admin role".into(),
            ));
        }
    }

    let email = match payload.email {
        Some(raw) => {
            let email = raw.trim().to_lowercase();
            if !is_valid_email(&email) {
                return Err(ApiError::Validation("Invalid email".into()));
            }
            if User::email_taken_by_other(&state.db, &email, id).await? {
                warn!("email already in use");
                return Err(ApiError::Conflict("Email already in use".into()));
            }
            Some(email)
        }
        None => None,
    };

    let password_hash = match payload.password {
        Some(password) => {
            if !is_valid_password(&password) {
                return Err(ApiError::Validation(
                    "Password must be at least 8 characters with an uppercase letter, \
                     a lowercase letter and a digit"
                        .into(),
                ));
            }
            Some(hash_password(&password)?)
        }
        None => None,
    };

    let changes = UserChanges {
        name: payload.name.map(|n| n.trim().to_string()),
        email,
        password_hash,
        is_admin: payload.is_admin,
    };
    let user = User::update(&state.db, id, changes)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".into()))?;
    info!(user_id = %user.id, "user updated");
    Ok(Json(user))
}

#[instrument(skip(state, actor))]
pub async fn delete_user(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Value>, ApiError> {
    if !actor.is_admin && actor.id != id {
        return Err(ApiError::Forbidden("Access denied".into()));
    }
    if !User::delete(&state.db, id).await? {
        return Err(ApiError::NotFound("User not found".into()));
    }
    info!(user_id = %id, "user deleted");
    Ok(Json(json!({ "message": "User deleted" })))
}
