use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post, put},
    Json, Router,
};
use serde_json::{json, Value};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::{
    auth::{claims::Claims, extractors::AdminClaims},
    dashboard::dto::{RoleChangeRequest, StatsResponse, Totals, UserListResponse},
    error::ApiError,
    events::{
        dto::{CreateEventRequest, PageQuery},
        handlers::{populate, validate_new_event},
        repo::{Event, EventWithLocation},
    },
    locations::{
        dto::CreateLocationRequest,
        handlers::validate_contact_fields,
        repo::{Location, NewLocation},
    },
    state::AppState,
    users::repo::User,
};

/// Admin-only surface. Every handler takes the `AdminClaims` gate; the
/// user-management routes additionally refuse to act on the caller's own
/// account.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/dashboard", get(welcome))
        .route("/dashboard/stats", get(stats))
        .route("/dashboard/users", get(list_users))
        .route("/dashboard/users/:id/role", put(change_role))
        .route("/dashboard/users/:id", axum::routing::delete(delete_user))
        .route("/dashboard/events", post(create_event))
        .route("/dashboard/events/pending", get(pending_events))
        .route("/dashboard/events/:id/approve", put(approve_event))
        .route(
            "/dashboard/locations",
            get(list_locations).post(create_location),
        )
        .route("/dashboard/locations/pending", get(pending_locations))
        .route("/dashboard/locations/:id/approve", put(approve_location))
}

/// Guard shared by the admin user-management routes: acting on your own
/// account is refused so an admin cannot lock themselves out.
fn ensure_not_self(actor: &Claims, target: Uuid, action: &str) -> Result<(), ApiError> {
    if actor.id == target {
        warn!(user_id = %actor.id, "admin tried to {action} their own account");
        return Err(ApiError::Validation(format!("You cannot {action} your own account")));
    }
    Ok(())
}

#[instrument(skip_all)]
pub async fn welcome(AdminClaims(claims): AdminClaims) -> Json<Value> {
    Json(json!({
        "message": "Welcome to the dashboard",
        "username": claims.username,
    }))
}

#[instrument(skip(state))]
pub async fn stats(
    State(state): State<AppState>,
    AdminClaims(_): AdminClaims,
) -> Result<Json<StatsResponse>, ApiError> {
    let total_events = Event::count(&state.db).await?;
    let total_locations = Location::count(&state.db).await?;
    let total_users = User::count(&state.db).await?;
    let recent_events = populate(&state.db, Event::list_recent(&state.db, 5).await?).await?;
    let recent_locations = Location::list_recent(&state.db, 5).await?;

    Ok(Json(StatsResponse {
        stats: Totals {
            total_events,
            total_locations,
            total_users,
        },
        recent_events,
        recent_locations,
    }))
}

#[instrument(skip(state))]
pub async fn list_users(
    State(state): State<AppState>,
    AdminClaims(_): AdminClaims,
    Query(query): Query<PageQuery>,
) -> Result<Json<UserListResponse>, ApiError> {
    let page = query.page.max(1);
    let limit = query.limit.clamp(1, 100);
    let users = User::list_page(&state.db, limit, (page - 1) * limit).await?;
    let total_users = User::count(&state.db).await?;
    let total_pages = (total_users + limit - 1) / limit;

    Ok(Json(UserListResponse {
        users,
        current_page: page,
        total_pages,
        total_users,
    }))
}

#[instrument(skip(state, actor))]
pub async fn change_role(
    State(state): State<AppState>,
    AdminClaims(actor): AdminClaims,
    Path(id): Path<Uuid>,
    Json(payload): Json<RoleChangeRequest>,
) -> Result<Json<User>, ApiError> {
    ensure_not_self(&actor, id, "change the role of")?;
    let user = User::set_admin(&state.db, id, payload.is_admin)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".into()))?;
    info!(user_id = %user.id, is_admin = payload.is_admin, "user role changed");
    Ok(Json(user))
}

#[instrument(skip(state, actor))]
pub async fn delete_user(
    State(state): State<AppState>,
    AdminClaims(actor): AdminClaims,
    Path(id): Path<Uuid>,
) -> Result<Json<Value>, ApiError> {
    ensure_not_self(&actor, id, "delete")?;
    if !User::delete(&state.db, id).await? {
        return Err(ApiError::NotFound("User not found".into()));
    }
    info!(user_id = %id, "user deleted by admin");
    Ok(Json(json!({ "message": "User deleted" })))
}

#[instrument(skip(state))]
pub async fn pending_events(
    State(state): State<AppState>,
    AdminClaims(_): AdminClaims,
) -> Result<Json<Vec<EventWithLocation>>, ApiError> {
    let events = Event::list_pending(&state.db).await?;
    Ok(Json(populate(&state.db, events).await?))
}

#[instrument(skip(state))]
pub async fn approve_event(
    State(state): State<AppState>,
    AdminClaims(_): AdminClaims,
    Path(id): Path<Uuid>,
) -> Result<Json<EventWithLocation>, ApiError> {
    let event = Event::approve(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Event not found".into()))?;
    let location = Location::find_by_id(&state.db, event.location_id).await?;
    info!(event_id = %event.id, "event approved");
    Ok(Json(EventWithLocation { event, location }))
}

/// Admin-created events are persisted pre-approved.
#[instrument(skip(state, payload))]
pub async fn create_event(
    State(state): State<AppState>,
    AdminClaims(_): AdminClaims,
    Json(payload): Json<CreateEventRequest>,
) -> Result<(StatusCode, Json<EventWithLocation>), ApiError> {
    let new = validate_new_event(&state, payload, true).await?;
    let event = Event::create(&state.db, new).await?;
    let location = Location::find_by_id(&state.db, event.location_id).await?;
    info!(event_id = %event.id, "event created by admin");
    Ok((
        StatusCode::CREATED,
        Json(EventWithLocation { event, location }),
    ))
}

/// Picklist for the event form.
#[instrument(skip(state))]
pub async fn list_locations(
    State(state): State<AppState>,
    AdminClaims(_): AdminClaims,
) -> Result<Json<Vec<Location>>, ApiError> {
    Ok(Json(Location::list_approved(&state.db).await?))
}

#[instrument(skip(state))]
pub async fn pending_locations(
    State(state): State<AppState>,
    AdminClaims(_): AdminClaims,
) -> Result<Json<Vec<Location>>, ApiError> {
    Ok(Json(Location::list_pending(&state.db).await?))
}

#[instrument(skip(state))]
pub async fn approve_location(
    State(state): State<AppState>,
    AdminClaims(_): AdminClaims,
    Path(id): Path<Uuid>,
) -> Result<Json<Location>, ApiError> {
    let location = Location::approve(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Location not found".into()))?;
    info!(location_id = %location.id, "location approved");
    Ok(Json(location))
}

/// Admin-created locations are persisted pre-approved; city is required
/// here, unlike the public route.
#[instrument(skip(state, payload))]
pub async fn create_location(
    State(state): State<AppState>,
    AdminClaims(_): AdminClaims,
    Json(payload): Json<CreateLocationRequest>,
) -> Result<(StatusCode, Json<Location>), ApiError> {
    let city = payload
        .city
        .as_deref()
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .map(str::to_string)
        .ok_or_else(|| ApiError::Validation("Name, address and city are required".into()))?;

    let email = payload.email.map(|e| e.trim().to_lowercase());
    validate_contact_fields(
        email.as_deref(),
        payload.phone.as_deref(),
        payload.website.as_deref(),
    )?;

    if Location::name_taken_in_city(&state.db, payload.name.trim(), &city).await? {
        return Err(ApiError::Conflict(
            "A location with this name already exists in this city".into(),
        ));
    }

    let location = Location::create(
        &state.db,
        NewLocation {
            name: payload.name.trim().to_string(),
            address: payload.address.trim().to_string(),
            city: Some(city),
            cover_image: payload.cover_image,
            phone: payload.phone.map(|p| p.trim().to_string()),
            email,
            website: payload.website.map(|w| w.trim().to_string()),
            description: payload.description.map(|d| d.trim().to_string()),
            is_approved: true,
        },
    )
    .await?;
    info!(location_id = %location.id, "location created by admin");
    Ok((StatusCode::CREATED, Json(location)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;

    fn admin_claims(id: Uuid) -> Claims {
        Claims {
            id,
            username: Some("boss".into()),
            email: "boss@x.com".into(),
            is_admin: true,
            iat: 0,
            exp: usize::MAX,
        }
    }

    #[test]
    fn self_guard_rejects_own_account() {
        let id = Uuid::new_v4();
        let err = ensure_not_self(&admin_claims(id), id, "delete").unwrap_err();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(err.to_string(), "You cannot delete your own account");
    }

    #[test]
    fn self_guard_allows_other_accounts() {
        assert!(ensure_not_self(&admin_claims(Uuid::new_v4()), Uuid::new_v4(), "delete").is_ok());
    }
}
