use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde_json::{json, Value};
use tracing::{info, instrument};
use uuid::Uuid;

use crate::{
    error::ApiError,
    events::repo::Event,
    locations::{
        dto::{CreateLocationRequest, UpdateLocationRequest},
        repo::{Location, LocationChanges, NewLocation},
    },
    state::AppState,
    validate::{is_valid_email, is_valid_phone, is_valid_website},
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/locations", get(list_locations).post(create_location))
        .route(
            "/locations/:id",
            get(get_location)
                .put(update_location)
                .delete(delete_location),
        )
        .route("/locations/:id/events", get(location_events))
}

#[instrument(skip(state))]
pub async fn list_locations(
    State(state): State<AppState>,
) -> Result<Json<Vec<Location>>, ApiError> {
    Ok(Json(Location::list(&state.db).await?))
}

#[instrument(skip(state))]
pub async fn get_location(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Location>, ApiError> {
    let location = Location::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Location not found".into()))?;
    Ok(Json(location))
}

#[instrument(skip(state))]
pub async fn location_events(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<Event>>, ApiError> {
    Ok(Json(Event::list_by_location(&state.db, id).await?))
}

/// Validates the contact fields, checks the unique ones, then inserts.
/// All of that happens before any persistence side effect.
#[instrument(skip(state, payload))]
pub async fn create_location(
    State(state): State<AppState>,
    Json(payload): Json<CreateLocationRequest>,
) -> Result<(StatusCode, Json<Location>), ApiError> {
    // Contact details are mandatory on the public route.
    let email = payload
        .email
        .map(|e| e.trim().to_lowercase())
        .filter(|e| !e.is_empty())
        .ok_or_else(|| ApiError::Validation("Email is required".into()))?;
    let phone = payload
        .phone
        .map(|p| p.trim().to_string())
        .filter(|p| !p.is_empty())
        .ok_or_else(|| ApiError::Validation("Phone number is required".into()))?;
    validate_contact_fields(Some(&email), Some(&phone), payload.website.as_deref())?;

    if Location::email_taken(&state.db, &email, None).await? {
        return Err(ApiError::Conflict("Email already registered".into()));
    }
    if Location::phone_taken(&state.db, &phone, None).await? {
        return Err(ApiError::Conflict("Phone number already registered".into()));
    }

    let location = Location::create(
        &state.db,
        NewLocation {
            name: payload.name.trim().to_string(),
            address: payload.address.trim().to_string(),
            city: payload.city.map(|c| c.trim().to_string()),
            cover_image: payload.cover_image,
            phone: Some(phone),
            email: Some(email),
            website: payload.website.map(|w| w.trim().to_string()),
            description: payload.description.map(|d| d.trim().to_string()),
            is_approved: false,
        },
    )
    .await?;
    info!(location_id = %location.id, "location created");
    Ok((StatusCode::CREATED, Json(location)))
}

#[instrument(skip(state, payload))]
pub async fn update_location(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateLocationRequest>,
) -> Result<Json<Location>, ApiError> {
    let email = payload.email.map(|e| e.trim().to_lowercase());
    validate_contact_fields(
        email.as_deref(),
        payload.phone.as_deref(),
        payload.website.as_deref(),
    )?;

    if let Some(email) = email.as_deref() {
        if Location::email_taken(&state.db, email, Some(id)).await? {
            return Err(ApiError::Conflict("Email already registered".into()));
        }
    }
    if let Some(phone) = payload.phone.as_deref() {
        if Location::phone_taken(&state.db, phone, Some(id)).await? {
            return Err(ApiError::Conflict("Phone number already registered".into()));
        }
    }

    let changes = LocationChanges {
        name: payload.name.map(|n| n.trim().to_string()),
        address: payload.address.map(|a| a.trim().to_string()),
        city: payload.city.map(|c| c.trim().to_string()),
        cover_image: payload.cover_image,
        phone: payload.phone.map(|p| p.trim().to_string()),
        email,
        website: payload.website.map(|w| w.trim().to_string()),
        description: payload.description.map(|d| d.trim().to_string()),
        is_active: payload.is_active,
    };
    let location = Location::update(&state.db, id, changes)
        .await?
        .ok_or_else(|| ApiError::NotFound("Location not found".into()))?;
    info!(location_id = %location.id, "location updated");
    Ok(Json(location))
}

#[instrument(skip(state))]
pub async fn delete_location(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Value>, ApiError> {
    if !Location::delete(&state.db, id).await? {
        return Err(ApiError::NotFound("Location not found".into()));
    }
    info!(location_id = %id, "location deleted");
    Ok(Json(json!({ "message": "Location deleted" })))
}

pub(crate) fn validate_contact_fields(
    email: Option<&str>,
    phone: Option<&str>,
    website: Option<&str>,
) -> Result<(), ApiError> {
    if let Some(email) = email {
        if !is_valid_email(email) {
            return Err(ApiError::Validation("Invalid email".into()));
        }
    }
    if let Some(phone) = phone {
        if !is_valid_phone(phone) {
            return Err(ApiError::Validation("Invalid phone number".into()));
        }
    }
    if let Some(website) = website {
        if !is_valid_website(website) {
            return Err(ApiError::Validation("Invalid website URL".into()));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn contact_validation_accepts_valid_fields() {
        assert!(validate_contact_fields(
            Some("info@teatro.example"),
            Some("+39 333 123 4567"),
            Some("https://teatro.example"),
        )
        .is_ok());
        assert!(validate_contact_fields(None, None, None).is_ok());
    }

    #[test]
    fn contact_validation_rejects_each_bad_field() {
        assert!(validate_contact_fields(Some("nope"), None, None).is_err());
        assert!(validate_contact_fields(None, Some("12"), None).is_err());
        assert!(validate_contact_fields(None, None, Some("teatro.example")).is_err());
    }

    #[tokio::test]
    async fn public_create_requires_email_and_phone() {
        let state = crate::state::AppState::fake();

        let payload = CreateLocationRequest {
            name: "Teatro Comunale".into(),
            address: "Via Roma 1".into(),
            city: Some("Milano".into()),
            cover_image: None,
            email: None,
            phone: Some("+39 333 123 4567".into()),
            website: None,
            description: None,
        };
        let err = create_location(State(state.clone()), Json(payload))
            .await
            .unwrap_err();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(err.to_string(), "Email is required");

        let payload = CreateLocationRequest {
            name: "Teatro Comunale".into(),
            address: "Via Roma 1".into(),
            city: Some("Milano".into()),
            cover_image: None,
            email: Some("info@teatro.example".into()),
            phone: None,
            website: None,
            description: None,
        };
        let err = create_location(State(state), Json(payload)).await.unwrap_err();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(err.to_string(), "Phone number is required");
    }
}
