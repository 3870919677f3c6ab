use std::collections::{BTreeMap, HashMap};

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use sqlx::PgPool;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::{
    auth::extractors::AuthUser,
    error::ApiError,
    events::{
        dto::{
            CreateEventRequest, GroupedEventsResponse, LocationGroup, PageQuery, Pagination,
            ToggleInterestResponse, UpdateEventRequest,
        },
        repo::{Event, EventChanges, EventWithLocation, NewEvent},
    },
    locations::repo::Location,
    state::AppState,
    validate::{is_time_after, is_valid_email, is_valid_time, is_valid_website},
};

const UNSPECIFIED_LOCATION: &str = "Unspecified location";

/// A free event must carry price 0.
pub(crate) fn free_price_conflict(is_free: bool, price: f64) -> bool {
    is_free && price != 0.0
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/events", get(list_events).post(create_event))
        .route("/events/grouped-by-location", get(grouped_by_location))
        .route("/events/interested", get(interested_events))
        .route(
            "/events/:id",
            get(get_event).put(update_event).delete(delete_event),
        )
        .route("/events/:id/interested", post(toggle_interest))
}

/// Attach venue records to a batch of events with a single lookup.
pub(crate) async fn populate(
    db: &PgPool,
    events: Vec<Event>,
) -> Result<Vec<EventWithLocation>, ApiError> {
    let ids: Vec<Uuid> = events.iter().map(|e| e.location_id).collect();
    let locations: HashMap<Uuid, Location> = Location::find_many(db, &ids)
        .await?
        .into_iter()
        .map(|l| (l.id, l))
        .collect();
    Ok(events
        .into_iter()
        .map(|event| EventWithLocation {
            location: locations.get(&event.location_id).cloned(),
            event,
        })
        .collect())
}

#[instrument(skip(state))]
pub async fn list_events(
    State(state): State<AppState>,
) -> Result<Json<Vec<EventWithLocation>>, ApiError> {
    let events = Event::list(&state.db).await?;
    Ok(Json(populate(&state.db, events).await?))
}

#[instrument(skip(state))]
pub async fn grouped_by_location(
    State(state): State<AppState>,
    Query(query): Query<PageQuery>,
) -> Result<Json<GroupedEventsResponse>, ApiError> {
    let page = query.page.max(1);
    let limit = query.limit.clamp(1, 100);
    let offset = (page - 1) * limit;

    let events = Event::list_page(&state.db, limit, offset).await?;
    let populated = populate(&state.db, events).await?;
    let total_events = Event::count(&state.db).await?;

    Ok(Json(GroupedEventsResponse {
        grouped_events: group_by_location(populated),
        pagination: Pagination::new(page, limit, total_events),
    }))
}

/// Group events under their venue name. Events whose venue cannot be
/// resolved end up under a placeholder bucket rather than disappearing.
pub(crate) fn group_by_location(
    events: Vec<EventWithLocation>,
) -> BTreeMap<String, LocationGroup> {
    let mut groups: BTreeMap<String, LocationGroup> = BTreeMap::new();
    for EventWithLocation { event, location } in events {
        let key = location
            .as_ref()
            .map(|l| l.name.clone())
            .unwrap_or_else(|| UNSPECIFIED_LOCATION.to_string());
        groups
            .entry(key)
            .or_insert_with(|| LocationGroup {
                location,
                events: Vec::new(),
            })
            .events
            .push(event);
    }
    groups
}

#[instrument(skip(state, user))]
pub async fn interested_events(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> Result<Json<Vec<EventWithLocation>>, ApiError> {
    let events = Event::list_interested(&state.db, user.id).await?;
    Ok(Json(populate(&state.db, events).await?))
}

#[instrument(skip(state))]
pub async fn get_event(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<EventWithLocation>, ApiError> {
    let event = Event::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Event not found".into()))?;
    let location = Location::find_by_id(&state.db, event.location_id).await?;
    Ok(Json(EventWithLocation { event, location }))
}

#[instrument(skip(state, user))]
pub async fn toggle_interest(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ToggleInterestResponse>, ApiError> {
    let event = Event::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Event not found".into()))?;

    let was_interested = Event::is_interested(&state.db, id, user.id).await?;
    if was_interested {
        Event::remove_interest(&state.db, id, user.id).await?;
    } else {
        Event::add_interest(&state.db, id, user.id).await?;
    }
    info!(event_id = %id, user_id = %user.id, interested = !was_interested, "interest toggled");

    let location = Location::find_by_id(&state.db, event.location_id).await?;
    Ok(Json(ToggleInterestResponse {
        message: if was_interested {
            "Interest removed"
        } else {
            "Interest added"
        },
        event: EventWithLocation { event, location },
        is_interested: !was_interested,
    }))
}

#[instrument(skip(state, payload))]
pub async fn create_event(
    State(state): State<AppState>,
    Json(payload): Json<CreateEventRequest>,
) -> Result<(StatusCode, Json<EventWithLocation>), ApiError> {
    let new = validate_new_event(&state, payload, false).await?;
    let event = Event::create(&state.db, new).await?;
    let location = Location::find_by_id(&state.db, event.location_id).await?;
    info!(event_id = %event.id, "event created");
    Ok((
        StatusCode::CREATED,
        Json(EventWithLocation { event, location }),
    ))
}

/// Shared by the public and dashboard create routes; the latter persists
/// the event pre-approved.
pub(crate) async fn validate_new_event(
    state: &AppState,
    payload: CreateEventRequest,
    is_approved: bool,
) -> Result<NewEvent, ApiError> {
    if !is_valid_time(&payload.start_time) || !is_valid_time(&payload.end_time) {
        return Err(ApiError::Validation("Invalid time format (use HH:mm)".into()));
    }
    if !is_time_after(&payload.end_time, &payload.start_time) {
        return Err(ApiError::Validation(
            "End time must be after start time".into(),
        ));
    }
    if payload.end_date <= payload.start_date {
        return Err(ApiError::Validation(
            "End date must be after start date".into(),
        ));
    }
    let email = payload.email.map(|e| e.trim().to_lowercase());
    if let Some(email) = email.as_deref() {
        if !is_valid_email(email) {
            return Err(ApiError::Validation("Invalid email".into()));
        }
    }
    if let Some(website) = payload.website.as_deref() {
        if !is_valid_website(website) {
            return Err(ApiError::Validation("Invalid website URL".into()));
        }
    }
    if payload.price < 0.0 {
        return Err(ApiError::Validation("Price cannot be negative".into()));
    }
    if free_price_conflict(payload.is_free, payload.price) {
        return Err(ApiError::Validation(
            "A free event must have price 0".into(),
        ));
    }

    if Location::find_by_id(&state.db, payload.location)
        .await?
        .is_none()
    {
        return Err(ApiError::Validation("Location not found".into()));
    }
    if let Some(email) = email.as_deref() {
        if Event::email_taken(&state.db, email, None).await? {
            return Err(ApiError::Conflict("Email already registered".into()));
        }
    }
    if let Some(website) = payload.website.as_deref() {
        if Event::website_taken(&state.db, website, None).await? {
            return Err(ApiError::Conflict("Website already registered".into()));
        }
    }

    Ok(NewEvent {
        name: payload.name.trim().to_string(),
        location_id: payload.location,
        cover_image: payload.cover_image,
        description: payload.description.map(|d| d.trim().to_string()),
        website: payload.website.map(|w| w.trim().to_string()),
        email,
        start_date: payload.start_date,
        end_date: payload.end_date,
        start_time: payload.start_time,
        end_time: payload.end_time,
        price: payload.price,
        is_free: payload.is_free,
        is_online: payload.is_online,
        is_approved,
    })
}

#[instrument(skip(state, payload))]
pub async fn update_event(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateEventRequest>,
) -> Result<Json<EventWithLocation>, ApiError> {
    if let (Some(start), Some(end)) = (payload.start_time.as_deref(), payload.end_time.as_deref()) {
        if !is_valid_time(start) || !is_valid_time(end) {
            return Err(ApiError::Validation("Invalid time format (use HH:mm)".into()));
        }
        if !is_time_after(end, start) {
            return Err(ApiError::Validation(
                "End time must be after start time".into(),
            ));
        }
    }
    if let (Some(start), Some(end)) = (payload.start_date, payload.end_date) {
        if end <= start {
            return Err(ApiError::Validation(
                "End date must be after start date".into(),
            ));
        }
    }
    let email = payload.email.map(|e| e.trim().to_lowercase());
    if let Some(email) = email.as_deref() {
        if !is_valid_email(email) {
            return Err(ApiError::Validation("Invalid email".into()));
        }
        if Event::email_taken(&state.db, email, Some(id)).await? {
            return Err(ApiError::Conflict("Email already registered".into()));
        }
    }
    if let Some(website) = payload.website.as_deref() {
        if !is_valid_website(website) {
            return Err(ApiError::Validation("Invalid website URL".into()));
        }
        if Event::website_taken(&state.db, website, Some(id)).await? {
            return Err(ApiError::Conflict("Website already registered".into()));
        }
    }
    if let Some(price) = payload.price {
        if price < 0.0 {
            return Err(ApiError::Validation("Price cannot be negative".into()));
        }
    }
    if let (Some(is_free), Some(price)) = (payload.is_free, payload.price) {
        if free_price_conflict(is_free, price) {
            return Err(ApiError::Validation(
                "A free event must have price 0".into(),
            ));
        }
    }
    if let Some(location_id) = payload.location {
        if Location::find_by_id(&state.db, location_id).await?.is_none() {
            return Err(ApiError::Validation("Location not found".into()));
        }
    }

    // The consistency rule also holds against the merged record, not just
    // the fields the payload happens to carry.
    let current = Event::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Event not found".into()))?;
    if free_price_conflict(
        payload.is_free.unwrap_or(current.is_free),
        payload.price.unwrap_or(current.price),
    ) {
        return Err(ApiError::Validation(
            "A free event must have price 0".into(),
        ));
    }

    let changes = EventChanges {
        name: payload.name.map(|n| n.trim().to_string()),
        location_id: payload.location,
        cover_image: payload.cover_image,
        description: payload.description.map(|d| d.trim().to_string()),
        website: payload.website.map(|w| w.trim().to_string()),
        email,
        start_date: payload.start_date,
        end_date: payload.end_date,
        start_time: payload.start_time,
        end_time: payload.end_time,
        price: payload.price,
        is_free: payload.is_free,
        is_online: payload.is_online,
    };
    let event = Event::update(&state.db, id, changes)
        .await?
        .ok_or_else(|| ApiError::NotFound("Event not found".into()))?;
    let location = Location::find_by_id(&state.db, event.location_id).await?;
    info!(event_id = %event.id, "event updated");
    Ok(Json(EventWithLocation { event, location }))
}

#[instrument(skip(state))]
pub async fn delete_event(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Value>, ApiError> {
    if !Event::delete(&state.db, id).await? {
        return Err(ApiError::NotFound("Event not found".into()));
    }
    info!(event_id = %id, "event deleted");
    Ok(Json(json!({ "message": "Event deleted" })))
}
