use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use time::Date;
use uuid::Uuid;

use crate::{
    events::repo::{Event, EventWithLocation},
    locations::repo::Location,
};

/// Event creation body. `location` carries the venue id, as in the
/// original API.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateEventRequest {
    pub name: String,
    pub location: Uuid,
    pub cover_image: Option<String>,
    pub description: Option<String>,
    pub website: Option<String>,
    pub email: Option<String>,
    pub start_date: Date,
    pub end_date: Date,
    pub start_time: String,
    pub end_time: String,
    #[serde(default)]
    pub price: f64,
    #[serde(default)]
    pub is_free: bool,
    #[serde(default)]
    pub is_online: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateEventRequest {
    pub name: Option<String>,
    pub location: Option<Uuid>,
    pub cover_image: Option<String>,
    pub description: Option<String>,
    pub website: Option<String>,
    pub email: Option<String>,
    pub start_date: Option<Date>,
    pub end_date: Option<Date>,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    pub price: Option<f64>,
    pub is_free: Option<bool>,
    pub is_online: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct PageQuery {
    #[serde(default = "default_page")]
    pub page: i64,
    #[serde(default = "default_limit")]
    pub limit: i64,
}

fn default_page() -> i64 {
    1
}
fn default_limit() -> i64 {
    10
}

#[derive(Debug, Serialize)]
pub struct LocationGroup {
    pub location: Option<Location>,
    pub events: Vec<Event>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub current_page: i64,
    pub total_pages: i64,
    pub total_events: i64,
    pub has_next_page: bool,
    pub has_prev_page: bool,
}

impl Pagination {
    pub fn new(current_page: i64, limit: i64, total_events: i64) -> Self {
        let total_pages = if limit > 0 {
            (total_events + limit - 1) / limit
        } else {
            0
        };
        Self {
            current_page,
            total_pages,
            total_events,
            has_next_page: current_page < total_pages,
            has_prev_page: current_page > 1,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupedEventsResponse {
    pub grouped_events: BTreeMap<String, LocationGroup>,
    pub pagination: Pagination,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToggleInterestResponse {
    pub message: &'static str,
    pub event: EventWithLocation,
    pub is_interested: bool,
}
