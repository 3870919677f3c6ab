use serde::{Deserialize, Serialize};

use crate::{
    events::repo::EventWithLocation, locations::repo::Location, users::repo::User,
};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoleChangeRequest {
    pub is_admin: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Totals {
    pub total_events: i64,
    pub total_locations: i64,
    pub total_users: i64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsResponse {
    pub stats: Totals,
    pub recent_events: Vec<EventWithLocation>,
    pub recent_locations: Vec<Location>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserListResponse {
    pub users: Vec<User>,
    pub current_page: i64,
    pub total_pages: i64,
    pub total_users: i64,
}
