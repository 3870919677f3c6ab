use serde::Serialize;
use sqlx::{FromRow, PgPool};
use time::{Date, OffsetDateTime};
use uuid::Uuid;

use crate::locations::repo::Location;

const EVENT_COLUMNS: &str = "id, name, location_id, cover_image, description, website, email, \
                             start_date, end_date, start_time, end_time, price, is_free, \
                             is_online, is_approved, created_at, updated_at";

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    pub id: Uuid,
    pub name: String,
    pub location_id: Uuid,
    pub cover_image: Option<String>,
    pub description: Option<String>,
    pub website: Option<String>,
    pub email: Option<String>,
    pub start_date: Date,
    pub end_date: Date,
    pub start_time: String,
    pub end_time: String,
    pub price: f64,
    pub is_free: bool,
    pub is_online: bool,
    pub is_approved: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

/// An event with its venue record attached, the shape every listing
/// endpoint returns.
#[derive(Debug, Clone, Serialize)]
pub struct EventWithLocation {
    #[serde(flatten)]
    pub event: Event,
    pub location: Option<Location>,
}

#[derive(Debug)]
pub struct NewEvent {
    pub name: String,
    pub location_id: Uuid,
    pub cover_image: Option<String>,
    pub description: Option<String>,
    pub website: Option<String>,
    pub email: Option<String>,
    pub start_date: Date,
    pub end_date: Date,
    pub start_time: String,
    pub end_time: String,
    pub price: f64,
    pub is_free: bool,
    pub is_online: bool,
    pub is_approved: bool,
}

#[derive(Debug, Default)]
pub struct EventChanges {
    pub name: Option<String>,
    pub location_id: Option<Uuid>,
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

impl Event {
    pub async fn list(db: &PgPool) -> anyhow::Result<Vec<Event>> {
        let rows = sqlx::query_as::<_, Event>(&format!(
            "SELECT {EVENT_COLUMNS} FROM events ORDER BY start_date"
        ))
        .fetch_all(db)
        .await?;
        Ok(rows)
    }

    pub async fn list_page(db: &PgPool, limit: i64, offset: i64) -> anyhow::Result<Vec<Event>> {
        let rows = sqlx::query_as::<_, Event>(&format!(
            "SELECT {EVENT_COLUMNS} FROM events
             ORDER BY start_date
             LIMIT $1 OFFSET $2"
        ))
        .bind(limit)
        .bind(offset)
        .fetch_all(db)
        .await?;
        Ok(rows)
    }

    pub async fn list_recent(db: &PgPool, limit: i64) -> anyhow::Result<Vec<Event>> {
        let rows = sqlx::query_as::<_, Event>(&format!(
            "SELECT {EVENT_COLUMNS} FROM events
             ORDER BY created_at DESC
             LIMIT $1"
        ))
        .bind(limit)
        .fetch_all(db)
        .await?;
        Ok(rows)
    }

    pub async fn list_by_location(db: &PgPool, location_id: Uuid) -> anyhow::Result<Vec<Event>> {
        let rows = sqlx::query_as::<_, Event>(&format!(
            "SELECT {EVENT_COLUMNS} FROM events
             WHERE location_id = $1
             ORDER BY start_date"
        ))
        .bind(location_id)
        .fetch_all(db)
        .await?;
        Ok(rows)
    }

    pub async fn list_pending(db: &PgPool) -> anyhow::Result<Vec<Event>> {
        let rows = sqlx::query_as::<_, Event>(&format!(
            "SELECT {EVENT_COLUMNS} FROM events
             WHERE NOT is_approved
             ORDER BY created_at DESC"
        ))
        .fetch_all(db)
        .await?;
        Ok(rows)
    }

    /// Events the user has marked interest in.
    pub async fn list_interested(db: &PgPool, user_id: Uuid) -> anyhow::Result<Vec<Event>> {
        let rows = sqlx::query_as::<_, Event>(&format!(
            "SELECT {EVENT_COLUMNS} FROM events e
             JOIN event_interests i ON i.event_id = e.id
             WHERE i.user_id = $1
             ORDER BY e.start_date"
        ))
        .bind(user_id)
        .fetch_all(db)
        .await?;
        Ok(rows)
    }

    pub async fn find_by_id(db: &PgPool, id: Uuid) -> anyhow::Result<Option<Event>> {
        let row = sqlx::query_as::<_, Event>(&format!(
            "SELECT {EVENT_COLUMNS} FROM events WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(db)
        .await?;
        Ok(row)
    }

    pub async fn is_interested(db: &PgPool, event_id: Uuid, user_id: Uuid) -> anyhow::Result<bool> {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM event_interests WHERE event_id = $1 AND user_id = $2)",
        )
        .bind(event_id)
        .bind(user_id)
        .fetch_one(db)
        .await?;
        Ok(exists)
    }

    pub async fn add_interest(db: &PgPool, event_id: Uuid, user_id: Uuid) -> anyhow::Result<()> {
        sqlx::query(
            "INSERT INTO event_interests (event_id, user_id) VALUES ($1, $2)
             ON CONFLICT DO NOTHING",
        )
        .bind(event_id)
        .bind(user_id)
        .execute(db)
        .await?;
        Ok(())
    }

    pub async fn remove_interest(db: &PgPool, event_id: Uuid, user_id: Uuid) -> anyhow::Result<()> {
        sqlx::query("DELETE FROM event_interests WHERE event_id = $1 AND user_id = $2")
            .bind(event_id)
            .bind(user_id)
            .execute(db)
            .await?;
        Ok(())
    }

    pub async fn email_taken(
        db: &PgPool,
        email: &str,
        exclude: Option<Uuid>,
    ) -> anyhow::Result<bool> {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM events WHERE email = $1 AND ($2::uuid IS NULL OR id <> $2))",
        )
        .bind(email)
        .bind(exclude)
        .fetch_one(db)
        .await?;
        Ok(exists)
    }

    pub async fn website_taken(
        db: &PgPool,
        website: &str,
        exclude: Option<Uuid>,
    ) -> anyhow::Result<bool> {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM events WHERE website = $1 AND ($2::uuid IS NULL OR id <> $2))",
        )
        .bind(website)
        .bind(exclude)
        .fetch_one(db)
        .await?;
        Ok(exists)
    }

    pub async fn create(db: &PgPool, new: NewEvent) -> anyhow::Result<Event> {
        let row = sqlx::query_as::<_, Event>(&format!(
            "INSERT INTO events
                 (name, location_id, cover_image, description, website, email,
                  start_date, end_date, start_time, end_time, price, is_free,
                  is_online, is_approved)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
             RETURNING {EVENT_COLUMNS}"
        ))
        .bind(new.name)
        .bind(new.location_id)
        .bind(new.cover_image)
        .bind(new.description)
        .bind(new.website)
        .bind(new.email)
        .bind(new.start_date)
        .bind(new.end_date)
        .bind(new.start_time)
        .bind(new.end_time)
        .bind(new.price)
        .bind(new.is_free)
        .bind(new.is_online)
        .bind(new.is_approved)
        .fetch_one(db)
        .await?;
        Ok(row)
    }

    pub async fn update(
        db: &PgPool,
        id: Uuid,
        changes: EventChanges,
    ) -> anyhow::Result<Option<Event>> {
        let row = sqlx::query_as::<_, Event>(&format!(
            "UPDATE events SET
                 name = COALESCE($2, name),
                 location_id = COALESCE($3, location_id),
                 cover_image = COALESCE($4, cover_image),
                 description = COALESCE($5, description),
                 website = COALESCE($6, website),
                 email = COALESCE($7, email),
                 start_date = COALESCE($8, start_date),
                 end_date = COALESCE($9, end_date),
                 start_time = COALESCE($10, start_time),
                 end_time = COALESCE($11, end_time),
                 price = COALESCE($12, price),
                 is_free = COALESCE($13, is_free),
                 is_online = COALESCE($14, is_online),
                 updated_at = now()
             WHERE id = $1
             RETURNING {EVENT_COLUMNS}"
        ))
        .bind(id)
        .bind(changes.name)
        .bind(changes.location_id)
        .bind(changes.cover_image)
        .bind(changes.description)
        .bind(changes.website)
        .bind(changes.email)
        .bind(changes.start_date)
        .bind(changes.end_date)
        .bind(changes.start_time)
        .bind(changes.end_time)
        .bind(changes.price)
        .bind(changes.is_free)
        .bind(changes.is_online)
        .fetch_optional(db)
        .await?;
        Ok(row)
    }

    pub async fn approve(db: &PgPool, id: Uuid) -> anyhow::Result<Option<Event>> {
        let row = sqlx::query_as::<_, Event>(&format!(
            "UPDATE events SET is_approved = TRUE, updated_at = now()
             WHERE id = $1
             RETURNING {EVENT_COLUMNS}"
        ))
        .bind(id)
        .fetch_optional(db)
        .await?;
        Ok(row)
    }

    pub async fn delete(db: &PgPool, id: Uuid) -> anyhow::Result<bool> {
        let result = sqlx::query("DELETE FROM events WHERE id = $1")
            .bind(id)
            .execute(db)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn count(db: &PgPool) -> anyhow::Result<i64> {
        let total = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM events")
            .fetch_one(db)
            .await?;
        Ok(total)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::date;

    fn sample_event(location_id: Uuid) -> Event {
        Event {
            id: Uuid::new_v4(),
            name: "Jazz Night".into(),
            location_id,
            cover_image: None,
            description: Some("Live jazz".into()),
            website: None,
            email: None,
            start_date: date!(2026 - 09 - 10),
            end_date: date!(2026 - 09 - 11),
            start_time: "21:00".into(),
            end_time: "23:30".into(),
            price: 15.0,
            is_free: false,
            is_online: false,
            is_approved: true,
            created_at: OffsetDateTime::now_utc(),
            updated_at: OffsetDateTime::now_utc(),
        }
    }

    #[test]
    fn event_with_location_flattens() {
        let event = sample_event(Uuid::new_v4());
        let with_location = EventWithLocation {
            event: event.clone(),
            location: None,
        };
        let json = serde_json::to_value(&with_location).unwrap();
        // Event fields sit at the top level, venue under "location".
        assert_eq!(json["name"], "Jazz Night");
        assert_eq!(json["startTime"], "21:00");
        assert_eq!(json["isFree"], false);
        assert!(json["location"].is_null());
    }
}
