use serde::Serialize;
use sqlx::{FromRow, PgPool};
use time::OffsetDateTime;
use uuid::Uuid;

const LOCATION_COLUMNS: &str = "id, name, address, city, cover_image, phone, email, website, \
                                description, is_active, is_approved, created_at";

/// Venue record. Events reference exactly one of these.
#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Location {
    pub id: Uuid,
    pub name: String,
    pub address: String,
    pub city: Option<String>,
    pub cover_image: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub website: Option<String>,
    pub description: Option<String>,
    pub is_active: bool,
    pub is_approved: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

#[derive(Debug)]
pub struct NewLocation {
    pub name: String,
    pub address: String,
    pub city: Option<String>,
    pub cover_image: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub website: Option<String>,
    pub description: Option<String>,
    pub is_approved: bool,
}

#[derive(Debug, Default)]
pub struct LocationChanges {
    pub name: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub cover_image: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub website: Option<String>,
    pub description: Option<String>,
    pub is_active: Option<bool>,
}

impl Location {
    pub async fn list(db: &PgPool) -> anyhow::Result<Vec<Location>> {
        let rows = sqlx::query_as::<_, Location>(&format!(
            "SELECT {LOCATION_COLUMNS} FROM locations ORDER BY name"
        ))
        .fetch_all(db)
        .await?;
        Ok(rows)
    }

    pub async fn list_approved(db: &PgPool) -> anyhow::Result<Vec<Location>> {
        let rows = sqlx::query_as::<_, Location>(&format!(
            "SELECT {LOCATION_COLUMNS} FROM locations WHERE is_approved ORDER BY name"
        ))
        .fetch_all(db)
        .await?;
        Ok(rows)
    }

    pub async fn list_recent(db: &PgPool, limit: i64) -> anyhow::Result<Vec<Location>> {
        let rows = sqlx::query_as::<_, Location>(&format!(
            "SELECT {LOCATION_COLUMNS} FROM locations
             ORDER BY created_at DESC
             LIMIT $1"
        ))
        .bind(limit)
        .fetch_all(db)
        .await?;
        Ok(rows)
    }

    pub async fn list_pending(db: &PgPool) -> anyhow::Result<Vec<Location>> {
        let rows = sqlx::query_as::<_, Location>(&format!(
            "SELECT {LOCATION_COLUMNS} FROM locations WHERE NOT is_approved ORDER BY name"
        ))
        .fetch_all(db)
        .await?;
        Ok(rows)
    }

    pub async fn find_by_id(db: &PgPool, id: Uuid) -> anyhow::Result<Option<Location>> {
        let row = sqlx::query_as::<_, Location>(&format!(
            "SELECT {LOCATION_COLUMNS} FROM locations WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(db)
        .await?;
        Ok(row)
    }

    /// Batch fetch used when populating events with their venue.
    pub async fn find_many(db: &PgPool, ids: &[Uuid]) -> anyhow::Result<Vec<Location>> {
        let rows = sqlx::query_as::<_, Location>(&format!(
            "SELECT {LOCATION_COLUMNS} FROM locations WHERE id = ANY($1)"
        ))
        .bind(ids)
        .fetch_all(db)
        .await?;
        Ok(rows)
    }

    pub async fn email_taken(
        db: &PgPool,
        email: &str,
        exclude: Option<Uuid>,
    ) -> anyhow::Result<bool> {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM locations WHERE email = $1 AND ($2::uuid IS NULL OR id <> $2))",
        )
        .bind(email)
        .bind(exclude)
        .fetch_one(db)
        .await?;
        Ok(exists)
    }

    pub async fn phone_taken(
        db: &PgPool,
        phone: &str,
        exclude: Option<Uuid>,
    ) -> anyhow::Result<bool> {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM locations WHERE phone = $1 AND ($2::uuid IS NULL OR id <> $2))",
        )
        .bind(phone)
        .bind(exclude)
        .fetch_one(db)
        .await?;
        Ok(exists)
    }

    pub async fn name_taken_in_city(db: &PgPool, name: &str, city: &str) -> anyhow::Result<bool> {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM locations WHERE LOWER(name) = LOWER($1) AND LOWER(city) = LOWER($2))",
        )
        .bind(name)
        .bind(city)
        .fetch_one(db)
        .await?;
        Ok(exists)
    }

    pub async fn create(db: &PgPool, new: NewLocation) -> anyhow::Result<Location> {
        let row = sqlx::query_as::<_, Location>(&format!(
            "INSERT INTO locations
                 (name, address, city, cover_image, phone, email, website, description, is_approved)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
             RETURNING {LOCATION_COLUMNS}"
        ))
        .bind(new.name)
        .bind(new.address)
        .bind(new.city)
        .bind(new.cover_image)
        .bind(new.phone)
        .bind(new.email)
        .bind(new.website)
        .bind(new.description)
        .bind(new.is_approved)
        .fetch_one(db)
        .await?;
        Ok(row)
    }

    pub async fn update(
        db: &PgPool,
        id: Uuid,
        changes: LocationChanges,
    ) -> anyhow::Result<Option<Location>> {
        let row = sqlx::query_as::<_, Location>(&format!(
            "UPDATE locations SET
                 name = COALESCE($2, name),
                 address = COALESCE($3, address),
                 city = COALESCE($4, city),
                 cover_image = COALESCE($5, cover_image),
                 phone = COALESCE($6, phone),
                 email = COALESCE($7, email),
                 website = COALESCE($8, website),
                 description = COALESCE($9, description),
                 is_active = COALESCE($10, is_active)
             WHERE id = $1
             RETURNING {LOCATION_COLUMNS}"
        ))
        .bind(id)
        .bind(changes.name)
        .bind(changes.address)
        .bind(changes.city)
        .bind(changes.cover_image)
        .bind(changes.phone)
        .bind(changes.email)
        .bind(changes.website)
        .bind(changes.description)
        .bind(changes.is_active)
        .fetch_optional(db)
        .await?;
        Ok(row)
    }

    pub async fn approve(db: &PgPool, id: Uuid) -> anyhow::Result<Option<Location>> {
        let row = sqlx::query_as::<_, Location>(&format!(
            "UPDATE locations SET is_approved = TRUE WHERE id = $1 RETURNING {LOCATION_COLUMNS}"
        ))
        .bind(id)
        .fetch_optional(db)
        .await?;
        Ok(row)
    }

    pub async fn delete(db: &PgPool, id: Uuid) -> anyhow::Result<bool> {
        let result = sqlx::query("DELETE FROM locations WHERE id = $1")
            .bind(id)
            .execute(db)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn count(db: &PgPool) -> anyhow::Result<i64> {
        let total = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM locations")
            .fetch_one(db)
            .await?;
        Ok(total)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_camel_case() {
        let location = Location {
            id: Uuid::new_v4(),
            name: "Teatro Comunale".into(),
            address: "Via Roma 123".into(),
            city: Some("Milano".into()),
            cover_image: Some("https://img.example/x.png".into()),
            phone: Some("+39 333 123 4567".into()),
            email: Some("info@teatro.example".into()),
            website: None,
            description: None,
            is_active: true,
            is_approved: false,
            created_at: OffsetDateTime::now_utc(),
        };
        let json = serde_json::to_value(&location).unwrap();
        assert_eq!(json["coverImage"], "https://img.example/x.png");
        assert_eq!(json["isActive"], true);
        assert_eq!(json["isApproved"], false);
    }
}
