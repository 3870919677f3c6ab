use sqlx::PgPool;
use tracing::info;

use crate::{auth::oauth::GoogleProfile, users::repo::User};

const USERNAME_MAX_LEN: usize = 15;

/// Where the client should navigate after authenticating.
pub fn redirect_target(is_admin: bool) -> &'static str {
    if is_admin {
        "/dashboard"
    } else {
        "/"
    }
}

/// Candidate username derived from a display name: lowercased, stripped
/// to ASCII alphanumerics, truncated. Falls back to the email local part,
/// then to a fixed stem.
pub fn username_base(name: &str, email: &str) -> String {
    let normalize = |s: &str| -> String {
        s.to_lowercase()
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .take(USERNAME_MAX_LEN)
            .collect()
    };
    let base = normalize(name);
    if !base.is_empty() {
        return base;
    }
    let local = email.split('@').next().unwrap_or_default();
    let base = normalize(local);
    if base.is_empty() {
        "user".into()
    } else {
        base
    }
}

/// Disambiguate against the existing-username set with a numeric suffix.
pub async fn generate_username(db: &PgPool, base: &str) -> anyhow::Result<String> {
    let mut candidate = base.to_string();
    let mut counter = 1u32;
    while User::username_exists(db, &candidate).await? {
        candidate = format!("{base}{counter}");
        counter += 1;
    }
    Ok(candidate)
}

/// How a Google profile maps onto the local account store.
#[derive(Debug)]
pub enum GoogleResolution {
    /// The google id is already attached to an account.
    Existing(User),
    /// A local account under the same email exists; it gets the google id
    /// backfilled instead of a duplicate being created.
    Backfill(User),
    Create,
}

/// Lookup order: google id wins over email, email over creation.
pub fn resolve_google_identity(
    by_google_id: Option<User>,
    by_email: Option<User>,
) -> GoogleResolution {
    match (by_google_id, by_email) {
        (Some(user), _) => GoogleResolution::Existing(user),
        (None, Some(user)) => GoogleResolution::Backfill(user),
        (None, None) => GoogleResolution::Create,
    }
}

/// Resolve a Google profile to a local account, creating one with a
/// generated username when nothing matches. New OAuth users carry no
/// password hash.
pub async fn find_or_create_google_user(
    db: &PgPool,
    profile: &GoogleProfile,
) -> anyhow::Result<User> {
    let email = profile.email.trim().to_lowercase();
    let by_google_id = User::find_by_google_id(db, &profile.sub).await?;
    let by_email = match by_google_id {
        Some(_) => None,
        None => User::find_by_email(db, &email).await?,
    };

    match resolve_google_identity(by_google_id, by_email) {
        GoogleResolution::Existing(user) => return Ok(user),
        GoogleResolution::Backfill(existing) => {
            info!(user_id = %existing.id, "attaching google identity to existing account");
            let user =
                User::attach_google_id(db, existing.id, &profile.sub, profile.email_verified)
                    .await?;
            return Ok(user);
        }
        GoogleResolution::Create => {}
    }

    let display_name = profile
        .name
        .clone()
        .filter(|n| !n.trim().is_empty())
        .unwrap_or_else(|| email.split('@').next().unwrap_or("user").to_string());
    let username = generate_username(db, &username_base(&display_name, &email)).await?;

    let user = User::create_google(
        db,
        display_name.trim(),
        &username,
        &email,
        &profile.sub,
        profile.email_verified,
    )
    .await?;
    info!(user_id = %user.id, "new user created from google profile");
    Ok(user)
}
