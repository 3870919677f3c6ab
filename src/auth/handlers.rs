use axum::{
    extract::{FromRef, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Redirect},
    routing::{get, post},
    Json, Router,
};
use tracing::{error, info, instrument, warn};

use crate::{
    auth::{
        dto::{
            AuthPayload, LoginRequest, LoginResponse, OAuthCallbackQuery, RegisterRequest,
            VerifyResponse,
        },
        extractors::AuthUser,
        jwt::JwtKeys,
        oauth::GoogleClient,
        password::{hash_password, verify_password},
        services::{find_or_create_google_user, generate_username, redirect_target, username_base},
    },
    error::ApiError,
    state::AppState,
    users::repo::User,
    validate::{is_valid_email, is_valid_password},
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/verify", get(verify))
        .route("/auth/google", get(google_start))
        .route("/auth/google/callback", get(google_callback))
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<AuthPayload>), ApiError> {
    let name = payload
        .name
        .filter(|s| !s.trim().is_empty())
        .ok_or_else(|| ApiError::Validation("Name is required".into()))?;
    let email = payload
        .email
        .filter(|s| !s.trim().is_empty())
        .ok_or_else(|| ApiError::Validation("Email is required".into()))?;
    let password = payload
        .password
        .filter(|s| !s.is_empty())
        .ok_or_else(|| ApiError::Validation("Password is required".into()))?;

    let email = email.trim().to_lowercase();
    if !is_valid_email(&email) {
        warn!("invalid email");
        return Err(ApiError::Validation("Invalid email".into()));
    }
    if !is_valid_password(&password) {
        return Err(ApiError::Validation(
            "Password must be at least 8 characters with an uppercase letter, \
             a lowercase letter and a digit"
                .into(),
        ));
    }

    let username = match payload.username.as_deref().map(str::trim) {
        Some(u) if !u.is_empty() => u.to_string(),
        _ => generate_username(&state.db, &username_base(&name, &email)).await?,
    };

    // Conflict checks precede any persistence side effect.
    let email_taken = User::find_by_email(&state.db, &email).await?.is_some();
    let username_taken = !email_taken && User::username_exists(&state.db, &username).await?;
    if let Some(conflict) = registration_conflict(email_taken, username_taken) {
        warn!("duplicate registration");
        return Err(conflict);
    }

    let hash = hash_password(&password)?;
    let user = User::create_local(&state.db, name.trim(), &username, &email, &hash).await?;

    // Registration is fire-and-confirm: a signing failure here leaves the
    // user persisted with no token returned, and the client retries login.
    let token = JwtKeys::from_ref(&state).sign(&user)?;

    info!(user_id = %user.id, "user registered");
    Ok((
        StatusCode::CREATED,
        Json(AuthPayload {
            redirect_to: redirect_target(user.is_admin),
            token,
            user,
        }),
    ))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    let (Some(email), Some(password)) = (payload.email, payload.password) else {
        return Err(ApiError::Validation(
            "Email and password are required".into(),
        ));
    };

    // Unknown email, password-less (OAuth-only) account and wrong password
    // all yield the same message: no account enumeration.
    let invalid = || ApiError::Auth("Invalid credentials".into());

    let email = email.trim().to_lowercase();
    let user = User::find_by_email(&state.db, &email)
        .await?
        .ok_or_else(invalid)?;
    let hash = user.password_hash.as_deref().ok_or_else(invalid)?;
    if !verify_password(&password, hash)? {
        warn!(user_id = %user.id, "login with wrong password");
        return Err(invalid());
    }

    let token = JwtKeys::from_ref(&state).sign(&user)?;
    info!(user_id = %user.id, "user logged in");
    Ok(Json(LoginResponse {
        status: "success",
        data: AuthPayload {
            redirect_to: redirect_target(user.is_admin),
            token,
            user,
        },
    }))
}

#[instrument(skip_all)]
pub async fn verify(AuthUser(user): AuthUser) -> Json<VerifyResponse> {
    Json(VerifyResponse {
        message: "Token valid",
        user,
    })
}

/// Kick off the Google handshake. The requesting frontend origin is
/// round-tripped through a short-lived cookie so the callback can send
/// the browser back where it came from.
#[instrument(skip(state, headers))]
pub async fn google_start(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ApiError> {
    let origin = headers
        .get(header::ORIGIN)
        .and_then(|v| v.to_str().ok())
        .unwrap_or(&state.config.frontend_url)
        .to_string();
    let url = GoogleClient::new(state.config.google.clone()).authorize_url()?;
    let cookie =
        format!("oauth_origin={origin}; Path=/; Max-Age=600; HttpOnly; Secure; SameSite=None");
    Ok((
        [(header::SET_COOKIE, cookie)],
        Redirect::temporary(&url),
    ))
}

/// Browser-facing callback: success and failure are both redirects, not
/// API error bodies.
#[instrument(skip(state, headers, query))]
pub async fn google_callback(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<OAuthCallbackQuery>,
) -> Redirect {
    let origin = cookie_value(&headers, "oauth_origin")
        .unwrap_or_else(|| state.config.frontend_url.clone());

    match finish_google_login(&state, query).await {
        Ok(token) => Redirect::temporary(&format!("{origin}/auth-callback?token={token}")),
        Err(e) => {
            error!(error = %e, "google oauth callback failed");
            Redirect::temporary(&format!(
                "{}/auth-callback?error=auth_failed",
                state.config.frontend_url
            ))
        }
    }
}

async fn finish_google_login(
    state: &AppState,
    query: OAuthCallbackQuery,
) -> anyhow::Result<String> {
    if let Some(error) = query.error {
        anyhow::bail!("google returned error: {error}");
    }
    let code = query
        .code
        .ok_or_else(|| anyhow::anyhow!("missing authorization code"))?;

    let profile = GoogleClient::new(state.config.google.clone())
        .exchange_code(&code)
        .await?;
    let user = find_or_create_google_user(&state.db, &profile).await?;
    let token = JwtKeys::from_ref(state).sign(&user)?;
    Ok(token)
}

/// Duplicate registrations are refused with a field-specific message;
/// the email collision is reported first.
fn registration_conflict(email_taken: bool, username_taken: bool) -> Option<ApiError> {
    if email_taken {
        Some(ApiError::Conflict("Email already registered".into()))
    } else if username_taken {
        Some(ApiError::Conflict("Username already taken".into()))
    } else {
        None
    }
}

fn cookie_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(header::COOKIE)?
        .to_str()
        .ok()?
        .split(';')
        .map(str::trim)
        .find_map(|kv| {
            let (k, v) = kv.split_once('=')?;
            (k == name).then(|| v.to_string())
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn cookie_value_parses_among_others() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_static("a=1; oauth_origin=http://localhost:5173; b=2"),
        );
        assert_eq!(
            cookie_value(&headers, "oauth_origin").as_deref(),
            Some("http://localhost:5173")
        );
        assert_eq!(cookie_value(&headers, "b").as_deref(), Some("2"));
        assert_eq!(cookie_value(&headers, "missing"), None);
    }

    #[test]
    fn cookie_value_without_header() {
        assert_eq!(cookie_value(&HeaderMap::new(), "oauth_origin"), None);
    }

    #[test]
    fn duplicate_email_and_username_get_their_own_messages() {
        let err = registration_conflict(true, false).expect("conflict");
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(err.to_string(), "Email already registered");

        let err = registration_conflict(false, true).expect("conflict");
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(err.to_string(), "Username already taken");

        // Email collision is reported first when both apply.
        let err = registration_conflict(true, true).expect("conflict");
        assert_eq!(err.to_string(), "Email already registered");

        assert!(registration_conflict(false, false).is_none());
    }
}
