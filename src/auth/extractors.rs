use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::{header, request::Parts},
};
use jsonwebtoken::errors::ErrorKind;
use tracing::warn;

use crate::{
    auth::{claims::Claims, jwt::JwtKeys},
    error::ApiError,
    state::AppState,
    users::repo::User,
};

fn bearer_token(parts: &Parts) -> Result<&str, ApiError> {
    let header = parts
        .headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| ApiError::Auth("Token required".into()))?;
    header
        .strip_prefix("Bearer ")
        .ok_or_else(|| ApiError::Auth("Invalid authorization header".into()))
}

fn verify_claims(parts: &Parts, keys: &JwtKeys) -> Result<Claims, ApiError> {
    let token = bearer_token(parts)?;
    keys.verify(token).map_err(|e| {
        warn!("token rejected");
        match e.kind() {
            ErrorKind::ExpiredSignature => ApiError::Auth("Token expired".into()),
            _ => ApiError::Auth("Invalid token".into()),
        }
    })
}

/// Request gate for protected routes. Verification strictly precedes the
/// user lookup, and the lookup strictly precedes the handler: a token
/// whose account has since been deleted is rejected here.
#[derive(Debug)]
pub struct AuthUser(pub User);

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let claims = verify_claims(parts, &JwtKeys::from_ref(state))?;
        let user = User::find_by_id(&state.db, claims.id)
            .await?
            .ok_or_else(|| ApiError::Auth("User not found".into()))?;
        Ok(AuthUser(user))
    }
}

/// Admin gate. Trusts the token's admin claim without re-reading the live
/// user record: a demoted admin keeps access until their current token
/// expires and they re-authenticate. Deliberate staleness trade-off.
#[derive(Debug)]
pub struct AdminClaims(pub Claims);

#[async_trait]
impl FromRequestParts<AppState> for AdminClaims {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let claims = verify_claims(parts, &JwtKeys::from_ref(state))?;
        if !claims.is_admin {
            return Err(ApiError::Forbidden("Access denied".into()));
        }
        Ok(AdminClaims(claims))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{Request, StatusCode};
    use time::OffsetDateTime;
    use uuid::Uuid;

    fn make_user(is_admin: bool) -> User {
        User {
            id: Uuid::new_v4(),
            name: "Ann".into(),
            username: "ann".into(),
            email: "a@x.com".into(),
            password_hash: None,
            is_admin,
            verified: false,
            google_id: None,
            created_at: OffsetDateTime::now_utc(),
        }
    }

    fn parts_with_auth(value: Option<&str>) -> Parts {
        let mut builder = Request::builder().uri("/");
        if let Some(v) = value {
            builder = builder.header(header::AUTHORIZATION, v);
        }
        let (parts, ()) = builder.body(()).expect("request").into_parts();
        parts
    }

    #[tokio::test]
    async fn missing_header_is_401_token_required() {
        let state = AppState::fake();
        let mut parts = parts_with_auth(None);
        let err = AdminClaims::from_request_parts(&mut parts, &state)
            .await
            .unwrap_err();
        assert_eq!(err.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(err.to_string(), "Token required");
    }

    #[tokio::test]
    async fn garbage_token_is_401() {
        let state = AppState::fake();
        let mut parts = parts_with_auth(Some("Bearer not.a.jwt"));
        let err = AdminClaims::from_request_parts(&mut parts, &state)
            .await
            .unwrap_err();
        assert_eq!(err.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn wrong_scheme_is_401() {
        let state = AppState::fake();
        let mut parts = parts_with_auth(Some("Basic abc"));
        let err = AdminClaims::from_request_parts(&mut parts, &state)
            .await
            .unwrap_err();
        assert_eq!(err.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn non_admin_token_is_403() {
        let state = AppState::fake();
        let keys = JwtKeys::from_ref(&state);
        let token = keys.sign(&make_user(false)).expect("sign");
        let mut parts = parts_with_auth(Some(&format!("Bearer {token}")));
        let err = AdminClaims::from_request_parts(&mut parts, &state)
            .await
            .unwrap_err();
        assert_eq!(err.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn admin_token_passes_the_gate() {
        let state = AppState::fake();
        let keys = JwtKeys::from_ref(&state);
        let user = make_user(true);
        let token = keys.sign(&user).expect("sign");
        let mut parts = parts_with_auth(Some(&format!("Bearer {token}")));
        let AdminClaims(claims) = AdminClaims::from_request_parts(&mut parts, &state)
            .await
            .expect("gate");
        assert_eq!(claims.id, user.id);
        assert!(claims.is_admin);
    }
}
