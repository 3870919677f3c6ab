use std::time::Duration;

use axum::extract::FromRef;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use time::{Duration as TimeDuration, OffsetDateTime};
use tracing::debug;

use crate::{auth::claims::Claims, config::JwtConfig, state::AppState, users::repo::User};

/// Signing and verification keys derived from the single server secret.
/// Tokens expire after the configured TTL (one hour by default) and are
/// never revoked before that; expiry is the only invalidation.
#[derive(Clone)]
pub struct JwtKeys {
    pub encoding: EncodingKey,
    pub decoding: DecodingKey,
    pub ttl: Duration,
}

impl FromRef<AppState> for JwtKeys {
    fn from_ref(state: &AppState) -> Self {
        let JwtConfig {
            secret,
            ttl_minutes,
        } = state.config.jwt.clone();
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            ttl: Duration::from_secs((ttl_minutes as u64) * 60),
        }
    }
}

impl JwtKeys {
    pub fn sign(&self, user: &User) -> jsonwebtoken::errors::Result<String> {
        let now = OffsetDateTime::now_utc();
        let exp = now + TimeDuration::seconds(self.ttl.as_secs() as i64);
        let claims = Claims {
            id: user.id,
            username: Some(user.username.clone()),
            email: user.email.clone(),
            is_admin: user.is_admin,
            iat: now.unix_timestamp() as usize,
            exp: exp.unix_timestamp() as usize,
        };
        let token = encode(&Header::default(), &claims, &self.encoding)?;
        debug!(user_id = %user.id, "jwt signed");
        Ok(token)
    }

    pub fn verify(&self, token: &str) -> jsonwebtoken::errors::Result<Claims> {
        // Zero leeway: a token is accepted up to its exp and rejected
        // strictly after.
        let mut validation = Validation::default();
        validation.leeway = 0;
        let data = decode::<Claims>(token, &self.decoding, &validation)?;
        debug!(user_id = %data.claims.id, "jwt verified");
        Ok(data.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::errors::ErrorKind;
    use uuid::Uuid;

    fn make_keys() -> JwtKeys {
        JwtKeys::from_ref(&AppState::fake())
    }

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

    #[tokio::test]
    async fn sign_and_verify_round_trip() {
        let keys = make_keys();
        let user = make_user(false);
        let token = keys.sign(&user).expect("sign");
        let claims = keys.verify(&token).expect("verify");
        assert_eq!(claims.id, user.id);
        assert_eq!(claims.email, "a@x.com");
        assert_eq!(claims.username.as_deref(), Some("ann"));
        assert!(!claims.is_admin);
    }

    #[tokio::test]
    async fn admin_claim_survives_signing() {
        let keys = make_keys();
        let token = keys.sign(&make_user(true)).expect("sign");
        assert!(keys.verify(&token).expect("verify").is_admin);
    }

    #[tokio::test]
    async fn expired_token_is_rejected() {
        let keys = make_keys();
        let now = OffsetDateTime::now_utc().unix_timestamp();
        let claims = Claims {
            id: Uuid::new_v4(),
            username: None,
            email: "a@x.com".into(),
            is_admin: false,
            iat: (now - 7200) as usize,
            exp: (now - 3600) as usize,
        };
        let token = encode(&Header::default(), &claims, &keys.encoding).expect("encode");
        let err = keys.verify(&token).unwrap_err();
        assert_eq!(*err.kind(), ErrorKind::ExpiredSignature);
    }

    #[tokio::test]
    async fn recently_expired_token_gets_no_leeway() {
        let keys = make_keys();
        let now = OffsetDateTime::now_utc().unix_timestamp();
        // Expired ten seconds ago; the default 60s leeway would accept it.
        let claims = Claims {
            id: Uuid::new_v4(),
            username: None,
            email: "a@x.com".into(),
            is_admin: false,
            iat: (now - 3600) as usize,
            exp: (now - 10) as usize,
        };
        let token = encode(&Header::default(), &claims, &keys.encoding).expect("encode");
        assert!(keys.verify(&token).is_err());
    }

    #[tokio::test]
    async fn wrong_secret_is_rejected() {
        let keys = make_keys();
        let other = JwtKeys {
            encoding: EncodingKey::from_secret(b"another-secret"),
            decoding: DecodingKey::from_secret(b"another-secret"),
            ttl: Duration::from_secs(3600),
        };
        let token = other.sign(&make_user(false)).expect("sign");
        assert!(keys.verify(&token).is_err());
    }

    #[tokio::test]
    async fn legacy_underscore_id_claim_verifies() {
        #[derive(serde::Serialize)]
        struct LegacyClaims {
            _id: Uuid,
            email: String,
            #[serde(rename = "isAdmin")]
            is_admin: bool,
            iat: usize,
            exp: usize,
        }
        let keys = make_keys();
        let id = Uuid::new_v4();
        let now = OffsetDateTime::now_utc().unix_timestamp();
        let legacy = LegacyClaims {
            _id: id,
            email: "a@x.com".into(),
            is_admin: true,
            iat: now as usize,
            exp: (now + 3600) as usize,
        };
        let token = encode(&Header::default(), &legacy, &keys.encoding).expect("encode");
        let claims = keys.verify(&token).expect("verify");
        assert_eq!(claims.id, id);
        assert!(claims.is_admin);
    }
}
