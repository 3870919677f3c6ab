use serde::{Deserialize, Serialize};

use crate::users::repo::User;

/// Registration body. Fields are optional so each missing one can be
/// reported with its own message; `username` is generated when absent.
#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub username: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

/// Body returned by register (201) and carried under `data` by login.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthPayload {
    pub user: User,
    pub token: String,
    pub redirect_to: &'static str,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub status: &'static str,
    pub data: AuthPayload,
}

#[derive(Debug, Serialize)]
pub struct VerifyResponse {
    pub message: &'static str,
    pub user: User,
}

#[derive(Debug, Deserialize)]
pub struct OAuthCallbackQuery {
    pub code: Option<String>,
    pub error: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::OffsetDateTime;
    use uuid::Uuid;

    #[test]
    fn auth_payload_strips_password_and_camel_cases() {
        let payload = AuthPayload {
            user: User {
                id: Uuid::new_v4(),
                name: "Ann".into(),
                username: "ann".into(),
                email: "a@x.com".into(),
                password_hash: Some("$argon2id$fake".into()),
                is_admin: true,
                verified: false,
                google_id: None,
                created_at: OffsetDateTime::now_utc(),
            },
            token: "tok".into(),
            redirect_to: "/dashboard",
        };
        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["redirectTo"], "/dashboard");
        assert_eq!(json["token"], "tok");
        assert!(json["user"].get("passwordHash").is_none());
        assert!(json["user"].get("password").is_none());
        assert_eq!(json["user"]["isAdmin"], true);
    }
}
