use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// JWT payload carried by every session token.
///
/// Tokens minted by older issuing routes carried the identifier as `_id`;
/// both spellings decode into the same field, and new tokens always use
/// `id`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    #[serde(alias = "_id")]
    pub id: Uuid,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    pub email: String,
    #[serde(rename = "isAdmin")]
    pub is_admin: bool,
    pub iat: usize,
    pub exp: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn admin_flag_round_trips_as_camel_case() {
        let claims = Claims {
            id: Uuid::new_v4(),
            username: Some("ann".into()),
            email: "a@x.com".into(),
            is_admin: true,
            iat: 0,
            exp: 10,
        };
        let json = serde_json::to_value(&claims).unwrap();
        assert_eq!(json["isAdmin"], true);
        assert!(json.get("is_admin").is_none());
    }

    #[test]
    fn identifier_tolerates_both_spellings() {
        let id = Uuid::new_v4();
        let with_id = serde_json::json!({
            "id": id, "email": "a@x.com", "isAdmin": false, "iat": 0, "exp": 10
        });
        let with_underscore_id = serde_json::json!({
            "_id": id, "email": "a@x.com", "isAdmin": false, "iat": 0, "exp": 10
        });
        let a: Claims = serde_json::from_value(with_id).unwrap();
        let b: Claims = serde_json::from_value(with_underscore_id).unwrap();
        assert_eq!(a.id, id);
        assert_eq!(b.id, id);
        assert_eq!(a.username, None);
    }
}
