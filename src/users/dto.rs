use serde::Deserialize;

/// Partial profile update. `is_admin` is honored only for admin actors,
/// and never against their own account.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUserRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub is_admin: Option<bool>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn admin_flag_deserializes_from_camel_case() {
        let req: UpdateUserRequest =
            serde_json::from_str(r#"{"name":"Ann","isAdmin":true}"#).unwrap();
        assert_eq!(req.name.as_deref(), Some("Ann"));
        assert_eq!(req.is_admin, Some(true));
        assert!(req.email.is_none());
    }
}
