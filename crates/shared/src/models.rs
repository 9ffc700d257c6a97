//! Wire models for the City Insight session endpoints.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// --- Identity ---

/// The signed-in user as known to the server (`GET /api/me`).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SessionUser {
    #[serde(alias = "_id")]
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub picture: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email_verified: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
    /// Fields this client does not model, kept so views can still read them.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct MeResponse {
    #[serde(default)]
    pub user: Option<SessionUser>,
}

// --- Auth ---

/// Body of `POST /api/auth/login`: an external (Google) ID token to be
/// exchanged for a server-managed session cookie.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    pub id_token: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_me_response_with_user() {
        let json = r#"{
            "user": {
                "id": "u1",
                "email": "ada@example.com",
                "displayName": "Ada",
                "createdAt": "2024-03-01T12:00:00Z",
                "role": "member"
            }
        }"#;
        let me: MeResponse = serde_json::from_str(json).unwrap();
        let user = me.user.unwrap();
        assert_eq!(user.id, "u1");
        assert_eq!(user.display_name.as_deref(), Some("Ada"));
        assert!(user.created_at.is_some());
        assert_eq!(user.extra.get("role"), Some(&serde_json::json!("member")));
    }

    #[test]
    fn test_me_response_null_or_missing_user() {
        let null: MeResponse = serde_json::from_str(r#"{"user":null}"#).unwrap();
        assert!(null.user.is_none());

        let missing: MeResponse = serde_json::from_str("{}").unwrap();
        assert!(missing.user.is_none());
    }

    #[test]
    fn test_mongo_style_id() {
        let user: SessionUser = serde_json::from_str(r#"{"_id":"65f0c1"}"#).unwrap();
        assert_eq!(user.id, "65f0c1");
    }

    #[test]
    fn test_login_request_wire_name() {
        let body = serde_json::to_value(LoginRequest {
            id_token: "google-token".to_string(),
        })
        .unwrap();
        assert_eq!(body, serde_json::json!({ "idToken": "google-token" }));
    }
}
