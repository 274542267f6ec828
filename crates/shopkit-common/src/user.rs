//! Users and sessions

use serde::{Deserialize, Serialize};

/// Signed in user identity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// Server assigned id
    pub id: i64,
    /// Given name
    pub first_name: String,
    /// Family name
    pub last_name: String,
    /// Email address
    pub email: String,
    /// Granted roles
    #[serde(default)]
    pub roles: Vec<String>,
}

impl User {
    /// Display name of the form "First Last"
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    /// Whether the user carries the given role
    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r == role)
    }
}

/// Credentials for signing in
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    /// Email address
    pub email: String,
    /// Plain text password, sent over TLS only
    pub password: String,
}

/// Payload for registering a new account
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignupRequest {
    /// Given name
    pub first_name: String,
    /// Family name
    pub last_name: String,
    /// Email address
    pub email: String,
    /// Plain text password, sent over TLS only
    pub password: String,
}

/// Successful authentication response
///
/// The API flattens the user's identity next to the token rather than
/// nesting a user object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    /// Bearer token for subsequent requests
    pub token: String,
    /// Server assigned user id
    pub id: i64,
    /// Given name
    pub first_name: String,
    /// Family name
    pub last_name: String,
    /// Email address
    pub email: String,
    /// Granted roles
    #[serde(default)]
    pub roles: Vec<String>,
}

impl AuthResponse {
    /// Split the flat response into the persisted session parts
    pub fn into_session(self) -> Session {
        Session {
            user: User {
                id: self.id,
                first_name: self.first_name,
                last_name: self.last_name,
                email: self.email,
                roles: self.roles,
            },
            token: self.token,
        }
    }
}

/// Persisted identity and bearer token
///
/// A best effort cache of the last server confirmed login; the server
/// remains the authority on whether the token is still good.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    /// The signed in user
    pub user: User,
    /// Bearer token
    pub token: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auth_response_decodes_flat_wire_shape() {
        let json = r#"{
            "token": "eyJhbGciOiJIUzI1NiJ9.x.y",
            "id": 40,
            "firstName": "Ada",
            "lastName": "Fox",
            "email": "ada@example.com",
            "roles": ["ROLE_USER", "ROLE_SELLER"]
        }"#;

        let response: AuthResponse = serde_json::from_str(json).unwrap();
        let session = response.into_session();
        assert_eq!(session.user.id, 40);
        assert_eq!(session.user.full_name(), "Ada Fox");
        assert!(session.user.has_role("ROLE_SELLER"));
        assert!(!session.user.has_role("ROLE_ADMIN"));
        assert_eq!(session.token, "eyJhbGciOiJIUzI1NiJ9.x.y");
    }
}
