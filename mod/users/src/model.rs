use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Role
// ---------------------------------------------------------------------------

/// A user's role. Closed set — parsed once at the HTTP boundary;
/// internal code never re-validates role strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Client,
    Agent,
    Manager,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Client => "CLIENT",
            Self::Agent => "AGENT",
            Self::Manager => "MANAGER",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "CLIENT" => Some(Self::Client),
            "AGENT" => Some(Self::Agent),
            "MANAGER" => Some(Self::Manager),
            _ => None,
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// User
// ---------------------------------------------------------------------------

/// A locally-provisioned user backing an external identity.
///
/// Created lazily on the first verified session for an unknown external
/// identity, with role CLIENT. `external_id` maps 1:1 to the identity
/// provider's subject and is unique.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,

    /// The identity provider's subject identifier.
    pub external_id: String,

    pub email: String,

    /// Display name copied from the identity's profile traits.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    pub role: Role,

    /// Whether the account is active.
    pub active: bool,

    /// RFC 3339 creation timestamp.
    pub created_at: String,

    /// RFC 3339 last update timestamp.
    pub updated_at: String,
}

/// Body of `POST /users/{id}/role`. The role arrives as a raw string so
/// unknown values produce a field-level validation error rather than a
/// deserialization failure.
#[derive(Debug, Clone, Deserialize)]
pub struct AssignRole {
    pub role: String,
}
