use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// TicketStatus
// ---------------------------------------------------------------------------

/// Lifecycle state of a ticket.
///
/// ```text
/// NEW → OPEN ⇄ CLOSED
/// ```
///
/// NEW → OPEN happens as a side effect of the first non-client message
/// or of an agent/manager marking the ticket read. A ticket never
/// returns to NEW.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TicketStatus {
    New,
    Open,
    Closed,
}

impl TicketStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::New => "NEW",
            Self::Open => "OPEN",
            Self::Closed => "CLOSED",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "NEW" => Some(Self::New),
            "OPEN" => Some(Self::Open),
            "CLOSED" => Some(Self::Closed),
            _ => None,
        }
    }
}

impl std::fmt::Display for TicketStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Ticket
// ---------------------------------------------------------------------------

/// A support ticket.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ticket {
    pub id: String,

    pub subject: String,

    pub status: TicketStatus,

    /// The owning client.
    pub client_id: String,

    /// The agent handling the ticket; None while it sits in the shared pool.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assigned_agent_id: Option<String>,

    /// Whether an agent or manager has viewed the ticket. Client views
    /// never touch this flag.
    pub is_read: bool,

    /// RFC 3339 creation timestamp.
    pub created_at: String,

    /// RFC 3339 last update timestamp.
    pub updated_at: String,
}

/// A message in a ticket thread. Append-only: no update or delete.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TicketMessage {
    pub id: String,

    pub ticket_id: String,

    pub sender_id: String,

    pub text: String,

    /// Internal notes are invisible to clients, regardless of sender.
    pub is_internal_note: bool,

    /// RFC 3339 creation timestamp.
    pub created_at: String,
}

// ---------------------------------------------------------------------------
// Request / query DTOs
// ---------------------------------------------------------------------------

/// Body of `POST /tickets`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTicket {
    pub subject: String,
    pub client_id: String,
}

/// Body of `PATCH /tickets/{id}`. Status arrives as a raw string so
/// unknown values produce a field-level validation error. An absent
/// field means "leave unchanged"; unassignment is not supported.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTicket {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub assigned_agent_id: Option<String>,
}

/// Body of `POST /tickets/{id}/messages`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateMessage {
    pub text: String,
    #[serde(default)]
    pub is_internal_note: bool,
}

/// Query string of `GET /tickets`. Both filters intersect with the
/// actor's role scope; they never widen it.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TicketQuery {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub unread: Option<bool>,
}
