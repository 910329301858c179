use std::sync::Arc;

use corecrm_core::ServiceError;
use corecrm_sql::{Row, SQLStore, Statement, Value};

use crate::model::{Ticket, TicketMessage, TicketStatus};
use crate::policy::TicketScope;

/// SQL schema for tickets and their messages.
///
/// Records live in the `data` JSON column; the scalar columns exist for
/// WHERE clauses and ordering. A ticket owns its messages (cascade).
const SCHEMA: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS tickets (
        id                TEXT PRIMARY KEY,
        data              TEXT NOT NULL,
        status            TEXT NOT NULL,
        client_id         TEXT NOT NULL,
        assigned_agent_id TEXT,
        is_read           INTEGER NOT NULL DEFAULT 0,
        created_at        TEXT NOT NULL,
        updated_at        TEXT NOT NULL
    )",
    "CREATE INDEX IF NOT EXISTS idx_tickets_status ON tickets(status)",
    "CREATE INDEX IF NOT EXISTS idx_tickets_client ON tickets(client_id)",
    "CREATE INDEX IF NOT EXISTS idx_tickets_agent ON tickets(assigned_agent_id)",
    "CREATE INDEX IF NOT EXISTS idx_tickets_updated ON tickets(updated_at)",
    "CREATE TABLE IF NOT EXISTS ticket_messages (
        id               TEXT PRIMARY KEY,
        data             TEXT NOT NULL,
        ticket_id        TEXT NOT NULL,
        is_internal_note INTEGER NOT NULL DEFAULT 0,
        created_at       TEXT NOT NULL,
        FOREIGN KEY (ticket_id) REFERENCES tickets(id) ON DELETE CASCADE
    )",
    "CREATE INDEX IF NOT EXISTS idx_messages_ticket ON ticket_messages(ticket_id, created_at)",
];

/// Persistent storage for tickets and messages, backed by SQLStore (SQLite).
pub struct TicketStore {
    db: Arc<dyn SQLStore>,
}

impl TicketStore {
    /// Create a new TicketStore and initialise the schema.
    pub fn new(db: Arc<dyn SQLStore>) -> Result<Self, ServiceError> {
        for stmt in SCHEMA {
            db.exec(stmt, &[])
                .map_err(|e| ServiceError::Storage(format!("tickets schema init: {e}")))?;
        }
        Ok(Self { db })
    }

    // -----------------------------------------------------------------------
    // Tickets
    // -----------------------------------------------------------------------

    /// Insert a new ticket.
    pub fn create(&self, ticket: &Ticket) -> Result<(), ServiceError> {
        let (data, params) = ticket_row(ticket)?;
        self.db
            .exec(
                "INSERT INTO tickets (id, data, status, client_id, assigned_agent_id, is_read, created_at, updated_at) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                &[
                    Value::Text(ticket.id.clone()),
                    Value::Text(data),
                    params.0,
                    params.1,
                    params.2,
                    params.3,
                    Value::Text(ticket.created_at.clone()),
                    Value::Text(ticket.updated_at.clone()),
                ],
            )
            .map_err(|e| ServiceError::Storage(e.to_string()))?;
        Ok(())
    }

    /// Get a ticket by ID.
    pub fn get(&self, id: &str) -> Result<Ticket, ServiceError> {
        let rows = self
            .db
            .query(
                "SELECT data FROM tickets WHERE id = ?1",
                &[Value::Text(id.to_string())],
            )
            .map_err(|e| ServiceError::Storage(e.to_string()))?;

        let row = rows
            .first()
            .ok_or_else(|| ServiceError::NotFound(format!("ticket {id}")))?;

        row_to_ticket(row)
    }

    /// Update a ticket (full replacement of the data column + indexed columns).
    pub fn update(&self, ticket: &Ticket) -> Result<(), ServiceError> {
        let stmt = update_ticket_statement(ticket)?;
        let affected = self
            .db
            .exec(&stmt.sql, &stmt.params)
            .map_err(|e| ServiceError::Storage(e.to_string()))?;

        if affected == 0 {
            return Err(ServiceError::NotFound(format!("ticket {}", ticket.id)));
        }
        Ok(())
    }

    /// List tickets within a scope, optionally filtered by status and
    /// unread flag. Filters intersect with the scope — they never widen
    /// it. Sorted by `updated_at` descending.
    pub fn list(
        &self,
        scope: &TicketScope,
        status: Option<TicketStatus>,
        unread_only: bool,
    ) -> Result<Vec<Ticket>, ServiceError> {
        let mut where_clauses: Vec<String> = Vec::new();
        let mut params: Vec<Value> = Vec::new();
        let mut idx = 1;

        match scope {
            TicketScope::All => {}
            TicketScope::AgentPool(agent_id) => {
                where_clauses.push(format!(
                    "(assigned_agent_id = ?{idx} OR assigned_agent_id IS NULL)"
                ));
                params.push(Value::Text(agent_id.clone()));
                idx += 1;
            }
            TicketScope::OwnClient(client_id) => {
                where_clauses.push(format!("client_id = ?{idx}"));
                params.push(Value::Text(client_id.clone()));
                idx += 1;
            }
        }

        if let Some(status) = status {
            where_clauses.push(format!("status = ?{idx}"));
            params.push(Value::Text(status.as_str().to_string()));
        }
        if unread_only {
            where_clauses.push("is_read = 0".to_string());
        }

        let where_sql = if where_clauses.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", where_clauses.join(" AND "))
        };

        let sql = format!("SELECT data FROM tickets {where_sql} ORDER BY updated_at DESC");
        let rows = self
            .db
            .query(&sql, &params)
            .map_err(|e| ServiceError::Storage(e.to_string()))?;

        rows.iter().map(row_to_ticket).collect()
    }

    // -----------------------------------------------------------------------
    // Messages
    // -----------------------------------------------------------------------

    /// Insert a message, atomically applying a ticket update when the
    /// message triggered a lifecycle transition. Either both rows commit
    /// or neither does — a message can never land without its transition.
    pub fn insert_message(
        &self,
        message: &TicketMessage,
        updated_ticket: Option<&Ticket>,
    ) -> Result<(), ServiceError> {
        let data = serde_json::to_string(message)
            .map_err(|e| ServiceError::Internal(e.to_string()))?;

        let mut statements = vec![Statement::new(
            "INSERT INTO ticket_messages (id, data, ticket_id, is_internal_note, created_at) \
             VALUES (?1, ?2, ?3, ?4, ?5)",
            vec![
                Value::Text(message.id.clone()),
                Value::Text(data),
                Value::Text(message.ticket_id.clone()),
                Value::flag(message.is_internal_note),
                Value::Text(message.created_at.clone()),
            ],
        )];

        if let Some(ticket) = updated_ticket {
            statements.push(update_ticket_statement(ticket)?);
        }

        self.db
            .exec_batch(&statements)
            .map_err(|e| ServiceError::Storage(e.to_string()))?;
        Ok(())
    }

    /// List a ticket's messages, oldest first. Internal notes are
    /// excluded unless the caller may see them.
    pub fn list_messages(
        &self,
        ticket_id: &str,
        include_internal: bool,
    ) -> Result<Vec<TicketMessage>, ServiceError> {
        let sql = if include_internal {
            "SELECT data FROM ticket_messages WHERE ticket_id = ?1 ORDER BY created_at ASC"
        } else {
            "SELECT data FROM ticket_messages WHERE ticket_id = ?1 AND is_internal_note = 0 \
             ORDER BY created_at ASC"
        };

        let rows = self
            .db
            .query(sql, &[Value::Text(ticket_id.to_string())])
            .map_err(|e| ServiceError::Storage(e.to_string()))?;

        rows.iter().map(row_to_message).collect()
    }
}

type TicketIndexParams = (Value, Value, Value, Value);

/// Serialize a ticket to its data JSON plus indexed-column values
/// (status, client_id, assigned_agent_id, is_read).
fn ticket_row(ticket: &Ticket) -> Result<(String, TicketIndexParams), ServiceError> {
    let data =
        serde_json::to_string(ticket).map_err(|e| ServiceError::Internal(e.to_string()))?;
    Ok((
        data,
        (
            Value::Text(ticket.status.as_str().to_string()),
            Value::Text(ticket.client_id.clone()),
            Value::opt_text(ticket.assigned_agent_id.as_deref()),
            Value::flag(ticket.is_read),
        ),
    ))
}

fn update_ticket_statement(ticket: &Ticket) -> Result<Statement, ServiceError> {
    let (data, params) = ticket_row(ticket)?;
    Ok(Statement::new(
        "UPDATE tickets SET data = ?1, status = ?2, client_id = ?3, assigned_agent_id = ?4, \
         is_read = ?5, updated_at = ?6 WHERE id = ?7",
        vec![
            Value::Text(data),
            params.0,
            params.1,
            params.2,
            params.3,
            Value::Text(ticket.updated_at.clone()),
            Value::Text(ticket.id.clone()),
        ],
    ))
}

/// Deserialize a Ticket from a row's `data` JSON column.
fn row_to_ticket(row: &Row) -> Result<Ticket, ServiceError> {
    let json = row
        .get_str("data")
        .ok_or_else(|| ServiceError::Storage("missing data column".into()))?;
    serde_json::from_str(json).map_err(|e| ServiceError::Storage(format!("bad ticket json: {e}")))
}

/// Deserialize a TicketMessage from a row's `data` JSON column.
fn row_to_message(row: &Row) -> Result<TicketMessage, ServiceError> {
    let json = row
        .get_str("data")
        .ok_or_else(|| ServiceError::Storage("missing data column".into()))?;
    serde_json::from_str(json).map_err(|e| ServiceError::Storage(format!("bad message json: {e}")))
}
