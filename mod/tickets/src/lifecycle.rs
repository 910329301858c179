//! Ticket lifecycle state machine.
//!
//! ```text
//! NEW → OPEN ⇄ CLOSED
//! ```
//!
//! Initial state NEW, no terminal state (CLOSED is reopenable). The
//! transition out of NEW fires as a side effect of the first non-client
//! message or of a staff read; explicit status changes are validated
//! here and authorized separately by [`crate::policy`].

use corecrm_core::ServiceError;
use users::model::Role;

use crate::model::TicketStatus;

/// Status transition triggered by posting a message.
///
/// A NEW ticket moves to OPEN the first time a non-client posts to it.
/// Client messages never change status. Returns the new status, or None
/// when nothing changes.
pub fn status_after_message(current: TicketStatus, sender: Role) -> Option<TicketStatus> {
    match (current, sender) {
        (TicketStatus::New, Role::Agent | Role::Manager) => Some(TicketStatus::Open),
        _ => None,
    }
}

/// Status transition triggered by a staff member marking the ticket read.
pub fn status_after_read(current: TicketStatus) -> Option<TicketStatus> {
    match current {
        TicketStatus::New => Some(TicketStatus::Open),
        _ => None,
    }
}

/// Validate an explicit status-change request.
///
/// - Target NEW is always rejected: a ticket never reverts to NEW.
/// - Target equal to the current status is a harmless no-op; it returns
///   `Ok(None)` and callers skip the write, so `updatedAt` is NOT bumped.
/// - Anything else returns the status to apply.
pub fn validate_status_change(
    current: TicketStatus,
    target: TicketStatus,
) -> Result<Option<TicketStatus>, ServiceError> {
    if target == TicketStatus::New {
        return Err(ServiceError::validation(
            "status",
            "a ticket cannot be set back to NEW",
        ));
    }
    if target == current {
        return Ok(None);
    }
    Ok(Some(target))
}
