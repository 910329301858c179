//! Role-authorization policy — pure, side-effect-free predicates over
//! (actor, ticket). Every function is deny-by-default: unmatched cases
//! return false, never true by omission.
//!
//! | Operation          | MANAGER | AGENT                      | CLIENT          |
//! |--------------------|---------|----------------------------|-----------------|
//! | list scope         | all     | assigned to self or unassigned | own tickets |
//! | view one ticket    | yes     | assigned to self or unassigned | own only    |
//! | create ticket      | any client | no                      | for self only   |
//! | change status      | yes     | assigned to self or unassigned | no          |
//! | reassign agent     | yes     | no                         | no              |
//! | post internal note | yes     | yes                        | no              |
//! | view internal notes| yes     | yes                        | no              |
//! | mark read          | yes     | assigned to self or unassigned | no          |

use users::model::{Role, User};

use crate::model::Ticket;

/// The role-dependent subset of tickets an actor may list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TicketScope {
    /// Every ticket (managers).
    All,
    /// Tickets assigned to this agent plus the unassigned pool.
    AgentPool(String),
    /// Tickets owned by this client.
    OwnClient(String),
}

/// Compute the listing scope for an actor.
pub fn list_scope(actor: &User) -> TicketScope {
    match actor.role {
        Role::Manager => TicketScope::All,
        Role::Agent => TicketScope::AgentPool(actor.id.clone()),
        Role::Client => TicketScope::OwnClient(actor.id.clone()),
    }
}

/// An unassigned ticket counts as accessible to every agent.
fn agent_has_access(agent_id: &str, ticket: &Ticket) -> bool {
    match ticket.assigned_agent_id.as_deref() {
        None => true,
        Some(assigned) => assigned == agent_id,
    }
}

/// May the actor read this ticket (and its thread)?
pub fn can_view(actor: &User, ticket: &Ticket) -> bool {
    match actor.role {
        Role::Manager => true,
        Role::Agent => agent_has_access(&actor.id, ticket),
        Role::Client => ticket.client_id == actor.id,
    }
}

/// May the actor create a ticket owned by `client_id`?
pub fn can_create_for(actor: &User, client_id: &str) -> bool {
    match actor.role {
        Role::Manager => true,
        Role::Agent => false,
        Role::Client => actor.id == client_id,
    }
}

/// May the actor toggle this ticket's status?
///
/// Clients may not, even on their own tickets.
pub fn can_change_status(actor: &User, ticket: &Ticket) -> bool {
    match actor.role {
        Role::Manager => true,
        Role::Agent => agent_has_access(&actor.id, ticket),
        Role::Client => false,
    }
}

/// May the actor reassign the handling agent? Managers only.
pub fn can_reassign(actor: &User) -> bool {
    actor.role == Role::Manager
}

/// May the actor post an internal note?
pub fn can_post_internal_note(actor: &User) -> bool {
    matches!(actor.role, Role::Agent | Role::Manager)
}

/// May the actor see internal notes in a thread?
pub fn can_view_internal_notes(actor: &User) -> bool {
    matches!(actor.role, Role::Agent | Role::Manager)
}

/// May the actor mark this ticket read? The read flag tracks staff
/// attention, so clients never touch it.
pub fn can_mark_read(actor: &User, ticket: &Ticket) -> bool {
    match actor.role {
        Role::Manager => true,
        Role::Agent => agent_has_access(&actor.id, ticket),
        Role::Client => false,
    }
}
