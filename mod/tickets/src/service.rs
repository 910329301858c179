use std::sync::Arc;

use corecrm_core::{ServiceError, new_id, now_rfc3339};
use corecrm_sql::SQLStore;

use users::model::{Role, User};
use users::store::UserStore;

use crate::lifecycle;
use crate::model::{
    CreateMessage, CreateTicket, Ticket, TicketMessage, TicketQuery, TicketStatus, UpdateTicket,
};
use crate::policy;
use crate::store::TicketStore;

/// The ticket access layer: the only component that touches storage,
/// gated by [`crate::policy`] and [`crate::lifecycle`]. Authorization
/// and validation run before any write; denials short-circuit.
pub struct TicketService {
    store: TicketStore,
    users: UserStore,
}

impl TicketService {
    /// Create a new TicketService, initializing the DB schema.
    pub fn new(sql: Arc<dyn SQLStore>) -> Result<Arc<Self>, ServiceError> {
        let store = TicketStore::new(Arc::clone(&sql))?;
        let users = UserStore::new(sql)?;
        Ok(Arc::new(Self { store, users }))
    }

    // ── Tickets ──

    /// List tickets visible to the actor. The role scope applies first;
    /// status/unread filters narrow it.
    pub fn list_tickets(
        &self,
        actor: &User,
        query: &TicketQuery,
    ) -> Result<Vec<Ticket>, ServiceError> {
        let status = query
            .status
            .as_deref()
            .map(|s| {
                TicketStatus::parse(&s.to_uppercase()).ok_or_else(|| {
                    ServiceError::validation("status", format!("unknown status '{s}'"))
                })
            })
            .transpose()?;

        let scope = policy::list_scope(actor);
        self.store.list(&scope, status, query.unread.unwrap_or(false))
    }

    /// Get one ticket. Missing id is `NotFound`; an existing ticket
    /// outside the actor's scope is `Forbidden` (the two are deliberately
    /// distinguishable — see DESIGN.md).
    pub fn get_ticket(&self, actor: &User, id: &str) -> Result<Ticket, ServiceError> {
        let ticket = self.store.get(id)?;
        if !policy::can_view(actor, &ticket) {
            return Err(ServiceError::Forbidden("no access to this ticket".into()));
        }
        Ok(ticket)
    }

    /// Create a ticket in state NEW, unread. Managers may create for any
    /// client; clients only for themselves.
    pub fn create_ticket(
        &self,
        actor: &User,
        input: CreateTicket,
    ) -> Result<Ticket, ServiceError> {
        if input.subject.trim().is_empty() {
            return Err(ServiceError::validation("subject", "must not be empty"));
        }
        if !policy::can_create_for(actor, &input.client_id) {
            return Err(ServiceError::Forbidden(
                "cannot create tickets for this client".into(),
            ));
        }
        let client = match self.users.get(&input.client_id) {
            Ok(user) => user,
            Err(ServiceError::NotFound(_)) => {
                return Err(ServiceError::validation("clientId", "no such user"));
            }
            Err(e) => return Err(e),
        };
        if client.role != Role::Client {
            return Err(ServiceError::validation("clientId", "user is not a client"));
        }

        let now = now_rfc3339();
        let ticket = Ticket {
            id: new_id(),
            subject: input.subject,
            status: TicketStatus::New,
            client_id: input.client_id,
            assigned_agent_id: None,
            is_read: false,
            created_at: now.clone(),
            updated_at: now,
        };

        self.store.create(&ticket)?;
        tracing::info!(ticket_id = %ticket.id, client_id = %ticket.client_id, "ticket created");
        Ok(ticket)
    }

    /// Apply a partial update: status change and/or reassignment.
    ///
    /// Reassignment is manager-only and the target must be an existing
    /// agent. Status changes go through the lifecycle validator; setting
    /// the current status again is a no-op that does not bump `updatedAt`.
    pub fn update_ticket(
        &self,
        actor: &User,
        id: &str,
        input: UpdateTicket,
    ) -> Result<Ticket, ServiceError> {
        let mut ticket = self.store.get(id)?;
        let mut changed = false;

        if let Some(agent_id) = &input.assigned_agent_id {
            if !policy::can_reassign(actor) {
                return Err(ServiceError::Forbidden(
                    "only managers may reassign tickets".into(),
                ));
            }
            let agent = match self.users.get(agent_id) {
                Ok(user) => user,
                Err(ServiceError::NotFound(_)) => {
                    return Err(ServiceError::validation("assignedAgentId", "no such user"));
                }
                Err(e) => return Err(e),
            };
            if agent.role != Role::Agent {
                return Err(ServiceError::validation(
                    "assignedAgentId",
                    "user is not an agent",
                ));
            }
            if ticket.assigned_agent_id.as_deref() != Some(agent_id.as_str()) {
                ticket.assigned_agent_id = Some(agent_id.clone());
                changed = true;
            }
        }

        if let Some(status) = &input.status {
            let target = TicketStatus::parse(&status.to_uppercase()).ok_or_else(|| {
                ServiceError::validation("status", format!("unknown status '{status}'"))
            })?;
            if !policy::can_change_status(actor, &ticket) {
                return Err(ServiceError::Forbidden(
                    "cannot change this ticket's status".into(),
                ));
            }
            if let Some(next) = lifecycle::validate_status_change(ticket.status, target)? {
                ticket.status = next;
                changed = true;
            }
        }

        if changed {
            ticket.updated_at = now_rfc3339();
            self.store.update(&ticket)?;
        }
        Ok(ticket)
    }

    /// Explicitly mark a ticket as viewed by staff. Sets the read flag
    /// and moves a NEW ticket to OPEN. This is a distinct operation —
    /// plain reads never mutate; callers combine the two when they want
    /// fetch-and-mark semantics.
    pub fn mark_read(&self, actor: &User, id: &str) -> Result<Ticket, ServiceError> {
        let mut ticket = self.store.get(id)?;
        if !policy::can_mark_read(actor, &ticket) {
            return Err(ServiceError::Forbidden(
                "cannot mark this ticket as read".into(),
            ));
        }

        let transition = lifecycle::status_after_read(ticket.status);
        if ticket.is_read && transition.is_none() {
            // Already read and no transition pending — don't churn updated_at.
            return Ok(ticket);
        }

        ticket.is_read = true;
        if let Some(next) = transition {
            ticket.status = next;
        }
        ticket.updated_at = now_rfc3339();
        self.store.update(&ticket)?;
        Ok(ticket)
    }

    // ── Messages ──

    /// Append a message to a ticket's thread. Requires read access;
    /// internal notes are staff-only. The NEW → OPEN transition triggered
    /// by a first staff reply commits atomically with the message.
    pub fn create_message(
        &self,
        actor: &User,
        ticket_id: &str,
        input: CreateMessage,
    ) -> Result<TicketMessage, ServiceError> {
        if input.text.trim().is_empty() {
            return Err(ServiceError::validation("text", "must not be empty"));
        }

        let mut ticket = self.store.get(ticket_id)?;
        if !policy::can_view(actor, &ticket) {
            return Err(ServiceError::Forbidden("no access to this ticket".into()));
        }
        if input.is_internal_note && !policy::can_post_internal_note(actor) {
            return Err(ServiceError::Forbidden(
                "clients cannot create internal notes".into(),
            ));
        }

        let message = TicketMessage {
            id: new_id(),
            ticket_id: ticket.id.clone(),
            sender_id: actor.id.clone(),
            text: input.text,
            is_internal_note: input.is_internal_note,
            created_at: now_rfc3339(),
        };

        let transitioned = match lifecycle::status_after_message(ticket.status, actor.role) {
            Some(next) => {
                ticket.status = next;
                ticket.updated_at = now_rfc3339();
                true
            }
            None => false,
        };

        self.store
            .insert_message(&message, transitioned.then_some(&ticket))?;
        Ok(message)
    }

    /// List a ticket's thread, oldest first. Internal notes are filtered
    /// out for clients.
    pub fn list_messages(
        &self,
        actor: &User,
        ticket_id: &str,
    ) -> Result<Vec<TicketMessage>, ServiceError> {
        let ticket = self.store.get(ticket_id)?;
        if !policy::can_view(actor, &ticket) {
            return Err(ServiceError::Forbidden("no access to this ticket".into()));
        }
        self.store
            .list_messages(ticket_id, policy::can_view_internal_notes(actor))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use corecrm_sql::SqliteStore;

    struct Fixture {
        svc: Arc<TicketService>,
        manager: User,
        agent: User,
        agent2: User,
        client: User,
        client2: User,
    }

    fn fixture() -> Fixture {
        let sql: Arc<dyn SQLStore> = Arc::new(SqliteStore::open_in_memory().unwrap());
        let svc = TicketService::new(Arc::clone(&sql)).unwrap();

        let manager = seed_user(&svc, "manager", Role::Manager);
        let agent = seed_user(&svc, "agent", Role::Agent);
        let agent2 = seed_user(&svc, "agent2", Role::Agent);
        let client = seed_user(&svc, "client", Role::Client);
        let client2 = seed_user(&svc, "client2", Role::Client);

        Fixture {
            svc,
            manager,
            agent,
            agent2,
            client,
            client2,
        }
    }

    fn seed_user(svc: &TicketService, id: &str, role: Role) -> User {
        let now = now_rfc3339();
        let user = User {
            id: id.into(),
            external_id: format!("ext-{id}"),
            email: format!("{id}@example.com"),
            name: None,
            role,
            active: true,
            created_at: now.clone(),
            updated_at: now,
        };
        svc.users.create(&user).unwrap();
        user
    }

    fn create(f: &Fixture, actor: &User, client_id: &str) -> Ticket {
        f.svc
            .create_ticket(
                actor,
                CreateTicket {
                    subject: "Billing issue".into(),
                    client_id: client_id.into(),
                },
            )
            .unwrap()
    }

    fn message(text: &str, internal: bool) -> CreateMessage {
        CreateMessage {
            text: text.into(),
            is_internal_note: internal,
        }
    }

    // ── Creation ──

    #[test]
    fn manager_creates_for_any_client_in_state_new() {
        let f = fixture();
        let ticket = create(&f, &f.manager, &f.client.id);
        assert_eq!(ticket.status, TicketStatus::New);
        assert!(!ticket.is_read);
        assert_eq!(ticket.client_id, f.client.id);
        assert!(ticket.assigned_agent_id.is_none());
    }

    #[test]
    fn client_creates_for_self_only() {
        let f = fixture();
        let ticket = create(&f, &f.client, &f.client.id);
        assert_eq!(ticket.client_id, f.client.id);

        let err = f
            .svc
            .create_ticket(
                &f.client,
                CreateTicket {
                    subject: "Sneaky".into(),
                    client_id: f.client2.id.clone(),
                },
            )
            .unwrap_err();
        assert!(matches!(err, ServiceError::Forbidden(_)));
    }

    #[test]
    fn agents_cannot_create_tickets() {
        let f = fixture();
        let err = f
            .svc
            .create_ticket(
                &f.agent,
                CreateTicket {
                    subject: "Nope".into(),
                    client_id: f.client.id.clone(),
                },
            )
            .unwrap_err();
        assert!(matches!(err, ServiceError::Forbidden(_)));
    }

    #[test]
    fn empty_subject_is_validation() {
        let f = fixture();
        let err = f
            .svc
            .create_ticket(
                &f.client,
                CreateTicket {
                    subject: "   ".into(),
                    client_id: f.client.id.clone(),
                },
            )
            .unwrap_err();
        assert!(matches!(err, ServiceError::Validation { ref field, .. } if field == "subject"));
    }

    #[test]
    fn create_for_unknown_or_non_client_is_validation() {
        let f = fixture();
        let err = f
            .svc
            .create_ticket(
                &f.manager,
                CreateTicket {
                    subject: "S".into(),
                    client_id: "ghost".into(),
                },
            )
            .unwrap_err();
        assert!(matches!(err, ServiceError::Validation { ref field, .. } if field == "clientId"));

        let err = f
            .svc
            .create_ticket(
                &f.manager,
                CreateTicket {
                    subject: "S".into(),
                    client_id: f.agent.id.clone(),
                },
            )
            .unwrap_err();
        assert!(matches!(err, ServiceError::Validation { ref field, .. } if field == "clientId"));
    }

    // ── Visibility ──

    #[test]
    fn client_isolation_on_get() {
        let f = fixture();
        let ticket = create(&f, &f.client2, &f.client2.id);

        let err = f.svc.get_ticket(&f.client, &ticket.id).unwrap_err();
        assert!(matches!(err, ServiceError::Forbidden(_)));

        // The owner and staff still see it.
        assert!(f.svc.get_ticket(&f.client2, &ticket.id).is_ok());
        assert!(f.svc.get_ticket(&f.manager, &ticket.id).is_ok());
    }

    #[test]
    fn get_missing_ticket_is_not_found() {
        let f = fixture();
        let err = f.svc.get_ticket(&f.manager, "missing").unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));
    }

    #[test]
    fn agent_list_scope_excludes_foreign_assignments() {
        let f = fixture();
        let mine = create(&f, &f.client, &f.client.id);
        let pooled = create(&f, &f.client2, &f.client2.id);
        let foreign = create(&f, &f.client, &f.client.id);

        assign(&f, &mine.id, &f.agent.id);
        assign(&f, &foreign.id, &f.agent2.id);

        let listed = f
            .svc
            .list_tickets(&f.agent, &TicketQuery::default())
            .unwrap();
        let ids: Vec<_> = listed.iter().map(|t| t.id.as_str()).collect();
        assert!(ids.contains(&mine.id.as_str()));
        assert!(ids.contains(&pooled.id.as_str()));
        assert!(!ids.contains(&foreign.id.as_str()));

        // Managers see everything.
        let all = f
            .svc
            .list_tickets(&f.manager, &TicketQuery::default())
            .unwrap();
        assert_eq!(all.len(), 3);

        // Clients see only their own.
        let own = f
            .svc
            .list_tickets(&f.client, &TicketQuery::default())
            .unwrap();
        assert_eq!(own.len(), 2);
    }

    #[test]
    fn list_filters_intersect_scope() {
        let f = fixture();
        let a = create(&f, &f.client, &f.client.id);
        let _b = create(&f, &f.client, &f.client.id);
        f.svc.mark_read(&f.manager, &a.id).unwrap();

        let unread = f
            .svc
            .list_tickets(
                &f.client,
                &TicketQuery {
                    status: None,
                    unread: Some(true),
                },
            )
            .unwrap();
        assert_eq!(unread.len(), 1);

        let open = f
            .svc
            .list_tickets(
                &f.client,
                &TicketQuery {
                    status: Some("open".into()),
                    unread: None,
                },
            )
            .unwrap();
        assert_eq!(open.len(), 1);
        assert_eq!(open[0].id, a.id);
    }

    #[test]
    fn list_with_unknown_status_is_validation() {
        let f = fixture();
        let err = f
            .svc
            .list_tickets(
                &f.manager,
                &TicketQuery {
                    status: Some("RESOLVED".into()),
                    unread: None,
                },
            )
            .unwrap_err();
        assert!(matches!(err, ServiceError::Validation { ref field, .. } if field == "status"));
    }

    // ── Lifecycle via messages ──

    #[test]
    fn first_staff_message_opens_ticket_exactly_once() {
        let f = fixture();
        let ticket = create(&f, &f.client, &f.client.id);

        f.svc
            .create_message(&f.agent, &ticket.id, message("On it", false))
            .unwrap();
        let after_first = f.svc.get_ticket(&f.manager, &ticket.id).unwrap();
        assert_eq!(after_first.status, TicketStatus::Open);

        // A second staff message changes nothing further.
        f.svc
            .create_message(&f.agent, &ticket.id, message("Update", false))
            .unwrap();
        let after_second = f.svc.get_ticket(&f.manager, &ticket.id).unwrap();
        assert_eq!(after_second.status, TicketStatus::Open);
        assert_eq!(after_second.updated_at, after_first.updated_at);
    }

    #[test]
    fn client_message_does_not_open_ticket() {
        let f = fixture();
        let ticket = create(&f, &f.client, &f.client.id);

        f.svc
            .create_message(&f.client, &ticket.id, message("Please help", false))
            .unwrap();
        let after = f.svc.get_ticket(&f.manager, &ticket.id).unwrap();
        assert_eq!(after.status, TicketStatus::New);
    }

    #[test]
    fn empty_message_text_is_validation() {
        let f = fixture();
        let ticket = create(&f, &f.client, &f.client.id);
        let err = f
            .svc
            .create_message(&f.client, &ticket.id, message("  ", false))
            .unwrap_err();
        assert!(matches!(err, ServiceError::Validation { ref field, .. } if field == "text"));
    }

    // ── Internal notes ──

    #[test]
    fn client_cannot_post_internal_note() {
        let f = fixture();
        let ticket = create(&f, &f.client, &f.client.id);
        let err = f
            .svc
            .create_message(&f.client, &ticket.id, message("secret", true))
            .unwrap_err();
        assert!(matches!(err, ServiceError::Forbidden(_)));
    }

    #[test]
    fn internal_notes_are_invisible_to_the_owning_client() {
        let f = fixture();
        let ticket = create(&f, &f.client, &f.client.id);

        f.svc
            .create_message(&f.agent, &ticket.id, message("Public reply", false))
            .unwrap();
        f.svc
            .create_message(&f.agent, &ticket.id, message("Internal note", true))
            .unwrap();

        let client_view = f.svc.list_messages(&f.client, &ticket.id).unwrap();
        assert_eq!(client_view.len(), 1);
        assert_eq!(client_view[0].text, "Public reply");

        let staff_view = f.svc.list_messages(&f.agent, &ticket.id).unwrap();
        assert_eq!(staff_view.len(), 2);
    }

    #[test]
    fn message_access_requires_ticket_access() {
        let f = fixture();
        let ticket = create(&f, &f.client2, &f.client2.id);

        let err = f
            .svc
            .create_message(&f.client, &ticket.id, message("hi", false))
            .unwrap_err();
        assert!(matches!(err, ServiceError::Forbidden(_)));

        let err = f.svc.list_messages(&f.client, &ticket.id).unwrap_err();
        assert!(matches!(err, ServiceError::Forbidden(_)));
    }

    // ── Status changes & reassignment ──

    fn assign(f: &Fixture, ticket_id: &str, agent_id: &str) {
        f.svc
            .update_ticket(
                &f.manager,
                ticket_id,
                UpdateTicket {
                    status: None,
                    assigned_agent_id: Some(agent_id.into()),
                },
            )
            .unwrap();
    }

    fn set_status(f: &Fixture, actor: &User, ticket_id: &str, status: &str) -> Result<Ticket, ServiceError> {
        f.svc.update_ticket(
            actor,
            ticket_id,
            UpdateTicket {
                status: Some(status.into()),
                assigned_agent_id: None,
            },
        )
    }

    #[test]
    fn agent_closes_pooled_or_own_ticket_but_not_foreign() {
        let f = fixture();
        let pooled = create(&f, &f.client, &f.client.id);
        let closed = set_status(&f, &f.agent, &pooled.id, "CLOSED").unwrap();
        assert_eq!(closed.status, TicketStatus::Closed);

        let foreign = create(&f, &f.client, &f.client.id);
        assign(&f, &foreign.id, &f.agent2.id);
        let err = set_status(&f, &f.agent, &foreign.id, "CLOSED").unwrap_err();
        assert!(matches!(err, ServiceError::Forbidden(_)));
    }

    #[test]
    fn client_cannot_toggle_own_ticket_status() {
        let f = fixture();
        let ticket = create(&f, &f.client, &f.client.id);
        let err = set_status(&f, &f.client, &ticket.id, "CLOSED").unwrap_err();
        assert!(matches!(err, ServiceError::Forbidden(_)));
    }

    #[test]
    fn reassignment_is_manager_only_even_for_the_assigned_agent() {
        let f = fixture();
        let ticket = create(&f, &f.client, &f.client.id);
        assign(&f, &ticket.id, &f.agent.id);

        let err = f
            .svc
            .update_ticket(
                &f.agent,
                &ticket.id,
                UpdateTicket {
                    status: None,
                    assigned_agent_id: Some(f.agent.id.clone()),
                },
            )
            .unwrap_err();
        assert!(matches!(err, ServiceError::Forbidden(_)));
    }

    #[test]
    fn reassignment_target_must_be_an_agent() {
        let f = fixture();
        let ticket = create(&f, &f.client, &f.client.id);

        let err = f
            .svc
            .update_ticket(
                &f.manager,
                &ticket.id,
                UpdateTicket {
                    status: None,
                    assigned_agent_id: Some(f.client2.id.clone()),
                },
            )
            .unwrap_err();
        assert!(
            matches!(err, ServiceError::Validation { ref field, .. } if field == "assignedAgentId")
        );
    }

    #[test]
    fn closed_reopens_to_open_but_never_new() {
        let f = fixture();
        let ticket = create(&f, &f.client, &f.client.id);
        set_status(&f, &f.manager, &ticket.id, "CLOSED").unwrap();

        let reopened = set_status(&f, &f.manager, &ticket.id, "OPEN").unwrap();
        assert_eq!(reopened.status, TicketStatus::Open);

        let err = set_status(&f, &f.manager, &ticket.id, "NEW").unwrap_err();
        assert!(matches!(err, ServiceError::Validation { ref field, .. } if field == "status"));
    }

    #[test]
    fn unknown_status_value_is_validation() {
        let f = fixture();
        let ticket = create(&f, &f.client, &f.client.id);
        let err = set_status(&f, &f.manager, &ticket.id, "RESOLVED").unwrap_err();
        assert!(matches!(err, ServiceError::Validation { ref field, .. } if field == "status"));
    }

    #[test]
    fn setting_current_status_does_not_bump_updated_at() {
        let f = fixture();
        let ticket = create(&f, &f.client, &f.client.id);
        let closed = set_status(&f, &f.manager, &ticket.id, "CLOSED").unwrap();

        let again = set_status(&f, &f.manager, &ticket.id, "CLOSED").unwrap();
        assert_eq!(again.status, TicketStatus::Closed);
        assert_eq!(again.updated_at, closed.updated_at);
    }

    #[test]
    fn empty_patch_is_a_noop() {
        let f = fixture();
        let ticket = create(&f, &f.client, &f.client.id);
        let same = f
            .svc
            .update_ticket(&f.manager, &ticket.id, UpdateTicket::default())
            .unwrap();
        assert_eq!(same.updated_at, ticket.updated_at);
    }

    #[test]
    fn update_missing_ticket_is_not_found() {
        let f = fixture();
        let err = set_status(&f, &f.manager, "missing", "CLOSED").unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));
    }

    // ── Mark read ──

    #[test]
    fn staff_read_sets_flag_and_opens_new_ticket() {
        let f = fixture();
        let ticket = create(&f, &f.client, &f.client.id);

        let read = f.svc.mark_read(&f.agent, &ticket.id).unwrap();
        assert!(read.is_read);
        assert_eq!(read.status, TicketStatus::Open);
    }

    #[test]
    fn client_cannot_mark_read() {
        let f = fixture();
        let ticket = create(&f, &f.client, &f.client.id);
        let err = f.svc.mark_read(&f.client, &ticket.id).unwrap_err();
        assert!(matches!(err, ServiceError::Forbidden(_)));
    }

    #[test]
    fn mark_read_twice_does_not_churn() {
        let f = fixture();
        let ticket = create(&f, &f.client, &f.client.id);

        let first = f.svc.mark_read(&f.manager, &ticket.id).unwrap();
        let second = f.svc.mark_read(&f.manager, &ticket.id).unwrap();
        assert_eq!(second.updated_at, first.updated_at);
    }

    #[test]
    fn agent_cannot_mark_foreign_ticket_read() {
        let f = fixture();
        let ticket = create(&f, &f.client, &f.client.id);
        assign(&f, &ticket.id, &f.agent2.id);

        let err = f.svc.mark_read(&f.agent, &ticket.id).unwrap_err();
        assert!(matches!(err, ServiceError::Forbidden(_)));
    }

    #[test]
    fn closed_ticket_can_still_receive_messages_without_status_change() {
        let f = fixture();
        let ticket = create(&f, &f.client, &f.client.id);
        set_status(&f, &f.manager, &ticket.id, "CLOSED").unwrap();

        f.svc
            .create_message(&f.agent, &ticket.id, message("follow-up", false))
            .unwrap();
        let after = f.svc.get_ticket(&f.manager, &ticket.id).unwrap();
        assert_eq!(after.status, TicketStatus::Closed);
    }
}
