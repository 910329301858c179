use std::sync::Arc;

use corecrm_core::{
    ExternalIdentity, ListParams, ListResult, ServiceError, SessionVerifier, new_id, now_rfc3339,
};
use corecrm_sql::SQLStore;

use crate::model::{Role, User};
use crate::store::UserStore;

/// The Users service: session-to-user resolution and role management.
///
/// Holds its storage and the session verifier as injected dependencies —
/// never module-level singletons — so tests can substitute fakes.
pub struct UserService {
    store: UserStore,
    verifier: Arc<dyn SessionVerifier>,
}

impl UserService {
    /// Create a new UserService, initializing the DB schema.
    pub fn new(
        sql: Arc<dyn SQLStore>,
        verifier: Arc<dyn SessionVerifier>,
    ) -> Result<Arc<Self>, ServiceError> {
        let store = UserStore::new(sql)?;
        Ok(Arc::new(Self { store, verifier }))
    }

    // ── Identity resolution ──

    /// Resolve a session credential to a local user.
    ///
    /// A missing credential fails immediately with `Unauthenticated` —
    /// the identity provider is never contacted. A verified identity
    /// that has no local record yet is provisioned with role CLIENT.
    pub async fn resolve_session(&self, credential: Option<&str>) -> Result<User, ServiceError> {
        let credential = credential
            .ok_or_else(|| ServiceError::Unauthenticated("no session cookie".into()))?;

        let identity = self.verifier.verify_session(credential).await?;
        self.find_or_provision(&identity)
    }

    /// Find the user backing an external identity, creating one on first sight.
    pub fn find_or_provision(&self, identity: &ExternalIdentity) -> Result<User, ServiceError> {
        if let Some(user) = self.store.find_by_external_id(&identity.id)? {
            return Ok(user);
        }
        self.provision(identity)
    }

    /// Create the local record for a never-seen identity.
    ///
    /// Two concurrent first-requests may both reach this point; the UNIQUE
    /// constraint on `external_id` lets exactly one insert win, and the
    /// loser re-fetches the winner's row. No application-level lock — the
    /// process may be horizontally replicated.
    fn provision(&self, identity: &ExternalIdentity) -> Result<User, ServiceError> {
        let now = now_rfc3339();
        let user = User {
            id: new_id(),
            external_id: identity.id.clone(),
            email: identity.email.clone(),
            name: identity.name.clone(),
            role: Role::Client,
            active: true,
            created_at: now.clone(),
            updated_at: now,
        };

        match self.store.create(&user) {
            Ok(()) => {
                tracing::info!(user_id = %user.id, "provisioned user for new external identity");
                Ok(user)
            }
            Err(ServiceError::Conflict(_)) => {
                // Lost the provisioning race — another request inserted first.
                self.store
                    .find_by_external_id(&identity.id)?
                    .ok_or_else(|| {
                        ServiceError::Internal("user missing after provisioning conflict".into())
                    })
            }
            Err(e) => Err(e),
        }
    }

    // ── User management ──

    /// Get a user by id.
    pub fn get_user(&self, id: &str) -> Result<User, ServiceError> {
        self.store.get(id)
    }

    /// List users. Manager-only: the listing backs the reassignment UI.
    pub fn list_users(
        &self,
        actor: &User,
        params: &ListParams,
    ) -> Result<ListResult<User>, ServiceError> {
        if actor.role != Role::Manager {
            return Err(ServiceError::Forbidden("only managers may list users".into()));
        }
        let (items, total) = self.store.list(params.limit, params.offset)?;
        Ok(ListResult { items, total })
    }

    /// Assign a role to a user. Manager-only; unknown role strings are a
    /// validation failure distinct from the permission error, and leave
    /// the stored role untouched.
    pub fn assign_role(
        &self,
        actor: &User,
        target_id: &str,
        role: &str,
    ) -> Result<User, ServiceError> {
        if actor.role != Role::Manager {
            return Err(ServiceError::Forbidden("only managers may assign roles".into()));
        }

        let role = Role::parse(role)
            .ok_or_else(|| ServiceError::validation("role", format!("unknown role '{role}'")))?;

        let mut user = self.store.get(target_id)?;
        if user.role != role {
            user.role = role;
            user.updated_at = now_rfc3339();
            self.store.update(&user)?;
            tracing::info!(user_id = %user.id, role = %role, "role assigned");
        }
        Ok(user)
    }

    /// Access the underlying store (shared with sibling modules that
    /// validate user references).
    pub fn store(&self) -> &UserStore {
        &self.store
    }
}
