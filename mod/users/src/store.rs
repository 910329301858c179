use std::sync::Arc;

use corecrm_core::ServiceError;
use corecrm_sql::{Row, SQLStore, Value};

use crate::model::User;

/// SQL schema for the users table.
///
/// `external_id` carries the UNIQUE constraint that makes lazy
/// provisioning race-safe: concurrent first-requests for the same
/// identity collapse to one row at the storage level.
const SCHEMA: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS users (
        id          TEXT PRIMARY KEY,
        data        TEXT NOT NULL,
        external_id TEXT NOT NULL UNIQUE,
        email       TEXT NOT NULL,
        role        TEXT NOT NULL,
        active      INTEGER NOT NULL DEFAULT 1,
        created_at  TEXT NOT NULL,
        updated_at  TEXT NOT NULL
    )",
    "CREATE INDEX IF NOT EXISTS idx_users_role ON users(role)",
    "CREATE INDEX IF NOT EXISTS idx_users_email ON users(email)",
];

/// Persistent storage for users, backed by SQLStore (SQLite).
pub struct UserStore {
    db: Arc<dyn SQLStore>,
}

impl UserStore {
    /// Create a new UserStore and initialise the schema.
    pub fn new(db: Arc<dyn SQLStore>) -> Result<Self, ServiceError> {
        for stmt in SCHEMA {
            db.exec(stmt, &[])
                .map_err(|e| ServiceError::Storage(format!("users schema init: {e}")))?;
        }
        Ok(Self { db })
    }

    /// Insert a new user. A duplicate `external_id` surfaces as `Conflict`.
    pub fn create(&self, user: &User) -> Result<(), ServiceError> {
        let data =
            serde_json::to_string(user).map_err(|e| ServiceError::Internal(e.to_string()))?;

        self.db
            .exec(
                "INSERT INTO users (id, data, external_id, email, role, active, created_at, updated_at) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                &[
                    Value::Text(user.id.clone()),
                    Value::Text(data),
                    Value::Text(user.external_id.clone()),
                    Value::Text(user.email.clone()),
                    Value::Text(user.role.as_str().to_string()),
                    Value::flag(user.active),
                    Value::Text(user.created_at.clone()),
                    Value::Text(user.updated_at.clone()),
                ],
            )
            .map_err(|e| {
                if e.is_unique_violation() {
                    ServiceError::Conflict(format!("external identity already provisioned: {e}"))
                } else {
                    ServiceError::Storage(e.to_string())
                }
            })?;

        Ok(())
    }

    /// Get a user by ID.
    pub fn get(&self, id: &str) -> Result<User, ServiceError> {
        let rows = self
            .db
            .query(
                "SELECT data FROM users WHERE id = ?1",
                &[Value::Text(id.to_string())],
            )
            .map_err(|e| ServiceError::Storage(e.to_string()))?;

        let row = rows
            .first()
            .ok_or_else(|| ServiceError::NotFound(format!("user {id}")))?;

        row_to_user(row)
    }

    /// Look up a user by the identity provider's subject identifier.
    pub fn find_by_external_id(&self, external_id: &str) -> Result<Option<User>, ServiceError> {
        let rows = self
            .db
            .query(
                "SELECT data FROM users WHERE external_id = ?1",
                &[Value::Text(external_id.to_string())],
            )
            .map_err(|e| ServiceError::Storage(e.to_string()))?;

        rows.first().map(row_to_user).transpose()
    }

    /// Update a user (full replacement of the data column + indexed columns).
    pub fn update(&self, user: &User) -> Result<(), ServiceError> {
        let data =
            serde_json::to_string(user).map_err(|e| ServiceError::Internal(e.to_string()))?;

        let affected = self
            .db
            .exec(
                "UPDATE users SET data = ?1, email = ?2, role = ?3, active = ?4, updated_at = ?5 \
                 WHERE id = ?6",
                &[
                    Value::Text(data),
                    Value::Text(user.email.clone()),
                    Value::Text(user.role.as_str().to_string()),
                    Value::flag(user.active),
                    Value::Text(user.updated_at.clone()),
                    Value::Text(user.id.clone()),
                ],
            )
            .map_err(|e| ServiceError::Storage(e.to_string()))?;

        if affected == 0 {
            return Err(ServiceError::NotFound(format!("user {}", user.id)));
        }
        Ok(())
    }

    /// List users with pagination, newest first.
    pub fn list(&self, limit: usize, offset: usize) -> Result<(Vec<User>, usize), ServiceError> {
        let count_rows = self
            .db
            .query("SELECT COUNT(*) as cnt FROM users", &[])
            .map_err(|e| ServiceError::Storage(e.to_string()))?;
        let total = count_rows
            .first()
            .and_then(|r| r.get_i64("cnt"))
            .unwrap_or(0) as usize;

        let rows = self
            .db
            .query(
                "SELECT data FROM users ORDER BY created_at DESC LIMIT ?1 OFFSET ?2",
                &[Value::Integer(limit as i64), Value::Integer(offset as i64)],
            )
            .map_err(|e| ServiceError::Storage(e.to_string()))?;

        let items = rows
            .iter()
            .map(row_to_user)
            .collect::<Result<Vec<_>, _>>()?;

        Ok((items, total))
    }
}

/// Deserialize a User from a row's `data` JSON column.
fn row_to_user(row: &Row) -> Result<User, ServiceError> {
    let json = row
        .get_str("data")
        .ok_or_else(|| ServiceError::Storage("missing data column".into()))?;
    serde_json::from_str(json).map_err(|e| ServiceError::Storage(format!("bad user json: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Role;
    use corecrm_core::{new_id, now_rfc3339};
    use corecrm_sql::SqliteStore;

    fn test_store() -> UserStore {
        let db = Arc::new(SqliteStore::open_in_memory().unwrap());
        UserStore::new(db).unwrap()
    }

    fn make_user(external_id: &str, role: Role) -> User {
        let now = now_rfc3339();
        User {
            id: new_id(),
            external_id: external_id.into(),
            email: format!("{external_id}@example.com"),
            name: None,
            role,
            active: true,
            created_at: now.clone(),
            updated_at: now,
        }
    }

    #[test]
    fn create_and_get() {
        let store = test_store();
        let user = make_user("ory-1", Role::Client);
        store.create(&user).unwrap();

        let got = store.get(&user.id).unwrap();
        assert_eq!(got.external_id, "ory-1");
        assert_eq!(got.role, Role::Client);
    }

    #[test]
    fn find_by_external_id() {
        let store = test_store();
        let user = make_user("ory-2", Role::Agent);
        store.create(&user).unwrap();

        let found = store.find_by_external_id("ory-2").unwrap();
        assert_eq!(found.unwrap().id, user.id);
        assert!(store.find_by_external_id("nope").unwrap().is_none());
    }

    #[test]
    fn duplicate_external_id_is_conflict() {
        let store = test_store();
        store.create(&make_user("ory-3", Role::Client)).unwrap();

        let err = store.create(&make_user("ory-3", Role::Client)).unwrap_err();
        assert!(matches!(err, ServiceError::Conflict(_)), "got: {err:?}");
    }

    #[test]
    fn update_role() {
        let store = test_store();
        let mut user = make_user("ory-4", Role::Client);
        store.create(&user).unwrap();

        user.role = Role::Agent;
        store.update(&user).unwrap();
        assert_eq!(store.get(&user.id).unwrap().role, Role::Agent);
    }

    #[test]
    fn list_counts_all() {
        let store = test_store();
        store.create(&make_user("a", Role::Client)).unwrap();
        store.create(&make_user("b", Role::Agent)).unwrap();

        let (items, total) = store.list(10, 0).unwrap();
        assert_eq!(total, 2);
        assert_eq!(items.len(), 2);
    }
}
