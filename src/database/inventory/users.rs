//! User repository
//!
//! Data access operations for the `users` table.

use rusqlite::{params, Connection, Row};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{normalize_optional, require_non_empty};
use crate::database::error::{storage_error, InventoryResult};

/// A stored user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
}

/// Editable user fields, written together on create and update
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserFields {
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
}

impl UserFields {
    pub fn new(name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            email: email.into(),
            phone: None,
        }
    }

    pub fn with_phone(mut self, phone: impl Into<String>) -> Self {
        self.phone = Some(phone.into());
        self
    }

    fn validate(&self) -> InventoryResult<()> {
        require_non_empty("name", &self.name)?;
        require_non_empty("email", &self.email)
    }
}

/// Repository for user operations
pub struct UserRepository<'a> {
    conn: &'a Connection,
}

impl<'a> UserRepository<'a> {
    /// Create a new user repository
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Insert a user and return its generated id
    pub fn create(&self, fields: &UserFields) -> InventoryResult<i64> {
        fields.validate()?;

        self.conn
            .execute(
                "INSERT INTO users (name, email, phone) VALUES (?1, ?2, ?3)",
                params![
                    fields.name,
                    fields.email,
                    normalize_optional(fields.phone.as_deref())
                ],
            )
            .map_err(|e| storage_error("create user", e))?;

        let id = self.conn.last_insert_rowid();
        debug!("Created user {}", id);
        Ok(id)
    }

    /// Overwrite every editable field of a user
    ///
    /// Returns `false` when no user has the given id.
    pub fn update(&self, id: i64, fields: &UserFields) -> InventoryResult<bool> {
        fields.validate()?;

        let changed = self
            .conn
            .execute(
                "UPDATE users SET name = ?1, email = ?2, phone = ?3 WHERE id = ?4",
                params![
                    fields.name,
                    fields.email,
                    normalize_optional(fields.phone.as_deref()),
                    id
                ],
            )
            .map_err(|e| storage_error("update user", e))?;

        debug!("Updated user {} ({} rows)", id, changed);
        Ok(changed > 0)
    }

    /// Delete a user
    ///
    /// Devices owned by the user keep existing with their owner cleared; the
    /// foreign key does this as part of the same statement.
    pub fn delete(&self, id: i64) -> InventoryResult<bool> {
        let changed = self
            .conn
            .execute("DELETE FROM users WHERE id = ?1", [id])
            .map_err(|e| storage_error("delete user", e))?;

        debug!("Deleted user {} ({} rows)", id, changed);
        Ok(changed > 0)
    }

    /// Look up a single user
    pub fn get(&self, id: i64) -> InventoryResult<Option<User>> {
        let result = self.conn.query_row(
            "SELECT id, name, email, phone FROM users WHERE id = ?1",
            [id],
            row_to_user,
        );

        match result {
            Ok(user) => Ok(Some(user)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(storage_error("get user", e)),
        }
    }

    /// All users sorted by name
    pub fn list(&self) -> InventoryResult<Vec<User>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, name, email, phone FROM users ORDER BY name, id")
            .map_err(|e| storage_error("list users", e))?;

        let users = stmt
            .query_map([], row_to_user)
            .and_then(|rows| rows.collect::<rusqlite::Result<Vec<_>>>())
            .map_err(|e| storage_error("list users", e))?;
        Ok(users)
    }

    /// Get the count of users
    pub fn count(&self) -> InventoryResult<u64> {
        self.conn
            .query_row("SELECT COUNT(*) FROM users", [], |row| row.get(0))
            .map_err(|e| storage_error("count users", e))
    }
}

fn row_to_user(row: &Row) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        name: row.get(1)?,
        email: row.get(2)?,
        phone: row.get(3)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::error::InventoryError;
    use crate::database::inventory::InventoryDatabase;

    fn setup_test_db() -> InventoryDatabase {
        InventoryDatabase::open_in_memory().unwrap()
    }

    #[test]
    fn test_create_and_get_round_trip() {
        let db = setup_test_db();
        let repo = db.users();

        let id = repo
            .create(&UserFields::new("Ana", "a@b.com").with_phone("555"))
            .unwrap();

        let user = repo.get(id).unwrap().unwrap();
        assert_eq!(
            user,
            User {
                id,
                name: "Ana".to_string(),
                email: "a@b.com".to_string(),
                phone: Some("555".to_string()),
            }
        );
    }

    #[test]
    fn test_create_rejects_empty_fields() {
        let db = setup_test_db();
        let repo = db.users();

        let err = repo.create(&UserFields::new("", "a@b.com")).unwrap_err();
        assert!(matches!(err, InventoryError::Validation { field: "name" }));

        let err = repo.create(&UserFields::new("Ana", "   ")).unwrap_err();
        assert!(matches!(err, InventoryError::Validation { field: "email" }));

        assert_eq!(repo.count().unwrap(), 0);
    }

    #[test]
    fn test_blank_phone_stored_as_absent() {
        let db = setup_test_db();
        let repo = db.users();

        let id = repo
            .create(&UserFields::new("Ana", "a@b.com").with_phone("  "))
            .unwrap();
        assert_eq!(repo.get(id).unwrap().unwrap().phone, None);
    }

    #[test]
    fn test_update_overwrites_all_fields() {
        let db = setup_test_db();
        let repo = db.users();

        let id = repo
            .create(&UserFields::new("Ana", "a@b.com").with_phone("555"))
            .unwrap();

        assert!(repo
            .update(id, &UserFields::new("Ana Maria", "am@b.com"))
            .unwrap());

        let user = repo.get(id).unwrap().unwrap();
        assert_eq!(user.name, "Ana Maria");
        assert_eq!(user.email, "am@b.com");
        assert_eq!(user.phone, None);
    }

    #[test]
    fn test_update_validation_leaves_row_unchanged() {
        let db = setup_test_db();
        let repo = db.users();

        let id = repo.create(&UserFields::new("Ana", "a@b.com")).unwrap();
        let err = repo.update(id, &UserFields::new("Ana", "")).unwrap_err();
        assert!(matches!(err, InventoryError::Validation { field: "email" }));

        assert_eq!(repo.get(id).unwrap().unwrap().email, "a@b.com");
    }

    #[test]
    fn test_missing_user_is_soft_not_found() {
        let db = setup_test_db();
        let repo = db.users();

        assert_eq!(repo.get(99).unwrap(), None);
        assert!(!repo.update(99, &UserFields::new("Ana", "a@b.com")).unwrap());
        assert!(!repo.delete(99).unwrap());
    }

    #[test]
    fn test_list_sorted_by_name() {
        let db = setup_test_db();
        let repo = db.users();

        repo.create(&UserFields::new("Carla", "c@x.com")).unwrap();
        repo.create(&UserFields::new("Ana", "a@x.com")).unwrap();
        repo.create(&UserFields::new("Bruno", "b@x.com")).unwrap();

        let names: Vec<String> = repo.list().unwrap().into_iter().map(|u| u.name).collect();
        assert_eq!(names, vec!["Ana", "Bruno", "Carla"]);
    }

    #[test]
    fn test_delete() {
        let db = setup_test_db();
        let repo = db.users();

        let id = repo.create(&UserFields::new("Ana", "a@b.com")).unwrap();
        assert!(repo.delete(id).unwrap());
        assert_eq!(repo.get(id).unwrap(), None);
        assert_eq!(repo.count().unwrap(), 0);
    }
}
