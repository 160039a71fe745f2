/// User Store
///
/// User CRUD on top of the credential store: hashes passwords on the way in
/// and bounds every call with the store timeout.

use std::sync::Arc;
use std::time::Duration;

use crate::auth::hash_password;
use crate::domain::{NewUser, User, UserUpdate};
use crate::error::AppError;
use crate::store::{with_timeout, CredentialStore};

#[derive(Clone)]
pub struct UserStore {
    store: Arc<dyn CredentialStore>,
    timeout: Duration,
}

impl UserStore {
    pub fn new(store: Arc<dyn CredentialStore>, timeout: Duration) -> Self {
        Self { store, timeout }
    }

    /// All users, sorted by last name.
    pub async fn get_all(&self) -> Result<Vec<User>, AppError> {
        with_timeout(self.timeout, self.store.list_users()).await
    }

    pub async fn get_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        with_timeout(self.timeout, self.store.find_user_by_email(email)).await
    }

    pub async fn get_one(&self, id: i64) -> Result<Option<User>, AppError> {
        with_timeout(self.timeout, self.store.find_user_by_id(id)).await
    }

    /// Hash `user.password` and insert the user; returns the new id.
    pub async fn insert(&self, user: &NewUser) -> Result<i64, AppError> {
        let password_hash = hash_password(&user.password)?;

        with_timeout(
            self.timeout,
            self.store.insert_user(
                &user.email,
                &user.first_name,
                &user.last_name,
                &password_hash,
            ),
        )
        .await
    }

    pub async fn update(&self, id: i64, changes: &UserUpdate) -> Result<(), AppError> {
        with_timeout(self.timeout, self.store.update_user(id, changes)).await
    }

    pub async fn delete(&self, id: i64) -> Result<(), AppError> {
        with_timeout(self.timeout, self.store.delete_user(id)).await
    }

    /// Rehash `password` and overwrite the stored hash in place.
    pub async fn reset_password(&self, id: i64, password: &str) -> Result<(), AppError> {
        let password_hash = hash_password(password)?;
        with_timeout(self.timeout, self.store.update_password(id, &password_hash)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::verify_password;
    use crate::error::DatabaseError;
    use crate::store::InMemoryCredentialStore;

    fn users() -> UserStore {
        UserStore::new(Arc::new(InMemoryCredentialStore::new()), Duration::from_secs(3))
    }

    fn new_user(email: &str) -> NewUser {
        NewUser {
            email: email.to_string(),
            first_name: "Dmitri".to_string(),
            last_name: "Johnson".to_string(),
            password: "SecurePass123".to_string(),
        }
    }

    #[tokio::test]
    async fn test_insert_hashes_password() {
        let users = users();
        let id = users.insert(&new_user("dmitri@example.com")).await.unwrap();

        let stored = users.get_one(id).await.unwrap().unwrap();
        assert_ne!(stored.password_hash, "SecurePass123");
        assert!(verify_password("SecurePass123", &stored.password_hash).unwrap());
    }

    #[tokio::test]
    async fn test_get_by_email() {
        let users = users();
        let id = users.insert(&new_user("dmitri@example.com")).await.unwrap();

        let found = users.get_by_email("dmitri@example.com").await.unwrap().unwrap();
        assert_eq!(found.id, id);
        assert!(users.get_by_email("nobody@example.com").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_update_changes_profile() {
        let users = users();
        let id = users.insert(&new_user("dmitri@example.com")).await.unwrap();

        users
            .update(
                id,
                &UserUpdate {
                    email: "d.johnson@example.com".to_string(),
                    first_name: "Dmitri".to_string(),
                    last_name: "Johansson".to_string(),
                },
            )
            .await
            .unwrap();

        let stored = users.get_one(id).await.unwrap().unwrap();
        assert_eq!(stored.email, "d.johnson@example.com");
        assert_eq!(stored.last_name, "Johansson");
    }

    #[tokio::test]
    async fn test_reset_password_overwrites_hash() {
        let users = users();
        let id = users.insert(&new_user("dmitri@example.com")).await.unwrap();
        let before = users.get_one(id).await.unwrap().unwrap().password_hash;

        users.reset_password(id, "BrandNewPass456").await.unwrap();

        let after = users.get_one(id).await.unwrap().unwrap().password_hash;
        assert_ne!(before, after);
        assert!(verify_password("BrandNewPass456", &after).unwrap());
        assert!(!verify_password("SecurePass123", &after).unwrap());
    }

    #[tokio::test]
    async fn test_delete_then_missing() {
        let users = users();
        let id = users.insert(&new_user("dmitri@example.com")).await.unwrap();

        users.delete(id).await.unwrap();

        assert!(users.get_one(id).await.unwrap().is_none());
        assert!(matches!(
            users.delete(id).await,
            Err(AppError::Database(DatabaseError::NotFound(_)))
        ));
    }
}
