use chrono::Utc;
use tracing::debug;

use chirpy_types::models::Chirp;

use crate::error::{Result, StoreError};
use crate::models::{UserRecord, next_id, next_id_after};
use crate::Store;

impl Store {
    // -- Users --

    /// Insert a new user. Email uniqueness is an exact, case-sensitive match.
    /// The caller hashes the password; the store never sees plaintext.
    pub fn create_user(&self, email: &str, password_hash: &str) -> Result<UserRecord> {
        self.with_doc_mut(|doc| {
            if doc.users.values().any(|u| u.email == email) {
                return Err(StoreError::AlreadyExists);
            }

            let user = UserRecord {
                id: next_id(&doc.users),
                email: email.to_string(),
                password_hash: password_hash.to_string(),
                upgraded: false,
            };
            doc.users.insert(user.id, user.clone());
            debug!("Created user {}", user.id);
            Ok(user)
        })
    }

    pub fn find_user_by_email(&self, email: &str) -> Result<UserRecord> {
        self.with_doc(|doc| {
            doc.users
                .values()
                .find(|u| u.email == email)
                .cloned()
                .ok_or(StoreError::NotFound)
        })
    }

    pub fn find_user_by_id(&self, id: u64) -> Result<UserRecord> {
        self.with_doc(|doc| doc.users.get(&id).cloned().ok_or(StoreError::NotFound))
    }

    /// Replace the stored record with the same id. Fails with `NotFound` for
    /// an unknown id and `AlreadyExists` if the email belongs to someone else.
    pub fn update_user(&self, user: &UserRecord) -> Result<()> {
        self.modify_user(user.id, |stored| *stored = user.clone()).map(|_| ())
    }

    /// Change one user in place. The lookup, the edit and the write back all
    /// happen under a single lock hold, so concurrent edits to different
    /// fields of the same user never overwrite each other.
    ///
    /// Fails with `NotFound` for an unknown id and `AlreadyExists` if the
    /// edited email belongs to someone else. Nothing is written on failure.
    pub fn modify_user<F>(&self, id: u64, f: F) -> Result<UserRecord>
    where
        F: FnOnce(&mut UserRecord),
    {
        self.with_doc_mut(|doc| {
            let mut user = doc.users.get(&id).cloned().ok_or(StoreError::NotFound)?;
            f(&mut user);
            user.id = id;

            if doc.users.values().any(|u| u.id != id && u.email == user.email) {
                return Err(StoreError::AlreadyExists);
            }

            doc.users.insert(id, user.clone());
            debug!("Updated user {}", id);
            Ok(user)
        })
    }

    // -- Chirps --

    /// Insert a chirp as given. Length limits and moderation happen before
    /// this call.
    pub fn create_chirp(&self, body: &str, author_id: u64) -> Result<Chirp> {
        self.with_doc_mut(|doc| {
            let chirp = Chirp {
                id: next_id_after(&doc.chirps, &mut doc.last_chirp_id),
                body: body.to_string(),
                author_id,
            };
            doc.chirps.insert(chirp.id, chirp.clone());
            debug!("Created chirp {} by user {}", chirp.id, author_id);
            Ok(chirp)
        })
    }

    pub fn get_chirp(&self, id: u64) -> Result<Chirp> {
        self.with_doc(|doc| doc.chirps.get(&id).cloned().ok_or(StoreError::NotFound))
    }

    /// All chirps in ascending id order.
    pub fn list_chirps(&self) -> Result<Vec<Chirp>> {
        self.with_doc(|doc| Ok(doc.chirps.values().cloned().collect()))
    }

    pub fn list_chirps_by_author(&self, author_id: u64) -> Result<Vec<Chirp>> {
        self.with_doc(|doc| {
            Ok(doc
                .chirps
                .values()
                .filter(|c| c.author_id == author_id)
                .cloned()
                .collect())
        })
    }

    /// Remove a chirp. Deleting an absent id succeeds and changes nothing.
    pub fn delete_chirp(&self, id: u64) -> Result<()> {
        self.with_doc_mut(|doc| {
            if doc.chirps.remove(&id).is_some() {
                debug!("Deleted chirp {}", id);
            }
            Ok(())
        })
    }

    // -- Revocations --

    /// Record a token string as permanently invalid. Revoking again only
    /// refreshes the timestamp.
    pub fn revoke_token(&self, token: &str) -> Result<()> {
        let now = Utc::now().timestamp_millis();
        self.with_doc_mut(|doc| {
            doc.revoked.insert(token.to_string(), now);
            Ok(())
        })
    }

    pub fn is_token_revoked(&self, token: &str) -> Result<bool> {
        self.with_doc(|doc| Ok(doc.revoked.contains_key(token)))
    }
}
