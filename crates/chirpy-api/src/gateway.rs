use std::sync::{Arc, OnceLock};

use tracing::{debug, error, info};

use chirpy_auth::{TokenKind, TokenService, password};
use chirpy_db::{Store, StoreError};
use chirpy_types::models::User;

use crate::error::GatewayError;

/// Tokens handed out by a successful login.
#[derive(Debug, Clone)]
pub struct Session {
    pub user: User,
    pub access_token: String,
    pub refresh_token: String,
}

/// Answers "who is calling" and performs the session transitions.
///
/// All methods block (file I/O, Argon2); call them from a blocking pool.
pub struct AuthGateway {
    store: Arc<Store>,
    tokens: TokenService,
    decoy_hash: OnceLock<String>,
}

impl AuthGateway {
    pub fn new(store: Arc<Store>, tokens: TokenService) -> Self {
        Self {
            store,
            tokens,
            decoy_hash: OnceLock::new(),
        }
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn tokens(&self) -> &TokenService {
        &self.tokens
    }

    pub fn register(&self, email: &str, password: &str) -> Result<User, GatewayError> {
        let hashed = password::hash(password)?;
        let user = self.store.create_user(email, &hashed)?;
        info!("Registered user {}", user.id);
        Ok(user.to_public())
    }

    pub fn login(&self, email: &str, password: &str) -> Result<Session, GatewayError> {
        let user = match self.store.find_user_by_email(email) {
            Ok(user) => user,
            Err(StoreError::NotFound) => {
                // Spend the same Argon2 time as a real check.
                password::verify(password, self.decoy_hash()?);
                debug!("Login rejected: unknown email");
                return Err(GatewayError::Unauthorized);
            }
            Err(e) => return Err(e.into()),
        };

        if !password::verify(password, &user.password_hash) {
            debug!("Login rejected for user {}: wrong password", user.id);
            return Err(GatewayError::Unauthorized);
        }

        let access_token = self
            .tokens
            .issue_access(user.id)
            .map_err(GatewayError::Signing)?;
        let refresh_token = self
            .tokens
            .issue_refresh(user.id)
            .map_err(GatewayError::Signing)?;

        info!("User {} logged in", user.id);
        Ok(Session {
            user: user.to_public(),
            access_token,
            refresh_token,
        })
    }

    /// Resolve an access token to its user. Refresh tokens, revoked tokens
    /// and tokens for users that no longer resolve are all `Unauthorized`.
    pub fn authenticate(&self, token: &str) -> Result<User, GatewayError> {
        let parsed = self.tokens.parse(token).map_err(|e| {
            debug!("Authentication rejected: {}", e);
            GatewayError::Unauthorized
        })?;

        if parsed.kind != TokenKind::Access {
            debug!("Authentication rejected: {:?} token presented", parsed.kind);
            return Err(GatewayError::Unauthorized);
        }

        self.ensure_not_revoked(token)?;
        self.resolve_subject(parsed.subject_id)
    }

    /// Mint a new access token from a live, unrevoked refresh token. The
    /// refresh token itself is never renewed.
    pub fn refresh(&self, token: &str) -> Result<String, GatewayError> {
        let parsed = self.tokens.parse(token).map_err(|e| {
            debug!("Refresh rejected: {}", e);
            GatewayError::Unauthorized
        })?;

        if parsed.kind != TokenKind::Refresh {
            debug!("Refresh rejected: {:?} token presented", parsed.kind);
            return Err(GatewayError::Unauthorized);
        }

        self.ensure_not_revoked(token)?;
        let user = self.resolve_subject(parsed.subject_id)?;

        self.tokens
            .issue_access(user.id)
            .map_err(GatewayError::Signing)
    }

    /// Permanently retire a token. Only the signature has to check out; an
    /// expired token can still be revoked.
    pub fn revoke(&self, token: &str) -> Result<(), GatewayError> {
        let parsed = self.tokens.verify_signature(token).map_err(|e| {
            debug!("Revocation rejected: {}", e);
            GatewayError::Unauthorized
        })?;

        self.store.revoke_token(token)?;
        info!("Revoked {:?} token of user {}", parsed.kind, parsed.subject_id);
        Ok(())
    }

    /// Change a user's email and password. The password is hashed here,
    /// exactly once, before the store sees it. Other fields are left as
    /// they are at write time.
    pub fn update_credentials(
        &self,
        user_id: u64,
        email: &str,
        password: &str,
    ) -> Result<User, GatewayError> {
        let hashed = password::hash(password)?;

        let user = self.store.modify_user(user_id, |user| {
            user.email = email.to_string();
            user.password_hash = hashed;
        })?;

        info!("Updated credentials of user {}", user.id);
        Ok(user.to_public())
    }

    /// Mark a user as upgraded. Upgrading twice is harmless.
    pub fn upgrade_user(&self, user_id: u64) -> Result<User, GatewayError> {
        let user = self.store.modify_user(user_id, |user| user.upgraded = true)?;
        info!("Upgraded user {}", user.id);
        Ok(user.to_public())
    }

    fn ensure_not_revoked(&self, token: &str) -> Result<(), GatewayError> {
        if self.store.is_token_revoked(token)? {
            debug!("Token rejected: revoked");
            return Err(GatewayError::Unauthorized);
        }
        Ok(())
    }

    fn resolve_subject(&self, user_id: u64) -> Result<User, GatewayError> {
        match self.store.find_user_by_id(user_id) {
            Ok(user) => Ok(user.to_public()),
            Err(StoreError::NotFound) => {
                debug!("Token rejected: user {} does not exist", user_id);
                Err(GatewayError::Unauthorized)
            }
            Err(e) => Err(e.into()),
        }
    }

    fn decoy_hash(&self) -> Result<&str, GatewayError> {
        if let Some(hash) = self.decoy_hash.get() {
            return Ok(hash.as_str());
        }

        let hash = password::hash("decoy-password").inspect_err(|e| {
            error!("Could not prepare the decoy password hash: {}", e);
        })?;
        Ok(self.decoy_hash.get_or_init(|| hash).as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use tempfile::TempDir;

    fn gateway() -> (TempDir, AuthGateway) {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(Store::open(dir.path().join("database.json")).unwrap());
        let gateway = AuthGateway::new(store, TokenService::new(b"gateway-test-secret"));
        (dir, gateway)
    }

    #[test]
    fn register_and_login_scenario() {
        let (_dir, gw) = gateway();

        let a = gw.register("a@x.com", "pw1").unwrap();
        let b = gw.register("b@x.com", "pw2").unwrap();
        assert_eq!(a.id, 1);
        assert_eq!(b.id, 2);
        assert!(!a.upgraded);

        let session = gw.login("a@x.com", "pw1").unwrap();
        assert_eq!(session.user, a);
        assert_eq!(gw.authenticate(&session.access_token).unwrap().id, 1);

        assert!(matches!(
            gw.login("a@x.com", "wrongpw"),
            Err(GatewayError::Unauthorized)
        ));
    }

    #[test]
    fn unknown_email_and_wrong_password_look_the_same() {
        let (_dir, gw) = gateway();
        gw.register("a@x.com", "pw1").unwrap();

        let unknown = gw.login("nobody@x.com", "pw1").unwrap_err();
        let wrong = gw.login("a@x.com", "nope").unwrap_err();
        assert_eq!(unknown.to_string(), wrong.to_string());
        assert_eq!(unknown.status(), wrong.status());
    }

    #[test]
    fn duplicate_registration_is_already_exists() {
        let (_dir, gw) = gateway();
        gw.register("a@x.com", "pw1").unwrap();
        assert!(matches!(
            gw.register("a@x.com", "pw2"),
            Err(GatewayError::AlreadyExists)
        ));
    }

    #[test]
    fn password_hash_is_never_the_plaintext() {
        let (_dir, gw) = gateway();
        gw.register("a@x.com", "hunter2").unwrap();
        let stored = gw.store().find_user_by_id(1).unwrap();
        assert_ne!(stored.password_hash, "hunter2");
        assert!(password::verify("hunter2", &stored.password_hash));
    }

    #[test]
    fn refresh_token_cannot_authenticate() {
        let (_dir, gw) = gateway();
        gw.register("a@x.com", "pw").unwrap();
        let session = gw.login("a@x.com", "pw").unwrap();

        assert!(matches!(
            gw.authenticate(&session.refresh_token),
            Err(GatewayError::Unauthorized)
        ));
    }

    #[test]
    fn access_token_cannot_refresh() {
        let (_dir, gw) = gateway();
        gw.register("a@x.com", "pw").unwrap();
        let session = gw.login("a@x.com", "pw").unwrap();

        assert!(matches!(
            gw.refresh(&session.access_token),
            Err(GatewayError::Unauthorized)
        ));
    }

    #[test]
    fn refresh_mints_an_access_token_for_the_same_user() {
        let (_dir, gw) = gateway();
        gw.register("a@x.com", "pw").unwrap();
        gw.register("b@x.com", "pw").unwrap();
        let session = gw.login("b@x.com", "pw").unwrap();

        let access = gw.refresh(&session.refresh_token).unwrap();
        assert!(gw.tokens().is_access_token(&access));
        assert_eq!(gw.authenticate(&access).unwrap().id, 2);
    }

    #[test]
    fn revoked_refresh_token_cannot_refresh() {
        let (_dir, gw) = gateway();
        gw.register("a@x.com", "pw").unwrap();
        let session = gw.login("a@x.com", "pw").unwrap();

        gw.revoke(&session.refresh_token).unwrap();
        assert!(gw.tokens().parse(&session.refresh_token).is_ok());
        assert!(matches!(
            gw.refresh(&session.refresh_token),
            Err(GatewayError::Unauthorized)
        ));
    }

    #[test]
    fn revoked_access_token_cannot_authenticate() {
        let (_dir, gw) = gateway();
        gw.register("a@x.com", "pw").unwrap();
        let session = gw.login("a@x.com", "pw").unwrap();

        gw.revoke(&session.access_token).unwrap();
        assert!(matches!(
            gw.authenticate(&session.access_token),
            Err(GatewayError::Unauthorized)
        ));
    }

    #[test]
    fn revoke_requires_a_genuine_signature() {
        let (_dir, gw) = gateway();
        let foreign = TokenService::new(b"other").issue_refresh(1).unwrap();

        assert!(matches!(gw.revoke(&foreign), Err(GatewayError::Unauthorized)));
        assert!(matches!(gw.revoke("garbage"), Err(GatewayError::Unauthorized)));
        assert!(!gw.store().is_token_revoked(&foreign).unwrap());
    }

    #[test]
    fn expired_refresh_token_can_still_be_revoked() {
        let (_dir, gw) = gateway();
        gw.register("a@x.com", "pw").unwrap();
        let issued_at = Utc::now() - Duration::days(5);
        let expired = gw.tokens().issue_at(TokenKind::Refresh, 1, issued_at).unwrap();

        assert!(matches!(gw.refresh(&expired), Err(GatewayError::Unauthorized)));
        gw.revoke(&expired).unwrap();
        assert!(gw.store().is_token_revoked(&expired).unwrap());
        assert!(matches!(gw.refresh(&expired), Err(GatewayError::Unauthorized)));
    }

    #[test]
    fn unknown_email_login_checks_against_a_real_hash() {
        let (_dir, gw) = gateway();
        assert!(gw.decoy_hash.get().is_none());

        assert!(matches!(
            gw.login("nobody@x.com", "pw"),
            Err(GatewayError::Unauthorized)
        ));
        let decoy = gw.decoy_hash.get().unwrap();
        assert!(decoy.starts_with("$argon2id$"));
        assert!(password::verify("decoy-password", decoy));
    }

    #[test]
    fn token_for_missing_user_is_unauthorized() {
        let (_dir, gw) = gateway();
        let access = gw.tokens().issue_access(99).unwrap();
        let refresh = gw.tokens().issue_refresh(99).unwrap();

        assert!(matches!(gw.authenticate(&access), Err(GatewayError::Unauthorized)));
        assert!(matches!(gw.refresh(&refresh), Err(GatewayError::Unauthorized)));
    }

    #[test]
    fn update_credentials_rehashes_once() {
        let (_dir, gw) = gateway();
        gw.register("a@x.com", "old").unwrap();

        let updated = gw.update_credentials(1, "new@x.com", "fresh").unwrap();
        assert_eq!(updated.email, "new@x.com");

        assert!(gw.login("new@x.com", "fresh").is_ok());
        assert!(matches!(gw.login("new@x.com", "old"), Err(GatewayError::Unauthorized)));
        assert!(matches!(gw.login("a@x.com", "old"), Err(GatewayError::Unauthorized)));
    }

    #[test]
    fn upgrade_user_is_idempotent() {
        let (_dir, gw) = gateway();
        gw.register("a@x.com", "pw").unwrap();

        assert!(gw.upgrade_user(1).unwrap().upgraded);
        assert!(gw.upgrade_user(1).unwrap().upgraded);
        assert!(gw.store().find_user_by_id(1).unwrap().upgraded);
        assert!(matches!(gw.upgrade_user(5), Err(GatewayError::NotFound)));
    }

    #[test]
    fn upgrade_keeps_the_password_hash() {
        let (_dir, gw) = gateway();
        gw.register("a@x.com", "pw").unwrap();
        let before = gw.store().find_user_by_id(1).unwrap().password_hash;

        gw.upgrade_user(1).unwrap();
        assert_eq!(gw.store().find_user_by_id(1).unwrap().password_hash, before);
        assert!(gw.login("a@x.com", "pw").unwrap().user.upgraded);
    }

    #[test]
    fn concurrent_upgrade_and_credential_change_both_land() {
        const USERS: u64 = 8;
        let (_dir, gw) = gateway();
        for i in 1..=USERS {
            gw.register(&format!("u{i}@x.com"), "old").unwrap();
        }

        std::thread::scope(|s| {
            for id in 1..=USERS {
                let gw = &gw;
                s.spawn(move || {
                    let email = format!("n{id}@x.com");
                    gw.update_credentials(id, &email, "new").unwrap()
                });
                s.spawn(move || gw.upgrade_user(id).unwrap());
            }
        });

        for id in 1..=USERS {
            let stored = gw.store().find_user_by_id(id).unwrap();
            assert!(stored.upgraded, "user {id} lost its upgrade");
            assert_eq!(stored.email, format!("n{id}@x.com"));
            assert!(password::verify("new", &stored.password_hash));
        }
    }
}
