//! Sessions
//!
//! Owns the sign in state: exchanging credentials, persisting the
//! resulting session, and telling the connector and the shop manager
//! about changes. The stored session is a cache of the last confirmed
//! login; the server stays the authority on whether the token is still
//! good.

use std::sync::Arc;

use shopkit_common::database::{self, ClientStorage};
use shopkit_common::parking_lot::RwLock;
use shopkit_common::{LoginRequest, Session, SignupRequest, User};
use tracing::instrument;

use crate::client::ApiConnector;
use crate::shop::ShopManager;
use crate::Error;

/// Sign in state and credential persistence
///
/// Cheap to clone; clones share state.
#[derive(Debug, Clone)]
pub struct SessionManager {
    localstore: Arc<dyn ClientStorage<Err = database::Error> + Send + Sync>,
    client: Arc<dyn ApiConnector + Send + Sync>,
    shop: ShopManager,
    session: Arc<RwLock<Option<Session>>>,
}

impl SessionManager {
    /// Create a manager over a storage backend and connector
    pub fn new(
        localstore: Arc<dyn ClientStorage<Err = database::Error> + Send + Sync>,
        client: Arc<dyn ApiConnector + Send + Sync>,
        shop: ShopManager,
    ) -> Self {
        Self {
            localstore,
            client,
            shop,
            session: Arc::new(RwLock::new(None)),
        }
    }

    /// Rehydrate the persisted session, if one exists.
    ///
    /// An unreadable stored session is logged and the engine starts
    /// signed out; it never fails startup.
    pub async fn load(&self) {
        match self.localstore.load_session().await {
            Ok(Some(session)) => {
                tracing::debug!("Restored session for user {}", session.user.id);
                *self.session.write() = Some(session.clone());
                self.client.set_session(Some(session)).await;
                self.shop.handle_auth(true);
            }
            Ok(None) => {}
            Err(err) => {
                tracing::warn!("Stored session could not be read, starting signed out: {err}");
            }
        }
    }

    /// Exchange credentials for a session
    #[instrument(skip_all)]
    pub async fn login(&self, email: &str, password: &str) -> Result<User, Error> {
        let request = LoginRequest {
            email: email.to_string(),
            password: password.to_string(),
        };
        let response = self.client.login(request).await?;
        let session = response.into_session();
        tracing::info!("User {} signed in", session.user.id);
        self.install(session.clone()).await;
        Ok(session.user)
    }

    /// Register a new account and sign it in
    #[instrument(skip_all)]
    pub async fn signup(&self, request: SignupRequest) -> Result<User, Error> {
        let email = request.email.clone();
        let password = request.password.clone();
        self.client.signup(request).await?;
        self.login(&email, &password).await
    }

    /// Sign out: forget the session everywhere and drop shop state
    #[instrument(skip_all)]
    pub async fn logout(&self) {
        if let Err(err) = self.localstore.clear_session().await {
            tracing::warn!("Failed to clear stored session: {err}");
        }
        *self.session.write() = None;
        self.client.set_session(None).await;
        self.shop.handle_auth(false);
    }

    /// The active session, if signed in
    pub fn current_session(&self) -> Option<Session> {
        self.session.read().clone()
    }

    /// The signed in user, if any
    pub fn current_user(&self) -> Option<User> {
        self.session.read().as_ref().map(|s| s.user.clone())
    }

    /// Whether a user is signed in
    pub fn is_authenticated(&self) -> bool {
        self.session.read().is_some()
    }

    /// Whether the signed in user carries the given role
    pub fn has_role(&self, role: &str) -> bool {
        self.session
            .read()
            .as_ref()
            .is_some_and(|s| s.user.has_role(role))
    }

    async fn install(&self, session: Session) {
        if let Err(err) = self.localstore.save_session(&session).await {
            tracing::warn!("Failed to persist session: {err}");
        }
        let previous = self.session.write().replace(session.clone());
        // Signing straight into a different account must not keep the
        // previous account's shop
        if previous.is_some_and(|p| p.user.id != session.user.id) {
            self.shop.teardown();
        }
        self.client.set_session(Some(session)).await;
        self.shop.handle_auth(true);
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use shopkit_common::database::MemoryStorage;

    use super::*;
    use crate::shop::DEFAULT_DEBOUNCE;
    use crate::sync::ResourceValue;
    use crate::test_utils::{
        no_shop_marker, test_auth_response, test_session, BrokenStorage, MockApiConnector,
        RecordedCall,
    };

    struct Harness {
        storage: Arc<MemoryStorage>,
        client: Arc<MockApiConnector>,
        shop: ShopManager,
        sessions: SessionManager,
    }

    fn harness() -> Harness {
        let storage = Arc::new(MemoryStorage::new());
        let client = Arc::new(MockApiConnector::new());
        let shop = ShopManager::new(client.clone(), DEFAULT_DEBOUNCE);
        let sessions = SessionManager::new(storage.clone(), client.clone(), shop.clone());
        Harness {
            storage,
            client,
            shop,
            sessions,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn login_persists_and_schedules_the_shop_fetch() {
        let h = harness();
        h.client.push_login(Ok(test_auth_response()));
        h.client.push_my_shop(Ok(no_shop_marker()));

        let user = h.sessions.login("ada@example.com", "hunter2").await.unwrap();
        assert_eq!(user.id, 40);
        assert!(h.sessions.is_authenticated());
        assert!(h.sessions.has_role("ROLE_SELLER"));
        assert_eq!(h.storage.load_session().await.unwrap(), Some(test_session()));
        assert_eq!(h.client.get_session().await, Some(test_session()));

        // The shop fetch runs only after the quiet window
        assert_eq!(h.client.call_count(|c| *c == RecordedCall::GetMyShop), 0);
        tokio::time::sleep(Duration::from_millis(350)).await;
        assert_eq!(h.client.call_count(|c| *c == RecordedCall::GetMyShop), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn logout_inside_the_window_cancels_the_fetch() {
        let h = harness();
        h.client.push_login(Ok(test_auth_response()));

        h.sessions.login("ada@example.com", "hunter2").await.unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;
        h.sessions.logout().await;
        tokio::time::sleep(Duration::from_millis(500)).await;

        assert_eq!(h.client.call_count(|c| *c == RecordedCall::GetMyShop), 0);
        assert!(!h.sessions.is_authenticated());
        assert_eq!(h.storage.load_session().await.unwrap(), None);
        assert_eq!(h.client.get_session().await, None);
        assert_eq!(h.shop.shop_state().value, ResourceValue::Unfetched);
    }

    #[tokio::test(start_paused = true)]
    async fn a_persisted_session_is_rehydrated_on_load() {
        let h = harness();
        h.storage.save_session(&test_session()).await.unwrap();
        h.client.push_my_shop(Ok(no_shop_marker()));

        h.sessions.load().await;
        assert_eq!(h.sessions.current_user().map(|u| u.id), Some(40));
        assert_eq!(h.client.get_session().await, Some(test_session()));

        tokio::time::sleep(Duration::from_millis(350)).await;
        assert_eq!(h.client.call_count(|c| *c == RecordedCall::GetMyShop), 1);
    }

    #[tokio::test]
    async fn an_unreadable_session_starts_signed_out() {
        let client = Arc::new(MockApiConnector::new());
        let shop = ShopManager::new(client.clone(), DEFAULT_DEBOUNCE);
        let sessions = SessionManager::new(Arc::new(BrokenStorage), client.clone(), shop);

        sessions.load().await;
        assert!(!sessions.is_authenticated());
        assert_eq!(client.get_session().await, None);
    }

    #[tokio::test(start_paused = true)]
    async fn signup_signs_the_new_account_in() {
        let h = harness();
        h.client.push_signup(Ok(()));
        h.client.push_login(Ok(test_auth_response()));
        h.client.push_my_shop(Ok(no_shop_marker()));

        let request = SignupRequest {
            first_name: "Ada".to_string(),
            last_name: "Fox".to_string(),
            email: "ada@example.com".to_string(),
            password: "hunter2".to_string(),
        };
        let user = h.sessions.signup(request).await.unwrap();
        assert_eq!(user.email, "ada@example.com");
        assert!(h.sessions.is_authenticated());

        let calls = h.client.calls();
        assert_eq!(
            calls,
            vec![
                RecordedCall::Signup("ada@example.com".to_string()),
                RecordedCall::Login("ada@example.com".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn failed_login_changes_nothing() {
        let h = harness();
        h.client
            .push_login(Err(Error::Unauthorized("bad credentials".to_string())));

        let result = h.sessions.login("ada@example.com", "wrong").await;
        assert!(matches!(result, Err(Error::Unauthorized(_))));
        assert!(!h.sessions.is_authenticated());
        assert_eq!(h.storage.load_session().await.unwrap(), None);
        assert_eq!(h.client.get_session().await, None);
    }
}
