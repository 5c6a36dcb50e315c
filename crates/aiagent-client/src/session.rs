//! Client-side authentication state.
//!
//! [`SessionStore`] owns the current token and resolved profile and is the
//! only writer of both. It is cheap to clone; clones share state.
//!
//! Every mutating action captures the session generation when it starts.
//! `logout` bumps the generation, so a login or profile fetch that was in
//! flight when the user signed out is discarded instead of resurrecting the
//! session.
//!
//! The HTTP client clears the token store when a request comes back 401.
//! Every read reconciles against the store first, so a session whose token
//! vanished that way reads as signed out.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::RwLock;

use crate::api::auth::{Credentials, LOGIN_FAILED, LoginResponse, REGISTER_FAILED};
use crate::api::user::{PROFILE_FAILED, UserProfile};
use crate::error::{ClientError, ClientResult};
use crate::http::ApiClient;
use crate::token_store::{StoredUserInfo, TokenStore};

pub const GUEST_NAME: &str = "Guest";

#[async_trait]
pub trait AuthBackend: Send + Sync {
    async fn login(&self, credentials: &Credentials) -> ClientResult<LoginResponse>;
    async fn register(&self, credentials: &Credentials) -> ClientResult<UserProfile>;
    /// Resolves the profile for the token currently held in the token store.
    async fn fetch_profile(&self) -> ClientResult<UserProfile>;
}

#[async_trait]
impl AuthBackend for ApiClient {
    async fn login(&self, credentials: &Credentials) -> ClientResult<LoginResponse> {
        ApiClient::login(self, credentials).await
    }

    async fn register(&self, credentials: &Credentials) -> ClientResult<UserProfile> {
        ApiClient::register(self, credentials).await
    }

    async fn fetch_profile(&self) -> ClientResult<UserProfile> {
        self.profile().await
    }
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("{message}")]
    Failed {
        message: String,
        #[source]
        source: ClientError,
    },
    #[error("signed out before the action completed")]
    Superseded,
}

impl SessionError {
    fn from_client(source: ClientError, default_message: &str) -> Self {
        let message = source.user_message();
        let message = if message.trim().is_empty() {
            default_message.to_string()
        } else {
            message.trim().to_string()
        };
        Self::Failed { message, source }
    }

    #[must_use]
    pub fn client_error(&self) -> Option<&ClientError> {
        match self {
            Self::Failed { source, .. } => Some(source),
            Self::Superseded => None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    pub token: Option<String>,
    pub user: Option<UserProfile>,
    pub is_authenticated: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Anonymous,
    AuthenticatedUnresolved,
    AuthenticatedResolved,
}

impl Session {
    #[must_use]
    pub fn state(&self) -> SessionState {
        match (self.is_authenticated && self.token.is_some(), self.user.is_some()) {
            (false, _) => SessionState::Anonymous,
            (true, false) => SessionState::AuthenticatedUnresolved,
            (true, true) => SessionState::AuthenticatedResolved,
        }
    }
}

struct SessionInner {
    backend: Arc<dyn AuthBackend>,
    tokens: TokenStore,
    session: RwLock<Session>,
    generation: AtomicU64,
}

#[derive(Clone)]
pub struct SessionStore {
    inner: Arc<SessionInner>,
}

impl std::fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionStore")
            .field("generation", &self.generation())
            .finish_non_exhaustive()
    }
}

impl SessionStore {
    /// `tokens` must be the store the backend reads its bearer token from.
    #[must_use]
    pub fn new(backend: Arc<dyn AuthBackend>, tokens: TokenStore) -> Self {
        Self {
            inner: Arc::new(SessionInner {
                backend,
                tokens,
                session: RwLock::new(Session::default()),
                generation: AtomicU64::new(0),
            }),
        }
    }

    #[must_use]
    pub fn for_client(client: ApiClient) -> Self {
        let tokens = client.tokens().clone();
        Self::new(Arc::new(client), tokens)
    }

    #[must_use]
    pub fn tokens(&self) -> &TokenStore {
        &self.inner.tokens
    }

    fn generation(&self) -> u64 {
        self.inner.generation.load(Ordering::SeqCst)
    }

    /// Signs out when the token store no longer holds the session's token.
    async fn reconcile(&self) {
        {
            let session = self.inner.session.read().await;
            if !session.is_authenticated || self.holds_session_token(&session) {
                return;
            }
        }
        let mut session = self.inner.session.write().await;
        if session.is_authenticated && !self.holds_session_token(&session) {
            tracing::info!(
                target: "aiagent.session",
                "stored credentials were cleared; signing out",
            );
            self.reset(&mut session);
        }
    }

    fn holds_session_token(&self, session: &Session) -> bool {
        session.token.is_some() && self.inner.tokens.token() == session.token
    }

    pub async fn snapshot(&self) -> Session {
        self.reconcile().await;
        self.inner.session.read().await.clone()
    }

    pub async fn state(&self) -> SessionState {
        self.reconcile().await;
        self.inner.session.read().await.state()
    }

    pub async fn is_admin(&self) -> bool {
        self.reconcile().await;
        self.inner
            .session
            .read()
            .await
            .user
            .as_ref()
            .is_some_and(UserProfile::is_admin)
    }

    pub async fn user_name(&self) -> String {
        self.reconcile().await;
        self.inner
            .session
            .read()
            .await
            .user
            .as_ref()
            .map_or_else(|| GUEST_NAME.to_string(), |user| user.username.clone())
    }

    pub async fn user_role(&self) -> String {
        self.reconcile().await;
        self.inner
            .session
            .read()
            .await
            .user
            .as_ref()
            .map(|user| user.role.clone())
            .unwrap_or_default()
    }

    /// Exchanges credentials for a token, then resolves the profile.
    pub async fn login(&self, username: &str, password: &str) -> Result<Session, SessionError> {
        let generation = self.generation();
        let credentials = Credentials::new(username, password);

        let response = self
            .inner
            .backend
            .login(&credentials)
            .await
            .map_err(|error| {
                tracing::info!(
                    target: "aiagent.session",
                    username,
                    error = %error,
                    "login rejected",
                );
                SessionError::from_client(error, LOGIN_FAILED)
            })?;

        {
            let mut session = self.inner.session.write().await;
            if self.generation() != generation {
                tracing::info!(
                    target: "aiagent.session",
                    username,
                    "discarding login result after sign-out",
                );
                return Err(SessionError::Superseded);
            }
            self.inner
                .tokens
                .set_token(&response.token)
                .map_err(|error| SessionError::from_client(error, LOGIN_FAILED))?;
            session.token = Some(response.token);
            session.user = None;
            session.is_authenticated = true;
        }
        tracing::info!(target: "aiagent.session", username, "login accepted");

        self.resolve_profile(generation).await?;
        Ok(self.snapshot().await)
    }

    /// Creates the account, then signs in with the same credentials.
    pub async fn register(&self, username: &str, password: &str) -> Result<Session, SessionError> {
        let credentials = Credentials::new(username, password);
        let created = self
            .inner
            .backend
            .register(&credentials)
            .await
            .map_err(|error| SessionError::from_client(error, REGISTER_FAILED))?;
        tracing::info!(
            target: "aiagent.session",
            username = %created.username,
            "account registered",
        );
        self.login(username, password).await
    }

    /// Resolves the profile for the current token. Any failure signs out.
    pub async fn fetch_profile(&self) -> Result<UserProfile, SessionError> {
        self.resolve_profile(self.generation()).await
    }

    async fn resolve_profile(&self, generation: u64) -> Result<UserProfile, SessionError> {
        let profile = match self.inner.backend.fetch_profile().await {
            Ok(profile) => profile,
            Err(_) if self.generation() != generation => {
                return Err(SessionError::Superseded);
            }
            Err(error) => {
                tracing::warn!(
                    target: "aiagent.session",
                    error = %error,
                    "profile lookup failed; signing out",
                );
                self.logout().await;
                return Err(SessionError::from_client(error, PROFILE_FAILED));
            }
        };

        let mut session = self.inner.session.write().await;
        if self.generation() != generation
            || !session.is_authenticated
            || !self.holds_session_token(&session)
        {
            return Err(SessionError::Superseded);
        }
        let stored = StoredUserInfo {
            user_id: profile.id,
            username: profile.username.clone(),
            role: profile.role.clone(),
        };
        if let Err(error) = self.inner.tokens.set_user_info(&stored) {
            tracing::warn!(
                target: "aiagent.session",
                error = %error,
                "failed to persist user info",
            );
        }
        session.user = Some(profile.clone());
        tracing::debug!(
            target: "aiagent.session",
            username = %profile.username,
            role = %profile.role,
            "profile resolved",
        );
        Ok(profile)
    }

    /// Always succeeds; storage failures are logged.
    pub async fn logout(&self) {
        let mut session = self.inner.session.write().await;
        self.reset(&mut session);
        tracing::info!(target: "aiagent.session", "signed out");
    }

    fn reset(&self, session: &mut Session) {
        self.inner.generation.fetch_add(1, Ordering::SeqCst);
        if let Err(error) = self.inner.tokens.clear() {
            tracing::warn!(
                target: "aiagent.session",
                error = %error,
                "failed to clear stored credentials",
            );
        }
        *session = Session::default();
    }

    /// Restores a persisted token and resolves its profile. An invalid token
    /// leaves the store anonymous.
    pub async fn init(&self) -> SessionState {
        let Some(generation) = self.restore().await else {
            return SessionState::Anonymous;
        };

        if let Err(error) = self.resolve_profile(generation).await {
            tracing::info!(
                target: "aiagent.session",
                error = %error,
                "persisted session could not be restored",
            );
        }
        self.state().await
    }

    /// Adopts a persisted token without resolving its profile, leaving the
    /// session unresolved. Returns the generation it was adopted under.
    pub async fn restore(&self) -> Option<u64> {
        let token = self.inner.tokens.token()?;
        let mut session = self.inner.session.write().await;
        session.token = Some(token);
        session.user = None;
        session.is_authenticated = true;
        Some(self.generation())
    }
}
