use crate::session::{SessionState, SessionStore};

pub const LOGIN_PATH: &str = "/login";
pub const DEFAULT_HOME_PATH: &str = "/";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RouteMeta {
    pub requires_auth: bool,
    pub requires_admin: bool,
    /// Only reachable while signed out (login, register).
    pub guest: bool,
}

impl RouteMeta {
    #[must_use]
    pub const fn public() -> Self {
        Self {
            requires_auth: false,
            requires_admin: false,
            guest: false,
        }
    }

    #[must_use]
    pub const fn authenticated() -> Self {
        Self {
            requires_auth: true,
            requires_admin: false,
            guest: false,
        }
    }

    #[must_use]
    pub const fn admin() -> Self {
        Self {
            requires_auth: true,
            requires_admin: true,
            guest: false,
        }
    }

    #[must_use]
    pub const fn guest() -> Self {
        Self {
            requires_auth: false,
            requires_admin: false,
            guest: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardDecision {
    Allow,
    Redirect(String),
}

/// Pre-navigation check. Holds no state between evaluations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteGuard {
    login_path: String,
    home_path: String,
}

impl Default for RouteGuard {
    fn default() -> Self {
        Self {
            login_path: LOGIN_PATH.to_string(),
            home_path: DEFAULT_HOME_PATH.to_string(),
        }
    }
}

impl RouteGuard {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_home_path(mut self, path: impl Into<String>) -> Self {
        self.home_path = path.into();
        self
    }

    #[must_use]
    pub fn with_login_path(mut self, path: impl Into<String>) -> Self {
        self.login_path = path.into();
        self
    }

    #[must_use]
    pub fn home_path(&self) -> &str {
        &self.home_path
    }

    /// May resolve the profile (and sign out on failure) when a protected
    /// route is entered with an unresolved token.
    pub async fn evaluate(&self, meta: &RouteMeta, session: &SessionStore) -> GuardDecision {
        let decision = self.decide(meta, session).await;
        tracing::debug!(
            target: "aiagent.guard",
            requires_auth = meta.requires_auth,
            requires_admin = meta.requires_admin,
            guest = meta.guest,
            decision = ?decision,
            "route evaluated",
        );
        decision
    }

    async fn decide(&self, meta: &RouteMeta, session: &SessionStore) -> GuardDecision {
        let state = session.state().await;

        if meta.requires_auth {
            match state {
                SessionState::Anonymous => return self.redirect_login(),
                SessionState::AuthenticatedUnresolved => {
                    if session.fetch_profile().await.is_err() {
                        session.logout().await;
                        return self.redirect_login();
                    }
                }
                SessionState::AuthenticatedResolved => {}
            }
            if meta.requires_admin && !session.is_admin().await {
                return GuardDecision::Redirect(self.home_path.clone());
            }
            return GuardDecision::Allow;
        }

        if meta.guest && state != SessionState::Anonymous {
            return GuardDecision::Redirect(self.home_path.clone());
        }
        GuardDecision::Allow
    }

    fn redirect_login(&self) -> GuardDecision {
        GuardDecision::Redirect(self.login_path.clone())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Route {
    pub name: String,
    pub pattern: String,
    pub meta: RouteMeta,
}

impl Route {
    #[must_use]
    pub fn new(name: &str, pattern: &str, meta: RouteMeta) -> Self {
        Self {
            name: name.to_string(),
            pattern: pattern.to_string(),
            meta,
        }
    }

    /// Segment-wise match; `:name` segments match any non-empty segment.
    #[must_use]
    pub fn matches(&self, path: &str) -> bool {
        let pattern = segments(&self.pattern);
        let candidate = segments(path);
        pattern.len() == candidate.len()
            && pattern
                .iter()
                .zip(&candidate)
                .all(|(expected, actual)| expected.starts_with(':') || expected == actual)
    }
}

fn segments(path: &str) -> Vec<&str> {
    let path = path.split(['?', '#']).next().unwrap_or_default();
    path.split('/').filter(|segment| !segment.is_empty()).collect()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteTable {
    routes: Vec<Route>,
}

impl RouteTable {
    #[must_use]
    pub fn new(routes: Vec<Route>) -> Self {
        Self { routes }
    }

    /// Routes of the management console.
    #[must_use]
    pub fn console() -> Self {
        let auth = RouteMeta::authenticated();
        Self::new(vec![
            Route::new("Home", "/", auth),
            Route::new("Login", "/login", RouteMeta::guest()),
            Route::new("Register", "/register", RouteMeta::guest()),
            Route::new("AccountProfile", "/account/profile", auth),
            Route::new("UserManagement", "/users", RouteMeta::admin()),
            Route::new("AgentList", "/agents", auth),
            Route::new("AgentCreate", "/agents/new", auth),
            Route::new("AgentEdit", "/agents/:id/edit", auth),
            Route::new("AgentTest", "/agents/:id/test", auth),
            Route::new("AgentChat", "/agents/:id/chat", auth),
            Route::new("KnowledgeBaseList", "/knowledge-bases", auth),
            Route::new("KnowledgeBaseCreate", "/knowledge-bases/new", auth),
            Route::new("KnowledgeBaseDetail", "/knowledge-bases/:id", auth),
            Route::new("WorkflowList", "/workflows", auth),
            Route::new("WorkflowCreate", "/workflows/new", auth),
            Route::new("WorkflowEdit", "/workflows/:id/edit", auth),
            Route::new("WorkflowExecute", "/workflows/:id/execute", auth),
            Route::new("PluginList", "/plugins", auth),
            Route::new("PluginRegister", "/plugins/new", auth),
            Route::new("PluginDetail", "/plugins/:id", auth),
        ])
    }

    #[must_use]
    pub fn routes(&self) -> &[Route] {
        &self.routes
    }

    /// First registered match wins, so literal routes listed before
    /// parameterized siblings take precedence.
    #[must_use]
    pub fn find(&self, path: &str) -> Option<&Route> {
        self.routes.iter().find(|route| route.matches(path))
    }

    /// Unknown paths are treated as public.
    #[must_use]
    pub fn resolve(&self, path: &str) -> RouteMeta {
        self.find(path).map_or_else(RouteMeta::public, |route| route.meta)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::auth::{Credentials, LoginResponse};
    use crate::api::user::UserProfile;
    use crate::error::{ClientError, ClientResult};
    use crate::session::AuthBackend;
    use crate::token_store::TokenStore;
    use async_trait::async_trait;
    use reqwest::StatusCode;
    use std::sync::Arc;

    struct StaticBackend {
        tokens: TokenStore,
        role: &'static str,
    }

    #[async_trait]
    impl AuthBackend for StaticBackend {
        async fn login(&self, _credentials: &Credentials) -> ClientResult<LoginResponse> {
            Ok(LoginResponse {
                token: "abc".to_string(),
            })
        }

        async fn register(&self, _credentials: &Credentials) -> ClientResult<UserProfile> {
            Err(ClientError::Api {
                code: 500,
                message: "unused".to_string(),
            })
        }

        async fn fetch_profile(&self) -> ClientResult<UserProfile> {
            if self.tokens.token().as_deref() != Some("abc") {
                return Err(ClientError::Http {
                    status: StatusCode::UNAUTHORIZED,
                    message: "token expired".to_string(),
                });
            }
            Ok(serde_json::from_value(serde_json::json!({
                "id": 1,
                "username": "bob",
                "role": self.role,
            }))
            .expect("profile"))
        }
    }

    fn session(role: &'static str) -> (SessionStore, TokenStore) {
        let tokens = TokenStore::in_memory();
        let backend = StaticBackend {
            tokens: tokens.clone(),
            role,
        };
        (SessionStore::new(Arc::new(backend), tokens.clone()), tokens)
    }

    #[tokio::test]
    async fn anonymous_user_is_sent_to_login() {
        let (session, _) = session("ROLE_USER");
        let decision = RouteGuard::new()
            .evaluate(&RouteMeta::authenticated(), &session)
            .await;
        assert_eq!(decision, GuardDecision::Redirect("/login".to_string()));
    }

    #[tokio::test]
    async fn non_admin_is_sent_home() {
        let (session, _) = session("ROLE_USER");
        session.login("bob", "pw").await.expect("login");

        let guard = RouteGuard::new().with_home_path("/home");
        assert_eq!(
            guard.evaluate(&RouteMeta::admin(), &session).await,
            GuardDecision::Redirect("/home".to_string())
        );
        assert_eq!(
            guard.evaluate(&RouteMeta::authenticated(), &session).await,
            GuardDecision::Allow
        );
    }

    #[tokio::test]
    async fn admin_reaches_admin_routes() {
        let (session, _) = session("ROLE_ADMIN");
        session.login("bob", "pw").await.expect("login");
        assert_eq!(
            RouteGuard::new()
                .evaluate(&RouteMeta::admin(), &session)
                .await,
            GuardDecision::Allow
        );
    }

    #[tokio::test]
    async fn signed_in_user_is_kept_off_guest_pages() {
        let (session, _) = session("ROLE_USER");
        session.login("bob", "pw").await.expect("login");
        assert_eq!(
            RouteGuard::new()
                .evaluate(&RouteMeta::guest(), &session)
                .await,
            GuardDecision::Redirect("/".to_string())
        );
    }

    #[tokio::test]
    async fn guest_and_public_pages_allow_anonymous_users() {
        let (session, _) = session("ROLE_USER");
        let guard = RouteGuard::new();
        assert_eq!(
            guard.evaluate(&RouteMeta::guest(), &session).await,
            GuardDecision::Allow
        );
        assert_eq!(
            guard.evaluate(&RouteMeta::public(), &session).await,
            GuardDecision::Allow
        );
    }

    #[tokio::test]
    async fn unresolved_token_is_resolved_on_navigation() {
        let (session, tokens) = session("ROLE_USER");
        tokens.set_token("abc").expect("token");
        session.restore().await.expect("restored");
        assert_eq!(session.state().await, SessionState::AuthenticatedUnresolved);

        assert_eq!(
            RouteGuard::new()
                .evaluate(&RouteMeta::authenticated(), &session)
                .await,
            GuardDecision::Allow
        );
        assert_eq!(session.state().await, SessionState::AuthenticatedResolved);
        assert_eq!(session.user_name().await, "bob");
    }

    #[tokio::test]
    async fn unresolvable_token_signs_out_and_redirects() {
        let (session, tokens) = session("ROLE_USER");
        tokens.set_token("stale").expect("token");
        session.restore().await.expect("restored");

        assert_eq!(
            RouteGuard::new()
                .evaluate(&RouteMeta::authenticated(), &session)
                .await,
            GuardDecision::Redirect("/login".to_string())
        );
        assert_eq!(session.state().await, SessionState::Anonymous);
        assert!(!tokens.has_token());
    }

    #[test]
    fn route_table_matches_parameters_and_prefers_literals() {
        let table = RouteTable::console();
        assert_eq!(
            table.find("/agents/new").map(|route| route.name.as_str()),
            Some("AgentCreate")
        );
        assert_eq!(
            table.find("/agents/12/chat").map(|route| route.name.as_str()),
            Some("AgentChat")
        );
        assert_eq!(
            table
                .find("/knowledge-bases/3?tab=documents")
                .map(|route| route.name.as_str()),
            Some("KnowledgeBaseDetail")
        );
        assert_eq!(table.resolve("/users"), RouteMeta::admin());
        assert_eq!(table.resolve("/login"), RouteMeta::guest());
        assert_eq!(table.resolve("/does/not/exist"), RouteMeta::public());
        assert_eq!(table.resolve("/"), RouteMeta::authenticated());
    }
}
