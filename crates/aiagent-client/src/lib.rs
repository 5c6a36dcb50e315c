//! Client for the AI agent platform backend: authenticated HTTP transport,
//! persisted credentials, session state and route guarding.

pub mod api;
pub mod config;
pub mod envelope;
pub mod error;
pub mod guard;
pub mod http;
pub mod session;
pub mod token_store;

pub use api::auth::{Credentials, LoginResponse};
pub use api::user::{ProfileUpdate, Role, UserProfile};
pub use config::ClientConfig;
pub use envelope::Envelope;
pub use error::{ClientError, ClientResult};
pub use guard::{GuardDecision, Route, RouteGuard, RouteMeta, RouteTable};
pub use http::{ApiClient, MultipartForm, RequestBody, RequestOptions};
pub use session::{AuthBackend, Session, SessionError, SessionState, SessionStore};
pub use token_store::{FileStorage, KeyValueStorage, MemoryStorage, StoredUserInfo, TokenStore};
