use reqwest::Method;
use serde::{Deserialize, Serialize};

use crate::api::user::UserProfile;
use crate::error::ClientResult;
use crate::http::{ApiClient, RequestBody, RequestOptions};

pub const LOGIN_PATH: &str = "/v1/auth/login";
pub const REGISTER_PATH: &str = "/v1/auth/register";

pub const LOGIN_FAILED: &str = "login failed";
pub const REGISTER_FAILED: &str = "registration failed";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    #[must_use]
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoginResponse {
    pub token: String,
}

impl ApiClient {
    /// Sent without the bearer header.
    pub async fn login(&self, credentials: &Credentials) -> ClientResult<LoginResponse> {
        self.fetch_data(
            Method::POST,
            LOGIN_PATH,
            RequestBody::json(credentials)?,
            RequestOptions::new().skip_auth(),
            LOGIN_FAILED,
        )
        .await
    }

    /// Sent without the bearer header.
    pub async fn register(&self, credentials: &Credentials) -> ClientResult<UserProfile> {
        self.fetch_data(
            Method::POST,
            REGISTER_PATH,
            RequestBody::json(credentials)?,
            RequestOptions::new().skip_auth(),
            REGISTER_FAILED,
        )
        .await
    }
}
