use chrono::NaiveDate;
use reqwest::Method;
use serde::{Deserialize, Serialize};

use crate::error::ClientResult;
use crate::http::{ApiClient, RequestBody, RequestOptions};

pub const PROFILE_PATH: &str = "/v1/user/profile";

pub const PROFILE_FAILED: &str = "failed to load user profile";
pub const PROFILE_UPDATE_FAILED: &str = "failed to update user profile";

/// Raw role strings that grant admin access. The agent platform issues
/// `ROLE_ADMIN`; the app-listing service issues `admin`.
pub const ADMIN_ROLES: &[&str] = &["ROLE_ADMIN", "admin"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Admin,
    User,
}

impl Role {
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        if ADMIN_ROLES.contains(&raw.trim()) {
            Self::Admin
        } else {
            Self::User
        }
    }

    #[must_use]
    pub fn is_admin(self) -> bool {
        matches!(self, Self::Admin)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: i64,
    pub username: String,
    pub role: String,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub school: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gender: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub birthday: Option<NaiveDate>,
}

impl UserProfile {
    #[must_use]
    pub fn role_kind(&self) -> Role {
        Role::parse(&self.role)
    }

    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.role_kind().is_admin()
    }
}

/// Partial profile update; unset fields are left untouched server-side.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gender: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub birthday: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub school: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
}

impl ApiClient {
    pub async fn profile(&self) -> ClientResult<UserProfile> {
        self.get_data(PROFILE_PATH, PROFILE_FAILED).await
    }

    pub async fn update_profile(&self, update: &ProfileUpdate) -> ClientResult<UserProfile> {
        self.fetch_data(
            Method::PATCH,
            PROFILE_PATH,
            RequestBody::json(update)?,
            RequestOptions::new(),
            PROFILE_UPDATE_FAILED,
        )
        .await
    }
}
