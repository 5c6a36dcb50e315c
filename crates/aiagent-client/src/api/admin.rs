use crate::api::user::UserProfile;
use crate::error::ClientResult;
use crate::http::{ApiClient, path_segment};

pub const USERS_PATH: &str = "/v1/admin/users";

pub const LIST_USERS_FAILED: &str = "failed to load user list";
pub const DELETE_USER_FAILED: &str = "failed to delete user";

impl ApiClient {
    /// Fails with [`ClientError::InvalidPath`](crate::ClientError::InvalidPath)
    /// for a blank username.
    pub fn admin_user_path(username: &str) -> ClientResult<String> {
        Ok(format!("{USERS_PATH}/{}", path_segment(username)?))
    }

    pub async fn list_users(&self) -> ClientResult<Vec<UserProfile>> {
        self.get_data(USERS_PATH, LIST_USERS_FAILED).await
    }

    pub async fn delete_user(&self, username: &str) -> ClientResult<()> {
        self.delete_unit(Self::admin_user_path(username)?.as_str(), DELETE_USER_FAILED)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ClientError;

    #[test]
    fn user_path_trims_the_username() {
        assert_eq!(
            ApiClient::admin_user_path(" alice ").expect("path"),
            "/v1/admin/users/alice"
        );
    }

    #[test]
    fn user_path_keeps_reserved_characters_inside_the_segment() {
        assert_eq!(
            ApiClient::admin_user_path("alice#bob").expect("path"),
            "/v1/admin/users/alice%23bob"
        );
        assert_eq!(
            ApiClient::admin_user_path("../agents").expect("path"),
            "/v1/admin/users/..%2Fagents"
        );
        assert!(matches!(
            ApiClient::admin_user_path(" "),
            Err(ClientError::InvalidPath)
        ));
    }
}
