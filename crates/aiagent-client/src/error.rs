use reqwest::StatusCode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("api base url must not be empty")]
    BaseUrlMissing,
    #[error("api base url must use http:// or https:// and include a host")]
    InvalidBaseUrl,
    #[error("request path must not be empty")]
    InvalidPath,
    #[error("invalid request url: {message}")]
    InvalidUrl { message: String },
    #[error("invalid request header `{name}`")]
    InvalidHeader { name: String },
    #[error("failed to encode request body: {message}")]
    Encode { message: String },
    #[error("{message}")]
    Request { message: String },
    #[error("failed to read response: {message}")]
    Read { message: String },
    #[error("{message}")]
    Http { status: StatusCode, message: String },
    #[error("{message}")]
    Api { code: i64, message: String },
    #[error("unexpected response shape: {message}")]
    Decode { message: String },
    #[error("token store failure: {message}")]
    Storage { message: String },
}

impl ClientError {
    #[must_use]
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Http { status, .. } if *status == StatusCode::UNAUTHORIZED)
    }

    #[must_use]
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Self::Http { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Message suitable for showing to a user, without any kind prefix.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Request { message }
            | Self::Http { message, .. }
            | Self::Api { message, .. } => message.clone(),
            other => other.to_string(),
        }
    }
}

pub type ClientResult<T> = Result<T, ClientError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unauthorized_is_detected_only_for_http_401() {
        let unauthorized = ClientError::Http {
            status: StatusCode::UNAUTHORIZED,
            message: "token expired".to_string(),
        };
        assert!(unauthorized.is_unauthorized());
        assert_eq!(unauthorized.status(), Some(StatusCode::UNAUTHORIZED));

        let forbidden = ClientError::Http {
            status: StatusCode::FORBIDDEN,
            message: "nope".to_string(),
        };
        assert!(!forbidden.is_unauthorized());

        let api = ClientError::Api {
            code: 401,
            message: "unauthorized".to_string(),
        };
        assert!(!api.is_unauthorized());
        assert_eq!(api.status(), None);
    }

    #[test]
    fn display_surfaces_server_messages_verbatim() {
        let error = ClientError::Api {
            code: 500,
            message: "agent not found".to_string(),
        };
        assert_eq!(error.to_string(), "agent not found");
        assert_eq!(error.user_message(), "agent not found");

        let decode = ClientError::Decode {
            message: "missing field `token`".to_string(),
        };
        assert_eq!(
            decode.to_string(),
            "unexpected response shape: missing field `token`"
        );
    }
}
