use std::time::Duration;

use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue};
use reqwest::{Method, StatusCode, Url};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::config::{ClientConfig, MIN_HTTP_TIMEOUT_MS, normalize_api_prefix, normalize_base_url};
use crate::envelope::decode_value;
use crate::error::{ClientError, ClientResult};
use crate::token_store::TokenStore;

const JSON_CONTENT_TYPE: &str = "application/json";

/// Per-call options. Query parameters with a `None` value are dropped.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestOptions {
    pub params: Vec<(String, Option<String>)>,
    pub skip_auth: bool,
    pub headers: Vec<(String, String)>,
}

impl RequestOptions {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn param(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.params.push((key.into(), Some(value.to_string())));
        self
    }

    #[must_use]
    pub fn optional_param<V: ToString>(mut self, key: impl Into<String>, value: Option<V>) -> Self {
        self.params
            .push((key.into(), value.map(|value| value.to_string())));
        self
    }

    #[must_use]
    pub fn skip_auth(mut self) -> Self {
        self.skip_auth = true;
        self
    }

    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum FormPart {
    Text {
        name: String,
        value: String,
    },
    File {
        name: String,
        file_name: String,
        bytes: Vec<u8>,
        mime: Option<String>,
    },
}

/// Multipart body description, turned into a `reqwest` form at send time.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MultipartForm {
    parts: Vec<FormPart>,
}

impl MultipartForm {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn text(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.parts.push(FormPart::Text {
            name: name.into(),
            value: value.into(),
        });
        self
    }

    #[must_use]
    pub fn file(
        mut self,
        name: impl Into<String>,
        file_name: impl Into<String>,
        bytes: Vec<u8>,
        mime: Option<&str>,
    ) -> Self {
        self.parts.push(FormPart::File {
            name: name.into(),
            file_name: file_name.into(),
            bytes,
            mime: mime.map(str::to_string),
        });
        self
    }

    #[must_use]
    pub fn field_names(&self) -> Vec<&str> {
        self.parts
            .iter()
            .map(|part| match part {
                FormPart::Text { name, .. } | FormPart::File { name, .. } => name.as_str(),
            })
            .collect()
    }

    fn into_reqwest(self) -> ClientResult<reqwest::multipart::Form> {
        let mut form = reqwest::multipart::Form::new();
        for part in self.parts {
            form = match part {
                FormPart::Text { name, value } => form.text(name, value),
                FormPart::File {
                    name,
                    file_name,
                    bytes,
                    mime,
                } => {
                    let mut file = reqwest::multipart::Part::bytes(bytes).file_name(file_name);
                    if let Some(mime) = mime {
                        file = file.mime_str(&mime).map_err(|error| ClientError::Encode {
                            message: error.to_string(),
                        })?;
                    }
                    form.part(name, file)
                }
            };
        }
        Ok(form)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    Empty,
    Json(Value),
    Multipart(MultipartForm),
}

impl RequestBody {
    pub fn json<B>(body: &B) -> ClientResult<Self>
    where
        B: Serialize + ?Sized,
    {
        serde_json::to_value(body)
            .map(Self::Json)
            .map_err(|error| ClientError::Encode {
                message: error.to_string(),
            })
    }
}

/// Authenticated JSON client for the platform API.
#[derive(Debug, Clone)]
pub struct ApiClient {
    base_url: String,
    api_prefix: String,
    timeout: Duration,
    http: reqwest::Client,
    tokens: TokenStore,
}

impl ApiClient {
    pub fn new(config: &ClientConfig, tokens: TokenStore) -> ClientResult<Self> {
        let base_url = normalize_base_url(&config.base_url)?;
        Ok(Self {
            base_url,
            api_prefix: normalize_api_prefix(&config.api_prefix),
            timeout: Duration::from_millis(config.timeout_ms.max(MIN_HTTP_TIMEOUT_MS)),
            http: reqwest::Client::new(),
            tokens,
        })
    }

    /// Builds a client whose token store lives at `config.state_path`, or in
    /// memory when no path is configured.
    pub fn from_config(config: &ClientConfig) -> ClientResult<Self> {
        let tokens = match config.state_path.as_ref() {
            Some(path) => TokenStore::file(path),
            None => TokenStore::in_memory(),
        };
        Self::new(config, tokens)
    }

    #[must_use]
    pub fn tokens(&self) -> &TokenStore {
        &self.tokens
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Absolute URLs pass through; relative paths get base URL and prefix.
    #[must_use]
    pub fn endpoint(&self, path: &str) -> Option<String> {
        let trimmed = path.trim();
        if trimmed.is_empty() {
            return None;
        }
        if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
            return Some(trimmed.to_string());
        }
        if trimmed.starts_with('/') {
            Some(format!("{}{}{}", self.base_url, self.api_prefix, trimmed))
        } else {
            Some(format!("{}{}/{}", self.base_url, self.api_prefix, trimmed))
        }
    }

    pub fn url(&self, path: &str, params: &[(String, Option<String>)]) -> ClientResult<Url> {
        let endpoint = self.endpoint(path).ok_or(ClientError::InvalidPath)?;
        let mut url = Url::parse(&endpoint).map_err(|error| ClientError::InvalidUrl {
            message: error.to_string(),
        })?;

        let present = params
            .iter()
            .filter_map(|(key, value)| value.as_deref().map(|value| (key.as_str(), value)))
            .collect::<Vec<_>>();
        if !present.is_empty() {
            url.query_pairs_mut().extend_pairs(present);
        }
        Ok(url)
    }

    pub async fn get<T>(&self, path: &str) -> ClientResult<T>
    where
        T: DeserializeOwned,
    {
        self.request(Method::GET, path, RequestBody::Empty, RequestOptions::new())
            .await
    }

    pub async fn get_with<T>(&self, path: &str, options: RequestOptions) -> ClientResult<T>
    where
        T: DeserializeOwned,
    {
        self.request(Method::GET, path, RequestBody::Empty, options)
            .await
    }

    pub async fn post<B, T>(&self, path: &str, body: &B) -> ClientResult<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.post_with(path, body, RequestOptions::new()).await
    }

    pub async fn post_with<B, T>(
        &self,
        path: &str,
        body: &B,
        options: RequestOptions,
    ) -> ClientResult<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.request(Method::POST, path, RequestBody::json(body)?, options)
            .await
    }

    pub async fn put<B, T>(&self, path: &str, body: &B) -> ClientResult<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.request(
            Method::PUT,
            path,
            RequestBody::json(body)?,
            RequestOptions::new(),
        )
        .await
    }

    pub async fn patch<B, T>(&self, path: &str, body: &B) -> ClientResult<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.request(
            Method::PATCH,
            path,
            RequestBody::json(body)?,
            RequestOptions::new(),
        )
        .await
    }

    pub async fn delete<T>(&self, path: &str) -> ClientResult<T>
    where
        T: DeserializeOwned,
    {
        self.request(
            Method::DELETE,
            path,
            RequestBody::Empty,
            RequestOptions::new(),
        )
        .await
    }

    pub async fn request<T>(
        &self,
        method: Method,
        path: &str,
        body: RequestBody,
        options: RequestOptions,
    ) -> ClientResult<T>
    where
        T: DeserializeOwned,
    {
        let value = self.send(method, path, body, options).await?;
        decode_value(value)
    }

    /// Sends one request and returns the parsed JSON body. An empty 2xx body
    /// is returned as `Value::Null`.
    pub async fn send(
        &self,
        method: Method,
        path: &str,
        body: RequestBody,
        options: RequestOptions,
    ) -> ClientResult<Value> {
        let url = self.url(path, &options.params)?;
        let headers = self.build_headers(&options, &body)?;

        let mut request = self
            .http
            .request(method.clone(), url.clone())
            .headers(headers)
            .timeout(self.timeout);
        request = match body {
            RequestBody::Empty => request,
            RequestBody::Json(value) => {
                let bytes = serde_json::to_vec(&value).map_err(|error| ClientError::Encode {
                    message: error.to_string(),
                })?;
                request.body(bytes)
            }
            RequestBody::Multipart(form) => request.multipart(form.into_reqwest()?),
        };

        tracing::debug!(
            target: "aiagent.http",
            method = %method,
            url = %url,
            "sending request",
        );

        let response = request.send().await.map_err(|error| {
            tracing::warn!(
                target: "aiagent.http",
                method = %method,
                url = %url,
                error = %error,
                "request failed before a response arrived",
            );
            ClientError::Request {
                message: error.to_string(),
            }
        })?;

        let status = response.status();
        let bytes = response
            .bytes()
            .await
            .map_err(|error| ClientError::Read {
                message: error.to_string(),
            })?;

        if !status.is_success() {
            if status == StatusCode::UNAUTHORIZED {
                tracing::warn!(
                    target: "aiagent.http",
                    url = %url,
                    "request rejected with 401; clearing stored credentials",
                );
                if let Err(error) = self.tokens.clear() {
                    tracing::warn!(
                        target: "aiagent.http",
                        error = %error,
                        "failed to clear stored credentials",
                    );
                }
            }
            return Err(format_http_error(status, &bytes));
        }

        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(Value::Null);
        }
        serde_json::from_slice::<Value>(&bytes).map_err(|error| ClientError::Decode {
            message: error.to_string(),
        })
    }

    fn build_headers(
        &self,
        options: &RequestOptions,
        body: &RequestBody,
    ) -> ClientResult<HeaderMap> {
        let mut headers = HeaderMap::new();
        for (name, value) in &options.headers {
            let header_name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|_| ClientError::InvalidHeader { name: name.clone() })?;
            let header_value = HeaderValue::from_str(value)
                .map_err(|_| ClientError::InvalidHeader { name: name.clone() })?;
            headers.insert(header_name, header_value);
        }

        if !matches!(body, RequestBody::Multipart(_)) && !headers.contains_key(CONTENT_TYPE) {
            headers.insert(CONTENT_TYPE, HeaderValue::from_static(JSON_CONTENT_TYPE));
        }

        if options.skip_auth {
            return Ok(headers);
        }
        if let Some(token) = self.tokens.token() {
            let mut value = HeaderValue::from_str(&format!("Bearer {token}")).map_err(|_| {
                ClientError::InvalidHeader {
                    name: AUTHORIZATION.to_string(),
                }
            })?;
            value.set_sensitive(true);
            headers.insert(AUTHORIZATION, value);
        }

        Ok(headers)
    }
}

/// Percent-encodes one caller-supplied path segment, so `/`, `?` and `#`
/// stay inside it. Blank, `.` and `..` segments are rejected.
pub fn path_segment(raw: &str) -> ClientResult<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed == "." || trimmed == ".." {
        return Err(ClientError::InvalidPath);
    }
    let mut url =
        Url::parse("http://segment.invalid/").map_err(|error| ClientError::InvalidUrl {
            message: error.to_string(),
        })?;
    url.path_segments_mut()
        .map_err(|()| ClientError::InvalidPath)?
        .clear()
        .push(trimmed);
    Ok(url.path().trim_start_matches('/').to_string())
}

/// Prefers the JSON `message` field of an error body, then the status
/// reason phrase for non-JSON bodies, then a generic status line.
///
/// The reason phrase is the canonical one for the status code; `reqwest`
/// does not expose the phrase the server actually sent.
pub fn format_http_error(status: StatusCode, body: &[u8]) -> ClientError {
    let fallback = format!("HTTP error! status: {}", status.as_u16());
    let message = match serde_json::from_slice::<Value>(body) {
        Ok(parsed) => parsed
            .get("message")
            .and_then(Value::as_str)
            .and_then(non_empty_string)
            .unwrap_or(fallback),
        Err(_) => status
            .canonical_reason()
            .and_then(non_empty_string)
            .unwrap_or(fallback),
    };
    ClientError::Http { status, message }
}

fn non_empty_string(value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> ApiClient {
        ApiClient::new(
            &ClientConfig::new("https://agents.example.com/"),
            TokenStore::in_memory(),
        )
        .expect("api client")
    }

    #[test]
    fn endpoint_builder_applies_prefix_and_keeps_absolute_urls() {
        let client = client();
        assert_eq!(
            client.endpoint("/v1/agents"),
            Some("https://agents.example.com/api/v1/agents".to_string())
        );
        assert_eq!(
            client.endpoint("v1/agents"),
            Some("https://agents.example.com/api/v1/agents".to_string())
        );
        assert_eq!(
            client.endpoint("https://cdn.example.com/file.json"),
            Some("https://cdn.example.com/file.json".to_string())
        );
        assert_eq!(client.endpoint("  "), None);
    }

    #[test]
    fn empty_prefix_targets_the_base_url_directly() {
        let config = ClientConfig::new("http://127.0.0.1:9000").with_api_prefix("");
        let client = ApiClient::new(&config, TokenStore::in_memory()).expect("client");
        assert_eq!(
            client.endpoint("/v1/menus"),
            Some("http://127.0.0.1:9000/v1/menus".to_string())
        );
    }

    #[test]
    fn query_string_skips_missing_values() {
        let client = client();
        let options = RequestOptions::new()
            .param("sortBy", "rating")
            .optional_param::<String>("category", None)
            .param("sortOrder", "DESC");
        let url = client.url("/apps", &options.params).expect("url");
        assert_eq!(
            url.as_str(),
            "https://agents.example.com/api/apps?sortBy=rating&sortOrder=DESC"
        );

        let bare = client
            .url(
                "/apps",
                &RequestOptions::new()
                    .optional_param::<String>("sortBy", None)
                    .params,
            )
            .expect("url");
        assert_eq!(bare.as_str(), "https://agents.example.com/api/apps");
    }

    #[test]
    fn query_values_are_percent_encoded() {
        let client = client();
        let options = RequestOptions::new().param("q", "a b&c");
        let url = client.url("/v1/agents", &options.params).expect("url");
        assert_eq!(url.query(), Some("q=a+b%26c"));
    }

    #[test]
    fn headers_default_to_json_and_carry_the_bearer_token() {
        let client = client();
        client.tokens().set_token("abc").expect("token");

        let headers = client
            .build_headers(&RequestOptions::new(), &RequestBody::Empty)
            .expect("headers");
        assert_eq!(headers[CONTENT_TYPE], JSON_CONTENT_TYPE);
        assert_eq!(headers[AUTHORIZATION], "Bearer abc");

        let skipped = client
            .build_headers(&RequestOptions::new().skip_auth(), &RequestBody::Empty)
            .expect("headers");
        assert!(!skipped.contains_key(AUTHORIZATION));
    }

    #[test]
    fn caller_content_type_wins_and_multipart_sets_none() {
        let client = client();
        let headers = client
            .build_headers(
                &RequestOptions::new().header("Content-Type", "text/plain"),
                &RequestBody::Empty,
            )
            .expect("headers");
        assert_eq!(headers[CONTENT_TYPE], "text/plain");

        let multipart = client
            .build_headers(
                &RequestOptions::new(),
                &RequestBody::Multipart(MultipartForm::new().text("name", "x")),
            )
            .expect("headers");
        assert!(!multipart.contains_key(CONTENT_TYPE));
    }

    #[test]
    fn invalid_header_names_are_rejected() {
        let client = client();
        let error = client
            .build_headers(
                &RequestOptions::new().header("bad header", "x"),
                &RequestBody::Empty,
            )
            .expect_err("invalid header");
        assert!(matches!(error, ClientError::InvalidHeader { ref name } if name == "bad header"));
    }

    #[test]
    fn http_error_prefers_json_message() {
        let error = format_http_error(
            StatusCode::BAD_REQUEST,
            br#"{"message":" username already exists "}"#,
        );
        assert_eq!(error.to_string(), "username already exists");
        assert_eq!(error.status(), Some(StatusCode::BAD_REQUEST));
    }

    #[test]
    fn http_error_falls_back_to_status_text_for_non_json_bodies() {
        let error = format_http_error(StatusCode::BAD_GATEWAY, b"<html>gateway</html>");
        assert_eq!(error.to_string(), "Bad Gateway");
    }

    #[test]
    fn http_error_without_message_field_reports_the_status() {
        let error = format_http_error(StatusCode::INTERNAL_SERVER_ERROR, br#"{"error":"boom"}"#);
        assert_eq!(error.to_string(), "HTTP error! status: 500");
    }

    #[test]
    fn path_segments_are_escaped_and_traversal_is_rejected() {
        assert_eq!(path_segment(" alice ").expect("plain"), "alice");
        assert_eq!(path_segment("alice#bob").expect("hash"), "alice%23bob");
        assert_eq!(path_segment("a?b").expect("query"), "a%3Fb");
        assert_eq!(path_segment("../admin").expect("slash"), "..%2Fadmin");
        assert_eq!(path_segment("big data").expect("space"), "big%20data");
        assert!(matches!(path_segment("  "), Err(ClientError::InvalidPath)));
        assert!(matches!(path_segment(".."), Err(ClientError::InvalidPath)));
        assert!(matches!(path_segment("."), Err(ClientError::InvalidPath)));
    }

    #[test]
    fn multipart_form_keeps_field_order() {
        let form = MultipartForm::new()
            .text("name", "weather")
            .text("description", "")
            .file("openapiFile", "weather.yaml", b"openapi: 3.0.0".to_vec(), None);
        assert_eq!(form.field_names(), vec!["name", "description", "openapiFile"]);
    }

    #[test]
    fn base_url_missing_is_rejected() {
        let result = ApiClient::new(&ClientConfig::new("   "), TokenStore::in_memory());
        assert!(matches!(result, Err(ClientError::BaseUrlMissing)));
    }
}
