//! Typed wrappers for every platform resource.
//!
//! Each submodule adds methods to [`ApiClient`] together with its request and
//! response types. Responses go through one decoding pathway: enveloped
//! bodies are unwrapped, bare bodies are decoded as-is.

pub mod admin;
pub mod agent;
pub mod apps;
pub mod auth;
pub mod dashboard;
pub mod knowledge_base;
pub mod menu;
pub mod plugin;
pub mod user;
pub mod workflow;

use reqwest::Method;
use serde::de::DeserializeOwned;

use crate::envelope::{decode_data, decode_unit};
use crate::error::ClientResult;
use crate::http::{ApiClient, RequestBody, RequestOptions};

impl ApiClient {
    pub(crate) async fn fetch_data<T>(
        &self,
        method: Method,
        path: &str,
        body: RequestBody,
        options: RequestOptions,
        default_message: &str,
    ) -> ClientResult<T>
    where
        T: DeserializeOwned,
    {
        let value = self.send(method, path, body, options).await?;
        decode_data(value, default_message)
    }

    pub(crate) async fn fetch_unit(
        &self,
        method: Method,
        path: &str,
        body: RequestBody,
        options: RequestOptions,
        default_message: &str,
    ) -> ClientResult<()> {
        let value = self.send(method, path, body, options).await?;
        decode_unit(value, default_message)
    }

    pub(crate) async fn get_data<T>(&self, path: &str, default_message: &str) -> ClientResult<T>
    where
        T: DeserializeOwned,
    {
        self.fetch_data(
            Method::GET,
            path,
            RequestBody::Empty,
            RequestOptions::new(),
            default_message,
        )
        .await
    }

    pub(crate) async fn delete_unit(&self, path: &str, default_message: &str) -> ClientResult<()> {
        self.fetch_unit(
            Method::DELETE,
            path,
            RequestBody::Empty,
            RequestOptions::new(),
            default_message,
        )
        .await
    }
}
