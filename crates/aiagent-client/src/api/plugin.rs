use reqwest::Method;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ClientResult;
use crate::http::{ApiClient, MultipartForm, RequestBody, RequestOptions};

pub const PLUGINS_PATH: &str = "/v1/plugins";
pub const PLUGIN_REGISTER_PATH: &str = "/v1/plugins/register";
pub const ENABLED_PLUGINS_PATH: &str = "/v1/plugins/enabled";

pub const REGISTER_PLUGIN_FAILED: &str = "failed to register plugin";
pub const LIST_PLUGINS_FAILED: &str = "failed to load plugin list";
pub const LIST_ENABLED_PLUGINS_FAILED: &str = "failed to load enabled plugins";
pub const GET_PLUGIN_FAILED: &str = "failed to load plugin details";
pub const UPDATE_PLUGIN_FAILED: &str = "failed to update plugin";
pub const TOGGLE_PLUGIN_FAILED: &str = "failed to toggle plugin state";
pub const DELETE_PLUGIN_FAILED: &str = "failed to delete plugin";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Plugin {
    pub id: i64,
    pub user_id: i64,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub openapi_spec: Option<Value>,
    pub enabled: bool,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
}

/// OpenAPI document sent as the `openapiFile` form field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenApiFile {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

/// Multipart fields shared by registration and update. A missing
/// description is sent as an empty string.
fn plugin_form(name: &str, description: Option<&str>, file: Option<OpenApiFile>) -> MultipartForm {
    let form = MultipartForm::new()
        .text("name", name)
        .text("description", description.unwrap_or_default());
    match file {
        Some(file) => form.file("openapiFile", file.file_name, file.bytes, None),
        None => form,
    }
}

impl ApiClient {
    #[must_use]
    pub fn plugin_path(id: i64) -> String {
        format!("{PLUGINS_PATH}/{id}")
    }

    #[must_use]
    pub fn plugin_toggle_path(id: i64) -> String {
        format!("{PLUGINS_PATH}/{id}/toggle")
    }

    pub async fn register_plugin(
        &self,
        name: &str,
        description: Option<&str>,
        file: OpenApiFile,
    ) -> ClientResult<Plugin> {
        self.fetch_data(
            Method::POST,
            PLUGIN_REGISTER_PATH,
            RequestBody::Multipart(plugin_form(name, description, Some(file))),
            RequestOptions::new(),
            REGISTER_PLUGIN_FAILED,
        )
        .await
    }

    pub async fn list_plugins(&self) -> ClientResult<Vec<Plugin>> {
        self.get_data(PLUGINS_PATH, LIST_PLUGINS_FAILED).await
    }

    pub async fn list_enabled_plugins(&self) -> ClientResult<Vec<Plugin>> {
        self.get_data(ENABLED_PLUGINS_PATH, LIST_ENABLED_PLUGINS_FAILED)
            .await
    }

    pub async fn get_plugin(&self, id: i64) -> ClientResult<Plugin> {
        self.get_data(Self::plugin_path(id).as_str(), GET_PLUGIN_FAILED)
            .await
    }

    /// Replaces name and description; the OpenAPI file is only sent when given.
    pub async fn update_plugin(
        &self,
        id: i64,
        name: &str,
        description: Option<&str>,
        file: Option<OpenApiFile>,
    ) -> ClientResult<Plugin> {
        self.fetch_data(
            Method::PUT,
            Self::plugin_path(id).as_str(),
            RequestBody::Multipart(plugin_form(name, description, file)),
            RequestOptions::new(),
            UPDATE_PLUGIN_FAILED,
        )
        .await
    }

    pub async fn toggle_plugin(&self, id: i64, enabled: bool) -> ClientResult<Plugin> {
        self.fetch_data(
            Method::PATCH,
            Self::plugin_toggle_path(id).as_str(),
            RequestBody::Empty,
            RequestOptions::new().param("enabled", enabled),
            TOGGLE_PLUGIN_FAILED,
        )
        .await
    }

    pub async fn delete_plugin(&self, id: i64) -> ClientResult<()> {
        self.delete_unit(Self::plugin_path(id).as_str(), DELETE_PLUGIN_FAILED)
            .await
    }
}
