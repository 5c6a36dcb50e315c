use std::fmt;

use reqwest::Method;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::envelope::{decode_value, raw_payload};
use crate::error::ClientResult;
use crate::http::{ApiClient, RequestBody, RequestOptions, path_segment};

pub const APPS_PATH: &str = "/apps";

pub const LIST_APPS_FAILED: &str = "failed to load apps";
pub const LIST_APPS_BY_CATEGORY_FAILED: &str = "failed to load apps for category";

/// Marketplace listing. Numeric fields accept numbers, numeric strings or
/// null, and fall back to zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct App {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub full_description: Option<String>,
    #[serde(default)]
    pub avatar: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub price: f64,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub rating: f64,
    #[serde(default, deserialize_with = "lenient_u64")]
    pub downloads: u64,
    #[serde(default, deserialize_with = "lenient_u64")]
    pub reviews: u64,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub published_at: Option<String>,
}

/// Columns the backend accepts for `sortBy`; anything else sorts by id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortField {
    Rating,
    Downloads,
}

impl SortField {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Rating => "rating",
            Self::Downloads => "downloads",
        }
    }

    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "rating" => Some(Self::Rating),
            "downloads" => Some(Self::Downloads),
            _ => None,
        }
    }
}

impl fmt::Display for SortField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

impl SortOrder {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }

    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_uppercase().as_str() {
            "ASC" => Some(Self::Asc),
            "DESC" => Some(Self::Desc),
            _ => None,
        }
    }
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn lenient_number(value: Option<Value>) -> f64 {
    match value {
        Some(Value::Number(number)) => number.as_f64().unwrap_or_default(),
        Some(Value::String(text)) => text.trim().parse::<f64>().unwrap_or_default(),
        _ => 0.0,
    }
}

fn lenient_f64<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    let number = lenient_number(value);
    Ok(if number.is_finite() { number } else { 0.0 })
}

fn lenient_u64<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    if let Some(Value::Number(number)) = value.as_ref() {
        if let Some(exact) = number.as_u64() {
            return Ok(exact);
        }
    }
    let number = lenient_number(value);
    if number.is_finite() && number > 0.0 {
        Ok(number as u64)
    } else {
        Ok(0)
    }
}

/// A payload that is not a list decodes as no apps.
fn decode_app_list(value: Value) -> ClientResult<Vec<App>> {
    match value {
        Value::Array(_) => decode_value(value),
        _ => Ok(Vec::new()),
    }
}

impl ApiClient {
    pub fn apps_category_path(category: &str) -> ClientResult<String> {
        Ok(format!("{APPS_PATH}/category/{}", path_segment(category)?))
    }

    pub async fn list_apps(
        &self,
        sort_by: Option<SortField>,
        sort_order: Option<SortOrder>,
    ) -> ClientResult<Vec<App>> {
        let options = RequestOptions::new()
            .optional_param("sortBy", sort_by)
            .optional_param("sortOrder", sort_order);
        self.fetch_app_list(APPS_PATH, options, LIST_APPS_FAILED)
            .await
    }

    pub async fn list_apps_by_category(&self, category: &str) -> ClientResult<Vec<App>> {
        self.fetch_app_list(
            Self::apps_category_path(category)?.as_str(),
            RequestOptions::new(),
            LIST_APPS_BY_CATEGORY_FAILED,
        )
        .await
    }

    async fn fetch_app_list(
        &self,
        path: &str,
        options: RequestOptions,
        default_message: &str,
    ) -> ClientResult<Vec<App>> {
        let body = self
            .send(Method::GET, path, RequestBody::Empty, options)
            .await?;
        decode_app_list(raw_payload(body, default_message)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn numeric_fields_accept_strings_and_nulls() {
        let app: App = serde_json::from_value(json!({
            "id": 1,
            "name": "Summarizer",
            "price": "9.99",
            "rating": null,
            "downloads": "1200",
            "publishedAt": "2024-03-01"
        }))
        .expect("app");
        assert!((app.price - 9.99).abs() < f64::EPSILON);
        assert!(app.rating.abs() < f64::EPSILON);
        assert_eq!(app.downloads, 1200);
        assert_eq!(app.reviews, 0);
        assert_eq!(app.published_at.as_deref(), Some("2024-03-01"));
    }

    #[test]
    fn garbage_numbers_fall_back_to_zero() {
        let app: App = serde_json::from_value(json!({
            "id": 2,
            "name": "Translator",
            "price": "free",
            "downloads": -5,
            "reviews": true
        }))
        .expect("app");
        assert!(app.price.abs() < f64::EPSILON);
        assert_eq!(app.downloads, 0);
        assert_eq!(app.reviews, 0);
    }

    #[test]
    fn sort_parameters_render_backend_values() {
        assert_eq!(SortField::Rating.to_string(), "rating");
        assert_eq!(SortField::parse(" Downloads "), Some(SortField::Downloads));
        assert_eq!(SortField::parse("name"), None);
        assert_eq!(SortOrder::default().to_string(), "DESC");
        assert_eq!(SortOrder::parse("asc"), Some(SortOrder::Asc));
    }

    #[test]
    fn non_list_payload_yields_no_apps() {
        assert!(decode_app_list(json!({"items": []})).expect("apps").is_empty());
        let apps = decode_app_list(json!([{"id": 3, "name": "Coder"}])).expect("apps");
        assert_eq!(apps.len(), 1);
        assert_eq!(apps[0].category, None);
    }

    #[test]
    fn category_path_is_trimmed() {
        assert_eq!(
            ApiClient::apps_category_path(" writing ").expect("path"),
            "/apps/category/writing"
        );
        assert_eq!(
            ApiClient::apps_category_path("data & ai?").expect("path"),
            "/apps/category/data%20&%20ai%3F"
        );
        assert!(ApiClient::apps_category_path("").is_err());
    }
}
