use serde::{Deserialize, Serialize};

use crate::error::ClientResult;
use crate::http::ApiClient;

pub const MENUS_PATH: &str = "/v1/menus";

pub const MENUS_FAILED: &str = "failed to load menus";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Menu {
    pub id: i64,
    pub title: String,
    pub path: String,
    #[serde(default)]
    pub children: Vec<Menu>,
}

impl Menu {
    /// Depth-first walk over this entry and all nested children.
    #[must_use]
    pub fn flatten(&self) -> Vec<&Menu> {
        let mut out = vec![self];
        for child in &self.children {
            out.extend(child.flatten());
        }
        out
    }
}

impl ApiClient {
    pub async fn menus(&self) -> ClientResult<Vec<Menu>> {
        self.get_data(MENUS_PATH, MENUS_FAILED).await
    }
}
