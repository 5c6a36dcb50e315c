use serde::{Deserialize, Serialize};

use crate::error::ClientResult;
use crate::http::ApiClient;

pub const DASHBOARD_STATS_PATH: &str = "/dashboard/stats";

pub const DASHBOARD_STATS_FAILED: &str = "failed to load dashboard stats";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    #[serde(default)]
    pub agent_count: u64,
    #[serde(default)]
    pub knowledge_base_count: u64,
    #[serde(default)]
    pub workflow_count: u64,
    #[serde(default)]
    pub plugin_count: u64,
}

impl ApiClient {
    pub async fn dashboard_stats(&self) -> ClientResult<DashboardStats> {
        self.get_data(DASHBOARD_STATS_PATH, DASHBOARD_STATS_FAILED)
            .await
    }
}
