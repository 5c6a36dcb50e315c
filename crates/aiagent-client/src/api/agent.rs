use reqwest::Method;
use serde::{Deserialize, Serialize};

use crate::error::ClientResult;
use crate::http::{ApiClient, RequestBody, RequestOptions};

pub const AGENTS_PATH: &str = "/v1/agents";

pub const LIST_AGENTS_FAILED: &str = "failed to load agent list";
pub const GET_AGENT_FAILED: &str = "failed to load agent details";
pub const CREATE_AGENT_FAILED: &str = "failed to create agent";
pub const UPDATE_AGENT_FAILED: &str = "failed to update agent";
pub const DELETE_AGENT_FAILED: &str = "failed to delete agent";
pub const TEST_AGENT_FAILED: &str = "failed to test agent";
pub const PUBLISH_AGENT_FAILED: &str = "failed to publish agent";
pub const CHAT_FAILED: &str = "chat failed";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Agent {
    pub id: i64,
    pub user_id: i64,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub system_prompt: Option<String>,
    #[serde(default)]
    pub user_prompt_template: Option<String>,
    #[serde(default)]
    pub model_config: Option<String>,
    #[serde(default)]
    pub workflow_id: Option<i64>,
    #[serde(default)]
    pub knowledge_base_ids: Option<String>,
    #[serde(default)]
    pub plugin_ids: Option<String>,
    pub status: String,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
}

/// Body for create and update. `status` is only honored on update.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentDraft {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_prompt: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_prompt_template: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model_config: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub workflow_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub knowledge_base_ids: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plugin_ids: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
struct QuestionRequest<'a> {
    question: &'a str,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
struct TestAgentResponse {
    answer: String,
}

/// Where a chat answer came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnswerSource {
    Direct,
    Rag,
    Workflow,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatResponse {
    pub answer: String,
    pub source: AnswerSource,
}

impl ApiClient {
    #[must_use]
    pub fn agent_path(id: i64) -> String {
        format!("{AGENTS_PATH}/{id}")
    }

    #[must_use]
    pub fn agent_action_path(id: i64, action: &str) -> String {
        format!("{AGENTS_PATH}/{id}/{}", action.trim())
    }

    pub async fn list_agents(&self) -> ClientResult<Vec<Agent>> {
        self.get_data(AGENTS_PATH, LIST_AGENTS_FAILED).await
    }

    pub async fn get_agent(&self, id: i64) -> ClientResult<Agent> {
        self.get_data(Self::agent_path(id).as_str(), GET_AGENT_FAILED)
            .await
    }

    pub async fn create_agent(&self, draft: &AgentDraft) -> ClientResult<Agent> {
        self.fetch_data(
            Method::POST,
            AGENTS_PATH,
            RequestBody::json(draft)?,
            RequestOptions::new(),
            CREATE_AGENT_FAILED,
        )
        .await
    }

    pub async fn update_agent(&self, id: i64, draft: &AgentDraft) -> ClientResult<Agent> {
        self.fetch_data(
            Method::PUT,
            Self::agent_path(id).as_str(),
            RequestBody::json(draft)?,
            RequestOptions::new(),
            UPDATE_AGENT_FAILED,
        )
        .await
    }

    pub async fn delete_agent(&self, id: i64) -> ClientResult<()> {
        self.delete_unit(Self::agent_path(id).as_str(), DELETE_AGENT_FAILED)
            .await
    }

    /// Runs a one-off question against a draft agent and returns the answer.
    pub async fn test_agent(&self, id: i64, question: &str) -> ClientResult<String> {
        let response: TestAgentResponse = self
            .fetch_data(
                Method::POST,
                Self::agent_action_path(id, "test").as_str(),
                RequestBody::json(&QuestionRequest { question })?,
                RequestOptions::new(),
                TEST_AGENT_FAILED,
            )
            .await?;
        Ok(response.answer)
    }

    pub async fn publish_agent(&self, id: i64) -> ClientResult<Agent> {
        self.fetch_data(
            Method::POST,
            Self::agent_action_path(id, "publish").as_str(),
            RequestBody::Json(serde_json::json!({})),
            RequestOptions::new(),
            PUBLISH_AGENT_FAILED,
        )
        .await
    }

    pub async fn chat_with_agent(&self, id: i64, question: &str) -> ClientResult<ChatResponse> {
        self.fetch_data(
            Method::POST,
            Self::agent_action_path(id, "chat").as_str(),
            RequestBody::json(&QuestionRequest { question })?,
            RequestOptions::new(),
            CHAT_FAILED,
        )
        .await
    }
}
