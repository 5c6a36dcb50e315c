use reqwest::Method;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::ClientResult;
use crate::http::{ApiClient, RequestBody, RequestOptions};

pub const WORKFLOWS_PATH: &str = "/v1/workflows";

pub const LIST_WORKFLOWS_FAILED: &str = "failed to load workflow list";
pub const GET_WORKFLOW_FAILED: &str = "failed to load workflow details";
pub const CREATE_WORKFLOW_FAILED: &str = "failed to create workflow";
pub const UPDATE_WORKFLOW_FAILED: &str = "failed to update workflow";
pub const DELETE_WORKFLOW_FAILED: &str = "failed to delete workflow";
pub const EXECUTE_WORKFLOW_FAILED: &str = "failed to execute workflow";
pub const LIST_EXECUTIONS_FAILED: &str = "failed to load execution records";
pub const GET_EXECUTION_FAILED: &str = "failed to load execution record details";

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NodePosition {
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowNode {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config: Option<Map<String, Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<NodePosition>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowEdge {
    pub id: String,
    pub source: String,
    pub target: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorkflowDefinition {
    #[serde(default)]
    pub nodes: Vec<WorkflowNode>,
    #[serde(default)]
    pub edges: Vec<WorkflowEdge>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Workflow {
    pub id: i64,
    pub user_id: i64,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub definition: WorkflowDefinition,
    pub status: String,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowDraft {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub definition: WorkflowDefinition,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecuteWorkflowRequest {
    pub input_params: Map<String, Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionStatus {
    Pending,
    Running,
    Completed,
    Failed,
    #[serde(other)]
    Unknown,
}

impl ExecutionStatus {
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowExecution {
    pub id: i64,
    pub workflow_id: i64,
    pub user_id: i64,
    pub status: ExecutionStatus,
    #[serde(default)]
    pub input_params: Option<Map<String, Value>>,
    #[serde(default)]
    pub output_result: Option<Map<String, Value>>,
    #[serde(default)]
    pub error_message: Option<String>,
    #[serde(default)]
    pub started_at: Option<String>,
    #[serde(default)]
    pub completed_at: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
}

impl ApiClient {
    #[must_use]
    pub fn workflow_path(id: i64) -> String {
        format!("{WORKFLOWS_PATH}/{id}")
    }

    #[must_use]
    pub fn executions_path(workflow_id: i64) -> String {
        format!("{WORKFLOWS_PATH}/{workflow_id}/executions")
    }

    #[must_use]
    pub fn execution_path(workflow_id: i64, execution_id: i64) -> String {
        format!("{WORKFLOWS_PATH}/{workflow_id}/executions/{execution_id}")
    }

    pub async fn list_workflows(&self) -> ClientResult<Vec<Workflow>> {
        self.get_data(WORKFLOWS_PATH, LIST_WORKFLOWS_FAILED).await
    }

    pub async fn get_workflow(&self, id: i64) -> ClientResult<Workflow> {
        self.get_data(Self::workflow_path(id).as_str(), GET_WORKFLOW_FAILED)
            .await
    }

    pub async fn create_workflow(&self, draft: &WorkflowDraft) -> ClientResult<Workflow> {
        self.fetch_data(
            Method::POST,
            WORKFLOWS_PATH,
            RequestBody::json(draft)?,
            RequestOptions::new(),
            CREATE_WORKFLOW_FAILED,
        )
        .await
    }

    pub async fn update_workflow(&self, id: i64, draft: &WorkflowDraft) -> ClientResult<Workflow> {
        self.fetch_data(
            Method::PUT,
            Self::workflow_path(id).as_str(),
            RequestBody::json(draft)?,
            RequestOptions::new(),
            UPDATE_WORKFLOW_FAILED,
        )
        .await
    }

    pub async fn delete_workflow(&self, id: i64) -> ClientResult<()> {
        self.delete_unit(Self::workflow_path(id).as_str(), DELETE_WORKFLOW_FAILED)
            .await
    }

    pub async fn execute_workflow(
        &self,
        workflow_id: i64,
        request: &ExecuteWorkflowRequest,
    ) -> ClientResult<WorkflowExecution> {
        self.fetch_data(
            Method::POST,
            Self::executions_path(workflow_id).as_str(),
            RequestBody::json(request)?,
            RequestOptions::new(),
            EXECUTE_WORKFLOW_FAILED,
        )
        .await
    }

    pub async fn list_workflow_executions(
        &self,
        workflow_id: i64,
    ) -> ClientResult<Vec<WorkflowExecution>> {
        self.get_data(
            Self::executions_path(workflow_id).as_str(),
            LIST_EXECUTIONS_FAILED,
        )
        .await
    }

    pub async fn get_workflow_execution(
        &self,
        workflow_id: i64,
        execution_id: i64,
    ) -> ClientResult<WorkflowExecution> {
        self.get_data(
            Self::execution_path(workflow_id, execution_id).as_str(),
            GET_EXECUTION_FAILED,
        )
        .await
    }
}
