use reqwest::Method;
use serde::{Deserialize, Serialize};

use crate::error::ClientResult;
use crate::http::{ApiClient, MultipartForm, RequestBody, RequestOptions};

pub const KNOWLEDGE_BASES_PATH: &str = "/v1/knowledge-bases";

pub const LIST_KNOWLEDGE_BASES_FAILED: &str = "failed to load knowledge base list";
pub const GET_KNOWLEDGE_BASE_FAILED: &str = "failed to load knowledge base details";
pub const CREATE_KNOWLEDGE_BASE_FAILED: &str = "failed to create knowledge base";
pub const UPDATE_KNOWLEDGE_BASE_FAILED: &str = "failed to update knowledge base";
pub const DELETE_KNOWLEDGE_BASE_FAILED: &str = "failed to delete knowledge base";
pub const LIST_DOCUMENTS_FAILED: &str = "failed to load document list";
pub const GET_DOCUMENT_FAILED: &str = "failed to load document details";
pub const UPLOAD_DOCUMENT_FAILED: &str = "failed to upload document";
pub const DELETE_DOCUMENT_FAILED: &str = "failed to delete document";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KnowledgeBase {
    pub id: i64,
    pub user_id: i64,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct KnowledgeBaseDraft {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentStatus {
    Processing,
    Processed,
    Failed,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KnowledgeDocument {
    pub id: i64,
    pub knowledge_base_id: i64,
    pub user_id: i64,
    pub file_name: String,
    #[serde(default)]
    pub file_type: Option<String>,
    #[serde(default)]
    pub file_size: u64,
    pub status: DocumentStatus,
    #[serde(default)]
    pub chunk_count: u64,
    #[serde(default)]
    pub vectorized: bool,
    #[serde(default)]
    pub error_message: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
}

/// File contents to attach as the `file` form field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentUpload {
    pub file_name: String,
    pub bytes: Vec<u8>,
    pub mime: Option<String>,
}

impl DocumentUpload {
    fn into_form(self) -> MultipartForm {
        MultipartForm::new().file("file", self.file_name, self.bytes, self.mime.as_deref())
    }
}

impl ApiClient {
    #[must_use]
    pub fn knowledge_base_path(id: i64) -> String {
        format!("{KNOWLEDGE_BASES_PATH}/{id}")
    }

    #[must_use]
    pub fn documents_path(knowledge_base_id: i64) -> String {
        format!("{KNOWLEDGE_BASES_PATH}/{knowledge_base_id}/documents")
    }

    #[must_use]
    pub fn document_path(knowledge_base_id: i64, document_id: i64) -> String {
        format!("{KNOWLEDGE_BASES_PATH}/{knowledge_base_id}/documents/{document_id}")
    }

    #[must_use]
    pub fn document_upload_path(knowledge_base_id: i64) -> String {
        format!("{KNOWLEDGE_BASES_PATH}/{knowledge_base_id}/documents/upload")
    }

    pub async fn list_knowledge_bases(&self) -> ClientResult<Vec<KnowledgeBase>> {
        self.get_data(KNOWLEDGE_BASES_PATH, LIST_KNOWLEDGE_BASES_FAILED)
            .await
    }

    pub async fn get_knowledge_base(&self, id: i64) -> ClientResult<KnowledgeBase> {
        self.get_data(
            Self::knowledge_base_path(id).as_str(),
            GET_KNOWLEDGE_BASE_FAILED,
        )
        .await
    }

    pub async fn create_knowledge_base(
        &self,
        draft: &KnowledgeBaseDraft,
    ) -> ClientResult<KnowledgeBase> {
        self.fetch_data(
            Method::POST,
            KNOWLEDGE_BASES_PATH,
            RequestBody::json(draft)?,
            RequestOptions::new(),
            CREATE_KNOWLEDGE_BASE_FAILED,
        )
        .await
    }

    pub async fn update_knowledge_base(
        &self,
        id: i64,
        draft: &KnowledgeBaseDraft,
    ) -> ClientResult<KnowledgeBase> {
        self.fetch_data(
            Method::PUT,
            Self::knowledge_base_path(id).as_str(),
            RequestBody::json(draft)?,
            RequestOptions::new(),
            UPDATE_KNOWLEDGE_BASE_FAILED,
        )
        .await
    }

    pub async fn delete_knowledge_base(&self, id: i64) -> ClientResult<()> {
        self.delete_unit(
            Self::knowledge_base_path(id).as_str(),
            DELETE_KNOWLEDGE_BASE_FAILED,
        )
        .await
    }

    pub async fn list_documents(&self, knowledge_base_id: i64) -> ClientResult<Vec<KnowledgeDocument>> {
        self.get_data(
            Self::documents_path(knowledge_base_id).as_str(),
            LIST_DOCUMENTS_FAILED,
        )
        .await
    }

    pub async fn get_document(
        &self,
        knowledge_base_id: i64,
        document_id: i64,
    ) -> ClientResult<KnowledgeDocument> {
        self.get_data(
            Self::document_path(knowledge_base_id, document_id).as_str(),
            GET_DOCUMENT_FAILED,
        )
        .await
    }

    pub async fn upload_document(
        &self,
        knowledge_base_id: i64,
        upload: DocumentUpload,
    ) -> ClientResult<KnowledgeDocument> {
        self.fetch_data(
            Method::POST,
            Self::document_upload_path(knowledge_base_id).as_str(),
            RequestBody::Multipart(upload.into_form()),
            RequestOptions::new(),
            UPLOAD_DOCUMENT_FAILED,
        )
        .await
    }

    pub async fn delete_document(
        &self,
        knowledge_base_id: i64,
        document_id: i64,
    ) -> ClientResult<()> {
        self.delete_unit(
            Self::document_path(knowledge_base_id, document_id).as_str(),
            DELETE_DOCUMENT_FAILED,
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn path_helpers_are_deterministic() {
        assert_eq!(ApiClient::knowledge_base_path(4), "/v1/knowledge-bases/4");
        assert_eq!(
            ApiClient::documents_path(4),
            "/v1/knowledge-bases/4/documents"
        );
        assert_eq!(
            ApiClient::document_path(4, 9),
            "/v1/knowledge-bases/4/documents/9"
        );
        assert_eq!(
            ApiClient::document_upload_path(4),
            "/v1/knowledge-bases/4/documents/upload"
        );
    }

    #[test]
    fn document_decodes_processing_state() {
        let document: KnowledgeDocument = serde_json::from_value(json!({
            "id": 9,
            "knowledgeBaseId": 4,
            "userId": 1,
            "fileName": "handbook.pdf",
            "fileType": "application/pdf",
            "fileSize": 2048,
            "status": "failed",
            "chunkCount": 0,
            "vectorized": false,
            "errorMessage": "embedding quota exceeded"
        }))
        .expect("document");
        assert_eq!(document.status, DocumentStatus::Failed);
        assert_eq!(
            document.error_message.as_deref(),
            Some("embedding quota exceeded")
        );
    }

    #[test]
    fn upload_uses_the_file_field() {
        let upload = DocumentUpload {
            file_name: "notes.md".to_string(),
            bytes: b"# notes".to_vec(),
            mime: Some("text/markdown".to_string()),
        };
        assert_eq!(upload.into_form().field_names(), vec!["file"]);
    }
}
