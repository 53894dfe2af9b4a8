//! # Firestore REST backend
//!
//! [`FirestoreStore`] talks to the Firestore v1 REST API (or the local emulator)
//! with [`reqwest`]. Only what the migration needs is implemented:
//!
//! | Operation | Endpoint |
//! |-----------|----------|
//! | [`list_documents`](DocumentStore::list_documents) | `GET {root}/{collection}?pageSize=..&pageToken=..`, following `nextPageToken` |
//! | [`get_document`](DocumentStore::get_document) | `GET {root}/{document}` (404 → `None`) |
//! | [`commit`](DocumentStore::commit) | `POST {root}:commit` |
//!
//! where `{root}` is `projects/{project}/databases/{database}/documents`.
//!
//! ## Write encoding
//!
//! Both op kinds become `update` writes restricted by an `updateMask`, so fields
//! outside the mask are never rewritten:
//!
//! - [`WriteOp::Merge`]: `fields` carries the new values, the mask lists their names.
//! - [`WriteOp::DeleteFields`]: `fields` is empty, the mask lists the names to drop, and
//!   a `currentDocument.exists = true` precondition makes the commit fail on a
//!   missing document instead of creating an empty one.
//!
//! ## Auth
//!
//! Requests carry `Authorization: Bearer {access_token}` when a token is
//! configured. Against the emulator without a token, the emulator's `owner`
//! token is sent so security rules are bypassed. Minting tokens from service
//! account keys is left to external tooling (e.g. `gcloud auth print-access-token`).

pub mod value;

use std::future::Future;

use reqwest::{Method, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use serde_json::{json, Map, Value};

use crate::backend::{check_batch_len, DocumentStore, MAX_BATCH_SIZE};
use crate::error::StoreError;
use crate::models::{Document, WriteOp};
use crate::path::{CollectionPath, DocumentPath};

const PRODUCTION_API: &str = "https://firestore.googleapis.com/v1";
const EMULATOR_TOKEN: &str = "owner";
const PAGE_SIZE: u32 = 300;

/// Connection settings for [`FirestoreStore`].
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct FirestoreConfig {
    #[serde(default)]
    pub project_id: String,
    #[serde(default = "default_database")]
    pub database: String,
    #[serde(default)]
    pub access_token: Option<String>,
    /// `host:port` of a local emulator. Plain HTTP is used when set.
    #[serde(default)]
    pub emulator_host: Option<String>,
}

fn default_database() -> String {
    "(default)".to_string()
}

impl Default for FirestoreConfig {
    fn default() -> Self {
        Self {
            project_id: String::new(),
            database: default_database(),
            access_token: None,
            emulator_host: None,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListDocumentsResponse {
    #[serde(default)]
    documents: Vec<RawDocument>,
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawDocument {
    name: String,
    #[serde(default)]
    fields: Map<String, Value>,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    message: String,
}

/// Firestore REST-backed DocumentStore.
#[derive(Clone, Debug)]
pub struct FirestoreStore {
    client: reqwest::Client,
    api_root: String,
    documents_root: String,
    token: Option<String>,
}

impl FirestoreStore {
    pub fn new(config: &FirestoreConfig) -> Result<Self, StoreError> {
        if config.project_id.is_empty() {
            return Err(StoreError::Config("firestore project id is not set".to_string()));
        }

        let (api_root, token) = match &config.emulator_host {
            Some(host) => (
                format!("http://{host}/v1"),
                config
                    .access_token
                    .clone()
                    .or_else(|| Some(EMULATOR_TOKEN.to_string())),
            ),
            None => (PRODUCTION_API.to_string(), config.access_token.clone()),
        };

        let client = reqwest::Client::builder()
            .user_agent(concat!("movie-notes-migrate/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            api_root,
            documents_root: format!(
                "projects/{}/databases/{}/documents",
                config.project_id, config.database
            ),
            token,
        })
    }

    /// Fully-qualified resource name of a document.
    pub fn document_name(&self, path: &DocumentPath) -> String {
        format!("{}/{}", self.documents_root, path)
    }

    fn url(&self, relative: &str) -> String {
        format!("{}/{}/{}", self.api_root, self.documents_root, relative)
    }

    fn request(&self, method: Method, url: &str) -> RequestBuilder {
        let builder = self.client.request(method, url);
        match &self.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    fn to_document(&self, raw: RawDocument) -> Result<Document, StoreError> {
        let prefix = format!("{}/", self.documents_root);
        let relative = raw
            .name
            .strip_prefix(&prefix)
            .ok_or_else(|| StoreError::InvalidPath(raw.name.clone()))?;
        let path: DocumentPath = relative.parse()?;
        Ok(Document::new(path, value::decode_fields(&raw.fields)?))
    }

    /// Interprets the response to a single-document GET. 404 means the
    /// document does not exist.
    fn read_document(&self, status: StatusCode, body: &str) -> Result<Option<Document>, StoreError> {
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            return Err(rejection(status, body));
        }
        let raw: RawDocument = serde_json::from_str(body)?;
        self.to_document(raw).map(Some)
    }

    /// Requests pages from `fetch` until one comes back without a
    /// `nextPageToken`. The first call gets `None`.
    async fn collect_pages<F, Fut>(&self, mut fetch: F) -> Result<Vec<Document>, StoreError>
    where
        F: FnMut(Option<String>) -> Fut,
        Fut: Future<Output = Result<ListDocumentsResponse, StoreError>>,
    {
        let mut docs = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let page = fetch(page_token.take()).await?;
            for raw in page.documents {
                docs.push(self.to_document(raw)?);
            }

            match page.next_page_token.filter(|t| !t.is_empty()) {
                Some(next) => page_token = Some(next),
                None => break,
            }
        }
        Ok(docs)
    }

    async fn fetch_page(
        &self,
        url: &str,
        page_token: Option<String>,
    ) -> Result<ListDocumentsResponse, StoreError> {
        let mut request = self
            .request(Method::GET, url)
            .query(&[("pageSize", PAGE_SIZE.to_string())]);
        if let Some(token) = &page_token {
            request = request.query(&[("pageToken", token)]);
        }
        Ok(check(request.send().await?).await?.json().await?)
    }

    /// JSON body of a `:commit` request for `ops`.
    pub fn commit_body(&self, ops: &[WriteOp]) -> Value {
        let writes: Vec<Value> = ops
            .iter()
            .map(|op| match op {
                WriteOp::Merge { path, fields } => json!({
                    "update": {
                        "name": self.document_name(path),
                        "fields": value::encode_fields(fields),
                    },
                    "updateMask": {
                        "fieldPaths": fields.keys().map(|k| value::field_path(k)).collect::<Vec<_>>(),
                    },
                }),
                WriteOp::DeleteFields { path, fields } => json!({
                    "update": {
                        "name": self.document_name(path),
                        "fields": {},
                    },
                    "updateMask": {
                        "fieldPaths": fields.iter().map(|k| value::field_path(k)).collect::<Vec<_>>(),
                    },
                    "currentDocument": { "exists": true },
                }),
            })
            .collect();
        json!({ "writes": writes })
    }
}

impl From<reqwest::Error> for StoreError {
    fn from(e: reqwest::Error) -> Self {
        StoreError::Http(e.to_string())
    }
}

/// Maps a non-success response body to [`StoreError::Rejected`], preferring the
/// `error.message` of a Google API error envelope over the raw body.
fn rejection(status: StatusCode, body: &str) -> StoreError {
    let message = serde_json::from_str::<ErrorResponse>(body)
        .map(|e| e.error.message)
        .unwrap_or_else(|_| body.to_string());
    StoreError::Rejected {
        status: status.as_u16(),
        message,
    }
}

async fn check(response: Response) -> Result<Response, StoreError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(rejection(status, &body))
}

impl DocumentStore for FirestoreStore {
    async fn list_documents(
        &self,
        collection: &CollectionPath,
    ) -> Result<Vec<Document>, StoreError> {
        let url = self.url(&collection.to_string());
        let url = url.as_str();
        let docs = self
            .collect_pages(move |token| self.fetch_page(url, token))
            .await?;

        tracing::debug!(collection = %collection, count = docs.len(), "listed documents");
        Ok(docs)
    }

    async fn get_document(&self, path: &DocumentPath) -> Result<Option<Document>, StoreError> {
        let response = self
            .request(Method::GET, &self.url(&path.to_string()))
            .send()
            .await?;
        let status = response.status();
        let body = response.text().await?;
        self.read_document(status, &body)
    }

    async fn commit(&self, ops: Vec<WriteOp>) -> Result<(), StoreError> {
        if ops.is_empty() {
            return Ok(());
        }
        check_batch_len(ops.len(), MAX_BATCH_SIZE)?;

        let url = format!("{}/{}:commit", self.api_root, self.documents_root);
        let response = self
            .request(Method::POST, &url)
            .json(&self.commit_body(&ops))
            .send()
            .await?;
        check(response).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn emulator() -> FirestoreStore {
        FirestoreStore::new(&FirestoreConfig {
            project_id: "demo-movies".to_string(),
            emulator_host: Some("localhost:8080".to_string()),
            ..FirestoreConfig::default()
        })
        .unwrap()
    }

    #[test]
    fn test_requires_project_id() {
        let result = FirestoreStore::new(&FirestoreConfig::default());
        assert!(matches!(result, Err(StoreError::Config(_))));
    }

    #[test]
    fn test_emulator_endpoints() {
        let store = emulator();
        assert_eq!(store.api_root, "http://localhost:8080/v1");
        assert_eq!(store.token.as_deref(), Some("owner"));
        assert_eq!(
            store.url("users"),
            "http://localhost:8080/v1/projects/demo-movies/databases/(default)/documents/users"
        );
    }

    #[test]
    fn test_commit_body_masks_fields() {
        let store = emulator();
        let note = json!({"rating": 5, "review": ""});
        let ops = vec![
            WriteOp::merge(
                "users/u1/my_movies/m1".parse().unwrap(),
                note.as_object().cloned().unwrap(),
            ),
            WriteOp::delete_fields("users/u1".parse().unwrap(), ["movies"]),
        ];

        let root = "projects/demo-movies/databases/(default)/documents";
        assert_eq!(
            store.commit_body(&ops),
            json!({"writes": [
                {
                    "update": {
                        "name": format!("{root}/users/u1/my_movies/m1"),
                        "fields": {
                            "rating": {"integerValue": "5"},
                            "review": {"stringValue": ""},
                        },
                    },
                    "updateMask": {"fieldPaths": ["rating", "review"]},
                },
                {
                    "update": {"name": format!("{root}/users/u1"), "fields": {}},
                    "updateMask": {"fieldPaths": ["movies"]},
                    "currentDocument": {"exists": true},
                },
            ]})
        );
    }

    #[test]
    fn test_to_document_strips_resource_prefix() {
        let store = emulator();
        let raw = RawDocument {
            name: "projects/demo-movies/databases/(default)/documents/movies/m1".to_string(),
            fields: json!({"title": {"stringValue": "X"}})
                .as_object()
                .cloned()
                .unwrap(),
        };

        let doc = store.to_document(raw).unwrap();
        assert_eq!(doc.path.to_string(), "movies/m1");
        assert_eq!(doc.get("title"), Some(&json!("X")));
    }

    #[test]
    fn test_to_document_rejects_foreign_name() {
        let store = emulator();
        let raw = RawDocument {
            name: "projects/other/databases/(default)/documents/movies/m1".to_string(),
            fields: Map::new(),
        };
        assert!(matches!(store.to_document(raw), Err(StoreError::InvalidPath(_))));
    }

    fn page(value: Value) -> ListDocumentsResponse {
        serde_json::from_value(value).unwrap()
    }

    #[tokio::test]
    async fn test_collect_pages_follows_next_page_token() {
        let store = emulator();
        let root = "projects/demo-movies/databases/(default)/documents";
        let mut pages = vec![
            page(json!({
                "documents": [{"name": format!("{root}/movies/m1")}],
                "nextPageToken": "p2",
            })),
            page(json!({
                "documents": [{"name": format!("{root}/movies/m2")}],
                "nextPageToken": "",
            })),
        ]
        .into_iter();
        let mut requested = Vec::new();

        let docs = store
            .collect_pages(|token| {
                requested.push(token);
                let next = pages.next();
                async move { next.ok_or_else(|| StoreError::Decode("no more pages".to_string())) }
            })
            .await
            .unwrap();

        let ids: Vec<_> = docs.iter().map(|d| d.id().to_string()).collect();
        assert_eq!(ids, ["m1", "m2"]);
        assert_eq!(requested, [None, Some("p2".to_string())]);
    }

    #[tokio::test]
    async fn test_collect_pages_handles_empty_collection() {
        let store = emulator();
        let docs = store
            .collect_pages(|_| async { Ok(page(json!({}))) })
            .await
            .unwrap();
        assert!(docs.is_empty());
    }

    #[tokio::test]
    async fn test_collect_pages_stops_on_failed_page() {
        let store = emulator();
        let mut calls = 0;
        let result = store
            .collect_pages(|_| {
                calls += 1;
                async {
                    Err::<ListDocumentsResponse, _>(rejection(
                        StatusCode::SERVICE_UNAVAILABLE,
                        "backend down",
                    ))
                }
            })
            .await;
        assert!(matches!(result, Err(StoreError::Rejected { status: 503, .. })));
        assert_eq!(calls, 1);
    }

    #[test]
    fn test_rejection_prefers_api_error_message() {
        let body = r#"{"error": {"code": 400, "message": "Document name is invalid", "status": "INVALID_ARGUMENT"}}"#;
        match rejection(StatusCode::BAD_REQUEST, body) {
            StoreError::Rejected { status, message } => {
                assert_eq!(status, 400);
                assert_eq!(message, "Document name is invalid");
            }
            other => panic!("unexpected error {other:?}"),
        }

        match rejection(StatusCode::BAD_GATEWAY, "upstream timeout") {
            StoreError::Rejected { status, message } => {
                assert_eq!(status, 502);
                assert_eq!(message, "upstream timeout");
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn test_read_document_maps_status() {
        let store = emulator();
        let body = json!({
            "name": "projects/demo-movies/databases/(default)/documents/users/u1",
            "fields": {"name": {"stringValue": "Ann"}},
        })
        .to_string();

        let doc = store.read_document(StatusCode::OK, &body).unwrap().unwrap();
        assert_eq!(doc.path.to_string(), "users/u1");
        assert_eq!(doc.get("name"), Some(&json!("Ann")));

        let missing = r#"{"error": {"code": 404, "message": "not found"}}"#;
        assert!(store.read_document(StatusCode::NOT_FOUND, missing).unwrap().is_none());

        let denied = r#"{"error": {"code": 403, "message": "Missing or insufficient permissions."}}"#;
        assert!(matches!(
            store.read_document(StatusCode::FORBIDDEN, denied),
            Err(StoreError::Rejected { status: 403, .. })
        ));
    }
}
