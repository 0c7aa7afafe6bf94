//! Upload collaborator
//!
//! The core treats uploads as opaque: a ledger goes in, an envelope with
//! asset references comes out. Any failure aborts analysis before the audit
//! agent is ever called.

use crate::models::{AssetReference, LedgerFile, UploadOutcome};
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use serde::Deserialize;
use std::env;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{error, info};

#[async_trait]
pub trait Uploader: Send + Sync {
    async fn upload(&self, file: &LedgerFile) -> UploadOutcome;
}

//
// ================= HTTP Implementation =================
//

#[derive(Debug, Deserialize)]
struct UploadResponse {
    success: bool,
    #[serde(default)]
    asset_ids: Vec<String>,
    error: Option<String>,
}

/// Multipart uploader against the asset endpoint
pub struct HttpUploader {
    client: Client,
    upload_url: String,
    api_key: Option<String>,
}

impl HttpUploader {
    pub fn new(upload_url: String, api_key: Option<String>) -> crate::Result<Self> {
        let client = Client::builder()
            .pool_idle_timeout(Duration::from_secs(90))
            .build()?;

        Ok(Self {
            client,
            upload_url,
            api_key,
        })
    }

    pub fn from_env() -> crate::Result<Self> {
        let upload_url = env::var("SPENDSENSE_UPLOAD_URL")
            .unwrap_or_else(|_| "https://api.spendsense.app/v1/assets".to_string());
        Self::new(upload_url, env::var("SPENDSENSE_API_KEY").ok())
    }

    async fn send(&self, file: &LedgerFile) -> Result<UploadResponse, String> {
        let part = Part::text(file.content.clone())
            .file_name(file.name.clone())
            .mime_str(file.mime_hint.as_deref().unwrap_or("text/csv"))
            .map_err(|e| format!("invalid mime hint: {}", e))?;
        let form = Form::new().part("file", part);

        let mut builder = self.client.post(&self.upload_url).multipart(form);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| format!("upload request failed: {}", e))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(format!("upload API returned {}: {}", status, body));
        }

        response
            .json::<UploadResponse>()
            .await
            .map_err(|e| format!("malformed upload response: {}", e))
    }
}

#[async_trait]
impl Uploader for HttpUploader {
    async fn upload(&self, file: &LedgerFile) -> UploadOutcome {
        info!(name = %file.name, size_bytes = file.size_bytes, "uploading ledger");

        match self.send(file).await {
            Ok(wire) if wire.success => UploadOutcome {
                succeeded: true,
                asset_references: wire.asset_ids.into_iter().map(AssetReference).collect(),
                error_message: None,
            },
            Ok(wire) => UploadOutcome {
                succeeded: false,
                asset_references: Vec::new(),
                error_message: Some(
                    wire.error.unwrap_or_else(|| "file upload failed".to_string()),
                ),
            },
            Err(message) => {
                error!(error = %message, "upload failed");
                UploadOutcome {
                    succeeded: false,
                    asset_references: Vec::new(),
                    error_message: Some(message),
                }
            }
        }
    }
}

//
// ================= Mock Implementation =================
//

/// Scripted uploader for development and testing; records upload count
pub struct MockUploader {
    outcome: UploadOutcome,
    uploads: Mutex<Vec<String>>,
}

impl MockUploader {
    /// Uploader that always succeeds with one asset reference
    pub fn succeeding() -> Self {
        Self {
            outcome: UploadOutcome {
                succeeded: true,
                asset_references: vec![AssetReference("asset-mock-1".to_string())],
                error_message: None,
            },
            uploads: Mutex::new(Vec::new()),
        }
    }

    /// Uploader that always fails with the given message
    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            outcome: UploadOutcome {
                succeeded: false,
                asset_references: Vec::new(),
                error_message: Some(message.into()),
            },
            uploads: Mutex::new(Vec::new()),
        }
    }

    /// File names uploaded so far, in order
    pub async fn uploads(&self) -> Vec<String> {
        self.uploads.lock().await.clone()
    }
}

#[async_trait]
impl Uploader for MockUploader {
    async fn upload(&self, file: &LedgerFile) -> UploadOutcome {
        self.uploads.lock().await.push(file.name.clone());
        self.outcome.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_uploader_outcomes() {
        let ledger = LedgerFile::new("t.csv", None, "a,b\n1,2").unwrap();

        let ok = MockUploader::succeeding();
        let outcome = ok.upload(&ledger).await;
        assert!(outcome.succeeded);
        assert_eq!(outcome.asset_references.len(), 1);
        assert_eq!(ok.uploads().await, vec!["t.csv"]);

        let failed = MockUploader::failing("disk full");
        let outcome = failed.upload(&ledger).await;
        assert!(!outcome.succeeded);
        assert!(outcome.asset_references.is_empty());
        assert_eq!(outcome.error_message.as_deref(), Some("disk full"));
    }

    #[test]
    fn test_upload_response_deserializes() {
        let wire: UploadResponse = serde_json::from_str(
            r#"{"success":true,"asset_ids":["a1","a2"]}"#,
        )
        .unwrap();
        assert!(wire.success);
        assert_eq!(wire.asset_ids, vec!["a1", "a2"]);

        let failed: UploadResponse =
            serde_json::from_str(r#"{"success":false,"error":"too large"}"#).unwrap();
        assert!(!failed.success);
        assert!(failed.asset_ids.is_empty());
    }
}
