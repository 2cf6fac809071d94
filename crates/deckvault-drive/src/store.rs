//! REST adapter for the external drive service.
//!
//! The drive service exposes two endpoints: `POST /organize` (multipart file
//! placement) and `POST /scan` (bulk scan rooted at a folder id). Its actual
//! folder logic is out of scope here; the adapter only maps transport and
//! status outcomes onto `OrganizeError`.

use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use deckvault_core::{DriveStore, OrganizeError, OrganizeResult, StagedFile};
use reqwest::multipart::{Form, Part};
use reqwest::{Client, StatusCode};
use tracing::debug;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// HTTP client for the external drive service.
#[derive(Clone)]
pub struct RestDriveStore {
    client: Client,
    base_url: String,
}

impl RestDriveStore {
    /// Build a client against the drive service base URL.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying HTTP client cannot be constructed.
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    async fn check_response(response: reqwest::Response) -> OrganizeResult<()> {
        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        let body = response.text().await.unwrap_or_default();
        let detail = if body.is_empty() {
            format!("drive returned {status}")
        } else {
            format!("drive returned {status}: {body}")
        };
        if status == StatusCode::SERVICE_UNAVAILABLE || status == StatusCode::GATEWAY_TIMEOUT {
            return Err(OrganizeError::Unavailable {
                source: detail.into(),
            });
        }
        Err(OrganizeError::Rejected { detail })
    }
}

#[async_trait]
impl DriveStore for RestDriveStore {
    async fn organize(
        &self,
        file: &StagedFile,
        destination_folder_id: &str,
    ) -> OrganizeResult<()> {
        let payload = tokio::fs::read(file.path())
            .await
            .map_err(|err| OrganizeError::Unavailable {
                source: Box::new(err),
            })?;
        let form = Form::new()
            .part(
                "file",
                Part::bytes(payload).file_name(file.name().to_string()),
            )
            .text(
                "destination_folder_id",
                destination_folder_id.to_string(),
            );

        debug!(
            file_name = %file.name(),
            destination = %destination_folder_id,
            "submitting organize request"
        );
        let response = self
            .client
            .post(format!("{}/organize", self.base_url))
            .multipart(form)
            .send()
            .await
            .map_err(|err| OrganizeError::Unavailable {
                source: Box::new(err),
            })?;
        Self::check_response(response).await
    }

    async fn scan_folder(&self, root_folder_id: &str) -> OrganizeResult<()> {
        debug!(root = %root_folder_id, "submitting scan request");
        let response = self
            .client
            .post(format!("{}/scan", self.base_url))
            .json(&serde_json::json!({ "root_folder_id": root_folder_id }))
            .send()
            .await
            .map_err(|err| OrganizeError::Unavailable {
                source: Box::new(err),
            })?;
        Self::check_response(response).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_trailing_slash_is_normalised() {
        let store = RestDriveStore::new("http://drive.local/api/").expect("client");
        assert_eq!(store.base_url, "http://drive.local/api");
    }
}
