// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! reqwest-backed client for the CleanProof REST API.

use super::{ApiError, ProofApi};
use async_trait::async_trait;
use cp_core::{CheckEvent, ChecklistUpdate, Job, JobId, PhotoId, PhotoKind, PhotoMetadata};
use reqwest::multipart::{Form, Part};
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::debug;

pub const IDEMPOTENCY_HEADER: &str = "Idempotency-Key";

#[derive(Serialize)]
struct ChecklistBody<'a> {
    items: &'a [ChecklistUpdate],
}

#[derive(Deserialize)]
struct PhotoCreated {
    id: PhotoId,
}

/// HTTP client with bearer-token auth.
#[derive(Clone)]
pub struct HttpProofApi {
    http: Client,
    base_url: String,
    token: Option<String>,
}

impl HttpProofApi {
    /// `timeout` bounds each whole request, connect through body.
    pub fn new(
        base_url: impl Into<String>,
        token: Option<String>,
        timeout: Duration,
    ) -> Result<Self, ApiError> {
        let http = Client::builder()
            .user_agent(concat!("cleanproof/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()
            .map_err(|e| ApiError::Network(e.to_string()))?;
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Ok(Self { http, base_url, token })
    }

    fn url(&self, job_id: &JobId, suffix: &str) -> String {
        format!("{}/jobs/{}{}", self.base_url, job_id, suffix)
    }

    fn authed(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response, ApiError> {
        let response = self.authed(request).send().await.map_err(transport_error)?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        debug!(status = status.as_u16(), %body, "request failed");
        Err(ApiError::from_status(status.as_u16(), body))
    }

    async fn send_json<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, ApiError> {
        let response = self.send(request).await?;
        let body = response.bytes().await.map_err(transport_error)?;
        serde_json::from_slice(&body).map_err(|e| ApiError::Decode(e.to_string()))
    }

    /// A 2xx on a mutation means the server applied it. A reply that cannot
    /// be read is retried under the same idempotency key, never rejected.
    async fn send_mutation<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
    ) -> Result<T, ApiError> {
        self.send_json(request).await.map_err(|e| match e {
            ApiError::Decode(reason) => {
                debug!(%reason, "unreadable reply to applied mutation");
                ApiError::Network(format!("unreadable reply: {reason}"))
            }
            other => other,
        })
    }
}

fn transport_error(e: reqwest::Error) -> ApiError {
    if e.is_timeout() {
        ApiError::Timeout
    } else {
        ApiError::Network(e.to_string())
    }
}

fn photo_form(
    kind: PhotoKind,
    bytes: Vec<u8>,
    file_name: String,
    metadata: Option<&PhotoMetadata>,
) -> Result<Form, ApiError> {
    let part = Part::bytes(bytes)
        .file_name(file_name)
        .mime_str("image/jpeg")
        .map_err(|e| ApiError::Decode(e.to_string()))?;
    let mut form = Form::new().text("photo_type", kind.to_string()).part("file", part);
    if let Some(metadata) = metadata {
        form = form.text("taken_at", metadata.taken_at_ms.to_string());
        if let Some(at) = metadata.coordinates {
            form = form
                .text("latitude", at.latitude.to_string())
                .text("longitude", at.longitude.to_string());
        }
    }
    Ok(form)
}

#[async_trait]
impl ProofApi for HttpProofApi {
    async fn fetch_job(&self, job_id: &JobId) -> Result<Job, ApiError> {
        self.send_json(self.http.get(self.url(job_id, ""))).await
    }

    async fn record_check(
        &self,
        job_id: &JobId,
        event: &CheckEvent,
        idempotency_key: &str,
    ) -> Result<Job, ApiError> {
        let url = self.url(job_id, &format!("/{}", event.kind.path_segment()));
        let request = self.http.post(url).header(IDEMPOTENCY_HEADER, idempotency_key).json(event);
        self.send_mutation(request).await
    }

    async fn update_checklist(
        &self,
        job_id: &JobId,
        items: &[ChecklistUpdate],
        idempotency_key: &str,
    ) -> Result<(), ApiError> {
        let request = self
            .http
            .patch(self.url(job_id, "/checklist"))
            .header(IDEMPOTENCY_HEADER, idempotency_key)
            .json(&ChecklistBody { items });
        self.send(request).await?;
        Ok(())
    }

    async fn upload_photo(
        &self,
        job_id: &JobId,
        kind: PhotoKind,
        file: &Path,
        metadata: Option<&PhotoMetadata>,
        idempotency_key: &str,
    ) -> Result<PhotoId, ApiError> {
        let bytes = tokio::fs::read(file)
            .await
            .map_err(|e| ApiError::LocalFile(format!("{}: {e}", file.display())))?;
        let file_name = file
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "photo.jpg".to_string());
        let form = photo_form(kind, bytes, file_name, metadata)?;
        let request = self
            .http
            .post(self.url(job_id, "/photos"))
            .header(IDEMPOTENCY_HEADER, idempotency_key)
            .multipart(form);
        let created: PhotoCreated = self.send_mutation(request).await?;
        Ok(created.id)
    }
}
