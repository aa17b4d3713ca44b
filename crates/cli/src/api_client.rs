//! Thin HTTP client for the Airlift upload protocol.

use anyhow::{Context, Result};
use reqwest::Url;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use serde_json::Value;

/// Progress counters returned by a chunk upload.
#[derive(Debug, Deserialize)]
pub struct ChunkProgress {
    pub chunk_index: u32,
    pub chunks_received: u32,
    pub total_chunks: u32,
}

/// Receipt returned by a successful finalize.
#[derive(Debug, Deserialize)]
pub struct FinalizeReceipt {
    pub video_id: String,
    pub filename: String,
    pub coins_deducted: i64,
    pub new_balance: i64,
}

/// Parameters for starting an upload session.
#[derive(Debug, Clone)]
pub struct InitParams {
    pub station_id: String,
    pub filename: String,
    pub filesize: u64,
    pub title: String,
    pub content_type: String,
    pub priority: Option<u32>,
}

#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: Url,
}

impl ApiClient {
    pub fn new(base_url: &str) -> Result<Self> {
        let base_url = Url::parse(base_url).context("invalid server URL")?;
        Ok(Self {
            http: reqwest::Client::new(),
            base_url,
        })
    }

    fn url(&self, path: &str) -> Result<Url> {
        self.base_url.join(path).context("failed to build API URL")
    }

    /// Send a multipart form and unwrap the in-band envelope: the server
    /// answers HTTP 200 for errors too, with `success:false` in the body.
    async fn post_form(&self, path: &str, form: Form) -> Result<Value> {
        let url = self.url(path)?;
        let response = self.http.post(url).multipart(form).send().await?;
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        if !status.is_success() {
            anyhow::bail!("transport error ({}): {}", status, body);
        }

        let value: Value =
            serde_json::from_str(&body).with_context(|| format!("invalid response: {body}"))?;
        if value["success"] != Value::Bool(true) {
            let message = value["error"].as_str().unwrap_or("unknown error");
            anyhow::bail!("server rejected request: {message}");
        }
        Ok(value)
    }

    /// Start an upload session; returns the upload id.
    pub async fn init(&self, params: &InitParams) -> Result<String> {
        let mut form = Form::new()
            .text("station_id", params.station_id.clone())
            .text("filename", params.filename.clone())
            .text("filesize", params.filesize.to_string())
            .text("title", params.title.clone())
            .text("content_type", params.content_type.clone());
        if let Some(priority) = params.priority {
            form = form.text("priority", priority.to_string());
        }

        let value = self.post_form("/v1/upload/init", form).await?;
        value["upload_id"]
            .as_str()
            .map(String::from)
            .context("response missing upload_id")
    }

    /// Upload one chunk.
    pub async fn upload_chunk(
        &self,
        upload_id: &str,
        index: u32,
        total: u32,
        data: Vec<u8>,
    ) -> Result<ChunkProgress> {
        let form = Form::new()
            .text("upload_id", upload_id.to_string())
            .text("chunk_index", index.to_string())
            .text("total_chunks", total.to_string())
            .part("chunk", Part::bytes(data).file_name("blob"));

        let value = self.post_form("/v1/upload/chunk", form).await?;
        serde_json::from_value(value).context("invalid chunk response")
    }

    /// Finalize the upload: assemble and settle.
    pub async fn finalize(&self, upload_id: &str) -> Result<FinalizeReceipt> {
        let form = Form::new().text("upload_id", upload_id.to_string());
        let value = self.post_form("/v1/upload/finalize", form).await?;
        serde_json::from_value(value).context("invalid finalize response")
    }

    /// Cancel the upload and drop its staged chunks.
    pub async fn cancel(&self, upload_id: &str) -> Result<()> {
        let form = Form::new().text("upload_id", upload_id.to_string());
        self.post_form("/v1/upload/cancel", form).await?;
        Ok(())
    }
}
