//! Clients for the generative AI services behind script writing, storyboard
//! frames and video takes.
//!
//! Every call is a single request/response hop. Long-running jobs come back
//! as a [`ProviderJob`] that callers poll explicitly; nothing here retries.

use engine::bible::{Script, VisualStyle};
use engine::pricing::Provider;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::sync::Arc;

use crate::config::Config;
use crate::error::{AppError, AppResult};

pub mod openai;
pub mod replicate;
pub mod veo;

pub use openai::{OpenAiClient, SoraClient};
pub use replicate::ReplicateClient;
pub use veo::VeoClient;

#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{provider} API error: {status} - {body}")]
    Api {
        provider: Provider,
        status: u16,
        body: String,
    },

    #[error("{provider} returned an invalid response: {message}")]
    InvalidResponse { provider: Provider, message: String },
}

pub type ProviderResult<T> = Result<T, ProviderError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    Pending,
    Running,
    Succeeded,
    Failed,
}

impl JobState {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobState::Pending => "pending",
            JobState::Running => "running",
            JobState::Succeeded => "succeeded",
            JobState::Failed => "failed",
        }
    }
}

impl FromStr for JobState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(JobState::Pending),
            "running" => Ok(JobState::Running),
            "succeeded" => Ok(JobState::Succeeded),
            "failed" => Ok(JobState::Failed),
            other => Err(format!("unknown job state: {}", other)),
        }
    }
}

/// Provider-side view of an image or video job.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProviderJob {
    pub external_id: String,
    pub status: JobState,
    pub asset_url: Option<String>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ScriptRequest {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub logline: String,
    #[serde(default)]
    pub genre: Option<String>,
    #[serde(default)]
    pub target_runtime_secs: Option<f64>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub visual_style: Option<VisualStyle>,
}

#[derive(Debug, Clone)]
pub struct ScriptDraft {
    pub script: Script,
    pub total_tokens: u64,
}

#[derive(Debug, Clone)]
pub struct ImageRequest {
    pub prompt: String,
    pub aspect_ratio: String,
    pub reference_images: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct VideoRequest {
    pub prompt: String,
    pub duration_secs: f64,
    pub aspect_ratio: String,
}

#[async_trait::async_trait]
pub trait ScriptWriter: Send + Sync {
    fn model(&self) -> &str;

    async fn write_script(&self, request: &ScriptRequest) -> ProviderResult<ScriptDraft>;
}

#[async_trait::async_trait]
pub trait ImageGenerator: Send + Sync {
    fn model(&self) -> &str;

    async fn generate_image(&self, request: &ImageRequest) -> ProviderResult<ProviderJob>;

    async fn poll(&self, external_id: &str) -> ProviderResult<ProviderJob>;
}

#[async_trait::async_trait]
pub trait VideoGenerator: Send + Sync {
    fn provider(&self) -> Provider;

    fn model(&self) -> &str;

    /// Clip length the provider will actually render for a requested length.
    fn clip_seconds(&self, requested_secs: f64) -> f64;

    async fn submit_video(&self, request: &VideoRequest) -> ProviderResult<ProviderJob>;

    async fn poll(&self, external_id: &str) -> ProviderResult<ProviderJob>;
}

/// The configured clients. A provider without credentials is `None`.
#[derive(Clone, Default)]
pub struct Providers {
    pub script: Option<Arc<dyn ScriptWriter>>,
    pub images: Option<Arc<dyn ImageGenerator>>,
    pub sora: Option<Arc<dyn VideoGenerator>>,
    pub veo: Option<Arc<dyn VideoGenerator>>,
}

impl Providers {
    pub fn from_config(config: &Config) -> Self {
        let http = reqwest::Client::new();
        let mut providers = Providers::default();

        if let Some(api_key) = &config.openai.api_key {
            providers.script = Some(Arc::new(OpenAiClient::new(
                http.clone(),
                api_key,
                &config.openai.base_url,
                &config.openai.script_model,
            )));
            providers.sora = Some(Arc::new(SoraClient::new(
                http.clone(),
                api_key,
                &config.openai.base_url,
                &config.openai.sora_model,
            )));
        }
        if let Some(api_key) = &config.veo.api_key {
            providers.veo = Some(Arc::new(VeoClient::new(
                http.clone(),
                api_key,
                &config.veo.base_url,
                &config.veo.model,
            )));
        }
        if let Some(api_token) = &config.replicate.api_token {
            providers.images = Some(Arc::new(ReplicateClient::new(
                http,
                api_token,
                &config.replicate.base_url,
                &config.replicate.image_model,
            )));
        }

        providers
    }

    pub fn configured(&self) -> Vec<Provider> {
        let mut configured = Vec::new();
        if self.script.is_some() {
            configured.push(Provider::OpenAi);
        }
        if self.sora.is_some() {
            configured.push(Provider::Sora);
        }
        if self.veo.is_some() {
            configured.push(Provider::Veo3);
        }
        if self.images.is_some() {
            configured.push(Provider::Replicate);
        }
        configured
    }

    pub fn script(&self) -> AppResult<&Arc<dyn ScriptWriter>> {
        self.script
            .as_ref()
            .ok_or(AppError::ProviderUnavailable(Provider::OpenAi))
    }

    pub fn images(&self) -> AppResult<&Arc<dyn ImageGenerator>> {
        self.images
            .as_ref()
            .ok_or(AppError::ProviderUnavailable(Provider::Replicate))
    }

    pub fn video(&self, provider: Provider) -> AppResult<&Arc<dyn VideoGenerator>> {
        let client = match provider {
            Provider::Sora => self.sora.as_ref(),
            Provider::Veo3 => self.veo.as_ref(),
            other => {
                return Err(AppError::BadRequest(format!(
                    "{} does not generate video",
                    other
                )))
            }
        };
        client.ok_or(AppError::ProviderUnavailable(provider))
    }

    /// Fetch the current state of a job on whichever provider owns it.
    pub async fn poll(&self, provider: Provider, external_id: &str) -> AppResult<ProviderJob> {
        let job = match provider {
            Provider::Replicate => self.images()?.poll(external_id).await?,
            Provider::Sora | Provider::Veo3 => self.video(provider)?.poll(external_id).await?,
            Provider::OpenAi => {
                return Err(AppError::BadRequest(
                    "script generations complete synchronously".to_string(),
                ))
            }
        };
        Ok(job)
    }
}

/// Send a request and decode the JSON body, turning non-2xx responses into
/// [`ProviderError::Api`].
pub(crate) async fn send_json(
    provider: Provider,
    request: reqwest::RequestBuilder,
) -> ProviderResult<serde_json::Value> {
    let response = request.send().await?;
    let status = response.status();
    if status.is_success() {
        Ok(response.json().await?)
    } else {
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());
        Err(ProviderError::Api {
            provider,
            status: status.as_u16(),
            body,
        })
    }
}

pub(crate) fn invalid(provider: Provider, message: impl Into<String>) -> ProviderError {
    ProviderError::InvalidResponse {
        provider,
        message: message.into(),
    }
}
