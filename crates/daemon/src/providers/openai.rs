use engine::bible::parse_script;
use engine::pricing::Provider;
use serde_json::{json, Value};

use super::{
    invalid, send_json, JobState, ProviderJob, ProviderResult, ScriptDraft, ScriptRequest,
    ScriptWriter, VideoGenerator, VideoRequest,
};

const SCRIPT_SYSTEM_PROMPT: &str = "You are a screenwriter breaking a film idea down for \
pre-production. Reply with JSON only, no prose, in exactly this shape: \
{\"scenes\": [{\"heading\": \"INT. LOCATION - TIME\", \"synopsis\": \"...\", \"shots\": \
[{\"description\": \"...\", \"camera\": \"...\", \"duration_secs\": 4, \"dialogue\": null}]}]}. \
Every shot needs a concrete visual description and a positive duration in seconds.";

/// Script writing through chat completions.
pub struct OpenAiClient {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
}

impl OpenAiClient {
    pub fn new(http: reqwest::Client, api_key: &str, base_url: &str, model: &str) -> Self {
        OpenAiClient {
            http,
            api_key: api_key.to_string(),
            base_url: base_url.to_string(),
            model: model.to_string(),
        }
    }
}

pub fn script_user_prompt(request: &ScriptRequest) -> String {
    let mut lines = Vec::new();
    if !request.title.trim().is_empty() {
        lines.push(format!("Title: {}", request.title.trim()));
    }
    lines.push(format!("Logline: {}", request.logline.trim()));
    if let Some(genre) = &request.genre {
        lines.push(format!("Genre: {}", genre));
    }
    if let Some(runtime) = request.target_runtime_secs {
        lines.push(format!("Target runtime: about {} seconds in total", runtime.round()));
    }
    if let Some(style) = &request.visual_style {
        if !style.look.is_empty() {
            lines.push(format!("Visual style: {}", style.look));
        }
    }
    if let Some(notes) = &request.notes {
        lines.push(format!("Director notes: {}", notes));
    }
    lines.join("\n")
}

pub fn chat_request_body(model: &str, request: &ScriptRequest) -> Value {
    json!({
        "model": model,
        "messages": [
            { "role": "system", "content": SCRIPT_SYSTEM_PROMPT },
            { "role": "user", "content": script_user_prompt(request) },
        ],
        "response_format": { "type": "json_object" },
        "temperature": 0.7,
    })
}

pub fn parse_chat_response(body: &Value) -> ProviderResult<ScriptDraft> {
    let content = body
        .pointer("/choices/0/message/content")
        .and_then(|v| v.as_str())
        .ok_or_else(|| invalid(Provider::OpenAi, "missing choices[0].message.content"))?;
    let script = parse_script(content).map_err(|e| invalid(Provider::OpenAi, e.to_string()))?;
    let total_tokens = body
        .pointer("/usage/total_tokens")
        .and_then(|v| v.as_u64())
        .unwrap_or(0);
    Ok(ScriptDraft {
        script,
        total_tokens,
    })
}

#[async_trait::async_trait]
impl ScriptWriter for OpenAiClient {
    fn model(&self) -> &str {
        &self.model
    }

    async fn write_script(&self, request: &ScriptRequest) -> ProviderResult<ScriptDraft> {
        tracing::debug!(model = %self.model, "Requesting script draft");
        let body = send_json(
            Provider::OpenAi,
            self.http
                .post(format!("{}/chat/completions", self.base_url))
                .bearer_auth(&self.api_key)
                .json(&chat_request_body(&self.model, request)),
        )
        .await?;
        parse_chat_response(&body)
    }
}

/// Video takes through Sora's `/videos` endpoint.
pub struct SoraClient {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
}

impl SoraClient {
    pub fn new(http: reqwest::Client, api_key: &str, base_url: &str, model: &str) -> Self {
        SoraClient {
            http,
            api_key: api_key.to_string(),
            base_url: base_url.to_string(),
            model: model.to_string(),
        }
    }
}

/// Sora renders 4, 8 or 12 second clips.
pub fn snap_sora_seconds(requested_secs: f64) -> u32 {
    if !requested_secs.is_finite() || requested_secs <= 6.0 {
        4
    } else if requested_secs <= 10.0 {
        8
    } else {
        12
    }
}

pub fn sora_size(aspect_ratio: &str) -> &'static str {
    match aspect_ratio {
        "9:16" => "720x1280",
        _ => "1280x720",
    }
}

pub fn sora_request_body(model: &str, request: &VideoRequest) -> Value {
    json!({
        "model": model,
        "prompt": request.prompt,
        "seconds": snap_sora_seconds(request.duration_secs).to_string(),
        "size": sora_size(&request.aspect_ratio),
    })
}

pub fn parse_sora_job(base_url: &str, body: &Value) -> ProviderResult<ProviderJob> {
    let id = body
        .get("id")
        .and_then(|v| v.as_str())
        .ok_or_else(|| invalid(Provider::Sora, "missing id"))?;
    let status = match body.get("status").and_then(|v| v.as_str()) {
        Some("queued") => JobState::Pending,
        Some("in_progress") => JobState::Running,
        Some("completed") => JobState::Succeeded,
        Some("failed") => JobState::Failed,
        other => {
            return Err(invalid(
                Provider::Sora,
                format!("unexpected status {:?}", other),
            ))
        }
    };
    let asset_url = (status == JobState::Succeeded).then(|| format!("{}/videos/{}/content", base_url, id));
    let error = body
        .pointer("/error/message")
        .and_then(|v| v.as_str())
        .map(String::from);

    Ok(ProviderJob {
        external_id: id.to_string(),
        status,
        asset_url,
        error,
    })
}

#[async_trait::async_trait]
impl VideoGenerator for SoraClient {
    fn provider(&self) -> Provider {
        Provider::Sora
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn clip_seconds(&self, requested_secs: f64) -> f64 {
        snap_sora_seconds(requested_secs) as f64
    }

    async fn submit_video(&self, request: &VideoRequest) -> ProviderResult<ProviderJob> {
        let body = send_json(
            Provider::Sora,
            self.http
                .post(format!("{}/videos", self.base_url))
                .bearer_auth(&self.api_key)
                .json(&sora_request_body(&self.model, request)),
        )
        .await?;
        let job = parse_sora_job(&self.base_url, &body)?;
        tracing::info!(external_id = %job.external_id, model = %self.model, "Sora job submitted");
        Ok(job)
    }

    async fn poll(&self, external_id: &str) -> ProviderResult<ProviderJob> {
        let body = send_json(
            Provider::Sora,
            self.http
                .get(format!("{}/videos/{}", self.base_url, external_id))
                .bearer_auth(&self.api_key),
        )
        .await?;
        parse_sora_job(&self.base_url, &body)
    }
}
