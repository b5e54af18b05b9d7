use engine::pricing::Provider;
use serde_json::{json, Value};

use super::{invalid, send_json, ImageGenerator, ImageRequest, JobState, ProviderJob, ProviderResult};

/// Storyboard frames through Replicate predictions.
pub struct ReplicateClient {
    http: reqwest::Client,
    api_token: String,
    base_url: String,
    model: String,
}

impl ReplicateClient {
    pub fn new(http: reqwest::Client, api_token: &str, base_url: &str, model: &str) -> Self {
        ReplicateClient {
            http,
            api_token: api_token.to_string(),
            base_url: base_url.to_string(),
            model: model.to_string(),
        }
    }
}

pub fn prediction_request_body(request: &ImageRequest) -> Value {
    let mut input = json!({
        "prompt": request.prompt,
        "aspect_ratio": request.aspect_ratio,
        "output_format": "png",
    });
    // The image model accepts a single guiding image.
    if let Some(reference) = request.reference_images.first() {
        input["image_prompt"] = json!(reference);
    }
    json!({ "input": input })
}

pub fn parse_prediction(body: &Value) -> ProviderResult<ProviderJob> {
    let id = body
        .get("id")
        .and_then(|v| v.as_str())
        .ok_or_else(|| invalid(Provider::Replicate, "missing prediction id"))?;
    let status = match body.get("status").and_then(|v| v.as_str()) {
        Some("starting") => JobState::Pending,
        Some("processing") => JobState::Running,
        Some("succeeded") => JobState::Succeeded,
        Some("failed") | Some("canceled") => JobState::Failed,
        other => {
            return Err(invalid(
                Provider::Replicate,
                format!("unexpected status {:?}", other),
            ))
        }
    };

    let asset_url = match body.get("output") {
        Some(Value::String(url)) => Some(url.clone()),
        Some(Value::Array(items)) => items.iter().find_map(|v| v.as_str()).map(String::from),
        _ => None,
    };
    if status == JobState::Succeeded && asset_url.is_none() {
        return Err(invalid(Provider::Replicate, "succeeded without output"));
    }

    let error = body.get("error").and_then(|v| v.as_str()).map(String::from);

    Ok(ProviderJob {
        external_id: id.to_string(),
        status,
        asset_url,
        error,
    })
}

#[async_trait::async_trait]
impl ImageGenerator for ReplicateClient {
    fn model(&self) -> &str {
        &self.model
    }

    async fn generate_image(&self, request: &ImageRequest) -> ProviderResult<ProviderJob> {
        let body = send_json(
            Provider::Replicate,
            self.http
                .post(format!("{}/models/{}/predictions", self.base_url, self.model))
                .bearer_auth(&self.api_token)
                .header("Prefer", "wait")
                .json(&prediction_request_body(request)),
        )
        .await?;
        let job = parse_prediction(&body)?;
        tracing::info!(prediction = %job.external_id, status = job.status.as_str(), "Replicate prediction created");
        Ok(job)
    }

    async fn poll(&self, external_id: &str) -> ProviderResult<ProviderJob> {
        let body = send_json(
            Provider::Replicate,
            self.http
                .get(format!("{}/predictions/{}", self.base_url, external_id))
                .bearer_auth(&self.api_token),
        )
        .await?;
        parse_prediction(&body)
    }
}
