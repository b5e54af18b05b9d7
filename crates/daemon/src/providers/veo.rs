use engine::pricing::Provider;
use serde_json::{json, Value};

use super::{invalid, send_json, JobState, ProviderJob, ProviderResult, VideoGenerator, VideoRequest};

/// Veo 3 through the Gemini API long-running operations.
pub struct VeoClient {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
}

impl VeoClient {
    pub fn new(http: reqwest::Client, api_key: &str, base_url: &str, model: &str) -> Self {
        VeoClient {
            http,
            api_key: api_key.to_string(),
            base_url: base_url.to_string(),
            model: model.to_string(),
        }
    }
}

/// Veo renders 4, 6 or 8 second clips.
pub fn snap_veo_seconds(requested_secs: f64) -> u32 {
    if !requested_secs.is_finite() || requested_secs <= 5.0 {
        4
    } else if requested_secs <= 7.0 {
        6
    } else {
        8
    }
}

pub fn veo_request_body(request: &VideoRequest) -> Value {
    let aspect_ratio = match request.aspect_ratio.as_str() {
        "9:16" => "9:16",
        _ => "16:9",
    };
    json!({
        "instances": [{ "prompt": request.prompt }],
        "parameters": {
            "aspectRatio": aspect_ratio,
            "durationSeconds": snap_veo_seconds(request.duration_secs),
        },
    })
}

/// Map a long-running operation to a job. The operation name doubles as the
/// external id and is polled verbatim.
pub fn parse_veo_operation(body: &Value) -> ProviderResult<ProviderJob> {
    let name = body
        .get("name")
        .and_then(|v| v.as_str())
        .ok_or_else(|| invalid(Provider::Veo3, "missing operation name"))?;

    let done = body.get("done").and_then(|v| v.as_bool()).unwrap_or(false);
    if !done {
        return Ok(ProviderJob {
            external_id: name.to_string(),
            status: JobState::Running,
            asset_url: None,
            error: None,
        });
    }

    if let Some(message) = body.pointer("/error/message").and_then(|v| v.as_str()) {
        return Ok(ProviderJob {
            external_id: name.to_string(),
            status: JobState::Failed,
            asset_url: None,
            error: Some(message.to_string()),
        });
    }

    let uri = body
        .pointer("/response/generateVideoResponse/generatedSamples/0/video/uri")
        .and_then(|v| v.as_str());
    match uri {
        Some(uri) => Ok(ProviderJob {
            external_id: name.to_string(),
            status: JobState::Succeeded,
            asset_url: Some(uri.to_string()),
            error: None,
        }),
        // Finished without a sample: usually filtered by safety checks.
        None => Ok(ProviderJob {
            external_id: name.to_string(),
            status: JobState::Failed,
            asset_url: None,
            error: Some("operation finished without a generated video".to_string()),
        }),
    }
}

#[async_trait::async_trait]
impl VideoGenerator for VeoClient {
    fn provider(&self) -> Provider {
        Provider::Veo3
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn clip_seconds(&self, requested_secs: f64) -> f64 {
        snap_veo_seconds(requested_secs) as f64
    }

    async fn submit_video(&self, request: &VideoRequest) -> ProviderResult<ProviderJob> {
        let body = send_json(
            Provider::Veo3,
            self.http
                .post(format!(
                    "{}/models/{}:predictLongRunning",
                    self.base_url, self.model
                ))
                .header("x-goog-api-key", &self.api_key)
                .json(&veo_request_body(request)),
        )
        .await?;
        let mut job = parse_veo_operation(&body)?;
        if job.status == JobState::Running {
            job.status = JobState::Pending;
        }
        tracing::info!(operation = %job.external_id, model = %self.model, "Veo job submitted");
        Ok(job)
    }

    async fn poll(&self, external_id: &str) -> ProviderResult<ProviderJob> {
        let body = send_json(
            Provider::Veo3,
            self.http
                .get(format!("{}/{}", self.base_url, external_id))
                .header("x-goog-api-key", &self.api_key),
        )
        .await?;
        parse_veo_operation(&body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_body_carries_prompt_and_parameters() {
        let body = veo_request_body(&VideoRequest {
            prompt: "rooftop at dawn".into(),
            duration_secs: 6.5,
            aspect_ratio: "2.39:1".into(),
        });
        assert_eq!(body["instances"][0]["prompt"], "rooftop at dawn");
        assert_eq!(body["parameters"]["aspectRatio"], "16:9");
        assert_eq!(body["parameters"]["durationSeconds"], 6);
    }

    #[test]
    fn pending_operation_is_running() {
        let job = parse_veo_operation(&json!({ "name": "models/veo/operations/abc" })).unwrap();
        assert_eq!(job.status, JobState::Running);
        assert_eq!(job.external_id, "models/veo/operations/abc");
    }

    #[test]
    fn finished_operation_yields_sample_uri() {
        let body = json!({
            "name": "operations/abc",
            "done": true,
            "response": { "generateVideoResponse": { "generatedSamples": [
                { "video": { "uri": "https://generativelanguage.googleapis.com/files/x:download" } }
            ] } }
        });
        let job = parse_veo_operation(&body).unwrap();
        assert_eq!(job.status, JobState::Succeeded);
        assert!(job.asset_url.unwrap().ends_with("x:download"));
    }

    #[test]
    fn failed_or_empty_operations_fail() {
        let errored = json!({ "name": "operations/abc", "done": true, "error": { "message": "quota" } });
        assert_eq!(parse_veo_operation(&errored).unwrap().error.as_deref(), Some("quota"));

        let empty = json!({ "name": "operations/abc", "done": true, "response": {} });
        assert_eq!(parse_veo_operation(&empty).unwrap().status, JobState::Failed);

        assert!(parse_veo_operation(&json!({ "done": true })).is_err());
    }
}
