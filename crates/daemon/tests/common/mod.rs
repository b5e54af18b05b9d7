//! Shared helpers for daemon integration tests: an app over the in-memory
//! store with scripted stand-ins for every provider.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::response::Response;
use axum::Router;
use engine::bible::{Script, ScriptScene, ScriptShot};
use engine::pricing::Provider;
use http_body_util::BodyExt;
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

use previz_daemon::config::Config;
use previz_daemon::db::Database;
use previz_daemon::providers::{
    ImageGenerator, ImageRequest, JobState, ProviderJob, ProviderResult, Providers, ScriptDraft,
    ScriptRequest, ScriptWriter, VideoGenerator, VideoRequest,
};
use previz_daemon::state::AppState;

// ---------------------------------------------------------------------------
// Fake providers
// ---------------------------------------------------------------------------

pub struct FakeScriptWriter;

pub fn sample_script() -> Script {
    Script {
        scenes: vec![
            ScriptScene {
                heading: "INT. LAB - NIGHT".into(),
                synopsis: "Mara finds the drive.".into(),
                shots: vec![
                    ScriptShot {
                        description: "Mara hunches over a terminal".into(),
                        camera: "slow push-in".into(),
                        duration_secs: 4.0,
                        dialogue: None,
                    },
                    ScriptShot {
                        description: "The drive ejects".into(),
                        camera: "macro insert".into(),
                        duration_secs: 2.0,
                        dialogue: Some("Got you.".into()),
                    },
                ],
            },
            ScriptScene {
                heading: "EXT. ROOF - DAWN".into(),
                synopsis: "She makes the handoff.".into(),
                shots: vec![ScriptShot {
                    description: "Mara at the roof edge".into(),
                    camera: "wide".into(),
                    duration_secs: 6.0,
                    dialogue: None,
                }],
            },
        ],
    }
}

#[async_trait::async_trait]
impl ScriptWriter for FakeScriptWriter {
    fn model(&self) -> &str {
        "fake-writer"
    }

    async fn write_script(&self, _request: &ScriptRequest) -> ProviderResult<ScriptDraft> {
        Ok(ScriptDraft {
            script: sample_script(),
            total_tokens: 1500,
        })
    }
}

/// Finishes every image immediately and remembers what it was asked for.
#[derive(Default)]
pub struct FakeImages {
    pub requests: Mutex<Vec<ImageRequest>>,
}

#[async_trait::async_trait]
impl ImageGenerator for FakeImages {
    fn model(&self) -> &str {
        "fake-flux"
    }

    async fn generate_image(&self, request: &ImageRequest) -> ProviderResult<ProviderJob> {
        let mut requests = self.requests.lock().unwrap();
        requests.push(request.clone());
        let id = format!("img-{}", requests.len());
        Ok(ProviderJob {
            asset_url: Some(format!("https://images.test/{}.png", id)),
            external_id: id,
            status: JobState::Succeeded,
            error: None,
        })
    }

    async fn poll(&self, external_id: &str) -> ProviderResult<ProviderJob> {
        Ok(ProviderJob {
            external_id: external_id.to_string(),
            status: JobState::Succeeded,
            asset_url: Some(format!("https://images.test/{}.png", external_id)),
            error: None,
        })
    }
}

/// Accepts every video as pending; the first poll reports it finished.
pub struct FakeVideo {
    pub provider: Provider,
    pub submitted: AtomicUsize,
    pub prompts: Mutex<Vec<String>>,
}

impl FakeVideo {
    pub fn new(provider: Provider) -> Self {
        FakeVideo {
            provider,
            submitted: AtomicUsize::new(0),
            prompts: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait::async_trait]
impl VideoGenerator for FakeVideo {
    fn provider(&self) -> Provider {
        self.provider
    }

    fn model(&self) -> &str {
        "fake-video"
    }

    fn clip_seconds(&self, requested_secs: f64) -> f64 {
        requested_secs.ceil()
    }

    async fn submit_video(&self, request: &VideoRequest) -> ProviderResult<ProviderJob> {
        let n = self.submitted.fetch_add(1, Ordering::SeqCst) + 1;
        self.prompts.lock().unwrap().push(request.prompt.clone());
        Ok(ProviderJob {
            external_id: format!("{}-job-{}", self.provider, n),
            status: JobState::Pending,
            asset_url: None,
            error: None,
        })
    }

    async fn poll(&self, external_id: &str) -> ProviderResult<ProviderJob> {
        Ok(ProviderJob {
            external_id: external_id.to_string(),
            status: JobState::Succeeded,
            asset_url: Some(format!("https://videos.test/{}.mp4", external_id)),
            error: None,
        })
    }
}

// ---------------------------------------------------------------------------
// App construction
// ---------------------------------------------------------------------------

pub struct TestApp {
    pub router: Router,
    pub images: Arc<FakeImages>,
    pub sora: Arc<FakeVideo>,
    pub export_dir: TempDir,
}

fn test_config(export_dir: &TempDir) -> Config {
    let export_dir = export_dir.path().to_string_lossy().to_string();
    Config::from_lookup(|key| match key {
        "PREVIZ_EXPORT_DIR" => Some(export_dir.clone()),
        _ => None,
    })
    .unwrap()
}

/// App with every provider replaced by a fake.
pub fn build_test_app() -> TestApp {
    let export_dir = tempfile::tempdir().unwrap();
    let images = Arc::new(FakeImages::default());
    let sora = Arc::new(FakeVideo::new(Provider::Sora));

    let providers = Providers {
        script: Some(Arc::new(FakeScriptWriter)),
        images: Some(images.clone() as Arc<dyn ImageGenerator>),
        sora: Some(sora.clone() as Arc<dyn VideoGenerator>),
        veo: Some(Arc::new(FakeVideo::new(Provider::Veo3))),
    };
    let state = AppState::new(
        Database::open_in_memory().unwrap(),
        test_config(&export_dir),
        providers,
    );

    TestApp {
        router: previz_daemon::build_app(state),
        images,
        sora,
        export_dir,
    }
}

/// App with no provider credentials at all.
pub fn build_app_without_providers() -> (Router, TempDir) {
    let export_dir = tempfile::tempdir().unwrap();
    let state = AppState::new(
        Database::open_in_memory().unwrap(),
        test_config(&export_dir),
        Providers::default(),
    );
    (previz_daemon::build_app(state), export_dir)
}

// ---------------------------------------------------------------------------
// Request helpers
// ---------------------------------------------------------------------------

pub async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> Response {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(json) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(serde_json::to_vec(&json).unwrap()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    app.clone().oneshot(request).await.unwrap()
}

pub async fn get(app: &Router, uri: &str) -> Response {
    send(app, Method::GET, uri, None).await
}

pub async fn post_json(app: &Router, uri: &str, body: Value) -> Response {
    send(app, Method::POST, uri, Some(body)).await
}

pub async fn put_json(app: &Router, uri: &str, body: Value) -> Response {
    send(app, Method::PUT, uri, Some(body)).await
}

pub async fn patch_json(app: &Router, uri: &str, body: Value) -> Response {
    send(app, Method::PATCH, uri, Some(body)).await
}

pub async fn delete(app: &Router, uri: &str) -> Response {
    send(app, Method::DELETE, uri, None).await
}

pub async fn body_bytes(response: Response) -> Vec<u8> {
    response
        .into_body()
        .collect()
        .await
        .unwrap()
        .to_bytes()
        .to_vec()
}

pub async fn body_json(response: Response) -> Value {
    serde_json::from_slice(&body_bytes(response).await).unwrap()
}

/// Assert the status and decode the JSON body in one step.
pub async fn expect_json(response: Response, status: StatusCode) -> Value {
    assert_eq!(response.status(), status);
    body_json(response).await
}

pub async fn create_project(app: &Router, name: &str) -> i64 {
    let response = post_json(app, "/api/projects", serde_json::json!({ "name": name })).await;
    let json = expect_json(response, StatusCode::CREATED).await;
    json["id"].as_i64().unwrap()
}

/// A project broken down by the fake writer; returns the project id and its
/// shot ids in screenplay order.
pub async fn project_with_script(app: &Router) -> (i64, Vec<i64>) {
    let project_id = create_project(app, "Night Shift").await;
    let response = post_json(
        app,
        &format!("/api/projects/{}/script", project_id),
        serde_json::json!({ "logline": "A courier outruns the dawn." }),
    )
    .await;
    let json = expect_json(response, StatusCode::OK).await;

    let shot_ids = json["scenes"]
        .as_array()
        .unwrap()
        .iter()
        .flat_map(|scene| scene["shots"].as_array().unwrap().iter())
        .map(|shot| shot["id"].as_i64().unwrap())
        .collect();
    (project_id, shot_ids)
}
