use anyhow::{Context, Result};
use std::path::PathBuf;

/// Daemon configuration loaded from the environment (and `.env`, if present).
///
/// | Env Var                 | Default                                              |
/// |-------------------------|------------------------------------------------------|
/// | `PREVIZ_HOST`           | `127.0.0.1`                                          |
/// | `PREVIZ_PORT`           | `7777`                                               |
/// | `PREVIZ_DATABASE_PATH`  | unset: in-memory development store                   |
/// | `PREVIZ_EXPORT_DIR`     | `.cache/exports`                                     |
/// | `OPENAI_API_KEY`        | unset: script writing and Sora unavailable           |
/// | `OPENAI_BASE_URL`       | `https://api.openai.com/v1`                          |
/// | `PREVIZ_SCRIPT_MODEL`   | `gpt-4o-mini`                                        |
/// | `PREVIZ_SORA_MODEL`     | `sora-2`                                             |
/// | `GEMINI_API_KEY`        | unset: Veo unavailable                               |
/// | `VEO_BASE_URL`          | `https://generativelanguage.googleapis.com/v1beta`   |
/// | `PREVIZ_VEO_MODEL`      | `veo-3.0-generate-001`                               |
/// | `REPLICATE_API_TOKEN`   | unset: storyboard images unavailable                 |
/// | `REPLICATE_BASE_URL`    | `https://api.replicate.com/v1`                       |
/// | `PREVIZ_IMAGE_MODEL`    | `black-forest-labs/flux-1.1-pro`                     |
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub database_path: Option<PathBuf>,
    pub export_dir: PathBuf,
    pub openai: OpenAiSettings,
    pub veo: VeoSettings,
    pub replicate: ReplicateSettings,
}

#[derive(Debug, Clone)]
pub struct OpenAiSettings {
    pub api_key: Option<String>,
    pub base_url: String,
    pub script_model: String,
    pub sora_model: String,
}

#[derive(Debug, Clone)]
pub struct VeoSettings {
    pub api_key: Option<String>,
    pub base_url: String,
    pub model: String,
}

#[derive(Debug, Clone)]
pub struct ReplicateSettings {
    pub api_token: Option<String>,
    pub base_url: String,
    pub image_model: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary variable source; empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let or = |key: &str, default: &str| get(key).unwrap_or_else(|| default.to_string());

        let port = match get("PREVIZ_PORT") {
            Some(raw) => raw
                .parse::<u16>()
                .with_context(|| format!("PREVIZ_PORT must be a valid port, got {:?}", raw))?,
            None => 7777,
        };

        Ok(Config {
            host: or("PREVIZ_HOST", "127.0.0.1"),
            port,
            database_path: get("PREVIZ_DATABASE_PATH").map(PathBuf::from),
            export_dir: PathBuf::from(or("PREVIZ_EXPORT_DIR", ".cache/exports")),
            openai: OpenAiSettings {
                api_key: get("OPENAI_API_KEY"),
                base_url: trim_slash(or("OPENAI_BASE_URL", "https://api.openai.com/v1")),
                script_model: or("PREVIZ_SCRIPT_MODEL", "gpt-4o-mini"),
                sora_model: or("PREVIZ_SORA_MODEL", "sora-2"),
            },
            veo: VeoSettings {
                api_key: get("GEMINI_API_KEY"),
                base_url: trim_slash(or(
                    "VEO_BASE_URL",
                    "https://generativelanguage.googleapis.com/v1beta",
                )),
                model: or("PREVIZ_VEO_MODEL", "veo-3.0-generate-001"),
            },
            replicate: ReplicateSettings {
                api_token: get("REPLICATE_API_TOKEN"),
                base_url: trim_slash(or("REPLICATE_BASE_URL", "https://api.replicate.com/v1")),
                image_model: or("PREVIZ_IMAGE_MODEL", "black-forest-labs/flux-1.1-pro"),
            },
        })
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn trim_slash(url: String) -> String {
    url.trim_end_matches('/').to_string()
}
