use crate::error::{EngineError, EngineResult};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// The project's single source of truth: script, look and free-form metadata.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProjectBible {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub logline: String,
    #[serde(default)]
    pub genre: Option<String>,
    #[serde(default)]
    pub visual_style: VisualStyle,
    #[serde(default)]
    pub script: Script,
    #[serde(default)]
    pub metadata: BTreeMap<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VisualStyle {
    #[serde(default)]
    pub look: String,
    #[serde(default)]
    pub camera: String,
    #[serde(default)]
    pub lighting: String,
    #[serde(default = "default_aspect_ratio")]
    pub aspect_ratio: String,
}

fn default_aspect_ratio() -> String {
    "16:9".to_string()
}

impl Default for VisualStyle {
    fn default() -> Self {
        VisualStyle {
            look: String::new(),
            camera: String::new(),
            lighting: String::new(),
            aspect_ratio: default_aspect_ratio(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Script {
    pub scenes: Vec<ScriptScene>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScriptScene {
    pub heading: String,
    #[serde(default)]
    pub synopsis: String,
    #[serde(default)]
    pub shots: Vec<ScriptShot>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScriptShot {
    pub description: String,
    #[serde(default)]
    pub camera: String,
    pub duration_secs: f64,
    #[serde(default)]
    pub dialogue: Option<String>,
}

impl Script {
    pub fn shot_count(&self) -> usize {
        self.scenes.iter().map(|s| s.shots.len()).sum()
    }

    pub fn runtime_secs(&self) -> f64 {
        self.scenes
            .iter()
            .flat_map(|s| s.shots.iter())
            .map(|s| s.duration_secs)
            .sum()
    }

    pub fn validate(&self) -> EngineResult<()> {
        if self.scenes.is_empty() {
            return Err(EngineError::InvalidScript("script has no scenes".into()));
        }
        for (i, scene) in self.scenes.iter().enumerate() {
            if scene.heading.trim().is_empty() {
                return Err(EngineError::InvalidScript(format!(
                    "scene {} has an empty heading",
                    i + 1
                )));
            }
            for (j, shot) in scene.shots.iter().enumerate() {
                if !shot.duration_secs.is_finite() || shot.duration_secs <= 0.0 {
                    return Err(EngineError::InvalidScript(format!(
                        "scene {} shot {} has a non-positive duration",
                        i + 1,
                        j + 1
                    )));
                }
            }
        }
        Ok(())
    }
}

/// Parse a script produced by a language model.
///
/// Models often wrap JSON in Markdown fences; those are stripped first.
pub fn parse_script(raw: &str) -> EngineResult<Script> {
    let body = strip_code_fence(raw);
    let script: Script = serde_json::from_str(body)
        .map_err(|e| EngineError::InvalidScript(format!("malformed script JSON: {}", e)))?;
    script.validate()?;
    Ok(script)
}

fn strip_code_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Drop the info string (e.g. "json") on the opening fence line.
    let rest = rest.split_once('\n').map(|(_, body)| body).unwrap_or("");
    rest.trim_end().strip_suffix("```").unwrap_or(rest).trim()
}

/// Base prompt for a storyboard frame or video take, before character locking.
pub fn shot_prompt(style: &VisualStyle, scene_heading: &str, description: &str, camera: &str) -> String {
    let mut parts = vec![format!(
        "{}. {}.",
        scene_heading.trim(),
        description.trim().trim_end_matches('.')
    )];
    if !camera.trim().is_empty() {
        parts.push(format!("Camera: {}.", camera.trim()));
    }
    if !style.look.trim().is_empty() {
        parts.push(format!("Look: {}.", style.look.trim()));
    }
    if !style.camera.trim().is_empty() {
        parts.push(format!("Cinematography: {}.", style.camera.trim()));
    }
    if !style.lighting.trim().is_empty() {
        parts.push(format!("Lighting: {}.", style.lighting.trim()));
    }
    parts.push(format!("Aspect ratio {}.", style.aspect_ratio));
    parts.join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCRIPT_JSON: &str = r#"{
        "scenes": [
            {
                "heading": "INT. DINER - NIGHT",
                "synopsis": "Mara waits.",
                "shots": [
                    {"description": "Mara stirs her coffee", "camera": "close-up", "duration_secs": 3.0},
                    {"description": "The door opens", "duration_secs": 2.5, "dialogue": "You're late."}
                ]
            },
            {"heading": "EXT. STREET - NIGHT", "shots": [{"description": "Rain", "duration_secs": 4}]}
        ]
    }"#;

    #[test]
    fn parses_plain_json() {
        let script = parse_script(SCRIPT_JSON).unwrap();
        assert_eq!(script.scenes.len(), 2);
        assert_eq!(script.shot_count(), 3);
        assert_eq!(script.runtime_secs(), 9.5);
        assert_eq!(script.scenes[0].shots[1].dialogue.as_deref(), Some("You're late."));
    }

    #[test]
    fn parses_fenced_json() {
        let fenced = format!("```json\n{}\n```", SCRIPT_JSON);
        assert_eq!(parse_script(&fenced).unwrap().shot_count(), 3);
    }

    #[test]
    fn rejects_empty_script() {
        assert!(matches!(
            parse_script(r#"{"scenes": []}"#),
            Err(EngineError::InvalidScript(_))
        ));
    }

    #[test]
    fn rejects_non_positive_duration() {
        let raw = r#"{"scenes":[{"heading":"A","shots":[{"description":"x","duration_secs":0}]}]}"#;
        assert!(parse_script(raw).is_err());
    }

    #[test]
    fn rejects_garbage() {
        assert!(parse_script("Sure! Here is your script.").is_err());
    }

    #[test]
    fn shot_prompt_skips_empty_style_fields() {
        let style = VisualStyle {
            look: "35mm film grain".into(),
            ..Default::default()
        };
        let prompt = shot_prompt(&style, "INT. DINER - NIGHT", "Mara stirs her coffee", "close-up");
        assert_eq!(
            prompt,
            "INT. DINER - NIGHT. Mara stirs her coffee. Camera: close-up. Look: 35mm film grain. Aspect ratio 16:9."
        );
    }

    #[test]
    fn bible_round_trips_with_defaults() {
        let bible: ProjectBible = serde_json::from_str(r#"{"title":"Night Shift"}"#).unwrap();
        assert_eq!(bible.visual_style.aspect_ratio, "16:9");
        assert!(bible.script.scenes.is_empty());
    }
}
