use crate::timeline::{Clip, Timeline, STORYBOARD_TRACK_ID, TICKS_PER_SECOND};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExportPreset {
    #[default]
    Landscape1080,
    Vertical1080,
    Square1080,
}

impl ExportPreset {
    pub fn dimensions(&self) -> (i32, i32) {
        match self {
            ExportPreset::Landscape1080 => (1920, 1080),
            ExportPreset::Vertical1080 => (1080, 1920),
            ExportPreset::Square1080 => (1080, 1080),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ExportPreset::Landscape1080 => "landscape1080",
            ExportPreset::Vertical1080 => "vertical1080",
            ExportPreset::Square1080 => "square1080",
        }
    }
}

impl std::str::FromStr for ExportPreset {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "landscape1080" => Ok(ExportPreset::Landscape1080),
            "vertical1080" => Ok(ExportPreset::Vertical1080),
            "square1080" => Ok(ExportPreset::Square1080),
            other => Err(format!("unknown export preset: {}", other)),
        }
    }
}

pub struct RenderCommand {
    pub ffmpeg_args: Vec<String>,
    pub output_path: PathBuf,
    /// Clips left out because no source asset was available.
    pub skipped_clips: Vec<String>,
}

/// Generate the FFmpeg invocation that renders the storyboard track.
///
/// Hard cuts only: every clip is trimmed to its in/out points, fitted into the
/// preset frame with letterboxing, then concatenated in timeline order.
pub fn generate_render_command(
    timeline: &Timeline,
    preset: ExportPreset,
    sources: &HashMap<i64, String>, // generation_id -> local path or URL
    output_path: PathBuf,
) -> RenderCommand {
    let (width, height) = preset.dimensions();
    let mut skipped_clips = Vec::new();

    let clips: Vec<(&Clip, &String)> = timeline
        .sorted_clips(STORYBOARD_TRACK_ID)
        .into_iter()
        .filter_map(|clip| match sources.get(&clip.generation_id) {
            Some(source) => Some((clip, source)),
            None => {
                skipped_clips.push(clip.id.clone());
                None
            }
        })
        .collect();

    if clips.is_empty() {
        return RenderCommand {
            ffmpeg_args: vec![
                "-f".to_string(),
                "lavfi".to_string(),
                "-i".to_string(),
                format!("color=black:size={}x{}:d=1", width, height),
                "-y".to_string(),
                output_path.to_string_lossy().to_string(),
            ],
            output_path,
            skipped_clips,
        };
    }

    let mut args = Vec::new();
    for (_, source) in &clips {
        args.push("-i".to_string());
        args.push((*source).clone());
    }

    // [0:v]trim=start=0:duration=5,setpts=PTS-STARTPTS,scale=...,pad=...[v0]
    let mut filter_parts = Vec::new();
    for (idx, (clip, _)) in clips.iter().enumerate() {
        let start_sec = clip.in_ticks as f64 / TICKS_PER_SECOND as f64;
        let duration_sec = clip.duration_ticks() as f64 / TICKS_PER_SECOND as f64;
        filter_parts.push(format!(
            "[{idx}:v]trim=start={start}:duration={duration},setpts=PTS-STARTPTS,\
             scale={w}:{h}:force_original_aspect_ratio=decrease,\
             pad={w}:{h}:(ow-iw)/2:(oh-ih)/2,setsar=1,fps={fps}[v{idx}]",
            idx = idx,
            start = start_sec,
            duration = duration_sec,
            w = width,
            h = height,
            fps = timeline.settings.fps,
        ));
    }
    let concat_inputs: String = (0..clips.len()).map(|i| format!("[v{}]", i)).collect();
    filter_parts.push(format!("{}concat=n={}:v=1:a=0[outv]", concat_inputs, clips.len()));

    args.push("-filter_complex".to_string());
    args.push(filter_parts.join(";"));
    for arg in [
        "-map", "[outv]", "-c:v", "libx264", "-preset", "medium", "-crf", "23", "-pix_fmt",
        "yuv420p", "-an", "-y",
    ] {
        args.push(arg.to_string());
    }
    args.push(output_path.to_string_lossy().to_string());

    RenderCommand {
        ffmpeg_args: args,
        output_path,
        skipped_clips,
    }
}
