use anyhow::{Context, Result};
use engine::render::RenderCommand;
use tokio::process::Command;

pub struct FFmpegWrapper;

impl FFmpegWrapper {
    /// Run a render produced by the engine. Remote clip URLs are read by
    /// ffmpeg directly.
    pub async fn render(command: &RenderCommand) -> Result<()> {
        if let Some(parent) = command.output_path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let output = Command::new("ffmpeg")
            .args(["-hide_banner", "-loglevel", "error"])
            .args(&command.ffmpeg_args)
            .output()
            .await
            .context("Failed to execute ffmpeg. Make sure FFmpeg is installed.")?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            anyhow::bail!("ffmpeg render failed: {}", last_line(&stderr));
        }

        Ok(())
    }
}

/// ffmpeg prints the reason for failure last.
fn last_line(stderr: &str) -> &str {
    stderr
        .lines()
        .rev()
        .find(|line| !line.trim().is_empty())
        .unwrap_or("no output")
        .trim()
}
