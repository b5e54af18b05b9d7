//! Pixel/time arithmetic for the editor's scrollable timeline view.
//!
//! Zoom is expressed in pixels per second of timeline.

use crate::timeline::{Timeline, TICKS_PER_SECOND};

pub const MIN_ZOOM: f64 = 10.0;
pub const MAX_ZOOM: f64 = 400.0;
pub const DEFAULT_ZOOM: f64 = 50.0;
pub const ZOOM_STEP: f64 = 1.25;

/// Default snapping distance in pixels.
pub const SNAP_THRESHOLD_PX: f64 = 8.0;

pub fn clamp_zoom(zoom: f64) -> f64 {
    if zoom.is_nan() {
        return DEFAULT_ZOOM;
    }
    zoom.clamp(MIN_ZOOM, MAX_ZOOM)
}

pub fn zoom_in(zoom: f64) -> f64 {
    clamp_zoom(clamp_zoom(zoom) * ZOOM_STEP)
}

pub fn zoom_out(zoom: f64) -> f64 {
    clamp_zoom(clamp_zoom(zoom) / ZOOM_STEP)
}

/// Convert a horizontal pixel offset to a timeline position.
///
/// Offsets left of the origin map to 0.
pub fn pixels_to_ticks(px: f64, zoom: f64) -> i64 {
    if px <= 0.0 || px.is_nan() {
        return 0;
    }
    let seconds = px / clamp_zoom(zoom);
    (seconds * TICKS_PER_SECOND as f64).round() as i64
}

pub fn ticks_to_pixels(ticks: i64, zoom: f64) -> f64 {
    ticks as f64 / TICKS_PER_SECOND as f64 * clamp_zoom(zoom)
}

/// Every position a dragged edge may snap to: the origin, clip edges and markers.
pub fn snap_targets(timeline: &Timeline) -> Vec<i64> {
    let mut targets = vec![0];
    for clip in timeline.tracks.iter().flat_map(|t| t.clips.iter()) {
        targets.push(clip.timeline_start_ticks);
        targets.push(clip.end_ticks());
    }
    targets.extend(timeline.markers.iter().map(|m| m.position_ticks));
    targets.sort_unstable();
    targets.dedup();
    targets
}

/// Snap `position` to the nearest target closer than `threshold_px` on screen.
pub fn snap_ticks(position: i64, targets: &[i64], threshold_px: f64, zoom: f64) -> i64 {
    let threshold_ticks = pixels_to_ticks(threshold_px, zoom);
    targets
        .iter()
        .copied()
        .map(|t| (t, (t - position).abs()))
        .filter(|(_, distance)| *distance <= threshold_ticks)
        .min_by_key(|(_, distance)| *distance)
        .map(|(t, _)| t)
        .unwrap_or(position)
}

/// `HH:MM:SS:FF` non-drop-frame timecode.
pub fn format_timecode(ticks: i64, fps: f64) -> String {
    let fps = if fps > 0.0 { fps.round() as i64 } else { 24 };
    let total_frames = (ticks.max(0) as f64 / TICKS_PER_SECOND as f64 * fps as f64).floor() as i64;
    let frames = total_frames % fps;
    let total_seconds = total_frames / fps;
    format!(
        "{:02}:{:02}:{:02}:{:02}",
        total_seconds / 3600,
        (total_seconds / 60) % 60,
        total_seconds % 60,
        frames
    )
}
