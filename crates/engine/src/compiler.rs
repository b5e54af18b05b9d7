use crate::timeline::*;
use uuid::Uuid;

/// One storyboard shot with the video take chosen for it.
#[derive(Debug, Clone)]
pub struct StoryboardEntry {
    pub shot_id: i64,
    pub generation_id: i64,
    pub label: String,
    /// Length the script planned for the shot.
    pub planned_duration_secs: f64,
    /// Length the provider reported for the generated take, if any.
    pub generated_duration_secs: Option<f64>,
}

impl StoryboardEntry {
    fn duration_ticks(&self) -> i64 {
        let seconds = self
            .generated_duration_secs
            .filter(|d| d.is_finite() && *d > 0.0)
            .unwrap_or(self.planned_duration_secs);
        seconds_to_ticks(seconds).max(MIN_CLIP_DURATION_TICKS)
    }
}

/// Lay the storyboard out as a rough cut: one clip per entry, back to back on
/// the storyboard track, in the order given.
pub fn assemble_storyboard(entries: &[StoryboardEntry], settings: TimelineSettings) -> Timeline {
    let mut timeline = Timeline::new(settings);

    let mut video_track = Track::new(STORYBOARD_TRACK_ID, TrackKind::Video, "Storyboard");
    let music_track = Track::new(MUSIC_TRACK_ID, TrackKind::Audio, "Music");

    let mut position = 0i64;
    for entry in entries {
        let duration = entry.duration_ticks();
        video_track.clips.push(Clip {
            id: Uuid::new_v4().to_string(),
            generation_id: entry.generation_id,
            shot_id: Some(entry.shot_id),
            label: entry.label.clone(),
            source_duration_ticks: duration,
            in_ticks: 0,
            out_ticks: duration,
            timeline_start_ticks: position,
            track_id: STORYBOARD_TRACK_ID,
        });
        position += duration;
    }

    timeline.tracks = vec![video_track, music_track];
    timeline
}
