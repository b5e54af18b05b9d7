use serde::{Deserialize, Serialize};

pub const TICKS_PER_SECOND: i64 = 48000;

/// Shortest clip the editor allows after a trim or split (0.5 s).
pub const MIN_CLIP_DURATION_TICKS: i64 = TICKS_PER_SECOND / 2;

/// Furthest point an edit may place anything: 24 hours.
pub const MAX_TIMELINE_TICKS: i64 = 24 * 60 * 60 * TICKS_PER_SECOND;

pub const STORYBOARD_TRACK_ID: i64 = 1;
pub const MUSIC_TRACK_ID: i64 = 2;

pub fn seconds_to_ticks(seconds: f64) -> i64 {
    (seconds * TICKS_PER_SECOND as f64).round() as i64
}

pub fn ticks_to_seconds(ticks: i64) -> f64 {
    ticks as f64 / TICKS_PER_SECOND as f64
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimelineSettings {
    pub fps: f64,
    pub resolution: Resolution,
    #[serde(default = "default_ticks_per_second")]
    pub ticks_per_second: i64,
}

fn default_ticks_per_second() -> i64 {
    TICKS_PER_SECOND
}

impl Default for TimelineSettings {
    fn default() -> Self {
        TimelineSettings {
            fps: 24.0,
            resolution: Resolution {
                width: 1920,
                height: 1080,
            },
            ticks_per_second: TICKS_PER_SECOND,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resolution {
    pub width: i32,
    pub height: i32,
}

/// One placement of a generated asset on a track.
///
/// `in_ticks`/`out_ticks` are offsets into the source generation;
/// `timeline_start_ticks` is where the clip begins on the timeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Clip {
    pub id: String,
    pub generation_id: i64,
    #[serde(default)]
    pub shot_id: Option<i64>,
    #[serde(default)]
    pub label: String,
    pub source_duration_ticks: i64,
    pub in_ticks: i64,
    pub out_ticks: i64,
    pub timeline_start_ticks: i64,
    pub track_id: i64,
}

impl Clip {
    pub fn duration_ticks(&self) -> i64 {
        self.out_ticks.saturating_sub(self.in_ticks)
    }

    pub fn end_ticks(&self) -> i64 {
        self.timeline_start_ticks.saturating_add(self.duration_ticks())
    }

    pub fn contains(&self, position_ticks: i64) -> bool {
        position_ticks > self.timeline_start_ticks && position_ticks < self.end_ticks()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TrackKind {
    Video,
    Audio,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Track {
    pub id: i64,
    pub kind: TrackKind,
    #[serde(default)]
    pub name: String,
    pub clips: Vec<Clip>,
}

impl Track {
    pub fn new(id: i64, kind: TrackKind, name: impl Into<String>) -> Self {
        Track {
            id,
            kind,
            name: name.into(),
            clips: Vec::new(),
        }
    }

    pub(crate) fn sort_clips(&mut self) {
        self.clips.sort_by_key(|c| c.timeline_start_ticks);
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Marker {
    pub id: String,
    pub position_ticks: i64,
    pub label: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Timeline {
    pub settings: TimelineSettings,
    pub tracks: Vec<Track>,
    #[serde(default)]
    pub markers: Vec<Marker>,
}

impl Default for Timeline {
    fn default() -> Self {
        Timeline::new(TimelineSettings::default())
    }
}

impl Timeline {
    pub fn new(settings: TimelineSettings) -> Self {
        Timeline {
            settings,
            tracks: Vec::new(),
            markers: Vec::new(),
        }
    }

    /// End of the last clip on any track.
    pub fn duration_ticks(&self) -> i64 {
        self.tracks
            .iter()
            .flat_map(|t| t.clips.iter())
            .map(Clip::end_ticks)
            .max()
            .unwrap_or(0)
    }

    pub fn clip(&self, clip_id: &str) -> Option<&Clip> {
        self.tracks
            .iter()
            .flat_map(|t| t.clips.iter())
            .find(|c| c.id == clip_id)
    }

    pub fn track(&self, track_id: i64) -> Option<&Track> {
        self.tracks.iter().find(|t| t.id == track_id)
    }

    pub fn clip_count(&self) -> usize {
        self.tracks.iter().map(|t| t.clips.len()).sum()
    }

    /// Clips of one track ordered by timeline position.
    pub fn sorted_clips(&self, track_id: i64) -> Vec<&Clip> {
        let mut clips: Vec<&Clip> = self
            .track(track_id)
            .map(|t| t.clips.iter().collect())
            .unwrap_or_default();
        clips.sort_by_key(|c| c.timeline_start_ticks);
        clips
    }

    pub(crate) fn track_mut_or_create(&mut self, track_id: i64) -> &mut Track {
        let index = match self.tracks.iter().position(|t| t.id == track_id) {
            Some(index) => index,
            None => {
                self.tracks
                    .push(Track::new(track_id, TrackKind::Video, format!("V{}", track_id)));
                self.tracks.len() - 1
            }
        };
        &mut self.tracks[index]
    }

    pub(crate) fn clip_mut(&mut self, clip_id: &str) -> Option<&mut Clip> {
        self.tracks
            .iter_mut()
            .flat_map(|t| t.clips.iter_mut())
            .find(|c| c.id == clip_id)
    }
}
