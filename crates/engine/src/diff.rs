use crate::timeline::{Clip, Timeline};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TimelineDiff {
    pub added: Vec<String>,
    pub removed: Vec<String>,
    /// Clips whose track or timeline position changed.
    pub moved: Vec<String>,
    /// Clips whose source in/out points changed.
    pub trimmed: Vec<String>,
    pub markers_before: usize,
    pub markers_after: usize,
    pub duration_before_ticks: i64,
    pub duration_after_ticks: i64,
}

impl TimelineDiff {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty()
            && self.removed.is_empty()
            && self.moved.is_empty()
            && self.trimmed.is_empty()
            && self.markers_before == self.markers_after
    }
}

fn index_clips(timeline: &Timeline) -> HashMap<&str, &Clip> {
    timeline
        .tracks
        .iter()
        .flat_map(|t| t.clips.iter())
        .map(|c| (c.id.as_str(), c))
        .collect()
}

pub fn diff_timelines(from: &Timeline, to: &Timeline) -> TimelineDiff {
    let before = index_clips(from);
    let after = index_clips(to);

    let mut diff = TimelineDiff {
        markers_before: from.markers.len(),
        markers_after: to.markers.len(),
        duration_before_ticks: from.duration_ticks(),
        duration_after_ticks: to.duration_ticks(),
        ..Default::default()
    };

    for (id, new_clip) in &after {
        match before.get(id) {
            None => diff.added.push(id.to_string()),
            Some(old_clip) => {
                if old_clip.track_id != new_clip.track_id
                    || old_clip.timeline_start_ticks != new_clip.timeline_start_ticks
                {
                    diff.moved.push(id.to_string());
                }
                if old_clip.in_ticks != new_clip.in_ticks || old_clip.out_ticks != new_clip.out_ticks {
                    diff.trimmed.push(id.to_string());
                }
            }
        }
    }
    for id in before.keys() {
        if !after.contains_key(id) {
            diff.removed.push(id.to_string());
        }
    }

    diff.added.sort();
    diff.removed.sort();
    diff.moved.sort();
    diff.trimmed.sort();
    diff
}
