//! CMX3600 edit decision list export for finishing in an NLE.

use crate::timeline::{Timeline, STORYBOARD_TRACK_ID};
use crate::viewport::format_timecode;
use std::fmt::Write;

pub fn to_edl(title: &str, timeline: &Timeline, fps: f64) -> String {
    let mut out = String::new();
    let title = if title.trim().is_empty() { "UNTITLED" } else { title.trim() };
    let _ = writeln!(out, "TITLE: {}", title);
    let _ = writeln!(out, "FCM: NON-DROP FRAME");

    for (index, clip) in timeline.sorted_clips(STORYBOARD_TRACK_ID).into_iter().enumerate() {
        let _ = writeln!(out);
        let _ = writeln!(
            out,
            "{:03}  AX       V     C        {} {} {} {}",
            index + 1,
            format_timecode(clip.in_ticks, fps),
            format_timecode(clip.out_ticks, fps),
            format_timecode(clip.timeline_start_ticks, fps),
            format_timecode(clip.end_ticks(), fps),
        );
        let name = if clip.label.is_empty() {
            format!("generation-{}", clip.generation_id)
        } else {
            clip.label.clone()
        };
        let _ = writeln!(out, "* FROM CLIP NAME: {}", name);
    }
    out
}
