use crate::error::{EngineError, EngineResult};
use crate::timeline::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum TimelineOperation {
    InsertClip {
        generation_id: i64,
        #[serde(default)]
        shot_id: Option<i64>,
        #[serde(default)]
        label: String,
        source_duration_ticks: i64,
        track_id: i64,
        position_ticks: i64,
    },
    MoveClip {
        clip_id: String,
        new_position_ticks: i64,
    },
    MoveClipToTrack {
        clip_id: String,
        new_track_id: i64,
    },
    TrimStart {
        clip_id: String,
        delta_ticks: i64,
    },
    TrimEnd {
        clip_id: String,
        delta_ticks: i64,
    },
    SplitClip {
        clip_id: String,
        position_ticks: i64,
    },
    DeleteClip {
        clip_id: String,
    },
    RippleDelete {
        clip_id: String,
    },
    AddMarker {
        position_ticks: i64,
        #[serde(default)]
        label: Option<String>,
    },
    RemoveMarker {
        marker_id: String,
    },
    ClearTimeline,
}

impl Timeline {
    /// Apply a batch in order, stopping at the first failure.
    ///
    /// Operations before the failing one stay applied; apply to a clone when
    /// the batch must be all-or-nothing.
    pub fn apply_all(&mut self, ops: Vec<TimelineOperation>) -> EngineResult<()> {
        for op in ops {
            self.apply_operation(op)?;
        }
        Ok(())
    }

    pub fn apply_operation(&mut self, op: TimelineOperation) -> EngineResult<()> {
        match op {
            TimelineOperation::InsertClip {
                generation_id,
                shot_id,
                label,
                source_duration_ticks,
                track_id,
                position_ticks,
            } => {
                if !(MIN_CLIP_DURATION_TICKS..=MAX_TIMELINE_TICKS).contains(&source_duration_ticks) {
                    return Err(EngineError::Validation(format!(
                        "source duration must be between {} and {} ticks, got {}",
                        MIN_CLIP_DURATION_TICKS, MAX_TIMELINE_TICKS, source_duration_ticks
                    )));
                }
                check_position(position_ticks)?;
                let track = self.track_mut_or_create(track_id);
                if track.kind != TrackKind::Video {
                    return Err(EngineError::Validation(format!(
                        "track {} does not accept video clips",
                        track_id
                    )));
                }
                track.clips.push(Clip {
                    id: Uuid::new_v4().to_string(),
                    generation_id,
                    shot_id,
                    label,
                    source_duration_ticks,
                    in_ticks: 0,
                    out_ticks: source_duration_ticks,
                    timeline_start_ticks: position_ticks.max(0),
                    track_id,
                });
                track.sort_clips();
                Ok(())
            }
            TimelineOperation::MoveClip {
                clip_id,
                new_position_ticks,
            } => {
                check_position(new_position_ticks)?;
                for track in &mut self.tracks {
                    if let Some(clip) = track.clips.iter_mut().find(|c| c.id == clip_id) {
                        clip.timeline_start_ticks = new_position_ticks.max(0);
                        track.sort_clips();
                        return Ok(());
                    }
                }
                Err(EngineError::ClipNotFound(clip_id))
            }
            TimelineOperation::MoveClipToTrack {
                clip_id,
                new_track_id,
            } => {
                if let Some(target) = self.track(new_track_id) {
                    if target.kind != TrackKind::Video {
                        return Err(EngineError::Validation(format!(
                            "track {} does not accept video clips",
                            new_track_id
                        )));
                    }
                }
                let mut clip_to_move: Option<Clip> = None;
                for track in &mut self.tracks {
                    if let Some(clip_index) = track.clips.iter().position(|c| c.id == clip_id) {
                        clip_to_move = Some(track.clips.remove(clip_index));
                        break;
                    }
                }

                let mut clip = clip_to_move.ok_or(EngineError::ClipNotFound(clip_id))?;
                clip.track_id = new_track_id;
                let target_track = self.track_mut_or_create(new_track_id);
                target_track.clips.push(clip);
                target_track.sort_clips();
                Ok(())
            }
            TimelineOperation::TrimStart { clip_id, delta_ticks } => {
                for track in &mut self.tracks {
                    if let Some(clip) = track.clips.iter_mut().find(|c| c.id == clip_id) {
                        // The head cannot pass the timeline origin or the source start.
                        let lower = (clip.in_ticks - clip.timeline_start_ticks).max(0);
                        let upper = clip.out_ticks - MIN_CLIP_DURATION_TICKS;
                        if upper >= lower {
                            let new_in = clip.in_ticks.saturating_add(delta_ticks).clamp(lower, upper);
                            clip.timeline_start_ticks += new_in - clip.in_ticks;
                            clip.in_ticks = new_in;
                            track.sort_clips();
                        }
                        return Ok(());
                    }
                }
                Err(EngineError::ClipNotFound(clip_id))
            }
            TimelineOperation::TrimEnd { clip_id, delta_ticks } => {
                let clip = self
                    .clip_mut(&clip_id)
                    .ok_or_else(|| EngineError::ClipNotFound(clip_id.clone()))?;

                let lower = clip.in_ticks + MIN_CLIP_DURATION_TICKS;
                let upper = clip.source_duration_ticks;
                if upper < lower {
                    return Ok(());
                }
                clip.out_ticks = clip.out_ticks.saturating_add(delta_ticks).clamp(lower, upper);
                Ok(())
            }
            TimelineOperation::SplitClip {
                clip_id,
                position_ticks,
            } => {
                for track in &mut self.tracks {
                    if let Some(clip_index) = track.clips.iter().position(|c| c.id == clip_id) {
                        let clip = &mut track.clips[clip_index];
                        let left = position_ticks.saturating_sub(clip.timeline_start_ticks);
                        let right = clip.end_ticks().saturating_sub(position_ticks);
                        if left < MIN_CLIP_DURATION_TICKS || right < MIN_CLIP_DURATION_TICKS {
                            return Err(EngineError::InvalidSplit {
                                clip_id,
                                position_ticks,
                            });
                        }

                        let split_in = clip.in_ticks + left;
                        let new_clip = Clip {
                            id: Uuid::new_v4().to_string(),
                            in_ticks: split_in,
                            timeline_start_ticks: position_ticks,
                            ..clip.clone()
                        };
                        clip.out_ticks = split_in;
                        track.clips.insert(clip_index + 1, new_clip);
                        return Ok(());
                    }
                }
                Err(EngineError::ClipNotFound(clip_id))
            }
            TimelineOperation::DeleteClip { clip_id } => {
                for track in &mut self.tracks {
                    if let Some(clip_index) = track.clips.iter().position(|c| c.id == clip_id) {
                        track.clips.remove(clip_index);
                        return Ok(());
                    }
                }
                Err(EngineError::ClipNotFound(clip_id))
            }
            TimelineOperation::RippleDelete { clip_id } => {
                for track in &mut self.tracks {
                    if let Some(clip_index) = track.clips.iter().position(|c| c.id == clip_id) {
                        let removed = track.clips.remove(clip_index);
                        let gap = removed.duration_ticks();
                        for clip in &mut track.clips {
                            if clip.timeline_start_ticks >= removed.timeline_start_ticks {
                                clip.timeline_start_ticks = (clip.timeline_start_ticks - gap)
                                    .max(removed.timeline_start_ticks);
                            }
                        }
                        track.sort_clips();
                        return Ok(());
                    }
                }
                Err(EngineError::ClipNotFound(clip_id))
            }
            TimelineOperation::AddMarker {
                position_ticks,
                label,
            } => {
                self.markers.push(Marker {
                    id: Uuid::new_v4().to_string(),
                    position_ticks: position_ticks.clamp(0, MAX_TIMELINE_TICKS),
                    label,
                });
                self.markers.sort_by_key(|m| m.position_ticks);
                Ok(())
            }
            TimelineOperation::RemoveMarker { marker_id } => {
                let index = self
                    .markers
                    .iter()
                    .position(|m| m.id == marker_id)
                    .ok_or(EngineError::MarkerNotFound(marker_id))?;
                self.markers.remove(index);
                Ok(())
            }
            TimelineOperation::ClearTimeline => {
                for track in &mut self.tracks {
                    track.clips.clear();
                }
                self.markers.clear();
                Ok(())
            }
        }
    }
}

fn check_position(position_ticks: i64) -> EngineResult<()> {
    if position_ticks > MAX_TIMELINE_TICKS {
        return Err(EngineError::Validation(format!(
            "position {} is past the end of the timeline ({} ticks)",
            position_ticks, MAX_TIMELINE_TICKS
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SEC: i64 = TICKS_PER_SECOND;

    fn timeline_with_clips(starts_and_durations: &[(i64, i64)]) -> (Timeline, Vec<String>) {
        let mut timeline = Timeline::default();
        for (i, (start, duration)) in starts_and_durations.iter().enumerate() {
            timeline
                .apply_operation(TimelineOperation::InsertClip {
                    generation_id: i as i64 + 1,
                    shot_id: None,
                    label: format!("shot {}", i + 1),
                    source_duration_ticks: *duration,
                    track_id: STORYBOARD_TRACK_ID,
                    position_ticks: *start,
                })
                .unwrap();
        }
        let ids = timeline
            .sorted_clips(STORYBOARD_TRACK_ID)
            .iter()
            .map(|c| c.id.clone())
            .collect();
        (timeline, ids)
    }

    #[test]
    fn insert_creates_track_and_keeps_clips_sorted() {
        let (timeline, _) = timeline_with_clips(&[(4 * SEC, SEC), (0, 2 * SEC)]);
        let track = timeline.track(STORYBOARD_TRACK_ID).unwrap();
        assert_eq!(track.kind, TrackKind::Video);
        assert_eq!(track.clips[0].timeline_start_ticks, 0);
        assert_eq!(track.clips[1].timeline_start_ticks, 4 * SEC);
    }

    #[test]
    fn insert_rejects_sources_shorter_than_minimum() {
        let mut timeline = Timeline::default();
        let err = timeline
            .apply_operation(TimelineOperation::InsertClip {
                generation_id: 1,
                shot_id: None,
                label: String::new(),
                source_duration_ticks: MIN_CLIP_DURATION_TICKS - 1,
                track_id: 1,
                position_ticks: 0,
            })
            .unwrap_err();
        assert!(matches!(err, EngineError::Validation(_)));
    }

    #[test]
    fn insert_rejects_audio_tracks() {
        let mut timeline = Timeline::default();
        timeline.tracks.push(Track::new(MUSIC_TRACK_ID, TrackKind::Audio, "Music"));
        let result = timeline.apply_operation(TimelineOperation::InsertClip {
            generation_id: 1,
            shot_id: None,
            label: String::new(),
            source_duration_ticks: SEC,
            track_id: MUSIC_TRACK_ID,
            position_ticks: 0,
        });
        assert!(result.is_err());
    }

    #[test]
    fn drag_clamps_to_timeline_origin() {
        let (mut timeline, ids) = timeline_with_clips(&[(SEC, SEC)]);
        timeline
            .apply_operation(TimelineOperation::MoveClip {
                clip_id: ids[0].clone(),
                new_position_ticks: -5 * SEC,
            })
            .unwrap();
        assert_eq!(timeline.clip(&ids[0]).unwrap().timeline_start_ticks, 0);
    }

    #[test]
    fn move_to_track_creates_target() {
        let (mut timeline, ids) = timeline_with_clips(&[(0, SEC)]);
        timeline
            .apply_operation(TimelineOperation::MoveClipToTrack {
                clip_id: ids[0].clone(),
                new_track_id: 3,
            })
            .unwrap();
        assert!(timeline.track(STORYBOARD_TRACK_ID).unwrap().clips.is_empty());
        let moved = timeline.clip(&ids[0]).unwrap();
        assert_eq!(moved.track_id, 3);
        assert_eq!(timeline.track(3).unwrap().clips.len(), 1);
    }

    #[test]
    fn trim_end_stops_at_minimum_duration() {
        let (mut timeline, ids) = timeline_with_clips(&[(0, 4 * SEC)]);
        timeline
            .apply_operation(TimelineOperation::TrimEnd {
                clip_id: ids[0].clone(),
                delta_ticks: -10 * SEC,
            })
            .unwrap();
        assert_eq!(
            timeline.clip(&ids[0]).unwrap().duration_ticks(),
            MIN_CLIP_DURATION_TICKS
        );
    }

    #[test]
    fn trim_end_cannot_extend_past_source() {
        let (mut timeline, ids) = timeline_with_clips(&[(0, 4 * SEC)]);
        timeline
            .apply_operation(TimelineOperation::TrimEnd {
                clip_id: ids[0].clone(),
                delta_ticks: 3 * SEC,
            })
            .unwrap();
        assert_eq!(timeline.clip(&ids[0]).unwrap().out_ticks, 4 * SEC);
    }

    #[test]
    fn trim_start_moves_head_and_keeps_tail_fixed() {
        let (mut timeline, ids) = timeline_with_clips(&[(2 * SEC, 4 * SEC)]);
        timeline
            .apply_operation(TimelineOperation::TrimStart {
                clip_id: ids[0].clone(),
                delta_ticks: SEC,
            })
            .unwrap();
        let clip = timeline.clip(&ids[0]).unwrap();
        assert_eq!(clip.in_ticks, SEC);
        assert_eq!(clip.timeline_start_ticks, 3 * SEC);
        assert_eq!(clip.end_ticks(), 6 * SEC);
    }

    #[test]
    fn trim_start_respects_minimum_duration() {
        let (mut timeline, ids) = timeline_with_clips(&[(0, 2 * SEC)]);
        timeline
            .apply_operation(TimelineOperation::TrimStart {
                clip_id: ids[0].clone(),
                delta_ticks: 5 * SEC,
            })
            .unwrap();
        let clip = timeline.clip(&ids[0]).unwrap();
        assert_eq!(clip.duration_ticks(), MIN_CLIP_DURATION_TICKS);
        assert_eq!(clip.end_ticks(), 2 * SEC);
    }

    #[test]
    fn trim_start_cannot_reveal_before_source_start() {
        let (mut timeline, ids) = timeline_with_clips(&[(3 * SEC, 2 * SEC)]);
        timeline
            .apply_operation(TimelineOperation::TrimStart {
                clip_id: ids[0].clone(),
                delta_ticks: -SEC,
            })
            .unwrap();
        let clip = timeline.clip(&ids[0]).unwrap();
        assert_eq!(clip.in_ticks, 0);
        assert_eq!(clip.timeline_start_ticks, 3 * SEC);
    }

    #[test]
    fn split_produces_two_adjacent_clips() {
        let (mut timeline, ids) = timeline_with_clips(&[(SEC, 4 * SEC)]);
        timeline
            .apply_operation(TimelineOperation::SplitClip {
                clip_id: ids[0].clone(),
                position_ticks: 2 * SEC,
            })
            .unwrap();
        let clips = timeline.sorted_clips(STORYBOARD_TRACK_ID);
        assert_eq!(clips.len(), 2);
        assert_eq!(clips[0].id, ids[0]);
        assert_eq!(clips[0].end_ticks(), 2 * SEC);
        assert_eq!(clips[1].timeline_start_ticks, 2 * SEC);
        assert_eq!(clips[1].in_ticks, SEC);
        assert_eq!(clips[1].end_ticks(), 5 * SEC);
        assert_ne!(clips[1].id, ids[0]);
    }

    #[test]
    fn split_too_close_to_edge_is_rejected() {
        let (mut timeline, ids) = timeline_with_clips(&[(0, 2 * SEC)]);
        let err = timeline
            .apply_operation(TimelineOperation::SplitClip {
                clip_id: ids[0].clone(),
                position_ticks: SEC / 4,
            })
            .unwrap_err();
        assert!(matches!(err, EngineError::InvalidSplit { .. }));
        assert_eq!(timeline.clip_count(), 1);
    }

    #[test]
    fn ripple_delete_closes_the_gap() {
        let (mut timeline, ids) = timeline_with_clips(&[(0, 2 * SEC), (2 * SEC, 3 * SEC), (5 * SEC, SEC)]);
        timeline
            .apply_operation(TimelineOperation::RippleDelete {
                clip_id: ids[1].clone(),
            })
            .unwrap();
        let clips = timeline.sorted_clips(STORYBOARD_TRACK_ID);
        assert_eq!(clips.len(), 2);
        assert_eq!(clips[1].id, ids[2]);
        assert_eq!(clips[1].timeline_start_ticks, 2 * SEC);
    }

    #[test]
    fn delete_leaves_gap() {
        let (mut timeline, ids) = timeline_with_clips(&[(0, 2 * SEC), (2 * SEC, SEC)]);
        timeline
            .apply_operation(TimelineOperation::DeleteClip {
                clip_id: ids[0].clone(),
            })
            .unwrap();
        assert_eq!(timeline.clip(&ids[1]).unwrap().timeline_start_ticks, 2 * SEC);
    }

    #[test]
    fn unknown_clip_is_reported() {
        let mut timeline = Timeline::default();
        let err = timeline
            .apply_operation(TimelineOperation::DeleteClip {
                clip_id: "nope".into(),
            })
            .unwrap_err();
        assert!(matches!(err, EngineError::ClipNotFound(id) if id == "nope"));
    }

    #[test]
    fn markers_are_added_and_removed() {
        let mut timeline = Timeline::default();
        timeline
            .apply_operation(TimelineOperation::AddMarker {
                position_ticks: -10,
                label: Some("act break".into()),
            })
            .unwrap();
        assert_eq!(timeline.markers[0].position_ticks, 0);
        let marker_id = timeline.markers[0].id.clone();
        timeline
            .apply_operation(TimelineOperation::RemoveMarker { marker_id })
            .unwrap();
        assert!(timeline.markers.is_empty());
        assert!(timeline
            .apply_operation(TimelineOperation::RemoveMarker {
                marker_id: "gone".into()
            })
            .is_err());
    }

    #[test]
    fn clear_keeps_tracks() {
        let (mut timeline, _) = timeline_with_clips(&[(0, SEC), (SEC, SEC)]);
        timeline.apply_operation(TimelineOperation::ClearTimeline).unwrap();
        assert_eq!(timeline.clip_count(), 0);
        assert_eq!(timeline.tracks.len(), 1);
    }

    #[test]
    fn operations_deserialize_from_tagged_json() {
        let ops: Vec<TimelineOperation> = serde_json::from_str(
            r#"[{"type":"TrimEnd","clip_id":"a","delta_ticks":-100},{"type":"ClearTimeline"}]"#,
        )
        .unwrap();
        assert!(matches!(ops[0], TimelineOperation::TrimEnd { delta_ticks: -100, .. }));
        assert!(matches!(ops[1], TimelineOperation::ClearTimeline));
    }

    #[test]
    fn apply_all_stops_at_first_error() {
        let (mut timeline, ids) = timeline_with_clips(&[(0, 2 * SEC)]);
        let result = timeline.apply_all(vec![
            TimelineOperation::MoveClip {
                clip_id: ids[0].clone(),
                new_position_ticks: SEC,
            },
            TimelineOperation::DeleteClip {
                clip_id: "missing".into(),
            },
            TimelineOperation::ClearTimeline,
        ]);
        assert!(result.is_err());
        assert_eq!(timeline.clip(&ids[0]).unwrap().timeline_start_ticks, SEC);
    }

    #[test]
    fn extreme_trim_deltas_clamp_instead_of_overflowing() {
        let (mut timeline, ids) = timeline_with_clips(&[(SEC, 4 * SEC)]);
        timeline
            .apply_all(vec![
                TimelineOperation::TrimEnd {
                    clip_id: ids[0].clone(),
                    delta_ticks: i64::MAX,
                },
                TimelineOperation::TrimStart {
                    clip_id: ids[0].clone(),
                    delta_ticks: i64::MIN,
                },
            ])
            .unwrap();
        let clip = timeline.clip(&ids[0]).unwrap();
        assert_eq!((clip.in_ticks, clip.out_ticks), (0, 4 * SEC));

        timeline
            .apply_all(vec![
                TimelineOperation::TrimStart {
                    clip_id: ids[0].clone(),
                    delta_ticks: i64::MAX,
                },
                TimelineOperation::TrimEnd {
                    clip_id: ids[0].clone(),
                    delta_ticks: i64::MIN,
                },
            ])
            .unwrap();
        let clip = timeline.clip(&ids[0]).unwrap();
        assert_eq!(clip.duration_ticks(), MIN_CLIP_DURATION_TICKS);
        assert_eq!(timeline.duration_ticks(), clip.end_ticks());
    }

    #[test]
    fn split_at_extreme_positions_is_rejected() {
        let (mut timeline, ids) = timeline_with_clips(&[(SEC, 4 * SEC)]);
        for position_ticks in [i64::MAX, i64::MIN] {
            let err = timeline
                .apply_operation(TimelineOperation::SplitClip {
                    clip_id: ids[0].clone(),
                    position_ticks,
                })
                .unwrap_err();
            assert!(matches!(err, EngineError::InvalidSplit { .. }));
        }
        assert_eq!(timeline.clip_count(), 1);
    }

    #[test]
    fn positions_past_the_end_are_rejected() {
        let (mut timeline, ids) = timeline_with_clips(&[(0, SEC)]);

        let insert = timeline.apply_operation(TimelineOperation::InsertClip {
            generation_id: 9,
            shot_id: None,
            label: String::new(),
            source_duration_ticks: SEC,
            track_id: STORYBOARD_TRACK_ID,
            position_ticks: i64::MAX,
        });
        assert!(matches!(insert, Err(EngineError::Validation(_))));

        let huge_source = timeline.apply_operation(TimelineOperation::InsertClip {
            generation_id: 9,
            shot_id: None,
            label: String::new(),
            source_duration_ticks: i64::MAX,
            track_id: STORYBOARD_TRACK_ID,
            position_ticks: 0,
        });
        assert!(matches!(huge_source, Err(EngineError::Validation(_))));

        let moved = timeline.apply_operation(TimelineOperation::MoveClip {
            clip_id: ids[0].clone(),
            new_position_ticks: MAX_TIMELINE_TICKS + 1,
        });
        assert!(matches!(moved, Err(EngineError::Validation(_))));

        assert_eq!(timeline.clip_count(), 1);
        assert_eq!(timeline.duration_ticks(), SEC);
    }

    #[test]
    fn markers_clamp_to_the_timeline_bounds() {
        let mut timeline = Timeline::default();
        timeline
            .apply_all(vec![
                TimelineOperation::AddMarker {
                    position_ticks: i64::MAX,
                    label: None,
                },
                TimelineOperation::AddMarker {
                    position_ticks: i64::MIN,
                    label: None,
                },
            ])
            .unwrap();
        assert_eq!(timeline.markers[0].position_ticks, 0);
        assert_eq!(timeline.markers[1].position_ticks, MAX_TIMELINE_TICKS);
    }

    #[test]
    fn clips_cannot_move_onto_audio_tracks() {
        let (mut timeline, ids) = timeline_with_clips(&[(0, SEC)]);
        timeline.tracks.push(Track::new(MUSIC_TRACK_ID, TrackKind::Audio, "Music"));

        let err = timeline
            .apply_operation(TimelineOperation::MoveClipToTrack {
                clip_id: ids[0].clone(),
                new_track_id: MUSIC_TRACK_ID,
            })
            .unwrap_err();
        assert!(matches!(err, EngineError::Validation(_)));
        assert_eq!(timeline.clip(&ids[0]).unwrap().track_id, STORYBOARD_TRACK_ID);
        assert!(timeline.track(MUSIC_TRACK_ID).unwrap().clips.is_empty());
    }

    #[test]
    fn trim_start_keeps_track_in_timeline_order() {
        let (mut timeline, ids) = timeline_with_clips(&[(2 * SEC, 4 * SEC), (3 * SEC, SEC)]);
        timeline
            .apply_operation(TimelineOperation::TrimStart {
                clip_id: ids[0].clone(),
                delta_ticks: 2 * SEC,
            })
            .unwrap();
        let track = timeline.track(STORYBOARD_TRACK_ID).unwrap();
        assert_eq!(track.clips[0].id, ids[1]);
        assert_eq!(track.clips[1].timeline_start_ticks, 4 * SEC);
    }
}
