use std::collections::VecDeque;

use crate::{
    annotation::{Annotation, AnnotationId, NewAnnotation},
    error::{ReeflineError, ReeflineResult},
    geom,
    renderer::{PlaybackRenderer, RenderDelta, RendererConfig},
    timeline::TimelineScrollModel,
    tracks::TrackIndex,
};

/// The persistence/API collaborator. The engine only consumes it as a sink
/// for new/edited annotations; it owns no wire format of its own.
pub trait AnnotationStore {
    /// Persists a newly drawn annotation and returns the created record,
    /// including its id.
    fn create(&mut self, draft: &NewAnnotation) -> ReeflineResult<Annotation>;

    /// Appends a keyframe to an existing annotation. Must reject times that
    /// are not strictly after the annotation's current last frame.
    fn extend(&mut self, id: AnnotationId, frame: f64, points: &[f64]) -> ReeflineResult<()>;

    fn delete(&mut self, id: AnnotationId) -> ReeflineResult<()>;
}

/// Outbound notifications for the host UI layer.
#[derive(Clone, Debug)]
pub enum UiEvent {
    /// A draw action was submitted; carries the pending draft.
    CreateAnnotation { draft: NewAnnotation },
    Delete,
    CreateBookmark { time: f64 },
    Seek { time: f64 },
}

#[derive(Clone, Copy, Debug)]
pub struct ControllerConfig {
    /// Video duration in seconds.
    pub duration: f64,
    /// Video frame pixel height.
    pub frame_height: f64,
    pub track_width: f64,
    pub lane_height: f64,
}

/// Owns the playback/selection state the renderer and timeline share, instead
/// of leaving it in ambient globals: current time, play state, selection, the
/// feature map (via the renderer), the lane index, and the UI event queue.
///
/// Everything runs on one thread; tick, seek, and annotation-list mutation
/// handlers never re-enter each other.
pub struct PlaybackController<S: AnnotationStore> {
    store: S,
    renderer: PlaybackRenderer,
    tracks: TrackIndex,
    timeline: TimelineScrollModel,
    /// `(annotation, selected-at time)` pairs.
    selection: Vec<(AnnotationId, f64)>,
    events: VecDeque<UiEvent>,
    playing: bool,
}

impl<S: AnnotationStore> PlaybackController<S> {
    pub fn new(store: S, config: ControllerConfig) -> ReeflineResult<Self> {
        Ok(Self {
            store,
            renderer: PlaybackRenderer::new(RendererConfig::new(config.frame_height)),
            tracks: TrackIndex::default(),
            timeline: TimelineScrollModel::new(
                config.duration,
                config.track_width,
                config.lane_height,
            )?,
            selection: Vec::new(),
            events: VecDeque::new(),
            playing: false,
        })
    }

    /// Loads the full annotation set of the video. Invalid records are
    /// reported and skipped so one corrupt annotation cannot take down the
    /// timeline; the offenders are returned for surfacing.
    #[tracing::instrument(skip(self, annotations))]
    pub fn load(&mut self, annotations: Vec<Annotation>) -> Vec<(AnnotationId, ReeflineError)> {
        let mut rejected = Vec::new();
        let mut accepted = Vec::new();
        for ann in annotations {
            match ann.validate() {
                Ok(()) => accepted.push(ann),
                Err(err) => {
                    tracing::warn!(annotation = ann.id.0, error = %err, "rejected on load");
                    rejected.push((ann.id, err));
                }
            }
        }

        self.renderer.set_annotations(accepted);
        self.refresh_tracks();
        let time = self.renderer.current_time();
        let delta = self.renderer.settle(time);
        self.prune_selection(&delta);
        rejected
    }

    /// Submits a finished draw action. The draft is persisted first and only
    /// then announced to the UI and added to local state; a store failure
    /// leaves local state untouched and announces nothing (the draft is
    /// discarded, not retried).
    pub fn create_annotation(&mut self, draft: NewAnnotation) -> ReeflineResult<AnnotationId> {
        let created = self.store.create(&draft)?;
        created.validate()?;
        if self
            .renderer
            .annotations()
            .iter()
            .any(|a| a.id == created.id)
        {
            return Err(ReeflineError::store(format!(
                "store returned duplicate annotation id {}",
                created.id.0
            )));
        }
        self.events.push_back(UiEvent::CreateAnnotation { draft });

        let id = created.id;
        let active = created.is_active_at(self.renderer.current_time());

        self.renderer.insert(created);
        self.refresh_tracks();
        if active {
            let time = self.renderer.current_time();
            self.renderer.settle(time);
        }
        Ok(id)
    }

    /// Appends a keyframe while drawing continues across time. The local
    /// monotonicity and geometry checks run before the store call so a bad
    /// submission while paused never produces a partial write.
    pub fn extend_annotation(
        &mut self,
        id: AnnotationId,
        frame: f64,
        points: Vec<f64>,
    ) -> ReeflineResult<()> {
        let ann = self
            .renderer
            .annotations()
            .iter()
            .find(|a| a.id == id)
            .ok_or_else(|| {
                ReeflineError::validation(format!("unknown annotation {}", id.0))
            })?;
        if let Some(last) = ann.frames.last()
            && frame <= *last
        {
            return Err(ReeflineError::non_monotonic_frame(format!(
                "frame {frame} is not after last keyframe {last} of annotation {}",
                id.0
            )));
        }
        geom::validate_flat(ann.shape, &points)?;

        self.store.extend(id, frame, &points)?;

        let now = self.renderer.current_time();
        let Some(ann) = self.renderer.annotation_mut(id) else {
            return Err(ReeflineError::validation(format!(
                "unknown annotation {}",
                id.0
            )));
        };
        ann.push_keyframe(frame, points)?;
        let active = ann.is_active_at(now);

        self.refresh_tracks();
        if active {
            let time = self.renderer.current_time();
            self.renderer.settle(time);
        }
        Ok(())
    }

    /// Deletes an annotation. Local state (feature, lane assignment,
    /// selection) is only touched after the store confirms.
    pub fn delete_annotation(&mut self, id: AnnotationId) -> ReeflineResult<()> {
        self.store.delete(id)?;

        self.renderer.remove(id);
        self.selection.retain(|(a, _)| *a != id);
        self.refresh_tracks();
        let time = self.renderer.current_time();
        self.renderer.settle(time);
        self.events.push_back(UiEvent::Delete);
        Ok(())
    }

    /// Marks the given annotations selected as of the given times (parallel
    /// arrays).
    pub fn select(&mut self, ids: &[AnnotationId], times: &[f64]) -> ReeflineResult<()> {
        if ids.len() != times.len() {
            return Err(ReeflineError::validation(
                "selection ids and times must have equal length",
            ));
        }
        for (&id, &time) in ids.iter().zip(times) {
            // Unknown ids (stale UI references) are ignored.
            let Some(ann) = self.renderer.annotation_mut(id) else {
                continue;
            };
            ann.selected = Some(time);
            self.renderer.set_selected(id, true);
            if !self.selection.iter().any(|(a, _)| *a == id) {
                self.selection.push((id, time));
            }
        }
        Ok(())
    }

    pub fn deselect(&mut self) {
        for (id, _) in std::mem::take(&mut self.selection) {
            if let Some(ann) = self.renderer.annotation_mut(id) {
                ann.selected = None;
            }
            self.renderer.set_selected(id, false);
        }
    }

    pub fn play(&mut self) {
        self.playing = true;
    }

    /// Pausing halts the tick schedule and forces one settle so the rendered
    /// geometry matches the exact paused time, not the last ticked one.
    pub fn pause(&mut self) {
        self.playing = false;
        let time = self.renderer.current_time();
        let delta = self.renderer.settle(time);
        self.prune_selection(&delta);
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    /// Scheduled render tick; a no-op while paused or below the renderer's
    /// refresh threshold.
    pub fn tick(&mut self, wall_secs: f64, playback_secs: f64) -> Option<RenderDelta> {
        if !self.playing {
            return None;
        }
        let delta = self.renderer.tick(wall_secs, playback_secs)?;
        self.prune_selection(&delta);
        Some(delta)
    }

    /// Seeks to a clamped target time: settles synchronously and emits the
    /// seek request for the host's video element.
    pub fn seek(&mut self, time: f64) -> f64 {
        let time = self.timeline.clamp_time(time);
        let delta = self.renderer.settle(time);
        self.prune_selection(&delta);
        self.events.push_back(UiEvent::Seek { time });
        time
    }

    /// Seek from a click/drag at a horizontal track pixel offset.
    pub fn seek_pixel(&mut self, px: f64) -> f64 {
        self.seek(self.timeline.seek_target(px))
    }

    pub fn create_bookmark(&mut self) {
        self.events.push_back(UiEvent::CreateBookmark {
            time: self.renderer.current_time(),
        });
    }

    pub fn drain_events(&mut self) -> Vec<UiEvent> {
        self.events.drain(..).collect()
    }

    pub fn renderer(&self) -> &PlaybackRenderer {
        &self.renderer
    }

    pub fn tracks(&self) -> &TrackIndex {
        &self.tracks
    }

    pub fn timeline(&self) -> &TimelineScrollModel {
        &self.timeline
    }

    pub fn set_track_width(&mut self, track_width: f64) -> ReeflineResult<()> {
        self.timeline.set_track_width(track_width)
    }

    pub fn selection(&self) -> &[(AnnotationId, f64)] {
        &self.selection
    }

    fn refresh_tracks(&mut self) {
        self.tracks = TrackIndex::build(self.renderer.annotations());
        self.timeline.set_lane_counts(self.tracks.lane_counts());
    }

    /// Features leaving the active set also leave the selection set, and
    /// their annotations drop the selected flag.
    fn prune_selection(&mut self, delta: &RenderDelta) {
        if delta.exited.is_empty() {
            return;
        }
        let pruned: Vec<AnnotationId> = self
            .selection
            .iter()
            .map(|(id, _)| *id)
            .filter(|id| delta.exited.contains(id))
            .collect();
        for id in pruned {
            if let Some(ann) = self.renderer.annotation_mut(id) {
                ann.selected = None;
            }
        }
        self.selection.retain(|(id, _)| !delta.exited.contains(id));
    }
}
