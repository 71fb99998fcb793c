use std::collections::{HashMap, HashSet};

use crate::{
    annotation::{Annotation, AnnotationId},
    error::ReeflineResult,
    geom::{self, Geometry},
    interp::Interpolator,
};

/// One live renderable per active annotation. Created when the annotation
/// enters the active set, destroyed when it leaves, and geometry-mutated in
/// place on every tick in between. The rendering layer relies on that stable
/// identity to avoid flicker.
#[derive(Clone, Debug, PartialEq)]
pub struct RenderFeature {
    pub annotation: AnnotationId,
    pub geometry: Geometry,
    pub selected: bool,
}

#[derive(Clone, Copy, Debug)]
pub struct RendererConfig {
    /// Upper bound on expensive recomputation, in ticks per second.
    pub target_hz: f64,
    /// Video frame pixel height, the codec's Y-inversion reference.
    pub frame_height: f64,
}

impl RendererConfig {
    pub fn new(frame_height: f64) -> Self {
        Self {
            target_hz: 30.0,
            frame_height,
        }
    }
}

/// Active-set change produced by a recomputation.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RenderDelta {
    pub entered: Vec<AnnotationId>,
    pub exited: Vec<AnnotationId>,
}

/// Drives the per-tick update of renderable features synced to video
/// playback.
///
/// The host calls [`tick`](Self::tick) on every animation-frame opportunity;
/// the wall-clock throttle keeps the active-set diff and interpolation at the
/// target rate regardless of the display refresh. [`settle`](Self::settle)
/// bypasses the throttle for pause/seek so no stale geometry survives.
pub struct PlaybackRenderer {
    config: RendererConfig,
    interpolator: Interpolator,
    /// Sorted ascending by first keyframe time.
    annotations: Vec<Annotation>,
    features: HashMap<AnnotationId, RenderFeature>,
    /// Annotations already reported as corrupt; skipped without re-logging.
    failed: HashSet<AnnotationId>,
    last_tick_wall: Option<f64>,
    current_time: f64,
}

impl PlaybackRenderer {
    pub fn new(config: RendererConfig) -> Self {
        Self::with_interpolator(config, Interpolator::default())
    }

    pub fn with_interpolator(config: RendererConfig, interpolator: Interpolator) -> Self {
        Self {
            config,
            interpolator,
            annotations: Vec::new(),
            features: HashMap::new(),
            failed: HashSet::new(),
            last_tick_wall: None,
            current_time: 0.0,
        }
    }

    pub fn current_time(&self) -> f64 {
        self.current_time
    }

    pub fn annotations(&self) -> &[Annotation] {
        &self.annotations
    }

    /// Replaces the whole annotation list. Features of vanished annotations
    /// are dropped; the caller settles to refresh the rest.
    pub fn set_annotations(&mut self, mut annotations: Vec<Annotation>) {
        annotations.sort_by(|a, b| a.interval().start.total_cmp(&b.interval().start));
        self.features
            .retain(|id, _| annotations.iter().any(|a| a.id == *id));
        self.failed.clear();
        self.annotations = annotations;
    }

    pub fn insert(&mut self, annotation: Annotation) {
        self.annotations.retain(|a| a.id != annotation.id);
        self.failed.remove(&annotation.id);
        let start = annotation.interval().start;
        let at = self
            .annotations
            .partition_point(|a| a.interval().start <= start);
        self.annotations.insert(at, annotation);
    }

    pub fn remove(&mut self, id: AnnotationId) {
        self.annotations.retain(|a| a.id != id);
        self.features.remove(&id);
        self.failed.remove(&id);
    }

    /// Mutable access for keyframe appends and selection marks. Appending
    /// keyframes never changes the first frame, so the start-sorted order is
    /// preserved.
    pub fn annotation_mut(&mut self, id: AnnotationId) -> Option<&mut Annotation> {
        self.annotations.iter_mut().find(|a| a.id == id)
    }

    pub fn feature(&self, id: AnnotationId) -> Option<&RenderFeature> {
        self.features.get(&id)
    }

    pub fn features(&self) -> impl Iterator<Item = &RenderFeature> {
        self.features.values()
    }

    pub fn set_selected(&mut self, id: AnnotationId, selected: bool) {
        if let Some(feature) = self.features.get_mut(&id) {
            feature.selected = selected;
        }
    }

    /// Throttled recomputation. Returns `None` when the elapsed wall-clock
    /// time since the last rendered tick is below the refresh threshold.
    pub fn tick(&mut self, wall_secs: f64, playback_secs: f64) -> Option<RenderDelta> {
        if let Some(last) = self.last_tick_wall
            && wall_secs - last < 1.0 / self.config.target_hz
        {
            return None;
        }
        self.last_tick_wall = Some(wall_secs);
        Some(self.recompute(playback_secs))
    }

    /// Forced synchronous recomputation for pause/seek and annotation-list
    /// changes; never waits for the next scheduled tick.
    #[tracing::instrument(skip(self))]
    pub fn settle(&mut self, playback_secs: f64) -> RenderDelta {
        self.recompute(playback_secs)
    }

    fn recompute(&mut self, t: f64) -> RenderDelta {
        self.current_time = t;

        let mut active: Vec<usize> = Vec::new();
        for (i, ann) in self.annotations.iter().enumerate() {
            // Input is sorted by start, so nothing past this point is active.
            if ann.interval().start > t {
                break;
            }
            if ann.is_active_at(t) && !self.failed.contains(&ann.id) {
                active.push(i);
            }
        }

        let active_ids: HashSet<AnnotationId> =
            active.iter().map(|&i| self.annotations[i].id).collect();

        let mut delta = RenderDelta::default();
        let exited: Vec<AnnotationId> = self
            .features
            .keys()
            .filter(|id| !active_ids.contains(id))
            .copied()
            .collect();
        for id in exited {
            self.features.remove(&id);
            delta.exited.push(id);
        }

        for i in active {
            let ann = &self.annotations[i];
            let geometry = match sample(&self.interpolator, ann, t, self.config.frame_height) {
                Ok(g) => g,
                Err(err) => {
                    // One corrupt annotation must not stop the rest.
                    tracing::warn!(
                        annotation = ann.id.0,
                        error = %err,
                        "skipping annotation with undecodable geometry"
                    );
                    self.failed.insert(ann.id);
                    if self.features.remove(&ann.id).is_some() {
                        delta.exited.push(ann.id);
                    }
                    continue;
                }
            };

            match self.features.get_mut(&ann.id) {
                Some(feature) => feature.geometry = geometry,
                None => {
                    self.features.insert(
                        ann.id,
                        RenderFeature {
                            annotation: ann.id,
                            geometry,
                            selected: ann.selected.is_some(),
                        },
                    );
                    delta.entered.push(ann.id);
                }
            }
        }

        delta
    }
}

/// Interpolated geometry of one annotation at playback time `t`.
///
/// Times outside the keyframe span take the nearest-end keyframe unmodified;
/// single-keyframe annotations always take their only keyframe.
fn sample(
    interpolator: &Interpolator,
    ann: &Annotation,
    t: f64,
    frame_height: f64,
) -> ReeflineResult<Geometry> {
    let last = ann.frames.len() - 1;
    if ann.is_single_frame() {
        return geom::decode(ann.shape, &ann.points[0], frame_height);
    }
    // The later-keyframe check comes first: when first and last frame
    // coincide, the degenerate span snaps to the later keyframe.
    if t >= ann.frames[last] {
        return geom::decode(ann.shape, &ann.points[last], frame_height);
    }
    if t <= ann.frames[0] {
        return geom::decode(ann.shape, &ann.points[0], frame_height);
    }

    // Scan from the end: playback time usually sits in one of the last
    // visited segments as it increases monotonically.
    let mut k = last - 1;
    for i in (0..last).rev() {
        if ann.frames[i] <= t {
            k = i;
            break;
        }
    }

    let span = ann.frames[k + 1] - ann.frames[k];
    // Zero-length segments cannot happen under the sorted-frames invariant,
    // but snap to the later keyframe instead of dividing by zero.
    let local_t = if span > 0.0 {
        (t - ann.frames[k]) / span
    } else {
        1.0
    };

    let flat = interpolator.interpolate(ann.shape, &ann.points[k], &ann.points[k + 1], local_t)?;
    geom::decode(ann.shape, &flat, frame_height)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotation::{LabelAttachment, LabelId, UserId};
    use crate::geom::Shape;
    use kurbo::Point;

    const H: f64 = 100.0;

    fn ann(id: u64, frames: Vec<f64>, points: Vec<Vec<f64>>) -> Annotation {
        Annotation {
            id: AnnotationId(id),
            shape: Shape::Point,
            frames,
            points,
            labels: vec![LabelAttachment {
                label: LabelId(1),
                confidence: 1.0,
                user: UserId(1),
            }],
            selected: None,
        }
    }

    fn renderer() -> PlaybackRenderer {
        PlaybackRenderer::new(RendererConfig::new(H))
    }

    fn walker() -> Annotation {
        ann(
            1,
            vec![1.0, 3.0, 5.0],
            vec![vec![0.0, 0.0], vec![10.0, 10.0], vec![20.0, 20.0]],
        )
    }

    #[test]
    fn active_window_boundaries() {
        let mut r = renderer();
        r.set_annotations(vec![walker()]);

        r.settle(0.0);
        assert!(r.feature(AnnotationId(1)).is_none());

        r.settle(1.0);
        assert!(r.feature(AnnotationId(1)).is_some());

        r.settle(5.0);
        assert!(r.feature(AnnotationId(1)).is_some(), "upper bound is closed");

        let delta = r.settle(6.0);
        assert!(r.feature(AnnotationId(1)).is_none());
        assert_eq!(delta.exited, vec![AnnotationId(1)]);
    }

    #[test]
    fn keyframe_boundary_starts_next_segment() {
        let mut r = renderer();
        r.set_annotations(vec![walker()]);

        // At t=3 the bounding pair is [3,5] with local t = 0: the middle
        // keyframe's geometry, bit-for-bit.
        r.settle(3.0);
        let f = r.feature(AnnotationId(1)).unwrap();
        assert_eq!(
            f.geometry,
            geom::decode(Shape::Point, &[10.0, 10.0], H).unwrap()
        );

        // Midway through [1,3].
        r.settle(2.0);
        let f = r.feature(AnnotationId(1)).unwrap();
        assert_eq!(f.geometry, Geometry::Point(Point::new(5.0, H - 5.0)));
    }

    #[test]
    fn single_frame_annotation_stays_rendered() {
        let mut r = renderer();
        r.set_annotations(vec![ann(1, vec![2.0], vec![vec![7.0, 7.0]])]);

        r.settle(1.0);
        assert!(r.feature(AnnotationId(1)).is_none());
        r.settle(2.0);
        assert!(r.feature(AnnotationId(1)).is_some());
        r.settle(500.0);
        let f = r.feature(AnnotationId(1)).unwrap();
        assert_eq!(f.geometry, Geometry::Point(Point::new(7.0, H - 7.0)));
    }

    #[test]
    fn tick_is_throttled_by_wall_clock() {
        let mut r = renderer();
        r.set_annotations(vec![walker()]);

        assert!(r.tick(0.0, 2.0).is_some());
        assert!(r.tick(0.01, 2.1).is_none(), "below 30 Hz threshold");
        assert_eq!(r.current_time(), 2.0, "no-op tick leaves state untouched");
        assert!(r.tick(0.04, 2.2).is_some());
        assert_eq!(r.current_time(), 2.2);
    }

    #[test]
    fn settle_bypasses_throttle() {
        let mut r = renderer();
        r.set_annotations(vec![walker()]);

        assert!(r.tick(0.0, 2.0).is_some());
        r.settle(4.0);
        let f = r.feature(AnnotationId(1)).unwrap();
        // Direct computation at t=4: midway through [3,5].
        assert_eq!(f.geometry, Geometry::Point(Point::new(15.0, H - 15.0)));
    }

    #[test]
    fn surviving_features_are_reused_not_recreated() {
        let mut r = renderer();
        r.set_annotations(vec![walker()]);

        let first = r.settle(1.5);
        assert_eq!(first.entered, vec![AnnotationId(1)]);
        let second = r.settle(2.5);
        assert!(second.entered.is_empty());
        assert!(second.exited.is_empty());
    }

    #[test]
    fn corrupt_annotation_is_isolated() {
        // Rectangle with a single pair: undecodable, bypasses validate().
        let mut bad = ann(2, vec![0.0, 10.0], vec![vec![0.0, 0.0], vec![1.0, 1.0]]);
        bad.shape = Shape::Rectangle;

        let mut r = renderer();
        r.set_annotations(vec![walker(), bad]);

        r.settle(2.0);
        assert!(r.feature(AnnotationId(2)).is_none());
        assert!(
            r.feature(AnnotationId(1)).is_some(),
            "healthy annotation still renders"
        );
    }

    #[test]
    fn zero_length_segment_snaps_to_later_keyframe() {
        // Violates the sorted invariant on purpose; must not divide by zero.
        let degenerate = ann(1, vec![1.0, 1.0], vec![vec![0.0, 0.0], vec![9.0, 9.0]]);
        let g = sample(&Interpolator::default(), &degenerate, 1.0, H).unwrap();
        assert_eq!(g, Geometry::Point(Point::new(9.0, H - 9.0)));

        // Before the span the earlier keyframe still wins.
        let g = sample(&Interpolator::default(), &degenerate, 0.5, H).unwrap();
        assert_eq!(g, Geometry::Point(Point::new(0.0, H)));
    }

    #[test]
    fn remove_drops_feature_immediately() {
        let mut r = renderer();
        r.set_annotations(vec![walker()]);
        r.settle(2.0);
        assert!(r.feature(AnnotationId(1)).is_some());
        r.remove(AnnotationId(1));
        assert!(r.feature(AnnotationId(1)).is_none());
    }
}
