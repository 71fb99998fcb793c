use crate::{
    error::{ReeflineError, ReeflineResult},
    geom::{self, Shape},
};

#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
pub struct AnnotationId(pub u64);

#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
pub struct LabelId(pub u64);

#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
pub struct UserId(pub u64);

/// A label attached to an annotation. The first attachment on an annotation
/// is the primary one and drives color/grouping.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct LabelAttachment {
    pub label: LabelId,
    pub confidence: f64,
    pub user: UserId,
}

/// Closed time interval `[start, end]` in playback seconds. A single-keyframe
/// annotation has `start == end`.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct TimeInterval {
    pub start: f64,
    pub end: f64,
}

impl TimeInterval {
    /// Collision test for lane assignment. Touching endpoints do not collide;
    /// any shared interior point does. The explicit equality arm makes
    /// identical single-instant intervals collide, which the strict
    /// comparisons alone would miss.
    pub fn collides(self, other: Self) -> bool {
        if self == other {
            return true;
        }
        self.start < other.end && other.start < self.end
    }
}

/// A shape-bearing annotation persisting across a time range of a video,
/// anchored by sparse keyframes.
///
/// `frames` and `points` are index-aligned: `points[i]` is the flat persisted
/// point array of the keyframe at `frames[i]` (see [`crate::geom`] for the
/// encoding).
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct Annotation {
    pub id: AnnotationId,
    pub shape: Shape,
    pub frames: Vec<f64>,
    pub points: Vec<Vec<f64>>,
    pub labels: Vec<LabelAttachment>,
    /// Transient UI state: `Some(time)` when selected at a timeline position.
    #[serde(skip)]
    pub selected: Option<f64>,
}

impl Annotation {
    pub fn validate(&self) -> ReeflineResult<()> {
        if self.frames.is_empty() {
            return Err(ReeflineError::validation(format!(
                "annotation {} has no keyframes",
                self.id.0
            )));
        }
        if self.frames.len() != self.points.len() {
            return Err(ReeflineError::validation(format!(
                "annotation {} has {} frames but {} point sets",
                self.id.0,
                self.frames.len(),
                self.points.len()
            )));
        }
        if self.frames.iter().any(|f| !f.is_finite()) {
            return Err(ReeflineError::validation(format!(
                "annotation {} has a non-finite frame time",
                self.id.0
            )));
        }
        if !self.frames.windows(2).all(|w| w[0] < w[1]) {
            return Err(ReeflineError::validation(format!(
                "annotation {} frames must be strictly ascending",
                self.id.0
            )));
        }
        for flat in &self.points {
            geom::validate_flat(self.shape, flat)?;
        }
        Ok(())
    }

    /// Time interval spanned by the keyframes: `[frames[0], frames[last]]`.
    pub fn interval(&self) -> TimeInterval {
        TimeInterval {
            start: self.frames[0],
            end: *self.frames.last().unwrap_or(&self.frames[0]),
        }
    }

    pub fn is_single_frame(&self) -> bool {
        self.frames.len() == 1
    }

    /// Active window test. Multi-keyframe annotations are active on the
    /// closed interval of their keyframes; a single-keyframe annotation stays
    /// active for the rest of playback once reached.
    pub fn is_active_at(&self, t: f64) -> bool {
        let iv = self.interval();
        if self.is_single_frame() {
            t >= iv.start
        } else {
            iv.start <= t && t <= iv.end
        }
    }

    /// Appends a keyframe while the user keeps drawing across time.
    pub fn push_keyframe(&mut self, frame: f64, flat: Vec<f64>) -> ReeflineResult<()> {
        if let Some(last) = self.frames.last()
            && frame <= *last
        {
            return Err(ReeflineError::non_monotonic_frame(format!(
                "frame {frame} is not after last keyframe {last} of annotation {}",
                self.id.0
            )));
        }
        geom::validate_flat(self.shape, &flat)?;
        self.frames.push(frame);
        self.points.push(flat);
        Ok(())
    }

    pub fn primary_label(&self) -> Option<&LabelAttachment> {
        self.labels.first()
    }
}

/// A pending annotation draft accumulated by a draw action before the create
/// round-trip. Repeated click-to-extend appends keyframes.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct NewAnnotation {
    pub shape: Shape,
    pub frames: Vec<f64>,
    pub points: Vec<Vec<f64>>,
    pub label: LabelId,
    pub confidence: f64,
}

impl NewAnnotation {
    pub fn started(shape: Shape, frame: f64, flat: Vec<f64>, label: LabelId, confidence: f64) -> ReeflineResult<Self> {
        geom::validate_flat(shape, &flat)?;
        Ok(Self {
            shape,
            frames: vec![frame],
            points: vec![flat],
            label,
            confidence,
        })
    }

    pub fn push_keyframe(&mut self, frame: f64, flat: Vec<f64>) -> ReeflineResult<()> {
        if let Some(last) = self.frames.last()
            && frame <= *last
        {
            return Err(ReeflineError::non_monotonic_frame(format!(
                "frame {frame} is not after last draft keyframe {last}"
            )));
        }
        geom::validate_flat(self.shape, &flat)?;
        self.frames.push(frame);
        self.points.push(flat);
        Ok(())
    }
}

/// The annotation set of one video as returned by the persistence query,
/// together with the video properties the engine needs.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct VideoAnnotations {
    /// Video duration in seconds.
    pub duration: f64,
    /// Video frame pixel height, the reference for the Y-axis inversion.
    pub frame_height: f64,
    pub annotations: Vec<Annotation>,
}
