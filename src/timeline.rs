use crate::{
    annotation::LabelId,
    error::{ReeflineError, ReeflineResult},
};

/// One label group's slice of the vertical timeline surface.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize)]
pub struct LaneBlock {
    pub label: LabelId,
    pub top: f64,
    pub height: f64,
    pub lane_count: usize,
}

/// Maps the video's time range and per-label lane counts onto a scrollable 2D
/// surface: time horizontally, lanes vertically. Purely geometric; it never
/// mutates annotation data.
#[derive(Clone, Debug)]
pub struct TimelineScrollModel {
    duration: f64,
    track_width: f64,
    lane_height: f64,
    /// `(label, lane count)` in first-appearance order.
    groups: Vec<(LabelId, usize)>,
}

impl TimelineScrollModel {
    pub fn new(duration: f64, track_width: f64, lane_height: f64) -> ReeflineResult<Self> {
        if !(duration.is_finite() && duration > 0.0) {
            return Err(ReeflineError::validation("timeline duration must be > 0"));
        }
        if !(track_width.is_finite() && track_width > 0.0) {
            return Err(ReeflineError::validation("track width must be > 0"));
        }
        if !(lane_height.is_finite() && lane_height > 0.0) {
            return Err(ReeflineError::validation("lane height must be > 0"));
        }
        Ok(Self {
            duration,
            track_width,
            lane_height,
            groups: Vec::new(),
        })
    }

    pub fn duration(&self) -> f64 {
        self.duration
    }

    pub fn track_width(&self) -> f64 {
        self.track_width
    }

    pub fn set_track_width(&mut self, track_width: f64) -> ReeflineResult<()> {
        if !(track_width.is_finite() && track_width > 0.0) {
            return Err(ReeflineError::validation("track width must be > 0"));
        }
        self.track_width = track_width;
        Ok(())
    }

    /// Replaces the per-label lane counts. Labels already shown keep their
    /// position (scroll stability); labels new to the timeline are appended;
    /// labels absent from `counts` are dropped.
    pub fn set_lane_counts(&mut self, counts: impl IntoIterator<Item = (LabelId, usize)>) {
        let incoming: Vec<(LabelId, usize)> = counts.into_iter().collect();

        let mut next: Vec<(LabelId, usize)> = self
            .groups
            .iter()
            .filter_map(|(label, _)| {
                incoming
                    .iter()
                    .find(|(l, _)| l == label)
                    .map(|&(l, c)| (l, c))
            })
            .collect();
        for &(label, count) in &incoming {
            if !next.iter().any(|(l, _)| *l == label) {
                next.push((label, count));
            }
        }
        self.groups = next;
    }

    /// Horizontal pixel offset of a time.
    pub fn pixel_x(&self, t: f64) -> f64 {
        t / self.duration * self.track_width
    }

    /// Inverse of [`pixel_x`](Self::pixel_x), clamped into `[0, duration)`.
    pub fn time_at(&self, px: f64) -> f64 {
        self.clamp_time(px / self.track_width * self.duration)
    }

    /// Clamps a time into the half-open `[0, duration)` playback range.
    pub fn clamp_time(&self, t: f64) -> f64 {
        t.clamp(0.0, self.duration.next_down())
    }

    /// Clamped seek time for a click/drag at a track pixel offset.
    pub fn seek_target(&self, px: f64) -> f64 {
        self.time_at(px)
    }

    /// Current-time indicator offset; pure function of `t` and track width.
    pub fn indicator_x(&self, t: f64) -> f64 {
        self.pixel_x(t.clamp(0.0, self.duration))
    }

    pub fn blocks(&self) -> Vec<LaneBlock> {
        let mut top = 0.0;
        self.groups
            .iter()
            .map(|&(label, lane_count)| {
                let height = lane_count as f64 * self.lane_height;
                let block = LaneBlock {
                    label,
                    top,
                    height,
                    lane_count,
                };
                top += height;
                block
            })
            .collect()
    }

    pub fn total_height(&self) -> f64 {
        self.groups
            .iter()
            .map(|&(_, c)| c as f64 * self.lane_height)
            .sum()
    }

    /// Top pixel offset of a specific lane within a label block.
    pub fn lane_top(&self, label: LabelId, lane: usize) -> Option<f64> {
        let block = self.blocks().into_iter().find(|b| b.label == label)?;
        if lane >= block.lane_count {
            return None;
        }
        Some(block.top + lane as f64 * self.lane_height)
    }
}
