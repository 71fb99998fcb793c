use crate::annotation::{Annotation, AnnotationId, LabelId, TimeInterval};

/// Lane assignment for the annotations of one label group.
#[derive(Clone, Debug, serde::Serialize)]
pub struct LaneAssignment {
    /// `(annotation, lane index)` in input order.
    pub lanes: Vec<(AnnotationId, usize)>,
    pub lane_count: usize,
}

/// First-fit interval scheduling: each annotation goes to the first lane
/// whose already-assigned intervals it does not collide with. Input order is
/// preserved, making the result deterministic for a fixed feed.
pub fn assign_lanes(entries: &[(AnnotationId, TimeInterval)]) -> LaneAssignment {
    let mut lanes: Vec<Vec<TimeInterval>> = Vec::new();
    let mut assignment = Vec::with_capacity(entries.len());

    for &(id, interval) in entries {
        let fit = lanes
            .iter()
            .position(|lane| lane.iter().all(|iv| !iv.collides(interval)));
        let lane = match fit {
            Some(i) => i,
            None => {
                lanes.push(Vec::new());
                lanes.len() - 1
            }
        };
        lanes[lane].push(interval);
        assignment.push((id, lane));
    }

    LaneAssignment {
        lanes: assignment,
        lane_count: lanes.len(),
    }
}

#[derive(Clone, Debug, serde::Serialize)]
pub struct LabelTracks {
    pub label: LabelId,
    pub assignment: LaneAssignment,
}

/// Lane assignments for every label group of a video, with label groups kept
/// in first-appearance order so the timeline layout stays visually stable.
///
/// Rebuilt wholesale whenever the annotation set changes; cost is roughly
/// `#annotations x #lanes` per label, fine at interactive scales.
#[derive(Clone, Debug, Default, serde::Serialize)]
pub struct TrackIndex {
    groups: Vec<LabelTracks>,
}

impl TrackIndex {
    #[tracing::instrument(skip(annotations))]
    pub fn build<'a>(annotations: impl IntoIterator<Item = &'a Annotation>) -> Self {
        let mut grouped: Vec<(LabelId, Vec<(AnnotationId, TimeInterval)>)> = Vec::new();

        for ann in annotations {
            let interval = ann.interval();
            let mut seen: Vec<LabelId> = Vec::new();
            for attachment in &ann.labels {
                // An annotation appears once per distinct attached label.
                if seen.contains(&attachment.label) {
                    continue;
                }
                seen.push(attachment.label);

                match grouped.iter_mut().find(|(l, _)| *l == attachment.label) {
                    Some((_, entries)) => entries.push((ann.id, interval)),
                    None => grouped.push((attachment.label, vec![(ann.id, interval)])),
                }
            }
        }

        Self {
            groups: grouped
                .into_iter()
                .map(|(label, entries)| LabelTracks {
                    label,
                    assignment: assign_lanes(&entries),
                })
                .collect(),
        }
    }

    pub fn groups(&self) -> &[LabelTracks] {
        &self.groups
    }

    pub fn lane_counts(&self) -> impl Iterator<Item = (LabelId, usize)> + '_ {
        self.groups
            .iter()
            .map(|g| (g.label, g.assignment.lane_count))
    }

    pub fn lane_of(&self, label: LabelId, id: AnnotationId) -> Option<usize> {
        self.groups
            .iter()
            .find(|g| g.label == label)?
            .assignment
            .lanes
            .iter()
            .find(|(a, _)| *a == id)
            .map(|(_, lane)| *lane)
    }
}
