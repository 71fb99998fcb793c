use reefline::{AnnotationId, LabelId, TimelineScrollModel, TrackIndex, VideoAnnotations};

fn fixture() -> VideoAnnotations {
    let s = include_str!("data/annotations.json");
    serde_json::from_str(s).unwrap()
}

#[test]
fn lane_scenario_touching_then_overlapping() {
    let video = fixture();
    let index = TrackIndex::build(&video.annotations);

    // [0,5] and [5,10] touch: both lane 0. [2,8] overlaps both: lane 1.
    assert_eq!(index.lane_of(LabelId(20), AnnotationId(2)), Some(0));
    assert_eq!(index.lane_of(LabelId(20), AnnotationId(3)), Some(0));
    assert_eq!(index.lane_of(LabelId(20), AnnotationId(4)), Some(1));

    let group = index
        .groups()
        .iter()
        .find(|g| g.label == LabelId(20))
        .unwrap();
    assert_eq!(group.assignment.lane_count, 2);
}

#[test]
fn single_instant_annotation_inside_a_span_needs_its_own_lane() {
    let video = fixture();
    let index = TrackIndex::build(&video.annotations);

    // Circle at [3,3] sits inside the polygon's [0,4].
    assert_eq!(index.lane_of(LabelId(30), AnnotationId(5)), Some(0));
    assert_eq!(index.lane_of(LabelId(30), AnnotationId(6)), Some(1));
}

#[test]
fn timeline_blocks_stack_by_label_first_appearance() {
    let video = fixture();
    let index = TrackIndex::build(&video.annotations);

    let mut timeline = TimelineScrollModel::new(video.duration, 600.0, 10.0).unwrap();
    timeline.set_lane_counts(index.lane_counts());

    let blocks = timeline.blocks();
    let order: Vec<LabelId> = blocks.iter().map(|b| b.label).collect();
    assert_eq!(order, vec![LabelId(10), LabelId(20), LabelId(30)]);

    assert_eq!(blocks[0].height, 10.0, "one lane for the rectangle label");
    assert_eq!(blocks[1].height, 20.0, "two lanes for the point label");
    assert_eq!(blocks[2].height, 20.0);
    assert_eq!(timeline.total_height(), 50.0);

    assert_eq!(blocks[1].top, 10.0);
    assert_eq!(timeline.lane_top(LabelId(20), 1), Some(20.0));
}

#[test]
fn seek_positions_map_through_the_track() {
    let video = fixture();
    let timeline = TimelineScrollModel::new(video.duration, 600.0, 10.0).unwrap();

    assert_eq!(timeline.pixel_x(30.0), 300.0);
    assert_eq!(timeline.seek_target(300.0), 30.0);
    assert_eq!(timeline.seek_target(-10.0), 0.0);
    assert!(timeline.seek_target(9_999.0) < video.duration);
    assert_eq!(timeline.indicator_x(timeline.seek_target(450.0)), 450.0);
}
