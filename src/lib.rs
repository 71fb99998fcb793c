#![forbid(unsafe_code)]

pub mod annotation;
pub mod controller;
pub mod error;
pub mod geom;
pub mod interp;
pub mod morph;
pub mod renderer;
pub mod timeline;
pub mod tracks;

pub use annotation::{
    Annotation, AnnotationId, LabelAttachment, LabelId, NewAnnotation, TimeInterval, UserId,
    VideoAnnotations,
};
pub use controller::{AnnotationStore, ControllerConfig, PlaybackController, UiEvent};
pub use error::{ReeflineError, ReeflineResult};
pub use geom::{Geometry, Shape};
pub use interp::{Interpolator, OrientedBox};
pub use morph::{MidpointSubdivision, PathMorpher};
pub use renderer::{PlaybackRenderer, RenderDelta, RenderFeature, RendererConfig};
pub use timeline::{LaneBlock, TimelineScrollModel};
pub use tracks::{LaneAssignment, TrackIndex, assign_lanes};
