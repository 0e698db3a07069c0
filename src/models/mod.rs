mod annotation;
mod style;

pub use annotation::{
    Annotation, AnnotationKind, AnnotationMeta, ArrowAnnotation, EllipseAnnotation,
    EndpointStyle, HighlightAnnotation, PointCollectionAnnotation, PointStyle,
    RectangleAnnotation, StampAnnotation, StickyNoteAnnotation, StyledPoint, TextAnnotation,
    TextMarkup,
};
pub use style::{Border, Color, Display, FontInfo, LinePattern, LineStyle, Point};
