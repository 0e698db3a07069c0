use chrono::{DateTime, FixedOffset, Local};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::style::{Border, Color, Display, FontInfo, LineStyle, Point};

/// Fields carried by every annotation regardless of variant
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnnotationMeta {
    pub id: String,
    pub created_at: DateTime<FixedOffset>,
    pub modified_at: DateTime<FixedOffset>,
    pub page_number: i32,
    pub upper_left: Point,
    pub lower_right: Point,
    #[serde(default)]
    pub display: Display,
}

impl AnnotationMeta {
    /// Creates metadata with a fresh braced GUID identifier and current timestamps
    pub fn new(page_number: i32) -> Self {
        let now = Local::now().fixed_offset();
        AnnotationMeta {
            id: format!("{{{}}}", Uuid::new_v4().to_string().to_uppercase()),
            created_at: now,
            modified_at: now,
            page_number,
            upper_left: Point::default(),
            lower_right: Point::default(),
            display: Display::default(),
        }
    }

    /// Sets the bounding rectangle, swapping corners so that
    /// `lower_right` is never above or left of `upper_left`
    pub fn with_bounds(mut self, a: Point, b: Point) -> Self {
        self.upper_left = Point::new(a.x.min(b.x), a.y.min(b.y));
        self.lower_right = Point::new(a.x.max(b.x), a.y.max(b.y));
        self
    }
}

/// A run of styled text
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TextMarkup {
    #[serde(default)]
    pub font: FontInfo,
    #[serde(default)]
    pub text: String,
    /// Degrees, counter-clockwise. Only stamps carry a rotation on the wire.
    #[serde(default)]
    pub rotation: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextAnnotation {
    pub markup: TextMarkup,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HighlightAnnotation {
    pub highlight_color: Color,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArrowAnnotation {
    /// Head size, 1 (small) to 3 (large)
    pub size: i32,
    pub start: Point,
    pub end: Point,
    #[serde(default)]
    pub line: LineStyle,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StickyNoteAnnotation {
    #[serde(default)]
    pub note_order: i32,
    #[serde(default)]
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StampAnnotation {
    pub text_element: TextMarkup,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RectangleAnnotation {
    #[serde(default)]
    pub is_filled: bool,
    #[serde(default)]
    pub line: LineStyle,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EllipseAnnotation {
    #[serde(default)]
    pub line: LineStyle,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum EndpointStyle {
    #[default]
    None,
    Arrow,
    Round,
    Square,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PointStyle {
    pub endpoint: EndpointStyle,
    pub filled: bool,
    pub thickness: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StyledPoint {
    pub point: Point,
    pub style: PointStyle,
}

/// Free-form line or pen stroke. The first point is the start point,
/// every following point closes a segment.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PointCollectionAnnotation {
    #[serde(default)]
    pub points: Vec<StyledPoint>,
}

impl PointCollectionAnnotation {
    pub fn set_start_point(&mut self, point: Point, style: PointStyle) {
        let start = StyledPoint { point, style };
        match self.points.first_mut() {
            Some(first) => *first = start,
            None => self.points.push(start),
        }
    }

    pub fn add_segment(&mut self, point: Point, style: PointStyle) {
        self.points.push(StyledPoint { point, style });
    }

    pub fn segment_count(&self) -> usize {
        self.points.len().saturating_sub(1)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AnnotationKind {
    Text(TextAnnotation),
    Highlight(HighlightAnnotation),
    Arrow(ArrowAnnotation),
    StickyNote(StickyNoteAnnotation),
    Stamp(StampAnnotation),
    Rectangle(RectangleAnnotation),
    Ellipse(EllipseAnnotation),
    PointCollection(PointCollectionAnnotation),
}

impl AnnotationKind {
    pub fn name(&self) -> &'static str {
        match self {
            AnnotationKind::Text(_) => "Text",
            AnnotationKind::Highlight(_) => "Highlight",
            AnnotationKind::Arrow(_) => "Arrow",
            AnnotationKind::StickyNote(_) => "StickyNote",
            AnnotationKind::Stamp(_) => "Stamp",
            AnnotationKind::Rectangle(_) => "Rectangle",
            AnnotationKind::Ellipse(_) => "Ellipse",
            AnnotationKind::PointCollection(_) => "PointCollection",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Annotation {
    pub meta: AnnotationMeta,
    pub kind: AnnotationKind,
}

impl Annotation {
    pub fn new(meta: AnnotationMeta, kind: AnnotationKind) -> Self {
        Self { meta, kind }
    }

    pub fn id(&self) -> &str {
        &self.meta.id
    }

    pub fn border(&self) -> Option<&Border> {
        self.meta.display.border.as_ref()
    }

    /// The text body carried on the wire, for variants that have one
    pub fn text(&self) -> Option<&str> {
        match &self.kind {
            AnnotationKind::Text(text) => Some(&text.markup.text),
            AnnotationKind::Stamp(stamp) => Some(&stamp.text_element.text),
            AnnotationKind::StickyNote(note) => Some(&note.text),
            _ => None,
        }
    }
}
