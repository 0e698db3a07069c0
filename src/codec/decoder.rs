//! Wire XML to annotation model.
//!
//! Data-quality problems never abort a decode: missing or unparseable
//! attributes fall back to defaults with a warning, and an unknown class
//! triplet yields `Ok(None)`. Only a document that cannot be parsed at all,
//! or a caller error such as an empty MIME type, is returned as an error.

use std::io::Read;

use tracing::{debug, error, warn};

use super::registry::{self, AnnotationVariant};
use super::values::{
    decode_line_pattern, decode_unicode_hex, mode_to_opacity, unpack_color, Scale, WireRect,
};
use super::xml::XmlDocument;
use super::{attr, PROP_DESC_PATH, TEXT_PATH};
use crate::config::CodecConfig;
use crate::error::{CodecError, Result};
use crate::models::{
    Annotation, AnnotationKind, AnnotationMeta, ArrowAnnotation, Border, Color, Display,
    EllipseAnnotation, FontInfo, HighlightAnnotation, LinePattern, LineStyle, Point,
    PointCollectionAnnotation, PointStyle, RectangleAnnotation, StampAnnotation,
    StickyNoteAnnotation, TextAnnotation, TextMarkup,
};

const TIFF_MIME_TYPES: [&str; 2] = ["image/tiff", "image/x-tiff"];

/// Reads annotations written by the renderer
#[derive(Debug, Clone, Copy, Default)]
pub struct AnnotationDecoder {
    scale: Scale,
}

impl AnnotationDecoder {
    pub fn new(scale: Scale) -> Self {
        Self { scale }
    }

    pub fn from_config(config: &CodecConfig) -> Self {
        Self::new(config.scale())
    }

    pub fn scale(&self) -> Scale {
        self.scale
    }

    pub fn decode_reader<R: Read>(
        &self,
        mut reader: R,
        mime_type: &str,
    ) -> Result<Option<Annotation>> {
        let mut source = String::new();
        reader.read_to_string(&mut source)?;
        self.decode_str(&source, mime_type)
    }

    pub fn decode_str(&self, source: &str, mime_type: &str) -> Result<Option<Annotation>> {
        let document = XmlDocument::parse(source).map_err(|e| {
            error!(
                "Failed to parse annotation document for {}: {}",
                mime_type, e
            );
            CodecError::from(e)
        })?;
        self.decode_document(&document, mime_type)
    }

    /// Builds an annotation from a parsed document.
    ///
    /// `mime_type` is the MIME type of the annotated content; multi-page TIFF
    /// content keeps its page number in a separate attribute.
    pub fn decode_document(
        &self,
        document: &XmlDocument,
        mime_type: &str,
    ) -> Result<Option<Annotation>> {
        if mime_type.trim().is_empty() {
            return Err(CodecError::InvalidArgument(
                "MIME type must not be empty".to_string(),
            ));
        }

        let Some(variant) = resolve_variant(document) else {
            return Ok(None);
        };

        let normalized = mime_type.to_lowercase();
        let is_multi_page_tiff = TIFF_MIME_TYPES.contains(&normalized.as_str());
        let mut meta = self.read_common_metadata(document, is_multi_page_tiff);

        let kind = match variant {
            AnnotationVariant::Text => read_text(document, &mut meta.display),
            AnnotationVariant::Stamp => read_stamp(document, &mut meta.display),
            AnnotationVariant::StickyNote => read_sticky_note(document, &mut meta.display),
            AnnotationVariant::Highlight => read_highlight(document, &mut meta.display),
            AnnotationVariant::Arrow => self.read_arrow(document, &mut meta.display),
            AnnotationVariant::Rectangle => read_rectangle(document, &mut meta.display),
            AnnotationVariant::Ellipse => read_ellipse(document, &mut meta.display),
            AnnotationVariant::Line | AnnotationVariant::Pen => {
                self.read_point_collection(document, &mut meta.display)
            }
        };

        debug!(
            "Decoded {} annotation {} ({:?})",
            kind.name(),
            meta.id,
            variant
        );
        Ok(Some(Annotation::new(meta, kind)))
    }

    fn read_common_metadata(
        &self,
        document: &XmlDocument,
        is_multi_page_tiff: bool,
    ) -> AnnotationMeta {
        let page_attribute = if is_multi_page_tiff {
            attr::MULTI_PAGE_TIFF_PAGE_NUMBER
        } else {
            attr::PAGE_NUMBER
        };

        let rect = WireRect {
            left: read_single(document, attr::LEFT),
            top: read_single(document, attr::TOP),
            width: read_single(document, attr::WIDTH),
            height: read_single(document, attr::HEIGHT),
        };
        let (upper_left, lower_right) = self.scale.from_wire(rect);

        AnnotationMeta {
            id: document.query_attribute_as_string(PROP_DESC_PATH, attr::ANNOTATED_ID),
            created_at: document.query_attribute_as_date(PROP_DESC_PATH, attr::ENTRY_DATE),
            modified_at: document.query_attribute_as_date(PROP_DESC_PATH, attr::MODIFY_DATE),
            page_number: read_integer(document, page_attribute),
            upper_left,
            lower_right,
            display: Display::default(),
        }
    }

    fn read_arrow(&self, document: &XmlDocument, display: &mut Display) -> AnnotationKind {
        let (foreground, line) = read_line_metadata(document);
        display.foreground = Some(foreground);

        AnnotationKind::Arrow(ArrowAnnotation {
            size: read_integer(document, attr::ARROWHEAD_SIZE),
            start: self.read_point(document, attr::LINE_START_X, attr::LINE_START_Y),
            end: self.read_point(document, attr::LINE_END_X, attr::LINE_END_Y),
            line,
        })
    }

    /// Lines and pen strokes become a single segment
    fn read_point_collection(
        &self,
        document: &XmlDocument,
        display: &mut Display,
    ) -> AnnotationKind {
        let weight = read_integer(document, attr::LINE_WIDTH);
        let style = PointStyle {
            thickness: weight,
            ..Default::default()
        };

        let mut collection = PointCollectionAnnotation::default();
        let start = self.read_point(document, attr::LINE_START_X, attr::LINE_START_Y);
        let end = self.read_point(document, attr::LINE_END_X, attr::LINE_END_Y);
        collection.set_start_point(start, style);
        collection.add_segment(end, style);

        let border = display.border.get_or_insert_with(Border::default);
        border.line.weight = weight;

        AnnotationKind::PointCollection(collection)
    }

    fn read_point(&self, document: &XmlDocument, x: &str, y: &str) -> Point {
        let x = read_single(document, x);
        let y = read_single(document, y);
        self.scale.point_from_wire(x, y)
    }
}

fn resolve_variant(document: &XmlDocument) -> Option<AnnotationVariant> {
    let class_id = document
        .query_attribute(PROP_DESC_PATH, attr::CLASS_ID)
        .unwrap_or_default();
    let class_name = document
        .query_attribute(PROP_DESC_PATH, attr::CLASS_NAME)
        .unwrap_or_default();
    let sub_class_name = document.query_attribute(PROP_DESC_PATH, attr::SUBCLASS);

    let variant = registry::resolve(class_id, class_name, sub_class_name);
    if variant.is_none() {
        warn!(
            "Could not map annotation type. ClassId='{}', ClassName='{}', SubClass='{}'",
            class_id,
            class_name,
            sub_class_name.unwrap_or_default()
        );
    }
    variant
}

fn read_text(document: &XmlDocument, display: &mut Display) -> AnnotationKind {
    read_border_info(document, display);
    let mut markup = read_font_metadata(document);
    read_text_background_mode(document, display);
    markup.text = read_text_body(document);
    AnnotationKind::Text(TextAnnotation { markup })
}

fn read_stamp(document: &XmlDocument, display: &mut Display) -> AnnotationKind {
    read_border_info(document, display);
    let mut text_element = read_font_metadata(document);
    text_element.rotation = 360.0 - read_single(document, attr::ROTATION);
    read_text_background_mode(document, display);
    text_element.text = read_text_body(document);
    AnnotationKind::Stamp(StampAnnotation { text_element })
}

fn read_sticky_note(document: &XmlDocument, display: &mut Display) -> AnnotationKind {
    // The renderer fixes the note colour but still reports it.
    display.background = Some(read_color(document, attr::FORE_COLOR));

    let note_order = if has_attribute(document, attr::ORDINAL) {
        read_integer(document, attr::ORDINAL)
    } else {
        0
    };

    AnnotationKind::StickyNote(StickyNoteAnnotation {
        note_order,
        text: read_text_body(document),
    })
}

fn read_highlight(document: &XmlDocument, display: &mut Display) -> AnnotationKind {
    read_text_background_mode(document, display);
    let highlight_color = read_color(document, attr::BRUSH_COLOR);

    let has_width = document
        .query_attribute(PROP_DESC_PATH, attr::LINE_WIDTH)
        .is_some_and(|value| !value.is_empty());
    if has_width {
        let weight = read_integer(document, attr::LINE_WIDTH);
        if weight != 0 {
            display.border = Some(Border {
                color: read_color(document, attr::LINE_COLOR),
                line: LineStyle::new(weight, LinePattern::Solid),
            });
        }
    }

    AnnotationKind::Highlight(HighlightAnnotation { highlight_color })
}

fn read_rectangle(document: &XmlDocument, display: &mut Display) -> AnnotationKind {
    let mut fill_mode = 0;
    display.foreground = if has_attribute(document, attr::BRUSH_COLOR) {
        fill_mode = read_integer(document, attr::TEXT_BACK_MODE);
        let opacity = mode_to_opacity(fill_mode);
        Some(read_color(document, attr::BRUSH_COLOR).with_opacity(opacity))
    } else {
        None
    };

    display.border = Some(Border {
        color: read_color(document, attr::LINE_COLOR),
        line: LineStyle::default(),
    });

    AnnotationKind::Rectangle(RectangleAnnotation {
        is_filled: fill_mode == 2,
        line: LineStyle::new(read_integer(document, attr::LINE_WIDTH), LinePattern::Solid),
    })
}

fn read_ellipse(document: &XmlDocument, display: &mut Display) -> AnnotationKind {
    let (foreground, line) = read_line_metadata(document);
    display.foreground = Some(foreground);
    AnnotationKind::Ellipse(EllipseAnnotation { line })
}

/// Line colour, backmode opacity, pattern and weight shared by arrows and ellipses
fn read_line_metadata(document: &XmlDocument) -> (Color, LineStyle) {
    let mut foreground = read_color(document, attr::LINE_COLOR);
    if has_attribute(document, attr::LINE_BACK_MODE) {
        let mode = read_integer(document, attr::LINE_BACK_MODE);
        foreground = foreground.with_opacity(mode_to_opacity(mode));
    }

    let pattern = decode_line_pattern(read_integer(document, attr::LINE_STYLE));
    let line = LineStyle::new(read_integer(document, attr::LINE_WIDTH), pattern);
    (foreground, line)
}

/// Border block of text and stamp annotations.
///
/// A true `F_HASBORDER` clears the border and a false one reads it. This is
/// the opposite of what the encoder writes, and existing consumers rely on it.
fn read_border_info(document: &XmlDocument, display: &mut Display) {
    if read_boolean(document, attr::HAS_BORDER) {
        display.border = None;
        return;
    }

    display.background = Some(read_color(document, attr::BACK_COLOR));

    let opacity = mode_to_opacity(read_integer(document, attr::BORDER_BACK_MODE));
    let pattern = decode_line_pattern(read_integer(document, attr::BORDER_STYLE));
    display.border = Some(Border {
        color: read_color(document, attr::BORDER_COLOR).with_opacity(opacity),
        line: LineStyle::new(read_integer(document, attr::BORDER_WIDTH), pattern),
    });
}

fn read_font_metadata(document: &XmlDocument) -> TextMarkup {
    let name = document.query_attribute_as_string(PROP_DESC_PATH, attr::FONT_NAME);
    let font = FontInfo {
        family: name.clone(),
        name,
        size: read_single(document, attr::FONT_SIZE),
        bold: read_boolean(document, attr::FONT_BOLD),
        italic: read_boolean(document, attr::FONT_ITALIC),
        underline: read_boolean(document, attr::FONT_UNDERLINE),
        strikethrough: read_boolean(document, attr::FONT_STRIKETHROUGH),
        color: read_color(document, attr::FORE_COLOR),
    };
    TextMarkup {
        font,
        ..Default::default()
    }
}

fn read_text_background_mode(document: &XmlDocument, display: &mut Display) {
    if !has_attribute(document, attr::BACK_COLOR) {
        return;
    }
    let mut background = read_color(document, attr::BACK_COLOR);
    if has_attribute(document, attr::TEXT_BACK_MODE) {
        let mode = read_integer(document, attr::TEXT_BACK_MODE);
        background = background.with_opacity(mode_to_opacity(mode));
    }
    display.background = Some(background);
}

fn read_text_body(document: &XmlDocument) -> String {
    let hex = document.query_string(TEXT_PATH);
    match decode_unicode_hex(hex.trim()) {
        Ok(text) => text,
        Err(e) => {
            warn!("Ignoring malformed text at {}: {}", TEXT_PATH, e);
            String::new()
        }
    }
}

fn read_color(document: &XmlDocument, attribute: &str) -> Color {
    unpack_color(read_integer(document, attribute))
}

fn has_attribute(document: &XmlDocument, attribute: &str) -> bool {
    document.query_attribute(PROP_DESC_PATH, attribute).is_some()
}

fn read_integer(document: &XmlDocument, attribute: &str) -> i32 {
    document.query_attribute_as_integer(PROP_DESC_PATH, attribute)
}

fn read_single(document: &XmlDocument, attribute: &str) -> f32 {
    document.query_attribute_as_single(PROP_DESC_PATH, attribute)
}

fn read_boolean(document: &XmlDocument, attribute: &str) -> bool {
    document.query_attribute_as_boolean(PROP_DESC_PATH, attribute)
}
