use std::io::Write;

use encoding_rs::Encoding;
use tracing::{debug, error};

use super::registry::{
    CLASS_ID_ARROW, CLASS_ID_HIGHLIGHT, CLASS_ID_PROPRIETARY, CLASS_ID_STAMP,
    CLASS_ID_STICKY_NOTE, CLASS_ID_TEXT, CLASS_NAME_PROPRIETARY, SUBCLASS_RECTANGLE,
};
use super::values::{
    encode_border_style, encode_line_style, encode_unicode_hex, format_color, format_date,
    opacity_to_mode2, opacity_to_mode3, Scale,
};
use super::xml::{XmlDocument, XmlElement};
use super::{attr, PROP_DESC_ELEMENT, ROOT_ELEMENT};
use crate::config::CodecConfig;
use crate::error::{CodecError, Result};
use crate::models::{
    Annotation, AnnotationKind, AnnotationMeta, ArrowAnnotation, Color, Display,
    HighlightAnnotation, RectangleAnnotation, StampAnnotation, StickyNoteAnnotation,
    TextAnnotation, TextMarkup,
};

/// Sticky notes are always written in the renderer's default yellow.
const STICKY_NOTE_COLOR: Color = Color {
    red: 153,
    green: 255,
    blue: 255,
    opacity: 100,
};

/// `F_NAME` value: `-{content_element_index}-{id}`
pub fn compose_name(content_element_index: u32, id: &str) -> String {
    format!("-{}-{}", content_element_index, id)
}

/// Writes annotations in the renderer's attribute-based XML format
#[derive(Debug, Clone, Copy)]
pub struct AnnotationEncoder {
    scale: Scale,
    code_page: &'static Encoding,
}

impl Default for AnnotationEncoder {
    fn default() -> Self {
        Self::new(Scale::default())
    }
}

impl AnnotationEncoder {
    pub fn new(scale: Scale) -> Self {
        Self {
            scale,
            code_page: encoding_rs::WINDOWS_1252,
        }
    }

    /// Code page used for non-ASCII characters in text bodies
    pub fn with_code_page(mut self, code_page: &'static Encoding) -> Self {
        self.code_page = code_page;
        self
    }

    pub fn from_config(config: &CodecConfig) -> Result<Self> {
        Ok(Self::new(config.scale()).with_code_page(config.code_page()?))
    }

    pub fn scale(&self) -> Scale {
        self.scale
    }

    /// Encodes `annotation` and writes it to `stream`.
    ///
    /// The stream is flushed but left open; the caller owns it.
    pub fn write_annotation<W: Write>(
        &self,
        stream: &mut W,
        annotation: &Annotation,
        content_element_index: u32,
    ) -> Result<()> {
        let bytes = self
            .build_document(annotation, content_element_index)
            .and_then(|doc| doc.to_bytes().map_err(CodecError::from))
            .map_err(|e| {
                error!(
                    "Failed to encode {} annotation {}: {}",
                    annotation.kind.name(),
                    annotation.id(),
                    e
                );
                e
            })?;

        stream.write_all(&bytes)?;
        stream.flush()?;
        debug!(
            "Wrote {} bytes for annotation {}",
            bytes.len(),
            annotation.id()
        );
        Ok(())
    }

    pub fn encode_to_string(
        &self,
        annotation: &Annotation,
        content_element_index: u32,
    ) -> Result<String> {
        let mut buffer = Vec::new();
        self.write_annotation(&mut buffer, annotation, content_element_index)?;
        String::from_utf8(buffer)
            .map_err(|e| CodecError::Internal(e.to_string()))
    }

    pub fn build_document(
        &self,
        annotation: &Annotation,
        content_element_index: u32,
    ) -> Result<XmlDocument> {
        let meta = &annotation.meta;
        let mut prop_desc = XmlElement::new(PROP_DESC_ELEMENT);
        self.write_common_metadata(&mut prop_desc, meta, content_element_index);

        match &annotation.kind {
            AnnotationKind::Highlight(highlight) => {
                write_highlight(&mut prop_desc, meta, highlight)
            }
            AnnotationKind::Text(text) => write_text(&mut prop_desc, meta, text),
            AnnotationKind::Arrow(arrow) => self.write_arrow(&mut prop_desc, meta, arrow)?,
            AnnotationKind::StickyNote(note) => write_sticky_note(&mut prop_desc, note),
            AnnotationKind::Stamp(stamp) => write_stamp(&mut prop_desc, meta, stamp),
            AnnotationKind::Rectangle(rectangle) => {
                write_rectangle(&mut prop_desc, meta, rectangle)?
            }
            AnnotationKind::Ellipse(_) | AnnotationKind::PointCollection(_) => {
                return Err(CodecError::UnsupportedAnnotation(format!(
                    "{} annotations cannot be written to the renderer format",
                    annotation.kind.name()
                )));
            }
        }

        prop_desc.push_child(XmlElement::new(attr::CUSTOM_BYTES));
        // Point sequences are not serialised; the element is always empty.
        prop_desc.push_child(XmlElement::new(attr::POINTS));
        prop_desc.push_child(self.text_element(annotation));

        let mut root = XmlElement::new(ROOT_ELEMENT);
        root.push_child(prop_desc);
        Ok(XmlDocument::new(root))
    }

    fn write_common_metadata(
        &self,
        element: &mut XmlElement,
        meta: &AnnotationMeta,
        content_element_index: u32,
    ) {
        let rect = self.scale.to_wire(meta.upper_left, meta.lower_right);

        // The renderer keeps the annotation's own id in both attributes.
        element.set_attribute(attr::ANNOTATED_ID, meta.id.as_str());
        element.set_attribute(attr::ENTRY_DATE, format_date(&meta.created_at));
        element.set_attribute(attr::HEIGHT, rect.height.to_string());
        element.set_attribute(attr::ID, meta.id.as_str());
        element.set_attribute(attr::LEFT, rect.left.to_string());
        element.set_attribute(attr::MODIFY_DATE, format_date(&meta.modified_at));
        // Content MIME type is not known here, so the multi-page TIFF page is always 0.
        element.set_attribute(attr::PAGE_NUMBER, meta.page_number.to_string());
        element.set_attribute(attr::MULTI_PAGE_TIFF_PAGE_NUMBER, "0");
        element.set_attribute(attr::NAME, compose_name(content_element_index, &meta.id));
        element.set_attribute(attr::TOP, rect.top.to_string());
        element.set_attribute(attr::WIDTH, rect.width.to_string());
    }

    fn write_arrow(
        &self,
        element: &mut XmlElement,
        meta: &AnnotationMeta,
        arrow: &ArrowAnnotation,
    ) -> Result<()> {
        let foreground = meta
            .display
            .foreground
            .ok_or_else(|| CodecError::MissingField("Arrow display.foreground".to_string()))?;

        let back_mode = opacity_to_mode2(foreground.opacity);
        element.set_attribute(attr::LINE_BACK_MODE, back_mode.to_string());
        element.set_attribute(attr::LINE_COLOR, format_color(&foreground));
        let line_style = encode_line_style(arrow.line.pattern);
        element.set_attribute(attr::LINE_STYLE, line_style.to_string());
        element.set_attribute(attr::LINE_WIDTH, arrow.line.weight.to_string());

        element.set_attribute(attr::CLASS_NAME, "Arrow");
        element.set_attribute(attr::CLASS_ID, CLASS_ID_ARROW);
        element.set_attribute(attr::ARROWHEAD_SIZE, arrow.size.to_string());

        let (start_x, start_y) = self.scale.point_to_wire(arrow.start);
        let (end_x, end_y) = self.scale.point_to_wire(arrow.end);
        element.set_attribute(attr::LINE_START_X, start_x.to_string());
        element.set_attribute(attr::LINE_START_Y, start_y.to_string());
        element.set_attribute(attr::LINE_END_X, end_x.to_string());
        element.set_attribute(attr::LINE_END_Y, end_y.to_string());
        Ok(())
    }

    fn text_element(&self, annotation: &Annotation) -> XmlElement {
        let mut element = XmlElement::new(attr::TEXT);
        if let Some(text) = annotation.text() {
            element.set_attribute(attr::ENCODING, attr::ENCODING_UNICODE);
            element.set_text(encode_unicode_hex(text, self.code_page));
        }
        element
    }
}

fn write_highlight(
    element: &mut XmlElement,
    meta: &AnnotationMeta,
    highlight: &HighlightAnnotation,
) {
    element.set_attribute(attr::CLASS_NAME, "Highlight");
    element.set_attribute(attr::CLASS_ID, CLASS_ID_HIGHLIGHT);
    write_background_mode(element, &meta.display);

    if let Some(border) = &meta.display.border {
        element.set_attribute(attr::LINE_COLOR, format_color(&border.color));
        element.set_attribute(attr::LINE_WIDTH, border.line.weight.to_string());
    }

    element.set_attribute(attr::BRUSH_COLOR, format_color(&highlight.highlight_color));
}

fn write_text(element: &mut XmlElement, meta: &AnnotationMeta, text: &TextAnnotation) {
    element.set_attribute(attr::CLASS_NAME, "Text");
    element.set_attribute(attr::CLASS_ID, CLASS_ID_TEXT);
    write_border(element, &meta.display);
    write_font(element, &text.markup);
    write_background_mode(element, &meta.display);
}

fn write_sticky_note(element: &mut XmlElement, note: &StickyNoteAnnotation) {
    element.set_attribute(attr::CLASS_NAME, "StickyNote");
    element.set_attribute(attr::CLASS_ID, CLASS_ID_STICKY_NOTE);
    element.set_attribute(attr::FORE_COLOR, format_color(&STICKY_NOTE_COLOR));
    element.set_attribute(attr::ORDINAL, note.note_order.to_string());
}

fn write_stamp(element: &mut XmlElement, meta: &AnnotationMeta, stamp: &StampAnnotation) {
    element.set_attribute(attr::CLASS_NAME, "Stamp");
    element.set_attribute(attr::CLASS_ID, CLASS_ID_STAMP);
    write_border(element, &meta.display);
    write_font(element, &stamp.text_element);
    // The renderer measures rotation clockwise.
    let rotation = 360.0 - stamp.text_element.rotation;
    element.set_attribute(attr::ROTATION, rotation.to_string());
    write_background_mode(element, &meta.display);
}

fn write_rectangle(
    element: &mut XmlElement,
    meta: &AnnotationMeta,
    rectangle: &RectangleAnnotation,
) -> Result<()> {
    let foreground = meta
        .display
        .foreground
        .ok_or_else(|| CodecError::MissingField("Rectangle display.foreground".to_string()))?;
    let border = meta
        .display
        .border
        .ok_or_else(|| CodecError::MissingField("Rectangle display.border".to_string()))?;

    element.set_attribute(attr::CLASS_NAME, CLASS_NAME_PROPRIETARY);
    element.set_attribute(attr::SUBCLASS, SUBCLASS_RECTANGLE);
    element.set_attribute(attr::CLASS_ID, CLASS_ID_PROPRIETARY);
    element.set_attribute(attr::BRUSH_COLOR, format_color(&foreground));
    element.set_attribute(attr::LINE_COLOR, format_color(&border.color));
    element.set_attribute(attr::LINE_WIDTH, rectangle.line.weight.to_string());

    let fill_mode = if rectangle.is_filled {
        2
    } else {
        opacity_to_mode3(foreground.opacity)
    };
    element.set_attribute(attr::TEXT_BACK_MODE, fill_mode.to_string());
    Ok(())
}

/// Border block shared by text and stamp annotations
fn write_border(element: &mut XmlElement, display: &Display) {
    let Some(border) = &display.border else {
        element.set_bool_attribute(attr::HAS_BORDER, false);
        return;
    };
    element.set_bool_attribute(attr::HAS_BORDER, true);

    if let Some(background) = &display.background {
        element.set_attribute(attr::BACK_COLOR, format_color(background));
    }
    let back_mode = opacity_to_mode3(border.color.opacity);
    element.set_attribute(attr::BORDER_BACK_MODE, back_mode.to_string());
    element.set_attribute(attr::BORDER_COLOR, format_color(&border.color));
    element.set_attribute(attr::BORDER_WIDTH, border.line.weight.to_string());
    let style = encode_border_style(border.line.pattern);
    element.set_attribute(attr::BORDER_STYLE, style.to_string());
}

fn write_font(element: &mut XmlElement, markup: &TextMarkup) {
    let font = &markup.font;
    element.set_bool_attribute(attr::FONT_BOLD, font.bold);
    element.set_bool_attribute(attr::FONT_ITALIC, font.italic);
    element.set_attribute(attr::FONT_NAME, font.name.to_lowercase());
    element.set_attribute(attr::FONT_SIZE, font.size.to_string());
    element.set_bool_attribute(attr::FONT_STRIKETHROUGH, font.strikethrough);
    element.set_bool_attribute(attr::FONT_UNDERLINE, font.underline);
    element.set_attribute(attr::FORE_COLOR, format_color(&font.color));
}

fn write_background_mode(element: &mut XmlElement, display: &Display) {
    let Some(background) = &display.background else {
        return;
    };
    element.set_attribute(attr::BACK_COLOR, format_color(background));
    let back_mode = opacity_to_mode2(background.opacity);
    element.set_attribute(attr::TEXT_BACK_MODE, back_mode.to_string());
}
