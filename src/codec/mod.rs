mod decoder;
mod encoder;
pub mod registry;
pub mod values;
pub mod xml;

pub use decoder::AnnotationDecoder;
pub use encoder::{compose_name, AnnotationEncoder};
pub use registry::AnnotationVariant;
pub use values::Scale;
pub use xml::{XmlDocument, XmlElement, XmlError};

pub(crate) const ROOT_ELEMENT: &str = "FnAnno";
pub(crate) const PROP_DESC_ELEMENT: &str = "PropDesc";
pub(crate) const PROP_DESC_PATH: &str = "/FnAnno/PropDesc";
pub(crate) const TEXT_PATH: &str = "/FnAnno/PropDesc/F_TEXT";

/// Attribute and element names of the renderer's wire format
pub(crate) mod attr {
    pub const ANNOTATED_ID: &str = "F_ANNOTATEDID";
    pub const ID: &str = "F_ID";
    pub const ENTRY_DATE: &str = "F_ENTRYDATE";
    pub const MODIFY_DATE: &str = "F_MODIFYDATE";
    pub const PAGE_NUMBER: &str = "F_PAGENUMBER";
    pub const MULTI_PAGE_TIFF_PAGE_NUMBER: &str = "F_MULTIPAGETIFFPAGENUMBER";
    pub const NAME: &str = "F_NAME";
    pub const LEFT: &str = "F_LEFT";
    pub const TOP: &str = "F_TOP";
    pub const WIDTH: &str = "F_WIDTH";
    pub const HEIGHT: &str = "F_HEIGHT";

    pub const CLASS_ID: &str = "F_CLASSID";
    pub const CLASS_NAME: &str = "F_CLASSNAME";
    pub const SUBCLASS: &str = "F_SUBCLASS";

    pub const HAS_BORDER: &str = "F_HASBORDER";
    pub const BACK_COLOR: &str = "F_BACKCOLOR";
    pub const BORDER_BACK_MODE: &str = "F_BORDER_BACKMODE";
    pub const BORDER_COLOR: &str = "F_BORDER_COLOR";
    pub const BORDER_STYLE: &str = "F_BORDER_STYLE";
    pub const BORDER_WIDTH: &str = "F_BORDER_WIDTH";
    pub const TEXT_BACK_MODE: &str = "F_TEXT_BACKMODE";
    pub const BRUSH_COLOR: &str = "F_BRUSHCOLOR";
    pub const FORE_COLOR: &str = "F_FORECOLOR";

    pub const FONT_BOLD: &str = "F_FONT_BOLD";
    pub const FONT_ITALIC: &str = "F_FONT_ITALIC";
    pub const FONT_NAME: &str = "F_FONT_NAME";
    pub const FONT_SIZE: &str = "F_FONT_SIZE";
    pub const FONT_STRIKETHROUGH: &str = "F_FONT_STRIKETHROUGH";
    pub const FONT_UNDERLINE: &str = "F_FONT_UNDERLINE";
    pub const ROTATION: &str = "F_ROTATION";

    pub const LINE_BACK_MODE: &str = "F_LINE_BACKMODE";
    pub const LINE_COLOR: &str = "F_LINE_COLOR";
    pub const LINE_STYLE: &str = "F_LINE_STYLE";
    pub const LINE_WIDTH: &str = "F_LINE_WIDTH";
    pub const LINE_START_X: &str = "F_LINE_START_X";
    pub const LINE_START_Y: &str = "F_LINE_START_Y";
    pub const LINE_END_X: &str = "F_LINE_END_X";
    pub const LINE_END_Y: &str = "F_LINE_END_Y";
    pub const ARROWHEAD_SIZE: &str = "F_ARROWHEAD_SIZE";
    pub const ORDINAL: &str = "F_ORDINAL";

    pub const CUSTOM_BYTES: &str = "F_CUSTOM_BYTES";
    pub const POINTS: &str = "F_POINTS";
    pub const TEXT: &str = "F_TEXT";
    pub const ENCODING: &str = "Encoding";
    pub const ENCODING_UNICODE: &str = "unicode";
}
