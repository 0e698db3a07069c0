//! Class triplets the renderer uses to identify each annotation variant.

pub const CLASS_ID_ARROW: &str = "{5CF11946-018F-11D0-A87A-00A0246922A5}";
pub const CLASS_ID_STAMP: &str = "{5CF1194C-018F-11D0-A87A-00A0246922A5}";
pub const CLASS_ID_STICKY_NOTE: &str = "{5CF11945-018F-11D0-A87A-00A0246922A5}";
pub const CLASS_ID_TEXT: &str = "{5CF11941-018F-11D0-A87A-00A0246922A5}";
pub const CLASS_ID_HIGHLIGHT: &str = "{5CF11942-018F-11D0-A87A-00A0246922A5}";
pub const CLASS_ID_PROPRIETARY: &str = "{A91E5DF2-6B7B-11D1-B6D7-00609705F027}";
pub const CLASS_ID_PEN: &str = "{5CF11949-018F-11D0-A87A-00A0246922A5}";

pub const CLASS_NAME_PROPRIETARY: &str = "Proprietary";
pub const SUBCLASS_RECTANGLE: &str = "v1-Rectangle";
pub const SUBCLASS_LINE: &str = "v1-Line";
pub const SUBCLASS_OVAL: &str = "v1-Oval";

/// Which decoder handles a wire annotation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnnotationVariant {
    Arrow,
    Stamp,
    StickyNote,
    Text,
    Highlight,
    Rectangle,
    Line,
    Ellipse,
    Pen,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegistryEntry {
    pub class_id: &'static str,
    pub class_name: &'static str,
    pub sub_class_name: Option<&'static str>,
    pub variant: AnnotationVariant,
}

const fn entry(
    class_id: &'static str,
    class_name: &'static str,
    sub_class_name: Option<&'static str>,
    variant: AnnotationVariant,
) -> RegistryEntry {
    RegistryEntry {
        class_id,
        class_name,
        sub_class_name,
        variant,
    }
}

/// Lookup order matters, see [`resolve`].
pub static SUPPORTED_ANNOTATIONS: [RegistryEntry; 9] = [
    entry(CLASS_ID_ARROW, "Arrow", None, AnnotationVariant::Arrow),
    entry(CLASS_ID_STAMP, "Stamp", None, AnnotationVariant::Stamp),
    entry(
        CLASS_ID_STICKY_NOTE,
        "StickyNote",
        None,
        AnnotationVariant::StickyNote,
    ),
    entry(CLASS_ID_TEXT, "Text", None, AnnotationVariant::Text),
    entry(
        CLASS_ID_HIGHLIGHT,
        "Highlight",
        None,
        AnnotationVariant::Highlight,
    ),
    entry(
        CLASS_ID_PROPRIETARY,
        CLASS_NAME_PROPRIETARY,
        Some(SUBCLASS_RECTANGLE),
        AnnotationVariant::Rectangle,
    ),
    entry(
        CLASS_ID_PROPRIETARY,
        CLASS_NAME_PROPRIETARY,
        Some(SUBCLASS_LINE),
        AnnotationVariant::Line,
    ),
    entry(
        CLASS_ID_PROPRIETARY,
        CLASS_NAME_PROPRIETARY,
        Some(SUBCLASS_OVAL),
        AnnotationVariant::Ellipse,
    ),
    entry(CLASS_ID_PEN, "Pen", None, AnnotationVariant::Pen),
];

/// Resolves a wire triplet against [`SUPPORTED_ANNOTATIONS`].
///
/// An entry without a subclass requirement ends the scan. A subclass match
/// is recorded but the scan keeps going, so a later match wins.
pub fn resolve(
    class_id: &str,
    class_name: &str,
    sub_class_name: Option<&str>,
) -> Option<AnnotationVariant> {
    resolve_in(&SUPPORTED_ANNOTATIONS, class_id, class_name, sub_class_name)
}

pub fn resolve_in(
    entries: &[RegistryEntry],
    class_id: &str,
    class_name: &str,
    sub_class_name: Option<&str>,
) -> Option<AnnotationVariant> {
    let mut result = None;

    for item in entries {
        if item.class_id != class_id || item.class_name != class_name {
            continue;
        }
        match item.sub_class_name {
            None => {
                result = Some(item.variant);
                break;
            }
            Some(required) if Some(required) == sub_class_name => {
                result = Some(item.variant);
            }
            Some(_) => {}
        }
    }

    result
}
