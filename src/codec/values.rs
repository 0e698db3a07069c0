//! Scalar conversions between the annotation model and wire attribute values.
//!
//! Everything here is a pure function. The quantisation rules are lossy on
//! purpose: they reproduce the renderer's own encodings.

use chrono::{DateTime, FixedOffset, NaiveDateTime, TimeZone, Timelike, Utc};
use encoding_rs::Encoding;
use tracing::warn;

use crate::error::{CodecError, Result};
use crate::models::{Color, LinePattern, Point};

/// Packs red/green/blue into the renderer's decimal BGR integer
pub fn pack_color(color: &Color) -> u32 {
    let mut packed = color.blue as u32;
    packed *= 256;
    packed += color.green as u32;
    packed *= 256;
    packed += color.red as u32;
    packed
}

pub fn format_color(color: &Color) -> String {
    pack_color(color).to_string()
}

/// Unpacks a BGR integer. The wire carries no opacity so the result is opaque.
pub fn unpack_color(packed: i32) -> Color {
    Color::rgb(
        (packed & 255) as u8,
        ((packed >> 8) & 255) as u8,
        ((packed >> 16) & 255) as u8,
    )
}

/// Three-level backmode used by border and fill fields
pub fn opacity_to_mode3(opacity: u8) -> i32 {
    match opacity {
        0..=25 => 0,
        26..=75 => 1,
        _ => 2,
    }
}

/// Two-level backmode used by line and text-background fields; never yields 0
pub fn opacity_to_mode2(opacity: u8) -> i32 {
    if opacity <= 50 {
        1
    } else {
        2
    }
}

/// Inverse of both backmode quantisers, clamped to a valid percentage
pub fn mode_to_opacity(mode: i32) -> u8 {
    (50 * mode.clamp(0, 2)) as u8
}

/// Wire line-style code to pattern. Unknown codes log and yield `None`.
pub fn decode_line_pattern(code: i32) -> LinePattern {
    match code {
        0 => LinePattern::Solid,
        1 => LinePattern::Dash,
        2 => LinePattern::Dot,
        3 => LinePattern::DashDot,
        4 => LinePattern::DashDotDot,
        other => {
            warn!("Unknown line style value {}", other);
            LinePattern::None
        }
    }
}

/// Pattern to the `F_LINE_STYLE` code, the exact inverse of [`decode_line_pattern`]
pub fn encode_line_style(pattern: LinePattern) -> i32 {
    match pattern {
        LinePattern::Solid => 0,
        LinePattern::Dash => 1,
        LinePattern::Dot => 2,
        LinePattern::DashDot => 3,
        LinePattern::DashDotDot => 4,
        LinePattern::None => 0,
    }
}

/// Pattern to the `F_BORDER_STYLE` code.
///
/// Offset by one against [`decode_line_pattern`]; the renderer's stored
/// annotations depend on it, so a Solid border reads back as Dash.
pub fn encode_border_style(pattern: LinePattern) -> i32 {
    match pattern {
        LinePattern::Solid => 1,
        LinePattern::Dash => 2,
        LinePattern::Dot => 3,
        LinePattern::DashDot => 4,
        LinePattern::DashDotDot => 5,
        LinePattern::None => 0,
    }
}

/// Left/top/width/height in inches
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct WireRect {
    pub left: f32,
    pub top: f32,
    pub width: f32,
    pub height: f32,
}

/// Device pixels per inch along each axis
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Scale {
    pub x: f32,
    pub y: f32,
}

impl Default for Scale {
    fn default() -> Self {
        Scale { x: 96.0, y: 96.0 }
    }
}

impl Scale {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn to_wire(&self, upper_left: Point, lower_right: Point) -> WireRect {
        WireRect {
            left: upper_left.x / self.x,
            top: upper_left.y / self.y,
            width: (lower_right.x - upper_left.x) / self.x,
            height: (lower_right.y - upper_left.y) / self.y,
        }
    }

    pub fn from_wire(&self, rect: WireRect) -> (Point, Point) {
        let upper_left = Point::new(self.x * rect.left, self.y * rect.top);
        let lower_right = Point::new(
            self.x * rect.width + upper_left.x,
            self.y * rect.height + upper_left.y,
        );
        (upper_left, lower_right)
    }

    pub fn point_to_wire(&self, point: Point) -> (f32, f32) {
        (point.x / self.x, point.y / self.y)
    }

    pub fn point_from_wire(&self, x: f32, y: f32) -> Point {
        Point::new(x * self.x, y * self.y)
    }
}

/// `2010-07-01T21:20:36.0000000-05:00`: seven fractional digits, numeric offset
pub fn format_date(date: &DateTime<FixedOffset>) -> String {
    let ticks = (date.nanosecond() % 1_000_000_000) / 100;
    format!(
        "{}.{:07}{}",
        date.format("%Y-%m-%dT%H:%M:%S"),
        ticks,
        date.format("%:z")
    )
}

/// Parses wire dates. Values without an offset are taken as UTC.
pub fn parse_date(value: &str) -> Option<DateTime<FixedOffset>> {
    const NAIVE_FORMATS: [&str; 3] = [
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%dT%H:%M:%S",
    ];

    let value = value.trim();
    if let Ok(date) = DateTime::parse_from_rfc3339(value) {
        return Some(date);
    }
    for format in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(value, format) {
            return Some(Utc.from_utc_datetime(&naive).fixed_offset());
        }
    }
    None
}

/// Encodes text as four upper-case hex digits per UTF-16 code unit.
///
/// ASCII units are written as-is. Anything else is written as its value in
/// `code_page`, not as its Unicode scalar, which is what the renderer does.
pub fn encode_unicode_hex(source: &str, code_page: &'static Encoding) -> String {
    let mut output = String::with_capacity(source.len() * 4);
    for unit in source.encode_utf16() {
        output.push_str(&format!("{:04X}", code_page_value(unit, code_page)));
    }
    output
}

fn code_page_value(unit: u16, code_page: &'static Encoding) -> i32 {
    const REPLACEMENT: i32 = b'?' as i32;

    if unit < 128 {
        return unit as i32;
    }
    // Halves of a surrogate pair are encoded one at a time and never map.
    let Some(ch) = char::from_u32(unit as u32) else {
        return REPLACEMENT;
    };
    let mut buf = [0u8; 4];
    let (bytes, _, had_errors) = code_page.encode(ch.encode_utf8(&mut buf));
    if had_errors {
        return REPLACEMENT;
    }
    match bytes.len() {
        0 => REPLACEMENT,
        1 => bytes[0] as i32,
        _ => i16::from_be_bytes([bytes[0], bytes[1]]) as i32,
    }
}

/// Decodes four-digit hex groups, each taken directly as a UTF-16 code unit
pub fn decode_unicode_hex(source: &str) -> Result<String> {
    if !source.is_ascii() || source.len() % 4 != 0 {
        return Err(CodecError::InvalidArgument(format!(
            "Unicode hex string length must be a multiple of 4 ASCII digits, got {:?}",
            source
        )));
    }

    let units = source
        .as_bytes()
        .chunks(4)
        .map(|group| {
            // ASCII was checked above, so every group is valid UTF-8.
            let digits = std::str::from_utf8(group).unwrap_or_default();
            u16::from_str_radix(digits, 16).map_err(|e| {
                let message = format!("Invalid hex group {:?}: {}", digits, e);
                CodecError::InvalidArgument(message)
            })
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(String::from_utf16_lossy(&units))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_pack_color_known_values() {
        assert_eq!(format_color(&Color::rgb(255, 0, 0)), "255");
        assert_eq!(format_color(&Color::rgb(0, 255, 0)), "65280");
        assert_eq!(format_color(&Color::rgb(0, 0, 255)), "16711680");
        assert_eq!(format_color(&Color::rgb(153, 255, 255)), "16777113");
    }

    #[test]
    fn test_unpack_color_ignores_high_bits() {
        let color = unpack_color(-1);
        assert_eq!((color.red, color.green, color.blue), (255, 255, 255));
        assert_eq!(color.opacity, 100);
    }

    proptest! {
        #[test]
        fn test_color_pack_unpack_inverse(
            r in 0u8..=255,
            g in 0u8..=255,
            b in 0u8..=255,
        ) {
            let color = Color::rgb(r, g, b);
            let back = unpack_color(pack_color(&color) as i32);
            prop_assert_eq!((back.red, back.green, back.blue), (r, g, b));
        }
    }

    #[test]
    fn test_opacity_three_level_round_trip() {
        let cases = [
            (0, 0),
            (20, 0),
            (25, 0),
            (26, 50),
            (50, 50),
            (75, 50),
            (76, 100),
            (90, 100),
            (100, 100),
        ];
        for (input, expected) in cases {
            let opacity = mode_to_opacity(opacity_to_mode3(input));
            assert_eq!(opacity, expected, "opacity {}", input);
        }
    }

    #[test]
    fn test_opacity_two_level_round_trip_never_zero() {
        for input in 0..=50u8 {
            assert_eq!(mode_to_opacity(opacity_to_mode2(input)), 50);
        }
        for input in 51..=100u8 {
            assert_eq!(mode_to_opacity(opacity_to_mode2(input)), 100);
        }
    }

    #[test]
    fn test_mode_to_opacity_clamps_garbage() {
        assert_eq!(mode_to_opacity(-3), 0);
        assert_eq!(mode_to_opacity(7), 100);
    }

    #[test]
    fn test_line_pattern_tables() {
        assert_eq!(decode_line_pattern(0), LinePattern::Solid);
        assert_eq!(decode_line_pattern(4), LinePattern::DashDotDot);
        assert_eq!(decode_line_pattern(9), LinePattern::None);
        let dot = encode_line_style(LinePattern::Dot);
        assert_eq!(decode_line_pattern(dot), LinePattern::Dot);
        // Border style is written one higher than it is read back.
        let solid = encode_border_style(LinePattern::Solid);
        assert_eq!(solid, 1);
        assert_eq!(decode_line_pattern(solid), LinePattern::Dash);
        let dash_dot_dot = encode_border_style(LinePattern::DashDotDot);
        assert_eq!(decode_line_pattern(dash_dot_dot), LinePattern::None);
    }

    #[test]
    fn test_scale_to_and_from_wire() {
        let scale = Scale::default();
        let rect = scale.to_wire(Point::new(48.0, 96.0), Point::new(144.0, 288.0));
        assert_eq!(
            rect,
            WireRect {
                left: 0.5,
                top: 1.0,
                width: 1.0,
                height: 2.0,
            }
        );
        let (ul, lr) = scale.from_wire(rect);
        assert_eq!(ul, Point::new(48.0, 96.0));
        assert_eq!(lr, Point::new(144.0, 288.0));
    }

    #[test]
    fn test_scale_uses_each_axis() {
        let scale = Scale::new(200.0, 100.0);
        assert_eq!(scale.point_to_wire(Point::new(100.0, 100.0)), (0.5, 1.0));
        assert_eq!(scale.point_from_wire(0.5, 1.0), Point::new(100.0, 100.0));
    }

    #[test]
    fn test_format_date_seven_digit_fraction() {
        let date = DateTime::parse_from_rfc3339("2010-07-01T21:20:36-05:00").unwrap();
        assert_eq!(format_date(&date), "2010-07-01T21:20:36.0000000-05:00");

        let date = DateTime::parse_from_rfc3339("2010-07-01T21:20:36.1234567+00:00")
            .unwrap();
        assert_eq!(format_date(&date), "2010-07-01T21:20:36.1234567+00:00");
    }

    #[test]
    fn test_parse_date_forms() {
        let date = parse_date("2010-07-01T21:20:36.0000000-05:00").unwrap();
        assert_eq!(format_date(&date), "2010-07-01T21:20:36.0000000-05:00");

        let naive = parse_date("2010-07-01T21:20:36").unwrap();
        assert_eq!(naive.offset().local_minus_utc(), 0);

        assert!(parse_date("yesterday").is_none());
    }

    #[test]
    fn test_hex_ascii() {
        assert_eq!(encode_unicode_hex("Hi", encoding_rs::WINDOWS_1252), "00480069");
        assert_eq!(decode_unicode_hex("00480069").unwrap(), "Hi");
        assert_eq!(encode_unicode_hex("", encoding_rs::WINDOWS_1252), "");
    }

    #[test]
    fn test_hex_uses_code_page_for_non_ascii() {
        // U+20AC is 0x80 in windows-1252, not 0x20AC.
        assert_eq!(encode_unicode_hex("\u{20AC}", encoding_rs::WINDOWS_1252), "0080");
        assert_eq!(encode_unicode_hex("\u{e9}", encoding_rs::WINDOWS_1252), "00E9");
        // Not representable in windows-1252.
        assert_eq!(encode_unicode_hex("\u{4e2d}", encoding_rs::WINDOWS_1252), "003F");
        // Each surrogate half is replaced on its own.
        assert_eq!(encode_unicode_hex("\u{1F600}", encoding_rs::WINDOWS_1252), "003F003F");
    }

    #[test]
    fn test_hex_double_byte_code_page_is_signed() {
        // U+3000 is 0x8140 in Shift_JIS, read back as a negative 16-bit value.
        assert_eq!(encode_unicode_hex("\u{3000}", encoding_rs::SHIFT_JIS), "FFFF8140");
    }

    #[test]
    fn test_decode_hex_rejects_malformed() {
        assert!(decode_unicode_hex("004").is_err());
        assert!(decode_unicode_hex("00G8").is_err());
        assert!(decode_unicode_hex("é000").is_err());
        assert_eq!(decode_unicode_hex("").unwrap(), "");
    }
}
