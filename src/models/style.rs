use serde::{Deserialize, Serialize};

/// A position in device pixels
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// RGB colour with an opacity percentage (0..=100)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Color {
    pub red: u8,
    pub green: u8,
    pub blue: u8,
    #[serde(default = "default_opacity")]
    pub opacity: u8,
}

fn default_opacity() -> u8 {
    100
}

impl Color {
    pub fn new(red: u8, green: u8, blue: u8, opacity: u8) -> Self {
        Self {
            red,
            green,
            blue,
            opacity: opacity.min(100),
        }
    }

    /// Fully opaque colour
    pub fn rgb(red: u8, green: u8, blue: u8) -> Self {
        Self::new(red, green, blue, 100)
    }

    pub fn with_opacity(mut self, opacity: u8) -> Self {
        self.opacity = opacity.min(100);
        self
    }
}

impl Default for Color {
    fn default() -> Self {
        Color::rgb(0, 0, 0)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum LinePattern {
    #[default]
    Solid,
    Dash,
    Dot,
    DashDot,
    DashDotDot,
    None,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineStyle {
    pub weight: i32,
    pub pattern: LinePattern,
}

impl LineStyle {
    pub fn new(weight: i32, pattern: LinePattern) -> Self {
        Self { weight, pattern }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Border {
    pub color: Color,
    pub line: LineStyle,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FontInfo {
    pub name: String,
    #[serde(default)]
    pub family: String,
    pub size: f32,
    #[serde(default)]
    pub bold: bool,
    #[serde(default)]
    pub italic: bool,
    #[serde(default)]
    pub underline: bool,
    #[serde(default)]
    pub strikethrough: bool,
    #[serde(default)]
    pub color: Color,
}

impl Default for FontInfo {
    fn default() -> Self {
        FontInfo {
            name: "Arial".to_string(),
            family: "Arial".to_string(),
            size: 12.0,
            bold: false,
            italic: false,
            underline: false,
            strikethrough: false,
            color: Color::default(),
        }
    }
}

/// Colours and border shared by every annotation variant
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Display {
    #[serde(default)]
    pub foreground: Option<Color>,
    #[serde(default)]
    pub background: Option<Color>,
    #[serde(default)]
    pub border: Option<Border>,
}
