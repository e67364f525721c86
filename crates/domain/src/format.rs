use serde::{Deserialize, Serialize};

use crate::error::{PrintError, Result};
use crate::wire::WireMap;

/// Horizontal alignment of printed text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TextAlign {
    Left,
    Center,
    Right,
}

impl TextAlign {
    /// Vendor code for this alignment
    pub fn wire_code(self) -> i64 {
        match self {
            Self::Left => 0,
            Self::Center => 1,
            Self::Right => 2,
        }
    }
}

/// Emphasis applied to printed text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TextStyle {
    Normal,
    Bold,
    Italic,
    BoldItalic,
}

impl TextStyle {
    /// Vendor code for this style
    pub fn wire_code(self) -> i64 {
        match self {
            Self::Normal => 0,
            Self::Bold => 1,
            Self::Italic => 2,
            Self::BoldItalic => 3,
        }
    }
}

/// Typeface selection from the printer firmware's fixed set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PrinterFont {
    Default,
    DefaultBold,
    SansSerif,
    Serif,
    Monospace,
}

impl PrinterFont {
    /// Vendor code for this typeface
    pub fn wire_code(self) -> i64 {
        match self {
            Self::Default => 0,
            Self::DefaultBold => 1,
            Self::SansSerif => 2,
            Self::Serif => 3,
            Self::Monospace => 4,
        }
    }
}

/// Complete description of how a piece of text should be rendered.
///
/// Built through the consuming `with_*` methods, validated as a whole
/// before it is flattened into call arguments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextFormat {
    text_size: i32,
    underline: bool,
    text_scale_x: f32,
    text_scale_y: f32,
    letter_spacing: f32,
    line_spacing: f32,
    top_padding: i32,
    left_padding: i32,
    align: TextAlign,
    style: TextStyle,
    font: PrinterFont,
}

impl Default for TextFormat {
    fn default() -> Self {
        Self {
            text_size: 24,
            underline: false,
            text_scale_x: 1.0,
            text_scale_y: 1.0,
            letter_spacing: 0.0,
            line_spacing: 0.0,
            top_padding: 0,
            left_padding: 0,
            align: TextAlign::Left,
            style: TextStyle::Normal,
            font: PrinterFont::Default,
        }
    }
}

impl TextFormat {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_text_size(mut self, size: i32) -> Self {
        self.text_size = size;
        self
    }

    pub fn with_underline(mut self, underline: bool) -> Self {
        self.underline = underline;
        self
    }

    pub fn with_text_scale_x(mut self, scale: f32) -> Self {
        self.text_scale_x = scale;
        self
    }

    pub fn with_text_scale_y(mut self, scale: f32) -> Self {
        self.text_scale_y = scale;
        self
    }

    pub fn with_letter_spacing(mut self, spacing: f32) -> Self {
        self.letter_spacing = spacing;
        self
    }

    pub fn with_line_spacing(mut self, spacing: f32) -> Self {
        self.line_spacing = spacing;
        self
    }

    pub fn with_top_padding(mut self, padding: i32) -> Self {
        self.top_padding = padding;
        self
    }

    pub fn with_left_padding(mut self, padding: i32) -> Self {
        self.left_padding = padding;
        self
    }

    pub fn with_align(mut self, align: TextAlign) -> Self {
        self.align = align;
        self
    }

    pub fn with_style(mut self, style: TextStyle) -> Self {
        self.style = style;
        self
    }

    pub fn with_font(mut self, font: PrinterFont) -> Self {
        self.font = font;
        self
    }

    pub fn text_size(&self) -> i32 {
        self.text_size
    }

    pub fn underline(&self) -> bool {
        self.underline
    }

    pub fn align(&self) -> TextAlign {
        self.align
    }

    pub fn style(&self) -> TextStyle {
        self.style
    }

    pub fn font(&self) -> PrinterFont {
        self.font
    }

    /// Check every field against the ranges the service accepts.
    pub fn validate(&self) -> Result<()> {
        if self.text_size <= 0 {
            return Err(PrintError::invalid_argument(
                "textSize",
                "must be positive",
            ));
        }
        if self.text_scale_x <= 0.0 {
            return Err(PrintError::invalid_argument(
                "textScaleX",
                "must be positive",
            ));
        }
        if self.text_scale_y <= 0.0 {
            return Err(PrintError::invalid_argument(
                "textScaleY",
                "must be positive",
            ));
        }
        if self.letter_spacing < 0.0 {
            return Err(PrintError::invalid_argument(
                "letterSpacing",
                "must not be negative",
            ));
        }
        if self.line_spacing < 0.0 {
            return Err(PrintError::invalid_argument(
                "lineSpacing",
                "must not be negative",
            ));
        }
        if self.top_padding < 0 {
            return Err(PrintError::invalid_argument(
                "topPadding",
                "must not be negative",
            ));
        }
        if self.left_padding < 0 {
            return Err(PrintError::invalid_argument(
                "leftPadding",
                "must not be negative",
            ));
        }
        Ok(())
    }

    /// Flatten into the argument map a text print call carries.
    pub fn to_wire_map(&self) -> Result<WireMap> {
        self.validate()?;
        let mut map = WireMap::new();
        map.insert("textSize", self.text_size);
        map.insert("underline", self.underline);
        map.insert("textScaleX", self.text_scale_x);
        map.insert("textScaleY", self.text_scale_y);
        map.insert("letterSpacing", self.letter_spacing);
        map.insert("lineSpacing", self.line_spacing);
        map.insert("topPadding", self.top_padding);
        map.insert("leftPadding", self.left_padding);
        map.insert("align", self.align.wire_code());
        map.insert("style", self.style.wire_code());
        map.insert("font", self.font.wire_code());
        Ok(map)
    }
}
