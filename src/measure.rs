use unicode_width::UnicodeWidthStr;

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextStyle {
    pub font_family: String,
}

impl Default for TextStyle {
    fn default() -> Self {
        Self {
            font_family: "sans-serif".to_string(),
        }
    }
}

/// Text measurement operation of the rendering surface. Only label fitting
/// and transition-label layout use it; all other surface operations stay
/// outside the engine.
pub trait TextMeasure {
    fn text_size(&self, text: &str, font_size: f64, style: &TextStyle) -> Size;
}

/// Character-cell approximation of text extents, good enough for label
/// fitting when no font backend is attached.
pub struct CharMetrics {
    /// Width of one character cell as a fraction of the font size.
    pub aspect: f64,
}

impl Default for CharMetrics {
    fn default() -> Self {
        Self { aspect: 0.6 }
    }
}

impl TextMeasure for CharMetrics {
    fn text_size(&self, text: &str, font_size: f64, _style: &TextStyle) -> Size {
        let cells = UnicodeWidthStr::width(text);
        Size {
            width: cells as f64 * font_size * self.aspect,
            height: font_size,
        }
    }
}
