use crate::measure::TextStyle;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LadderizeMethod {
    MaxEdgeLength,
    NumberOfLeaves,
}

impl LadderizeMethod {
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "max-edge-length" => Some(Self::MaxEdgeLength),
            "number-of-leaves" => Some(Self::NumberOfLeaves),
            _ => None,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Unrecognized ladderize method: {0}")]
    UnknownLadderizeMethod(String),
}

/// Parses a ladderize method keyword; unrecognized keywords abort the
/// pipeline.
pub fn parse_ladderize_method(s: &str) -> Result<LadderizeMethod, ConfigError> {
    LadderizeMethod::from_str(s).ok_or_else(|| ConfigError::UnknownLadderizeMethod(s.to_string()))
}

#[derive(Debug, Clone)]
pub struct TreeDrawSettings {
    pub ladderize_method: LadderizeMethod,
    /// Re-root the tree at the parent of the named leaf before any other pass.
    pub root: Option<String>,
    /// Hide leaves isolated before this date (None: do not hide by date).
    pub hide_isolated_before: Option<String>,
    /// Hide leaves on long branches.
    pub hide_if_cumulative_edge_length_bigger_than: f64,
    /// Offset of the leaf label from the branch end, in "W" widths.
    pub name_offset: f64,
    pub label_style: TextStyle,
    pub aa_transition: AaTransitionSettings,
}

impl Default for TreeDrawSettings {
    fn default() -> Self {
        Self {
            ladderize_method: LadderizeMethod::NumberOfLeaves,
            root: None,
            hide_isolated_before: None,
            hide_if_cumulative_edge_length_bigger_than: 0.05,
            name_offset: 0.3,
            label_style: TextStyle::default(),
            aa_transition: AaTransitionSettings::default(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AaTransitionSettings {
    pub show: bool,
    /// Do not draw a transition label on a branch with fewer visible
    /// descendant strains than this. Consumed by the renderer; the inferrer
    /// reports all transitions.
    pub number_strains_threshold: usize,
    pub show_empty_left: bool,
}

impl Default for AaTransitionSettings {
    fn default() -> Self {
        Self {
            show: true,
            number_strains_threshold: 20,
            show_empty_left: false,
        }
    }
}

#[derive(Debug, Clone)]
pub struct HzSection {
    /// Seq id of the first leaf of the section.
    pub name: String,
    pub show: bool,
}

impl HzSection {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            show: true,
        }
    }
}

#[derive(Debug, Clone)]
pub struct HzSections {
    /// Extra gap inserted before a section start, in vertical-step units.
    pub vertical_gap: f64,
    pub sections: Vec<HzSection>,
}

impl Default for HzSections {
    fn default() -> Self {
        Self {
            vertical_gap: 2.0,
            sections: Vec::new(),
        }
    }
}
