use crate::config::{HzSections, TreeDrawSettings};
use crate::measure::{Size, TextMeasure};
use crate::tree::{NodeId, Tree};

/// Bail-out bound for the label fitting loop; the 0.99 scale cap makes every
/// iteration shrink the layout, so real inputs converge in a handful of
/// rounds.
const MAX_FIT_ITERATIONS: usize = 64;

/// A detected horizontal section, spanning the visible leaves
/// `first..=last` in rendering order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Section {
    pub first: NodeId,
    pub last: NodeId,
}

/// Per-node layout products plus the tree-wide scalars, indexed by [NodeId].
/// Produced by [LayoutEngine::prepare]; stale after any structural change to
/// the tree.
#[derive(Debug, Clone)]
pub struct TreeLayout {
    pub shown: Vec<bool>,
    /// Root-to-node distance; -1.0 for hidden nodes, never valid geometry.
    pub cumulative_edge_length: Vec<f64>,
    /// 1-based line numbers of visible leaves; 0 = unassigned.
    pub line_no: Vec<usize>,
    pub vertical_pos: Vec<f64>,
    /// Visible descendant leaves per node, for transition-label gating.
    pub number_strains: Vec<usize>,
    pub hz_section_start: Vec<bool>,
    pub sections: Vec<Section>,

    /// Max visible cumulative edge length.
    pub width: f64,
    /// Number of numbered leaf lines.
    pub height: usize,
    pub horizontal_step: f64,
    pub vertical_step: f64,
    pub font_size: f64,
    pub name_offset: f64,
}

impl TreeLayout {
    fn new(len: usize) -> Self {
        Self {
            shown: vec![true; len],
            cumulative_edge_length: vec![-1.0; len],
            line_no: vec![0; len],
            vertical_pos: vec![0.0; len],
            number_strains: vec![0; len],
            hz_section_start: vec![false; len],
            sections: Vec::new(),
            width: 0.0,
            height: 0,
            horizontal_step: 0.0,
            vertical_step: 0.0,
            font_size: 0.0,
            name_offset: 0.0,
        }
    }

    /// Horizontal pixel extent of a visible node.
    pub fn horizontal_extent(&self, id: NodeId) -> f64 {
        self.cumulative_edge_length[id] * self.horizontal_step
    }

    /// Top and bottom vertical positions of a section.
    pub fn section_bounds(&self, section: &Section) -> (f64, f64) {
        (
            self.vertical_pos[section.first],
            self.vertical_pos[section.last],
        )
    }
}

/// Top-down pass: cumulative edge length per node under the given
/// visibility, with the hidden-node sentinel, and the maximum over visible
/// leaves.
pub fn cumulative_edge_lengths(tree: &Tree, shown: &[bool]) -> (Vec<f64>, f64) {
    let mut cumulative = vec![-1.0; tree.len()];
    let mut max = 0.0f64;
    if !tree.is_rooted() {
        return (cumulative, max);
    }
    let mut stack = vec![(tree.root(), 0.0)];
    while let Some((id, base)) = stack.pop() {
        if !shown[id] {
            continue;
        }
        let node = &tree[id];
        let length = base + node.edge_length;
        cumulative[id] = length;
        if node.is_leaf() {
            max = max.max(length);
        } else {
            for &child in &node.children {
                stack.push((child, length));
            }
        }
    }
    (cumulative, max)
}

/// Visible descendant leaf count per node.
pub fn number_strains(tree: &Tree, shown: &[bool]) -> Vec<usize> {
    let mut counts = vec![0; tree.len()];
    for id in tree.post_order() {
        let node = &tree[id];
        counts[id] = if node.is_leaf() {
            shown[id] as usize
        } else {
            node.children.iter().map(|&child| counts[child]).sum()
        };
    }
    counts
}

/// Runs the layout pass pipeline over an already ladderized tree:
/// aggregate edge lengths, prune, detect sections, number lines, fit the
/// horizontal scale, assign vertical positions.
pub struct LayoutEngine<'a> {
    settings: &'a TreeDrawSettings,
    hz_sections: &'a HzSections,
    measure: &'a dyn TextMeasure,
    canvas: Size,
}

impl<'a> LayoutEngine<'a> {
    pub fn new(
        settings: &'a TreeDrawSettings,
        hz_sections: &'a HzSections,
        measure: &'a dyn TextMeasure,
        canvas: Size,
    ) -> Self {
        Self {
            settings,
            hz_sections,
            measure,
            canvas,
        }
    }

    pub fn prepare(&self, tree: &Tree) -> TreeLayout {
        let mut layout = TreeLayout::new(tree.len());

        // the pruning cutoff needs distances over the fully visible tree
        let (cumulative, _) = cumulative_edge_lengths(tree, &layout.shown);
        layout.cumulative_edge_length = cumulative;
        self.hide_leaves(tree, &mut layout);
        let (cumulative, width) = cumulative_edge_lengths(tree, &layout.shown);
        layout.cumulative_edge_length = cumulative;
        layout.width = width;
        layout.number_strains = number_strains(tree, &layout.shown);

        let sections = self.prepare_hz_sections(tree, &mut layout);
        self.set_line_no(tree, &mut layout);

        // one spare line at the top and bottom of the tree
        layout.vertical_step = self.canvas.height
            / ((layout.height + 2) as f64 + (sections - 1) as f64 * self.hz_sections.vertical_gap);
        layout.horizontal_step = if layout.width > 0.0 {
            self.canvas.width / layout.width
        } else {
            0.0
        };
        self.fit_labels_into_viewport(tree, &mut layout);
        self.set_vertical_pos(tree, &mut layout);
        self.resolve_sections(tree, &mut layout);
        layout
    }

    fn hide_leaves(&self, tree: &Tree, layout: &mut TreeLayout) {
        let cutoff = self.settings.hide_if_cumulative_edge_length_bigger_than;
        for id in tree.post_order() {
            let node = &tree[id];
            layout.shown[id] = if node.is_leaf() {
                let isolated_early = match (&self.settings.hide_isolated_before, &node.date) {
                    (Some(before), Some(date)) => date.as_str() < before.as_str(),
                    _ => false,
                };
                !(isolated_early || layout.cumulative_edge_length[id] > cutoff)
            } else {
                node.children.iter().any(|&child| layout.shown[child])
            };
        }
    }

    /// Marks section-start leaves and returns the section count for sizing
    /// (at least 1: no sections means one implicit section).
    fn prepare_hz_sections(&self, tree: &Tree, layout: &mut TreeLayout) -> usize {
        let mut found = 0;
        let first_visible = tree.leaves().find(|&id| layout.shown[id]);
        for section in &self.hz_sections.sections {
            if !section.show {
                continue;
            }
            match tree.find_leaf_by_name(&section.name) {
                Some(id) => {
                    // no break before the first line
                    if Some(id) != first_visible {
                        layout.hz_section_start[id] = true;
                    }
                    found += 1;
                }
                None => log::warn!("hz section seq_id not found: {}", section.name),
            }
        }
        found.max(1)
    }

    fn set_line_no(&self, tree: &Tree, layout: &mut TreeLayout) {
        let mut current_line = 1;
        for id in tree.leaves() {
            if layout.shown[id] {
                layout.line_no[id] = current_line;
                current_line += 1;
            }
        }
        layout.height = current_line - 1;
        log::debug!("{} lines in the tree", layout.height);
    }

    fn set_vertical_pos(&self, tree: &Tree, layout: &mut TreeLayout) {
        let gap = self.hz_sections.vertical_gap * layout.vertical_step;
        let mut vertical_pos = layout.vertical_step;
        for id in tree.leaves() {
            if layout.shown[id] {
                if layout.hz_section_start[id] {
                    vertical_pos += gap;
                }
                layout.vertical_pos[id] = vertical_pos;
                vertical_pos += layout.vertical_step;
            }
        }

        for id in tree.post_order() {
            let node = &tree[id];
            if node.is_leaf() || !layout.shown[id] {
                continue;
            }
            let mut top = f64::INFINITY;
            let mut bottom = f64::NEG_INFINITY;
            for &child in &node.children {
                if layout.shown[child] {
                    top = top.min(layout.vertical_pos[child]);
                    bottom = bottom.max(layout.vertical_pos[child]);
                }
            }
            layout.vertical_pos[id] = (top + bottom) / 2.0;
        }
    }

    fn fit_labels_into_viewport(&self, tree: &Tree, layout: &mut TreeLayout) {
        layout.font_size = layout.vertical_step;
        let canvas_width = self.canvas.width;
        for _ in 0..MAX_FIT_ITERATIONS {
            let label_right = self.max_label_offset(tree, layout);
            if label_right <= canvas_width {
                break;
            }
            // the 0.99 cap guarantees progress when the ratio is close to 1
            let scale = (canvas_width / label_right).min(0.99);
            layout.horizontal_step *= scale;
            layout.font_size *= scale;
        }
    }

    fn max_label_offset(&self, tree: &Tree, layout: &mut TreeLayout) -> f64 {
        let style = &self.settings.label_style;
        layout.name_offset = self.settings.name_offset
            * self.measure.text_size("W", layout.font_size, style).width;

        let mut max_label_right = 0.0f64;
        for id in tree.leaves() {
            if !layout.shown[id] {
                continue;
            }
            let label_origin = layout.horizontal_extent(id) + layout.name_offset;
            let label_width = self
                .measure
                .text_size(&tree[id].display_name(), layout.font_size, style)
                .width;
            max_label_right = max_label_right.max(label_origin + label_width);
        }
        max_label_right
    }

    fn resolve_sections(&self, tree: &Tree, layout: &mut TreeLayout) {
        let mut sections: Vec<Section> = Vec::new();
        for id in tree.leaves() {
            if !layout.shown[id] {
                continue;
            }
            if sections.is_empty() || layout.hz_section_start[id] {
                sections.push(Section { first: id, last: id });
            } else if let Some(section) = sections.last_mut() {
                section.last = id;
            }
        }
        layout.sections = sections;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::HzSection;
    use crate::measure::CharMetrics;

    fn canvas() -> Size {
        Size {
            width: 500.0,
            height: 500.0,
        }
    }

    fn engine<'a>(
        settings: &'a TreeDrawSettings,
        hz: &'a HzSections,
        measure: &'a CharMetrics,
    ) -> LayoutEngine<'a> {
        LayoutEngine::new(settings, hz, measure, canvas())
    }

    // (((A:0.1,B:0.2):0.05,C:0.4):0,D:0.3)
    fn sample_tree() -> Tree {
        let mut tree = Tree::new();
        let a = tree.add_leaf("A", 0.1);
        let b = tree.add_leaf("B", 0.2);
        let ab = tree.add_internal(vec![a, b], 0.05);
        let c = tree.add_leaf("C", 0.4);
        let abc = tree.add_internal(vec![ab, c], 0.0);
        let d = tree.add_leaf("D", 0.3);
        let root = tree.add_internal(vec![abc, d], 0.0);
        tree.set_root(root);
        tree
    }

    fn open_settings() -> TreeDrawSettings {
        TreeDrawSettings {
            hide_if_cumulative_edge_length_bigger_than: f64::MAX,
            ..TreeDrawSettings::default()
        }
    }

    #[test]
    fn test_cumulative_edge_lengths() {
        let tree = sample_tree();
        let shown = vec![true; tree.len()];
        let (cumulative, max) = cumulative_edge_lengths(&tree, &shown);
        let a = tree.find_leaf_by_name("A").unwrap();
        let c = tree.find_leaf_by_name("C").unwrap();
        assert!((cumulative[a] - 0.15).abs() < 1e-12);
        assert!((cumulative[c] - 0.4).abs() < 1e-12);
        assert!((max - 0.4).abs() < 1e-12);
    }

    #[test]
    fn test_hide_by_date() {
        let mut tree = sample_tree();
        let a = tree.find_leaf_by_name("A").unwrap();
        let b = tree.find_leaf_by_name("B").unwrap();
        tree[a].date = Some("2010-01-01".to_string());
        tree[b].date = Some("2010-06-01".to_string());

        let settings = TreeDrawSettings {
            hide_isolated_before: Some("2010-03-01".to_string()),
            ..open_settings()
        };
        let hz = HzSections::default();
        let measure = CharMetrics::default();
        let layout = engine(&settings, &hz, &measure).prepare(&tree);

        assert!(!layout.shown[a]);
        assert!(layout.shown[b]);
        assert!(layout.shown[tree.root()]);
        assert_eq!(layout.cumulative_edge_length[a], -1.0);
        // leaves without a date are not hidden by the date cutoff
        assert!(layout.shown[tree.find_leaf_by_name("C").unwrap()]);
    }

    #[test]
    fn test_hide_by_cumulative_edge_length() {
        let tree = sample_tree();
        let settings = TreeDrawSettings {
            hide_if_cumulative_edge_length_bigger_than: 0.35,
            ..TreeDrawSettings::default()
        };
        let hz = HzSections::default();
        let measure = CharMetrics::default();
        let layout = engine(&settings, &hz, &measure).prepare(&tree);

        let c = tree.find_leaf_by_name("C").unwrap();
        assert!(!layout.shown[c]);
        assert!((layout.width - 0.3).abs() < 1e-12);
        // shown internal nodes have at least one shown child
        for id in tree.post_order() {
            if !tree[id].is_leaf() {
                let any_shown = tree[id].children.iter().any(|&child| layout.shown[child]);
                assert_eq!(layout.shown[id], any_shown);
            }
        }
    }

    #[test]
    fn test_line_numbers_consecutive() {
        let tree = sample_tree();
        let settings = open_settings();
        let hz = HzSections::default();
        let measure = CharMetrics::default();
        let layout = engine(&settings, &hz, &measure).prepare(&tree);

        let numbers: Vec<usize> = tree
            .leaves()
            .filter(|&id| layout.shown[id])
            .map(|id| layout.line_no[id])
            .collect();
        assert_eq!(numbers, [1, 2, 3, 4]);
        assert_eq!(layout.height, 4);
    }

    #[test]
    fn test_vertical_positions_ordered() {
        let tree = sample_tree();
        let settings = open_settings();
        let hz = HzSections::default();
        let measure = CharMetrics::default();
        let layout = engine(&settings, &hz, &measure).prepare(&tree);

        let positions: Vec<f64> = tree
            .leaves()
            .filter(|&id| layout.shown[id])
            .map(|id| layout.vertical_pos[id])
            .collect();
        for pair in positions.windows(2) {
            assert!(pair[0] < pair[1]);
        }
        // internal nodes sit between their extreme visible children
        for id in tree.post_order() {
            let node = &tree[id];
            if node.is_leaf() || !layout.shown[id] {
                continue;
            }
            let child_positions: Vec<f64> = node
                .children
                .iter()
                .filter(|&&child| layout.shown[child])
                .map(|&child| layout.vertical_pos[child])
                .collect();
            let min = child_positions.iter().copied().fold(f64::INFINITY, f64::min);
            let max = child_positions
                .iter()
                .copied()
                .fold(f64::NEG_INFINITY, f64::max);
            assert!(layout.vertical_pos[id] >= min && layout.vertical_pos[id] <= max);
        }
    }

    #[test]
    fn test_hz_section_marks_and_gap() {
        let tree = sample_tree();
        let settings = open_settings();
        let hz = HzSections {
            sections: vec![HzSection::new("C")],
            ..HzSections::default()
        };
        let measure = CharMetrics::default();
        let layout = engine(&settings, &hz, &measure).prepare(&tree);

        let b = tree.find_leaf_by_name("B").unwrap();
        let c = tree.find_leaf_by_name("C").unwrap();
        assert!(layout.hz_section_start[c]);
        let step_gap = layout.vertical_pos[c] - layout.vertical_pos[b];
        let expected = layout.vertical_step * (1.0 + hz.vertical_gap);
        assert!((step_gap - expected).abs() < 1e-9);
        assert_eq!(layout.sections.len(), 2);
        assert_eq!(layout.sections[1].first, c);
    }

    #[test]
    fn test_hz_section_not_marked_on_first_leaf() {
        let tree = sample_tree();
        let settings = open_settings();
        let hz = HzSections {
            sections: vec![HzSection::new("A"), HzSection::new("MISSING")],
            ..HzSections::default()
        };
        let measure = CharMetrics::default();
        let layout = engine(&settings, &hz, &measure).prepare(&tree);

        let a = tree.find_leaf_by_name("A").unwrap();
        assert!(!layout.hz_section_start[a]);
        assert_eq!(layout.sections.len(), 1);
    }

    #[test]
    fn test_fit_labels_within_canvas() {
        let mut tree = sample_tree();
        let ids: Vec<NodeId> = tree.leaves().collect();
        for id in ids {
            let long = format!("A(H3N2)/VERY__LONG__STRAIN__NAME__{id}/2016");
            tree[id].name = long;
            tree[id].date = Some("2016-01-01".to_string());
        }
        let settings = open_settings();
        let hz = HzSections::default();
        let measure = CharMetrics::default();
        let eng = engine(&settings, &hz, &measure);
        let mut layout = eng.prepare(&tree);

        let label_right = eng.max_label_offset(&tree, &mut layout);
        assert!(label_right <= canvas().width);
        assert!(layout.font_size <= layout.vertical_step);
    }

    #[test]
    fn test_number_strains() {
        let tree = sample_tree();
        let shown = vec![true; tree.len()];
        let counts = number_strains(&tree, &shown);
        assert_eq!(counts[tree.root()], 4);
        let a = tree.find_leaf_by_name("A").unwrap();
        assert_eq!(counts[a], 1);
        assert_eq!(counts[tree[a].parent.unwrap()], 2);
    }
}
