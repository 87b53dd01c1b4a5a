pub mod config;
pub mod enrich;
pub mod ladderize;
pub mod layout;
pub mod measure;
pub mod reroot;
pub mod transitions;
pub mod tree;

use config::{ConfigError, HzSections, TreeDrawSettings};
use layout::{LayoutEngine, TreeLayout};
use measure::{Size, TextMeasure};
use reroot::RerootError;
use transitions::AaTransitions;
use tree::Tree;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Reroot(#[from] RerootError),
}

/// Runs the whole pipeline over an imported and enriched tree: re-root if
/// requested, ladderize, infer amino-acid transitions, then lay the tree out
/// for the given canvas. Fatal errors leave no partial products behind.
pub fn prepare(
    tree: &mut Tree,
    settings: &TreeDrawSettings,
    hz_sections: &HzSections,
    measure: &dyn TextMeasure,
    canvas: Size,
) -> Result<(TreeLayout, AaTransitions), Error> {
    if let Some(new_root) = &settings.root {
        *tree = reroot::re_root_at(tree, new_root)?;
    }
    ladderize::ladderize(tree, settings.ladderize_method);
    let transitions = transitions::make_aa_transitions_all(tree);
    let layout = LayoutEngine::new(settings, hz_sections, measure, canvas).prepare(tree);
    Ok((layout, transitions))
}
